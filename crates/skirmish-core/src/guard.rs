//! Assignment guard: keeps every friendly unit's target valid.
//!
//! Each pass:
//! 1. Proposed `(attacker, target)` pairs are written into the store unchecked.
//! 2. Every active, classified friendly unit whose target is no longer an
//!    active enemy has it cleared; the rest are re-issued as
//!    [`OrderReason::CarriedOver`].
//! 3. Units left without a target borrow the target of the nearest same-code
//!    friendly that has a valid one ([`OrderReason::CohesionFallback`]).
//!    Adopted targets are visible to units examined later in the same pass.
//!
//! A unit that finds nothing simply stays idle.

use crate::config::GuardConfig;
use crate::entity::{GridPos, UnitCategory, UnitId};
use crate::order::{AttackOrder, OrderReason};
use crate::store::EntityStore;

/// Validates and fills attack assignments.
#[derive(Debug, Clone, Default)]
pub struct AssignmentGuard {
    config: GuardConfig,
}

/// Snapshot of one candidate unit taken at the start of a pass.
struct Candidate {
    id: UnitId,
    code: String,
    position: GridPos,
}

impl AssignmentGuard {
    /// Creates a guard.
    #[must_use]
    pub fn new(config: GuardConfig) -> Self {
        Self { config }
    }

    /// Runs one validation pass and returns every resolved attack.
    ///
    /// The only writer that clears stale assignments.
    pub fn reconcile(&self, store: &mut EntityStore, proposed: &[(UnitId, UnitId)]) -> Vec<AttackOrder> {
        for &(attacker, target) in proposed {
            if !store.set_assignment(attacker, Some(target)) {
                tracing::trace!(%attacker, %target, "proposal for unknown attacker ignored");
            }
        }

        let candidates: Vec<Candidate> = store
            .active_friendlies()
            .filter(|unit| unit.category != UnitCategory::Other)
            .map(|unit| Candidate {
                id: unit.id,
                code: unit.unit_code.clone(),
                position: unit.position,
            })
            .collect();

        let mut resolved = Vec::new();

        for candidate in &candidates {
            match valid_target(store, candidate.id) {
                Some(target) => {
                    resolved.push(AttackOrder::new(candidate.id, target, OrderReason::CarriedOver));
                }
                None => {
                    store.set_assignment(candidate.id, None);
                }
            }
        }

        for candidate in &candidates {
            if valid_target(store, candidate.id).is_some() {
                continue;
            }
            if let Some(target) = self.fallback_target(store, candidate, &candidates) {
                store.set_assignment(candidate.id, Some(target));
                resolved.push(AttackOrder::new(candidate.id, target, OrderReason::CohesionFallback));
            }
        }

        resolved
    }

    /// Target of the nearest same-code neighbor holding a valid one. Ties go
    /// to the neighbor seen first.
    fn fallback_target(
        &self,
        store: &EntityStore,
        me: &Candidate,
        candidates: &[Candidate],
    ) -> Option<UnitId> {
        let mut best: Option<(u32, UnitId)> = None;
        for buddy in candidates {
            if buddy.id == me.id || buddy.code != me.code {
                continue;
            }
            let Some(target) = valid_target(store, buddy.id) else {
                continue;
            };
            let dist = me.position.manhattan(buddy.position);
            if self.config.cohesion_radius.is_some_and(|radius| dist > radius) {
                continue;
            }
            if best.map_or(true, |(best_dist, _)| dist < best_dist) {
                best = Some((dist, target));
            }
        }
        best.map(|(_, target)| target)
    }
}

/// The unit's assigned target if it is an active enemy.
fn valid_target(store: &EntityStore, id: UnitId) -> Option<UnitId> {
    store
        .get_entity(id)
        .and_then(|unit| unit.assigned_target)
        .filter(|target| store.is_active_enemy(*target))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::RawUnit;

    fn store_with(friendly: Vec<RawUnit>, enemy: Vec<RawUnit>) -> EntityStore {
        let mut store = EntityStore::default();
        store.apply_observation(friendly, enemy);
        store
    }

    fn id(n: u64) -> UnitId {
        UnitId::new(n)
    }

    mod validation_tests {
        use super::*;

        #[test]
        fn proposals_are_absorbed_and_carried_over() {
            let mut store = store_with(vec![RawUnit::new(1, "3tnk", 0, 0)], vec![RawUnit::new(50, "e1", 5, 0)]);
            let guard = AssignmentGuard::default();

            let orders = guard.reconcile(&mut store, &[(id(1), id(50))]);

            assert_eq!(orders, vec![AttackOrder::new(id(1), id(50), OrderReason::CarriedOver)]);
            assert_eq!(store.get_entity(id(1)).unwrap().assigned_target, Some(id(50)));
        }

        #[test]
        fn stale_targets_are_cleared() {
            let mut store = store_with(vec![RawUnit::new(1, "3tnk", 0, 0)], vec![RawUnit::new(50, "e1", 5, 0)]);
            let guard = AssignmentGuard::default();
            guard.reconcile(&mut store, &[(id(1), id(50))]);

            store.apply_observation(vec![RawUnit::new(1, "3tnk", 0, 0)], vec![]);
            let orders = guard.reconcile(&mut store, &[]);

            assert!(orders.is_empty());
            assert_eq!(store.get_entity(id(1)).unwrap().assigned_target, None);
        }

        #[test]
        fn proposals_naming_unknown_targets_are_dropped() {
            let mut store = store_with(vec![RawUnit::new(1, "3tnk", 0, 0)], vec![]);
            let orders = AssignmentGuard::default().reconcile(&mut store, &[(id(1), id(404)), (id(2), id(1))]);
            assert!(orders.is_empty());
            assert_eq!(store.get_entity(id(1)).unwrap().assigned_target, None);
        }

        #[test]
        fn friendly_ids_are_not_valid_targets() {
            let mut store = store_with(
                vec![RawUnit::new(1, "3tnk", 0, 0), RawUnit::new(2, "3tnk", 1, 0)],
                vec![],
            );
            let orders = AssignmentGuard::default().reconcile(&mut store, &[(id(1), id(2))]);
            assert!(orders.is_empty());
        }

        #[test]
        fn unclassified_units_are_left_alone() {
            let mut store = store_with(vec![RawUnit::new(1, "harv", 0, 0)], vec![RawUnit::new(50, "e1", 5, 0)]);
            let orders = AssignmentGuard::default().reconcile(&mut store, &[(id(1), id(50))]);
            assert!(orders.is_empty());
        }
    }

    mod cohesion_tests {
        use super::*;

        #[test]
        fn idle_unit_adopts_nearest_same_code_target() {
            let mut store = store_with(
                vec![
                    RawUnit::new(1, "e1", 0, 0),
                    RawUnit::new(2, "e1", 5, 0),
                    RawUnit::new(3, "e1", 9, 0),
                    RawUnit::new(4, "3tnk", 1, 0),
                ],
                vec![RawUnit::new(77, "e3", 20, 0), RawUnit::new(78, "e3", 30, 0), RawUnit::new(79, "e3", 40, 0)],
            );
            let guard = AssignmentGuard::default();

            let orders = guard.reconcile(&mut store, &[(id(2), id(77)), (id(3), id(78)), (id(4), id(79))]);

            assert!(orders.contains(&AttackOrder::new(id(1), id(77), OrderReason::CohesionFallback)));
            assert_eq!(store.get_entity(id(1)).unwrap().assigned_target, Some(id(77)));
        }

        #[test]
        fn different_codes_do_not_share() {
            let mut store = store_with(
                vec![RawUnit::new(1, "e1", 0, 0), RawUnit::new(2, "e3", 1, 0)],
                vec![RawUnit::new(77, "e3", 20, 0)],
            );
            let orders = AssignmentGuard::default().reconcile(&mut store, &[(id(2), id(77))]);
            assert_eq!(orders.len(), 1);
            assert_eq!(store.get_entity(id(1)).unwrap().assigned_target, None);
        }

        #[test]
        fn ties_go_to_first_in_id_order() {
            let mut store = store_with(
                vec![RawUnit::new(1, "e1", 0, 0), RawUnit::new(2, "e1", 3, 0), RawUnit::new(3, "e1", -3, 0)],
                vec![RawUnit::new(77, "e3", 20, 0), RawUnit::new(78, "e3", -20, 0)],
            );
            let orders = AssignmentGuard::default().reconcile(&mut store, &[(id(2), id(77)), (id(3), id(78))]);
            assert!(orders.contains(&AttackOrder::new(id(1), id(77), OrderReason::CohesionFallback)));
        }

        #[test]
        fn adopted_targets_propagate_within_a_pass() {
            let mut store = store_with(
                vec![RawUnit::new(1, "e1", 0, 0), RawUnit::new(2, "e1", -100, 0), RawUnit::new(3, "e1", 2, 0)],
                vec![RawUnit::new(77, "e3", 50, 50)],
            );
            let orders = AssignmentGuard::default().reconcile(&mut store, &[(id(3), id(77))]);
            // 1 adopts from 3, then 2 borrows from 1, its nearest neighbor.
            assert_eq!(orders.len(), 3);
            assert_eq!(store.get_entity(id(2)).unwrap().assigned_target, Some(id(77)));
        }

        #[test]
        fn cohesion_radius_limits_search() {
            let mut store = store_with(
                vec![RawUnit::new(1, "e1", 0, 0), RawUnit::new(2, "e1", 11, 0)],
                vec![RawUnit::new(77, "e3", 20, 0)],
            );
            let guard = AssignmentGuard::new(GuardConfig { cohesion_radius: Some(10) });
            let orders = guard.reconcile(&mut store, &[(id(2), id(77))]);
            assert_eq!(orders.len(), 1);
            assert_eq!(store.get_entity(id(1)).unwrap().assigned_target, None);
        }

        #[test]
        fn nobody_to_follow_means_idle() {
            let mut store = store_with(vec![RawUnit::new(1, "e1", 0, 0)], vec![RawUnit::new(77, "e3", 20, 0)]);
            assert!(AssignmentGuard::default().reconcile(&mut store, &[]).is_empty());
        }
    }
}
