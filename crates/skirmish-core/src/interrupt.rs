//! Interrupt arbiter: hard, rule-driven overrides.
//!
//! Rules are checked per active friendly unit in priority order and the first
//! match wins:
//!
//! 1. **Retreat** - damaged ARTY/AFV not in cooldown backs away from the
//!    nearest enemy MBT within range and starts a cooldown.
//! 2. **Locked pursuit** - a unit holding an attack lock on a live enemy keeps
//!    attacking it.
//! 3. **Armor harvest** - an MBT finishes the weakest damaged vehicle within
//!    weapon range.
//! 4. **Threat strip** - a `4tnk` clears the nearest anti-tank infantry.
//!
//! Cooldowns run on the caller's logical tick counter. The cooldown and lock
//! tables are the only state that survives between ticks; [`purge`] drops
//! entries for units that no longer exist.
//!
//! [`purge`]: InterruptArbiter::purge

use std::collections::{BTreeMap, BTreeSet};

use crate::config::InterruptConfig;
use crate::entity::{CategoryMask, TrackedEntity, UnitCategory, UnitId};
use crate::order::{AttackOrder, Direction, MoveOrder, OrderReason};
use crate::store::EntityStore;

/// Unit code that performs the threat strip.
const STRIP_CODE: &str = "4tnk";

/// Ranking value for targets whose absolute health is unknown.
const UNKNOWN_HP: i64 = 9999;

/// Orders produced by one evaluation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InterruptOutcome {
    /// Forced moves keyed by unit.
    pub moves: BTreeMap<UnitId, MoveOrder>,
    /// Forced attacks in unit order.
    pub attacks: Vec<AttackOrder>,
}

impl InterruptOutcome {
    /// Every unit that received an order.
    #[must_use]
    pub fn claimed(&self) -> BTreeSet<UnitId> {
        self.moves
            .keys()
            .copied()
            .chain(self.attacks.iter().map(|a| a.attacker))
            .collect()
    }

    /// Returns true if no rule fired.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.moves.is_empty() && self.attacks.is_empty()
    }
}

/// An attack lock held by one unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttackLock {
    /// Locked target.
    pub target: UnitId,
    /// Tick the lock was taken.
    pub since: u64,
}

/// Evaluates the hard-interrupt rules.
#[derive(Debug, Clone)]
pub struct InterruptArbiter {
    config: InterruptConfig,
    cooldown_ticks: u64,
    /// Unit -> first tick at which it may retreat again.
    cooldowns: BTreeMap<UnitId, u64>,
    locks: BTreeMap<UnitId, AttackLock>,
}

impl InterruptArbiter {
    /// Creates an arbiter whose retreat cooldown lasts `cooldown_ticks`.
    #[must_use]
    pub fn new(config: InterruptConfig, cooldown_ticks: u64) -> Self {
        Self {
            config,
            cooldown_ticks,
            cooldowns: BTreeMap::new(),
            locks: BTreeMap::new(),
        }
    }

    /// Evaluates every active friendly unit at logical time `now`.
    pub fn evaluate(&mut self, store: &EntityStore, now: u64) -> InterruptOutcome {
        self.locks.retain(|_, lock| store.is_active_enemy(lock.target));

        let enemies: Vec<&TrackedEntity> = store.active_enemies().collect();
        let mut outcome = InterruptOutcome::default();

        for unit in store.active_friendlies() {
            if let Some(order) = self.try_retreat(unit, &enemies, now) {
                outcome.moves.insert(unit.id, order);
                continue;
            }

            if let Some(lock) = self.locks.get(&unit.id) {
                outcome
                    .attacks
                    .push(AttackOrder::new(unit.id, lock.target, OrderReason::LockedPursuit));
                continue;
            }

            if unit.category == UnitCategory::Mbt {
                if let Some(prey) = self.harvest_target(unit, &enemies) {
                    outcome
                        .attacks
                        .push(AttackOrder::new(unit.id, prey.id, OrderReason::ArmorHarvest));
                    continue;
                }
            }

            if unit.unit_code == STRIP_CODE {
                let reach = self.config.strip_distance;
                if let Some(threat) = nearest_within(unit, &enemies, CategoryMask::INF_AT, reach) {
                    outcome
                        .attacks
                        .push(AttackOrder::new(unit.id, threat.id, OrderReason::ThreatStrip));
                }
            }
        }

        outcome
    }

    fn try_retreat(&mut self, unit: &TrackedEntity, enemies: &[&TrackedEntity], now: u64) -> Option<MoveOrder> {
        if !unit.is_in(CategoryMask::FRAGILE) || unit.health_ratio >= self.config.fragile_health {
            return None;
        }
        if self.is_cooling_down(unit.id, now) {
            return None;
        }
        let threat = nearest_within(unit, enemies, CategoryMask::MBT, self.config.retreat_threat_distance)?;
        let escape = Direction::toward(unit.position.delta_to(threat.position)).inverse();

        self.cooldowns.insert(unit.id, now.saturating_add(self.cooldown_ticks));
        self.locks.remove(&unit.id);
        Some(MoveOrder::new(unit.id, escape, self.config.retreat_steps, OrderReason::Retreat))
    }

    /// Lowest absolute health first, then nearest.
    fn harvest_target<'a>(&self, unit: &TrackedEntity, enemies: &[&'a TrackedEntity]) -> Option<&'a TrackedEntity> {
        let range = unit.weapon_range();
        enemies
            .iter()
            .filter(|e| e.is_in(CategoryMask::VEHICLE) && e.health_ratio < self.config.fragile_health)
            .map(|e| (*e, unit.euclidean_to(e)))
            .filter(|(_, dist)| *dist <= range)
            .min_by(|(a, da), (b, db)| {
                let hp_a = a.hp.unwrap_or(UNKNOWN_HP);
                let hp_b = b.hp.unwrap_or(UNKNOWN_HP);
                hp_a.cmp(&hp_b).then(da.total_cmp(db))
            })
            .map(|(e, _)| e)
    }

    /// Pins `attacker` to `target` until the target dies, the attacker
    /// retreats, or the attacker disappears.
    pub fn lock_target(&mut self, attacker: UnitId, target: UnitId, now: u64) {
        self.locks.insert(attacker, AttackLock { target, since: now });
    }

    /// Current lock for a unit.
    #[must_use]
    pub fn lock_of(&self, unit: UnitId) -> Option<AttackLock> {
        self.locks.get(&unit).copied()
    }

    /// Returns true while a unit may not retreat again.
    #[must_use]
    pub fn is_cooling_down(&self, unit: UnitId, now: u64) -> bool {
        self.cooldowns.get(&unit).is_some_and(|&until| now < until)
    }

    /// Drops cooldowns and locks of units that are no longer friendly, and
    /// locks whose target is gone.
    pub fn purge(&mut self, store: &EntityStore) {
        self.cooldowns.retain(|id, _| store.is_friendly(*id));
        self.locks
            .retain(|id, lock| store.is_friendly(*id) && store.is_active_enemy(lock.target));
    }

    /// Number of cooldown entries held.
    #[must_use]
    pub fn cooldown_count(&self) -> usize {
        self.cooldowns.len()
    }

    /// Number of lock entries held.
    #[must_use]
    pub fn lock_count(&self) -> usize {
        self.locks.len()
    }
}

/// Manhattan-nearest enemy in `mask` within `reach` (inclusive). Ties go to
/// the first seen.
fn nearest_within<'a>(
    unit: &TrackedEntity,
    enemies: &[&'a TrackedEntity],
    mask: CategoryMask,
    reach: u32,
) -> Option<&'a TrackedEntity> {
    let mut best: Option<(u32, &'a TrackedEntity)> = None;
    for enemy in enemies.iter().filter(|e| e.is_in(mask)) {
        let dist = unit.manhattan_to(enemy);
        if dist <= reach && best.map_or(true, |(best_dist, _)| dist < best_dist) {
            best = Some((dist, *enemy));
        }
    }
    best.map(|(_, enemy)| enemy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::RawUnit;

    const COOLDOWN: u64 = 50;

    fn store_with(friendly: Vec<RawUnit>, enemy: Vec<RawUnit>) -> EntityStore {
        let mut store = EntityStore::default();
        store.apply_observation(friendly, enemy);
        store
    }

    fn arbiter() -> InterruptArbiter {
        InterruptArbiter::new(InterruptConfig::default(), COOLDOWN)
    }

    fn id(n: u64) -> UnitId {
        UnitId::new(n)
    }

    mod retreat_tests {
        use super::*;

        #[test]
        fn damaged_artillery_flees_tank() {
            let store = store_with(
                vec![RawUnit::new(1, "v2rl", 10, 10).with_hp(30, 100)],
                vec![RawUnit::new(2, "3tnk", 14, 10)],
            );
            let mut arbiter = arbiter();

            let outcome = arbiter.evaluate(&store, 1);

            let order = outcome.moves[&id(1)];
            assert_eq!(order.direction, Direction::West);
            assert_eq!(order.steps, 3);
            assert_eq!(order.reason, OrderReason::Retreat);
            assert!(arbiter.is_cooling_down(id(1), 1));
        }

        #[test]
        fn cooldown_suppresses_repeat_retreat() {
            let store = store_with(
                vec![RawUnit::new(1, "v2rl", 10, 10).with_hp(30, 100)],
                vec![RawUnit::new(2, "3tnk", 14, 10)],
            );
            let mut arbiter = arbiter();
            arbiter.evaluate(&store, 1);

            for now in 2..1 + COOLDOWN {
                assert!(arbiter.evaluate(&store, now).moves.is_empty(), "retreated at tick {now}");
            }
            assert!(arbiter.evaluate(&store, 1 + COOLDOWN).moves.contains_key(&id(1)));
        }

        #[test]
        fn cooldown_falls_through_to_lower_rules() {
            let store = store_with(
                vec![RawUnit::new(1, "ftrk", 0, 0).with_hp(10, 100)],
                vec![RawUnit::new(2, "3tnk", 0, 3), RawUnit::new(3, "e1", 1, 0)],
            );
            let mut arbiter = arbiter();
            arbiter.evaluate(&store, 1);

            arbiter.lock_target(id(1), id(3), 2);
            let outcome = arbiter.evaluate(&store, 2);

            assert!(outcome.moves.is_empty());
            assert_eq!(outcome.attacks, vec![AttackOrder::new(id(1), id(3), OrderReason::LockedPursuit)]);
        }

        #[test]
        fn only_tanks_in_reach_trigger_retreat() {
            let store = store_with(
                vec![
                    RawUnit::new(1, "arty", 0, 0).with_hp(10, 100),
                    RawUnit::new(2, "ftrk", 50, 50).with_hp(10, 100),
                ],
                vec![RawUnit::new(10, "e3", 1, 0), RawUnit::new(11, "2tnk", 50, 57)],
            );
            assert!(arbiter().evaluate(&store, 1).is_empty());
        }

        #[test]
        fn healthy_or_sturdy_units_hold() {
            let store = store_with(
                vec![
                    RawUnit::new(1, "v2rl", 0, 0).with_hp(35, 100),
                    RawUnit::new(2, "2tnk", 20, 20).with_hp(1, 100),
                ],
                vec![RawUnit::new(10, "3tnk", 0, 2), RawUnit::new(11, "3tnk", 20, 22)],
            );
            let outcome = arbiter().evaluate(&store, 1);
            assert!(outcome.moves.is_empty());
        }

        #[test]
        fn retreat_drops_lock() {
            let store = store_with(
                vec![RawUnit::new(1, "ftrk", 0, 0).with_hp(10, 100)],
                vec![RawUnit::new(2, "3tnk", 0, -2), RawUnit::new(3, "e1", 5, 5)],
            );
            let mut arbiter = arbiter();
            arbiter.lock_target(id(1), id(3), 0);

            let outcome = arbiter.evaluate(&store, 1);

            assert_eq!(outcome.moves[&id(1)].direction, Direction::South);
            assert!(outcome.attacks.is_empty());
            assert_eq!(arbiter.lock_of(id(1)), None);
        }
    }

    mod attack_tests {
        use super::*;

        #[test]
        fn harvest_picks_lowest_absolute_health() {
            let store = store_with(
                vec![RawUnit::new(1, "3tnk", 0, 0)],
                vec![
                    RawUnit::new(10, "2tnk", 3, 0).with_hp(100, 1000),
                    RawUnit::new(11, "1tnk", 4, 0).with_hp(50, 400),
                    RawUnit::new(12, "v2rl", 1, 0).with_hp(200, 1000),
                ],
            );
            let outcome = arbiter().evaluate(&store, 1);
            assert_eq!(outcome.attacks, vec![AttackOrder::new(id(1), id(11), OrderReason::ArmorHarvest)]);
        }

        #[test]
        fn harvest_ties_break_by_distance() {
            let store = store_with(
                vec![RawUnit::new(1, "3tnk", 0, 0)],
                vec![
                    RawUnit::new(10, "2tnk", 4, 0).with_hp(50, 1000),
                    RawUnit::new(11, "2tnk", 0, 2).with_hp(50, 1000),
                ],
            );
            let outcome = arbiter().evaluate(&store, 1);
            assert_eq!(outcome.attacks[0].target, id(11));
        }

        #[test]
        fn harvest_uses_euclidean_range() {
            // (3, 4) is 5 away, beyond the 4.75 range.
            let store = store_with(
                vec![RawUnit::new(1, "3tnk", 0, 0)],
                vec![RawUnit::new(10, "2tnk", 3, 4).with_hp(1, 100)],
            );
            assert!(arbiter().evaluate(&store, 1).is_empty());
        }

        #[test]
        fn harvest_outranks_threat_strip() {
            let store = store_with(
                vec![RawUnit::new(1, "4tnk", 0, 0)],
                vec![RawUnit::new(10, "e3", 1, 0), RawUnit::new(11, "ftrk", 2, 0).with_hp(10, 100)],
            );
            let outcome = arbiter().evaluate(&store, 1);
            assert_eq!(outcome.attacks, vec![AttackOrder::new(id(1), id(11), OrderReason::ArmorHarvest)]);
        }

        #[test]
        fn threat_strip_targets_nearest_anti_tank_infantry() {
            let store = store_with(
                vec![RawUnit::new(1, "4tnk", 0, 0), RawUnit::new(2, "3tnk", 0, 1)],
                vec![RawUnit::new(10, "e3", 5, 0), RawUnit::new(11, "shok", 0, 4), RawUnit::new(12, "e3", 7, 0)],
            );
            let outcome = arbiter().evaluate(&store, 1);
            assert_eq!(outcome.attacks, vec![AttackOrder::new(id(1), id(11), OrderReason::ThreatStrip)]);
        }

        #[test]
        fn claimed_covers_moves_and_attacks() {
            let store = store_with(
                vec![RawUnit::new(1, "v2rl", 0, 0).with_hp(1, 100), RawUnit::new(2, "4tnk", 30, 30)],
                vec![RawUnit::new(10, "3tnk", 2, 0), RawUnit::new(11, "e3", 30, 33)],
            );
            let outcome = arbiter().evaluate(&store, 1);
            assert_eq!(outcome.claimed(), BTreeSet::from([id(1), id(2)]));
        }
    }

    mod table_tests {
        use super::*;

        #[test]
        fn locks_on_dead_targets_are_dropped() {
            let mut store = store_with(vec![RawUnit::new(1, "e1", 0, 0)], vec![RawUnit::new(10, "e1", 3, 0)]);
            let mut arbiter = arbiter();
            arbiter.lock_target(id(1), id(10), 0);
            assert_eq!(arbiter.evaluate(&store, 1).attacks.len(), 1);

            store.apply_observation(vec![RawUnit::new(1, "e1", 0, 0)], vec![]);
            assert!(arbiter.evaluate(&store, 2).is_empty());
            assert_eq!(arbiter.lock_count(), 0);
        }

        #[test]
        fn purge_forgets_vanished_units() {
            let mut store = store_with(
                vec![RawUnit::new(1, "v2rl", 0, 0).with_hp(1, 100), RawUnit::new(2, "e1", 9, 9)],
                vec![RawUnit::new(10, "3tnk", 2, 0), RawUnit::new(11, "e1", 9, 12)],
            );
            let mut arbiter = arbiter();
            arbiter.evaluate(&store, 1);
            arbiter.lock_target(id(2), id(11), 1);
            assert_eq!(arbiter.cooldown_count(), 1);
            assert_eq!(arbiter.lock_count(), 1);

            store.apply_observation(vec![], vec![RawUnit::new(10, "3tnk", 2, 0), RawUnit::new(11, "e1", 9, 12)]);
            arbiter.purge(&store);

            assert_eq!(arbiter.cooldown_count(), 0);
            assert_eq!(arbiter.lock_count(), 0);
        }
    }
}
