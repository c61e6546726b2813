//! Tick orchestrator: one pass of observe, decide, merge and dispatch.
//!
//! Each [`Orchestrator::tick`] runs the components in a fixed order:
//!
//! 1. **REFRESH**: rebuild the entity store from the gateway. On failure the
//!    store is already empty; nothing is dispatched and queued proposals stay
//!    queued for the next tick.
//! 2. **PURGE**: drop arbiter state for units that vanished.
//! 3. **RECONCILE**: absorb queued proposals and validate every assignment.
//! 4. **INTERRUPT**: evaluate the hard rules; every unit that got an order is
//!    claimed.
//! 5. **FIELD**: compute potential-field moves for unclaimed units.
//! 6. **DISPATCH**: moves (interrupts win), then interrupt attacks, then guard
//!    attacks for unclaimed units.
//!
//! The orchestrator owns all mutable tactical state and is driven from a
//! single thread; see [`crate::runtime`] for the loop around it.

use std::collections::{BTreeMap, BTreeSet};

use crate::config::CoreConfig;
use crate::entity::{TrackedEntity, UnitCategory, UnitId};
use crate::field::FieldNavigator;
use crate::guard::AssignmentGuard;
use crate::interrupt::InterruptArbiter;
use crate::order::{AttackOrder, MoveOrder, OrderReason};
use crate::remote::UnitGateway;
use crate::store::EntityStore;

// =============================================================================
// Tick Report
// =============================================================================

/// What one tick did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Tick number, starting at 1.
    pub tick: u64,
    /// Whether the observation succeeded.
    pub refreshed: bool,
    /// The observation failed because the game process was unreachable.
    pub unreachable: bool,
    /// Friendly units after the refresh.
    pub friendly: usize,
    /// Enemy units after the refresh.
    pub enemy: usize,
    /// Moves the gateway accepted.
    pub moves_sent: usize,
    /// Attacks the gateway accepted.
    pub attacks_sent: usize,
    /// Moves and attacks the gateway refused.
    pub dispatch_failures: usize,
}

// =============================================================================
// Orchestrator
// =============================================================================

/// Owner of the store and the three decision components.
#[derive(Debug, Clone)]
pub struct Orchestrator {
    store: EntityStore,
    guard: AssignmentGuard,
    navigator: FieldNavigator,
    arbiter: InterruptArbiter,
    tick: u64,
    heartbeat_every: u64,
    /// Attacker -> proposed target, latest submission wins.
    pending: BTreeMap<UnitId, UnitId>,
}

impl Orchestrator {
    /// Builds every component from one configuration.
    #[must_use]
    pub fn new(config: &CoreConfig) -> Self {
        Self {
            store: EntityStore::new(config.store.clone()),
            guard: AssignmentGuard::new(config.guard.clone()),
            navigator: FieldNavigator::new(config.field.clone()),
            arbiter: InterruptArbiter::new(config.interrupt.clone(), config.retreat_cooldown_ticks()),
            tick: 0,
            heartbeat_every: config.runtime.heartbeat_every,
            pending: BTreeMap::new(),
        }
    }

    /// Queues proposed `(attacker, target)` pairs for the next successful
    /// tick. A later proposal for the same attacker replaces an earlier one.
    pub fn queue_proposals<I>(&mut self, pairs: I)
    where
        I: IntoIterator<Item = (UnitId, UnitId)>,
    {
        self.pending.extend(pairs);
    }

    /// Runs one tick against `gateway`.
    pub fn tick(&mut self, gateway: &mut dyn UnitGateway) -> TickReport {
        self.tick += 1;
        let report = self.run(gateway);

        if self.heartbeat_every > 0 && self.tick % self.heartbeat_every == 0 {
            tracing::info!(
                tick = self.tick,
                friendly = report.friendly,
                enemy = report.enemy,
                "heartbeat"
            );
        }
        report
    }

    fn run(&mut self, gateway: &mut dyn UnitGateway) -> TickReport {
        let now = self.tick;
        let mut report = TickReport {
            tick: now,
            ..TickReport::default()
        };

        let summary = match self.store.refresh(gateway) {
            Ok(summary) => summary,
            Err(err) => {
                report.unreachable = err.is_connectivity();
                tracing::warn!(
                    tick = now,
                    error = %err,
                    unreachable = report.unreachable,
                    "observation failed, entity state reset"
                );
                return report;
            }
        };
        report.refreshed = true;
        report.friendly = summary.friendly;
        report.enemy = summary.enemy;

        self.arbiter.purge(&self.store);

        let proposals: Vec<(UnitId, UnitId)> = std::mem::take(&mut self.pending).into_iter().collect();
        let resolved = self.guard.reconcile(&mut self.store, &proposals);

        let interrupts = self.arbiter.evaluate(&self.store, now);
        let claimed = interrupts.claimed();

        let moves = {
            let free: Vec<&TrackedEntity> = self
                .store
                .active_friendlies()
                .filter(|unit| !claimed.contains(&unit.id))
                .collect();
            let mut moves = self.navigator.compute(&self.store, &free);
            moves.extend(interrupts.moves);
            moves
        };

        self.dispatch_moves(gateway, &moves, &mut report);
        self.dispatch_attacks(gateway, &interrupts.attacks, &resolved, &claimed, &mut report);

        report
    }

    fn dispatch_moves(
        &self,
        gateway: &mut dyn UnitGateway,
        moves: &BTreeMap<UnitId, MoveOrder>,
        report: &mut TickReport,
    ) {
        for order in moves.values() {
            if order.reason.is_interrupt() {
                tracing::debug!(unit = %order.unit, direction = %order.direction, steps = order.steps, reason = %order.reason, "interrupt move");
            }
            let assault = order.reason != OrderReason::Retreat
                && self
                    .store
                    .get_entity(order.unit)
                    .is_some_and(|unit| unit.category == UnitCategory::Mbt);

            match gateway.move_unit(&order.into_command(assault)) {
                Ok(()) => report.moves_sent += 1,
                Err(err) => {
                    report.dispatch_failures += 1;
                    tracing::warn!(unit = %order.unit, error = %err, "move dispatch failed");
                }
            }
        }
    }

    /// Interrupt attacks go out unconditionally; guard attacks only for
    /// units no interrupt has claimed.
    fn dispatch_attacks(
        &self,
        gateway: &mut dyn UnitGateway,
        interrupts: &[AttackOrder],
        resolved: &[AttackOrder],
        claimed: &BTreeSet<UnitId>,
        report: &mut TickReport,
    ) {
        let guarded = resolved.iter().filter(|order| !claimed.contains(&order.attacker));

        for order in interrupts.iter().chain(guarded) {
            match order.reason {
                OrderReason::CarriedOver => {
                    tracing::trace!(attacker = %order.attacker, target = %order.target, "carried-over attack");
                }
                reason => {
                    tracing::debug!(attacker = %order.attacker, target = %order.target, reason = %reason, "attack");
                }
            }

            match gateway.attack(order.attacker, order.target) {
                Ok(()) => report.attacks_sent += 1,
                Err(err) => {
                    report.dispatch_failures += 1;
                    tracing::warn!(attacker = %order.attacker, target = %order.target, error = %err, "attack dispatch failed");
                }
            }
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Ticks run so far.
    #[must_use]
    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    /// The entity store.
    #[must_use]
    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    /// The interrupt arbiter.
    #[must_use]
    pub fn arbiter(&self) -> &InterruptArbiter {
        &self.arbiter
    }

    /// Mutable access to the arbiter, for installing attack locks.
    pub fn arbiter_mut(&mut self) -> &mut InterruptArbiter {
        &mut self.arbiter
    }

    /// Proposals waiting for the next successful tick.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new(&CoreConfig::default())
    }
}
