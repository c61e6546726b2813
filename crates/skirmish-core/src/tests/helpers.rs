//! Test helpers: an in-memory gateway and setup utilities.
//!
//! [`ScriptedGateway`] serves fixed unit lists and records every dispatched
//! order. Clones share state, so a test can keep one handle while the loop
//! thread owns another.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use crate::config::CoreConfig;
use crate::entity::{Side, UnitId};
use crate::error::{TransportError, TransportResult};
use crate::order::MoveCommand;
use crate::remote::{RawUnit, UnitGateway};
use crate::runtime::GatewayFactory;

// =============================================================================
// Scripted Gateway
// =============================================================================

#[derive(Debug, Default)]
struct State {
    friendly: Vec<RawUnit>,
    enemy: Vec<RawUnit>,
    failing_side: Option<Side>,
    fail_dispatch: bool,
    panic_next_list: bool,
    list_calls: usize,
    moves: Vec<MoveCommand>,
    attacks: Vec<(UnitId, UnitId)>,
}

/// In-memory [`UnitGateway`] with scripted observations.
#[derive(Debug, Clone, Default)]
pub struct ScriptedGateway {
    state: Arc<Mutex<State>>,
}

impl ScriptedGateway {
    /// Gateway with no units on either side.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the units reported for `side`, builder style.
    pub fn with_units(self, side: Side, units: Vec<RawUnit>) -> Self {
        self.set_units(side, units);
        self
    }

    /// Replaces the units reported for `side`.
    pub fn set_units(&self, side: Side, units: Vec<RawUnit>) {
        let mut state = self.lock();
        match side {
            Side::Friendly => state.friendly = units,
            Side::Enemy => state.enemy = units,
        }
    }

    /// Makes listing `side` time out. `None` heals the gateway.
    pub fn fail_side(&self, side: Option<Side>) {
        self.lock().failing_side = side;
    }

    /// Makes every move and attack fail.
    pub fn fail_dispatch(&self, fail: bool) {
        self.lock().fail_dispatch = fail;
    }

    /// Makes the next `list_units` call panic.
    pub fn panic_next_list(&self) {
        self.lock().panic_next_list = true;
    }

    /// Moves accepted so far.
    pub fn moves(&self) -> Vec<MoveCommand> {
        self.lock().moves.clone()
    }

    /// Attacks accepted so far.
    pub fn attacks(&self) -> Vec<(UnitId, UnitId)> {
        self.lock().attacks.clone()
    }

    /// Number of `list_units` calls.
    pub fn list_calls(&self) -> usize {
        self.lock().list_calls
    }

    /// Forgets recorded moves and attacks.
    pub fn clear_dispatched(&self) {
        let mut state = self.lock();
        state.moves.clear();
        state.attacks.clear();
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl UnitGateway for ScriptedGateway {
    fn list_units(&mut self, side: Side) -> TransportResult<Vec<RawUnit>> {
        let mut state = self.lock();
        state.list_calls += 1;
        if state.panic_next_list {
            state.panic_next_list = false;
            drop(state);
            panic!("scripted panic");
        }
        if state.failing_side == Some(side) {
            return Err(TransportError::Timeout(Duration::from_secs(2)));
        }
        Ok(match side {
            Side::Friendly => state.friendly.clone(),
            Side::Enemy => state.enemy.clone(),
        })
    }

    fn attack(&mut self, attacker: UnitId, target: UnitId) -> TransportResult<()> {
        let mut state = self.lock();
        if state.fail_dispatch {
            return Err(TransportError::Rejected {
                code: "INVALID_TARGET".into(),
                message: "scripted".into(),
            });
        }
        state.attacks.push((attacker, target));
        Ok(())
    }

    fn move_unit(&mut self, command: &MoveCommand) -> TransportResult<()> {
        let mut state = self.lock();
        if state.fail_dispatch {
            return Err(TransportError::Rejected {
                code: "INVALID_TARGET".into(),
                message: "scripted".into(),
            });
        }
        state.moves.push(*command);
        Ok(())
    }
}

// =============================================================================
// Setup
// =============================================================================

/// Factory handing out clones of `gateway`.
pub fn factory(gateway: &ScriptedGateway) -> GatewayFactory {
    let gateway = gateway.clone();
    Arc::new(move || Box::new(gateway.clone()) as Box<dyn UnitGateway>)
}

/// Default configuration with a 10 ms tick.
pub fn fast_config() -> CoreConfig {
    let mut config = CoreConfig::default();
    config.runtime.tick_period_ms = 10;
    config
}

/// Polls `condition` until it holds or `timeout` elapses.
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}

/// Friendly heavy tank at (10, 10) facing a damaged rocket launcher five
/// cells south.
pub fn harvest_band_scenario() -> ScriptedGateway {
    ScriptedGateway::new()
        .with_units(Side::Friendly, vec![RawUnit::new(1, "3tnk", 10, 10)])
        .with_units(Side::Enemy, vec![RawUnit::new(2, "v2rl", 10, 15).with_hp(20, 100)])
}
