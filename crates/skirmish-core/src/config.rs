//! Configuration for the tactical core.
//!
//! Every tunable lives in [`CoreConfig`]. Durations are stored as whole
//! milliseconds so config files stay readable; accessors hand out
//! [`Duration`]s. Loading a JSON file only needs the fields being overridden:
//!
//! ```json
//! { "remote": { "port": 7446 }, "runtime": { "tick_period_ms": 200 } }
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Connection settings for the remote unit client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Game process host.
    pub host: String,
    /// Game process port.
    pub port: u16,
    /// Connect/read/write timeout for one call.
    pub timeout_ms: u64,
    /// `apiVersion` sent with every request.
    pub api_version: String,
    /// `language` sent with every request.
    pub language: String,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_owned(),
            port: 7445,
            timeout_ms: 2_000,
            api_version: "1.0".to_owned(),
            language: "zh".to_owned(),
        }
    }
}

impl RemoteConfig {
    /// Per-call timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Loop timing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopConfig {
    /// Target period between tick starts.
    pub tick_period_ms: u64,
    /// How long `stop()` waits for the loop thread.
    pub stop_timeout_ms: u64,
    /// Log a heartbeat every this many ticks.
    pub heartbeat_every: u64,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            tick_period_ms: 100,
            stop_timeout_ms: 1_000,
            heartbeat_every: 50,
        }
    }
}

impl LoopConfig {
    /// Tick period.
    #[must_use]
    pub const fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_period_ms)
    }

    /// Bounded wait used by `stop()`.
    #[must_use]
    pub const fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_timeout_ms)
    }
}

/// Weights and distances for the potential field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldWeights {
    /// Pull toward the assigned target while out of range.
    pub target: f32,
    /// Light armor pull toward enemy artillery.
    pub arty_hunt: f32,
    /// Fodder infantry pull toward artillery or anti-tank infantry.
    pub fodder_priority: f32,
    /// Fodder infantry pull toward anything when no priority target exists.
    pub fodder: f32,
    /// Tank pull toward damaged vehicles just outside range.
    pub armor_harvest: f32,
    /// Armor push away from anti-tank infantry.
    pub death_zone: f32,
    /// Infantry push away from crowded friendly infantry.
    pub friendly: f32,
    /// Manhattan distance below which anti-tank infantry repels armor.
    pub death_zone_distance: u32,
    /// Manhattan distance below which friendly infantry repel each other.
    pub friendly_distance: u32,
    /// Width of the harvest band beyond weapon range.
    pub harvest_band: f32,
    /// Health ratio below which a vehicle counts as damaged.
    pub damaged_health: f32,
    /// Force components below this magnitude produce no move.
    pub deadband: f32,
    /// Spatial grid cell size.
    pub grid_cell: u32,
}

impl Default for FieldWeights {
    fn default() -> Self {
        Self {
            target: 0.5,
            arty_hunt: 2.5,
            fodder_priority: 3.0,
            fodder: 1.5,
            armor_harvest: 2.0,
            death_zone: 4.0,
            friendly: 6.0,
            death_zone_distance: 5,
            friendly_distance: 2,
            harvest_band: 4.0,
            damaged_health: 0.35,
            deadband: 0.1,
            grid_cell: 10,
        }
    }
}

/// Hard-interrupt thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterruptConfig {
    /// Health ratio below which fragile units retreat and vehicles get harvested.
    pub fragile_health: f32,
    /// Manhattan radius in which enemy tanks trigger a retreat.
    pub retreat_threat_distance: u32,
    /// Cells moved by one retreat.
    pub retreat_steps: u32,
    /// Wall time before a unit may retreat again.
    pub retreat_cooldown_ms: u64,
    /// Manhattan radius for the heavy-tank threat strip.
    pub strip_distance: u32,
}

impl Default for InterruptConfig {
    fn default() -> Self {
        Self {
            fragile_health: 0.35,
            retreat_threat_distance: 6,
            retreat_steps: 3,
            retreat_cooldown_ms: 5_000,
            strip_distance: 6,
        }
    }
}

/// Entity store settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Manhattan radius for threat scoring.
    pub threat_radius: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { threat_radius: 15 }
    }
}

/// Assignment guard settings.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    /// Limit cohesion fallback to neighbors within this Manhattan distance.
    /// `None` searches the whole friendly set.
    pub cohesion_radius: Option<u32>,
}

/// Top-level configuration.
///
/// # Example
///
/// ```
/// use skirmish_core::config::CoreConfig;
///
/// let config = CoreConfig::with_endpoint("127.0.0.1", 9000);
/// assert_eq!(config.remote.port, 9000);
/// assert_eq!(config.retreat_cooldown_ticks(), 50);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// Remote client.
    pub remote: RemoteConfig,
    /// Loop timing.
    pub runtime: LoopConfig,
    /// Field navigator.
    pub field: FieldWeights,
    /// Interrupt arbiter.
    pub interrupt: InterruptConfig,
    /// Entity store.
    pub store: StoreConfig,
    /// Assignment guard.
    pub guard: GuardConfig,
}

impl CoreConfig {
    /// Default configuration pointed at another endpoint.
    #[must_use]
    pub fn with_endpoint(host: &str, port: u16) -> Self {
        Self {
            remote: RemoteConfig {
                host: host.to_owned(),
                port,
                ..RemoteConfig::default()
            },
            ..Self::default()
        }
    }

    /// Loads a JSON file. Missing fields keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ConfigFile`] if the file cannot be read or parsed,
    /// and [`CoreError::Config`] if a value is out of range.
    pub fn from_json_file(path: impl AsRef<Path>) -> CoreResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|err| CoreError::ConfigFile {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|err| CoreError::ConfigFile {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that every value is usable.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Config`] naming the first offending field.
    pub fn validate(&self) -> CoreResult<()> {
        fn reject(msg: &str) -> CoreResult<()> {
            Err(CoreError::Config(msg.to_owned()))
        }

        if self.runtime.tick_period_ms == 0 {
            return reject("runtime.tick_period_ms must be positive");
        }
        if self.runtime.stop_timeout_ms == 0 {
            return reject("runtime.stop_timeout_ms must be positive");
        }
        if self.remote.timeout_ms == 0 {
            return reject("remote.timeout_ms must be positive");
        }
        if self.remote.host.is_empty() {
            return reject("remote.host must not be empty");
        }
        if self.field.grid_cell == 0 {
            return reject("field.grid_cell must be positive");
        }
        if self.field.deadband.is_nan() || self.field.deadband < 0.0 {
            return reject("field.deadband must be non-negative");
        }
        let fragile = self.interrupt.fragile_health;
        if fragile.is_nan() || fragile <= 0.0 || fragile > 1.0 {
            return reject("interrupt.fragile_health must be in (0, 1]");
        }
        Ok(())
    }

    /// Retreat cooldown expressed in whole ticks, rounded up, at least one.
    #[must_use]
    pub fn retreat_cooldown_ticks(&self) -> u64 {
        let period = self.runtime.tick_period_ms.max(1);
        self.interrupt.retreat_cooldown_ms.div_ceil(period).max(1)
    }
}
