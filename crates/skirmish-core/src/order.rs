//! Order vocabulary shared by every decision source.
//!
//! The guard, the navigator and the arbiter all speak in the same two order
//! types, tagged with the [`OrderReason`] that produced them:
//! - [`MoveOrder`]: step a unit in one of four [`Direction`]s
//! - [`AttackOrder`]: point an attacker at a target
//!
//! The orchestrator merges them by priority and lowers the winners into
//! [`MoveCommand`]s for the remote client.
//!
//! # Example
//!
//! ```
//! use glam::Vec2;
//! use skirmish_core::order::Direction;
//!
//! assert_eq!(Direction::from_force(Vec2::new(0.0, 0.4), 0.1), Some(Direction::South));
//! assert_eq!(Direction::from_force(Vec2::new(0.05, -0.05), 0.1), None);
//! assert_eq!(Direction::East.inverse(), Direction::West);
//! ```

use std::fmt;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::entity::UnitId;

// =============================================================================
// Direction
// =============================================================================

/// Cardinal step direction. `+y` is south.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// `-y`
    #[serde(rename = "北")]
    North,
    /// `+y`
    #[serde(rename = "南")]
    South,
    /// `+x`
    #[serde(rename = "东")]
    East,
    /// `-x`
    #[serde(rename = "西")]
    West,
}

impl Direction {
    /// Direction name used on the wire.
    #[must_use]
    pub const fn wire_name(self) -> &'static str {
        match self {
            Self::North => "北",
            Self::South => "南",
            Self::East => "东",
            Self::West => "西",
        }
    }

    /// The opposite direction.
    #[must_use]
    pub const fn inverse(self) -> Self {
        match self {
            Self::North => Self::South,
            Self::South => Self::North,
            Self::East => Self::West,
            Self::West => Self::East,
        }
    }

    /// Dominant axis of `delta`. Ties go to the horizontal axis, and a zero
    /// component counts as negative.
    #[must_use]
    pub fn toward(delta: Vec2) -> Self {
        if delta.x.abs() >= delta.y.abs() {
            if delta.x > 0.0 {
                Self::East
            } else {
                Self::West
            }
        } else if delta.y > 0.0 {
            Self::South
        } else {
            Self::North
        }
    }

    /// Discretizes a force vector, or returns `None` when both components are
    /// below `deadband` in magnitude.
    #[must_use]
    pub fn from_force(force: Vec2, deadband: f32) -> Option<Self> {
        if force.x.abs() < deadband && force.y.abs() < deadband {
            return None;
        }
        Some(Self::toward(force))
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::North => "north",
            Self::South => "south",
            Self::East => "east",
            Self::West => "west",
        };
        write!(f, "{name}")
    }
}

// =============================================================================
// Reasons
// =============================================================================

/// Why an order was produced.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderReason {
    /// Potential-field correction.
    Field,
    /// Fragile unit backing away from armor.
    Retreat,
    /// Continuing a locked attack.
    LockedPursuit,
    /// Tank finishing a damaged vehicle in range.
    ArmorHarvest,
    /// Heavy tank clearing nearby anti-tank infantry.
    ThreatStrip,
    /// Still-valid assignment re-issued.
    CarriedOver,
    /// Target borrowed from a same-type neighbor.
    CohesionFallback,
}

impl OrderReason {
    /// Returns true for reasons produced by the interrupt arbiter.
    #[must_use]
    pub const fn is_interrupt(self) -> bool {
        matches!(
            self,
            Self::Retreat | Self::LockedPursuit | Self::ArmorHarvest | Self::ThreatStrip
        )
    }

    /// Short label used in logs.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Field => "field",
            Self::Retreat => "retreat",
            Self::LockedPursuit => "locked-pursuit",
            Self::ArmorHarvest => "armor-harvest",
            Self::ThreatStrip => "threat-strip",
            Self::CarriedOver => "carried-over",
            Self::CohesionFallback => "cohesion-fallback",
        }
    }
}

impl fmt::Display for OrderReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// =============================================================================
// Orders
// =============================================================================

/// Move `steps` cells in `direction`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveOrder {
    /// Unit to move.
    pub unit: UnitId,
    /// Where to go.
    pub direction: Direction,
    /// How many cells.
    pub steps: u32,
    /// Who asked for it.
    pub reason: OrderReason,
}

impl MoveOrder {
    /// Creates a move order.
    #[must_use]
    pub const fn new(unit: UnitId, direction: Direction, steps: u32, reason: OrderReason) -> Self {
        Self {
            unit,
            direction,
            steps,
            reason,
        }
    }

    /// Lowers the order into a wire command. `assault` enables the crush
    /// modifier; attack-move is never used.
    #[must_use]
    pub const fn into_command(self, assault: bool) -> MoveCommand {
        MoveCommand {
            unit: self.unit,
            direction: self.direction,
            distance: self.steps,
            attack_move: false,
            assault_move: assault,
        }
    }
}

/// Attack `target` with `attacker`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttackOrder {
    /// Friendly unit.
    pub attacker: UnitId,
    /// Enemy unit.
    pub target: UnitId,
    /// Who asked for it.
    pub reason: OrderReason,
}

impl AttackOrder {
    /// Creates an attack order.
    #[must_use]
    pub const fn new(attacker: UnitId, target: UnitId, reason: OrderReason) -> Self {
        Self {
            attacker,
            target,
            reason,
        }
    }
}

/// A move as the remote client sends it.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveCommand {
    /// Unit to move.
    pub unit: UnitId,
    /// Where to go.
    pub direction: Direction,
    /// How many cells.
    pub distance: u32,
    /// Engage enemies met on the way.
    pub attack_move: bool,
    /// Crush/assault modifier.
    pub assault_move: bool,
}
