//! Tracked entities: the per-tick picture of every observed unit.
//!
//! This module provides the core data types shared by every tactical component:
//! - [`UnitId`]: Stable identifier assigned by the game process
//! - [`Side`]: Which map (friendly or enemy) an entity lives in
//! - [`GridPos`]: Integer grid coordinates with the two distance metrics in use
//! - [`TrackedEntity`]: One observed unit plus its derived tactical state
//!
//! Classification data (unit codes, categories, weapon ranges) lives in
//! [`catalog`].
//!
//! # Example
//!
//! ```
//! use skirmish_core::entity::{GridPos, Side, TrackedEntity, UnitCategory, UnitId};
//!
//! let tank = TrackedEntity::new(UnitId::new(7), Side::Friendly, "3TNK", GridPos::new(10, 10));
//!
//! assert_eq!(tank.unit_code, "3tnk");
//! assert_eq!(tank.category, UnitCategory::Mbt);
//! assert!((tank.health_ratio - 1.0).abs() < f32::EPSILON);
//! ```

pub mod catalog;

use std::fmt;

use glam::Vec2;
use serde::{Deserialize, Serialize};

pub use catalog::{CategoryMask, UnitCategory};

/// Identifier of a unit as reported by the game process.
///
/// Stable for the unit's lifetime. Ordered numerically, which gives every map
/// keyed by `UnitId` a deterministic iteration order.
///
/// # Example
///
/// ```
/// use skirmish_core::entity::UnitId;
///
/// let a = UnitId::new(1);
/// let b = UnitId::new(2);
/// assert!(a < b);
/// assert_eq!(b.as_u64(), 2);
/// ```
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitId(u64);

impl UnitId {
    /// Creates a new `UnitId` from the raw wire value.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw wire value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UnitId({})", self.0)
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for UnitId {
    fn from(id: u64) -> Self {
        Self::new(id)
    }
}

impl From<UnitId> for u64 {
    fn from(id: UnitId) -> Self {
        id.0
    }
}

/// Allegiance of an observed unit.
///
/// Serialized with the faction names the game process expects in queries.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    /// Units under our control.
    #[serde(rename = "己方")]
    Friendly,
    /// Hostile units.
    #[serde(rename = "敌方")]
    Enemy,
}

impl Side {
    /// Both sides, in refresh order.
    pub const ALL: [Side; 2] = [Side::Friendly, Side::Enemy];

    /// Faction name used on the wire.
    #[must_use]
    pub const fn wire_name(self) -> &'static str {
        match self {
            Self::Friendly => "己方",
            Self::Enemy => "敌方",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Friendly => write!(f, "Friendly"),
            Self::Enemy => write!(f, "Enemy"),
        }
    }
}

/// Integer grid coordinates. `+y` points south.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct GridPos {
    /// Column.
    pub x: i32,
    /// Row.
    pub y: i32,
}

impl GridPos {
    /// Creates a grid position.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// `|dx| + |dy|`, saturating at `u32::MAX`. Used for most range checks.
    #[must_use]
    pub const fn manhattan(self, other: Self) -> u32 {
        self.x.abs_diff(other.x).saturating_add(self.y.abs_diff(other.y))
    }

    /// Straight-line distance. Used where weapon ranges are compared.
    #[must_use]
    pub fn euclidean(self, other: Self) -> f32 {
        self.as_vec2().distance(other.as_vec2())
    }

    /// Vector from `self` to `other`.
    #[must_use]
    pub fn delta_to(self, other: Self) -> Vec2 {
        other.as_vec2() - self.as_vec2()
    }

    /// Position as a float vector.
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn as_vec2(self) -> Vec2 {
        Vec2::new(self.x as f32, self.y as f32)
    }
}

impl fmt::Display for GridPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// One observed unit plus the tactical state derived for it.
///
/// Entities are created on first observation, updated in place on later
/// observations and dropped the first refresh they are missing from. Only the
/// [`EntityStore`](crate::store::EntityStore) holds them; other components see
/// shared references for the duration of a tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedEntity {
    /// Identifier from the game process.
    pub id: UnitId,
    /// Which map the entity lives in.
    pub side: Side,
    /// Canonical unit code (aliases collapsed, lower case).
    pub unit_code: String,
    /// Category derived once from `unit_code`.
    pub category: UnitCategory,
    /// `hp / max_hp`, clamped to `[0, 1]`; 1.0 when unknown.
    pub health_ratio: f32,
    /// Absolute hit points when the game reported them.
    pub hp: Option<i64>,
    /// Last observed position.
    pub position: GridPos,
    /// Proximity-weighted enemy pressure. Friendly entities only.
    pub threat_level: f32,
    /// True while the unit was seen this tick.
    pub is_active: bool,
    /// Current attack target. Friendly entities only; validated by the
    /// assignment guard every tick.
    pub assigned_target: Option<UnitId>,
}

impl TrackedEntity {
    /// Creates an entity at full health from a raw type string.
    ///
    /// The type is normalized through the [`catalog`] and the category is
    /// looked up once here.
    #[must_use]
    pub fn new(id: UnitId, side: Side, raw_type: &str, position: GridPos) -> Self {
        let unit_code = catalog::normalize_code(raw_type);
        let category = catalog::category_of(&unit_code);
        Self {
            id,
            side,
            unit_code,
            category,
            health_ratio: 1.0,
            hp: None,
            position,
            threat_level: 0.0,
            is_active: true,
            assigned_target: None,
        }
    }

    /// Sets health from absolute values, returning `self` for chaining.
    #[must_use]
    pub fn with_health(mut self, hp: Option<i64>, max_hp: Option<i64>) -> Self {
        self.set_health(hp, max_hp);
        self
    }

    /// Updates `hp` and `health_ratio` from absolute values.
    ///
    /// The ratio falls back to 1.0 when either value is missing or `max_hp`
    /// is not positive.
    #[allow(clippy::cast_precision_loss)]
    pub fn set_health(&mut self, hp: Option<i64>, max_hp: Option<i64>) {
        self.hp = hp;
        self.health_ratio = match (hp, max_hp) {
            (Some(hp), Some(max)) if max > 0 => (hp as f32 / max as f32).clamp(0.0, 1.0),
            _ => 1.0,
        };
    }

    /// Weapon range for this unit's code.
    #[must_use]
    pub fn weapon_range(&self) -> f32 {
        catalog::weapon_range(&self.unit_code)
    }

    /// Returns true if this entity's category is in `mask`.
    #[must_use]
    pub fn is_in(&self, mask: CategoryMask) -> bool {
        mask.contains(self.category.mask())
    }

    /// Manhattan distance to another entity.
    #[must_use]
    pub fn manhattan_to(&self, other: &TrackedEntity) -> u32 {
        self.position.manhattan(other.position)
    }

    /// Euclidean distance to another entity.
    #[must_use]
    pub fn euclidean_to(&self, other: &TrackedEntity) -> f32 {
        self.position.euclidean(other.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod unit_id_tests {
        use super::*;

        #[test]
        fn ordering_is_numeric() {
            let mut ids = vec![UnitId::new(3), UnitId::new(1), UnitId::new(2)];
            ids.sort();
            assert_eq!(ids, vec![UnitId::new(1), UnitId::new(2), UnitId::new(3)]);
        }

        #[test]
        fn debug_and_display() {
            let id = UnitId::new(42);
            assert_eq!(format!("{id:?}"), "UnitId(42)");
            assert_eq!(format!("{id}"), "42");
        }

        #[test]
        fn serializes_as_bare_integer() {
            let json = serde_json::to_string(&UnitId::new(12345)).unwrap();
            assert_eq!(json, "12345");
        }
    }

    mod side_tests {
        use super::*;

        #[test]
        fn wire_names_match_serde() {
            for side in Side::ALL {
                let json = serde_json::to_string(&side).unwrap();
                assert_eq!(json, format!("\"{}\"", side.wire_name()));
            }
        }
    }

    mod grid_pos_tests {
        use super::*;

        #[test]
        fn manhattan_distance() {
            let a = GridPos::new(10, 10);
            assert_eq!(a.manhattan(GridPos::new(10, 15)), 5);
            assert_eq!(a.manhattan(GridPos::new(7, 14)), 7);
            assert_eq!(a.manhattan(a), 0);
        }

        #[test]
        fn manhattan_saturates_at_extreme_coordinates() {
            let a = GridPos::new(i32::MIN, i32::MIN);
            let b = GridPos::new(i32::MAX, i32::MAX);
            assert_eq!(a.manhattan(b), u32::MAX);
            assert_eq!(b.manhattan(a), u32::MAX);
        }

        #[test]
        fn euclidean_distance() {
            let a = GridPos::new(0, 0);
            assert!((a.euclidean(GridPos::new(3, 4)) - 5.0).abs() < 1e-6);
        }

        #[test]
        fn delta_points_at_other() {
            let d = GridPos::new(1, 1).delta_to(GridPos::new(4, -1));
            assert_eq!(d, Vec2::new(3.0, -2.0));
        }
    }

    mod tracked_entity_tests {
        use super::*;

        #[test]
        fn new_normalizes_and_classifies() {
            let e = TrackedEntity::new(UnitId::new(1), Side::Enemy, "V2RL", GridPos::new(0, 0));
            assert_eq!(e.unit_code, "v2rl");
            assert_eq!(e.category, UnitCategory::Arty);
            assert!(e.is_active);
            assert!(e.assigned_target.is_none());
        }

        #[test]
        fn health_ratio_from_absolute_values() {
            let e = TrackedEntity::new(UnitId::new(1), Side::Enemy, "3tnk", GridPos::default())
                .with_health(Some(30), Some(100));
            assert!((e.health_ratio - 0.3).abs() < 1e-6);
            assert_eq!(e.hp, Some(30));
        }

        #[test]
        fn health_ratio_defaults_when_unknown() {
            let mut e = TrackedEntity::new(UnitId::new(1), Side::Enemy, "3tnk", GridPos::default());
            e.set_health(None, Some(100));
            assert!((e.health_ratio - 1.0).abs() < f32::EPSILON);
            e.set_health(Some(50), Some(0));
            assert!((e.health_ratio - 1.0).abs() < f32::EPSILON);
        }

        #[test]
        fn health_ratio_is_clamped() {
            let e = TrackedEntity::new(UnitId::new(1), Side::Enemy, "3tnk", GridPos::default())
                .with_health(Some(150), Some(100));
            assert!((e.health_ratio - 1.0).abs() < f32::EPSILON);

            let e = TrackedEntity::new(UnitId::new(1), Side::Enemy, "3tnk", GridPos::default())
                .with_health(Some(-5), Some(100));
            assert!(e.health_ratio.abs() < f32::EPSILON);
        }

        #[test]
        fn category_mask_membership() {
            let e = TrackedEntity::new(UnitId::new(1), Side::Enemy, "ftrk", GridPos::default());
            assert!(e.is_in(CategoryMask::VEHICLE));
            assert!(!e.is_in(CategoryMask::INFANTRY));
        }
    }
}
