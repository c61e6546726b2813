//! Entity store: the authoritative per-tick snapshot of both sides.
//!
//! The store exclusively owns the friendly and enemy maps. Other components
//! borrow entities for the duration of a tick and request mutation through
//! [`EntityStore::set_assignment`]; nothing holds a copy across ticks.
//!
//! # Refresh semantics
//!
//! - Both sides are fetched first. If either fetch fails, both maps are
//!   cleared and the error is returned; no stale state survives a failed
//!   observation.
//! - Units without a position or with a blacklisted code are skipped.
//! - Ids seen this pass are upserted in place; every previously known id of
//!   that side that was not seen is dropped (mark-and-sweep).
//! - An id never lives in both maps. If the server reports the same id on
//!   both sides, the friendly report wins.
//! - Threat is recomputed for every active, classified friendly unit.
//!
//! # Example
//!
//! ```
//! use skirmish_core::config::StoreConfig;
//! use skirmish_core::entity::{Side, UnitId};
//! use skirmish_core::remote::RawUnit;
//! use skirmish_core::store::EntityStore;
//!
//! let mut store = EntityStore::new(StoreConfig::default());
//! store.apply_observation(
//!     vec![RawUnit::new(1, "3tnk", 10, 10)],
//!     vec![RawUnit::new(2, "v2rl", 10, 15)],
//! );
//!
//! assert_eq!(store.get_distance(UnitId::new(1), UnitId::new(2)), 5);
//! assert!(store.get_entity(UnitId::new(1)).unwrap().threat_level > 0.0);
//! ```

use std::collections::{BTreeMap, BTreeSet};

use crate::config::StoreConfig;
use crate::entity::catalog;
use crate::entity::{CategoryMask, GridPos, Side, TrackedEntity, UnitCategory, UnitId};
use crate::error::TransportResult;
use crate::remote::{RawUnit, UnitGateway};

/// Distance reported when either id is unknown.
pub const UNKNOWN_DISTANCE: u32 = 9999;

/// What one successful refresh observed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshSummary {
    /// Friendly units kept.
    pub friendly: usize,
    /// Enemy units kept.
    pub enemy: usize,
    /// Raw units dropped (no position, blacklisted, or claimed by both sides).
    pub skipped: usize,
}

/// Owner of both entity maps.
#[derive(Debug, Clone)]
pub struct EntityStore {
    config: StoreConfig,
    friendly: BTreeMap<UnitId, TrackedEntity>,
    enemy: BTreeMap<UnitId, TrackedEntity>,
}

impl EntityStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new(config: StoreConfig) -> Self {
        Self {
            config,
            friendly: BTreeMap::new(),
            enemy: BTreeMap::new(),
        }
    }

    // =========================================================================
    // Refresh
    // =========================================================================

    /// Fetches both sides and synchronizes the maps.
    ///
    /// # Errors
    ///
    /// Returns the first transport error. Both maps are empty afterwards.
    pub fn refresh(&mut self, gateway: &mut dyn UnitGateway) -> TransportResult<RefreshSummary> {
        let observed = match gateway.list_units(Side::Friendly) {
            Ok(friendly) => gateway.list_units(Side::Enemy).map(|enemy| (friendly, enemy)),
            Err(err) => Err(err),
        };

        match observed {
            Ok((friendly, enemy)) => Ok(self.apply_observation(friendly, enemy)),
            Err(err) => {
                self.clear();
                Err(err)
            }
        }
    }

    /// Synchronizes the maps with one complete observation of both sides.
    pub fn apply_observation(&mut self, friendly: Vec<RawUnit>, enemy: Vec<RawUnit>) -> RefreshSummary {
        let mut skipped = self.sync_side(Side::Friendly, friendly);
        skipped += self.sync_side(Side::Enemy, enemy);
        self.recompute_threat();

        RefreshSummary {
            friendly: self.friendly.len(),
            enemy: self.enemy.len(),
            skipped,
        }
    }

    /// Drops every entity.
    pub fn clear(&mut self) {
        self.friendly.clear();
        self.enemy.clear();
    }

    fn sync_side(&mut self, side: Side, units: Vec<RawUnit>) -> usize {
        let mut seen = BTreeSet::new();
        let mut skipped = 0;

        for raw in units {
            let Some(position) = raw.position.map(GridPos::from) else {
                tracing::trace!(id = %raw.id, "skipping unit without position");
                skipped += 1;
                continue;
            };
            let code = catalog::normalize_code(&raw.unit_type);
            if catalog::is_ignored(&code) {
                tracing::trace!(id = %raw.id, code = %code, "skipping blacklisted unit");
                skipped += 1;
                continue;
            }
            if side == Side::Enemy && self.friendly.contains_key(&raw.id) {
                tracing::trace!(id = %raw.id, "id reported on both sides, keeping friendly");
                skipped += 1;
                continue;
            }

            seen.insert(raw.id);
            let map = match side {
                Side::Friendly => {
                    self.enemy.remove(&raw.id);
                    &mut self.friendly
                }
                Side::Enemy => &mut self.enemy,
            };
            match map.get_mut(&raw.id) {
                Some(entity) => {
                    if entity.unit_code != code {
                        entity.category = catalog::category_of(&code);
                        entity.unit_code = code;
                    }
                    entity.position = position;
                    entity.set_health(raw.hp, raw.max_hp);
                    entity.is_active = true;
                }
                None => {
                    let entity = TrackedEntity::new(raw.id, side, &code, position)
                        .with_health(raw.hp, raw.max_hp);
                    map.insert(raw.id, entity);
                }
            }
        }

        let map = match side {
            Side::Friendly => &mut self.friendly,
            Side::Enemy => &mut self.enemy,
        };
        map.retain(|id, _| seen.contains(id));
        skipped
    }

    #[allow(clippy::cast_precision_loss)]
    fn recompute_threat(&mut self) {
        let radius = self.config.threat_radius;
        let enemies = &self.enemy;
        for unit in self.friendly.values_mut() {
            if !unit.is_active || unit.category == UnitCategory::Other {
                unit.threat_level = 0.0;
                continue;
            }
            unit.threat_level = enemies
                .values()
                .filter(|enemy| enemy.is_active)
                .filter_map(|enemy| {
                    let dist = unit.manhattan_to(enemy);
                    (dist <= radius).then(|| threat_weight(unit, enemy) / dist.max(1) as f32)
                })
                .sum();
        }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Looks an id up in either map.
    #[must_use]
    pub fn get_entity(&self, id: UnitId) -> Option<&TrackedEntity> {
        self.friendly.get(&id).or_else(|| self.enemy.get(&id))
    }

    /// Manhattan distance between two known ids, or [`UNKNOWN_DISTANCE`].
    #[must_use]
    pub fn get_distance(&self, a: UnitId, b: UnitId) -> u32 {
        match (self.get_entity(a), self.get_entity(b)) {
            (Some(a), Some(b)) => a.manhattan_to(b),
            _ => UNKNOWN_DISTANCE,
        }
    }

    /// Sets or clears a friendly unit's target without validating it.
    ///
    /// Returns false if `attacker` is not a known friendly unit.
    pub fn set_assignment(&mut self, attacker: UnitId, target: Option<UnitId>) -> bool {
        match self.friendly.get_mut(&attacker) {
            Some(unit) => {
                unit.assigned_target = target;
                true
            }
            None => false,
        }
    }

    /// Returns true if `id` is an active enemy.
    #[must_use]
    pub fn is_active_enemy(&self, id: UnitId) -> bool {
        self.enemy.get(&id).is_some_and(|e| e.is_active)
    }

    /// Returns true if `id` is a known friendly unit.
    #[must_use]
    pub fn is_friendly(&self, id: UnitId) -> bool {
        self.friendly.contains_key(&id)
    }

    /// Friendly units in id order.
    pub fn friendlies(&self) -> impl Iterator<Item = &TrackedEntity> + '_ {
        self.friendly.values()
    }

    /// Enemy units in id order.
    pub fn enemies(&self) -> impl Iterator<Item = &TrackedEntity> + '_ {
        self.enemy.values()
    }

    /// Active friendly units in id order.
    pub fn active_friendlies(&self) -> impl Iterator<Item = &TrackedEntity> + '_ {
        self.friendly.values().filter(|e| e.is_active)
    }

    /// Active enemy units in id order.
    pub fn active_enemies(&self) -> impl Iterator<Item = &TrackedEntity> + '_ {
        self.enemy.values().filter(|e| e.is_active)
    }

    /// Number of friendly units.
    #[must_use]
    pub fn friendly_count(&self) -> usize {
        self.friendly.len()
    }

    /// Number of enemy units.
    #[must_use]
    pub fn enemy_count(&self) -> usize {
        self.enemy.len()
    }

    /// Returns true if neither map holds anything.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.friendly.is_empty() && self.enemy.is_empty()
    }
}

impl Default for EntityStore {
    fn default() -> Self {
        Self::new(StoreConfig::default())
    }
}

/// Base pressure one enemy puts on one friendly unit.
fn threat_weight(unit: &TrackedEntity, enemy: &TrackedEntity) -> f32 {
    match enemy.category {
        UnitCategory::Arty => 15.0,
        UnitCategory::InfAt if unit.is_in(CategoryMask::ARMOR) => 20.0,
        _ => 10.0,
    }
}
