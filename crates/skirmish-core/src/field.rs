//! Field navigator: small corrective moves from an artificial potential field.
//!
//! Each unit sums a set of additive forces:
//!
//! | Rule | Applies to | Force |
//! |---|---|---|
//! | Target pull | any unit with a live target beyond weapon range | `target` toward it |
//! | Artillery hunt | AFV | `arty_hunt` toward nearest enemy ARTY |
//! | Fodder charge | `INF_MEAT` | `fodder_priority` toward nearest ARTY/`INF_AT`, else `fodder` toward nearest enemy |
//! | Harvest pull | MBT | `armor_harvest` toward nearest damaged vehicle in the band just past weapon range |
//! | Death zone | MBT, AFV | push away from `INF_AT` closer than `death_zone_distance` |
//! | Spacing | infantry | push away from friendly infantry closer than `friendly_distance` |
//!
//! Pulls are normalized by the Manhattan length of the offset. Pushes scale
//! with `weight / (distance + 0.1)` times the raw offset. The resulting vector
//! becomes a single one-cell step along its dominant axis, or nothing inside
//! the deadband.
//!
//! Forces are computed in parallel; results are collected into an ordered map
//! so output never depends on scheduling.

use std::collections::BTreeMap;

use glam::Vec2;
use rayon::prelude::*;

use crate::config::FieldWeights;
use crate::entity::{CategoryMask, TrackedEntity, UnitCategory, UnitId};
use crate::order::{Direction, MoveOrder, OrderReason};
use crate::spatial::SpatialGrid;
use crate::store::EntityStore;

/// Offset added to distances in push forces.
const PUSH_SOFTENING: f32 = 0.1;

/// Floor for the Manhattan norm used by pulls.
const MIN_PULL_NORM: f32 = 0.1;

/// Computes potential-field moves.
#[derive(Debug, Clone, Default)]
pub struct FieldNavigator {
    weights: FieldWeights,
}

impl FieldNavigator {
    /// Creates a navigator.
    #[must_use]
    pub fn new(weights: FieldWeights) -> Self {
        Self { weights }
    }

    /// Weights in use.
    #[must_use]
    pub fn weights(&self) -> &FieldWeights {
        &self.weights
    }

    /// One-step moves for `units`. Inactive units and units whose force sits
    /// inside the deadband are left out.
    ///
    /// Friendly spacing only considers the units passed in, so units claimed
    /// elsewhere neither move nor push.
    #[must_use]
    pub fn compute(&self, store: &EntityStore, units: &[&TrackedEntity]) -> BTreeMap<UnitId, MoveOrder> {
        let enemies: Vec<&TrackedEntity> = store.active_enemies().collect();
        let infantry = SpatialGrid::build(
            self.weights.grid_cell,
            units
                .iter()
                .filter(|unit| unit.is_active && unit.is_in(CategoryMask::INFANTRY))
                .map(|unit| (unit.id, unit.position)),
        );

        units
            .par_iter()
            .filter(|unit| unit.is_active)
            .filter_map(|unit| {
                let force = self.force_on(unit, store, &enemies, &infantry);
                Direction::from_force(force, self.weights.deadband)
                    .map(|dir| (unit.id, MoveOrder::new(unit.id, dir, 1, OrderReason::Field)))
            })
            .collect()
    }

    /// Net force on one unit.
    #[must_use]
    pub fn force_on(
        &self,
        me: &TrackedEntity,
        store: &EntityStore,
        enemies: &[&TrackedEntity],
        infantry: &SpatialGrid,
    ) -> Vec2 {
        let w = &self.weights;
        let mut force = Vec2::ZERO;

        // Assigned enemy target, only while out of range.
        let target = me
            .assigned_target
            .filter(|&id| store.is_active_enemy(id))
            .and_then(|id| store.get_entity(id));
        if let Some(target) = target {
            #[allow(clippy::cast_precision_loss)]
            let dist = me.manhattan_to(target) as f32;
            if dist > me.weapon_range() {
                force += pull(me, target, w.target);
            }
        }

        match me.category {
            UnitCategory::Afv => {
                if let Some(arty) = nearest(me, enemies, CategoryMask::ARTY) {
                    force += pull(me, arty, w.arty_hunt);
                }
            }
            UnitCategory::InfMeat => {
                let priority = CategoryMask::ARTY | CategoryMask::INF_AT;
                if let Some(prey) = nearest(me, enemies, priority) {
                    force += pull(me, prey, w.fodder_priority);
                } else if let Some(prey) = nearest(me, enemies, CategoryMask::all()) {
                    force += pull(me, prey, w.fodder);
                }
            }
            UnitCategory::Mbt => {
                if let Some(prey) = self.harvest_candidate(me, enemies) {
                    force += pull(me, prey, w.armor_harvest);
                }
            }
            _ => {}
        }

        if me.is_in(CategoryMask::ARMOR) {
            for enemy in enemies.iter().filter(|e| e.category == UnitCategory::InfAt) {
                let dist = me.manhattan_to(enemy);
                if dist < w.death_zone_distance {
                    force += push(me.position.as_vec2(), enemy.position.as_vec2(), dist, w.death_zone);
                }
            }
        }

        if me.is_in(CategoryMask::INFANTRY) {
            for (id, pos) in infantry.within(me.position, w.friendly_distance) {
                if id == me.id {
                    continue;
                }
                let dist = me.position.manhattan(pos);
                force += push(me.position.as_vec2(), pos.as_vec2(), dist, w.friendly);
            }
        }

        force
    }

    /// Nearest damaged vehicle strictly inside `(range, range + band)`.
    fn harvest_candidate<'a>(&self, me: &TrackedEntity, enemies: &[&'a TrackedEntity]) -> Option<&'a TrackedEntity> {
        let range = me.weapon_range();
        let outer = range + self.weights.harvest_band;
        let mut best: Option<(f32, &'a TrackedEntity)> = None;
        for enemy in enemies {
            if !enemy.is_in(CategoryMask::VEHICLE) || enemy.health_ratio >= self.weights.damaged_health {
                continue;
            }
            let dist = me.euclidean_to(enemy);
            if dist <= range || dist >= outer {
                continue;
            }
            if best.map_or(true, |(best_dist, _)| dist < best_dist) {
                best = Some((dist, *enemy));
            }
        }
        best.map(|(_, enemy)| enemy)
    }
}

/// Manhattan-nearest active enemy in `mask`. Ties go to the first seen.
fn nearest<'a>(me: &TrackedEntity, enemies: &[&'a TrackedEntity], mask: CategoryMask) -> Option<&'a TrackedEntity> {
    let mut best: Option<(u32, &'a TrackedEntity)> = None;
    for enemy in enemies.iter().filter(|e| e.is_active && e.is_in(mask)) {
        let dist = me.manhattan_to(enemy);
        if best.map_or(true, |(best_dist, _)| dist < best_dist) {
            best = Some((dist, *enemy));
        }
    }
    best.map(|(_, enemy)| enemy)
}

/// Unit pull toward `other`, normalized by Manhattan length.
fn pull(me: &TrackedEntity, other: &TrackedEntity, weight: f32) -> Vec2 {
    let delta = me.position.delta_to(other.position);
    let norm = (delta.x.abs() + delta.y.abs()).max(MIN_PULL_NORM);
    delta / norm * weight
}

/// Push from `from` onto `me`, scaled by the raw offset.
#[allow(clippy::cast_precision_loss)]
fn push(me: Vec2, from: Vec2, dist: u32, weight: f32) -> Vec2 {
    (me - from) * (weight / (dist as f32 + PUSH_SOFTENING))
}
