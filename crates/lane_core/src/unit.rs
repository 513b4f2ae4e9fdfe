//! Spawned combat units and their per-side arena.

use std::collections::HashMap;

use crate::catalog::{UnitArchetype, UnitKind};
use crate::math::Fixed;
use crate::side::Side;

/// Unit identifier, unique within one side's storage.
pub type UnitId = u32;

/// A mobile, disposable unit spawned from a catalog archetype.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CombatUnit {
    /// Identifier assigned by [`UnitStorage::insert`].
    pub id: UnitId,
    /// Archetype this unit was spawned from.
    pub kind: UnitKind,
    /// Owning side.
    pub side: Side,
    /// Lane position of the unit's center.
    pub position: Fixed,
    /// Remaining health; removed at end of tick once at or below zero.
    pub health: i32,
    /// Ticks until the next attack on a unit or hero.
    pub attack_cooldown: u32,
    /// Ticks until the next hit on the enemy base.
    pub base_attack_cooldown: u32,
    /// In combat contact this tick.
    pub engaged: bool,
    /// Was in combat contact last tick.
    pub engaged_previous: bool,
    /// Leading edge is on the enemy base line. Recomputed after movement.
    pub at_base: bool,
    /// Last damage taken came from a hero, for bounty accounting.
    pub last_hit_by_hero: bool,
}

impl CombatUnit {
    /// Create a fresh unit at full health.
    #[must_use]
    pub fn new(kind: UnitKind, side: Side, position: Fixed) -> Self {
        Self {
            id: 0,
            kind,
            side,
            position,
            health: kind.archetype().health,
            attack_cooldown: 0,
            base_attack_cooldown: 0,
            engaged: false,
            engaged_previous: false,
            at_base: false,
            last_hit_by_hero: false,
        }
    }

    /// Catalog entry for this unit.
    #[must_use]
    pub fn archetype(&self) -> &'static UnitArchetype {
        self.kind.archetype()
    }

    /// Attack reach in lane units.
    #[must_use]
    pub fn range(&self) -> Fixed {
        Fixed::from_num(self.archetype().range)
    }

    /// Roll the engagement flags forward and tick cooldowns down.
    pub fn begin_tick(&mut self) {
        self.engaged_previous = self.engaged;
        self.engaged = false;
        self.attack_cooldown = self.attack_cooldown.saturating_sub(1);
        self.base_attack_cooldown = self.base_attack_cooldown.saturating_sub(1);
    }

    /// Movement is suppressed for two ticks after any contact.
    #[must_use]
    pub const fn can_advance(&self) -> bool {
        !self.engaged && !self.engaged_previous
    }

    /// Whether the unit has been destroyed this tick.
    #[must_use]
    pub const fn is_dead(&self) -> bool {
        self.health <= 0
    }

    /// Apply flat damage. Returns `true` if this hit took the unit from
    /// positive health to zero or below.
    pub fn take_hit(&mut self, damage: i32, from_hero: bool) -> bool {
        let was_alive = !self.is_dead();
        self.health = self.health.saturating_sub(damage.max(0));
        if was_alive {
            self.last_hit_by_hero = from_hero;
        }
        was_alive && self.is_dead()
    }
}

/// Arena of one side's units with stable identifiers.
#[derive(Debug, Clone, Default)]
pub struct UnitStorage {
    units: HashMap<UnitId, CombatUnit>,
    next_id: UnitId,
}

impl UnitStorage {
    /// Create empty unit storage.
    #[must_use]
    pub fn new() -> Self {
        Self {
            units: HashMap::new(),
            next_id: 1,
        }
    }

    /// Insert a new unit and return its ID.
    pub fn insert(&mut self, mut unit: CombatUnit) -> UnitId {
        let id = self.next_id.max(1);
        self.next_id = id + 1;
        unit.id = id;
        self.units.insert(id, unit);
        id
    }

    /// Remove a unit by ID.
    pub fn remove(&mut self, id: UnitId) -> Option<CombatUnit> {
        self.units.remove(&id)
    }

    /// Get a unit by ID.
    #[must_use]
    pub fn get(&self, id: UnitId) -> Option<&CombatUnit> {
        self.units.get(&id)
    }

    /// Get a mutable reference to a unit by ID.
    pub fn get_mut(&mut self, id: UnitId) -> Option<&mut CombatUnit> {
        self.units.get_mut(&id)
    }

    /// Number of units, dead-but-unswept included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Check if storage is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Get sorted unit IDs for deterministic iteration.
    #[must_use]
    pub fn sorted_ids(&self) -> Vec<UnitId> {
        let mut ids: Vec<_> = self.units.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Units in ID order.
    pub fn iter_sorted(&self) -> impl Iterator<Item = &CombatUnit> + '_ {
        self.sorted_ids()
            .into_iter()
            .filter_map(move |id| self.units.get(&id))
    }

    /// Iterate mutably over all units (not in deterministic order).
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut CombatUnit> {
        self.units.values_mut()
    }

    /// Remove every unit at or below zero health, returning them in ID order.
    pub fn sweep_dead(&mut self) -> Vec<CombatUnit> {
        let mut dead: Vec<_> = self
            .units
            .values()
            .filter(|unit| unit.is_dead())
            .map(|unit| unit.id)
            .collect();
        dead.sort_unstable();
        dead.into_iter()
            .filter_map(|id| self.units.remove(&id))
            .collect()
    }
}
