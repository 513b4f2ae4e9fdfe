//! Static catalog of unit archetypes.
//!
//! The archetype set is closed: every spawnable unit is one of the
//! [`UnitKind`] variants, and each variant maps to a single immutable
//! [`UnitArchetype`] shared by every instance spawned from it.
//!
//! # Example
//!
//! ```
//! use lane_core::catalog::UnitKind;
//!
//! let archer: UnitKind = "archer".parse().unwrap();
//! assert_eq!(archer.archetype().cost, 65);
//! assert!(archer.archetype().range > UnitKind::Soldier.archetype().range);
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::GameError;

/// Identifier of a unit archetype.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitKind {
    /// Cheap, fragile, small income bump.
    Scout,
    /// Balanced melee fighter.
    Soldier,
    /// Long reach, moderate damage.
    Archer,
    /// Heavy melee unit.
    Knight,
    /// Slow but devastating against bases.
    SiegeGolem,
}

/// Immutable stats for one unit archetype.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UnitArchetype {
    /// Which archetype this is.
    pub kind: UnitKind,
    /// Display name.
    pub name: &'static str,
    /// Gold cost to queue.
    pub cost: u32,
    /// Starting health.
    pub health: i32,
    /// Flat damage per hit, against units, heroes and bases alike.
    pub damage: i32,
    /// Permanent income increase granted when queued.
    pub income_bonus: u32,
    /// Attack reach in lane units, measured between centers.
    pub range: i32,
    /// Flavor text.
    pub description: &'static str,
}

static CATALOG: [UnitArchetype; 5] = [
    UnitArchetype {
        kind: UnitKind::Scout,
        name: "Scout",
        cost: 35,
        health: 20,
        damage: 6,
        income_bonus: 2,
        range: 36,
        description: "A cheap and fast unit that increases income slightly.",
    },
    UnitArchetype {
        kind: UnitKind::Soldier,
        name: "Soldier",
        cost: 50,
        health: 35,
        damage: 9,
        income_bonus: 3,
        range: 40,
        description: "Balanced melee fighter.",
    },
    UnitArchetype {
        kind: UnitKind::Archer,
        name: "Archer",
        cost: 65,
        health: 30,
        damage: 12,
        income_bonus: 4,
        range: 160,
        description: "Ranged attacker that deals reliable damage.",
    },
    UnitArchetype {
        kind: UnitKind::Knight,
        name: "Knight",
        cost: 90,
        health: 55,
        damage: 16,
        income_bonus: 6,
        range: 42,
        description: "Heavy unit with strong damage.",
    },
    UnitArchetype {
        kind: UnitKind::SiegeGolem,
        name: "Siege Golem",
        cost: 120,
        health: 80,
        damage: 25,
        income_bonus: 8,
        range: 50,
        description: "Slow but devastating against bases.",
    },
];

impl UnitKind {
    /// Every archetype, in catalog order.
    pub const ALL: [Self; 5] = [
        Self::Scout,
        Self::Soldier,
        Self::Archer,
        Self::Knight,
        Self::SiegeGolem,
    ];

    /// Look up this kind's catalog entry.
    #[must_use]
    pub fn archetype(self) -> &'static UnitArchetype {
        &CATALOG[self as usize]
    }

    /// Stable snake_case identifier used by commands and data files.
    #[must_use]
    pub const fn id(self) -> &'static str {
        match self {
            Self::Scout => "scout",
            Self::Soldier => "soldier",
            Self::Archer => "archer",
            Self::Knight => "knight",
            Self::SiegeGolem => "siege_golem",
        }
    }

    /// All kinds purchasable with `gold`, in catalog order.
    pub fn affordable(gold: u32) -> impl Iterator<Item = Self> {
        Self::ALL
            .into_iter()
            .filter(move |kind| kind.archetype().cost <= gold)
    }
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.archetype().name)
    }
}

impl FromStr for UnitKind {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        Self::ALL
            .into_iter()
            .find(|kind| kind.id() == wanted)
            .ok_or_else(|| GameError::UnknownUnitType(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_order_matches_kind() {
        for kind in UnitKind::ALL {
            assert_eq!(kind.archetype().kind, kind);
        }
    }

    #[test]
    fn test_parse_accepts_display_and_id_forms() {
        assert_eq!("siege_golem".parse::<UnitKind>(), Ok(UnitKind::SiegeGolem));
        assert_eq!("Siege Golem".parse::<UnitKind>(), Ok(UnitKind::SiegeGolem));
        assert_eq!(" Knight ".parse::<UnitKind>(), Ok(UnitKind::Knight));
        assert!(matches!(
            "dragon".parse::<UnitKind>(),
            Err(GameError::UnknownUnitType(_))
        ));
    }

    #[test]
    fn test_affordable_filters_by_cost() {
        let kinds: Vec<_> = UnitKind::affordable(64).collect();
        assert_eq!(kinds, vec![UnitKind::Scout, UnitKind::Soldier]);
        assert_eq!(UnitKind::affordable(0).count(), 0);
        assert_eq!(UnitKind::affordable(u32::MAX).count(), 5);
    }

    #[test]
    fn test_every_archetype_is_viable() {
        for kind in UnitKind::ALL {
            let a = kind.archetype();
            assert!(a.health > 0, "{kind} has no health");
            assert!(a.damage > 0, "{kind} deals no damage");
            assert!(a.range > 0, "{kind} has no reach");
        }
    }
}
