//! The two opposing sides and their per-side state.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::catalog::UnitKind;
use crate::error::GameError;
use crate::hero::Hero;
use crate::math::Fixed;
use crate::unit::UnitStorage;

/// One end of the lane.
///
/// `Left` marches toward increasing positions, `Right` toward decreasing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    /// Base at the low end of the lane.
    Left,
    /// Base at the high end of the lane.
    Right,
}

impl Side {
    /// Both sides, in resolution order.
    pub const BOTH: [Self; 2] = [Self::Left, Self::Right];

    /// Array index for per-side storage.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Left => 0,
            Self::Right => 1,
        }
    }

    /// The other side.
    #[must_use]
    pub const fn opponent(self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }

    /// Move `position` forward (toward the enemy base) by `distance`.
    #[must_use]
    pub fn forward(self, position: Fixed, distance: Fixed) -> Fixed {
        match self {
            Self::Left => position + distance,
            Self::Right => position - distance,
        }
    }

    /// Whether `position` is at or past `line` in this side's marching
    /// direction.
    #[must_use]
    pub fn has_reached(self, position: Fixed, line: Fixed) -> bool {
        match self {
            Self::Left => position >= line,
            Self::Right => position <= line,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Left => f.write_str("left"),
            Self::Right => f.write_str("right"),
        }
    }
}

impl FromStr for Side {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "left" | "player" => Ok(Self::Left),
            "right" | "enemy" | "opponent" => Ok(Self::Right),
            _ => Err(GameError::UnknownSide(s.to_string())),
        }
    }
}

/// Running tallies for one side.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SideStats {
    /// Enemy hero defeats credited to this side.
    pub hero_kills: u32,
    /// Enemy units destroyed.
    pub units_killed: u32,
    /// Own units destroyed.
    pub units_lost: u32,
    /// Total damage dealt to the enemy base.
    pub siege_damage: u32,
}

/// Everything owned by one side of the battle.
#[derive(Debug, Clone)]
pub struct SideState {
    /// The side's hero.
    pub hero: Hero,
    /// Units waiting for the next wave. Order is not meaningful.
    pub queue: Vec<UnitKind>,
    /// Base health, clamped at zero.
    pub base_health: i32,
    /// Live units on the lane.
    pub units: UnitStorage,
    /// Kill and damage tallies.
    pub stats: SideStats,
}

impl SideState {
    /// Create a side with an empty lane and queue.
    #[must_use]
    pub fn new(hero: Hero, base_health: i32) -> Self {
        Self {
            hero,
            queue: Vec::new(),
            base_health,
            units: UnitStorage::new(),
            stats: SideStats::default(),
        }
    }

    /// Subtract siege damage, clamping at zero. Returns the damage
    /// actually applied.
    pub fn damage_base(&mut self, amount: i32) -> i32 {
        let applied = amount.clamp(0, self.base_health.max(0));
        self.base_health -= applied;
        applied
    }

    /// Whether this side's base has fallen.
    #[must_use]
    pub const fn base_destroyed(&self) -> bool {
        self.base_health <= 0
    }
}
