//! Read-only views of the battle for renderers and drivers.
//!
//! Snapshots are plain data: positions are converted to `f64` and hero
//! pools are clamped for display.

use serde::{Deserialize, Serialize};

use crate::catalog::UnitKind;
use crate::side::{Side, SideStats};
use crate::unit::UnitId;

/// Final result of a decided battle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Outcome {
    /// Side whose base survived.
    pub winner: Side,
    /// Tick on which the losing base fell.
    pub tick: u64,
    /// Base health at the end, indexed by [`Side::index`].
    pub base_health: [i32; 2],
}

/// Display state of one hero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeroSnapshot {
    /// Hero name.
    pub name: String,
    /// Health clamped to `[0, max]`.
    pub health: i32,
    /// Maximum health.
    pub max_health: i32,
    /// Shield clamped to `[0, max]`.
    pub shield: i32,
    /// Maximum shield.
    pub max_shield: i32,
    /// Attack including items.
    pub attack: i32,
    /// Defense including items.
    pub defense: i32,
    /// Gold on hand.
    pub gold: u32,
    /// Gold per payout.
    pub income: u32,
    /// Lane position.
    pub position: f64,
    /// Requested lane position.
    pub destination: f64,
    /// Whether the hero is on the lane.
    pub alive: bool,
    /// Ticks until respawn; zero while alive.
    pub respawn_countdown: u32,
    /// Names of applied items.
    pub items: Vec<String>,
}

/// Display state of one unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitSnapshot {
    /// Identifier within the owning side.
    pub id: UnitId,
    /// Archetype.
    pub kind: UnitKind,
    /// Lane position of the unit's center.
    pub position: f64,
    /// Current health.
    pub health: i32,
    /// In combat contact this tick.
    pub engaged: bool,
}

/// Display state of one side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SideSnapshot {
    /// Which side.
    pub side: Side,
    /// The side's hero.
    pub hero: HeroSnapshot,
    /// Base health.
    pub base_health: i32,
    /// Units on the lane, in ID order.
    pub units: Vec<UnitSnapshot>,
    /// Units waiting for the next wave.
    pub queued: Vec<UnitKind>,
    /// Kill and damage tallies.
    pub stats: SideStats,
}

/// Everything a renderer needs after a tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattleSnapshot {
    /// Ticks completed.
    pub tick: u64,
    /// Left then right.
    pub sides: [SideSnapshot; 2],
    /// Ticks until the next wave launches.
    pub ticks_until_next_wave: u32,
    /// Short description of the most recent notable event.
    pub last_event: String,
    /// Set once the battle is decided.
    pub outcome: Option<Outcome>,
}

impl BattleSnapshot {
    /// Per-side view.
    #[must_use]
    pub fn side(&self, side: Side) -> &SideSnapshot {
        &self.sides[side.index()]
    }

    /// Whether the battle has ended.
    #[must_use]
    pub fn is_over(&self) -> bool {
        self.outcome.is_some()
    }

    /// Kill counts, left then right.
    #[must_use]
    pub fn kills(&self) -> [u32; 2] {
        [self.sides[0].stats.hero_kills, self.sides[1].stats.hero_kills]
    }
}
