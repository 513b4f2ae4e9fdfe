//! # Lane Core
//!
//! Tick-driven simulation core for a two-sided, single-lane battle.
//!
//! Two heroes, two bases and two streams of spawned units contest one lane
//! until a base falls. This crate contains only the simulation:
//! - No rendering
//! - No IO beyond loading config files
//! - No hidden randomness (the generator is injected)
//! - No floating-point math inside a tick (uses fixed-point)
//!
//! ## Crate Structure
//!
//! - [`catalog`] - Unit archetypes
//! - [`hero`] - Hero stats and combat resolution
//! - [`unit`] - Spawned units and their arena
//! - [`side`] - Per-side state and economy
//! - [`opponent`] - Scripted controller
//! - [`simulation`] - The tick loop
//! - [`snapshot`] - Read-only views for drivers
//! - [`math`] - Fixed-point math utilities

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod catalog;
pub mod command;
pub mod config;
pub mod error;
pub mod hero;
pub mod items;
pub mod math;
pub mod opponent;
pub mod side;
pub mod simulation;
pub mod snapshot;
pub mod unit;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::catalog::{UnitArchetype, UnitKind};
    pub use crate::command::BattleCommand;
    pub use crate::config::BattleConfig;
    pub use crate::error::{GameError, Result};
    pub use crate::hero::{Hero, HeroPreset, HeroStats, PrimaryAttribute};
    pub use crate::items::{find_item, shop, Item};
    pub use crate::math::Fixed;
    pub use crate::opponent::{choose_opponent_preset, OpponentPolicy};
    pub use crate::side::{Side, SideState, SideStats};
    pub use crate::simulation::{BattleSimulation, Combatant, TickEvents};
    pub use crate::snapshot::{BattleSnapshot, Outcome};
    pub use crate::unit::{CombatUnit, UnitId};
}
