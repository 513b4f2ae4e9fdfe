//! Test fixtures and helpers.
//!
//! Pre-built heroes, battles and random sources for consistent testing.

use fixed::types::I32F32;
use lane_core::prelude::*;
use rand::rngs::mock::StepRng;

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> I32F32 {
    I32F32::from_num(n)
}

/// Create a fixed-point number from a float (for tests only).
///
/// Note: In real simulation code, never use floats.
/// This is only for convenient test setup.
#[must_use]
pub fn fixed_f(n: f64) -> I32F32 {
    I32F32::from_num(n)
}

/// A generator whose every uniform draw is zero: any non-zero chance
/// succeeds.
#[must_use]
pub fn always_lucky() -> StepRng {
    StepRng::new(0, 0)
}

/// A generator whose every uniform draw is just below one: no chance
/// below 1 ever succeeds.
#[must_use]
pub fn never_lucky() -> StepRng {
    StepRng::new(u64::MAX, 0)
}

/// Attributes for a hero with no evasion, no crits and no shield.
#[must_use]
pub fn plain_stats(attack: i32, health: i32) -> HeroStats {
    HeroStats {
        name: "Plain".to_string(),
        strength: 0,
        dexterity: 0,
        intelligence: 0,
        primary: PrimaryAttribute::Strength,
        base_health: health,
        base_attack: attack,
        base_defense: 0,
        gold: 500,
        income: 10,
        attack_range: 48,
    }
}

/// A hero built from [`plain_stats`].
#[must_use]
pub fn plain_hero(attack: i32, health: i32) -> Hero {
    Hero::new(plain_stats(attack, health))
}

/// A battle between two plain heroes with a fixed all-zero generator.
///
/// # Panics
///
/// Panics if `config` is invalid.
#[must_use]
pub fn plain_battle(config: BattleConfig) -> BattleSimulation<StepRng> {
    BattleSimulation::new(config, plain_hero(10, 100), plain_hero(10, 100), always_lucky())
        .expect("fixture config must be valid")
}

/// A default-config Ranger vs Berserker battle.
///
/// # Panics
///
/// Panics if the default config is invalid.
#[must_use]
pub fn seeded_battle(seed: u64) -> BattleSimulation {
    BattleSimulation::from_seed(
        BattleConfig::default(),
        Hero::from_preset(HeroPreset::Ranger),
        Hero::from_preset(HeroPreset::Berserker),
        seed,
    )
    .expect("default config must be valid")
}

/// A seeded battle with both sides under scripted control.
#[must_use]
pub fn scripted_battle(seed: u64) -> BattleSimulation {
    let mut sim = seeded_battle(seed);
    sim.enable_opponent(Side::Left);
    sim.enable_opponent(Side::Right);
    sim
}

/// Advance until the battle ends or `max_ticks` have run. Returns the
/// number of ticks actually advanced.
pub fn run_until_decided<R: rand::Rng>(sim: &mut BattleSimulation<R>, max_ticks: u64) -> u64 {
    let mut ran = 0;
    while ran < max_ticks && !sim.is_over() {
        sim.advance();
        ran += 1;
    }
    ran
}
