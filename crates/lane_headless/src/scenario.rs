//! Scenario loading and configuration.
//!
//! A scenario fixes everything a battle needs before the first tick: lane
//! tuning, which hero each side fields, which sides the scripted policy
//! drives, and optionally units already on the lane.

use std::path::Path;

use lane_core::catalog::UnitKind;
use lane_core::config::BattleConfig;
use lane_core::error::GameError;
use lane_core::hero::{Hero, HeroPreset};
use lane_core::math::fixed_from_f64;
use lane_core::opponent::choose_opponent_preset;
use lane_core::side::Side;
use lane_core::simulation::BattleSimulation;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for scenario operations.
#[derive(Error, Debug)]
pub enum ScenarioError {
    /// File not found.
    #[error("Scenario file not found: {0}")]
    FileNotFound(String),
    /// Failed to read file.
    #[error("Failed to read scenario file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse scenario: {0}")]
    ParseError(#[from] ron::error::SpannedError),
    /// The scenario describes a battle the core rejects.
    #[error("Invalid scenario: {0}")]
    Battle(#[from] GameError),
}

/// A unit already on the lane when the battle starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitPlacement {
    /// Owning side.
    pub side: Side,
    /// Archetype.
    pub unit: UnitKind,
    /// Lane position.
    pub position: f64,
}

/// A complete scenario configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Seed used when the caller does not supply one.
    pub seed: Option<u64>,
    /// Hero fielded by the left side.
    pub left_hero: HeroPreset,
    /// Hero fielded by the right side. `None` picks one whose primary
    /// attribute contrasts with the left hero's.
    pub right_hero: Option<HeroPreset>,
    /// Sides driven by the scripted policy.
    pub scripted: Vec<Side>,
    /// Units placed before the first tick.
    pub starting_units: Vec<UnitPlacement>,
    /// Lane tuning.
    pub config: BattleConfig,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            name: "Lane Duel".to_string(),
            description: "Player on the left against the scripted opponent".to_string(),
            seed: None,
            left_hero: HeroPreset::Ranger,
            right_hero: None,
            scripted: vec![Side::Right],
            starting_units: Vec::new(),
            config: BattleConfig::default(),
        }
    }
}

impl Scenario {
    /// Load a scenario from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_ron_str(&contents)
    }

    /// Load from a RON string (useful for embedded scenarios).
    pub fn from_ron_str(ron: &str) -> Result<Self, ScenarioError> {
        let scenario: Scenario = ron::from_str(ron)?;
        scenario.config.validate()?;
        Ok(scenario)
    }

    /// Both sides under the scripted policy, for balance runs.
    #[must_use]
    pub fn ai_versus_ai() -> Self {
        Self {
            name: "AI Mirror".to_string(),
            description: "Scripted policy on both sides".to_string(),
            scripted: vec![Side::Left, Side::Right],
            ..Self::default()
        }
    }

    /// Build the battle with a generator seeded from `seed`.
    pub fn build(&self, seed: u64) -> Result<BattleSimulation, ScenarioError> {
        self.build_with(ChaCha8Rng::seed_from_u64(seed))
    }

    /// Build the battle with the scenario seed, or OS entropy when the
    /// scenario has none.
    pub fn build_default(&self) -> Result<BattleSimulation, ScenarioError> {
        match self.seed {
            Some(seed) => self.build(seed),
            None => self.build_with(ChaCha8Rng::from_entropy()),
        }
    }

    fn build_with(&self, mut rng: ChaCha8Rng) -> Result<BattleSimulation, ScenarioError> {
        let right_preset = self
            .right_hero
            .unwrap_or_else(|| choose_opponent_preset(self.left_hero.primary(), &mut rng));

        let mut sim = BattleSimulation::new(
            self.config.clone(),
            Hero::from_preset(self.left_hero),
            Hero::from_preset(right_preset),
            rng,
        )?;

        for &side in &self.scripted {
            sim.enable_opponent(side);
        }

        for placement in &self.starting_units {
            let position = fixed_from_f64(placement.position).ok_or_else(|| {
                GameError::InvalidDestination(format!("{} is not a lane position", placement.position))
            })?;
            sim.spawn_unit_at(placement.side, placement.unit, position);
        }

        tracing::debug!(
            scenario = %self.name,
            left = %self.left_hero,
            right = %right_preset,
            "Scenario built"
        );
        Ok(sim)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_scenario_scripts_the_right_side() {
        let sim = Scenario::default().build(1).unwrap();
        assert!(!sim.is_scripted(Side::Left));
        assert!(sim.is_scripted(Side::Right));
        assert_eq!(sim.hero(Side::Left).name(), "Ranger");
    }

    #[test]
    fn test_ai_versus_ai_scripts_both_sides() {
        let sim = Scenario::ai_versus_ai().build(3).unwrap();
        assert!(sim.is_scripted(Side::Left));
        assert!(sim.is_scripted(Side::Right));
    }

    #[test]
    fn test_parse_ron_with_defaults() {
        let ron = r#"(
            name: "Archer line",
            seed: Some(42),
            left_hero: berserker,
            right_hero: Some(battle_mage),
            scripted: [],
            starting_units: [
                (side: left, unit: archer, position: 200.0),
            ],
            config: (base_health: 400),
        )"#;
        let scenario = Scenario::from_ron_str(ron).unwrap();
        assert_eq!(scenario.seed, Some(42));
        assert_eq!(scenario.config.base_health, 400);
        assert_eq!(scenario.config.wave_interval_ticks, 300);

        let sim = scenario.build(42).unwrap();
        assert_eq!(sim.hero(Side::Right).name(), "Battle Mage");
        assert_eq!(sim.side(Side::Left).units.len(), 1);
        assert_eq!(sim.base_health(Side::Right), 400);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let ron = "(config: (wave_interval_ticks: 0))";
        assert!(matches!(
            Scenario::from_ron_str(ron),
            Err(ScenarioError::Battle(GameError::InvalidConfig(_)))
        ));
    }

    #[test]
    fn test_shipped_scenario_parses() {
        let scenario = Scenario::from_ron_str(include_str!("../scenarios/duel.ron")).unwrap();
        assert_eq!(scenario.scripted, vec![Side::Right]);
        assert_eq!(scenario.config.lane_length, lane_core::math::Fixed::from_num(720));

        let sim = scenario.build_default().unwrap();
        assert_eq!(sim.side(Side::Left).units.len(), 1);
        assert_eq!(sim.side(Side::Right).units.len(), 1);
    }

    #[test]
    fn test_missing_file() {
        let result = Scenario::load("/nonexistent/lane.ron");
        assert!(matches!(result, Err(ScenarioError::FileNotFound(_))));
    }

    #[test]
    fn test_same_seed_same_opponent() {
        let a = Scenario::default().build(9).unwrap();
        let b = Scenario::default().build(9).unwrap();
        assert_eq!(a.hero(Side::Right).name(), b.hero(Side::Right).name());
        assert_eq!(a.state_hash(), b.state_hash());
    }
}
