//! Battle tuning constants, loadable from RON.
//!
//! Every field has a default, so a config file only needs the keys it
//! overrides:
//!
//! ```
//! use lane_core::config::BattleConfig;
//!
//! let config = BattleConfig::from_ron_str("(base_health: 500, wave_interval_ticks: 200)").unwrap();
//! assert_eq!(config.base_health, 500);
//! assert_eq!(config.income_interval_ticks, BattleConfig::default().income_interval_ticks);
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};
use crate::math::{fixed_decimal_serde, Fixed};
use crate::side::Side;

/// Longest lane a config may describe.
pub const MAX_LANE_LENGTH: Fixed = Fixed::lit("1000000");

/// Lane geometry, combat timings and economy cadence for one battle.
///
/// The tick period is not part of this config; the driver decides how
/// often [`crate::simulation::BattleSimulation::advance`] runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BattleConfig {
    /// The lane spans `[0, lane_length]`.
    #[serde(with = "fixed_decimal_serde")]
    pub lane_length: Fixed,
    /// Distance from each lane end to that side's base line.
    #[serde(with = "fixed_decimal_serde")]
    pub base_depth: Fixed,
    /// Physical width of a unit.
    #[serde(with = "fixed_decimal_serde")]
    pub unit_size: Fixed,
    /// Unit movement per tick.
    #[serde(with = "fixed_decimal_serde")]
    pub unit_speed: Fixed,
    /// Hero movement per tick.
    #[serde(with = "fixed_decimal_serde")]
    pub hero_speed: Fixed,
    /// Starting base health per side.
    pub base_health: i32,
    /// Ticks between unit attacks on units and heroes.
    pub unit_attack_cooldown_ticks: u32,
    /// Ticks between unit hits on a base.
    pub unit_base_attack_cooldown_ticks: u32,
    /// Base hero attack delay, before dexterity scaling.
    pub hero_attack_delay_ticks: u32,
    /// Base hero attack delay after defeating the enemy hero.
    pub hero_post_kill_delay_ticks: u32,
    /// Ticks between hero hits on a base.
    pub hero_base_attack_cooldown_ticks: u32,
    /// Minimum damage a hero deals to a base.
    pub hero_base_damage: i32,
    /// Ticks a defeated hero stays down.
    pub respawn_ticks: u32,
    /// Ticks between income payouts.
    pub income_interval_ticks: u32,
    /// Ticks between waves.
    pub wave_interval_ticks: u32,
    /// Gold for a hero's killing blow on a unit.
    pub unit_kill_bounty: u32,
    /// How far the scripted hero stays in front of the unit it intercepts.
    #[serde(with = "fixed_decimal_serde")]
    pub opponent_stand_off: Fixed,
    /// Lower bound of the scripted purchase timer.
    pub opponent_purchase_min_ticks: u32,
    /// Upper bound of the scripted purchase timer.
    pub opponent_purchase_max_ticks: u32,
    /// Gold the scripted side must hold before it considers an item.
    pub opponent_item_gold_threshold: u32,
    /// Probability of buying an item when the threshold is met.
    #[serde(with = "fixed_decimal_serde")]
    pub opponent_item_chance: Fixed,
}

impl Default for BattleConfig {
    fn default() -> Self {
        Self {
            lane_length: Fixed::from_num(960),
            base_depth: Fixed::from_num(60),
            unit_size: Fixed::from_num(24),
            unit_speed: Fixed::lit("1.5"),
            hero_speed: Fixed::from_num(3),
            base_health: 1000,
            unit_attack_cooldown_ticks: 20,
            unit_base_attack_cooldown_ticks: 40,
            hero_attack_delay_ticks: 15,
            hero_post_kill_delay_ticks: 60,
            hero_base_attack_cooldown_ticks: 60,
            hero_base_damage: 8,
            respawn_ticks: 150,
            income_interval_ticks: 100,
            wave_interval_ticks: 300,
            unit_kill_bounty: 6,
            opponent_stand_off: Fixed::from_num(40),
            opponent_purchase_min_ticks: 60,
            opponent_purchase_max_ticks: 180,
            opponent_item_gold_threshold: 140,
            opponent_item_chance: Fixed::lit("0.35"),
        }
    }
}

impl BattleConfig {
    /// Parse and validate a config from a RON string.
    pub fn from_ron_str(source: &str) -> Result<Self> {
        let config: Self = ron::from_str(source).map_err(|err| GameError::DataParse {
            source_name: "<inline>".to_string(),
            message: err.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a config from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|err| GameError::DataParse {
            source_name: path.display().to_string(),
            message: err.to_string(),
        })?;
        let config: Self = ron::from_str(&contents).map_err(|err| GameError::DataParse {
            source_name: path.display().to_string(),
            message: err.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check the config describes a playable battle.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: &str| Err(GameError::InvalidConfig(msg.to_string()));

        if self.lane_length <= Fixed::ZERO || self.lane_length > MAX_LANE_LENGTH {
            return invalid("lane_length must be positive and at most 1000000");
        }
        // Every other distance is bounded by the lane, so geometry sums stay
        // far inside the fixed-point range.
        let distances = [
            self.base_depth,
            self.unit_size,
            self.unit_speed,
            self.hero_speed,
            self.opponent_stand_off,
        ];
        if distances.iter().any(|&d| d > self.lane_length) {
            return invalid("distances and speeds must not exceed lane_length");
        }
        if self.base_depth < Fixed::ZERO || self.lane_length <= self.base_depth * 2 {
            return invalid("lane_length must exceed twice base_depth");
        }
        if self.unit_size <= Fixed::ZERO {
            return invalid("unit_size must be positive");
        }
        if self.right_base_line() - self.left_base_line() < self.unit_size {
            return invalid("the lane between the base lines must fit one unit");
        }
        if self.unit_speed <= Fixed::ZERO || self.hero_speed <= Fixed::ZERO {
            return invalid("speeds must be positive");
        }
        if self.base_health <= 0 {
            return invalid("base_health must be positive");
        }
        if self.income_interval_ticks == 0 || self.wave_interval_ticks == 0 {
            return invalid("income and wave intervals must be at least one tick");
        }
        if self.opponent_purchase_min_ticks == 0
            || self.opponent_purchase_min_ticks > self.opponent_purchase_max_ticks
        {
            return invalid("opponent purchase range must be non-empty and start above zero");
        }
        if self.opponent_item_chance < Fixed::ZERO || self.opponent_item_chance > Fixed::ONE {
            return invalid("opponent_item_chance must be within [0, 1]");
        }
        if self.opponent_stand_off < Fixed::ZERO {
            return invalid("opponent_stand_off must not be negative");
        }
        Ok(())
    }

    /// Left base line position.
    #[must_use]
    pub fn left_base_line(&self) -> Fixed {
        self.base_depth
    }

    /// Right base line position.
    #[must_use]
    pub fn right_base_line(&self) -> Fixed {
        self.lane_length - self.base_depth
    }

    /// A side's own base line.
    #[must_use]
    pub fn base_line(&self, side: Side) -> Fixed {
        match side {
            Side::Left => self.left_base_line(),
            Side::Right => self.right_base_line(),
        }
    }

    /// Where a side's hero spawns and respawns.
    #[must_use]
    pub fn hero_home(&self, side: Side) -> Fixed {
        self.base_line(side)
    }

    /// Center position of a freshly spawned unit: flush against its own
    /// base line, on the lane side.
    #[must_use]
    pub fn unit_spawn(&self, side: Side) -> Fixed {
        side.forward(self.base_line(side), self.half_unit())
    }

    /// Center position at which a unit's leading edge touches the enemy
    /// base line.
    #[must_use]
    pub fn unit_siege_position(&self, side: Side) -> Fixed {
        side.forward(self.base_line(side.opponent()), -self.half_unit())
    }

    /// Half of [`Self::unit_size`].
    #[must_use]
    pub fn half_unit(&self) -> Fixed {
        self.unit_size / 2
    }

    /// Clamp a requested hero position to the lane.
    #[must_use]
    pub fn clamp_to_lane(&self, position: Fixed) -> Fixed {
        position.clamp(Fixed::ZERO, self.lane_length)
    }
}
