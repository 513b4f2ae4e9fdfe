//! Hero stat model and combat resolution.
//!
//! A [`Hero`] derives its combat stats once, at creation, from strength,
//! dexterity and intelligence:
//!
//! | stat | formula |
//! |------|---------|
//! | max health | base health + 5 × strength |
//! | attack | base attack + primary attribute |
//! | defense | base defense + ⌊0.2 × strength⌋ |
//! | max shield | max(0, 4 × intelligence) |
//! | evasion | clamp(0.01 × dexterity, 0, 0.35) |
//! | critical chance | clamp(0.015 × intelligence, 0, 0.5) |
//! | attack speed | 1 + 0.015 × dexterity |
//!
//! Items raise attack and defense afterwards; attributes never change.
//!
//! # Example
//!
//! ```
//! use lane_core::hero::{Hero, HeroPreset};
//! use rand::rngs::mock::StepRng;
//!
//! let mut hero = Hero::from_preset(HeroPreset::BattleMage);
//! // An always-high roll never evades, so the shield soaks the hit.
//! let mut rng = StepRng::new(u64::MAX, 0);
//! assert!(!hero.take_damage(10, &mut rng));
//! assert_eq!(hero.current_shield(), hero.max_shield() - 10);
//! assert_eq!(hero.current_health(), hero.max_health());
//! ```

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::GameError;
use crate::items::Item;
use crate::math::{roll_chance, round_to_i32, Fixed};

/// Attacks never come faster than this many ticks apart.
pub const MIN_ATTACK_DELAY_TICKS: u32 = 6;

/// Lane distance covered by one unit of a preset's attack range.
pub const RANGE_UNIT: i32 = 24;

const EVASION_PER_DEX: Fixed = Fixed::lit("0.01");
const MAX_EVASION: Fixed = Fixed::lit("0.35");
const CRIT_PER_INT: Fixed = Fixed::lit("0.015");
const MAX_CRIT: Fixed = Fixed::lit("0.5");
const CRIT_MULTIPLIER: Fixed = Fixed::lit("1.5");
const ATTACK_SPEED_PER_DEX: Fixed = Fixed::lit("0.015");

/// The attribute that feeds a hero's attack.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimaryAttribute {
    /// Strength.
    Strength,
    /// Dexterity.
    Dexterity,
    /// Intelligence.
    Intelligence,
}

/// Immutable attributes a hero is built from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeroStats {
    /// Display name.
    pub name: String,
    /// Raises health and defense.
    pub strength: u32,
    /// Raises evasion and attack speed.
    pub dexterity: u32,
    /// Raises shield and critical chance.
    pub intelligence: u32,
    /// Which attribute is added to attack.
    pub primary: PrimaryAttribute,
    /// Health before strength.
    pub base_health: i32,
    /// Attack before the primary attribute.
    pub base_attack: i32,
    /// Defense before strength.
    pub base_defense: i32,
    /// Starting gold.
    pub gold: u32,
    /// Starting income per payout.
    pub income: u32,
    /// Attack reach in lane units, raised to at least [`RANGE_UNIT`].
    pub attack_range: i32,
}

/// Built-in hero archetypes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeroPreset {
    /// Agile long-range fighter.
    Ranger,
    /// Durable close-range brawler.
    Berserker,
    /// Shielded caster with frequent critical hits.
    BattleMage,
}

impl HeroPreset {
    /// Every preset.
    pub const ALL: [Self; 3] = [Self::Ranger, Self::Berserker, Self::BattleMage];

    /// Stable snake_case identifier.
    #[must_use]
    pub const fn id(self) -> &'static str {
        match self {
            Self::Ranger => "ranger",
            Self::Berserker => "berserker",
            Self::BattleMage => "battle_mage",
        }
    }

    /// The attribute set this preset starts with.
    #[must_use]
    pub fn stats(self) -> HeroStats {
        let (name, health, attack, defense, strength, dexterity, intelligence, primary, range) =
            match self {
                Self::Ranger => ("Ranger", 180, 40, 6, 12, 15, 9, PrimaryAttribute::Dexterity, 5),
                Self::Berserker => {
                    ("Berserker", 220, 48, 8, 16, 10, 6, PrimaryAttribute::Strength, 2)
                }
                Self::BattleMage => (
                    "Battle Mage",
                    170,
                    44,
                    5,
                    11,
                    11,
                    16,
                    PrimaryAttribute::Intelligence,
                    6,
                ),
            };
        HeroStats {
            name: name.to_string(),
            strength,
            dexterity,
            intelligence,
            primary,
            base_health: health,
            base_attack: attack,
            base_defense: defense,
            gold: 420,
            income: 24,
            attack_range: range * RANGE_UNIT,
        }
    }

    /// Primary attribute of the preset.
    #[must_use]
    pub fn primary(self) -> PrimaryAttribute {
        self.stats().primary
    }
}

impl fmt::Display for HeroPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for HeroPreset {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        Self::ALL
            .into_iter()
            .find(|preset| preset.id() == wanted)
            .ok_or_else(|| GameError::UnknownHero(s.to_string()))
    }
}

/// One controllable combatant.
///
/// Health and shield may drop to zero or below to signal defeat; use
/// [`Hero::displayed_health`] and [`Hero::displayed_shield`] for values
/// clamped to `[0, max]`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Hero {
    name: String,
    strength: u32,
    dexterity: u32,
    intelligence: u32,
    primary: PrimaryAttribute,
    max_health: i32,
    max_shield: i32,
    attack: i32,
    defense: i32,
    attack_range: Fixed,
    current_health: i32,
    current_shield: i32,
    gold: u32,
    income: u32,
    items: Vec<Item>,

    // Lane state, driven by the simulation.
    pub(crate) position: Fixed,
    pub(crate) destination: Fixed,
    pub(crate) home: Fixed,
    pub(crate) alive: bool,
    pub(crate) respawn_countdown: u32,
    pub(crate) attack_cooldown: u32,
    pub(crate) base_attack_cooldown: u32,
}

fn attribute(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

impl Hero {
    /// Build a hero, deriving combat stats from its attributes.
    #[must_use]
    pub fn new(stats: HeroStats) -> Self {
        let strength = attribute(stats.strength);
        let intelligence = attribute(stats.intelligence);
        let primary_value = match stats.primary {
            PrimaryAttribute::Strength => stats.strength,
            PrimaryAttribute::Dexterity => stats.dexterity,
            PrimaryAttribute::Intelligence => stats.intelligence,
        };

        let max_health = stats.base_health.saturating_add(strength.saturating_mul(5));
        let max_shield = intelligence.saturating_mul(4).max(0);

        Self {
            name: stats.name,
            strength: stats.strength,
            dexterity: stats.dexterity,
            intelligence: stats.intelligence,
            primary: stats.primary,
            max_health,
            max_shield,
            attack: stats.base_attack.saturating_add(attribute(primary_value)),
            defense: stats.base_defense.saturating_add(strength / 5),
            attack_range: Fixed::saturating_from_num(stats.attack_range.max(RANGE_UNIT)),
            current_health: max_health,
            current_shield: max_shield,
            gold: stats.gold,
            income: stats.income,
            items: Vec::new(),
            position: Fixed::ZERO,
            destination: Fixed::ZERO,
            home: Fixed::ZERO,
            alive: true,
            respawn_countdown: 0,
            attack_cooldown: 0,
            base_attack_cooldown: 0,
        }
    }

    /// Build a hero from a built-in preset.
    #[must_use]
    pub fn from_preset(preset: HeroPreset) -> Self {
        Self::new(preset.stats())
    }

    // ========================================
    // Stats
    // ========================================

    /// Display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Strength attribute.
    #[must_use]
    pub const fn strength(&self) -> u32 {
        self.strength
    }

    /// Dexterity attribute.
    #[must_use]
    pub const fn dexterity(&self) -> u32 {
        self.dexterity
    }

    /// Intelligence attribute.
    #[must_use]
    pub const fn intelligence(&self) -> u32 {
        self.intelligence
    }

    /// Primary attribute tag.
    #[must_use]
    pub const fn primary(&self) -> PrimaryAttribute {
        self.primary
    }

    /// Maximum health.
    #[must_use]
    pub const fn max_health(&self) -> i32 {
        self.max_health
    }

    /// Maximum shield.
    #[must_use]
    pub const fn max_shield(&self) -> i32 {
        self.max_shield
    }

    /// Attack, including item bonuses.
    #[must_use]
    pub const fn attack(&self) -> i32 {
        self.attack
    }

    /// Defense, including item bonuses.
    #[must_use]
    pub const fn defense(&self) -> i32 {
        self.defense
    }

    /// Attack reach in lane units.
    #[must_use]
    pub const fn attack_range(&self) -> Fixed {
        self.attack_range
    }

    /// Raw current health; may be zero or negative after a killing blow.
    #[must_use]
    pub const fn current_health(&self) -> i32 {
        self.current_health
    }

    /// Raw current shield.
    #[must_use]
    pub const fn current_shield(&self) -> i32 {
        self.current_shield
    }

    /// Health clamped to `[0, max]`.
    #[must_use]
    pub fn displayed_health(&self) -> i32 {
        self.current_health.clamp(0, self.max_health.max(0))
    }

    /// Shield clamped to `[0, max]`.
    #[must_use]
    pub fn displayed_shield(&self) -> i32 {
        self.current_shield.clamp(0, self.max_shield)
    }

    /// Chance to fully evade an incoming attack, in `[0, 0.35]`.
    #[must_use]
    pub fn evasion_chance(&self) -> Fixed {
        Fixed::saturating_from_num(self.dexterity)
            .saturating_mul(EVASION_PER_DEX)
            .clamp(Fixed::ZERO, MAX_EVASION)
    }

    /// Chance for an attack to critically strike, in `[0, 0.5]`.
    #[must_use]
    pub fn crit_chance(&self) -> Fixed {
        Fixed::saturating_from_num(self.intelligence)
            .saturating_mul(CRIT_PER_INT)
            .clamp(Fixed::ZERO, MAX_CRIT)
    }

    /// `1 + 0.015 × dexterity`.
    #[must_use]
    pub fn attack_speed_multiplier(&self) -> Fixed {
        Fixed::ONE.saturating_add(
            Fixed::saturating_from_num(self.dexterity).saturating_mul(ATTACK_SPEED_PER_DEX),
        )
    }

    /// Ticks between attacks for a given base delay, never below
    /// [`MIN_ATTACK_DELAY_TICKS`].
    #[must_use]
    pub fn attack_delay_ticks(&self, base_delay_ticks: u32) -> u32 {
        let scaled = Fixed::saturating_from_num(base_delay_ticks) / self.attack_speed_multiplier();
        u32::try_from(round_to_i32(scaled))
            .unwrap_or(0)
            .max(MIN_ATTACK_DELAY_TICKS)
    }

    // ========================================
    // Combat
    // ========================================

    /// Apply an incoming hit.
    ///
    /// Non-positive amounts are ignored without consuming randomness.
    /// Otherwise one draw decides evasion; a landed hit drains the shield
    /// first and the remainder comes off health. Returns `true` iff health
    /// ended at or below zero. The caller owns death handling.
    pub fn take_damage<R: Rng + ?Sized>(&mut self, amount: i32, rng: &mut R) -> bool {
        if amount <= 0 {
            return false;
        }
        if roll_chance(rng, self.evasion_chance()) {
            return false;
        }

        let absorbed = amount.min(self.current_shield.max(0));
        self.current_shield -= absorbed;
        self.current_health = self.current_health.saturating_sub(amount - absorbed);
        self.current_health <= 0
    }

    /// Roll outgoing damage: attack, or attack × 1.5 rounded on a critical.
    pub fn roll_attack_damage<R: Rng + ?Sized>(&self, rng: &mut R) -> i32 {
        if roll_chance(rng, self.crit_chance()) {
            round_to_i32(Fixed::saturating_from_num(self.attack).saturating_mul(CRIT_MULTIPLIER))
        } else {
            self.attack
        }
    }

    /// Whether the hero is on the lane and attackable.
    #[must_use]
    pub const fn is_alive(&self) -> bool {
        self.alive
    }

    /// Ticks left before respawn; zero while alive.
    #[must_use]
    pub const fn respawn_countdown(&self) -> u32 {
        self.respawn_countdown
    }

    /// Current lane position.
    #[must_use]
    pub const fn position(&self) -> Fixed {
        self.position
    }

    /// Requested lane position.
    #[must_use]
    pub const fn destination(&self) -> Fixed {
        self.destination
    }

    /// Alive and not already dealt a lethal blow this tick.
    pub(crate) const fn can_be_struck(&self) -> bool {
        self.alive && self.current_health > 0
    }

    /// Mark the hero dead and start the respawn countdown.
    pub(crate) fn fall(&mut self, respawn_ticks: u32) {
        self.alive = false;
        self.respawn_countdown = respawn_ticks;
        self.attack_cooldown = 0;
        self.base_attack_cooldown = 0;
    }

    /// Restore health and shield and return to the home spawn.
    pub(crate) fn respawn(&mut self) {
        self.current_health = self.max_health;
        self.current_shield = self.max_shield;
        self.position = self.home;
        self.destination = self.home;
        self.alive = true;
        self.respawn_countdown = 0;
    }

    // ========================================
    // Economy
    // ========================================

    /// Gold on hand.
    #[must_use]
    pub const fn gold(&self) -> u32 {
        self.gold
    }

    /// Gold gained per payout.
    #[must_use]
    pub const fn income(&self) -> u32 {
        self.income
    }

    /// Collect one income payout.
    pub fn earn_income(&mut self) {
        self.gold = self.gold.saturating_add(self.income);
    }

    /// Add gold from a bounty or reward.
    pub fn earn_gold(&mut self, amount: u32) {
        self.gold = self.gold.saturating_add(amount);
    }

    /// Deduct `amount` if affordable. Returns `false` without mutating
    /// anything otherwise.
    pub fn spend_gold(&mut self, amount: u32) -> bool {
        match self.gold.checked_sub(amount) {
            Some(remaining) => {
                self.gold = remaining;
                true
            }
            None => false,
        }
    }

    /// Permanently raise income.
    pub fn add_income(&mut self, amount: u32) {
        self.income = self.income.saturating_add(amount);
    }

    /// Record an item and add its bonuses to attack and defense.
    pub fn apply_item(&mut self, item: Item) {
        self.attack = self.attack.saturating_add(item.attack_bonus);
        self.defense = self.defense.saturating_add(item.defense_bonus);
        self.items.push(item);
    }

    /// Items applied so far, in purchase order.
    #[must_use]
    pub fn items(&self) -> &[Item] {
        &self.items
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::items::find_item;
    use rand::rngs::mock::StepRng;

    fn never_lucky() -> StepRng {
        StepRng::new(u64::MAX, 0)
    }

    fn always_lucky() -> StepRng {
        StepRng::new(0, 0)
    }

    fn plain_stats() -> HeroStats {
        HeroStats {
            name: "Test".to_string(),
            strength: 0,
            dexterity: 0,
            intelligence: 0,
            primary: PrimaryAttribute::Strength,
            base_health: 10,
            base_attack: 10,
            base_defense: 0,
            gold: 100,
            income: 10,
            attack_range: 48,
        }
    }

    #[test]
    fn test_derived_stats() {
        let hero = Hero::from_preset(HeroPreset::Berserker);
        assert_eq!(hero.max_health(), 220 + 5 * 16);
        assert_eq!(hero.attack(), 48 + 16);
        assert_eq!(hero.defense(), 8 + 3);
        assert_eq!(hero.max_shield(), 24);
        assert_eq!(hero.attack_range(), Fixed::from_num(48));

        let mage = Hero::from_preset(HeroPreset::BattleMage);
        assert_eq!(mage.attack(), 44 + 16);
        assert_eq!(mage.max_shield(), 64);
    }

    #[test]
    fn test_attack_range_is_at_least_one_unit() {
        let mut stats = plain_stats();
        stats.attack_range = 0;
        assert_eq!(Hero::new(stats.clone()).attack_range(), Fixed::from_num(RANGE_UNIT));
        stats.attack_range = -100;
        assert_eq!(Hero::new(stats).attack_range(), Fixed::from_num(RANGE_UNIT));
    }

    #[test]
    fn test_shield_absorbs_before_health() {
        let mut hero = Hero::new(plain_stats());
        hero.current_shield = 5;
        assert!(!hero.take_damage(8, &mut never_lucky()));
        assert_eq!(hero.current_shield(), 0);
        assert_eq!(hero.current_health(), 7);
    }

    #[test]
    fn test_non_positive_damage_is_ignored() {
        let mut hero = Hero::new(plain_stats());
        let before = hero.clone();
        assert!(!hero.take_damage(0, &mut never_lucky()));
        assert!(!hero.take_damage(-5, &mut never_lucky()));
        assert_eq!(hero, before);
    }

    #[test]
    fn test_evasion_blocks_all_damage() {
        let mut stats = plain_stats();
        stats.dexterity = 20;
        let mut hero = Hero::new(stats);
        assert!(!hero.take_damage(1_000, &mut always_lucky()));
        assert_eq!(hero.current_health(), hero.max_health());
    }

    #[test]
    fn test_zero_dexterity_never_evades() {
        let mut hero = Hero::new(plain_stats());
        assert!(hero.take_damage(10, &mut always_lucky()));
        assert_eq!(hero.current_health(), 0);
        assert_eq!(hero.displayed_health(), 0);
    }

    #[test]
    fn test_lethal_hit_reports_defeat_and_display_clamps() {
        let mut hero = Hero::new(plain_stats());
        assert!(hero.take_damage(25, &mut never_lucky()));
        assert_eq!(hero.current_health(), -15);
        assert_eq!(hero.displayed_health(), 0);
        assert!(hero.is_alive(), "defeat is only a signal");
    }

    #[test]
    fn test_chances_are_clamped() {
        let mut stats = plain_stats();
        stats.dexterity = u32::MAX;
        stats.intelligence = u32::MAX;
        let hero = Hero::new(stats);
        assert_eq!(hero.evasion_chance(), MAX_EVASION);
        assert_eq!(hero.crit_chance(), MAX_CRIT);

        let zero = Hero::new(plain_stats());
        assert_eq!(zero.evasion_chance(), Fixed::ZERO);
        assert_eq!(zero.crit_chance(), Fixed::ZERO);
    }

    #[test]
    fn test_critical_hit_rounds() {
        let mut stats = plain_stats();
        stats.base_attack = 9;
        stats.intelligence = 10;
        let hero = Hero::new(stats);
        assert_eq!(hero.roll_attack_damage(&mut always_lucky()), 14);
        assert_eq!(hero.roll_attack_damage(&mut never_lucky()), 9);
    }

    #[test]
    fn test_zero_intelligence_never_crits() {
        let hero = Hero::new(plain_stats());
        assert_eq!(hero.roll_attack_damage(&mut always_lucky()), 10);
    }

    #[test]
    fn test_attack_delay_floor() {
        let mut stats = plain_stats();
        stats.dexterity = 100;
        let hero = Hero::new(stats);
        assert_eq!(hero.attack_delay_ticks(15), MIN_ATTACK_DELAY_TICKS);
        assert_eq!(hero.attack_delay_ticks(1), MIN_ATTACK_DELAY_TICKS);
        assert_eq!(hero.attack_delay_ticks(0), MIN_ATTACK_DELAY_TICKS);

        let slow = Hero::new(plain_stats());
        assert_eq!(slow.attack_delay_ticks(30), 30);
    }

    #[test]
    fn test_attack_delay_scales_with_dexterity() {
        let mut stats = plain_stats();
        stats.dexterity = 20;
        let hero = Hero::new(stats);
        // 30 / 1.3 = 23.07
        assert_eq!(hero.attack_delay_ticks(30), 23);
    }

    #[test]
    fn test_spend_gold() {
        let mut hero = Hero::new(plain_stats());
        assert!(!hero.spend_gold(101));
        assert_eq!(hero.gold(), 100);
        assert!(hero.spend_gold(100));
        assert_eq!(hero.gold(), 0);
        assert!(hero.spend_gold(0));
    }

    #[test]
    fn test_income() {
        let mut hero = Hero::new(plain_stats());
        hero.add_income(5);
        hero.earn_income();
        assert_eq!(hero.income(), 15);
        assert_eq!(hero.gold(), 115);
    }

    #[test]
    fn test_apply_item() {
        let mut hero = Hero::new(plain_stats());
        let relic = *find_item("heroic_relic").unwrap();
        hero.apply_item(relic);
        assert_eq!(hero.attack(), 16);
        assert_eq!(hero.defense(), 6);
        assert_eq!(hero.items(), &[relic]);
    }

    #[test]
    fn test_respawn_restores_pools() {
        let mut hero = Hero::from_preset(HeroPreset::Ranger);
        hero.home = Fixed::from_num(60);
        hero.position = Fixed::from_num(500);
        hero.take_damage(10_000, &mut never_lucky());
        hero.fall(150);
        assert!(!hero.is_alive());
        assert_eq!(hero.respawn_countdown(), 150);

        hero.respawn();
        assert!(hero.is_alive());
        assert_eq!(hero.current_health(), hero.max_health());
        assert_eq!(hero.current_shield(), hero.max_shield());
        assert_eq!(hero.position(), Fixed::from_num(60));
    }

    #[test]
    fn test_preset_parse() {
        assert_eq!("Battle Mage".parse::<HeroPreset>(), Ok(HeroPreset::BattleMage));
        assert!("paladin".parse::<HeroPreset>().is_err());
    }
}
