//! Reactive scripted controller for a non-player side.
//!
//! The policy has no memory beyond a purchase timer. Every tick it picks
//! the hostile unit nearest its hero and parks the hero a fixed stand-off
//! distance in front of it; with no hostiles it walks home.

use rand::seq::{IteratorRandom, SliceRandom};
use rand::Rng;

use crate::catalog::UnitKind;
use crate::config::BattleConfig;
use crate::hero::{HeroPreset, PrimaryAttribute};
use crate::items::{affordable_items, Item};
use crate::math::{lane_distance, roll_chance, Fixed};
use crate::side::Side;

/// Random picks made while looking for a contrasting opponent.
const OPPONENT_PICK_ATTEMPTS: usize = 6;

/// Scripted behaviour for one side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OpponentPolicy {
    side: Side,
    purchase_timer: u32,
}

/// What a purchase attempt decided to buy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PurchasePlan {
    /// Item to buy before the unit, if any.
    pub item: Option<&'static Item>,
    /// Unit to queue, if any was affordable.
    pub unit: Option<UnitKind>,
}

impl OpponentPolicy {
    /// Create a policy with a freshly randomized purchase timer.
    pub fn new<R: Rng + ?Sized>(side: Side, config: &BattleConfig, rng: &mut R) -> Self {
        Self {
            side,
            purchase_timer: Self::roll_timer(config, rng),
        }
    }

    /// Side this policy drives.
    #[must_use]
    pub const fn side(&self) -> Side {
        self.side
    }

    /// Ticks left before the next purchase attempt.
    #[must_use]
    pub const fn purchase_timer(&self) -> u32 {
        self.purchase_timer
    }

    fn roll_timer<R: Rng + ?Sized>(config: &BattleConfig, rng: &mut R) -> u32 {
        rng.gen_range(config.opponent_purchase_min_ticks..=config.opponent_purchase_max_ticks)
    }

    /// Where the hero should head this tick.
    ///
    /// `hostiles` are enemy unit positions in deterministic order; ties in
    /// distance go to the earliest.
    pub fn choose_destination<I>(&self, hero_position: Fixed, hostiles: I, config: &BattleConfig) -> Fixed
    where
        I: IntoIterator<Item = Fixed>,
    {
        let mut nearest: Option<(Fixed, Fixed)> = None;
        for position in hostiles {
            let distance = lane_distance(hero_position, position);
            if nearest.map_or(true, |(best, _)| distance < best) {
                nearest = Some((distance, position));
            }
        }

        match nearest {
            Some((_, target)) => {
                config.clamp_to_lane(self.side.forward(target, -config.opponent_stand_off))
            }
            None => config.hero_home(self.side),
        }
    }

    /// Count the purchase timer down. On firing, re-randomize it and
    /// return `true`.
    pub fn tick_purchase_timer<R: Rng + ?Sized>(&mut self, config: &BattleConfig, rng: &mut R) -> bool {
        self.purchase_timer = self.purchase_timer.saturating_sub(1);
        if self.purchase_timer > 0 {
            return false;
        }
        self.purchase_timer = Self::roll_timer(config, rng);
        true
    }

    /// Decide what to buy with `gold`.
    ///
    /// With enough gold, an item may be bought first; the unit is then
    /// chosen uniformly among archetypes affordable from what remains.
    pub fn plan_purchase<R: Rng + ?Sized>(gold: u32, config: &BattleConfig, rng: &mut R) -> PurchasePlan {
        let mut remaining = gold;
        let mut plan = PurchasePlan::default();

        if gold >= config.opponent_item_gold_threshold
            && roll_chance(rng, config.opponent_item_chance)
        {
            plan.item = affordable_items(gold).choose(rng);
            if let Some(item) = plan.item {
                remaining -= item.cost;
            }
        }

        let affordable: Vec<UnitKind> = UnitKind::affordable(remaining).collect();
        plan.unit = affordable.choose(rng).copied();
        plan
    }
}

/// Pick a preset for the scripted side, preferring one whose primary
/// attribute differs from the player's.
pub fn choose_opponent_preset<R: Rng + ?Sized>(player: PrimaryAttribute, rng: &mut R) -> HeroPreset {
    for _ in 0..OPPONENT_PICK_ATTEMPTS {
        if let Some(&preset) = HeroPreset::ALL.choose(rng) {
            if preset.primary() != player {
                return preset;
            }
        }
    }
    HeroPreset::ALL
        .choose(rng)
        .copied()
        .unwrap_or(HeroPreset::Berserker)
}
