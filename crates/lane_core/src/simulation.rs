//! Core battle loop.
//!
//! [`BattleSimulation`] owns both sides and advances the lane one discrete
//! tick at a time. A driver calls [`BattleSimulation::advance`] at a fixed
//! period and feeds commands in between ticks.
//!
//! # Determinism
//!
//! - No floating-point math (lane values use [`Fixed`])
//! - All randomness comes from the injected generator
//! - Units are iterated in sorted-ID order, left side first
//! - Same seed and same commands always produce the same battle
//!
//! # Example
//!
//! ```
//! use lane_core::prelude::*;
//!
//! let mut sim = BattleSimulation::from_seed(
//!     BattleConfig::default(),
//!     Hero::from_preset(HeroPreset::Ranger),
//!     Hero::from_preset(HeroPreset::Berserker),
//!     42,
//! )
//! .unwrap();
//!
//! sim.queue_unit(Side::Left, UnitKind::Soldier).unwrap();
//! sim.set_hero_destination(Side::Left, Fixed::from_num(400)).unwrap();
//!
//! for _ in 0..300 {
//!     sim.advance();
//! }
//! assert_eq!(sim.side(Side::Left).units.len(), 1);
//! ```

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::catalog::UnitKind;
use crate::command::BattleCommand;
use crate::config::BattleConfig;
use crate::error::{GameError, Result};
use crate::hero::Hero;
use crate::items::{find_item, Item};
use crate::math::{lane_distance, step_toward, Fixed};
use crate::opponent::OpponentPolicy;
use crate::side::{Side, SideState};
use crate::snapshot::{BattleSnapshot, HeroSnapshot, Outcome, SideSnapshot, UnitSnapshot};
use crate::unit::{CombatUnit, UnitId};

/// Something that can strike or be struck.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Combatant {
    /// A side's hero.
    Hero(Side),
    /// A unit, by owning side and ID.
    Unit(Side, UnitId),
}

impl Combatant {
    /// Owning side.
    #[must_use]
    pub const fn side(self) -> Side {
        match self {
            Self::Hero(side) | Self::Unit(side, _) => side,
        }
    }
}

/// A resolved attack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DamageEvent {
    /// Who attacked.
    pub attacker: Combatant,
    /// Who was attacked.
    pub target: Combatant,
    /// Damage after mitigation, before shield and evasion.
    pub amount: i32,
    /// The hit left the target at or below zero health.
    pub lethal: bool,
}

/// Damage dealt to a base.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BaseHit {
    /// Who dealt the damage.
    pub attacker: Combatant,
    /// Side whose base was hit.
    pub base: Side,
    /// Damage actually applied after clamping.
    pub amount: i32,
}

/// Events generated during a simulation tick.
///
/// Drivers use these for logging, metrics and presentation.
#[derive(Debug, Clone, Default)]
pub struct TickEvents {
    /// Attacks resolved this tick, in resolution order.
    pub damage_events: Vec<DamageEvent>,
    /// Units removed at end of tick, with their final state.
    pub unit_deaths: Vec<CombatUnit>,
    /// Units spawned by a wave.
    pub spawned: Vec<(Side, UnitId)>,
    /// Heroes defeated this tick.
    pub hero_defeats: Vec<Side>,
    /// Heroes that came back this tick.
    pub hero_respawns: Vec<Side>,
    /// Siege damage.
    pub base_hits: Vec<BaseHit>,
    /// Income was paid out.
    pub income_paid: bool,
    /// A wave launched this tick.
    pub wave_launched: bool,
    /// Set on the tick the battle is decided.
    pub outcome: Option<Outcome>,
}

impl TickEvents {
    /// One-line description of the most notable event, if any.
    #[must_use]
    pub fn headline(&self) -> Option<String> {
        if let Some(outcome) = self.outcome {
            return Some(format!("The {} side destroyed the enemy base", outcome.winner));
        }
        if let Some(side) = self.hero_defeats.first() {
            return Some(format!("The {side} hero has fallen"));
        }
        if let Some(side) = self.hero_respawns.first() {
            return Some(format!("The {side} hero has respawned"));
        }
        if self.wave_launched {
            return Some(format!("A wave launched with {} units", self.spawned.len()));
        }
        if let Some(hit) = self.base_hits.last() {
            return Some(format!("The {} base took {} damage", hit.base, hit.amount));
        }
        None
    }
}

/// A pending attack gathered before any damage is applied.
#[derive(Debug, Clone, Copy)]
struct Strike {
    attacker: Combatant,
    target: Combatant,
}

fn split_sides(sides: &mut [SideState; 2], side: Side) -> (&mut SideState, &mut SideState) {
    let [left, right] = sides;
    match side {
        Side::Left => (left, right),
        Side::Right => (right, left),
    }
}

/// Nearest living enemy unit within `range` of `position`. Ties go to the
/// lower ID.
fn nearest_enemy_unit(enemy: &SideState, position: Fixed, range: Fixed) -> Option<UnitId> {
    let mut best: Option<(Fixed, UnitId)> = None;
    for unit in enemy.units.iter_sorted() {
        if unit.is_dead() {
            continue;
        }
        let distance = lane_distance(position, unit.position);
        if distance <= range && best.map_or(true, |(d, _)| distance < d) {
            best = Some((distance, unit.id));
        }
    }
    best.map(|(_, id)| id)
}

/// The two-sided lane battle.
///
/// Generic over the random source so tests can inject a fixed sequence.
#[derive(Debug, Clone)]
pub struct BattleSimulation<R = ChaCha8Rng> {
    config: BattleConfig,
    /// Ticks completed.
    tick: u64,
    sides: [SideState; 2],
    opponents: [Option<OpponentPolicy>; 2],
    rng: R,
    outcome: Option<Outcome>,
    last_event: String,
}

impl BattleSimulation<ChaCha8Rng> {
    /// Create a battle with a deterministic generator seeded from `seed`.
    pub fn from_seed(config: BattleConfig, left: Hero, right: Hero, seed: u64) -> Result<Self> {
        Self::new(config, left, right, ChaCha8Rng::seed_from_u64(seed))
    }

    /// Create a battle seeded from operating-system entropy.
    pub fn from_entropy(config: BattleConfig, left: Hero, right: Hero) -> Result<Self> {
        Self::new(config, left, right, ChaCha8Rng::from_entropy())
    }
}

impl<R: Rng> BattleSimulation<R> {
    /// Create a battle with both heroes at home and empty lanes.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidConfig`] if the config fails validation.
    pub fn new(config: BattleConfig, left: Hero, right: Hero, rng: R) -> Result<Self> {
        config.validate()?;

        let place = |mut hero: Hero, side: Side| {
            hero.home = config.hero_home(side);
            hero.position = hero.home;
            hero.destination = hero.home;
            hero
        };
        let sides = [
            SideState::new(place(left, Side::Left), config.base_health),
            SideState::new(place(right, Side::Right), config.base_health),
        ];

        Ok(Self {
            config,
            tick: 0,
            sides,
            opponents: [None, None],
            rng,
            outcome: None,
            last_event: "The battle begins".to_string(),
        })
    }

    // ========================================
    // Accessors
    // ========================================

    /// Ticks completed so far.
    #[must_use]
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// The battle's tuning.
    #[must_use]
    pub fn config(&self) -> &BattleConfig {
        &self.config
    }

    /// One side's state.
    #[must_use]
    pub fn side(&self, side: Side) -> &SideState {
        &self.sides[side.index()]
    }

    /// One side's hero.
    #[must_use]
    pub fn hero(&self, side: Side) -> &Hero {
        &self.sides[side.index()].hero
    }

    /// One side's base health.
    #[must_use]
    pub fn base_health(&self, side: Side) -> i32 {
        self.sides[side.index()].base_health
    }

    /// Result once the battle is decided.
    #[must_use]
    pub const fn outcome(&self) -> Option<Outcome> {
        self.outcome
    }

    /// Whether the battle has ended.
    #[must_use]
    pub const fn is_over(&self) -> bool {
        self.outcome.is_some()
    }

    /// Description of the most recent notable event.
    #[must_use]
    pub fn last_event(&self) -> &str {
        &self.last_event
    }

    /// Ticks until the next wave launches.
    #[must_use]
    pub fn ticks_until_next_wave(&self) -> u32 {
        let interval = u64::from(self.config.wave_interval_ticks);
        (interval - self.tick % interval) as u32
    }

    /// Whether a side is driven by the scripted policy.
    #[must_use]
    pub fn is_scripted(&self, side: Side) -> bool {
        self.opponents[side.index()].is_some()
    }

    /// Hand a side to the scripted opponent policy.
    pub fn enable_opponent(&mut self, side: Side) {
        self.opponents[side.index()] = Some(OpponentPolicy::new(side, &self.config, &mut self.rng));
    }

    /// Return a side to manual control.
    pub fn disable_opponent(&mut self, side: Side) {
        self.opponents[side.index()] = None;
    }

    // ========================================
    // Commands
    // ========================================

    /// Apply a command from a controller.
    pub fn apply_command(&mut self, command: BattleCommand) -> Result<()> {
        match command {
            BattleCommand::SetHeroDestination { side, position } => {
                self.set_hero_destination(side, position)
            }
            BattleCommand::QueueUnit { side, unit } => self.queue_unit(side, unit),
            BattleCommand::BuyItem { side, item } => self.buy_item(side, find_item(&item)?),
        }
    }

    /// Point a hero at a lane position, clamped to the lane.
    pub fn set_hero_destination(&mut self, side: Side, position: Fixed) -> Result<()> {
        self.ensure_running()?;
        let clamped = self.config.clamp_to_lane(position);
        self.sides[side.index()].hero.destination = clamped;
        Ok(())
    }

    /// Buy a unit for the next wave.
    ///
    /// On success the side's income rises by the unit's bonus right away,
    /// whether or not the unit ever reaches the lane.
    ///
    /// # Errors
    ///
    /// [`GameError::InsufficientGold`] leaves gold, income and queue untouched.
    pub fn queue_unit(&mut self, side: Side, kind: UnitKind) -> Result<()> {
        self.ensure_running()?;
        let archetype = kind.archetype();
        let state = &mut self.sides[side.index()];
        if !state.hero.spend_gold(archetype.cost) {
            return Err(GameError::InsufficientGold {
                required: archetype.cost,
                available: state.hero.gold(),
            });
        }
        state.hero.add_income(archetype.income_bonus);
        state.queue.push(kind);
        tracing::debug!(%side, unit = %kind, "Unit queued");
        Ok(())
    }

    /// Buy a shop item for a side's hero.
    pub fn buy_item(&mut self, side: Side, item: &Item) -> Result<()> {
        self.ensure_running()?;
        let hero = &mut self.sides[side.index()].hero;
        if !hero.spend_gold(item.cost) {
            return Err(GameError::InsufficientGold {
                required: item.cost,
                available: hero.gold(),
            });
        }
        hero.apply_item(*item);
        tracing::debug!(%side, item = item.name, "Item purchased");
        Ok(())
    }

    /// Place a unit directly on the lane, outside the wave cadence.
    ///
    /// Used by scenarios that start mid-battle.
    pub fn spawn_unit_at(&mut self, side: Side, kind: UnitKind, position: Fixed) -> UnitId {
        let position = self.config.clamp_to_lane(position);
        self.sides[side.index()]
            .units
            .insert(CombatUnit::new(kind, side, position))
    }

    fn ensure_running(&self) -> Result<()> {
        if self.is_over() {
            Err(GameError::BattleOver)
        } else {
            Ok(())
        }
    }

    // ========================================
    // Tick
    // ========================================

    /// Advance the battle by one tick.
    ///
    /// Does nothing once the battle is decided.
    ///
    /// # System Order
    ///
    /// 1. Scripted controllers (retarget, purchases)
    /// 2. Cooldowns and engagement flags roll forward
    /// 3. Respawn countdowns
    /// 4. Hero movement
    /// 5. Engagement, unit movement, engagement again
    /// 6. Combat (units and heroes)
    /// 7. Unit siege, then hero siege (may end the battle)
    /// 8. Removal of dead units
    /// 9. Income and waves
    pub fn advance(&mut self) -> TickEvents {
        let mut events = TickEvents::default();
        if self.is_over() {
            return events;
        }
        let tick = self.tick + 1;

        self.run_opponent_system();
        self.run_cooldown_system();
        self.run_respawn_system(&mut events);
        self.run_hero_movement_system();
        self.run_engagement_system();
        self.run_unit_movement_system();
        self.run_engagement_system();
        self.run_combat_system(&mut events);

        let winner = self
            .run_unit_siege_system(&mut events)
            .or_else(|| self.run_hero_siege_system(&mut events));

        self.run_removal_system(&mut events);

        if let Some(winner) = winner {
            self.conclude(winner, tick, &mut events);
        } else {
            self.run_economy_system(tick, &mut events);
        }

        self.tick = tick;
        if let Some(headline) = events.headline() {
            self.last_event = headline;
        }

        #[cfg(debug_assertions)]
        {
            let hash = self.state_hash();
            tracing::trace!(tick = self.tick, state_hash = hash, "Battle state hash");
        }

        events
    }

    fn run_opponent_system(&mut self) {
        for side in Side::BOTH {
            let Some(mut policy) = self.opponents[side.index()] else {
                continue;
            };
            let (own, enemy) = split_sides(&mut self.sides, side);

            let hostiles = enemy.units.iter_sorted().map(|unit| unit.position);
            own.hero.destination =
                policy.choose_destination(own.hero.position, hostiles, &self.config);

            if policy.tick_purchase_timer(&self.config, &mut self.rng) {
                let plan = OpponentPolicy::plan_purchase(own.hero.gold(), &self.config, &mut self.rng);
                if let Some(item) = plan.item {
                    if own.hero.spend_gold(item.cost) {
                        own.hero.apply_item(*item);
                        tracing::debug!(%side, item = item.name, "Scripted item purchase");
                    }
                }
                if let Some(kind) = plan.unit {
                    let archetype = kind.archetype();
                    if own.hero.spend_gold(archetype.cost) {
                        own.hero.add_income(archetype.income_bonus);
                        own.queue.push(kind);
                        tracing::debug!(%side, unit = %kind, "Scripted unit purchase");
                    }
                }
            }

            self.opponents[side.index()] = Some(policy);
        }
    }

    fn run_cooldown_system(&mut self) {
        for state in &mut self.sides {
            for unit in state.units.iter_mut() {
                unit.begin_tick();
            }
            let hero = &mut state.hero;
            if hero.alive {
                hero.attack_cooldown = hero.attack_cooldown.saturating_sub(1);
                hero.base_attack_cooldown = hero.base_attack_cooldown.saturating_sub(1);
            }
        }
    }

    fn run_respawn_system(&mut self, events: &mut TickEvents) {
        for side in Side::BOTH {
            let hero = &mut self.sides[side.index()].hero;
            if hero.alive {
                continue;
            }
            hero.respawn_countdown = hero.respawn_countdown.saturating_sub(1);
            if hero.respawn_countdown == 0 {
                hero.respawn();
                events.hero_respawns.push(side);
                tracing::debug!(%side, "Hero respawned");
            }
        }
    }

    fn run_hero_movement_system(&mut self) {
        let speed = self.config.hero_speed;
        for state in &mut self.sides {
            let hero = &mut state.hero;
            if hero.alive {
                hero.position = step_toward(hero.position, hero.destination, speed);
            }
        }
    }

    /// Mark contact between opposing units and against the enemy hero.
    ///
    /// Overlapping pairs are pushed apart to straddle their midpoint
    /// exactly one unit width apart.
    fn run_engagement_system(&mut self) {
        let size = self.config.unit_size;
        let half = self.config.half_unit();
        let [left, right] = &mut self.sides;
        let left_ids = left.units.sorted_ids();
        let right_ids = right.units.sorted_ids();

        for &left_id in &left_ids {
            for &right_id in &right_ids {
                let (Some(a), Some(b)) = (left.units.get_mut(left_id), right.units.get_mut(right_id))
                else {
                    continue;
                };
                if a.is_dead() || b.is_dead() {
                    continue;
                }

                let distance = lane_distance(a.position, b.position);
                if distance < size {
                    let midpoint = (a.position + b.position) / 2;
                    a.position = midpoint - half;
                    b.position = midpoint + half;
                    a.engaged = true;
                    b.engaged = true;
                } else {
                    if distance <= a.range() {
                        a.engaged = true;
                    }
                    if distance <= b.range() {
                        b.engaged = true;
                    }
                }
            }
        }

        engage_enemy_hero(left, right);
        engage_enemy_hero(right, left);
    }

    fn run_unit_movement_system(&mut self) {
        let speed = self.config.unit_speed;
        for side in Side::BOTH {
            let siege_line = self.config.unit_siege_position(side);
            for unit in self.sides[side.index()].units.iter_mut() {
                if unit.can_advance() && !unit.at_base {
                    let moved = side.forward(unit.position, speed);
                    unit.position = if side.has_reached(moved, siege_line) {
                        siege_line
                    } else {
                        moved
                    };
                }
                unit.at_base = side.has_reached(unit.position, siege_line);
            }
        }
    }

    /// Gather every ready attacker's target first, then apply the hits.
    /// Deaths wait until every gathered strike has landed, so two heroes
    /// can trade killing blows on the same tick.
    fn run_combat_system(&mut self, events: &mut TickEvents) {
        let strikes = self.gather_strikes();
        for strike in strikes {
            match strike.attacker {
                Combatant::Unit(side, id) => self.resolve_unit_strike(side, id, strike.target, events),
                Combatant::Hero(side) => self.resolve_hero_strike(side, strike.target, events),
            }
        }

        let respawn_ticks = self.config.respawn_ticks;
        for side in Side::BOTH {
            let (own, enemy) = split_sides(&mut self.sides, side);
            if own.hero.alive && !own.hero.can_be_struck() {
                defeat_hero(side, own, enemy, respawn_ticks, events);
            }
        }
    }

    fn gather_strikes(&self) -> Vec<Strike> {
        let mut strikes = Vec::new();
        for side in Side::BOTH {
            let own = &self.sides[side.index()];
            let enemy = &self.sides[side.opponent().index()];
            let enemy_hero = &enemy.hero;

            for unit in own.units.iter_sorted() {
                if unit.is_dead() || unit.attack_cooldown > 0 {
                    continue;
                }
                let range = unit.range();
                let target = match nearest_enemy_unit(enemy, unit.position, range) {
                    Some(id) => Some(Combatant::Unit(side.opponent(), id)),
                    None if enemy_hero.alive
                        && lane_distance(unit.position, enemy_hero.position) <= range =>
                    {
                        Some(Combatant::Hero(side.opponent()))
                    }
                    None => None,
                };
                if let Some(target) = target {
                    strikes.push(Strike {
                        attacker: Combatant::Unit(side, unit.id),
                        target,
                    });
                }
            }

            let hero = &own.hero;
            if !hero.alive || hero.attack_cooldown > 0 {
                continue;
            }
            let range = hero.attack_range();
            let target = if enemy_hero.alive && lane_distance(hero.position, enemy_hero.position) <= range
            {
                Some(Combatant::Hero(side.opponent()))
            } else {
                nearest_enemy_unit(enemy, hero.position, range)
                    .map(|id| Combatant::Unit(side.opponent(), id))
            };
            if let Some(target) = target {
                strikes.push(Strike {
                    attacker: Combatant::Hero(side),
                    target,
                });
            }
        }
        strikes
    }

    /// The cooldown only resets when the strike reaches its target.
    fn resolve_unit_strike(&mut self, side: Side, id: UnitId, target: Combatant, events: &mut TickEvents) {
        let cooldown = self.config.unit_attack_cooldown_ticks;
        let (own, enemy) = split_sides(&mut self.sides, side);
        let Some(unit) = own.units.get_mut(id) else {
            return;
        };
        let damage = unit.archetype().damage;

        let (amount, lethal) = match target {
            Combatant::Unit(_, target_id) => {
                let Some(victim) = enemy.units.get_mut(target_id) else {
                    return;
                };
                (damage, victim.take_hit(damage, false))
            }
            Combatant::Hero(_) => {
                if !enemy.hero.can_be_struck() {
                    return;
                }
                let amount = (damage - enemy.hero.defense()).max(1);
                (amount, enemy.hero.take_damage(amount, &mut self.rng))
            }
        };

        unit.attack_cooldown = cooldown;
        events.damage_events.push(DamageEvent {
            attacker: Combatant::Unit(side, id),
            target,
            amount,
            lethal,
        });
    }

    fn resolve_hero_strike(&mut self, side: Side, target: Combatant, events: &mut TickEvents) {
        let attack_delay = self.config.hero_attack_delay_ticks;
        let post_kill_delay = self.config.hero_post_kill_delay_ticks;
        let (own, enemy) = split_sides(&mut self.sides, side);
        if !own.hero.alive {
            return;
        }

        let (amount, lethal) = match target {
            Combatant::Hero(_) => {
                if !enemy.hero.can_be_struck() {
                    return;
                }
                let rolled = own.hero.roll_attack_damage(&mut self.rng);
                let amount = (rolled - enemy.hero.defense()).max(1);
                let lethal = enemy.hero.take_damage(amount, &mut self.rng);
                let delay = if lethal { post_kill_delay } else { attack_delay };
                own.hero.attack_cooldown = own.hero.attack_delay_ticks(delay);
                (amount, lethal)
            }
            Combatant::Unit(_, target_id) => {
                let Some(victim) = enemy.units.get_mut(target_id) else {
                    return;
                };
                let amount = own.hero.roll_attack_damage(&mut self.rng);
                own.hero.attack_cooldown = own.hero.attack_delay_ticks(attack_delay);
                (amount, victim.take_hit(amount, true))
            }
        };

        events.damage_events.push(DamageEvent {
            attacker: Combatant::Hero(side),
            target,
            amount,
            lethal,
        });
    }

    /// Units standing on the enemy base line hit the base. Returns the
    /// winner if a base falls.
    fn run_unit_siege_system(&mut self, events: &mut TickEvents) -> Option<Side> {
        let cooldown = self.config.unit_base_attack_cooldown_ticks;
        for side in Side::BOTH {
            let (own, enemy) = split_sides(&mut self.sides, side);
            for id in own.units.sorted_ids() {
                let Some(unit) = own.units.get_mut(id) else {
                    continue;
                };
                if unit.is_dead() || !unit.at_base || unit.base_attack_cooldown > 0 {
                    continue;
                }
                unit.base_attack_cooldown = cooldown;
                let applied = enemy.damage_base(unit.archetype().damage);
                own.stats.siege_damage += applied.unsigned_abs();
                events.base_hits.push(BaseHit {
                    attacker: Combatant::Unit(side, id),
                    base: side.opponent(),
                    amount: applied,
                });
                if enemy.base_destroyed() {
                    return Some(side);
                }
            }
        }
        None
    }

    /// A hero may hit the enemy base only while the enemy hero is down.
    fn run_hero_siege_system(&mut self, events: &mut TickEvents) -> Option<Side> {
        let cooldown = self.config.hero_base_attack_cooldown_ticks;
        let floor = self.config.hero_base_damage;
        for side in Side::BOTH {
            let enemy_line = self.config.base_line(side.opponent());
            let (own, enemy) = split_sides(&mut self.sides, side);
            let hero = &mut own.hero;
            if !hero.alive
                || enemy.hero.alive
                || hero.base_attack_cooldown > 0
                || !side.has_reached(hero.position, enemy_line)
            {
                continue;
            }
            hero.base_attack_cooldown = cooldown;
            let damage = floor.max(hero.attack().saturating_mul(3));
            let applied = enemy.damage_base(damage);
            own.stats.siege_damage += applied.unsigned_abs();
            events.base_hits.push(BaseHit {
                attacker: Combatant::Hero(side),
                base: side.opponent(),
                amount: applied,
            });
            if enemy.base_destroyed() {
                return Some(side);
            }
        }
        None
    }

    fn run_removal_system(&mut self, events: &mut TickEvents) {
        let bounty = self.config.unit_kill_bounty;
        for side in Side::BOTH {
            let (own, enemy) = split_sides(&mut self.sides, side);
            for unit in own.units.sweep_dead() {
                own.stats.units_lost += 1;
                enemy.stats.units_killed += 1;
                if unit.last_hit_by_hero {
                    enemy.hero.earn_gold(bounty);
                }
                events.unit_deaths.push(unit);
            }
        }
    }

    fn run_economy_system(&mut self, tick: u64, events: &mut TickEvents) {
        if tick % u64::from(self.config.income_interval_ticks) == 0 {
            for state in &mut self.sides {
                state.hero.earn_income();
            }
            events.income_paid = true;
        }

        if tick % u64::from(self.config.wave_interval_ticks) == 0 {
            for side in Side::BOTH {
                let spawn = self.config.unit_spawn(side);
                let state = &mut self.sides[side.index()];
                for kind in std::mem::take(&mut state.queue) {
                    let id = state.units.insert(CombatUnit::new(kind, side, spawn));
                    events.spawned.push((side, id));
                }
            }
            events.wave_launched = true;
            tracing::debug!(tick, spawned = events.spawned.len(), "Wave launched");
        }
    }

    fn conclude(&mut self, winner: Side, tick: u64, events: &mut TickEvents) {
        let outcome = Outcome {
            winner,
            tick,
            base_health: [self.sides[0].base_health, self.sides[1].base_health],
        };
        self.outcome = Some(outcome);
        events.outcome = Some(outcome);
        tracing::info!(%winner, tick, "Battle decided");
    }

    // ========================================
    // Views
    // ========================================

    /// Read-only view of the whole battle.
    #[must_use]
    pub fn snapshot(&self) -> BattleSnapshot {
        let side_snapshot = |side: Side| {
            let state = &self.sides[side.index()];
            let hero = &state.hero;
            SideSnapshot {
                side,
                hero: HeroSnapshot {
                    name: hero.name().to_string(),
                    health: hero.displayed_health(),
                    max_health: hero.max_health(),
                    shield: hero.displayed_shield(),
                    max_shield: hero.max_shield(),
                    attack: hero.attack(),
                    defense: hero.defense(),
                    gold: hero.gold(),
                    income: hero.income(),
                    position: hero.position.to_num(),
                    destination: hero.destination.to_num(),
                    alive: hero.alive,
                    respawn_countdown: hero.respawn_countdown,
                    items: hero.items().iter().map(|item| item.name.to_string()).collect(),
                },
                base_health: state.base_health,
                units: state
                    .units
                    .iter_sorted()
                    .map(|unit| UnitSnapshot {
                        id: unit.id,
                        kind: unit.kind,
                        position: unit.position.to_num(),
                        health: unit.health,
                        engaged: unit.engaged,
                    })
                    .collect(),
                queued: state.queue.clone(),
                stats: state.stats,
            }
        };

        BattleSnapshot {
            tick: self.tick,
            sides: [side_snapshot(Side::Left), side_snapshot(Side::Right)],
            ticks_until_next_wave: self.ticks_until_next_wave(),
            last_event: self.last_event.clone(),
            outcome: self.outcome,
        }
    }

    /// Compute a hash of the simulation state for desync detection.
    ///
    /// The random generator is not hashed; two runs with the same seed and
    /// inputs agree on every tick's hash.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.tick.hash(&mut hasher);

        for state in &self.sides {
            state.hero.hash(&mut hasher);
            state.base_health.hash(&mut hasher);
            state.stats.hash(&mut hasher);

            let mut queue = state.queue.clone();
            queue.sort_unstable();
            queue.hash(&mut hasher);

            state.units.len().hash(&mut hasher);
            for unit in state.units.iter_sorted() {
                unit.hash(&mut hasher);
            }
        }

        self.opponents.hash(&mut hasher);
        self.outcome.hash(&mut hasher);
        hasher.finish()
    }
}

/// Flip the hero of `side` to dead and credit the kill to its opponent.
fn defeat_hero(
    side: Side,
    defender: &mut SideState,
    attacker: &mut SideState,
    respawn_ticks: u32,
    events: &mut TickEvents,
) {
    defender.hero.fall(respawn_ticks);
    attacker.stats.hero_kills += 1;
    events.hero_defeats.push(side);
    tracing::debug!(%side, "Hero defeated");
}

/// Units within reach of the living enemy hero are in contact with it.
fn engage_enemy_hero(own: &mut SideState, enemy: &SideState) {
    if !enemy.hero.alive {
        return;
    }
    let hero_position = enemy.hero.position;
    for unit in own.units.iter_mut() {
        if !unit.is_dead() && lane_distance(unit.position, hero_position) <= unit.range() {
            unit.engaged = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hero::{HeroPreset, HeroStats, PrimaryAttribute};
    use rand::rngs::mock::StepRng;

    fn seeded() -> BattleSimulation {
        BattleSimulation::from_seed(
            BattleConfig::default(),
            Hero::from_preset(HeroPreset::Ranger),
            Hero::from_preset(HeroPreset::Berserker),
            1,
        )
        .unwrap()
    }

    /// A hero that never evades or crits.
    fn plain_hero(attack: i32, health: i32) -> Hero {
        Hero::new(HeroStats {
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
        })
    }

    fn plain_battle(config: BattleConfig) -> BattleSimulation<StepRng> {
        BattleSimulation::new(config, plain_hero(10, 100), plain_hero(10, 100), StepRng::new(0, 0))
            .unwrap()
    }

    #[test]
    fn test_new_places_heroes_at_home() {
        let sim = seeded();
        assert_eq!(sim.tick(), 0);
        assert_eq!(sim.hero(Side::Left).position(), Fixed::from_num(60));
        assert_eq!(sim.hero(Side::Right).position(), Fixed::from_num(900));
        assert_eq!(sim.base_health(Side::Left), 1000);
        assert_eq!(sim.ticks_until_next_wave(), 300);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = BattleConfig {
            unit_size: Fixed::ZERO,
            ..BattleConfig::default()
        };
        let result = BattleSimulation::from_seed(
            config,
            Hero::from_preset(HeroPreset::Ranger),
            Hero::from_preset(HeroPreset::Ranger),
            0,
        );
        assert!(matches!(result, Err(GameError::InvalidConfig(_))));
    }

    #[test]
    fn test_queue_unit_raises_income_immediately() {
        let mut sim = seeded();
        let before = sim.hero(Side::Left).clone();
        sim.queue_unit(Side::Left, UnitKind::Knight).unwrap();
        let hero = sim.hero(Side::Left);
        assert_eq!(hero.gold(), before.gold() - 90);
        assert_eq!(hero.income(), before.income() + 6);
        assert_eq!(sim.side(Side::Left).queue, vec![UnitKind::Knight]);
    }

    #[test]
    fn test_queue_unit_rejects_unaffordable() {
        let mut sim = plain_battle(BattleConfig::default());
        for _ in 0..4 {
            sim.queue_unit(Side::Right, UnitKind::SiegeGolem).unwrap();
        }
        let err = sim.queue_unit(Side::Right, UnitKind::SiegeGolem).unwrap_err();
        assert_eq!(
            err,
            GameError::InsufficientGold {
                required: 120,
                available: 20
            }
        );
        assert_eq!(sim.hero(Side::Right).income(), 10 + 4 * 8);
        assert_eq!(sim.side(Side::Right).queue.len(), 4);
    }

    #[test]
    fn test_destination_is_clamped() {
        let mut sim = seeded();
        sim.set_hero_destination(Side::Left, Fixed::from_num(-50)).unwrap();
        assert_eq!(sim.hero(Side::Left).destination(), Fixed::ZERO);
        sim.set_hero_destination(Side::Left, Fixed::from_num(99_999)).unwrap();
        assert_eq!(sim.hero(Side::Left).destination(), Fixed::from_num(960));
    }

    #[test]
    fn test_hero_walks_at_fixed_speed() {
        let mut sim = seeded();
        sim.set_hero_destination(Side::Left, Fixed::from_num(70)).unwrap();
        sim.advance();
        assert_eq!(sim.hero(Side::Left).position(), Fixed::from_num(63));
        for _ in 0..5 {
            sim.advance();
        }
        assert_eq!(sim.hero(Side::Left).position(), Fixed::from_num(70));
    }

    #[test]
    fn test_wave_spawns_queue_at_base_edge() {
        let mut sim = seeded();
        sim.queue_unit(Side::Left, UnitKind::Scout).unwrap();
        sim.queue_unit(Side::Left, UnitKind::Scout).unwrap();
        sim.queue_unit(Side::Right, UnitKind::Archer).unwrap();

        for _ in 0..299 {
            let events = sim.advance();
            assert!(events.spawned.is_empty());
        }
        let events = sim.advance();
        assert!(events.wave_launched);
        assert_eq!(events.spawned.len(), 3);
        assert!(sim.side(Side::Left).queue.is_empty());
        assert!(sim.side(Side::Right).queue.is_empty());
        for unit in sim.side(Side::Left).units.iter_sorted() {
            assert_eq!(unit.position, sim.config().unit_spawn(Side::Left));
        }
        let archer = sim.side(Side::Right).units.iter_sorted().next().unwrap();
        assert_eq!(archer.kind, UnitKind::Archer);
        assert_eq!(archer.position, Fixed::from_num(888));
    }

    #[test]
    fn test_empty_wave_spawns_nothing() {
        let mut sim = seeded();
        for _ in 0..300 {
            sim.advance();
        }
        assert!(sim.side(Side::Left).units.is_empty());
        assert!(sim.side(Side::Right).units.is_empty());
    }

    #[test]
    fn test_income_paid_on_interval() {
        let mut sim = seeded();
        let gold = sim.hero(Side::Right).gold();
        for _ in 0..99 {
            assert!(!sim.advance().income_paid);
        }
        assert!(sim.advance().income_paid);
        assert_eq!(sim.hero(Side::Right).gold(), gold + 24);
    }

    #[test]
    fn test_overlapping_units_lock_apart() {
        let mut sim = plain_battle(BattleConfig::default());
        let a = sim.spawn_unit_at(Side::Left, UnitKind::Soldier, Fixed::from_num(500));
        let b = sim.spawn_unit_at(Side::Right, UnitKind::Soldier, Fixed::from_num(510));
        sim.advance();

        let left = sim.side(Side::Left).units.get(a).unwrap();
        let right = sim.side(Side::Right).units.get(b).unwrap();
        assert_eq!(left.position, Fixed::from_num(493));
        assert_eq!(right.position, Fixed::from_num(517));
        assert!(left.engaged && right.engaged);
    }

    #[test]
    fn test_ranged_unit_holds_position() {
        let mut sim = plain_battle(BattleConfig::default());
        let scout = sim.spawn_unit_at(Side::Left, UnitKind::Scout, Fixed::from_num(400));
        let archer = sim.spawn_unit_at(Side::Right, UnitKind::Archer, Fixed::from_num(550));
        sim.advance();

        let archer = sim.side(Side::Right).units.get(archer).unwrap();
        assert_eq!(archer.position, Fixed::from_num(550));
        assert!(archer.engaged);

        let scout = sim.side(Side::Left).units.get(scout).unwrap();
        assert_eq!(scout.position, Fixed::lit("401.5"));
        assert!(!scout.engaged);
        assert_eq!(scout.health, 20 - 12);
    }

    #[test]
    fn test_engaged_unit_waits_one_extra_tick() {
        let mut sim = plain_battle(BattleConfig::default());
        let left = sim.spawn_unit_at(Side::Left, UnitKind::Knight, Fixed::from_num(500));
        let right = sim.spawn_unit_at(Side::Right, UnitKind::Scout, Fixed::from_num(540));
        if let Some(unit) = sim.sides[1].units.get_mut(right) {
            unit.health = 1;
        }
        sim.advance();
        assert!(sim.side(Side::Right).units.is_empty());
        let knight = sim.side(Side::Left).units.get(left).unwrap();
        assert!(knight.engaged);
        assert_eq!(knight.position, Fixed::from_num(500));

        // Contact ended, but last tick's engagement still holds it.
        sim.advance();
        let knight = sim.side(Side::Left).units.get(left).unwrap();
        assert_eq!(knight.position, Fixed::from_num(500));

        sim.advance();
        let knight = sim.side(Side::Left).units.get(left).unwrap();
        assert_eq!(knight.position, Fixed::lit("501.5"));
    }

    #[test]
    fn test_unit_strike_uses_cooldown() {
        let mut sim = plain_battle(BattleConfig::default());
        sim.spawn_unit_at(Side::Left, UnitKind::Knight, Fixed::from_num(500));
        let victim = sim.spawn_unit_at(Side::Right, UnitKind::Knight, Fixed::from_num(540));
        sim.advance();
        assert_eq!(sim.side(Side::Right).units.get(victim).unwrap().health, 55 - 16);
        for _ in 0..19 {
            sim.advance();
        }
        assert_eq!(sim.side(Side::Right).units.get(victim).unwrap().health, 55 - 16);
        sim.advance();
        assert_eq!(sim.side(Side::Right).units.get(victim).unwrap().health, 55 - 32);
    }

    #[test]
    fn test_dead_units_removed_at_end_of_tick() {
        let mut sim = plain_battle(BattleConfig::default());
        sim.spawn_unit_at(Side::Left, UnitKind::SiegeGolem, Fixed::from_num(500));
        sim.spawn_unit_at(Side::Right, UnitKind::Scout, Fixed::from_num(540));
        let events = sim.advance();
        assert_eq!(events.unit_deaths.len(), 1);
        assert!(sim.side(Side::Right).units.is_empty());
        assert_eq!(sim.side(Side::Left).stats.units_killed, 1);
        assert_eq!(sim.side(Side::Right).stats.units_lost, 1);
    }

    #[test]
    fn test_unit_siege_damages_base() {
        let mut sim = plain_battle(BattleConfig::default());
        sim.sides[1].hero.position = Fixed::from_num(500);
        sim.sides[1].hero.destination = Fixed::from_num(500);
        sim.spawn_unit_at(Side::Left, UnitKind::Soldier, Fixed::from_num(887));
        let events = sim.advance();
        assert_eq!(events.base_hits.len(), 1);
        assert_eq!(sim.base_health(Side::Right), 1000 - 9);
        assert_eq!(sim.side(Side::Left).stats.siege_damage, 9);
        let unit = sim.side(Side::Left).units.iter_sorted().next().unwrap();
        assert_eq!(unit.position, Fixed::from_num(888));
        assert!(unit.at_base);
    }

    #[test]
    fn test_base_at_exactly_zero_ends_battle() {
        let config = BattleConfig {
            base_health: 25,
            ..BattleConfig::default()
        };
        let mut sim = plain_battle(config);
        sim.spawn_unit_at(Side::Right, UnitKind::SiegeGolem, Fixed::from_num(72));
        let events = sim.advance();

        let outcome = events.outcome.unwrap();
        assert_eq!(outcome.winner, Side::Right);
        assert_eq!(outcome.tick, 1);
        assert_eq!(sim.base_health(Side::Left), 0);

        let hash = sim.state_hash();
        for _ in 0..10 {
            let events = sim.advance();
            assert!(events.damage_events.is_empty());
        }
        assert_eq!(sim.state_hash(), hash);
        assert_eq!(sim.tick(), 1);
        assert!(matches!(
            sim.queue_unit(Side::Left, UnitKind::Scout),
            Err(GameError::BattleOver)
        ));
    }

    #[test]
    fn test_duel_kills_and_respawns() {
        let config = BattleConfig {
            respawn_ticks: 5,
            ..BattleConfig::default()
        };
        let mut sim = BattleSimulation::new(
            config,
            plain_hero(200, 100),
            plain_hero(1, 100),
            StepRng::new(0, 0),
        )
        .unwrap();
        sim.sides[0].hero.position = Fixed::from_num(500);
        sim.sides[0].hero.destination = Fixed::from_num(500);
        sim.sides[1].hero.position = Fixed::from_num(520);
        sim.sides[1].hero.destination = Fixed::from_num(520);

        let events = sim.advance();
        assert_eq!(events.hero_defeats, vec![Side::Right]);
        assert!(!sim.hero(Side::Right).is_alive());
        assert_eq!(sim.side(Side::Left).stats.hero_kills, 1);
        assert_eq!(sim.hero(Side::Left).attack_cooldown, 60);
        // The fallen hero's gathered strike still lands.
        assert_eq!(sim.hero(Side::Left).current_health(), 99);

        for _ in 0..4 {
            assert!(sim.advance().hero_respawns.is_empty());
        }
        let events = sim.advance();
        assert_eq!(events.hero_respawns, vec![Side::Right]);
        let hero = sim.hero(Side::Right);
        assert!(hero.is_alive());
        assert_eq!(hero.position(), Fixed::from_num(900));
        assert_eq!(hero.current_health(), hero.max_health());
    }

    #[test]
    fn test_mirror_duel_trades_killing_blows() {
        let mut sim = BattleSimulation::new(
            BattleConfig::default(),
            plain_hero(200, 100),
            plain_hero(200, 100),
            StepRng::new(0, 0),
        )
        .unwrap();
        for side in Side::BOTH {
            sim.set_hero_destination(side, Fixed::from_num(500)).unwrap();
        }

        let mut defeats = Vec::new();
        for _ in 0..400 {
            defeats = sim.advance().hero_defeats;
            if !defeats.is_empty() {
                break;
            }
        }
        assert_eq!(defeats, vec![Side::Left, Side::Right]);
        for side in Side::BOTH {
            assert!(!sim.hero(side).is_alive());
            assert_eq!(sim.side(side).stats.hero_kills, 1);
        }
    }

    #[test]
    fn test_wasted_strike_keeps_unit_cooldown() {
        let mut sim = BattleSimulation::new(
            BattleConfig::default(),
            plain_hero(10, 100),
            plain_hero(1, 1),
            StepRng::new(0, 0),
        )
        .unwrap();
        sim.sides[1].hero.position = Fixed::from_num(500);
        sim.sides[1].hero.destination = Fixed::from_num(500);
        let first = sim.spawn_unit_at(Side::Left, UnitKind::Soldier, Fixed::from_num(470));
        let second = sim.spawn_unit_at(Side::Left, UnitKind::Soldier, Fixed::from_num(470));

        let events = sim.advance();
        let hero_hits = events
            .damage_events
            .iter()
            .filter(|event| event.target == Combatant::Hero(Side::Right))
            .count();
        assert_eq!(hero_hits, 1);
        assert_eq!(events.hero_defeats, vec![Side::Right]);

        let cooldowns: Vec<u32> = [first, second]
            .iter()
            .filter_map(|&id| sim.side(Side::Left).units.get(id))
            .map(|unit| unit.attack_cooldown)
            .collect();
        let cooldown = sim.config().unit_attack_cooldown_ticks;
        assert_eq!(cooldowns.len(), 2);
        assert_eq!(cooldowns.iter().filter(|&&c| c == cooldown).count(), 1);
        assert_eq!(cooldowns.iter().filter(|&&c| c == 0).count(), 1);
    }

    #[test]
    fn test_hero_siege_only_while_enemy_hero_down() {
        let mut sim = plain_battle(BattleConfig::default());
        sim.sides[0].hero.position = Fixed::from_num(900);
        sim.sides[0].hero.destination = Fixed::from_num(900);
        sim.sides[1].hero.position = Fixed::from_num(960);
        sim.sides[1].hero.destination = Fixed::from_num(960);

        // Enemy hero alive but out of duel range: no siege.
        let events = sim.advance();
        assert!(events.base_hits.is_empty());

        sim.sides[1].hero.fall(1_000);
        let events = sim.advance();
        assert_eq!(events.base_hits.len(), 1);
        assert_eq!(sim.base_health(Side::Right), 1000 - 30);
    }

    #[test]
    fn test_unit_hits_hero_with_mitigation() {
        let mut sim = BattleSimulation::new(
            BattleConfig::default(),
            plain_hero(10, 100),
            Hero::new(HeroStats {
                base_defense: 50,
                ..plain_hero_stats()
            }),
            StepRng::new(0, 0),
        )
        .unwrap();
        sim.spawn_unit_at(Side::Left, UnitKind::Soldier, Fixed::from_num(870));
        let events = sim.advance();
        let hit = events
            .damage_events
            .iter()
            .find(|e| e.target == Combatant::Hero(Side::Right))
            .unwrap();
        assert_eq!(hit.amount, 1);
        assert_eq!(sim.hero(Side::Right).current_health(), 99);
    }

    fn plain_hero_stats() -> HeroStats {
        HeroStats {
            name: "Plain".to_string(),
            strength: 0,
            dexterity: 0,
            intelligence: 0,
            primary: PrimaryAttribute::Strength,
            base_health: 100,
            base_attack: 10,
            base_defense: 0,
            gold: 500,
            income: 10,
            attack_range: 48,
        }
    }

    #[test]
    fn test_hero_kill_bounty() {
        let mut sim = plain_battle(BattleConfig::default());
        sim.sides[0].hero.position = Fixed::from_num(500);
        sim.sides[0].hero.destination = Fixed::from_num(500);
        let scout = sim.spawn_unit_at(Side::Right, UnitKind::Scout, Fixed::from_num(540));
        if let Some(unit) = sim.sides[1].units.get_mut(scout) {
            unit.health = 5;
        }
        let gold = sim.hero(Side::Left).gold();
        let events = sim.advance();
        assert_eq!(events.unit_deaths.len(), 1);
        assert_eq!(sim.hero(Side::Left).gold(), gold + 6);
    }

    #[test]
    fn test_buy_item_applies_bonus() {
        let mut sim = seeded();
        sim.apply_command(BattleCommand::BuyItem {
            side: Side::Left,
            item: "war_banner".to_string(),
        })
        .unwrap();
        let hero = sim.hero(Side::Left);
        assert_eq!(hero.gold(), 420 - 110);
        assert_eq!(hero.attack(), 40 + 15 + 4);
        assert!(matches!(
            sim.apply_command(BattleCommand::BuyItem {
                side: Side::Left,
                item: "crown".to_string(),
            }),
            Err(GameError::UnknownItem(_))
        ));
    }

    #[test]
    fn test_scripted_side_buys_units() {
        let mut sim = seeded();
        sim.enable_opponent(Side::Right);
        for _ in 0..300 {
            sim.advance();
        }
        assert!(sim.hero(Side::Right).income() > 24);
        assert!(!sim.side(Side::Right).units.is_empty());
    }

    #[test]
    fn test_state_hash_tracks_changes() {
        let mut a = seeded();
        let mut b = seeded();
        assert_eq!(a.state_hash(), b.state_hash());
        a.queue_unit(Side::Left, UnitKind::Scout).unwrap();
        assert_ne!(a.state_hash(), b.state_hash());
        b.queue_unit(Side::Left, UnitKind::Scout).unwrap();
        a.advance();
        b.advance();
        assert_eq!(a.state_hash(), b.state_hash());
    }

    #[test]
    fn test_snapshot_reflects_state() {
        let mut sim = seeded();
        sim.queue_unit(Side::Right, UnitKind::Soldier).unwrap();
        let snapshot = sim.snapshot();
        assert_eq!(snapshot.tick, 0);
        assert_eq!(snapshot.side(Side::Right).queued, vec![UnitKind::Soldier]);
        assert_eq!(snapshot.side(Side::Left).hero.name, "Ranger");
        assert_eq!(snapshot.side(Side::Left).hero.position, 60.0);
        assert!(!snapshot.is_over());
        assert_eq!(snapshot.last_event, "The battle begins");
    }
}
