//! Battle metrics collection for balance analysis.
//!
//! A [`MetricsCollector`] watches the events of one battle; a
//! [`BatchSummary`] aggregates many finished battles.

use std::collections::HashMap;

use lane_core::side::{Side, SideStats};
use lane_core::simulation::{BattleSimulation, TickEvents};
use serde::{Deserialize, Serialize};

/// Complete metrics for a single battle.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BattleMetrics {
    /// Unique battle identifier.
    pub game_id: String,
    /// Scenario name.
    pub scenario: String,
    /// Random seed used.
    pub seed: u64,
    /// Ticks run (the decisive tick for finished battles).
    pub duration_ticks: u64,
    /// Winning side (None = stalemate at the tick cap).
    pub winner: Option<Side>,
    /// Per-side metrics, left then right.
    pub sides: [SideMetrics; 2],
    /// Final simulation state hash (for determinism validation).
    pub final_state_hash: u64,
}

impl BattleMetrics {
    /// Whether the battle hit the tick cap undecided.
    #[must_use]
    pub fn is_stalemate(&self) -> bool {
        self.winner.is_none()
    }

    /// Metrics of one side.
    #[must_use]
    pub fn side(&self, side: Side) -> &SideMetrics {
        &self.sides[side.index()]
    }
}

/// Metrics for one side of a battle.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SideMetrics {
    /// Hero display name.
    pub hero: String,
    /// Base health at the end.
    pub final_base_health: i32,
    /// Gold on hand at the end.
    pub final_gold: u32,
    /// Income per payout at the end.
    pub final_income: u32,
    /// Items owned at the end.
    pub items: Vec<String>,
    /// Units that reached the lane.
    pub units_spawned: u32,
    /// Kill and siege tallies from the simulation.
    pub stats: SideStats,
    /// Damage dealt by this side's hero and units, before shields.
    pub damage_dealt: i64,
    /// Tick of this side's first hero kill.
    pub first_hero_kill_tick: Option<u64>,
    /// Tick this side first damaged the enemy base.
    pub first_siege_tick: Option<u64>,
}

/// Collects metrics while a battle runs.
#[derive(Debug, Default)]
pub struct MetricsCollector {
    metrics: BattleMetrics,
}

impl MetricsCollector {
    /// Create a new metrics collector.
    #[must_use]
    pub fn new(game_id: &str, scenario: &str, seed: u64) -> Self {
        Self {
            metrics: BattleMetrics {
                game_id: game_id.to_string(),
                scenario: scenario.to_string(),
                seed,
                ..Default::default()
            },
        }
    }

    /// Record the events of the tick that just completed.
    pub fn observe(&mut self, tick: u64, events: &TickEvents) {
        for event in &events.damage_events {
            let side = &mut self.metrics.sides[event.attacker.side().index()];
            side.damage_dealt += i64::from(event.amount);
        }

        for &(side, _) in &events.spawned {
            self.metrics.sides[side.index()].units_spawned += 1;
        }

        for &fallen in &events.hero_defeats {
            let killer = &mut self.metrics.sides[fallen.opponent().index()];
            killer.first_hero_kill_tick.get_or_insert(tick);
        }

        for hit in &events.base_hits {
            let attacker = &mut self.metrics.sides[hit.attacker.side().index()];
            attacker.first_siege_tick.get_or_insert(tick);
        }
    }

    /// Fill in end-of-battle state and return the metrics.
    pub fn finish<R: rand::Rng>(mut self, sim: &BattleSimulation<R>) -> BattleMetrics {
        self.metrics.duration_ticks = sim.outcome().map_or(sim.tick(), |outcome| outcome.tick);
        self.metrics.winner = sim.outcome().map(|outcome| outcome.winner);
        self.metrics.final_state_hash = sim.state_hash();

        for side in Side::BOTH {
            let state = sim.side(side);
            let metrics = &mut self.metrics.sides[side.index()];
            metrics.hero = state.hero.name().to_string();
            metrics.final_base_health = state.base_health;
            metrics.final_gold = state.hero.gold();
            metrics.final_income = state.hero.income();
            metrics.items = state.hero.items().iter().map(|item| item.name.to_string()).collect();
            metrics.stats = state.stats;
        }

        self.metrics
    }
}

/// Summary statistics across multiple battles.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Total battles played.
    pub total_games: u32,
    /// Battles won by each side.
    pub wins_by_side: HashMap<Side, u32>,
    /// Win rates by side.
    pub win_rates: HashMap<Side, f64>,
    /// Battles won by each hero, keyed by display name.
    pub wins_by_hero: HashMap<String, u32>,
    /// Battles each hero appeared in.
    pub games_by_hero: HashMap<String, u32>,
    /// Average length of decided battles in ticks.
    pub avg_duration_ticks: f64,
    /// Shortest decided battle.
    pub min_duration_ticks: u64,
    /// Longest decided battle.
    pub max_duration_ticks: u64,
    /// Battles that hit the tick cap.
    pub stalemates: u32,
    /// Average hero kills per battle, by side.
    pub avg_hero_kills: HashMap<Side, f64>,
    /// Average siege damage per battle, by side.
    pub avg_siege_damage: HashMap<Side, f64>,
}

impl BatchSummary {
    /// Calculate summary from a list of battle metrics.
    #[must_use]
    pub fn from_games(games: &[BattleMetrics]) -> Self {
        if games.is_empty() {
            return Self::default();
        }

        let mut summary = Self {
            total_games: games.len() as u32,
            ..Default::default()
        };

        let mut duration_sum = 0u64;
        let mut decided = 0u64;
        let mut min_duration = u64::MAX;
        let mut max_duration = 0u64;
        let mut hero_kills = [0u64; 2];
        let mut siege_damage = [0i64; 2];

        for game in games {
            match game.winner {
                Some(winner) => {
                    *summary.wins_by_side.entry(winner).or_default() += 1;
                    *summary
                        .wins_by_hero
                        .entry(game.side(winner).hero.clone())
                        .or_default() += 1;
                    duration_sum += game.duration_ticks;
                    decided += 1;
                    min_duration = min_duration.min(game.duration_ticks);
                    max_duration = max_duration.max(game.duration_ticks);
                }
                None => summary.stalemates += 1,
            }

            for side in Side::BOTH {
                let metrics = game.side(side);
                *summary.games_by_hero.entry(metrics.hero.clone()).or_default() += 1;
                hero_kills[side.index()] += u64::from(metrics.stats.hero_kills);
                siege_damage[side.index()] += i64::from(metrics.stats.siege_damage);
            }
        }

        if decided > 0 {
            summary.avg_duration_ticks = duration_sum as f64 / decided as f64;
            summary.min_duration_ticks = min_duration;
            summary.max_duration_ticks = max_duration;
        }

        let total = f64::from(summary.total_games);
        for side in Side::BOTH {
            let wins = summary.wins_by_side.get(&side).copied().unwrap_or(0);
            summary.win_rates.insert(side, f64::from(wins) / total);
            summary
                .avg_hero_kills
                .insert(side, hero_kills[side.index()] as f64 / total);
            summary
                .avg_siege_damage
                .insert(side, siege_damage[side.index()] as f64 / total);
        }

        summary
    }

    /// Win rate of a hero across the battles it appeared in.
    #[must_use]
    pub fn hero_win_rate(&self, hero: &str) -> Option<f64> {
        let games = *self.games_by_hero.get(hero)?;
        let wins = self.wins_by_hero.get(hero).copied().unwrap_or(0);
        Some(f64::from(wins) / f64::from(games.max(1)))
    }

    /// Check if side balance is within acceptable range.
    #[must_use]
    pub fn is_balanced(&self, threshold: f64) -> bool {
        self.win_rates.values().all(|rate| (rate - 0.5).abs() <= threshold)
    }

    /// Get the dominant side (if any).
    #[must_use]
    pub fn dominant_side(&self, threshold: f64) -> Option<Side> {
        Side::BOTH
            .into_iter()
            .find(|side| self.win_rates.get(side).is_some_and(|rate| *rate > 0.5 + threshold))
    }
}
