//! Batch battle runner for balance testing.
//!
//! Runs many AI-vs-AI battles in parallel using rayon and aggregates the
//! results into a [`BatchSummary`].

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Instant;

use lane_core::hero::HeroPreset;
use lane_core::side::Side;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::metrics::{BatchSummary, BattleMetrics, MetricsCollector};
use crate::scenario::Scenario;

/// Default tick cap per battle.
pub const DEFAULT_MAX_TICKS: u64 = 20_000;

/// Batch run configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Scenario every battle starts from. Both sides are always scripted.
    pub scenario: Scenario,
    /// Number of battles to run.
    pub game_count: u32,
    /// Maximum parallel battles (0 = auto).
    pub parallel_games: u32,
    /// Output directory for results.
    pub output_dir: PathBuf,
    /// Seed of the first battle; battle `i` uses `seed_start + i`.
    pub seed_start: u64,
    /// Battles still running after this many ticks count as stalemates.
    pub max_ticks: u64,
    /// Cycle the left hero through every preset instead of using the
    /// scenario's.
    pub rotate_heroes: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            scenario: Scenario::ai_versus_ai(),
            game_count: 100,
            parallel_games: 0,
            output_dir: PathBuf::from("results"),
            seed_start: 0,
            max_ticks: DEFAULT_MAX_TICKS,
            rotate_heroes: false,
        }
    }
}

impl BatchConfig {
    /// Create config for a scenario.
    pub fn new(scenario: Scenario, game_count: u32) -> Self {
        Self {
            scenario,
            game_count,
            ..Default::default()
        }
    }

    /// Set output directory
    pub fn with_output(mut self, dir: PathBuf) -> Self {
        self.output_dir = dir;
        self
    }

    /// Set seed start
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed_start = seed;
        self
    }

    /// Set the tick cap
    pub fn with_max_ticks(mut self, max_ticks: u64) -> Self {
        self.max_ticks = max_ticks;
        self
    }
}

/// Results from a batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResults {
    /// Configuration used
    pub config: BatchConfig,
    /// Individual battle metrics
    pub games: Vec<BattleMetrics>,
    /// Aggregate summary
    pub summary: BatchSummary,
    /// Total runtime
    pub duration_seconds: f64,
    /// Errors encountered
    pub errors: Vec<BatchError>,
}

impl BatchResults {
    /// Save results to JSON file
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }

    /// Load results from JSON file
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(std::io::Error::other)
    }
}

/// Error during batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchError {
    /// Battle index
    pub game_index: u32,
    /// Seed used
    pub seed: u64,
    /// Error message
    pub message: String,
}

/// Progress tracking for batch runs
#[derive(Debug)]
pub struct BatchProgress {
    /// Total battles
    pub total: u32,
    completed: AtomicU32,
    left_wins: AtomicU32,
    right_wins: AtomicU32,
    start_time: Instant,
}

impl BatchProgress {
    /// Create new progress tracker
    pub fn new(total: u32) -> Self {
        Self {
            total,
            completed: AtomicU32::new(0),
            left_wins: AtomicU32::new(0),
            right_wins: AtomicU32::new(0),
            start_time: Instant::now(),
        }
    }

    /// Record a completed battle
    pub fn record_completion(&self, winner: Option<Side>) {
        self.completed.fetch_add(1, Ordering::Relaxed);
        match winner {
            Some(Side::Left) => self.left_wins.fetch_add(1, Ordering::Relaxed),
            Some(Side::Right) => self.right_wins.fetch_add(1, Ordering::Relaxed),
            None => 0,
        };
    }

    /// Get current completion count
    pub fn current(&self) -> u32 {
        self.completed.load(Ordering::Relaxed)
    }

    /// Get completion percentage
    pub fn percentage(&self) -> f64 {
        f64::from(self.current()) / f64::from(self.total.max(1)) * 100.0
    }

    /// Left win rate among completed battles.
    pub fn left_win_rate(&self) -> f64 {
        f64::from(self.left_wins.load(Ordering::Relaxed)) / f64::from(self.current().max(1))
    }

    fn log(&self) {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        info!(
            completed = self.current(),
            total = self.total,
            percent = format!("{:.1}", self.percentage()),
            left_wins = self.left_wins.load(Ordering::Relaxed),
            right_wins = self.right_wins.load(Ordering::Relaxed),
            elapsed_secs = format!("{elapsed:.1}"),
            "Batch progress"
        );
    }
}

/// Left hero for battle `index`.
fn left_hero_for(config: &BatchConfig, index: u32) -> HeroPreset {
    if config.rotate_heroes {
        HeroPreset::ALL[index as usize % HeroPreset::ALL.len()]
    } else {
        config.scenario.left_hero
    }
}

/// Run a single AI-vs-AI battle to a result or the tick cap.
pub fn run_single_game(
    scenario: &Scenario,
    seed: u64,
    max_ticks: u64,
) -> Result<BattleMetrics, String> {
    let mut scenario = scenario.clone();
    scenario.scripted = vec![Side::Left, Side::Right];

    let mut sim = scenario.build(seed).map_err(|e| e.to_string())?;
    let mut collector = MetricsCollector::new(&format!("game_{seed}"), &scenario.name, seed);

    while sim.tick() < max_ticks && !sim.is_over() {
        let events = sim.advance();
        collector.observe(sim.tick(), &events);
    }

    if !sim.is_over() {
        debug!(seed, ticks = sim.tick(), "Battle hit the tick cap");
    }
    Ok(collector.finish(&sim))
}

/// Run a batch of battles
pub fn run_batch(config: BatchConfig) -> BatchResults {
    let start = Instant::now();
    let progress = BatchProgress::new(config.game_count);

    info!(
        "Starting batch run: {} battles of '{}'",
        config.game_count, config.scenario.name
    );

    // Configure thread pool if specified
    if config.parallel_games > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(config.parallel_games as usize)
            .build_global()
            .ok(); // Ignore if already set
    }

    let results: Vec<Result<BattleMetrics, BatchError>> = (0..config.game_count)
        .into_par_iter()
        .map(|i| {
            let seed = config.seed_start.wrapping_add(u64::from(i));
            let scenario = Scenario {
                left_hero: left_hero_for(&config, i),
                ..config.scenario.clone()
            };

            match run_single_game(&scenario, seed, config.max_ticks) {
                Ok(metrics) => {
                    progress.record_completion(metrics.winner);
                    let completed = progress.current();
                    if completed % 10 == 0 {
                        debug!("Progress: {}/{}", completed, config.game_count);
                    }
                    if completed % 100 == 0 {
                        progress.log();
                    }
                    Ok(metrics)
                }
                Err(e) => {
                    warn!("Battle {} failed: {}", i, e);
                    Err(BatchError {
                        game_index: i,
                        seed,
                        message: e,
                    })
                }
            }
        })
        .collect();

    let (games, errors): (Vec<_>, Vec<_>) = results.into_iter().partition(Result::is_ok);
    let games: Vec<BattleMetrics> = games.into_iter().filter_map(Result::ok).collect();
    let errors: Vec<BatchError> = errors.into_iter().filter_map(Result::err).collect();

    let summary = BatchSummary::from_games(&games);
    let duration_seconds = start.elapsed().as_secs_f64();

    info!(
        "Batch complete: {} battles in {:.1}s ({:.1} battles/sec)",
        games.len(),
        duration_seconds,
        games.len() as f64 / duration_seconds.max(0.001)
    );

    BatchResults {
        config,
        games,
        summary,
        duration_seconds,
        errors,
    }
}

/// Outcome of a determinism check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyReport {
    /// Seed that was replayed.
    pub seed: u64,
    /// Final state hash of each run.
    pub hashes: Vec<u64>,
    /// Ticks each run lasted.
    pub ticks: Vec<u64>,
}

impl VerifyReport {
    /// Whether every run ended in the same state.
    pub fn is_deterministic(&self) -> bool {
        self.hashes.windows(2).all(|pair| pair[0] == pair[1])
            && self.ticks.windows(2).all(|pair| pair[0] == pair[1])
    }
}

/// Verify determinism by running the same seed several times.
pub fn verify_determinism(
    scenario: &Scenario,
    seed: u64,
    runs: u32,
    max_ticks: u64,
) -> Result<VerifyReport, String> {
    let mut report = VerifyReport {
        seed,
        hashes: Vec::new(),
        ticks: Vec::new(),
    };
    for run in 0..runs {
        let metrics = run_single_game(scenario, seed, max_ticks)?;
        debug!(run, hash = metrics.final_state_hash, "Verification run finished");
        report.hashes.push(metrics.final_state_hash);
        report.ticks.push(metrics.duration_ticks);
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_config_default() {
        let config = BatchConfig::default();
        assert_eq!(config.game_count, 100);
        assert_eq!(config.max_ticks, DEFAULT_MAX_TICKS);
        assert_eq!(config.scenario.scripted, vec![Side::Left, Side::Right]);
    }

    #[test]
    fn test_batch_config_builder() {
        let config = BatchConfig::new(Scenario::default(), 500)
            .with_output(PathBuf::from("/tmp/results"))
            .with_seed(12345)
            .with_max_ticks(600);

        assert_eq!(config.game_count, 500);
        assert_eq!(config.seed_start, 12345);
        assert_eq!(config.max_ticks, 600);
    }

    #[test]
    fn test_progress_tracking() {
        let progress = BatchProgress::new(100);
        assert_eq!(progress.current(), 0);
        assert_eq!(progress.percentage(), 0.0);

        progress.record_completion(Some(Side::Left));
        progress.record_completion(Some(Side::Right));
        progress.record_completion(Some(Side::Left));
        progress.record_completion(None);

        assert_eq!(progress.current(), 4);
        assert!((progress.left_win_rate() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_rotation_cycles_presets() {
        let config = BatchConfig {
            rotate_heroes: true,
            ..Default::default()
        };
        assert_eq!(left_hero_for(&config, 0), HeroPreset::Ranger);
        assert_eq!(left_hero_for(&config, 1), HeroPreset::Berserker);
        assert_eq!(left_hero_for(&config, 5), HeroPreset::BattleMage);
    }

    #[test]
    fn test_run_batch_small() {
        let config = BatchConfig::new(Scenario::default(), 6).with_max_ticks(1_500);
        let results = run_batch(config);

        assert_eq!(results.games.len(), 6);
        assert!(results.errors.is_empty());
        assert_eq!(results.summary.total_games, 6);
        assert!(results.games.iter().all(|g| g.duration_ticks <= 1_500));
    }

    #[test]
    fn test_single_game_forces_both_sides_scripted() {
        let metrics = run_single_game(&Scenario::default(), 3, 2_000).unwrap();
        assert!(metrics.sides.iter().all(|side| side.units_spawned > 0));
    }

    #[test]
    fn test_verify_determinism() {
        let report = verify_determinism(&Scenario::default(), 12345, 3, 2_000).unwrap();
        assert_eq!(report.hashes.len(), 3);
        assert!(report.is_deterministic());
    }

    #[test]
    fn test_batch_results_save_load() {
        let config = BatchConfig::new(Scenario::default(), 3).with_max_ticks(300);
        let results = run_batch(config);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.json");

        results.save(&path).unwrap();
        assert!(path.exists());

        let loaded = BatchResults::load(&path).unwrap();
        assert_eq!(loaded.games.len(), 3);
        assert_eq!(loaded.config.max_ticks, 300);
        assert_eq!(loaded.games[0].final_state_hash, results.games[0].final_state_hash);
    }
}
