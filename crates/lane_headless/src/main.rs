//! Headless lane battle runner.
//!
//! This binary runs the battle without graphics, controlled via JSON on
//! stdin/stdout. Designed for AI agents, balance testing and CI.
//!
//! # Usage
//!
//! ```bash
//! # Interactive lockstep session - read commands from stdin
//! cargo run -p lane_headless
//!
//! # Real-time session with a scenario
//! cargo run -p lane_headless -- run --realtime --scenario scenarios/duel.ron
//!
//! # Run batch balance test
//! cargo run -p lane_headless -- batch --count 1000 --output results/
//!
//! # Verify determinism
//! cargo run -p lane_headless -- verify --seed 12345 --runs 5
//! ```
//!
//! # Protocol
//!
//! Input (stdin): JSON commands, one per line
//! Output (stdout): JSON responses, one per line
//! Logs (stderr): Debug information
//!
//! See the protocol module for command/response format.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use lane_core::hero::HeroPreset;
use lane_core::side::Side;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use lane_headless::{
    batch::{run_batch, verify_determinism, BatchConfig, DEFAULT_MAX_TICKS},
    realtime,
    runner::{HeadlessConfig, HeadlessRunner, Session},
    scenario::Scenario,
};

#[derive(Parser)]
#[command(name = "lane_headless")]
#[command(about = "Headless lane battle runner for AI testing and CI")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single interactive battle
    Run {
        /// Scenario file to load
        #[arg(short, long)]
        scenario: Option<PathBuf>,

        /// Random seed (overrides the scenario seed)
        #[arg(long)]
        seed: Option<u64>,

        /// Hero for the left side (overrides the scenario)
        #[arg(long)]
        hero: Option<HeroPreset>,

        /// Output state after every tick
        #[arg(long)]
        auto_state: bool,

        /// Advance on a wall-clock timer instead of on `tick` commands
        #[arg(long)]
        realtime: bool,

        /// Milliseconds per tick in real-time mode
        #[arg(long, default_value = "50")]
        tick_ms: u64,
    },

    /// Run batch of AI-vs-AI battles for balance testing
    Batch {
        /// Scenario file to start from
        #[arg(short, long)]
        scenario: Option<PathBuf>,

        /// Number of battles to run
        #[arg(short, long, default_value = "100")]
        count: u32,

        /// Maximum parallel battles (0 = auto)
        #[arg(short, long, default_value = "0")]
        parallel: u32,

        /// Output directory for results
        #[arg(short, long, default_value = "results")]
        output: PathBuf,

        /// Starting random seed
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Tick cap per battle
        #[arg(long, default_value_t = DEFAULT_MAX_TICKS)]
        max_ticks: u64,

        /// Cycle the left hero through every preset
        #[arg(long)]
        rotate_heroes: bool,
    },

    /// Verify determinism by running same seed multiple times
    Verify {
        /// Scenario file to test
        #[arg(short, long)]
        scenario: Option<PathBuf>,

        /// Seed to verify
        #[arg(long, default_value = "12345")]
        seed: u64,

        /// Number of verification runs
        #[arg(short, long, default_value = "5")]
        runs: u32,

        /// Tick cap per run
        #[arg(long, default_value_t = DEFAULT_MAX_TICKS)]
        max_ticks: u64,
    },

    /// Run N ticks for benchmarking
    Benchmark {
        /// Number of ticks to run
        #[arg(short, long, default_value = "36000")]
        ticks: u64,

        /// Random seed
        #[arg(long, default_value = "0")]
        seed: u64,
    },
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging to stderr (stdout is for protocol)
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(filter)
        .init();

    match cli.command {
        Some(Commands::Run {
            scenario,
            seed,
            hero,
            auto_state,
            realtime,
            tick_ms,
        }) => {
            cmd_run(scenario, seed, hero, auto_state, realtime, tick_ms);
        }
        Some(Commands::Batch {
            scenario,
            count,
            parallel,
            output,
            seed,
            max_ticks,
            rotate_heroes,
        }) => {
            cmd_batch(scenario, count, parallel, output, seed, max_ticks, rotate_heroes);
        }
        Some(Commands::Verify {
            scenario,
            seed,
            runs,
            max_ticks,
        }) => {
            cmd_verify(scenario, seed, runs, max_ticks);
        }
        Some(Commands::Benchmark { ticks, seed }) => {
            cmd_benchmark(ticks, seed);
        }
        None => {
            // Default: interactive lockstep mode
            cmd_run(None, None, None, false, false, 50);
        }
    }
}

/// Load a scenario file, or fall back to `default`. Exits on failure.
fn load_scenario(path: Option<PathBuf>, default: Scenario) -> Scenario {
    let Some(path) = path else {
        return default;
    };
    tracing::info!("Using scenario: {}", path.display());
    match Scenario::load(&path) {
        Ok(scenario) => scenario,
        Err(e) => {
            eprintln!("Failed to load scenario: {e}");
            std::process::exit(1);
        }
    }
}

/// Run a single interactive battle
fn cmd_run(
    scenario: Option<PathBuf>,
    seed: Option<u64>,
    hero: Option<HeroPreset>,
    auto_state: bool,
    realtime: bool,
    tick_ms: u64,
) {
    let mut scenario = load_scenario(scenario, Scenario::default());
    if let Some(hero) = hero {
        scenario.left_hero = hero;
    }

    let built = match seed {
        Some(seed) => scenario.build(seed),
        None => scenario.build_default(),
    };
    let sim = match built {
        Ok(sim) => sim,
        Err(e) => {
            eprintln!("Failed to start battle: {e}");
            std::process::exit(1);
        }
    };

    tracing::info!(
        scenario = %scenario.name,
        left = sim.hero(Side::Left).name(),
        right = sim.hero(Side::Right).name(),
        realtime,
        "Starting interactive session"
    );

    let config = HeadlessConfig {
        auto_state_output: auto_state,
    };
    let result = if realtime {
        let tick_interval = Duration::from_millis(tick_ms.max(1));
        realtime::run_stdio(Session::new(sim, config), tick_interval)
    } else {
        HeadlessRunner::new(sim, config).run_stdio()
    };

    if let Err(e) = result {
        tracing::error!(error = %e, "Session failed");
        std::process::exit(1);
    }
}

/// Run batch of battles for balance testing
fn cmd_batch(
    scenario: Option<PathBuf>,
    count: u32,
    parallel: u32,
    output: PathBuf,
    seed: u64,
    max_ticks: u64,
    rotate_heroes: bool,
) {
    let scenario = load_scenario(scenario, Scenario::ai_versus_ai());

    let num_cpus = std::thread::available_parallelism()
        .map(|p| p.get())
        .unwrap_or(1);

    tracing::info!(
        scenario = %scenario.name,
        count,
        parallel,
        seed,
        output = %output.display(),
        cpus_available = num_cpus,
        max_ticks,
        rotate_heroes,
        "Batch configuration"
    );

    // Ensure output directory exists
    if let Err(e) = std::fs::create_dir_all(&output) {
        tracing::error!(error = %e, path = %output.display(), "Failed to create output directory");
        eprintln!(
            "FATAL: Cannot create output directory '{}': {}",
            output.display(),
            e
        );
        std::process::exit(1);
    }

    let config = BatchConfig {
        scenario,
        game_count: count,
        parallel_games: parallel,
        output_dir: output.clone(),
        seed_start: seed,
        max_ticks,
        rotate_heroes,
    };

    let results = run_batch(config);

    // Save results
    let results_path = output.join("batch_results.json");
    if let Err(e) = results.save(&results_path) {
        tracing::error!(error = %e, path = %results_path.display(), "Failed to save results");
        eprintln!("FATAL: Failed to save results: {e}");
        std::process::exit(1);
    }

    let summary = &results.summary;

    // Print summary
    eprintln!("\n{}", "=".repeat(50));
    eprintln!("BATCH COMPLETE");
    eprintln!("{}", "=".repeat(50));
    eprintln!("Battles played: {}", results.games.len());
    if !results.errors.is_empty() {
        eprintln!("Battles FAILED: {}", results.errors.len());
    }
    eprintln!("Duration: {:.1}s", results.duration_seconds);
    eprintln!(
        "Throughput: {:.1} battles/sec",
        results.games.len() as f64 / results.duration_seconds.max(0.001)
    );
    eprintln!("\nWin Rates:");
    for side in Side::BOTH {
        let rate = summary.win_rates.get(&side).copied().unwrap_or(0.0);
        eprintln!("  {side}: {:.1}%", rate * 100.0);
    }
    eprintln!("  stalemates: {}", summary.stalemates);
    eprintln!("\nHeroes:");
    let mut heroes: Vec<_> = summary.games_by_hero.keys().collect();
    heroes.sort();
    for hero in heroes {
        if let Some(rate) = summary.hero_win_rate(hero) {
            eprintln!("  {hero}: {:.1}%", rate * 100.0);
        }
    }
    eprintln!(
        "\nAverage length: {:.0} ticks (min {}, max {})",
        summary.avg_duration_ticks, summary.min_duration_ticks, summary.max_duration_ticks
    );

    // Report errors if any
    if !results.errors.is_empty() {
        eprintln!("\nBATTLE FAILURES:");
        for error in results.errors.iter().take(10) {
            eprintln!(
                "  Battle {} (seed {}): {}",
                error.game_index, error.seed, error.message
            );
        }
        if results.errors.len() > 10 {
            eprintln!("  ... and {} more failures", results.errors.len() - 10);
        }
    }

    if let Some(side) = summary.dominant_side(0.1) {
        eprintln!("\nBalance warning: the {side} side wins more than 60% of battles");
    }

    eprintln!("\nResults saved to: {}", results_path.display());
}

/// Verify determinism
fn cmd_verify(scenario: Option<PathBuf>, seed: u64, runs: u32, max_ticks: u64) {
    let scenario = load_scenario(scenario, Scenario::ai_versus_ai());
    tracing::info!(
        "Verifying determinism: {} with seed {} ({} runs)",
        scenario.name,
        seed,
        runs
    );

    let report = match verify_determinism(&scenario, seed, runs, max_ticks) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("FAIL: {e}");
            std::process::exit(1);
        }
    };

    if report.is_deterministic() {
        eprintln!("PASS: All {runs} runs produced identical results");
        if let Some(hash) = report.hashes.first() {
            eprintln!("  Final hash: {hash:016x}");
        }
    } else {
        eprintln!("FAIL: Non-determinism detected!");
        for (run, (hash, ticks)) in report.hashes.iter().zip(&report.ticks).enumerate() {
            eprintln!("  Run {run}: {hash:016x} after {ticks} ticks");
        }
        std::process::exit(1);
    }
}

/// Run benchmark
fn cmd_benchmark(ticks: u64, seed: u64) {
    tracing::info!("Running {} tick benchmark", ticks);

    let mut sim = match Scenario::ai_versus_ai().build(seed) {
        Ok(sim) => sim,
        Err(e) => {
            eprintln!("Failed to start battle: {e}");
            std::process::exit(1);
        }
    };

    // Warmup
    for _ in 0..100 {
        sim.advance();
    }

    let start = Instant::now();
    let mut ran = 0u64;
    while ran < ticks && !sim.is_over() {
        sim.advance();
        ran += 1;
    }
    let elapsed = start.elapsed();

    let tps = ran as f64 / elapsed.as_secs_f64().max(f64::EPSILON);

    eprintln!("\n{}", "=".repeat(50));
    eprintln!("BENCHMARK RESULTS");
    eprintln!("{}", "=".repeat(50));
    eprintln!("Ticks: {ran}");
    if sim.is_over() {
        eprintln!("(battle ended at tick {})", sim.tick());
    }
    eprintln!("Duration: {:.3}s", elapsed.as_secs_f64());
    eprintln!("Ticks/second: {tps:.1}");
    eprintln!(
        "Units on lane: {}",
        sim.side(Side::Left).units.len() + sim.side(Side::Right).units.len()
    );
    eprintln!("State hash: {:016x}", sim.state_hash());
}
