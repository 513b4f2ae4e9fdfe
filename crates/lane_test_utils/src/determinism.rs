//! Determinism testing utilities.
//!
//! Provides a harness for verifying that a seeded battle produces
//! identical results given identical inputs.
//!
//! # Testing Strategy
//!
//! Sources of non-determinism the battle guards against:
//!
//! - **Floating-point math**: lane values use [`lane_core::math::Fixed`].
//!
//! - **HashMap iteration order**: Rust's default hasher is randomized.
//!   Units are always visited in sorted ID order.
//!
//! - **System randomness**: the generator is injected; tests seed it.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::thread;

use lane_core::simulation::BattleSimulation;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of ticks simulated.
    pub ticks: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for deterministic simulation).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the simulation was deterministic, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the simulation produced different hashes across runs.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Battle is non-deterministic!\n\
                 Runs: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a simulation multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run the simulation
/// * `ticks` - Number of ticks to simulate per run
/// * `setup` - Function to create initial simulation state
/// * `step` - Function to advance simulation by one tick
/// * `hash` - Function to compute state hash
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    ticks: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();

        for _ in 0..ticks {
            step(&mut state);
        }

        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        ticks,
    }
}

/// Run a seeded battle `runs` times and compare final state hashes.
///
/// # Example
///
/// ```
/// use lane_test_utils::determinism::verify_battle_determinism;
/// use lane_test_utils::fixtures::scripted_battle;
///
/// verify_battle_determinism(3, 500, || scripted_battle(9)).assert_deterministic();
/// ```
pub fn verify_battle_determinism<F>(runs: usize, ticks: u64, setup_fn: F) -> DeterminismResult
where
    F: Fn() -> BattleSimulation,
{
    verify_determinism(
        runs,
        ticks,
        setup_fn,
        |sim| {
            sim.advance();
        },
        |sim| sim.state_hash(),
    )
}

/// Run N battles on scoped threads and collect final hashes.
///
/// Catches non-determinism that only shows up under thread scheduling or
/// memory layout differences.
pub fn run_parallel_battles<F>(setup_fn: F, num_sims: usize, num_ticks: u64) -> DeterminismResult
where
    F: Fn() -> BattleSimulation + Sync,
{
    let hashes: Vec<u64> = thread::scope(|s| {
        let handles: Vec<_> = (0..num_sims)
            .map(|_| {
                s.spawn(|| {
                    let mut sim = setup_fn();
                    for _ in 0..num_ticks {
                        sim.advance();
                    }
                    sim.state_hash()
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|h| h.join().expect("battle thread panicked"))
            .collect()
    });

    DeterminismResult {
        is_deterministic: hashes.windows(2).all(|w| w[0] == w[1]),
        hashes,
        ticks: num_ticks,
    }
}

/// Compare two battle runs tick-by-tick, finding first divergence.
///
/// # Returns
///
/// `None` if the runs agree on every tick, `Some(tick)` for the first tick
/// whose hashes differ.
pub fn find_first_divergence<F>(setup_fn: F, num_ticks: u64) -> Option<u64>
where
    F: Fn() -> BattleSimulation,
{
    let mut sim1 = setup_fn();
    let mut sim2 = setup_fn();

    if sim1.state_hash() != sim2.state_hash() {
        return Some(0);
    }

    for tick in 1..=num_ticks {
        sim1.advance();
        sim2.advance();

        if sim1.state_hash() != sim2.state_hash() {
            tracing::warn!(tick, "Battle runs diverged");
            return Some(tick);
        }
    }

    None
}

/// Compute a simple hash for any hashable value.
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Proptest strategies for battle inputs.
pub mod strategies {
    use lane_core::catalog::UnitKind;
    use lane_core::command::BattleCommand;
    use lane_core::hero::{HeroStats, PrimaryAttribute};
    use lane_core::math::Fixed;
    use lane_core::side::Side;
    use proptest::prelude::*;

    /// Any side.
    pub fn arb_side() -> impl Strategy<Value = Side> {
        prop_oneof![Just(Side::Left), Just(Side::Right)]
    }

    /// Any unit archetype.
    pub fn arb_unit_kind() -> impl Strategy<Value = UnitKind> {
        proptest::sample::select(UnitKind::ALL.to_vec())
    }

    /// Any primary attribute.
    pub fn arb_primary() -> impl Strategy<Value = PrimaryAttribute> {
        prop_oneof![
            Just(PrimaryAttribute::Strength),
            Just(PrimaryAttribute::Dexterity),
            Just(PrimaryAttribute::Intelligence),
        ]
    }

    /// A lane position, possibly outside the lane, to exercise clamping.
    pub fn arb_lane_position() -> impl Strategy<Value = Fixed> {
        (-200i32..1200i32).prop_map(Fixed::from_num)
    }

    /// Hero attributes across the full `u32` range.
    pub fn arb_hero_stats() -> impl Strategy<Value = HeroStats> {
        (
            any::<u32>(),
            any::<u32>(),
            any::<u32>(),
            arb_primary(),
            1i32..1000,
            0i32..200,
            0i32..50,
            0u32..10_000,
        )
            .prop_map(
                |(strength, dexterity, intelligence, primary, health, attack, defense, gold)| {
                    HeroStats {
                        name: "Arbitrary".to_string(),
                        strength,
                        dexterity,
                        intelligence,
                        primary,
                        base_health: health,
                        base_attack: attack,
                        base_defense: defense,
                        gold,
                        income: 10,
                        attack_range: 48,
                    }
                },
            )
    }

    /// A command a controller might send.
    pub fn arb_command() -> impl Strategy<Value = BattleCommand> {
        prop_oneof![
            (arb_side(), arb_lane_position())
                .prop_map(|(side, position)| BattleCommand::SetHeroDestination { side, position }),
            (arb_side(), arb_unit_kind())
                .prop_map(|(side, unit)| BattleCommand::QueueUnit { side, unit }),
        ]
    }
}
