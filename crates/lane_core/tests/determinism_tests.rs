//! Seeded battles replay identically.

use lane_core::prelude::*;
use lane_test_utils::determinism::{
    find_first_divergence, run_parallel_battles, verify_battle_determinism,
};
use lane_test_utils::fixtures::{fixed, scripted_battle, seeded_battle};

#[test]
fn scripted_battle_is_deterministic() {
    verify_battle_determinism(3, 3_000, || scripted_battle(42)).assert_deterministic();
}

#[test]
fn scripted_battle_never_diverges() {
    assert_eq!(find_first_divergence(|| scripted_battle(7), 2_000), None);
}

#[test]
fn parallel_battles_agree() {
    run_parallel_battles(|| scripted_battle(11), 4, 1_500).assert_deterministic();
}

#[test]
fn manual_commands_replay_identically() {
    let setup = || {
        let mut sim = seeded_battle(3);
        sim.enable_opponent(Side::Right);
        sim.queue_unit(Side::Left, UnitKind::Knight).unwrap();
        sim.queue_unit(Side::Left, UnitKind::Archer).unwrap();
        sim.set_hero_destination(Side::Left, fixed(700)).unwrap();
        sim
    };
    verify_battle_determinism(2, 2_500, setup).assert_deterministic();
}

#[test]
fn different_seeds_play_out_differently() {
    let result = verify_battle_determinism(1, 2_000, || scripted_battle(1));
    let other = verify_battle_determinism(1, 2_000, || scripted_battle(2));
    assert_ne!(result.hashes, other.hashes);
}
