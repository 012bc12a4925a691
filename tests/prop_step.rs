//! Property-based tests for the step engine.
//!
//! These drive randomized multi-step games through `perform_step` and check
//! the universal properties: determinism, coin conservation, structural
//! invariants and snapshot round-trips.
//!
//! Run with: cargo test --release prop_step

#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]

use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use quarry::game::{invariants, snapshot, Hash256, Move, StepData};
use quarry::{perform_step, Amount, ChainParams, GameState};

fn block_hash(seed: u64, height: i32) -> Hash256 {
    let mut input = seed.to_le_bytes().to_vec();
    input.extend_from_slice(&height.to_le_bytes());
    Hash256::digest(&input)
}

/// Build the scripted step data for one block of a randomized game.
fn scripted_step(
    state: &GameState,
    params: &ChainParams,
    noise: &mut StdRng,
    seed: u64,
    max_players: usize,
) -> StepData {
    let height = state.n_height + 1;
    let mut data = StepData::new(block_hash(seed, height), height, params.block_subsidy(height));

    let spawned = state.players.len();
    if spawned < max_players {
        let name = format!("hunter{spawned}");
        let json = format!(r#"{{"color": {}}}"#, spawned % 4);
        if let Some(mv) = Move::parse(&name, params.name_coin_amount(height), &json) {
            data.add_move(mv);
        }
    }

    let names: Vec<String> = state.players.keys().cloned().collect();
    for name in names {
        let locked = state.players[&name].locked_coins;
        let roll: f64 = noise.gen();
        let json = if roll < 0.35 {
            let x = noise.gen_range(2..500);
            let y = noise.gen_range(2..500);
            format!(r#"{{"0": {{"wp": [{x}, {y}]}}}}"#)
        } else if roll < 0.45 {
            r#"{"0": {"destruct": true}}"#.to_string()
        } else if roll < 0.5 {
            format!(r#"{{"msg": "step {height}"}}"#)
        } else {
            continue;
        };
        if let Some(mv) = Move::parse(&name, locked, &json) {
            data.add_move(mv);
        }
    }

    data
}

/// Coins entering the game economy through this block's accepted moves.
fn move_inflow(state: &GameState, params: &ChainParams, data: &StepData) -> Amount {
    let height = state.n_height + 1;
    let mut inflow = 0;
    let mut seen = std::collections::BTreeSet::new();
    for mv in data.moves() {
        if !seen.insert(mv.player.clone()) || !mv.is_valid(state, params, height) {
            continue;
        }
        match state.players.get(&mv.player) {
            None => inflow += mv.new_locked,
            Some(player) => inflow += (mv.new_locked - player.locked_coins).max(0),
        }
    }
    inflow
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    /// A randomized game conserves coins at every step, never violates the
    /// structural invariants, and replays to byte-identical output.
    #[test]
    fn prop_conservation_and_determinism(
        seed in any::<u64>(),
        steps in 1usize..24,
        max_players in 1usize..5
    ) {
        let params = ChainParams::regtest();
        let mut noise = StdRng::seed_from_u64(seed);
        let mut state = GameState::new();

        for _ in 0..steps {
            let data = scripted_step(&state, &params, &mut noise, seed, max_players);
            let subsidy = data.block_subsidy;
            let inflow = move_inflow(&state, &params, &data);

            let (out, result) = perform_step(&params, &state, &data).unwrap();

            // Determinism: replaying the same step is byte-identical.
            let (out2, result2) = perform_step(&params, &state, &data).unwrap();
            prop_assert_eq!(&out, &out2);
            prop_assert_eq!(&result, &result2);
            prop_assert_eq!(
                bincode::serialize(&out).unwrap(),
                bincode::serialize(&out2).unwrap()
            );

            // Conservation: everything that entered is accounted for.
            let bounty_sum: Amount = result.bounties.iter().map(|b| b.loot.amount).sum();
            prop_assert_eq!(
                state.total_game_coins() + subsidy + inflow,
                out.total_game_coins() + bounty_sum + result.tax_amount,
                "conservation broken at height {}",
                out.n_height
            );

            // No structural damage.
            let violations = invariants::check_invariants(&out);
            prop_assert!(violations.is_empty(), "violations: {:?}", violations);

            // Poisoned players never sit at zero life.
            for player in out.players.values() {
                prop_assert!(player.remaining_life != 0);
            }

            state = out;
        }
    }

    /// Every reachable state survives a snapshot round-trip bit-for-bit.
    #[test]
    fn prop_snapshot_round_trip(
        seed in any::<u64>(),
        steps in 1usize..16
    ) {
        let params = ChainParams::regtest();
        let mut noise = StdRng::seed_from_u64(seed);
        let mut state = GameState::new();
        for _ in 0..steps {
            let data = scripted_step(&state, &params, &mut noise, seed, 3);
            let (out, _) = perform_step(&params, &state, &data).unwrap();
            state = out;
        }

        let bytes = snapshot::encode(&state).unwrap();
        let decoded = snapshot::decode(&bytes).unwrap();
        prop_assert_eq!(&state, &decoded);
        prop_assert_eq!(snapshot::encode(&decoded).unwrap(), bytes);
    }

    /// Moves are simultaneous: any permutation of the block's moves yields
    /// the same successor state.
    #[test]
    fn prop_move_order_invariance(
        seed in any::<u64>(),
        warmup in 1usize..10
    ) {
        let params = ChainParams::regtest();
        let mut noise = StdRng::seed_from_u64(seed);
        let mut state = GameState::new();
        for _ in 0..warmup {
            let data = scripted_step(&state, &params, &mut noise, seed, 4);
            let (out, _) = perform_step(&params, &state, &data).unwrap();
            state = out;
        }

        let template = scripted_step(&state, &params, &mut noise, seed, 4);
        let height = state.n_height + 1;
        let moves: Vec<Move> = template.moves().to_vec();

        let mut forward = StepData::new(block_hash(seed, height), height, template.block_subsidy);
        for mv in moves.iter().cloned() {
            forward.add_move(mv);
        }
        let mut backward = StepData::new(block_hash(seed, height), height, template.block_subsidy);
        for mv in moves.iter().rev().cloned() {
            backward.add_move(mv);
        }

        let (out1, res1) = perform_step(&params, &state, &forward).unwrap();
        let (out2, res2) = perform_step(&params, &state, &backward).unwrap();
        prop_assert_eq!(out1, out2);
        prop_assert_eq!(res1, res2);
    }
}
