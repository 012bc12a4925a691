//! The step engine: one deterministic transition per accepted block.
//!
//! [`perform_step`] is a pure function of the input state, the step data and
//! the chain parameters. It computes into a fresh state, so a failed step
//! leaves nothing partially applied. Every pass iterates containers in
//! canonical key order (names lexicographic, indices ascending, coordinates
//! `(x, y)` lexicographic); random tie-breaks come from the single step
//! generator in a fixed call order.

use std::collections::BTreeMap;

use crate::error::{EngineError, EngineResult};
use crate::game::attack::{AttackRules, CharactersOnTiles};
use crate::game::character::{
    character_in_spectator_mode, CARRYING_CAPACITY, CHARACTER_MODE_NORMAL,
};
use crate::game::map::NUM_TEAM_COLORS;
use crate::game::moves::{Move, StepData};
use crate::game::player::PlayerId;
use crate::game::random::RandomGenerator;
use crate::game::state::{CharacterId, CollectedBounty, GameState, StepResult};
use crate::game::tx::{create_game_transactions, GameTransaction, NameCoinView};
use crate::params::{Amount, ChainParams, Fork};

/// Per-step constants, computed once from the input state.
///
/// This replaces the original engine's module-level caches: everything here
/// is a pure function of `(state, height)` and lives only for one step.
#[derive(Debug, Clone)]
pub struct StepScratch {
    /// Height of the step.
    pub height: i32,
    /// Poison fork active.
    pub fork_poison: bool,
    /// Carrying-capacity fork active.
    pub fork_carryingcap: bool,
    /// Less-hearts fork active.
    pub fork_lesshearts: bool,
    /// Life-steal fork active.
    pub fork_lifesteal: bool,
    /// Timesave fork active.
    pub fork_timesave: bool,
    /// Damage / minimum-lock unit at this height.
    pub name_coin_amount: Amount,
    /// Characters alive in the input state.
    pub population: u32,
    /// Characters alive per team colour.
    pub population_by_color: [u32; NUM_TEAM_COLORS as usize],
    /// Most populous team (lowest colour wins ties).
    pub strongest_team: u8,
    /// Least populous team (lowest colour wins ties).
    pub weakest_team: u8,
}

impl StepScratch {
    /// Compute the scratch for one step.
    #[must_use]
    pub fn compute(state: &GameState, params: &ChainParams, height: i32) -> Self {
        let mut population_by_color = [0u32; NUM_TEAM_COLORS as usize];
        for player in state.players.values() {
            let idx = (player.color % NUM_TEAM_COLORS) as usize;
            population_by_color[idx] += player.characters.len() as u32;
        }
        let population = population_by_color.iter().sum();

        let mut strongest_team = 0u8;
        let mut weakest_team = 0u8;
        for color in 1..NUM_TEAM_COLORS {
            if population_by_color[color as usize]
                > population_by_color[strongest_team as usize]
            {
                strongest_team = color;
            }
            if population_by_color[color as usize] < population_by_color[weakest_team as usize] {
                weakest_team = color;
            }
        }

        Self {
            height,
            fork_poison: params.fork_in_effect(Fork::Poison, height),
            fork_carryingcap: params.fork_in_effect(Fork::Carryingcap, height),
            fork_lesshearts: params.fork_in_effect(Fork::Lesshearts, height),
            fork_lifesteal: params.fork_in_effect(Fork::Lifesteal, height),
            fork_timesave: params.fork_in_effect(Fork::Timesave, height),
            name_coin_amount: params.name_coin_amount(height),
            population,
            population_by_color,
            strongest_team,
            weakest_team,
        }
    }
}

/// Run one game step.
///
/// All moves happen simultaneously: the result does not depend on the order
/// of moves within the block (only the first move per player counts).
///
/// # Errors
///
/// Fails only on block-level inconsistencies (wrong height, kills of
/// non-existent players). Bad moves are dropped silently.
pub fn perform_step(
    params: &ChainParams,
    in_state: &GameState,
    step_data: &StepData,
) -> EngineResult<(GameState, StepResult)> {
    if step_data.height != in_state.n_height + 1 {
        return Err(EngineError::HeightMismatch {
            expected: in_state.n_height + 1,
            actual: step_data.height,
        });
    }
    let height = step_data.height;
    let scratch = StepScratch::compute(in_state, params, height);

    let mut out = in_state.clone();
    out.dead_players_chat.clear();
    let mut rng = RandomGenerator::new(&in_state.hash_block, height);
    let mut result = StepResult::default();

    // Canonical move order; invalid moves are dropped here.
    let mut moves: BTreeMap<PlayerId, &Move> = BTreeMap::new();
    for mv in step_data.moves() {
        if moves.contains_key(&mv.player) {
            continue;
        }
        if mv.is_valid(in_state, params, height) {
            moves.insert(mv.player.clone(), mv);
        }
    }

    // Non-spatial move effects and spawns.
    for mv in moves.values() {
        if mv.is_spawn() {
            mv.apply_spawn(&mut out, &mut rng, scratch.fork_lifesteal, height);
        } else {
            mv.apply_common(&mut out, height);
        }
    }

    // Waypoint replacements.
    for mv in moves.values() {
        mv.apply_waypoints(&mut out);
    }

    // Life-steal switchover: hearts vanish and extra characters die.
    if height == params.fork_height(Fork::Lifesteal) {
        out.remove_hearted_characters(height);
    }

    // Timesave switchover: the spawn-area counters become character modes;
    // existing characters enter normal mode with a fresh spawn-stay budget.
    if height == params.fork_height(Fork::Timesave) {
        for player in out.players.values_mut() {
            for ch in player.characters.values_mut() {
                ch.stay_in_spawn_area = CHARACTER_MODE_NORMAL;
            }
        }
    }

    // Movement: one step per character. Characters spawned in this very
    // block stay on their spawn tile until the next one.
    for player in out.players.values_mut() {
        for ch in player.characters.values_mut() {
            if ch.aux_spawn_block == height {
                continue;
            }
            ch.move_towards_waypoint();
        }
    }

    // Attack resolution.
    let rules = AttackRules {
        lifesteal: scratch.fork_lifesteal,
        timesave: scratch.fork_timesave,
        unit: scratch.name_coin_amount,
    };
    let mut tiles = CharactersOnTiles::new();
    tiles.apply_attacks(&mut out, moves.values().copied(), &rules, &mut result);
    if rules.lifesteal {
        tiles.defend_mutual_attacks();
    }
    tiles.draw_life(&mut out, &mut result, &rules, height);
    tiles.distribute_drawn_life(&mut rng, &mut out, &rules);
    drop(tiles);

    // Crown handling.
    out.update_crown_state();
    out.collect_crown(&mut rng, &result, scratch.fork_timesave);

    // Treasure drop, then loot pickup.
    out.divide_loot(step_data.block_subsidy, &mut rng, height);
    pickup_loot(&mut out, &scratch, height);

    // Banking.
    bank_loot(&mut out, &mut result, &scratch);

    // Spawn-area timers and kills.
    out.kill_spawn_area(&mut result, scratch.fork_timesave, height);

    // Disaster roll.
    if scratch.fork_poison && out.check_for_disaster(&mut rng, params.testing_rules(), height) {
        out.apply_disaster(&mut rng, scratch.fork_lifesteal, height);
    }

    // Poison countdowns.
    out.decrement_life(&mut result);

    // Kill finalisation.
    out.finalise_kills(&mut result, scratch.fork_lifesteal, height)?;

    // Bank rotation.
    if scratch.fork_lifesteal {
        out.update_banks(&mut rng);
    }

    // Hearts (pre-life-steal rules only).
    if !scratch.fork_lifesteal {
        out.collect_hearts(&mut rng, scratch.fork_lesshearts, height);
    }

    // Finalisation.
    for bounty in &mut result.bounties {
        bounty.update_address(&out);
    }
    out.hash_block = step_data.new_hash;
    out.n_height = height;

    crate::game::invariants::assert_invariants(&out);

    Ok((out, result))
}

/// Run one game step and build the game transactions the block must carry.
///
/// # Errors
///
/// Fails on block-level inconsistencies, or when the name view is missing a
/// player referenced by a game transaction.
pub fn perform_step_with_txs(
    params: &ChainParams,
    in_state: &GameState,
    step_data: &StepData,
    view: &dyn NameCoinView,
) -> EngineResult<(GameState, StepResult, Vec<GameTransaction>)> {
    let (out, result) = perform_step(params, in_state, step_data)?;
    let txs = create_game_transactions(view, &result)?;
    Ok((out, result, txs))
}

/// All character ids in canonical order.
fn character_ids(state: &GameState) -> Vec<CharacterId> {
    state
        .players
        .iter()
        .flat_map(|(pid, player)| {
            player
                .characters
                .keys()
                .map(|idx| CharacterId::new(pid.clone(), *idx))
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Characters standing on loot collect it up to their carrying capacity.
fn pickup_loot(out: &mut GameState, scratch: &StepScratch, height: i32) {
    for chid in character_ids(out) {
        let Some(ch) = out
            .players
            .get(&chid.player)
            .and_then(|p| p.characters.get(&chid.index))
        else {
            continue;
        };
        if scratch.fork_timesave && character_in_spectator_mode(ch.stay_in_spawn_area) {
            continue;
        }
        let coord = ch.coord;
        let Some(loot) = out.loot.get(&coord).copied() else {
            continue;
        };

        let unlimited =
            !scratch.fork_carryingcap || out.crown_holder.as_ref() == Some(&chid);
        let cap = if unlimited { -1 } else { CARRYING_CAPACITY };

        let Some(ch) = out
            .players
            .get_mut(&chid.player)
            .and_then(|p| p.characters.get_mut(&chid.index))
        else {
            continue;
        };
        let rest = ch.collect_loot(loot, height, cap);
        if rest > 0 {
            if let Some(entry) = out.loot.get_mut(&coord) {
                entry.amount = rest;
            }
        } else {
            out.loot.remove(&coord);
        }
    }
}

/// Characters standing on a bank turn carried loot into bounties.
fn bank_loot(out: &mut GameState, result: &mut StepResult, scratch: &StepScratch) {
    for chid in character_ids(out) {
        let Some(player) = out.players.get(&chid.player) else {
            continue;
        };
        let Some(ch) = player.characters.get(&chid.index) else {
            continue;
        };
        if ch.loot.amount <= 0 || !out.is_bank(ch.coord, scratch.fork_lifesteal) {
            continue;
        }
        if scratch.fork_timesave && character_in_spectator_mode(ch.stay_in_spawn_area) {
            continue;
        }
        let address = player.address.clone();

        let Some(ch) = out
            .players
            .get_mut(&chid.player)
            .and_then(|p| p.characters.get_mut(&chid.index))
        else {
            continue;
        };
        let loot = std::mem::take(&mut ch.loot);
        // Reaching the bank ends the trip.
        ch.stop_moving();
        result.bounties.push(CollectedBounty {
            character: chid,
            loot,
            address,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::random::Hash256;

    fn spawn_move(name: &str, color: u8, locked: Amount) -> Move {
        let mut mv = Move::with_player(name);
        mv.color = Some(color);
        mv.new_locked = locked;
        mv
    }

    fn block_hash(n: u8) -> Hash256 {
        Hash256::digest(&[n])
    }

    #[test]
    fn test_genesis_step_spawns_player() {
        let params = ChainParams::regtest();
        let state = GameState::new();
        let mut data = StepData::new(block_hash(0), 0, 0);
        data.add_move(spawn_move("alice", 0, params.name_coin_amount(0)));

        let (out, result) = perform_step(&params, &state, &data).unwrap();
        assert_eq!(out.n_height, 0);
        assert_eq!(out.hash_block, block_hash(0));
        assert!(out.players.contains_key("alice"));
        assert!(result.killed_players().is_empty());
    }

    #[test]
    fn test_height_mismatch_rejected() {
        let params = ChainParams::regtest();
        let state = GameState::new();
        let data = StepData::new(block_hash(0), 5, 0);
        let err = perform_step(&params, &state, &data).unwrap_err();
        assert!(matches!(err, EngineError::HeightMismatch { .. }));
    }

    #[test]
    fn test_invalid_move_dropped_silently() {
        let params = ChainParams::regtest();
        let state = GameState::new();
        let mut data = StepData::new(block_hash(0), 0, 0);
        // Not enough locked coins for a spawn.
        data.add_move(spawn_move("alice", 0, params.name_coin_amount(0) - 1));

        let (out, _) = perform_step(&params, &state, &data).unwrap();
        assert!(out.players.is_empty());
    }

    #[test]
    fn test_repeated_execution_is_byte_identical() {
        let params = ChainParams::regtest();
        let state = GameState::new();
        let mut data = StepData::new(block_hash(3), 0, 1000);
        data.add_move(spawn_move("alice", 0, params.name_coin_amount(0)));
        data.add_move(spawn_move("bob", 1, params.name_coin_amount(0)));

        let (out1, res1) = perform_step(&params, &state, &data).unwrap();
        let (out2, res2) = perform_step(&params, &state, &data).unwrap();
        assert_eq!(out1, out2);
        assert_eq!(res1, res2);
        let bytes1 = bincode::serialize(&out1).unwrap();
        let bytes2 = bincode::serialize(&out2).unwrap();
        assert_eq!(bytes1, bytes2);
    }

    #[test]
    fn test_move_order_does_not_matter() {
        let params = ChainParams::regtest();
        let state = GameState::new();

        let mut forward = StepData::new(block_hash(9), 0, 500);
        forward.add_move(spawn_move("alice", 0, params.name_coin_amount(0)));
        forward.add_move(spawn_move("bob", 1, params.name_coin_amount(0)));

        let mut backward = StepData::new(block_hash(9), 0, 500);
        backward.add_move(spawn_move("bob", 1, params.name_coin_amount(0)));
        backward.add_move(spawn_move("alice", 0, params.name_coin_amount(0)));

        let (out1, _) = perform_step(&params, &state, &forward).unwrap();
        let (out2, _) = perform_step(&params, &state, &backward).unwrap();
        assert_eq!(out1, out2);
    }

    #[test]
    fn test_treasure_enters_economy() {
        let params = ChainParams::regtest();
        let state = GameState::new();
        let subsidy = params.block_subsidy(0);
        let data = StepData::new(block_hash(1), 0, subsidy);
        let (out, _) = perform_step(&params, &state, &data).unwrap();
        assert_eq!(out.total_game_coins(), subsidy);
    }

    #[test]
    fn test_scratch_population_counters() {
        let params = ChainParams::regtest();
        let mut state = GameState::new();
        let mut rng = RandomGenerator::new(&block_hash(2), 0);
        for (name, color) in [("a", 0u8), ("b", 0), ("c", 2)] {
            let mut player = crate::game::player::PlayerState::new(color, 10);
            player.spawn_character(0, &mut rng);
            state.players.insert(name.to_string(), player);
        }
        state.n_height = 20;
        let scratch = StepScratch::compute(&state, &params, 21);
        assert_eq!(scratch.population, 3);
        assert_eq!(scratch.population_by_color[0], 2);
        assert_eq!(scratch.population_by_color[2], 1);
        assert_eq!(scratch.strongest_team, 0);
        assert_eq!(scratch.weakest_team, 1);
    }
}
