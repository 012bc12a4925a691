//! Move parsing and validation.
//!
//! A move is the JSON value of a player's name-update transaction. Parsing
//! and validation never fail a block: a bad move is dropped and the step
//! proceeds without it.

use std::collections::{BTreeMap, BTreeSet};

use crate::game::coord::Coord;
use crate::game::map;
use crate::game::player::{PlayerId, PlayerState};
use crate::game::random::{BlockHash, RandomGenerator};
use crate::game::state::GameState;
use crate::params::{Amount, ChainParams};

/// Longest allowed player name.
pub const MAX_NAME_LENGTH: usize = 18;
/// Longest allowed chat message, in bytes.
pub const MAX_MESSAGE_LENGTH: usize = 140;
/// Most waypoints a single path may have.
pub const MAX_WAYPOINTS: usize = 100;

const ADDRESS_ALPHABET: &str = "123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

/// A player's command for one block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Move {
    /// The player issuing the move.
    pub player: PlayerId,
    /// New amount locked in the name output (the move transaction's value).
    pub new_locked: Amount,
    /// New chat message.
    pub message: Option<String>,
    /// New reward address; empty string resets to the name's own address.
    pub address: Option<String>,
    /// New admin lock address.
    pub address_lock: Option<String>,
    /// Team colour; present only for spawning moves.
    pub color: Option<u8>,
    /// Full waypoint-list replacements per character index.
    pub waypoints: BTreeMap<i32, Vec<Coord>>,
    /// Characters ordered to destruct.
    pub destruct: BTreeSet<i32>,
}

impl Move {
    /// An empty move for the given player.
    #[must_use]
    pub fn with_player(player: impl Into<PlayerId>) -> Self {
        Self {
            player: player.into(),
            new_locked: 0,
            message: None,
            address: None,
            address_lock: None,
            color: None,
            waypoints: BTreeMap::new(),
            destruct: BTreeSet::new(),
        }
    }

    /// Whether this move spawns a new player.
    #[must_use]
    pub fn is_spawn(&self) -> bool {
        self.color.is_some()
    }

    /// Check a player name: 1 to 18 bytes of printable ASCII.
    #[must_use]
    pub fn is_valid_player_name(name: &str) -> bool {
        !name.is_empty()
            && name.len() <= MAX_NAME_LENGTH
            && name.bytes().all(|b| (32..=126).contains(&b))
    }

    /// Syntactic check of a payment address (base58 shape; real decoding is
    /// the host's concern).
    #[must_use]
    pub fn is_valid_address(addr: &str) -> bool {
        (26..=36).contains(&addr.len()) && addr.chars().all(|c| ADDRESS_ALPHABET.contains(c))
    }

    /// Parse a move from the JSON value of a name update.
    ///
    /// Returns `None` for anything that does not obey the move schema; such
    /// transactions are ignored by the step engine.
    #[must_use]
    pub fn parse(player: &str, new_locked: Amount, json: &str) -> Option<Self> {
        if !Self::is_valid_player_name(player) {
            return None;
        }
        let value: serde_json::Value = serde_json::from_str(json).ok()?;
        let obj = value.as_object()?;

        let mut mv = Move::with_player(player);
        mv.new_locked = new_locked;

        for (key, val) in obj {
            match key.as_str() {
                "color" => {
                    let color = val.as_u64()?;
                    if color >= u64::from(map::NUM_TEAM_COLORS) {
                        return None;
                    }
                    mv.color = Some(color as u8);
                }
                "msg" => {
                    let msg = val.as_str()?;
                    if msg.len() > MAX_MESSAGE_LENGTH {
                        return None;
                    }
                    mv.message = Some(msg.to_string());
                }
                "address" => {
                    let addr = val.as_str()?;
                    if !addr.is_empty() && !Self::is_valid_address(addr) {
                        return None;
                    }
                    mv.address = Some(addr.to_string());
                }
                "addressLock" => {
                    let addr = val.as_str()?;
                    if !addr.is_empty() && !Self::is_valid_address(addr) {
                        return None;
                    }
                    mv.address_lock = Some(addr.to_string());
                }
                _ => {
                    let index: i32 = key.parse().ok()?;
                    if index < 0 {
                        return None;
                    }
                    mv.parse_character_update(index, val)?;
                }
            }
        }

        Some(mv)
    }

    /// Parse one character's `{"wp": [...], "destruct": true}` block.
    fn parse_character_update(&mut self, index: i32, value: &serde_json::Value) -> Option<()> {
        let obj = value.as_object()?;
        for (key, val) in obj {
            match key.as_str() {
                "wp" => {
                    let raw = val.as_array()?;
                    if raw.len() % 2 != 0 || raw.len() / 2 > MAX_WAYPOINTS {
                        return None;
                    }
                    let mut path = Vec::with_capacity(raw.len() / 2);
                    for pair in raw.chunks(2) {
                        let x = pair[0].as_i64()?;
                        let y = pair[1].as_i64()?;
                        if x < i64::from(i32::MIN)
                            || x > i64::from(i32::MAX)
                            || y < i64::from(i32::MIN)
                            || y > i64::from(i32::MAX)
                        {
                            return None;
                        }
                        let c = Coord::new(x as i32, y as i32);
                        if !map::in_bounds(c) {
                            return None;
                        }
                        path.push(c);
                    }
                    self.waypoints.insert(index, path);
                }
                "destruct" => {
                    if val.as_bool() != Some(true) {
                        return None;
                    }
                    self.destruct.insert(index);
                }
                _ => return None,
            }
        }
        Some(())
    }

    /// Minimum game fee the move transaction must add to the lock.
    #[must_use]
    pub fn minimum_game_fee(&self, params: &ChainParams, height: i32) -> Amount {
        if self.is_spawn() {
            params.name_coin_amount(height)
        } else {
            0
        }
    }

    /// Address whose authorization the host must verify before this move may
    /// change the reward address or the admin lock.
    #[must_use]
    pub fn address_operation_permission(&self, state: &GameState) -> Option<String> {
        if self.address.is_none() && self.address_lock.is_none() {
            return None;
        }
        state
            .players
            .get(&self.player)
            .map(|p| p.address_lock.clone())
            .filter(|lock| !lock.is_empty())
    }

    /// Semantic validation against the current state.
    #[must_use]
    pub fn is_valid(&self, state: &GameState, params: &ChainParams, height: i32) -> bool {
        match state.players.get(&self.player) {
            None => {
                // Only a spawn can introduce a new name, and it must lock
                // enough coins.
                self.is_spawn() && self.new_locked >= params.name_coin_amount(height)
            }
            Some(player) => {
                // Existing players cannot re-spawn and cannot withdraw from
                // the lock.
                !self.is_spawn() && self.new_locked >= player.locked_coins
            }
        }
    }

    /// Apply the non-spatial effects: chat, addresses, lock top-up.
    pub(crate) fn apply_common(&self, state: &mut GameState, height: i32) {
        let Some(player) = state.players.get_mut(&self.player) else {
            return;
        };
        if let Some(msg) = &self.message {
            player.message = msg.clone();
            player.message_block = height;
        }
        if let Some(addr) = &self.address {
            player.address = addr.clone();
        }
        if let Some(lock) = &self.address_lock {
            player.address_lock = lock.clone();
        }
        if self.new_locked > player.locked_coins {
            let fee = self.new_locked - player.locked_coins;
            player.locked_coins = self.new_locked;
            player.value += fee;
        }
    }

    /// Materialize a spawn: create the player and its initial characters.
    pub(crate) fn apply_spawn(
        &self,
        state: &mut GameState,
        rng: &mut RandomGenerator,
        fork_lifesteal: bool,
        height: i32,
    ) {
        if state.players.contains_key(&self.player) {
            return;
        }
        let Some(color) = self.color else {
            return;
        };
        let mut player = PlayerState::new(color, self.new_locked);
        if let Some(msg) = &self.message {
            player.message = msg.clone();
            player.message_block = height;
        }
        if let Some(addr) = &self.address {
            player.address = addr.clone();
        }
        if let Some(lock) = &self.address_lock {
            player.address_lock = lock.clone();
        }
        for _ in 0..GameState::num_initial_characters(fork_lifesteal) {
            player.spawn_character(height, rng);
        }
        state.players.insert(self.player.clone(), player);
    }

    /// Replace the waypoint lists of the referenced characters.
    pub(crate) fn apply_waypoints(&self, state: &mut GameState) {
        let Some(player) = state.players.get_mut(&self.player) else {
            return;
        };
        for (index, path) in &self.waypoints {
            if let Some(ch) = player.characters.get_mut(index) {
                ch.set_waypoints(path);
            }
        }
    }
}

/// Everything a block contributes to one step.
#[derive(Debug, Clone)]
pub struct StepData {
    /// Hash of the block carrying the moves.
    pub new_hash: BlockHash,
    /// Height of the block (and of the successor state).
    pub height: i32,
    /// Block subsidy, dropped onto the map as treasure.
    pub block_subsidy: Amount,
    moves: Vec<Move>,
    seen: BTreeSet<PlayerId>,
}

impl StepData {
    /// Step data with no moves yet.
    #[must_use]
    pub fn new(new_hash: BlockHash, height: i32, block_subsidy: Amount) -> Self {
        Self {
            new_hash,
            height,
            block_subsidy,
            moves: Vec::new(),
            seen: BTreeSet::new(),
        }
    }

    /// Add a move, rejecting a second one for the same player.
    ///
    /// Returns whether the move was accepted.
    pub fn add_move(&mut self, mv: Move) -> bool {
        if !self.seen.insert(mv.player.clone()) {
            return false;
        }
        self.moves.push(mv);
        true
    }

    /// The accepted moves, in block order.
    #[must_use]
    pub fn moves(&self) -> &[Move] {
        &self.moves
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::random::Hash256;

    const ADDR: &str = "MxQuarry1yz4aBCDeFgHJ6kLm9";

    #[test]
    fn test_parse_spawn() {
        let mv = Move::parse("alice", 100, r#"{"color": 0}"#).unwrap();
        assert!(mv.is_spawn());
        assert_eq!(mv.color, Some(0));
        assert_eq!(mv.new_locked, 100);
    }

    #[test]
    fn test_parse_rejects_bad_color() {
        assert!(Move::parse("alice", 100, r#"{"color": 4}"#).is_none());
        assert!(Move::parse("alice", 100, r#"{"color": -1}"#).is_none());
        assert!(Move::parse("alice", 100, r#"{"color": "red"}"#).is_none());
    }

    #[test]
    fn test_parse_waypoints_and_destruct() {
        let mv =
            Move::parse("bob", 0, r#"{"0": {"wp": [5, 5, 10, 10]}, "1": {"destruct": true}}"#)
                .unwrap();
        assert_eq!(
            mv.waypoints[&0],
            vec![Coord::new(5, 5), Coord::new(10, 10)]
        );
        assert!(mv.destruct.contains(&1));
    }

    #[test]
    fn test_parse_rejects_odd_waypoint_list() {
        assert!(Move::parse("bob", 0, r#"{"0": {"wp": [5, 5, 10]}}"#).is_none());
    }

    #[test]
    fn test_parse_rejects_out_of_map_waypoint() {
        assert!(Move::parse("bob", 0, r#"{"0": {"wp": [null, 5]}}"#).is_none());
        assert!(Move::parse("bob", 0, r#"{"0": {"wp": [-5, 5]}}"#).is_none());
        assert!(Move::parse("bob", 0, r#"{"0": {"wp": [900, 5]}}"#).is_none());
    }

    #[test]
    fn test_parse_rejects_too_many_waypoints() {
        let mut coords = Vec::new();
        for i in 0..(MAX_WAYPOINTS + 1) {
            coords.push((i % 400 + 1).to_string());
            coords.push("5".to_string());
        }
        let json = format!(r#"{{"0": {{"wp": [{}]}}}}"#, coords.join(","));
        assert!(Move::parse("bob", 0, &json).is_none());
    }

    #[test]
    fn test_parse_rejects_unknown_keys() {
        assert!(Move::parse("bob", 0, r#"{"teleport": true}"#).is_none());
        assert!(Move::parse("bob", 0, r#"{"0": {"fly": true}}"#).is_none());
    }

    #[test]
    fn test_parse_rejects_long_message() {
        let msg = "x".repeat(MAX_MESSAGE_LENGTH + 1);
        let json = format!(r#"{{"msg": "{msg}"}}"#);
        assert!(Move::parse("bob", 0, &json).is_none());
    }

    #[test]
    fn test_name_validation() {
        assert!(Move::is_valid_player_name("alice"));
        assert!(Move::is_valid_player_name("x"));
        assert!(!Move::is_valid_player_name(""));
        assert!(!Move::is_valid_player_name("nineteen_chars_name"));
        assert!(!Move::is_valid_player_name("tab\tname"));
    }

    #[test]
    fn test_address_validation() {
        assert!(Move::is_valid_address(ADDR));
        assert!(!Move::is_valid_address("short"));
        assert!(!Move::is_valid_address("0OIl00000000000000000000000"));
    }

    #[test]
    fn test_is_valid_spawn_needs_lock() {
        let state = GameState::new();
        let params = crate::params::ChainParams::regtest();
        let mv = Move::parse("alice", params.name_coin_amount(0), r#"{"color": 1}"#).unwrap();
        assert!(mv.is_valid(&state, &params, 0));
        let poor = Move::parse("alice", params.name_coin_amount(0) - 1, r#"{"color": 1}"#)
            .unwrap();
        assert!(!poor.is_valid(&state, &params, 0));
    }

    #[test]
    fn test_is_valid_rejects_respawn_and_withdrawal() {
        let params = crate::params::ChainParams::regtest();
        let mut state = GameState::new();
        state
            .players
            .insert("alice".to_string(), PlayerState::new(0, 50));

        let respawn = Move::parse("alice", 100, r#"{"color": 1}"#).unwrap();
        assert!(!respawn.is_valid(&state, &params, 0));

        let withdraw = Move::parse("alice", 49, r#"{"msg": "hi"}"#).unwrap();
        assert!(!withdraw.is_valid(&state, &params, 0));

        let topup = Move::parse("alice", 60, r#"{"msg": "hi"}"#).unwrap();
        assert!(topup.is_valid(&state, &params, 0));
    }

    #[test]
    fn test_apply_common_topup_and_chat() {
        let mut state = GameState::new();
        state
            .players
            .insert("alice".to_string(), PlayerState::new(0, 50));
        let mv = Move::parse("alice", 60, r#"{"msg": "onwards"}"#).unwrap();
        mv.apply_common(&mut state, 8);
        let player = &state.players["alice"];
        assert_eq!(player.locked_coins, 60);
        assert_eq!(player.value, 60);
        assert_eq!(player.message, "onwards");
        assert_eq!(player.message_block, 8);
    }

    #[test]
    fn test_address_operation_permission() {
        let mut state = GameState::new();
        let mut player = PlayerState::new(0, 50);
        player.address_lock = ADDR.to_string();
        state.players.insert("alice".to_string(), player);

        let mv = Move::parse("alice", 50, &format!(r#"{{"address": "{ADDR}"}}"#)).unwrap();
        assert_eq!(mv.address_operation_permission(&state), Some(ADDR.to_string()));

        let plain = Move::parse("alice", 50, r#"{"msg": "hi"}"#).unwrap();
        assert_eq!(plain.address_operation_permission(&state), None);
    }

    #[test]
    fn test_spawn_creates_characters() {
        let mut state = GameState::new();
        let mut rng = RandomGenerator::new(&Hash256::digest(b"mv"), 0);
        let mv = Move::parse("alice", 100, r#"{"color": 2}"#).unwrap();
        mv.apply_spawn(&mut state, &mut rng, false, 0);
        let player = &state.players["alice"];
        assert_eq!(player.characters.len(), 3);
        assert_eq!(player.color, 2);

        let mv2 = Move::parse("late", 100, r#"{"color": 1}"#).unwrap();
        mv2.apply_spawn(&mut state, &mut rng, true, 0);
        assert_eq!(state.players["late"].characters.len(), 1);
    }

    #[test]
    fn test_step_data_rejects_duplicate_moves() {
        let mut data = StepData::new(Hash256::zero(), 1, 0);
        assert!(data.add_move(Move::with_player("alice")));
        assert!(!data.add_move(Move::with_player("alice")));
        assert!(data.add_move(Move::with_player("bob")));
        assert_eq!(data.moves().len(), 2);
    }
}
