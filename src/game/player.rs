//! Player state.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::game::character::CharacterState;
use crate::game::random::RandomGenerator;
use crate::params::Amount;

/// A player is identified by its registered name.
pub type PlayerId = String;

/// Most characters one player can control (hearts grant extras before the
/// life-steal fork removes them).
pub const MAX_CHARACTERS_PER_PLAYER: usize = 10;

/// Auxiliary player fields carried for forward compatibility.
///
/// Serialized as zeros / empty strings and preserved on read; no rule in the
/// current engine transitions them.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlayerReserve {
    /// Reserved string slots.
    pub tags: [String; 4],
    /// Reserved coin amounts.
    pub amounts: [i64; 8],
    /// Reserved counters.
    pub counters: [i32; 8],
}

/// State of one player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerState {
    /// Team colour.
    pub color: u8,
    /// Coins locked in the player's name output on the chain. Mirrors the
    /// prevout value and serves as the life-steal health gauge.
    pub locked_coins: Amount,
    /// In-game coin value of the player.
    pub value: Amount,
    /// Characters, keyed by index. Index 0 is the general.
    pub characters: BTreeMap<i32, CharacterState>,
    /// Index the next spawned character will get.
    pub next_character_index: i32,
    /// Blocks until a poisoned player dies; -1 when not poisoned. Never 0
    /// in a finished state.
    pub remaining_life: i32,
    /// Last chat message.
    pub message: String,
    /// Block in which the last message was sent.
    pub message_block: i32,
    /// Reward address; empty means pay to the name's own address.
    pub address: String,
    /// Admin address: once set, reward-address changes must be authorized
    /// by it.
    pub address_lock: String,
    /// Opaque carried state.
    pub reserve: PlayerReserve,
}

impl PlayerState {
    /// Fresh player with no characters yet.
    #[must_use]
    pub fn new(color: u8, locked_coins: Amount) -> Self {
        Self {
            color,
            locked_coins,
            value: locked_coins,
            characters: BTreeMap::new(),
            next_character_index: 0,
            remaining_life: -1,
            message: String::new(),
            message_block: 0,
            address: String::new(),
            address_lock: String::new(),
            reserve: PlayerReserve::default(),
        }
    }

    /// Spawn one more character on the player's spawn strip.
    pub fn spawn_character(&mut self, height: i32, rng: &mut RandomGenerator) {
        let index = self.next_character_index;
        self.next_character_index += 1;
        self.characters
            .insert(index, CharacterState::spawn(self.color, height, rng));
    }

    /// Whether a heart pickup may grant another character.
    #[must_use]
    pub fn can_spawn_character(&self) -> bool {
        self.characters.len() < MAX_CHARACTERS_PER_PLAYER
    }

    /// The player's general, if still alive.
    #[must_use]
    pub fn general(&self) -> Option<&CharacterState> {
        self.characters.get(&0)
    }
}
