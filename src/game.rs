//! Game layer for Quarry.
//!
//! Implements the deterministic state machine of the on-chain hunting game:
//! - Entities and their canonical snapshot encoding
//! - Move parsing and validation
//! - Attack resolution with life-steal redistribution
//! - The per-block step pipeline
//! - Game-transaction construction

mod attack;
mod character;
mod coord;
pub mod invariants;
mod loot;
pub mod map;
mod moves;
mod player;
mod random;
pub mod snapshot;
mod state;
mod step;
mod tx;

pub use attack::{AttackRules, AttackableCharacter, CharactersOnTiles, MELEE_RANGE, RANGED_RANGE};
pub use character::{
    character_in_spectator_mode, character_is_protected, CharacterReserve, CharacterState,
    CARRYING_CAPACITY, CHARACTER_MODE_LOGOUT, CHARACTER_MODE_NORMAL,
    CHARACTER_MODE_SPECTATOR_BEGIN, MAX_STAY_IN_SPAWN_AREA,
};
pub use coord::{direction_of, dist_linf, Coord};
pub use loot::{CollectedLootInfo, LootInfo};
pub use moves::{Move, StepData, MAX_MESSAGE_LENGTH, MAX_NAME_LENGTH, MAX_WAYPOINTS};
pub use player::{PlayerId, PlayerReserve, PlayerState, MAX_CHARACTERS_PER_PLAYER};
pub use random::{BlockHash, Hash256, RandomGenerator};
pub use state::{
    CharacterId, CollectedBounty, GameState, KilledByInfo, StateReserve, StepResult,
    BANK_COUNT, CROWN_BONUS_PERCENT, DEATH_TAX_PERCENT,
};
pub use step::{perform_step, perform_step_with_txs, StepScratch};
pub use tx::{
    create_game_transactions, GameTransaction, NameCoinView, NameData, OutPoint, Script, TxIn,
    TxOut, GAMEOP_COLLECTED_BOUNTY, GAMEOP_KILLED_BY, GAMEOP_KILLED_POISON, GAMEOP_REFUND,
};
