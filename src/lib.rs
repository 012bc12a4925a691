// Allow unwrap and unreadable literals in tests (test code is not production)
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::unreadable_literal))]
//! Quarry: the deterministic state-transition core of an on-chain
//! multi-player hunting game.
//!
//! The host chain invokes [`game::perform_step`] once per accepted block.
//! Given the game state at height `h - 1` and the moves contained in block
//! `h`, it produces the state at height `h` plus the game transactions the
//! block is required to carry. The transition is bit-for-bit deterministic:
//! all iteration is over ordered containers and every random choice routes
//! through a single hash-seeded generator in a fixed call order.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │      Host chain (blocks, UTXO)      │
//! ├─────────────────────────────────────┤
//! │   Step engine (perform_step)        │
//! ├─────────────────────────────────────┤
//! │ Moves │ Attacks │ State │ Game txs  │
//! └─────────────────────────────────────┘
//! ```
//!
//! The core performs no I/O and holds no global state; snapshots of the
//! state serialize through [`game::snapshot`] for fast resync.

pub mod error;
pub mod game;
pub mod params;

pub use error::{EngineError, EngineResult};

// Re-export key types at the crate root for convenience
pub use game::{
    perform_step, perform_step_with_txs, BlockHash, CharacterId, CharacterState, Coord,
    GameState, GameTransaction, Move, NameCoinView, NameData, PlayerId, PlayerState,
    RandomGenerator, StepData, StepResult,
};
pub use params::{Amount, ChainParams, Fork, Network, COIN};
