//! Error types for the game engine.

use std::fmt;

/// Fatal errors surfaced by the step engine and the game-transaction builder.
///
/// Per-move problems are never fatal: a malformed or invalid move is simply
/// dropped and the step continues. Everything below indicates that the block
/// itself is inconsistent and must be rejected by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The step data's height does not follow the input state's height.
    HeightMismatch {
        /// Height the state expects next.
        expected: i32,
        /// Height the step data carries.
        actual: i32,
    },
    /// A coin amount went negative while applying the step.
    NegativeAmount {
        /// Which computation produced the negative amount.
        context: &'static str,
    },
    /// A player was scheduled for a kill but is absent from the state.
    UnknownPlayerKilled(String),
    /// A killed player has no recorded kill reason.
    MissingKillReason(String),
    /// The name-coin view has no entry for a player referenced by a game tx.
    NameNotFound(String),
    /// A bounty carries a payment address the host cannot encode.
    BadBountyAddress(String),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::HeightMismatch { expected, actual } => {
                write!(
                    f,
                    "step height {actual} does not follow state (expected {expected})"
                )
            }
            EngineError::NegativeAmount { context } => {
                write!(f, "negative amount in {context}")
            }
            EngineError::UnknownPlayerKilled(name) => {
                write!(f, "killed player {name:?} does not exist")
            }
            EngineError::MissingKillReason(name) => {
                write!(f, "no kill reason recorded for {name:?}")
            }
            EngineError::NameNotFound(name) => {
                write!(f, "name {name:?} not found in coin view")
            }
            EngineError::BadBountyAddress(addr) => {
                write!(f, "cannot build output script for bounty address {addr:?}")
            }
        }
    }
}

impl std::error::Error for EngineError {}

/// Result type for fallible engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_height_mismatch() {
        let err = EngineError::HeightMismatch {
            expected: 5,
            actual: 7,
        };
        let msg = err.to_string();
        assert!(msg.contains('5'));
        assert!(msg.contains('7'));
    }

    #[test]
    fn test_display_name_not_found() {
        let err = EngineError::NameNotFound("alice".to_string());
        assert!(err.to_string().contains("alice"));
    }
}
