//! Game invariants - sanity checks that detect engine bugs.
//!
//! A correct step can never violate these; a violation means the engine (or
//! a loaded snapshot) is corrupt, not that a player did something odd.

use crate::game::state::GameState;

/// Invariant violation error.
#[derive(Debug, Clone)]
pub struct InvariantViolation {
    /// Description of the violated invariant.
    pub message: String,
}

impl std::fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Invariant violation: {}", self.message)
    }
}

impl std::error::Error for InvariantViolation {}

/// Check all structural invariants.
///
/// Returns the violations found, empty if the state is sound.
#[must_use]
pub fn check_invariants(state: &GameState) -> Vec<InvariantViolation> {
    let mut violations = Vec::new();

    for (pid, player) in &state.players {
        if player.remaining_life == 0 {
            violations.push(InvariantViolation {
                message: format!("player {pid} has remaining_life 0"),
            });
        }
        if !player.characters.contains_key(&0) {
            violations.push(InvariantViolation {
                message: format!("player {pid} has no general"),
            });
        }
        if let Some(max_index) = player.characters.keys().next_back() {
            if player.next_character_index <= *max_index {
                violations.push(InvariantViolation {
                    message: format!(
                        "player {pid} next_character_index {} not above max index {max_index}",
                        player.next_character_index
                    ),
                });
            }
        }
        if player.value < 0 {
            violations.push(InvariantViolation {
                message: format!("player {pid} has negative value {}", player.value),
            });
        }
        if player.locked_coins < 0 {
            violations.push(InvariantViolation {
                message: format!(
                    "player {pid} has negative locked coins {}",
                    player.locked_coins
                ),
            });
        }
        for (idx, ch) in &player.characters {
            if ch.loot.amount < 0 {
                violations.push(InvariantViolation {
                    message: format!("character {pid}.{idx} carries negative loot"),
                });
            }
        }
    }

    for (coord, info) in &state.loot {
        if info.amount <= 0 {
            violations.push(InvariantViolation {
                message: format!(
                    "loot tile ({}, {}) holds non-positive amount {}",
                    coord.x, coord.y, info.amount
                ),
            });
        }
    }

    if state.game_fund < 0 {
        violations.push(InvariantViolation {
            message: format!("game fund is negative: {}", state.game_fund),
        });
    }

    if let Some(holder) = &state.crown_holder {
        match state.find_character(holder) {
            None => violations.push(InvariantViolation {
                message: format!("crown holder {holder} does not exist"),
            }),
            Some(ch) if ch.coord != state.crown_pos => violations.push(InvariantViolation {
                message: format!(
                    "crown holder {holder} stands at ({}, {}) but crown is at ({}, {})",
                    ch.coord.x, ch.coord.y, state.crown_pos.x, state.crown_pos.y
                ),
            }),
            Some(_) => {}
        }
    }

    violations
}

/// Assert all invariants hold, panicking with details if not.
///
/// Only active in debug builds. No-op in release builds.
///
/// # Panics
///
/// Panics with a detailed message if any invariant is violated.
#[cfg(debug_assertions)]
pub fn assert_invariants(state: &GameState) {
    let violations = check_invariants(state);
    if !violations.is_empty() {
        let messages: Vec<_> = violations.iter().map(|v| v.message.as_str()).collect();
        panic!("Game invariant violations:\n  - {}", messages.join("\n  - "));
    }
}

/// No-op in release builds.
#[cfg(not(debug_assertions))]
pub fn assert_invariants(_state: &GameState) {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::coord::Coord;
    use crate::game::loot::LootInfo;
    use crate::game::player::PlayerState;
    use crate::game::random::{Hash256, RandomGenerator};
    use crate::game::state::CharacterId;

    fn valid_state() -> GameState {
        let mut state = GameState::new();
        let mut rng = RandomGenerator::new(&Hash256::digest(b"inv"), 0);
        let mut player = PlayerState::new(0, 100);
        player.spawn_character(0, &mut rng);
        state.players.insert("alice".to_string(), player);
        state.n_height = 0;
        state
    }

    #[test]
    fn test_valid_state_passes() {
        let violations = check_invariants(&valid_state());
        assert!(violations.is_empty(), "{violations:?}");
    }

    #[test]
    fn test_zero_remaining_life_detected() {
        let mut state = valid_state();
        state.players.get_mut("alice").unwrap().remaining_life = 0;
        let violations = check_invariants(&state);
        assert!(violations.iter().any(|v| v.message.contains("remaining_life")));
    }

    #[test]
    fn test_missing_general_detected() {
        let mut state = valid_state();
        state
            .players
            .get_mut("alice")
            .unwrap()
            .characters
            .remove(&0);
        let violations = check_invariants(&state);
        assert!(violations.iter().any(|v| v.message.contains("general")));
    }

    #[test]
    fn test_stale_character_index_detected() {
        let mut state = valid_state();
        state.players.get_mut("alice").unwrap().next_character_index = 0;
        let violations = check_invariants(&state);
        assert!(violations
            .iter()
            .any(|v| v.message.contains("next_character_index")));
    }

    #[test]
    fn test_empty_loot_tile_detected() {
        let mut state = valid_state();
        state.loot.insert(
            Coord::new(5, 5),
            LootInfo {
                amount: 0,
                first_block: 1,
                last_block: 1,
            },
        );
        let violations = check_invariants(&state);
        assert!(violations.iter().any(|v| v.message.contains("loot tile")));
    }

    #[test]
    fn test_dangling_crown_holder_detected() {
        let mut state = valid_state();
        state.crown_holder = Some(CharacterId::new("nobody", 0));
        let violations = check_invariants(&state);
        assert!(violations.iter().any(|v| v.message.contains("crown holder")));
    }

    #[test]
    fn test_crown_position_mismatch_detected() {
        let mut state = valid_state();
        state.crown_holder = Some(CharacterId::new("alice", 0));
        state.crown_pos = Coord::new(400, 400);
        let violations = check_invariants(&state);
        assert!(violations.iter().any(|v| v.message.contains("crown")));
    }

    #[test]
    fn test_crown_on_holder_passes() {
        let mut state = valid_state();
        state.crown_holder = Some(CharacterId::new("alice", 0));
        state.crown_pos = state.players["alice"].characters[&0].coord;
        let violations = check_invariants(&state);
        assert!(violations.is_empty(), "{violations:?}");
    }
}
