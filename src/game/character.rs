//! Character state and movement.

use serde::{Deserialize, Serialize};

use crate::game::coord::{direction_of, Coord};
use crate::game::loot::{CollectedLootInfo, LootInfo};
use crate::game::map;
use crate::game::random::RandomGenerator;
use crate::params::{Amount, COIN};

/// Value of `stay_in_spawn_area` once spawn protection has run out
/// (timesave-fork modes).
pub const CHARACTER_MODE_NORMAL: u8 = 6;
/// Mode at which a character lingering on the spawn strip is logged out.
/// The difference of 2 to normal mode means the strip can be crossed, or
/// walked along briefly, without triggering a logout.
pub const CHARACTER_MODE_LOGOUT: u8 = 8;
/// First spectator mode value.
pub const CHARACTER_MODE_SPECTATOR_BEGIN: u8 = 9;

/// Blocks a character may stay on the spawn strip before the pre-timesave
/// rules kill it.
pub const MAX_STAY_IN_SPAWN_AREA: u8 = 30;

/// Carrying capacity once the carrying-capacity fork is active.
pub const CARRYING_CAPACITY: Amount = 100 * COIN;

/// Whether a character in this mode can neither attack nor be attacked.
#[must_use]
pub fn character_is_protected(mode: u8) -> bool {
    mode < CHARACTER_MODE_NORMAL || mode > CHARACTER_MODE_LOGOUT
}

/// Whether a character in this mode is a spectator.
#[must_use]
pub fn character_in_spectator_mode(mode: u8) -> bool {
    mode > CHARACTER_MODE_LOGOUT
}

/// Auxiliary character fields carried for forward compatibility.
///
/// These are serialized as zeros and preserved on read; no rule in the
/// current engine transitions them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CharacterReserve {
    /// Reserved flag bytes.
    pub flags: [u8; 8],
    /// Reserved counters.
    pub counters: [i32; 8],
    /// Reserved coin amounts.
    pub amounts: [i64; 8],
}

/// A single character on the map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterState {
    /// Current position.
    pub coord: Coord,
    /// Direction of the last move, numpad encoding (0 = never moved).
    pub dir: u8,
    /// Start of the current straight-line segment.
    pub from: Coord,
    /// Outstanding waypoints, stored in reverse so the active one pops fast.
    pub waypoints: Vec<Coord>,
    /// Loot collected but not banked yet.
    pub loot: CollectedLootInfo,
    /// Spawn-area counter; reinterpreted as a character mode after the
    /// timesave fork.
    pub stay_in_spawn_area: u8,
    /// Height at which the character spawned.
    pub aux_spawn_block: i32,
    /// Opaque carried state.
    pub reserve: CharacterReserve,
}

impl CharacterState {
    /// Spawn a fresh character on its colour's spawn strip.
    #[must_use]
    pub fn spawn(color: u8, height: i32, rng: &mut RandomGenerator) -> Self {
        let coord = map::spawn_strip_tile(color, rng.next_range(map::SPAWN_STRIP_LEN));
        Self {
            coord,
            dir: 0,
            from: coord,
            waypoints: Vec::new(),
            loot: CollectedLootInfo::default(),
            stay_in_spawn_area: 0,
            aux_spawn_block: height,
            reserve: CharacterReserve::default(),
        }
    }

    /// Drop the outstanding path and stand still.
    pub fn stop_moving(&mut self) {
        self.from = self.coord;
        self.waypoints.clear();
    }

    /// Replace the outstanding path.
    ///
    /// Waypoints arrive in travel order and are stored reversed.
    pub fn set_waypoints(&mut self, waypoints: &[Coord]) {
        self.from = self.coord;
        self.waypoints = waypoints.iter().rev().copied().collect();
    }

    /// Take one step along the straight line towards the active waypoint.
    ///
    /// Diagonal steps cost the same as cardinal ones. A blocked tile ahead
    /// stops the character and clears the path.
    pub fn move_towards_waypoint(&mut self) {
        let target = loop {
            match self.waypoints.last() {
                None => return,
                Some(&t) if t == self.coord => {
                    self.waypoints.pop();
                    self.from = self.coord;
                }
                Some(&t) => break t,
            }
        };

        let dx = (target.x - self.coord.x).signum();
        let dy = (target.y - self.coord.y).signum();
        let next = Coord::new(self.coord.x + dx, self.coord.y + dy);
        if !map::is_walkable(next) {
            self.stop_moving();
            return;
        }

        self.dir = direction_of(dx, dy);
        self.coord = next;
        if next == target {
            self.waypoints.pop();
            self.from = next;
        }
    }

    /// Blocks needed to finish the outstanding path.
    #[must_use]
    pub fn time_to_destination(&self) -> u32 {
        let mut total = 0u32;
        let mut pos = self.coord;
        for &wp in self.waypoints.iter().rev() {
            total += crate::game::coord::dist_linf(pos, wp);
            pos = wp;
        }
        total
    }

    /// Collect loot up to the carrying capacity (`-1` = unlimited).
    ///
    /// Returns the amount that did not fit and stays behind.
    pub fn collect_loot(&mut self, loot: LootInfo, height: i32, carry_cap: Amount) -> Amount {
        let can_carry = if carry_cap < 0 {
            loot.amount
        } else {
            (carry_cap - self.loot.amount).clamp(0, loot.amount)
        };
        if can_carry > 0 {
            let taken = LootInfo {
                amount: can_carry,
                ..loot
            };
            self.loot.collect(&taken, height);
        }
        loot.amount - can_carry
    }

    /// Whether the character stands on the spawn strip.
    #[must_use]
    pub fn is_in_spawn_area(&self) -> bool {
        map::is_spawn_area(self.coord)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::random::Hash256;

    fn character_at(x: i32, y: i32) -> CharacterState {
        let mut rng = RandomGenerator::new(&Hash256::digest(b"char"), 0);
        let mut ch = CharacterState::spawn(0, 0, &mut rng);
        ch.coord = Coord::new(x, y);
        ch.from = ch.coord;
        ch
    }

    #[test]
    fn test_spawn_lands_on_own_strip() {
        let mut rng = RandomGenerator::new(&Hash256::digest(b"spawn"), 1);
        for color in 0..map::NUM_TEAM_COLORS {
            let ch = CharacterState::spawn(color, 1, &mut rng);
            assert!(ch.is_in_spawn_area());
            assert_eq!(ch.from, ch.coord);
            assert_eq!(ch.aux_spawn_block, 1);
        }
    }

    #[test]
    fn test_movement_diagonal_first() {
        let mut ch = character_at(10, 10);
        ch.set_waypoints(&[Coord::new(13, 12)]);
        ch.move_towards_waypoint();
        assert_eq!(ch.coord, Coord::new(11, 11));
        assert_eq!(ch.dir, 3);
        ch.move_towards_waypoint();
        ch.move_towards_waypoint();
        assert_eq!(ch.coord, Coord::new(13, 12));
        assert!(ch.waypoints.is_empty());
    }

    #[test]
    fn test_movement_pops_multiple_waypoints() {
        let mut ch = character_at(10, 10);
        ch.set_waypoints(&[Coord::new(11, 10), Coord::new(11, 11)]);
        ch.move_towards_waypoint();
        assert_eq!(ch.coord, Coord::new(11, 10));
        assert_eq!(ch.waypoints.len(), 1);
        ch.move_towards_waypoint();
        assert_eq!(ch.coord, Coord::new(11, 11));
        assert!(ch.waypoints.is_empty());
    }

    #[test]
    fn test_movement_blocked_by_rock() {
        // Tile (60, 60) is inside the first rock; approaching from the west
        // stops at (59, 60).
        let mut ch = character_at(58, 60);
        ch.set_waypoints(&[Coord::new(62, 60)]);
        ch.move_towards_waypoint();
        assert_eq!(ch.coord, Coord::new(59, 60));
        ch.move_towards_waypoint();
        assert_eq!(ch.coord, Coord::new(59, 60));
        assert!(ch.waypoints.is_empty());
    }

    #[test]
    fn test_time_to_destination() {
        let mut ch = character_at(10, 10);
        ch.set_waypoints(&[Coord::new(13, 12), Coord::new(13, 20)]);
        assert_eq!(ch.time_to_destination(), 3 + 8);
    }

    #[test]
    fn test_collect_loot_respects_cap() {
        let mut ch = character_at(10, 10);
        let rest = ch.collect_loot(LootInfo::new(150, 5), 5, 100);
        assert_eq!(ch.loot.amount, 100);
        assert_eq!(rest, 50);
        // Full: nothing more fits.
        let rest = ch.collect_loot(LootInfo::new(10, 6), 6, 100);
        assert_eq!(rest, 10);
        assert_eq!(ch.loot.amount, 100);
    }

    #[test]
    fn test_collect_loot_unlimited() {
        let mut ch = character_at(10, 10);
        let rest = ch.collect_loot(LootInfo::new(CARRYING_CAPACITY * 3, 5), 5, -1);
        assert_eq!(rest, 0);
        assert_eq!(ch.loot.amount, CARRYING_CAPACITY * 3);
    }

    #[test]
    fn test_protection_modes() {
        assert!(character_is_protected(0));
        assert!(character_is_protected(CHARACTER_MODE_NORMAL - 1));
        assert!(!character_is_protected(CHARACTER_MODE_NORMAL));
        assert!(!character_is_protected(CHARACTER_MODE_LOGOUT));
        assert!(character_is_protected(CHARACTER_MODE_SPECTATOR_BEGIN));
        assert!(character_in_spectator_mode(CHARACTER_MODE_SPECTATOR_BEGIN));
        assert!(!character_in_spectator_mode(CHARACTER_MODE_NORMAL));
    }
}
