//! Map coordinates and directions.

use serde::{Deserialize, Serialize};

/// A signed coordinate on the game map.
///
/// Ordering is lexicographic on `(x, y)`; every container keyed by
/// coordinates iterates in that order.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    Serialize,
    Deserialize,
)]
pub struct Coord {
    /// Column.
    pub x: i32,
    /// Row.
    pub y: i32,
}

impl Coord {
    /// Create a new coordinate.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Chebyshev (L-infinity) distance between two coordinates.
///
/// Diagonal steps cost the same as cardinal steps, so this is exactly the
/// number of blocks a character needs to walk between the two points.
#[must_use]
pub fn dist_linf(a: Coord, b: Coord) -> u32 {
    let dx = (i64::from(a.x) - i64::from(b.x)).unsigned_abs();
    let dy = (i64::from(a.y) - i64::from(b.y)).unsigned_abs();
    dx.max(dy) as u32
}

/// Direction of a unit step, encoded as on a numeric keypad.
///
/// `(0, 0)` maps to 0 (no movement); y grows southwards, so `(0, -1)` is
/// north and encodes as 8.
#[must_use]
pub fn direction_of(dx: i32, dy: i32) -> u8 {
    match (dx.signum(), dy.signum()) {
        (-1, -1) => 7,
        (0, -1) => 8,
        (1, -1) => 9,
        (-1, 0) => 4,
        (1, 0) => 6,
        (-1, 1) => 1,
        (0, 1) => 2,
        (1, 1) => 3,
        _ => 0,
    }
}
