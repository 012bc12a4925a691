//! Static map data.
//!
//! The map is a fixed 502x502 grid. The outermost ring is an impassable
//! wall; the ring just inside it is the spawn strip, split between the four
//! team colours (north, east, south, west edge). Rock formations, bank
//! candidate spots, treasure harvest points and the crown start position are
//! const tables below.

use crate::game::coord::Coord;

/// Map width in tiles.
pub const MAP_WIDTH: i32 = 502;
/// Map height in tiles.
pub const MAP_HEIGHT: i32 = 502;

/// Number of team colours.
pub const NUM_TEAM_COLORS: u8 = 4;

/// Length of one colour's spawn strip.
pub const SPAWN_STRIP_LEN: u64 = 500;

/// Impassable rock rectangles, inclusive `(x0, y0, x1, y1)`.
const ROCKS: &[(i32, i32, i32, i32)] = &[
    (60, 60, 120, 80),
    (200, 150, 260, 210),
    (340, 300, 420, 340),
    (100, 380, 160, 460),
    (380, 60, 460, 120),
];

/// Candidate tiles for banks after the life-steal fork.
pub const BANK_CANDIDATES: &[Coord] = &[
    Coord::new(30, 30),
    Coord::new(250, 30),
    Coord::new(470, 30),
    Coord::new(30, 250),
    Coord::new(130, 130),
    Coord::new(320, 40),
    Coord::new(40, 470),
    Coord::new(250, 470),
    Coord::new(470, 470),
    Coord::new(470, 250),
    Coord::new(180, 300),
    Coord::new(300, 180),
    Coord::new(80, 200),
    Coord::new(200, 80),
    Coord::new(420, 200),
    Coord::new(200, 420),
    Coord::new(350, 120),
    Coord::new(120, 350),
    Coord::new(260, 260),
    Coord::new(60, 140),
    Coord::new(140, 60),
    Coord::new(440, 340),
    Coord::new(340, 440),
    Coord::new(60, 320),
];

/// Tiles where block treasure is dropped.
pub const HARVEST_POINTS: &[Coord] = &[
    Coord::new(50, 50),
    Coord::new(250, 50),
    Coord::new(450, 50),
    Coord::new(50, 250),
    Coord::new(250, 250),
    Coord::new(450, 250),
    Coord::new(50, 450),
    Coord::new(250, 450),
    Coord::new(450, 450),
    Coord::new(150, 150),
    Coord::new(350, 150),
    Coord::new(150, 350),
    Coord::new(350, 350),
    Coord::new(250, 100),
    Coord::new(100, 250),
    Coord::new(400, 400),
];

/// Starting position of the crown.
pub const CROWN_START: Coord = Coord::new(251, 251);

/// Whether a coordinate lies on the map at all.
#[must_use]
pub fn in_bounds(c: Coord) -> bool {
    c.x >= 0 && c.x < MAP_WIDTH && c.y >= 0 && c.y < MAP_HEIGHT
}

/// Whether a tile is blocked by the wall ring or a rock formation.
#[must_use]
pub fn is_obstacle(c: Coord) -> bool {
    if c.x == 0 || c.y == 0 || c.x == MAP_WIDTH - 1 || c.y == MAP_HEIGHT - 1 {
        return true;
    }
    ROCKS
        .iter()
        .any(|&(x0, y0, x1, y1)| c.x >= x0 && c.x <= x1 && c.y >= y0 && c.y <= y1)
}

/// Whether a character can stand on a tile.
#[must_use]
pub fn is_walkable(c: Coord) -> bool {
    in_bounds(c) && !is_obstacle(c)
}

/// Whether a tile belongs to any colour's spawn strip.
#[must_use]
pub fn is_spawn_area(c: Coord) -> bool {
    if !in_bounds(c) || is_obstacle(c) {
        return false;
    }
    c.x == 1 || c.y == 1 || c.x == MAP_WIDTH - 2 || c.y == MAP_HEIGHT - 2
}

/// Tile `idx` of a colour's spawn strip.
///
/// Colour 0 spawns on the north edge, 1 east, 2 south, 3 west. `idx` must be
/// below [`SPAWN_STRIP_LEN`].
#[must_use]
pub fn spawn_strip_tile(color: u8, idx: u64) -> Coord {
    debug_assert!(idx < SPAWN_STRIP_LEN);
    let offs = 1 + idx as i32;
    match color % NUM_TEAM_COLORS {
        0 => Coord::new(offs, 1),
        1 => Coord::new(MAP_WIDTH - 2, offs),
        2 => Coord::new(offs, MAP_HEIGHT - 2),
        _ => Coord::new(1, offs),
    }
}
