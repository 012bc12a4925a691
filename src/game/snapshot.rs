//! Disk snapshots of the game state.
//!
//! Snapshots let a node resync without replaying the whole chain. The format
//! is a 4-byte magic, a version byte, and the bincode-encoded state
//! compressed with LZ4. The binary layout of the state is frozen: field
//! order is declaration order, integer widths are fixed, and all containers
//! are ordered, so encoding the same state always yields the same bytes.
//! Snapshots are disk-only and never transmitted between nodes.

use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;

use crate::game::invariants::check_invariants;
use crate::game::state::GameState;

/// Magic bytes identifying a snapshot file.
const MAGIC: &[u8; 4] = b"QRYS";

/// Current snapshot format version.
const VERSION: u8 = 1;

/// Encode a state into snapshot bytes.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn encode(state: &GameState) -> io::Result<Vec<u8>> {
    let body =
        bincode::serialize(state).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    let compressed = lz4_flex::compress_prepend_size(&body);

    let mut out = Vec::with_capacity(5 + compressed.len());
    out.extend_from_slice(MAGIC);
    out.push(VERSION);
    out.extend_from_slice(&compressed);
    Ok(out)
}

/// Decode snapshot bytes back into a state.
///
/// The decoded state is checked against the structural invariants; a
/// mismatch means the snapshot is corrupt and the host must rebuild from an
/// earlier one.
///
/// # Errors
///
/// Returns an error on a bad magic, an unsupported version, corrupt
/// compression, or a state that violates invariants.
pub fn decode(bytes: &[u8]) -> io::Result<GameState> {
    if bytes.len() < 5 || &bytes[0..4] != MAGIC {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "invalid snapshot magic",
        ));
    }
    if bytes[4] != VERSION {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("unsupported snapshot version: {}", bytes[4]),
        ));
    }

    let body = lz4_flex::decompress_size_prepended(&bytes[5..])
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    let state: GameState =
        bincode::deserialize(&body).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

    let violations = check_invariants(&state);
    if let Some(first) = violations.first() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("snapshot state is corrupt: {first}"),
        ));
    }

    Ok(state)
}

/// Save a state snapshot to a file.
///
/// # Errors
///
/// Returns an error if serialization or file I/O fails.
pub fn save(state: &GameState, path: &Path) -> io::Result<()> {
    let bytes = encode(state)?;
    let mut file = fs::File::create(path)?;
    file.write_all(&bytes)?;
    Ok(())
}

/// Load a state snapshot from a file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not a valid snapshot.
pub fn load(path: &Path) -> io::Result<GameState> {
    let mut file = fs::File::open(path)?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)?;
    decode(&bytes)
}
