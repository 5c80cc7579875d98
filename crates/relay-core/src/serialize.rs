//! Circuit snapshots.
//!
//! Snapshots persist settled topology only: entities, wiring, chip children
//! and export tables, but no scheduler state and no traversal stamps. Every
//! entity is marked dirty on load, so the first tics after loading re-derive
//! all power state from the wiring. A failed load leaves the caller's
//! circuit untouched.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::circuit::Circuit;

/// Identifies a byte stream as a circuit snapshot.
pub const SNAPSHOT_MAGIC: u32 = 0xC19C_0001;
/// Bumped on every incompatible layout change.
pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct SnapshotHeader {
    magic: u32,
    version: u32,
}

#[derive(Serialize)]
struct SnapshotRef<'a> {
    header: SnapshotHeader,
    circuit: &'a Circuit,
}

#[derive(Deserialize)]
struct Snapshot {
    header: SnapshotHeader,
    circuit: Circuit,
}

#[derive(Debug, thiserror::Error)]
pub enum SaveError {
    #[error("failed to encode circuit: {0}")]
    Encode(String),
    #[error("failed to write snapshot: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("not a circuit snapshot (magic {0:#010x})")]
    InvalidMagic(u32),
    #[error("snapshot format v{0} is newer than this build supports (v{FORMAT_VERSION})")]
    FutureVersion(u32),
    #[error("failed to decode circuit: {0}")]
    Decode(String),
    #[error("failed to read snapshot: {0}")]
    Io(#[from] std::io::Error),
}

/// Encode a circuit, header first.
pub fn save_circuit(circuit: &Circuit) -> Result<Vec<u8>, SaveError> {
    let snapshot = SnapshotRef {
        header: SnapshotHeader {
            magic: SNAPSHOT_MAGIC,
            version: FORMAT_VERSION,
        },
        circuit,
    };
    bitcode::serialize(&snapshot).map_err(|e| SaveError::Encode(e.to_string()))
}

/// Decode a circuit. The returned circuit is fully dirty and settles to the
/// saved power state over the following tics.
pub fn load_circuit(bytes: &[u8]) -> Result<Circuit, LoadError> {
    let snapshot: Snapshot =
        bitcode::deserialize(bytes).map_err(|e| LoadError::Decode(e.to_string()))?;
    if snapshot.header.magic != SNAPSHOT_MAGIC {
        return Err(LoadError::InvalidMagic(snapshot.header.magic));
    }
    if snapshot.header.version > FORMAT_VERSION {
        return Err(LoadError::FutureVersion(snapshot.header.version));
    }
    let mut circuit = snapshot.circuit;
    circuit.normalize_transient();
    Ok(circuit)
}

pub fn save_file(circuit: &Circuit, path: impl AsRef<Path>) -> Result<(), SaveError> {
    let bytes = save_circuit(circuit)?;
    fs::write(path, bytes)?;
    Ok(())
}

pub fn load_file(path: impl AsRef<Path>) -> Result<Circuit, LoadError> {
    let bytes = fs::read(path)?;
    load_circuit(&bytes)
}

// ====== Tests ======
