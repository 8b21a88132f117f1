//! Error taxonomy for solver setup and execution
//!
//! Setup-time failures (bad configuration, unreadable or malformed opacity
//! table, broken mesh topology, a direction that admits no sweep order) abort
//! before any transport work starts. Per-cell numerical degeneracies are never
//! errors; they are absorbed by the documented clamps in the opacity and
//! transport modules.

use std::path::PathBuf;
use thiserror::Error;

/// Fatal solver errors. There is no partial-result mode: a run either
/// completes all assigned (bin, direction) passes or fails with one of these.
#[derive(Debug, Error)]
pub enum RadiationError {
    /// Invalid configuration (mismatched state indices, bad worker split, ...)
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The opacity table file could not be read
    #[error("failed to read opacity table '{path}': {source}")]
    TableIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The opacity table stream violated the expected binary layout
    /// (truncated read, bad header counts, non-zero end sentinel)
    #[error("malformed opacity table: {0}")]
    TableFormat(String),

    /// Mesh adjacency that cannot be resolved (face referencing a cell it
    /// does not bound, out-of-range indices)
    #[error("malformed mesh topology: {0}")]
    Topology(String),

    /// A sweep-order pass staged zero cells: the mesh admits no upwind
    /// ordering for this direction. The legacy interactive direction-rotation
    /// recovery is intentionally not reproduced.
    #[error(
        "sweep order stalled for direction {dir_index} ({dx}, {dy}, {dz}): \
         {staged} of {total} cells staged, {remaining} unreachable"
    )]
    SweepStalled {
        dir_index: usize,
        dx: f64,
        dy: f64,
        dz: f64,
        staged: usize,
        remaining: usize,
        total: usize,
    },

    /// A diagnostic report file (ASCII table dump, radial profile) could not
    /// be written
    #[error("failed to write report '{path}': {source}")]
    ReportIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
