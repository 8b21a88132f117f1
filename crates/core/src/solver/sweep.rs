//! Upwind sweep ordering
//!
//! For one ordinate direction, cells are arranged in stages so that every
//! cell is visited only after all of its upwind neighbors (cells feeding it
//! across inflow faces) have been solved. Boundary faces never block
//! staging; their inflow is synthesized from the local emission source
//! during the sweep.

use crate::core_types::Mesh;
use crate::error::RadiationError;
use nalgebra::Vector3;
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CellState {
    Unvisited,
    Staged,
    Done,
}

/// A complete causal ordering of mesh cells for one direction.
///
/// `entries` carries the cell indices in visit order with the last cell of
/// each stage negated (legacy stage-terminator convention; index 0 cannot
/// express negation, so stage extents are kept separately and are the
/// authoritative stage record).
#[derive(Debug, Clone)]
pub struct SweepOrder {
    entries: Vec<i64>,
    stage_ends: Vec<usize>,
}

impl SweepOrder {
    /// Number of ordered cells (equals the mesh cell count)
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Cell index at visit position `m`
    #[must_use]
    pub fn cell(&self, m: usize) -> usize {
        self.entries[m].unsigned_abs() as usize
    }

    /// Number of causal stages
    #[must_use]
    pub fn n_stages(&self) -> usize {
        self.stage_ends.len()
    }

    /// Half-open entry range of stage `s`
    #[must_use]
    pub fn stage_extent(&self, s: usize) -> (usize, usize) {
        let start = if s == 0 { 0 } else { self.stage_ends[s - 1] };
        (start, self.stage_ends[s])
    }

    /// Signed visit-order entries (negated stage terminators)
    #[must_use]
    pub fn entries(&self) -> &[i64] {
        &self.entries
    }
}

/// Build the upwind ordering of `mesh` for `direction`.
///
/// Repeated passes stage every still-unvisited cell whose inflow faces all
/// lead to boundaries or already-ordered cells; staged cells become final at
/// the end of the pass. A pass that stages nothing while cells remain means
/// the direction admits no causal ordering on this mesh.
///
/// # Errors
///
/// [`RadiationError::SweepStalled`] on a non-advancing pass.
pub fn build_sweep_order(
    mesh: &Mesh,
    dir_index: usize,
    direction: &Vector3<f64>,
) -> Result<SweepOrder, RadiationError> {
    let n_cells = mesh.n_cells();
    let mut states = vec![CellState::Unvisited; n_cells];
    let mut entries: Vec<i64> = Vec::with_capacity(n_cells);
    let mut stage_ends: Vec<usize> = Vec::new();
    let mut done = 0usize;

    while done < n_cells {
        let stage_start = entries.len();
        for cell in 0..n_cells {
            if states[cell] != CellState::Unvisited {
                continue;
            }
            let ready = mesh.cell(cell).face_ids.iter().all(|&face| {
                // outflow and tangential faces never block; inflow faces
                // require a solved neighbor or a boundary
                if mesh.outward_normal(face, cell).dot(direction) >= 0.0 {
                    return true;
                }
                match mesh.neighbor_across(face, cell) {
                    Some(neighbor) => states[neighbor] == CellState::Done,
                    None => true,
                }
            });
            if ready {
                states[cell] = CellState::Staged;
                entries.push(cell as i64);
            }
        }

        let staged = entries.len() - stage_start;
        if staged == 0 {
            return Err(RadiationError::SweepStalled {
                dir_index,
                dx: direction.x,
                dy: direction.y,
                dz: direction.z,
                staged: done,
                remaining: n_cells - done,
                total: n_cells,
            });
        }

        // everything in this stage is still non-negative; negation happens
        // only on the terminator below
        for &entry in &entries[stage_start..] {
            states[entry.unsigned_abs() as usize] = CellState::Done;
        }
        if let Some(last) = entries.last_mut() {
            *last = -*last;
        }
        stage_ends.push(entries.len());
        done += staged;
        trace!(
            "direction {dir_index}: stage {} staged {staged} cells ({done}/{n_cells})",
            stage_ends.len() - 1
        );
    }

    Ok(SweepOrder { entries, stage_ends })
}
