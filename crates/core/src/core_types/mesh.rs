//! Unstructured volumetric mesh topology
//!
//! The transport engine only needs a narrow view of the mesh: cells with a
//! volume and a centroid, faces with an area-weighted outward normal, and the
//! owner/neighbor adjacency across each face. A face without a neighbor is a
//! boundary face; the missing side is treated as a ghost that radiates at the
//! local source value during sweeps.
//!
//! Topology is validated once at construction so the sweep hot path can index
//! without re-checking adjacency.

use crate::error::RadiationError;
use nalgebra::Vector3;
use rustc_hash::FxHashMap;

/// A single control volume.
#[derive(Debug, Clone)]
pub struct Cell {
    /// Cell volume [m^3]
    pub volume: f64,
    /// Cell-center coordinates
    pub centroid: Vector3<f64>,
    /// Indices of the faces bounding this cell
    pub face_ids: Vec<usize>,
}

/// An interface between a cell and either another cell or the domain
/// boundary.
#[derive(Debug, Clone)]
pub struct Face {
    /// Area-weighted normal, pointing outward from `owner`. The magnitude is
    /// the face area; viewed from the neighbor side the sign flips.
    pub normal: Vector3<f64>,
    /// Cell the normal points away from
    pub owner: usize,
    /// Cell on the far side, or `None` for a boundary/ghost face
    pub neighbor: Option<usize>,
}

/// The complete computational mesh.
#[derive(Debug, Clone)]
pub struct Mesh {
    cells: Vec<Cell>,
    faces: Vec<Face>,
}

impl Mesh {
    /// Assemble a mesh from raw cells and faces, validating the adjacency.
    ///
    /// # Errors
    ///
    /// Returns [`RadiationError::Topology`] if a face references an
    /// out-of-range cell, a cell lists a face that does not bound it, or a
    /// face is missing from the face list of one of its sides.
    pub fn new(cells: Vec<Cell>, faces: Vec<Face>) -> Result<Self, RadiationError> {
        let n_cells = cells.len();
        for (fid, face) in faces.iter().enumerate() {
            if face.owner >= n_cells {
                return Err(RadiationError::Topology(format!(
                    "face {fid} owner {} out of range ({n_cells} cells)",
                    face.owner
                )));
            }
            if let Some(nb) = face.neighbor {
                if nb >= n_cells {
                    return Err(RadiationError::Topology(format!(
                        "face {fid} neighbor {nb} out of range ({n_cells} cells)"
                    )));
                }
                if nb == face.owner {
                    return Err(RadiationError::Topology(format!(
                        "face {fid} connects cell {nb} to itself"
                    )));
                }
                if !cells[nb].face_ids.contains(&fid) {
                    return Err(RadiationError::Topology(format!(
                        "face {fid} missing from face list of neighbor cell {nb}"
                    )));
                }
            }
            if !cells[face.owner].face_ids.contains(&fid) {
                return Err(RadiationError::Topology(format!(
                    "face {fid} missing from face list of owner cell {}",
                    face.owner
                )));
            }
        }
        for (cid, cell) in cells.iter().enumerate() {
            for &fid in &cell.face_ids {
                let face = faces.get(fid).ok_or_else(|| {
                    RadiationError::Topology(format!("cell {cid} lists unknown face {fid}"))
                })?;
                if face.owner != cid && face.neighbor != Some(cid) {
                    return Err(RadiationError::Topology(format!(
                        "cell {cid} lists face {fid} which does not bound it"
                    )));
                }
            }
        }
        Ok(Self { cells, faces })
    }

    /// Number of cells
    #[must_use]
    pub fn n_cells(&self) -> usize {
        self.cells.len()
    }

    /// Number of faces (interior and boundary)
    #[must_use]
    pub fn n_faces(&self) -> usize {
        self.faces.len()
    }

    /// Cell by index
    #[must_use]
    pub fn cell(&self, cell: usize) -> &Cell {
        &self.cells[cell]
    }

    /// Face by index
    #[must_use]
    pub fn face(&self, face: usize) -> &Face {
        &self.faces[face]
    }

    /// Area-weighted normal of `face` oriented outward from `cell`.
    ///
    /// The stored normal points away from the owner; seen from the neighbor
    /// it is flipped. Adjacency was validated at construction.
    #[inline]
    #[must_use]
    pub fn outward_normal(&self, face: usize, cell: usize) -> Vector3<f64> {
        let f = &self.faces[face];
        debug_assert!(f.owner == cell || f.neighbor == Some(cell));
        if f.owner == cell {
            f.normal
        } else {
            -f.normal
        }
    }

    /// Cell on the far side of `face` as seen from `cell`, or `None` when the
    /// far side is the domain boundary.
    #[inline]
    #[must_use]
    pub fn neighbor_across(&self, face: usize, cell: usize) -> Option<usize> {
        let f = &self.faces[face];
        debug_assert!(f.owner == cell || f.neighbor == Some(cell));
        if f.owner == cell {
            f.neighbor
        } else {
            Some(f.owner)
        }
    }

    /// Structured hexahedral grid covering `[0, lx] x [0, ly] x [0, lz]`
    /// with `nx * ny * nz` cells. Used by tests and the headless demo; shared
    /// interior faces are deduplicated through a hash of the (owner,
    /// neighbor) pair so each appears exactly once.
    ///
    /// # Panics
    ///
    /// Panics if any of the cell counts is zero or any extent is
    /// non-positive.
    #[must_use]
    pub fn box_grid(nx: usize, ny: usize, nz: usize, lx: f64, ly: f64, lz: f64) -> Self {
        assert!(nx > 0 && ny > 0 && nz > 0, "box_grid needs at least one cell per axis");
        assert!(lx > 0.0 && ly > 0.0 && lz > 0.0, "box_grid needs positive extents");

        let (dx, dy, dz) = (lx / nx as f64, ly / ny as f64, lz / nz as f64);
        let volume = dx * dy * dz;
        let cell_id = |i: usize, j: usize, k: usize| (k * ny + j) * nx + i;

        let mut cells: Vec<Cell> = Vec::with_capacity(nx * ny * nz);
        for k in 0..nz {
            for j in 0..ny {
                for i in 0..nx {
                    cells.push(Cell {
                        volume,
                        centroid: Vector3::new(
                            (i as f64 + 0.5) * dx,
                            (j as f64 + 0.5) * dy,
                            (k as f64 + 0.5) * dz,
                        ),
                        face_ids: Vec::with_capacity(6),
                    });
                }
            }
        }

        // face areas per axis, normals carry the area magnitude
        let areas = [dy * dz, dx * dz, dx * dy];
        let axes = [Vector3::x(), Vector3::y(), Vector3::z()];

        let mut faces: Vec<Face> = Vec::new();
        let mut seen: FxHashMap<(usize, usize, usize), usize> = FxHashMap::default();
        let mut link = |faces: &mut Vec<Face>,
                        cells: &mut Vec<Cell>,
                        axis: usize,
                        owner: usize,
                        neighbor: Option<usize>,
                        sign: f64| {
            if let Some(nb) = neighbor {
                let key = (owner.min(nb), owner.max(nb), axis);
                if let Some(&fid) = seen.get(&key) {
                    cells[owner].face_ids.push(fid);
                    return;
                }
                seen.insert(key, faces.len());
            }
            let fid = faces.len();
            faces.push(Face {
                normal: axes[axis] * (areas[axis] * sign),
                owner,
                neighbor,
            });
            cells[owner].face_ids.push(fid);
        };

        for k in 0..nz {
            for j in 0..ny {
                for i in 0..nx {
                    let c = cell_id(i, j, k);
                    let nbrs = [
                        (0, i > 0, i.wrapping_sub(1), j, k, -1.0),
                        (0, i + 1 < nx, i + 1, j, k, 1.0),
                        (1, j > 0, i, j.wrapping_sub(1), k, -1.0),
                        (1, j + 1 < ny, i, j + 1, k, 1.0),
                        (2, k > 0, i, j, k.wrapping_sub(1), -1.0),
                        (2, k + 1 < nz, i, j, k + 1, 1.0),
                    ];
                    for &(axis, interior, ni, nj, nk, sign) in &nbrs {
                        let neighbor = interior.then(|| cell_id(ni, nj, nk));
                        link(&mut faces, &mut cells, axis, c, neighbor, sign);
                    }
                }
            }
        }

        Self { cells, faces }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn box_grid_counts_and_volume() {
        let mesh = Mesh::box_grid(3, 2, 2, 3.0, 2.0, 2.0);
        assert_eq!(mesh.n_cells(), 12);
        // interior: 2*2*2 + 3*1*2 + 3*2*1 = 8 + 6 + 6 = 20
        // boundary: 2*(2*2) + 2*(3*2) + 2*(3*2) = 8 + 12 + 12 = 32
        assert_eq!(mesh.n_faces(), 52);
        for c in 0..mesh.n_cells() {
            assert_relative_eq!(mesh.cell(c).volume, 1.0);
            assert_eq!(mesh.cell(c).face_ids.len(), 6);
        }
    }

    #[test]
    fn box_grid_normals_close_each_cell() {
        // the area-weighted normals of a closed cell sum to zero
        let mesh = Mesh::box_grid(2, 2, 2, 1.0, 1.0, 1.0);
        for c in 0..mesh.n_cells() {
            let sum: Vector3<f64> = mesh
                .cell(c)
                .face_ids
                .iter()
                .map(|&f| mesh.outward_normal(f, c))
                .sum();
            assert_relative_eq!(sum.norm(), 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn neighbor_is_symmetric_across_interior_faces() {
        let mesh = Mesh::box_grid(2, 1, 1, 2.0, 1.0, 1.0);
        let shared: Vec<usize> = (0..mesh.n_faces())
            .filter(|&f| mesh.face(f).neighbor.is_some())
            .collect();
        assert_eq!(shared.len(), 1);
        let f = shared[0];
        assert_eq!(mesh.neighbor_across(f, 0), Some(1));
        assert_eq!(mesh.neighbor_across(f, 1), Some(0));
        let n0 = mesh.outward_normal(f, 0);
        let n1 = mesh.outward_normal(f, 1);
        assert_relative_eq!((n0 + n1).norm(), 0.0);
    }

    #[test]
    fn unresolved_adjacency_is_fatal() {
        let cells = vec![
            Cell {
                volume: 1.0,
                centroid: Vector3::zeros(),
                face_ids: vec![0],
            },
            Cell {
                volume: 1.0,
                centroid: Vector3::x(),
                face_ids: vec![],
            },
        ];
        // neighbor cell 1 does not list the face back
        let faces = vec![Face {
            normal: Vector3::x(),
            owner: 0,
            neighbor: Some(1),
        }];
        assert!(matches!(
            Mesh::new(cells, faces),
            Err(RadiationError::Topology(_))
        ));
    }
}
