//! Discrete-ordinate angular quadrature
//!
//! Generates the fixed S_N-style direction sets (8, 24, 48 or 80 ordinates)
//! from a small number of tabulated base directions per set, expanded over
//! all octants by coordinate-role rotation and sign flips. The tabulated
//! constants are physically pre-derived level-symmetric quadrature values,
//! not computed at runtime.
//!
//! Invariant: the quadrature weights integrate the full solid angle, i.e.
//! they sum to 4π over the whole set.

use nalgebra::Vector3;
use std::f64::consts::PI;
use tracing::{debug, warn};

/// One discrete propagation direction with its quadrature weight.
#[derive(Debug, Clone, Copy)]
pub struct Ordinate {
    /// Unit direction vector
    pub direction: Vector3<f64>,
    /// Solid-angle weight; non-negative, set sums to 4π
    pub weight: f64,
}

/// The full discrete-ordinates direction set.
#[derive(Debug, Clone)]
pub struct AngularQuadrature {
    ordinates: Vec<Ordinate>,
}

impl AngularQuadrature {
    /// Build the quadrature for the requested ordinate count.
    ///
    /// Only 8, 24, 48 and 80 are supported; any other request falls back to
    /// 8 with a warning (not an error, matching the setup contract).
    #[must_use]
    pub fn new(requested: usize) -> Self {
        let n_dirs = match requested {
            8 | 24 | 48 | 80 => requested,
            other => {
                warn!("{other} directions not supported (8, 24, 48, 80); falling back to 8");
                8
            }
        };

        let over_sq3 = 1.0 / 3.0_f64.sqrt();
        // (base direction, weight) per symmetry-distinct direction type
        let bases: Vec<(Vector3<f64>, f64)> = match n_dirs {
            8 => vec![(Vector3::new(over_sq3, over_sq3, over_sq3), 4.0 * PI / 8.0)],
            24 => vec![(
                Vector3::new(0.2958759, 0.2958759, 0.9082483),
                4.0 * PI / 24.0,
            )],
            48 => vec![
                (Vector3::new(0.1838670, 0.1838670, 0.9656013), 0.1609517),
                (Vector3::new(0.1838670, 0.6950514, 0.6950514), 0.3626469),
            ],
            80 => vec![
                (Vector3::new(0.1422555, 0.1422555, 0.9795543), 0.1712359),
                (Vector3::new(0.1422555, over_sq3, 0.8040087), 0.0992284),
                (Vector3::new(over_sq3, over_sq3, over_sq3), 0.4617179),
            ],
            _ => unreachable!(),
        };

        let mut ordinates: Vec<Ordinate> = bases
            .iter()
            .map(|&(direction, weight)| Ordinate { direction, weight })
            .collect();

        for &(base, weight) in &bases {
            let b = [base.x, base.y, base.z];
            let all_equal = b[0] == b[1] && b[1] == b[2];
            let all_distinct = b[0] != b[1] && b[1] != b[2] && b[2] != b[0];

            for p in 0..3usize {
                // cyclic coordinate-role rotation (l, m, n)
                let (l, m, n) = (p, (p + 1) % 3, (p + 2) % 3);

                // For a fully symmetric base only the identity rotation is
                // distinct; rotated copies would double-count the axis.
                if p == 0 || !all_equal {
                    for i in 0..2u32 {
                        for j in 0..2u32 {
                            for k in 0..2u32 {
                                // skip the base direction itself
                                if p == 0 && i + j + k == 0 {
                                    continue;
                                }
                                ordinates.push(Ordinate {
                                    direction: Vector3::new(
                                        flip(i) * b[l],
                                        flip(j) * b[m],
                                        flip(k) * b[n],
                                    ),
                                    weight,
                                });
                            }
                        }
                    }
                }

                // A base with three distinct components also owns the
                // anticyclic (odd) permutations.
                if all_distinct {
                    let (l2, m2, n2) = (p, (p + 2) % 3, (p + 1) % 3);
                    for i in 0..2u32 {
                        for j in 0..2u32 {
                            for k in 0..2u32 {
                                ordinates.push(Ordinate {
                                    direction: Vector3::new(
                                        flip(i) * b[l2],
                                        flip(j) * b[m2],
                                        flip(k) * b[n2],
                                    ),
                                    weight,
                                });
                            }
                        }
                    }
                }
            }
        }

        assert_eq!(
            ordinates.len(),
            n_dirs,
            "octant expansion must produce exactly the requested ordinate count"
        );
        debug!("built {} ordinates from {} base direction types", n_dirs, bases.len());

        Self { ordinates }
    }

    /// Number of ordinates in the set
    #[must_use]
    pub fn len(&self) -> usize {
        self.ordinates.len()
    }

    /// Whether the set is empty (never true for a constructed quadrature)
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ordinates.is_empty()
    }

    /// Ordinate by index
    #[must_use]
    pub fn ordinate(&self, d: usize) -> &Ordinate {
        &self.ordinates[d]
    }

    /// All ordinates in order
    #[must_use]
    pub fn ordinates(&self) -> &[Ordinate] {
        &self.ordinates
    }
}

#[inline]
fn flip(bit: u32) -> f64 {
    if bit == 0 {
        1.0
    } else {
        -1.0
    }
}
