//! Upwind transport kernel
//!
//! One sweep pass solves the radiative intensity of every cell for a single
//! (bin, ordinate) pair, walking the precomputed causal order so that each
//! cell's inflow faces only reference already-solved neighbors. Boundary
//! faces radiate at the local emission source. Outgoing intensities feed the
//! flux and divergence accumulators, weighted by the ordinate's quadrature
//! weight.

use crate::config::{OpacityMode, Scheme};
use crate::core_types::{Mesh, ThermoModel};
use crate::opacity::OpacityTable;
use crate::quadrature::Ordinate;
use crate::solver::sweep::SweepOrder;
use nalgebra::Vector3;
use rayon::prelude::*;

/// Floor for degenerate table values. Values at or below it clamp to it,
/// keeping the transport solve finite instead of dividing toward zero.
pub const OPACITY_FLOOR: f64 = 1e-30;

/// Per-cell opacity data for the active bin, laid out per scheme: the
/// exponential scheme consumes `absorption`, the finite-volume scheme the
/// volume-premultiplied `ab_v` / `ab_src_v` pair. `source` is shared and is
/// also the boundary intensity.
#[derive(Debug, Clone)]
pub struct OpacityBuffers {
    pub source: Vec<f64>,
    pub absorption: Vec<f64>,
    pub ab_v: Vec<f64>,
    pub ab_src_v: Vec<f64>,
}

impl OpacityBuffers {
    #[must_use]
    pub fn new(n_cells: usize) -> Self {
        Self {
            source: vec![0.0; n_cells],
            absorption: vec![0.0; n_cells],
            ab_v: vec![0.0; n_cells],
            ab_src_v: vec![0.0; n_cells],
        }
    }

    /// Store one cell's interpolated (absorption, source) pair, applying
    /// the degeneracy floor.
    pub fn store(&mut self, scheme: Scheme, cell: usize, volume: f64, val1: f64, val2: f64) {
        let degenerate = val1 <= OPACITY_FLOOR || val2 <= OPACITY_FLOOR;
        self.source[cell] = if degenerate { OPACITY_FLOOR } else { val2 / val1 };
        match scheme {
            Scheme::Exponential => {
                self.absorption[cell] = if degenerate { OPACITY_FLOOR } else { val1 };
            }
            Scheme::FiniteVolume => {
                self.ab_v[cell] = if degenerate {
                    OPACITY_FLOOR * volume
                } else {
                    val1 * volume
                };
                self.ab_src_v[cell] = self.source[cell] * self.ab_v[cell];
            }
        };
    }
}

/// Worker-local accumulation state, reused across all owned (bin, ordinate)
/// passes. `intensity` holds each cell's outgoing intensity of the current
/// pass only; the other accumulators integrate over all owned passes.
#[derive(Debug, Clone)]
pub struct SweepScratch {
    pub intensity: Vec<f64>,
    pub mean_intensity: Vec<f64>,
    pub flux: Vec<Vector3<f64>>,
    pub divq: Vec<f64>,
    pub temp_profile: Vec<f64>,
    pub opacities: OpacityBuffers,
}

impl SweepScratch {
    #[must_use]
    pub fn new(n_cells: usize) -> Self {
        Self {
            intensity: vec![0.0; n_cells],
            mean_intensity: vec![0.0; n_cells],
            flux: vec![Vector3::zeros(); n_cells],
            divq: vec![0.0; n_cells],
            temp_profile: vec![0.0; n_cells],
            opacities: OpacityBuffers::new(n_cells),
        }
    }

    /// Zero the cross-pass accumulators before a new execute cycle. The
    /// temperature profile and opacity buffers are overwritten by the next
    /// opacity evaluation and need no reset.
    pub fn reset(&mut self) {
        self.intensity.fill(0.0);
        self.mean_intensity.fill(0.0);
        self.flux.fill(Vector3::zeros());
        self.divq.fill(0.0);
    }
}

/// Shared read-only inputs of a transport pass.
pub struct TransportContext<'a> {
    pub mesh: &'a Mesh,
    pub table: &'a OpacityTable,
    pub thermo: &'a ThermoModel,
    pub scheme: Scheme,
    pub mode: OpacityMode,
}

/// Sample one cell's thermodynamic state and store its opacity pair.
fn eval_cell_opacity(ctx: &TransportContext<'_>, bin: usize, cell: usize, scratch: &mut SweepScratch) {
    let c = ctx.mesh.cell(cell);
    let (t, p_atm) = ctx.thermo.sample(cell, &c.centroid);
    scratch.temp_profile[cell] = t;
    let (val1, val2) = ctx.table.interpolate(t, p_atm, bin);
    scratch.opacities.store(ctx.scheme, cell, c.volume, val1, val2);
}

/// Whole-field opacity precomputation for `bin`: one table interpolation
/// per cell, shared by every ordinate sweeping this bin. Interpolations are
/// independent and run data-parallel; the scatter into the buffers stays
/// serial.
pub fn prepare_bin(ctx: &TransportContext<'_>, bin: usize, scratch: &mut SweepScratch) {
    let samples: Vec<(f64, f64, f64)> = (0..ctx.mesh.n_cells())
        .into_par_iter()
        .map(|cell| {
            let (t, p_atm) = ctx.thermo.sample(cell, &ctx.mesh.cell(cell).centroid);
            let (val1, val2) = ctx.table.interpolate(t, p_atm, bin);
            (t, val1, val2)
        })
        .collect();
    for (cell, &(t, val1, val2)) in samples.iter().enumerate() {
        scratch.temp_profile[cell] = t;
        scratch
            .opacities
            .store(ctx.scheme, cell, ctx.mesh.cell(cell).volume, val1, val2);
    }
}

/// Sweep every cell once for (`bin`, `ordinate`), in causal order, and fold
/// the results into the scratch accumulators. In per-cell opacity mode the
/// table lookup happens here, just before the cell is solved.
pub fn sweep_pass(
    ctx: &TransportContext<'_>,
    bin: usize,
    order: &SweepOrder,
    ordinate: &Ordinate,
    scratch: &mut SweepScratch,
) {
    let mesh = ctx.mesh;
    let dir = &ordinate.direction;
    let weight = ordinate.weight;

    for m in 0..order.len() {
        let cell = order.cell(m);
        if ctx.mode == OpacityMode::PerCell {
            eval_cell_opacity(ctx, bin, cell, scratch);
        }
        let faces = &mesh.cell(cell).face_ids;

        let mut in_neg = 0.0;
        let (i_out, i_c) = match ctx.scheme {
            Scheme::Exponential => {
                let mut neg = 0.0;
                for &face in faces {
                    let a = mesh.outward_normal(face, cell).dot(dir);
                    if a < 0.0 {
                        neg += a;
                        let upwind = match mesh.neighbor_across(face, cell) {
                            Some(neighbor) => scratch.intensity[neighbor],
                            None => scratch.opacities.source[cell],
                        };
                        in_neg += upwind * a;
                    }
                }
                // optical half-step over the cell's effective path length
                let lc = mesh.cell(cell).volume / (-neg);
                let h = (-0.5 * lc * scratch.opacities.absorption[cell]).exp();
                let s = scratch.opacities.source[cell];
                let upstream = in_neg / neg;
                (
                    upstream * h * h + (1.0 - h * h) * s,
                    upstream * h + (1.0 - h) * s,
                )
            }
            Scheme::FiniteVolume => {
                let mut pos = 0.0;
                for &face in faces {
                    let a = mesh.outward_normal(face, cell).dot(dir);
                    if a >= 0.0 {
                        pos += a;
                    } else {
                        let upwind = match mesh.neighbor_across(face, cell) {
                            Some(neighbor) => scratch.intensity[neighbor],
                            None => scratch.opacities.source[cell],
                        };
                        in_neg += upwind * a;
                    }
                }
                let i = (scratch.opacities.ab_src_v[cell] - in_neg)
                    / (scratch.opacities.ab_v[cell] + pos);
                (i, i)
            }
        };
        scratch.intensity[cell] = i_out;

        scratch.flux[cell] += *dir * (i_c * weight);

        // net flow through the cell: inflow already signed negative
        let mut in_tot = in_neg;
        for &face in faces {
            let a = mesh.outward_normal(face, cell).dot(dir);
            if a > 0.0 {
                in_tot += i_out * a;
            }
        }
        scratch.divq[cell] += in_tot * weight;
        scratch.mean_intensity[cell] += i_c * weight;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_types::TemperatureProfile;
    use crate::solver::sweep::build_sweep_order;
    use approx::assert_relative_eq;

    fn dummy_ctx<'a>(
        mesh: &'a Mesh,
        table: &'a OpacityTable,
        thermo: &'a ThermoModel,
        scheme: Scheme,
    ) -> TransportContext<'a> {
        TransportContext {
            mesh,
            table,
            thermo,
            scheme,
            // whole-field mode: the test fills the opacity buffers directly
            mode: OpacityMode::WholeField,
        }
    }

    fn flat_table() -> OpacityTable {
        OpacityTable::from_parts(
            vec![1.0, 2.0],
            vec![300.0, 500.0],
            1,
            &[(1.0, 1.0); 4],
        )
    }

    fn profile_thermo() -> ThermoModel {
        ThermoModel::RadialProfile {
            profile: TemperatureProfile {
                t_min: 1000.0,
                t_max: 12000.0,
                delta_t: 0.0071,
            },
            pressure: 101_325.0,
        }
    }

    fn x_ordinate() -> Ordinate {
        Ordinate {
            direction: Vector3::x(),
            weight: 1.0,
        }
    }

    #[test]
    fn degenerate_values_clamp_to_floor() {
        let mut buffers = OpacityBuffers::new(1);
        buffers.store(Scheme::Exponential, 0, 2.0, 0.0, 5.0);
        assert_eq!(buffers.source[0], OPACITY_FLOOR);
        assert_eq!(buffers.absorption[0], OPACITY_FLOOR);

        buffers.store(Scheme::FiniteVolume, 0, 2.0, 1e-31, 5.0);
        assert_eq!(buffers.source[0], OPACITY_FLOOR);
        assert_eq!(buffers.ab_v[0], OPACITY_FLOOR * 2.0);
        assert_eq!(buffers.ab_src_v[0], OPACITY_FLOOR * OPACITY_FLOOR * 2.0);

        buffers.store(Scheme::Exponential, 0, 2.0, 4.0, 8.0);
        assert_relative_eq!(buffers.source[0], 2.0);
        assert_relative_eq!(buffers.absorption[0], 4.0);
    }

    #[test]
    fn uniform_medium_is_in_equilibrium() {
        // constant source and absorption: every cell's intensity equals the
        // source value and the net flow through every cell vanishes
        let mesh = Mesh::box_grid(3, 3, 3, 1.0, 1.0, 1.0);
        let table = flat_table();
        let thermo = profile_thermo();
        let dir = Vector3::new(1.0, 1.0, 1.0).normalize();
        let order = build_sweep_order(&mesh, 0, &dir).expect("order");
        let ordinate = Ordinate {
            direction: dir,
            weight: 1.5,
        };

        for scheme in [Scheme::Exponential, Scheme::FiniteVolume] {
            let ctx = dummy_ctx(&mesh, &table, &thermo, scheme);
            let mut scratch = SweepScratch::new(mesh.n_cells());
            for cell in 0..mesh.n_cells() {
                scratch
                    .opacities
                    .store(scheme, cell, mesh.cell(cell).volume, 2.0, 6.0);
            }
            sweep_pass(&ctx, 0, &order, &ordinate, &mut scratch);
            for cell in 0..mesh.n_cells() {
                assert_relative_eq!(scratch.intensity[cell], 3.0, epsilon = 1e-12);
                assert_relative_eq!(scratch.mean_intensity[cell], 4.5, epsilon = 1e-12);
                assert_relative_eq!(scratch.divq[cell], 0.0, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn exponential_scheme_attenuates_downstream() {
        // bright upstream cell, weakly emitting absorber downstream; the
        // absorber's outgoing intensity is the half-step blend
        let mesh = Mesh::box_grid(2, 1, 1, 2.0, 1.0, 1.0);
        let table = flat_table();
        let thermo = profile_thermo();
        let ctx = dummy_ctx(&mesh, &table, &thermo, Scheme::Exponential);
        let order = build_sweep_order(&mesh, 0, &Vector3::x()).expect("order");

        let mut scratch = SweepScratch::new(2);
        scratch.opacities.source = vec![5.0, 1.0];
        // h = exp(-0.5 * Lc * kappa) = 1/2 for unit cells
        scratch.opacities.absorption = vec![0.0, 4.0 * 2.0_f64.ln()];
        sweep_pass(&ctx, 0, &order, &x_ordinate(), &mut scratch);

        // transparent cell forwards its boundary inflow unchanged
        assert_relative_eq!(scratch.intensity[0], 5.0, epsilon = 1e-12);
        assert_relative_eq!(scratch.divq[0], 0.0, epsilon = 1e-12);
        // I_out = 5*h^2 + (1-h^2)*1, I_c = 5*h + (1-h)*1 with h = 1/2
        assert_relative_eq!(scratch.intensity[1], 2.0, epsilon = 1e-12);
        assert_relative_eq!(scratch.mean_intensity[1], 3.0, epsilon = 1e-12);
        assert_relative_eq!(scratch.flux[1].x, 3.0, epsilon = 1e-12);
        assert_relative_eq!(scratch.divq[1], -3.0, epsilon = 1e-12);
    }

    #[test]
    fn finite_volume_scheme_balances_inflow_and_absorption() {
        let mesh = Mesh::box_grid(2, 1, 1, 2.0, 1.0, 1.0);
        let table = flat_table();
        let thermo = profile_thermo();
        let ctx = dummy_ctx(&mesh, &table, &thermo, Scheme::FiniteVolume);
        let order = build_sweep_order(&mesh, 0, &Vector3::x()).expect("order");

        let mut scratch = SweepScratch::new(2);
        scratch.opacities.source = vec![5.0, 1.0];
        scratch.opacities.ab_v = vec![1.0, 2.0];
        scratch.opacities.ab_src_v = vec![5.0, 2.0];
        sweep_pass(&ctx, 0, &order, &x_ordinate(), &mut scratch);

        // cell 0: (5 - (-5)) / (1 + 1) = 5, in equilibrium with its boundary
        assert_relative_eq!(scratch.intensity[0], 5.0, epsilon = 1e-12);
        assert_relative_eq!(scratch.divq[0], 0.0, epsilon = 1e-12);
        // cell 1: (2 - (-5)) / (2 + 1) = 7/3
        assert_relative_eq!(scratch.intensity[1], 7.0 / 3.0, epsilon = 1e-12);
        assert_relative_eq!(scratch.divq[1], -5.0 + 7.0 / 3.0, epsilon = 1e-12);
        assert_relative_eq!(scratch.flux[1].x, 7.0 / 3.0, epsilon = 1e-12);
    }

    #[test]
    fn whole_field_prepare_fills_every_cell() {
        let mesh = Mesh::box_grid(2, 2, 2, 1.0, 1.0, 1.0);
        let table = flat_table();
        let thermo = profile_thermo();
        let ctx = dummy_ctx(&mesh, &table, &thermo, Scheme::Exponential);
        let mut scratch = SweepScratch::new(mesh.n_cells());
        prepare_bin(&ctx, 0, &mut scratch);
        for cell in 0..mesh.n_cells() {
            // flat unit table: val1 = val2 = 1 everywhere
            assert_relative_eq!(scratch.opacities.source[cell], 1.0);
            assert_relative_eq!(scratch.opacities.absorption[cell], 1.0);
            assert!(scratch.temp_profile[cell] > 0.0);
        }
    }
}
