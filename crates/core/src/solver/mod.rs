//! Discrete-ordinates radiative transport solver
//!
//! The solver walks every owned (spectral bin, ordinate direction) pair of a
//! statically partitioned work space and sweeps the mesh in upwind causal
//! order, accumulating radiative flux and its divergence per cell. Setup
//! (table load, quadrature, partitioning, sweep-order construction) is
//! fallible and front-loads all validation; `execute` then runs to
//! completion without further error paths.
//!
//! # Example
//!
//! ```rust,ignore
//! use rad_sim_core::{Mesh, RadiationSolver, SolverConfig};
//!
//! let mesh = Mesh::box_grid(20, 20, 20, 3.0, 3.0, 3.0);
//! let config = SolverConfig {
//!     constant_pressure: Some(101_325.0),
//!     ..SolverConfig::default()
//! };
//! let mut solver = RadiationSolver::new(config, mesh, None)?;
//! solver.execute()?;
//! let divq = &solver.fields().divq;
//! ```

pub mod fields;
pub mod partition;
pub mod radial;
pub mod sweep;
pub mod transport;

pub use fields::RadiationFields;
pub use partition::{IterationOrder, WorkPartition};
pub use radial::{write_radial_profile, SPHERE_RADIUS};
pub use sweep::{build_sweep_order, SweepOrder};
pub use transport::{
    prepare_bin, sweep_pass, OpacityBuffers, SweepScratch, TransportContext, OPACITY_FLOOR,
};

use crate::config::{OpacityMode, SolverConfig};
use crate::core_types::{GasStateField, Mesh, TemperatureProfile, ThermoModel};
use crate::error::RadiationError;
use crate::opacity::OpacityTable;
use crate::quadrature::AngularQuadrature;
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use std::time::Instant;
use tracing::{debug, info};

/// One fully set-up radiative transport engine over a fixed mesh, opacity
/// table and work assignment.
pub struct RadiationSolver {
    config: SolverConfig,
    mesh: Mesh,
    thermo: ThermoModel,
    table: OpacityTable,
    quadrature: AngularQuadrature,
    partition: WorkPartition,
    orders: FxHashMap<usize, SweepOrder>,
    scratch: SweepScratch,
    fields: RadiationFields,
}

impl RadiationSolver {
    /// Set up a solver, loading the opacity table from the configured path.
    ///
    /// `states` supplies per-cell state vectors when temperatures and
    /// pressures come from the flow field; with `constant_pressure` set the
    /// analytic radial profile is used instead and `states` may be `None`.
    ///
    /// # Errors
    ///
    /// Any [`RadiationError`]: bad configuration, unreadable or malformed
    /// table, or a direction with no admissible sweep order.
    pub fn new(
        config: SolverConfig,
        mesh: Mesh,
        states: Option<GasStateField>,
    ) -> Result<Self, RadiationError> {
        let start = Instant::now();
        let table = OpacityTable::load(&config.table_path())?;
        debug!("table load took {:.3} s", start.elapsed().as_secs_f64());
        Self::with_table(config, mesh, states, table)
    }

    /// Set up a solver around an already-built table (synthetic tables in
    /// tests and demos).
    ///
    /// # Errors
    ///
    /// Same as [`RadiationSolver::new`], except table I/O.
    pub fn with_table(
        config: SolverConfig,
        mesh: Mesh,
        states: Option<GasStateField>,
        table: OpacityTable,
    ) -> Result<Self, RadiationError> {
        let start = Instant::now();

        let thermo = match (config.constant_pressure, states) {
            (Some(pressure), _) => ThermoModel::RadialProfile {
                profile: TemperatureProfile {
                    t_min: config.t_min,
                    t_max: config.t_max,
                    delta_t: config.delta_t,
                },
                pressure,
            },
            (None, Some(states)) => {
                if states.n_cells() != mesh.n_cells() {
                    return Err(RadiationError::Config(format!(
                        "state field covers {} cells, mesh has {}",
                        states.n_cells(),
                        mesh.n_cells()
                    )));
                }
                ThermoModel::FromState {
                    states,
                    pressure_id: config.pressure_id,
                    temperature_id: config.temperature_id,
                }
            }
            (None, None) => {
                return Err(RadiationError::Config(
                    "state vectors are required unless constant_pressure is set".to_string(),
                ));
            }
        };
        let state_width = match &thermo {
            ThermoModel::FromState { states, .. } => states.stride(),
            ThermoModel::RadialProfile { .. } => 0,
        };
        config.validate(state_width)?;

        if config.write_table_ascii {
            table.write_ascii(&config.ascii_table_path())?;
        }

        let quadrature = AngularQuadrature::new(config.n_directions);
        let partition = WorkPartition::new(
            table.n_bins(),
            quadrature.len(),
            config.n_workers,
            config.worker_id,
            config.order,
        )?;
        info!(
            "worker {}/{}: {} (bin, dir) pairs {:?}..={:?} of {} bins x {} dirs",
            config.worker_id,
            config.n_workers,
            partition.len(),
            partition.start_pair(),
            partition.end_pair(),
            table.n_bins(),
            quadrature.len()
        );

        // orders are independent per direction
        let order_start = Instant::now();
        let orders: FxHashMap<usize, SweepOrder> = partition
            .owned_dirs()
            .into_par_iter()
            .map(|dir| {
                build_sweep_order(&mesh, dir, &quadrature.ordinate(dir).direction)
                    .map(|order| (dir, order))
            })
            .collect::<Result<_, _>>()?;
        info!(
            "built {} sweep orders in {:.3} s",
            orders.len(),
            order_start.elapsed().as_secs_f64()
        );

        let n_cells = mesh.n_cells();
        let mut fields = RadiationFields::new(n_cells);
        // stage diagnostic from the first owned direction
        if let Some(&first_dir) = partition.owned_dirs().first() {
            let order = &orders[&first_dir];
            for s in 0..order.n_stages() {
                let (lo, hi) = order.stage_extent(s);
                for m in lo..hi {
                    fields.stage_id[order.cell(m)] = s;
                }
            }
        }

        info!("solver setup took {:.3} s", start.elapsed().as_secs_f64());
        Ok(Self {
            config,
            mesh,
            thermo,
            table,
            quadrature,
            partition,
            orders,
            scratch: SweepScratch::new(n_cells),
            fields,
        })
    }

    /// Run every owned (bin, direction) pass and publish the accumulated
    /// fields. Repeatable: each call starts from zeroed accumulators.
    ///
    /// # Errors
    ///
    /// [`RadiationError::ReportIo`] if the optional radial report cannot be
    /// written; the transport itself has no error paths.
    pub fn execute(&mut self) -> Result<(), RadiationError> {
        let Self {
            config,
            mesh,
            thermo,
            table,
            quadrature,
            partition,
            orders,
            scratch,
            fields,
        } = self;

        if config.dry_run {
            info!("dry run: skipping {} transport passes", partition.len());
            return Ok(());
        }

        let start = Instant::now();
        scratch.reset();
        fields.reset();

        let ctx = TransportContext {
            mesh,
            table,
            thermo,
            scheme: config.scheme,
            mode: config.opacity_mode,
        };

        let mut last_bin = None;
        for (bin, dir) in partition.pairs() {
            if ctx.mode == OpacityMode::WholeField && last_bin != Some(bin) {
                prepare_bin(&ctx, bin, scratch);
                last_bin = Some(bin);
            }
            debug!("sweeping (bin, dir) = ({bin}, {dir})");
            sweep_pass(&ctx, bin, &orders[&dir], quadrature.ordinate(dir), scratch);
        }

        for cell in 0..mesh.n_cells() {
            fields.divq[cell] = scratch.divq[cell] / mesh.cell(cell).volume;
            fields.qx[cell] = scratch.flux[cell].x;
            fields.qy[cell] = scratch.flux[cell].y;
            fields.qz[cell] = scratch.flux[cell].z;
            fields.mean_intensity[cell] = scratch.mean_intensity[cell];
            fields.temp_profile[cell] = scratch.temp_profile[cell];
        }

        if config.radial_data {
            let path = config.table_dir.join("radialData.plt");
            write_radial_profile(mesh, fields, config.n_radial_points, &path)?;
        }

        info!(
            "{} transport passes in {:.3} s",
            partition.len(),
            start.elapsed().as_secs_f64()
        );
        Ok(())
    }

    /// Solved output fields
    #[must_use]
    pub fn fields(&self) -> &RadiationFields {
        &self.fields
    }

    #[must_use]
    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    #[must_use]
    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Spectral bin count of the loaded table
    #[must_use]
    pub fn n_bins(&self) -> usize {
        self.table.n_bins()
    }

    /// Ordinate count actually in use (after any fallback)
    #[must_use]
    pub fn n_directions(&self) -> usize {
        self.quadrature.len()
    }
}
