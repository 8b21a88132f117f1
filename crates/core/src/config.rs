//! Solver configuration surface
//!
//! All recognized options for the discrete-ordinates transport engine, with
//! defaults matching a typical air-plasma setup (8 ordinates, exponential
//! scheme, whole-field opacity evaluation, single worker).

use crate::error::RadiationError;
use crate::solver::IterationOrder;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Numerical scheme for the per-cell intensity balance.
///
/// The two schemes are mutually exclusive per run and parameterize the cell
/// opacity buffers differently (see `solver::transport`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Scheme {
    /// Exponential decay in optical thickness across the cell (ICCFD7-1003)
    #[default]
    Exponential,
    /// Linear upwind finite-volume balance
    FiniteVolume,
}

/// When opacities are interpolated from the table during a solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OpacityMode {
    /// Precompute opacity and source for every cell once per bin, shared by
    /// all directions of that bin (one lookup per cell per bin)
    #[default]
    WholeField,
    /// Interpolate lazily for exactly the cell being visited, interleaved
    /// with the sweep (one lookup per cell per bin per direction; better
    /// load balance across workers)
    PerCell,
}

/// Full configuration for one [`RadiationSolver`](crate::RadiationSolver).
///
/// Every field has a default, so any subset can be overridden when
/// deserializing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Number of discrete ordinates. Only 8, 24, 48 and 80 are supported;
    /// anything else falls back to 8 with a warning.
    pub n_directions: usize,
    /// Directory containing the binary opacity table
    pub table_dir: PathBuf,
    /// File name of the binary opacity table
    pub table_name: String,
    /// Re-emit the parsed table as a human-readable ASCII report
    pub write_table_ascii: bool,
    /// File name of the ASCII report (inside `table_dir`)
    pub ascii_table_name: String,
    /// Numerical scheme for the intensity balance
    pub scheme: Scheme,
    /// Opacity evaluation strategy
    pub opacity_mode: OpacityMode,
    /// Write the radial q/divQ profile for the spherical test case
    pub radial_data: bool,
    /// Number of radial shells for the spherical profile
    pub n_radial_points: usize,
    /// Constant pressure in Pa. When set, cell temperatures come from the
    /// analytic radial profile instead of the state vectors.
    pub constant_pressure: Option<f64>,
    /// Minimum temperature of the analytic radial profile [K]
    pub t_min: f64,
    /// Maximum temperature of the analytic radial profile [K]
    pub t_max: f64,
    /// Characteristic decay width of the analytic radial profile
    pub delta_t: f64,
    /// Index of pressure within the per-cell state vector
    pub pressure_id: usize,
    /// Index of temperature within the per-cell state vector
    pub temperature_id: usize,
    /// Total number of workers the (bin, direction) space is split across
    pub n_workers: usize,
    /// Index of this worker within the split
    pub worker_id: usize,
    /// Iteration order over the (bin, direction) index space
    pub order: IterationOrder,
    /// Skip all transport computation (setup/timing runs only)
    pub dry_run: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            n_directions: 8,
            table_dir: PathBuf::from("."),
            table_name: "air-100.dat".to_string(),
            write_table_ascii: true,
            ascii_table_name: "air-100.out".to_string(),
            scheme: Scheme::Exponential,
            opacity_mode: OpacityMode::WholeField,
            radial_data: false,
            n_radial_points: 100,
            constant_pressure: None,
            t_min: 1000.0,
            t_max: 12000.0,
            delta_t: 0.0071,
            pressure_id: 0,
            temperature_id: 4,
            n_workers: 1,
            worker_id: 0,
            order: IterationOrder::BinMajor,
            dry_run: false,
        }
    }
}

impl SolverConfig {
    /// Full path of the binary opacity table
    #[must_use]
    pub fn table_path(&self) -> PathBuf {
        self.table_dir.join(&self.table_name)
    }

    /// Full path of the ASCII table report
    #[must_use]
    pub fn ascii_table_path(&self) -> PathBuf {
        self.table_dir.join(&self.ascii_table_name)
    }

    /// Check option consistency against the width of the per-cell state
    /// vectors.
    ///
    /// # Errors
    ///
    /// [`RadiationError::Config`] when state indices collide or fall outside
    /// the state width (unless the analytic profile supplies temperature and
    /// pressure), when profile parameters are non-positive, or when the
    /// worker split is inconsistent.
    pub fn validate(&self, state_width: usize) -> Result<(), RadiationError> {
        if self.constant_pressure.is_none() {
            if self.pressure_id == self.temperature_id {
                return Err(RadiationError::Config(format!(
                    "pressure_id and temperature_id must differ (both {})",
                    self.pressure_id
                )));
            }
            if self.pressure_id >= state_width || self.temperature_id >= state_width {
                return Err(RadiationError::Config(format!(
                    "state indices (P={}, T={}) out of range for state width {}",
                    self.pressure_id, self.temperature_id, state_width
                )));
            }
        } else {
            let p = self.constant_pressure.unwrap_or_default();
            if p <= 0.0 || self.t_min <= 0.0 || self.t_max <= 0.0 || self.delta_t <= 0.0 {
                return Err(RadiationError::Config(
                    "analytic profile requires positive pressure, Tmin, Tmax and DeltaT"
                        .to_string(),
                ));
            }
        }
        if self.n_workers == 0 {
            return Err(RadiationError::Config("n_workers must be at least 1".to_string()));
        }
        if self.worker_id >= self.n_workers {
            return Err(RadiationError::Config(format!(
                "worker_id {} out of range for {} workers",
                self.worker_id, self.n_workers
            )));
        }
        if self.radial_data && self.n_radial_points == 0 {
            return Err(RadiationError::Config(
                "radial_data requires at least one radial shell".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_describe_air_plasma_setup() {
        let config = SolverConfig::default();
        assert_eq!(config.n_directions, 8);
        assert_eq!(config.table_name, "air-100.dat");
        assert_eq!(config.scheme, Scheme::Exponential);
        assert_eq!(config.opacity_mode, OpacityMode::WholeField);
        assert_eq!(config.order, IterationOrder::BinMajor);
        assert_eq!((config.pressure_id, config.temperature_id), (0, 4));
        assert!(!config.dry_run);
    }

    #[test]
    fn equal_state_indices_are_rejected() {
        let config = SolverConfig {
            pressure_id: 2,
            temperature_id: 2,
            ..SolverConfig::default()
        };
        assert!(config.validate(5).is_err());
    }

    #[test]
    fn profile_mode_skips_state_index_checks() {
        let config = SolverConfig {
            constant_pressure: Some(10_000.0),
            pressure_id: 9,
            temperature_id: 9,
            ..SolverConfig::default()
        };
        // State width is irrelevant when the profile supplies T and p
        assert!(config.validate(1).is_ok());
    }

    #[test]
    fn worker_id_must_be_in_range() {
        let config = SolverConfig {
            n_workers: 4,
            worker_id: 4,
            ..SolverConfig::default()
        };
        assert!(config.validate(5).is_err());
    }
}
