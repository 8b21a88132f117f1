//! Per-cell thermodynamic state
//!
//! The engine needs a temperature and a pressure for every cell to drive the
//! opacity-table lookup. These either come out of externally supplied state
//! vectors (at configurable component indices) or, for the spherical
//! benchmark, from an analytic radial temperature profile at constant
//! pressure.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// Standard atmosphere in Pa; the opacity table is gridded in atm
pub const ATM_PA: f64 = 101_325.0;

/// Flat storage of per-cell state vectors, row-major with a fixed stride.
#[derive(Debug, Clone)]
pub struct GasStateField {
    data: Vec<f64>,
    stride: usize,
}

impl GasStateField {
    /// Zero-initialized field for `n_cells` state vectors of width `stride`
    #[must_use]
    pub fn new(n_cells: usize, stride: usize) -> Self {
        assert!(stride > 0, "state vectors need at least one component");
        Self {
            data: vec![0.0; n_cells * stride],
            stride,
        }
    }

    /// Width of each state vector
    #[must_use]
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Number of cells
    #[must_use]
    pub fn n_cells(&self) -> usize {
        self.data.len() / self.stride
    }

    /// State vector of one cell
    #[must_use]
    pub fn state(&self, cell: usize) -> &[f64] {
        let start = cell * self.stride;
        &self.data[start..start + self.stride]
    }

    /// Overwrite the state vector of one cell
    ///
    /// # Panics
    ///
    /// Panics if `values` does not match the field stride.
    pub fn set_state(&mut self, cell: usize, values: &[f64]) {
        assert_eq!(values.len(), self.stride, "state width mismatch");
        let start = cell * self.stride;
        self.data[start..start + self.stride].copy_from_slice(values);
    }
}

/// Parameters of the analytic radial temperature profile used for the
/// spherically symmetric benchmark.
///
/// T(r) = Tmax - (Tmax - Tmin) * (1 - exp(-A)) / (1 - exp(-Amax)) with
/// A = (0.01 r / dT)^2 and Amax evaluated at the sphere radius 1.5.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TemperatureProfile {
    /// Far-field (minimum) temperature [K]
    pub t_min: f64,
    /// Center (maximum) temperature [K]
    pub t_max: f64,
    /// Characteristic decay width
    pub delta_t: f64,
}

impl TemperatureProfile {
    /// Sphere radius of the benchmark geometry
    pub const RADIUS: f64 = 1.5;

    /// Temperature at distance `r` from the origin
    #[must_use]
    pub fn evaluate(&self, r: f64) -> f64 {
        let a = (r * 0.01 / self.delta_t).powi(2);
        let a_max = (Self::RADIUS * 0.01 / self.delta_t).powi(2);
        self.t_max - (self.t_max - self.t_min) * (1.0 - (-a).exp()) / (1.0 - (-a_max).exp())
    }
}

/// Source of the (temperature, pressure) pair driving table lookups.
#[derive(Debug, Clone)]
pub enum ThermoModel {
    /// Read both from the per-cell state vectors
    FromState {
        states: GasStateField,
        pressure_id: usize,
        temperature_id: usize,
    },
    /// Constant pressure [Pa] with the analytic radial temperature profile
    RadialProfile {
        profile: TemperatureProfile,
        pressure: f64,
    },
}

impl ThermoModel {
    /// Temperature [K] and pressure [atm] for the cell at `centroid`.
    /// Pressure is converted from Pa before the table lookup.
    #[must_use]
    pub fn sample(&self, cell: usize, centroid: &Vector3<f64>) -> (f64, f64) {
        match self {
            Self::FromState {
                states,
                pressure_id,
                temperature_id,
            } => {
                let state = states.state(cell);
                (state[*temperature_id], state[*pressure_id] / ATM_PA)
            }
            Self::RadialProfile { profile, pressure } => {
                (profile.evaluate(centroid.norm()), pressure / ATM_PA)
            }
        }
    }
}
