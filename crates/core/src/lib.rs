//! Radiative Heat Transfer Core Library
//!
//! A discrete-ordinates radiative transport engine for unstructured
//! finite-volume meshes. Per spectral bin and ordinate direction, the mesh
//! is swept in upwind causal order and each cell's intensity is solved with
//! either an exponential or a linear finite-volume scheme, accumulating the
//! radiative flux vector and its divergence.
//!
//! ## Pipeline
//!
//! - Binned opacity/emission tables interpolated over (temperature, pressure)
//! - Level-symmetric angular quadrature (8, 24, 48 or 80 ordinates)
//! - Static (bin, direction) work partitioning across independent workers
//! - Per-direction upwind sweep ordering with staged causality
//! - Optional radial profile report for the spherical benchmark case

pub mod config;
pub mod core_types;
pub mod error;
pub mod opacity;
pub mod quadrature;
pub mod solver;

// Re-export the user-facing surface
pub use config::{OpacityMode, Scheme, SolverConfig};
pub use core_types::{Cell, Face, GasStateField, Mesh, TemperatureProfile, ThermoModel, ATM_PA};
pub use error::RadiationError;
pub use opacity::OpacityTable;
pub use quadrature::{AngularQuadrature, Ordinate};
pub use solver::{IterationOrder, RadiationFields, RadiationSolver, SweepOrder, WorkPartition};
