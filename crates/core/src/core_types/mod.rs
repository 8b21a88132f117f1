//! Core types and utilities

pub mod mesh;
pub mod state;

pub use mesh::{Cell, Face, Mesh};
pub use state::{GasStateField, TemperatureProfile, ThermoModel, ATM_PA};
