//! Spectral opacity data

pub mod table;

pub use table::OpacityTable;
