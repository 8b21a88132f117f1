//! Externally visible output fields

use nalgebra::Vector3;

/// Per-cell results of a radiation solve: the volume-normalized divergence
/// of the radiative flux, the flux components, the weighted mean intensity
/// and the sampled temperature field. `stage_id` is a setup-time diagnostic
/// (the causal stage each cell belongs to for the first owned direction)
/// and persists across runs.
#[derive(Debug, Clone)]
pub struct RadiationFields {
    pub divq: Vec<f64>,
    pub qx: Vec<f64>,
    pub qy: Vec<f64>,
    pub qz: Vec<f64>,
    pub mean_intensity: Vec<f64>,
    pub temp_profile: Vec<f64>,
    pub stage_id: Vec<usize>,
}

impl RadiationFields {
    #[must_use]
    pub fn new(n_cells: usize) -> Self {
        Self {
            divq: vec![0.0; n_cells],
            qx: vec![0.0; n_cells],
            qy: vec![0.0; n_cells],
            qz: vec![0.0; n_cells],
            mean_intensity: vec![0.0; n_cells],
            temp_profile: vec![0.0; n_cells],
            stage_id: vec![0; n_cells],
        }
    }

    #[must_use]
    pub fn n_cells(&self) -> usize {
        self.divq.len()
    }

    /// Flux vector of one cell
    #[must_use]
    pub fn flux(&self, cell: usize) -> Vector3<f64> {
        Vector3::new(self.qx[cell], self.qy[cell], self.qz[cell])
    }

    /// Zero all solve outputs; the stage diagnostic is setup-time data and
    /// survives.
    pub fn reset(&mut self) {
        self.divq.fill(0.0);
        self.qx.fill(0.0);
        self.qy.fill(0.0);
        self.qz.fill(0.0);
        self.mean_intensity.fill(0.0);
        self.temp_profile.fill(0.0);
    }
}
