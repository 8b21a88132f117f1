//! Binned opacity / emission-source table
//!
//! Loads the binary spectral table and serves (absorption, source) pairs for
//! a given (temperature, pressure, bin) query. The binary stream is a flat
//! sequence of little-endian f64 values:
//!
//! - header: bin count, temperature-grid size, pressure-grid size
//! - pressure grid, then temperature grid (monotonically increasing)
//! - 143 zeros of padding (format artifact, skipped verbatim)
//! - per (pressure, bin) row: `2 * nbTemp` interleaved (absorption, source)
//!   values, one pair per temperature point
//! - a single zero sentinel
//!
//! A non-zero sentinel or a short read is a fatal format error; no partial
//! table is ever used. After load the values are re-laid-out for per-bin
//! access and are immutable.

use crate::error::RadiationError;
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::Path;
use tracing::{debug, info};

/// Number of padding zeros between the grids and the data rows
const PAD_VALUES: usize = 143;

/// Immutable spectral table of absorption coefficients and radiative source
/// values over a (bin, pressure, temperature) grid.
#[derive(Debug, Clone)]
pub struct OpacityTable {
    n_bins: usize,
    n_temp: usize,
    n_press: usize,
    temperatures: Vec<f64>,
    pressures: Vec<f64>,
    // flat layout: index = it + ib*n_temp + ip*n_bins*n_temp
    opacities: Vec<f64>,
    sources: Vec<f64>,
}

impl OpacityTable {
    /// Load and re-layout a binary table file.
    ///
    /// # Errors
    ///
    /// [`RadiationError::TableIo`] if the file cannot be opened or read,
    /// [`RadiationError::TableFormat`] on truncation, degenerate grid sizes
    /// or a non-zero end sentinel.
    pub fn load(path: &Path) -> Result<Self, RadiationError> {
        let file = File::open(path).map_err(|source| RadiationError::TableIo {
            path: path.to_path_buf(),
            source,
        })?;
        let mut reader = BufReader::new(file);

        let header = read_f64s(&mut reader, 3)?;
        let n_bins = header[0] as usize;
        let n_temp = header[1] as usize;
        let n_press = header[2] as usize;
        if n_bins == 0 || n_temp < 2 || n_press < 2 {
            return Err(RadiationError::TableFormat(format!(
                "degenerate grid sizes in header: bins={n_bins}, temps={n_temp}, pressures={n_press}"
            )));
        }
        debug!("opacity table header: {n_bins} bins, {n_temp} temperatures, {n_press} pressures");

        let pressures = read_f64s(&mut reader, n_press)?;
        let temperatures = read_f64s(&mut reader, n_temp)?;
        let _pad = read_f64s(&mut reader, PAD_VALUES)?;

        // one row of 2*n_temp interleaved (absorption, source) values per
        // (pressure, bin) pair
        let mut rows: Vec<Vec<f64>> = Vec::with_capacity(n_press * n_bins);
        for _ in 0..n_press * n_bins {
            rows.push(read_f64s(&mut reader, 2 * n_temp)?);
        }

        let sentinel = read_f64s(&mut reader, 1)?[0];
        if sentinel != 0.0 {
            return Err(RadiationError::TableFormat(format!(
                "end sentinel is {sentinel}, expected 0"
            )));
        }

        // re-layout bin-major within each pressure block for fast per-bin use
        let n_values = n_press * n_bins * n_temp;
        let mut opacities = vec![0.0; n_values];
        let mut sources = vec![0.0; n_values];
        for ib in 0..n_bins {
            for ip in 0..n_press {
                let row = &rows[ip + ib * n_press];
                for it in 0..n_temp {
                    let dst = it + ib * n_temp + ip * n_bins * n_temp;
                    opacities[dst] = row[2 * it];
                    sources[dst] = row[2 * it + 1];
                }
            }
        }

        info!(
            "loaded opacity table '{}': {} bins, {}x{} (T x p) grid",
            path.display(),
            n_bins,
            n_temp,
            n_press
        );

        Ok(Self {
            n_bins,
            n_temp,
            n_press,
            temperatures,
            pressures,
            opacities,
            sources,
        })
    }

    /// Assemble a table from already-decoded parts (synthetic tables in
    /// tests and the headless demo). `values` holds one `(absorption,
    /// source)` pair per `(pressure, bin, temperature)` triple, addressed as
    /// the binary rows are: row `ip + ib*n_press`, pair index `it`.
    ///
    /// # Panics
    ///
    /// Panics if the value count does not match the grid sizes.
    #[must_use]
    pub fn from_parts(
        pressures: Vec<f64>,
        temperatures: Vec<f64>,
        n_bins: usize,
        values: &[(f64, f64)],
    ) -> Self {
        let (n_press, n_temp) = (pressures.len(), temperatures.len());
        assert_eq!(values.len(), n_press * n_bins * n_temp, "table value count mismatch");
        let mut opacities = vec![0.0; values.len()];
        let mut sources = vec![0.0; values.len()];
        for ib in 0..n_bins {
            for ip in 0..n_press {
                for it in 0..n_temp {
                    let src = (ip + ib * n_press) * n_temp + it;
                    let dst = it + ib * n_temp + ip * n_bins * n_temp;
                    opacities[dst] = values[src].0;
                    sources[dst] = values[src].1;
                }
            }
        }
        Self {
            n_bins,
            n_temp,
            n_press,
            temperatures,
            pressures,
            opacities,
            sources,
        }
    }

    /// Number of spectral bins
    #[must_use]
    pub fn n_bins(&self) -> usize {
        self.n_bins
    }

    /// Temperature grid points [K]
    #[must_use]
    pub fn temperatures(&self) -> &[f64] {
        &self.temperatures
    }

    /// Pressure grid points [atm]
    #[must_use]
    pub fn pressures(&self) -> &[f64] {
        &self.pressures
    }

    /// Interpolated (absorption, source) at temperature `t` [K], pressure
    /// `p` [atm] for spectral bin `bin`.
    ///
    /// Bracketing indices come from a linear scan (the grids are small);
    /// queries outside the grid clamp to the boundary interval and
    /// extrapolate along its slope. Pressure is blended linearly at both
    /// bracketing temperatures; the temperature blend is logarithmic
    /// (geometric) when both bracket values are strictly positive and falls
    /// back to linear otherwise. The fallback is a numerical-stability
    /// policy, not an error path.
    #[must_use]
    pub fn interpolate(&self, t: f64, p: f64, bin: usize) -> (f64, f64) {
        let it = bracket(&self.temperatures, t);
        let ip = bracket(&self.pressures, p);

        let idx = |it: usize, ip: usize| it + bin * self.n_temp + ip * self.n_bins * self.n_temp;
        let i00 = idx(it, ip);
        let i01 = idx(it, ip + 1);
        let i10 = idx(it + 1, ip);
        let i11 = idx(it + 1, ip + 1);

        let p_frac = (p - self.pressures[ip]) / (self.pressures[ip + 1] - self.pressures[ip]);
        let t_frac =
            (t - self.temperatures[it]) / (self.temperatures[it + 1] - self.temperatures[it]);

        // linear in pressure at each bracketing temperature
        let op_lo = self.opacities[i00] + (self.opacities[i01] - self.opacities[i00]) * p_frac;
        let op_hi = self.opacities[i10] + (self.opacities[i11] - self.opacities[i10]) * p_frac;
        let src_lo = self.sources[i00] + (self.sources[i01] - self.sources[i00]) * p_frac;
        let src_hi = self.sources[i10] + (self.sources[i11] - self.sources[i10]) * p_frac;

        (blend_t(op_lo, op_hi, t_frac), blend_t(src_lo, src_hi, t_frac))
    }

    /// Write the parsed table as a human-readable report (purely
    /// diagnostic; not consumed downstream).
    ///
    /// # Errors
    ///
    /// [`RadiationError::ReportIo`] on any write failure.
    pub fn write_ascii(&self, path: &Path) -> Result<(), RadiationError> {
        let report_err = |source: std::io::Error| RadiationError::ReportIo {
            path: path.to_path_buf(),
            source,
        };
        let mut out = Vec::new();
        let w = &mut out;

        writeln!(
            w,
            "#Bins = {}\t#Temps = {}\t#Pressures = {}",
            self.n_bins, self.n_temp, self.n_press
        )
        .map_err(report_err)?;
        writeln!(w).map_err(report_err)?;
        write!(w, "Pressures[atm]  = ").map_err(report_err)?;
        for p in &self.pressures {
            write!(w, "{p} ").map_err(report_err)?;
        }
        writeln!(w).map_err(report_err)?;
        writeln!(w).map_err(report_err)?;
        write!(w, "Temperatures[K] = ").map_err(report_err)?;
        for t in &self.temperatures {
            write!(w, "{t} ").map_err(report_err)?;
        }
        writeln!(w).map_err(report_err)?;

        for ip in 0..self.n_press {
            writeln!(w).map_err(report_err)?;
            writeln!(w, "Pressure = {}", self.pressures[ip]).map_err(report_err)?;
            writeln!(w, "bin \t\t\t\t Temp \t\t\t\t val1 \t\t\t\t\t\t val2").map_err(report_err)?;
            for ib in 0..self.n_bins {
                for it in 0..self.n_temp {
                    let i = it + ib * self.n_temp + ip * self.n_bins * self.n_temp;
                    writeln!(
                        w,
                        "{}\t\t\t\t{}\t\t\t\t{}\t\t\t\t{}",
                        ib + 1,
                        self.temperatures[it],
                        self.opacities[i],
                        self.sources[i]
                    )
                    .map_err(report_err)?;
                }
            }
        }

        std::fs::write(path, out).map_err(report_err)?;
        info!("wrote ASCII opacity report to '{}'", path.display());
        Ok(())
    }
}

/// Lower index of the grid interval bracketing `x`, clamped to the last
/// valid interval when `x` falls outside the grid.
#[inline]
fn bracket(grid: &[f64], x: f64) -> usize {
    let mut lo = grid.len() - 2;
    for i in 1..grid.len() - 1 {
        if grid[i] > x {
            lo = i - 1;
            break;
        }
    }
    lo
}

/// Temperature blend: geometric when both ends are strictly positive,
/// linear otherwise (protects against log of non-positive values).
#[inline]
fn blend_t(lo: f64, hi: f64, frac: f64) -> f64 {
    if lo <= 0.0 || hi <= 0.0 {
        lo + (hi - lo) * frac
    } else {
        (frac * (hi / lo).ln()).exp() * lo
    }
}

/// Read `n` little-endian f64 values, mapping truncation to a format error.
fn read_f64s<R: Read>(reader: &mut R, n: usize) -> Result<Vec<f64>, RadiationError> {
    let mut bytes = vec![0u8; n * 8];
    reader.read_exact(&mut bytes).map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            RadiationError::TableFormat("truncated table stream".to_string())
        } else {
            RadiationError::TableFormat(format!("read failure: {e}"))
        }
    })?;
    Ok(bytes
        .chunks_exact(8)
        .map(|c| f64::from_le_bytes(c.try_into().expect("chunk is 8 bytes")))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::path::PathBuf;

    /// Encode a table in the binary stream layout.
    fn encode(
        pressures: &[f64],
        temperatures: &[f64],
        n_bins: usize,
        values: &[(f64, f64)],
        sentinel: f64,
    ) -> Vec<u8> {
        let mut data: Vec<f64> = vec![
            n_bins as f64,
            temperatures.len() as f64,
            pressures.len() as f64,
        ];
        data.extend_from_slice(pressures);
        data.extend_from_slice(temperatures);
        data.extend(std::iter::repeat_n(0.0, PAD_VALUES));
        for &(op, src) in values {
            data.push(op);
            data.push(src);
        }
        data.push(sentinel);
        data.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    fn temp_file(name: &str, bytes: &[u8]) -> PathBuf {
        let path = std::env::temp_dir().join(format!("radsim-{}-{name}", std::process::id()));
        std::fs::write(&path, bytes).expect("write temp table");
        path
    }

    /// 1 bin, 2 temperatures, 2 pressures; values constant in pressure so the
    /// temperature blend is isolated.
    fn two_by_two(v_lo: f64, v_hi: f64) -> OpacityTable {
        OpacityTable::from_parts(
            vec![1.0, 2.0],
            vec![300.0, 500.0],
            1,
            &[(v_lo, v_lo), (v_hi, v_hi), (v_lo, v_lo), (v_hi, v_hi)],
        )
    }

    #[test]
    fn load_roundtrips_grids_and_values() {
        let pressures = [0.5, 1.0, 2.0];
        let temperatures = [300.0, 1000.0];
        // 2 bins x 3 pressures, rows of 2 temperature pairs
        let values: Vec<(f64, f64)> = (0..12).map(|i| (f64::from(i), f64::from(i) * 10.0)).collect();
        let path = temp_file(
            "roundtrip.dat",
            &encode(&pressures, &temperatures, 2, &values, 0.0),
        );
        let table = OpacityTable::load(&path).expect("load");
        std::fs::remove_file(&path).ok();

        assert_eq!(table.n_bins(), 2);
        assert_eq!(table.pressures(), &pressures);
        assert_eq!(table.temperatures(), &temperatures);
        // grid-point queries return the stored values exactly
        for (ip, &p) in pressures.iter().enumerate() {
            for (it, &t) in temperatures.iter().enumerate() {
                for ib in 0..2 {
                    let flat = (ip + ib * 3) * 2 + it;
                    let (op, src) = table.interpolate(t, p, ib);
                    assert_relative_eq!(op, values[flat].0);
                    assert_relative_eq!(src, values[flat].1);
                }
            }
        }
    }

    #[test]
    fn nonzero_sentinel_is_fatal() {
        let path = temp_file(
            "sentinel.dat",
            &encode(&[1.0, 2.0], &[300.0, 500.0], 1, &[(1.0, 1.0); 4], 7.5),
        );
        let result = OpacityTable::load(&path);
        std::fs::remove_file(&path).ok();
        assert!(matches!(result, Err(RadiationError::TableFormat(_))));
    }

    #[test]
    fn truncated_stream_is_fatal() {
        let bytes = encode(&[1.0, 2.0], &[300.0, 500.0], 1, &[(1.0, 1.0); 4], 0.0);
        let path = temp_file("truncated.dat", &bytes[..bytes.len() - 24]);
        let result = OpacityTable::load(&path);
        std::fs::remove_file(&path).ok();
        assert!(matches!(result, Err(RadiationError::TableFormat(_))));
    }

    #[test]
    fn midpoint_blend_is_geometric_for_positive_values() {
        let table = two_by_two(4.0, 16.0);
        let (op, src) = table.interpolate(400.0, 1.5, 0);
        // geometric mean of 4 and 16
        assert_relative_eq!(op, 8.0, epsilon = 1e-12);
        assert_relative_eq!(src, 8.0, epsilon = 1e-12);
    }

    #[test]
    fn midpoint_blend_is_linear_when_a_value_is_nonpositive() {
        let table = two_by_two(-4.0, 16.0);
        let (op, _) = table.interpolate(400.0, 1.5, 0);
        // arithmetic mean of -4 and 16
        assert_relative_eq!(op, 6.0, epsilon = 1e-12);
    }

    #[test]
    fn out_of_range_queries_clamp_to_boundary_interval() {
        let table = two_by_two(4.0, 16.0);
        // below and above the temperature grid: extrapolate along the only
        // interval, geometrically
        let (below, _) = table.interpolate(100.0, 1.0, 0);
        let (above, _) = table.interpolate(700.0, 1.0, 0);
        assert_relative_eq!(below, 1.0, epsilon = 1e-12);
        assert_relative_eq!(above, 64.0, epsilon = 1e-9);
        // pressure is constant in this table, so pressure clamping is exact
        let (p_out, _) = table.interpolate(300.0, 5.0, 0);
        assert_relative_eq!(p_out, 4.0);
    }

    #[test]
    fn ascii_report_roundtrips_grids() {
        let table = two_by_two(4.0, 16.0);
        let path = std::env::temp_dir().join(format!("radsim-{}-ascii.out", std::process::id()));
        table.write_ascii(&path).expect("write ascii");
        let text = std::fs::read_to_string(&path).expect("read ascii");
        std::fs::remove_file(&path).ok();

        let grid_line = |prefix: &str| -> Vec<f64> {
            text.lines()
                .find(|l| l.starts_with(prefix))
                .expect("grid line present")
                .split('=')
                .nth(1)
                .expect("values after =")
                .split_whitespace()
                .map(|v| v.parse().expect("parseable float"))
                .collect()
        };
        assert_eq!(grid_line("Pressures[atm]"), table.pressures());
        assert_eq!(grid_line("Temperatures[K]"), table.temperatures());
    }
}
