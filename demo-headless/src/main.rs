use clap::{Parser, ValueEnum};
use rad_sim_core::{
    IterationOrder, Mesh, OpacityMode, OpacityTable, RadiationError, RadiationSolver, Scheme,
    SolverConfig,
};
use std::path::PathBuf;

/// Radiative transport demo on a structured box mesh
#[derive(Parser, Debug)]
#[command(name = "rad-sim-demo")]
#[command(about = "Discrete-ordinates radiation solve on a box mesh", long_about = None)]
struct Args {
    /// Cells per axis
    #[arg(short = 'n', long, default_value_t = 20)]
    cells: usize,

    /// Domain edge length in meters
    #[arg(short, long, default_value_t = 3.0)]
    extent: f64,

    /// Number of discrete ordinates (8, 24, 48 or 80)
    #[arg(short, long, default_value_t = 8)]
    directions: usize,

    /// Intensity balance scheme
    #[arg(short, long, value_enum, default_value_t = SchemeArg::Exponential)]
    scheme: SchemeArg,

    /// Interpolate opacities lazily per visited cell instead of per bin
    #[arg(long)]
    per_cell: bool,

    /// Binary opacity table; a synthetic table is generated when omitted
    #[arg(short, long)]
    table: Option<PathBuf>,

    /// Spectral bins of the synthetic table
    #[arg(short, long, default_value_t = 4)]
    bins: usize,

    /// Constant pressure in Pa for the radial temperature profile
    #[arg(short, long, default_value_t = 101_325.0)]
    pressure: f64,

    /// Write the shell-averaged radial profile (radialData.plt)
    #[arg(long)]
    radial: bool,

    /// Radial shells for the profile report
    #[arg(long, default_value_t = 100)]
    shells: usize,

    /// Total workers the (bin, direction) space is split across
    #[arg(long, default_value_t = 1)]
    workers: usize,

    /// Index of this worker
    #[arg(long, default_value_t = 0)]
    worker_id: usize,

    /// Iterate direction-major instead of bin-major
    #[arg(long)]
    dir_major: bool,

    /// Set up everything but skip the transport passes
    #[arg(long)]
    dry_run: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SchemeArg {
    Exponential,
    FiniteVolume,
}

impl From<SchemeArg> for Scheme {
    fn from(arg: SchemeArg) -> Self {
        match arg {
            SchemeArg::Exponential => Scheme::Exponential,
            SchemeArg::FiniteVolume => Scheme::FiniteVolume,
        }
    }
}

/// Synthetic air-plasma-like table: absorption grows with temperature and
/// bin index, the source ratio rises steeply with temperature.
fn synthetic_table(n_bins: usize) -> OpacityTable {
    let pressures: Vec<f64> = vec![0.1, 1.0, 10.0];
    let temperatures = vec![300.0, 2000.0, 6000.0, 10000.0, 14000.0];
    let mut values = Vec::new();
    for ib in 0..n_bins {
        for &p in &pressures {
            for &t in &temperatures {
                let val1 = 0.05 * (ib + 1) as f64 * (t / 10_000.0) * p.sqrt();
                let val2 = val1 * (t / 10_000.0).powi(4) * 50.0;
                values.push((val1, val2));
            }
        }
    }
    OpacityTable::from_parts(pressures, temperatures, n_bins, &values)
}

fn main() -> Result<(), RadiationError> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
    let args = Args::parse();

    println!("=== Radiation Solve Demo ===\n");

    let mesh = Mesh::box_grid(
        args.cells,
        args.cells,
        args.cells,
        args.extent,
        args.extent,
        args.extent,
    );
    println!(
        "Mesh: {0}x{0}x{0} cells over a {1:.2} m box ({2} cells)",
        args.cells,
        args.extent,
        mesh.n_cells()
    );

    let mut config = SolverConfig {
        n_directions: args.directions,
        scheme: args.scheme.into(),
        opacity_mode: if args.per_cell {
            OpacityMode::PerCell
        } else {
            OpacityMode::WholeField
        },
        constant_pressure: Some(args.pressure),
        radial_data: args.radial,
        n_radial_points: args.shells,
        n_workers: args.workers,
        worker_id: args.worker_id,
        order: if args.dir_major {
            IterationOrder::DirMajor
        } else {
            IterationOrder::BinMajor
        },
        write_table_ascii: false,
        dry_run: args.dry_run,
        ..SolverConfig::default()
    };

    let mut solver = match &args.table {
        Some(path) => {
            let dir = path.parent().unwrap_or_else(|| std::path::Path::new("."));
            config.table_dir = dir.to_path_buf();
            config.table_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .ok_or_else(|| {
                    RadiationError::Config(format!("'{}' is not a file path", path.display()))
                })?;
            println!("Opacity table: {}", path.display());
            RadiationSolver::new(config, mesh, None)?
        }
        None => {
            println!("Opacity table: synthetic, {} bins", args.bins);
            RadiationSolver::with_table(config, mesh, None, synthetic_table(args.bins))?
        }
    };

    println!(
        "Solve: {} bins x {} directions, {:?} scheme, worker {}/{}\n",
        solver.n_bins(),
        solver.n_directions(),
        solver.config().scheme,
        args.worker_id,
        args.workers
    );

    solver.execute()?;

    let fields = solver.fields();
    let (mut divq_min, mut divq_max) = (f64::INFINITY, f64::NEG_INFINITY);
    let mut q_max = 0.0f64;
    for cell in 0..fields.n_cells() {
        divq_min = divq_min.min(fields.divq[cell]);
        divq_max = divq_max.max(fields.divq[cell]);
        q_max = q_max.max(fields.flux(cell).norm());
    }
    println!("divQ range: [{divq_min:.6e}, {divq_max:.6e}] W/m^3");
    println!("max |q|:    {q_max:.6e} W/m^2");
    if args.radial {
        println!(
            "Radial profile written to {}",
            solver.config().table_dir.join("radialData.plt").display()
        );
    }
    Ok(())
}
