//! One-shot light curve query from the command line.
//!
//! ```bash
//! LIGHTFIRST_SOURCES=atlas,asas-sn ATLAS_USERNAME=user ATLAS_PASSWORD=pass \
//!   cargo run --bin lightfirst-query --features cli -- \
//!   --ra 244.00092 --dec 22.26803 --date-min 2018-06-04 --date-max 2018-06-29
//! ```
//!
//! The merged table is written as CSV (one file, `source` prepended to the
//! six schema columns) to `--output` or stdout.

use std::fs::File;
use std::io::{self, BufWriter};
use std::path::PathBuf;

use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use lightfirst::config::SessionConfig;
use lightfirst::services::{write_results_csv, QueryResults, Session};

#[derive(Parser, Debug)]
#[command(name = "lightfirst-query")]
#[command(about = "Retrieve light curves from ATLAS, ASAS-SN and ZTF")]
#[command(version)]
struct Args {
    /// Right ascension in decimal degrees
    #[arg(long, allow_negative_numbers = true)]
    ra: f64,

    /// Declination in decimal degrees
    #[arg(long, allow_negative_numbers = true)]
    dec: f64,

    /// Earliest observation date (YYYY-MM-DD)
    #[arg(long)]
    date_min: String,

    /// Latest observation date (YYYY-MM-DD)
    #[arg(long)]
    date_max: String,

    /// TOML configuration file (default: lightfirst.toml, then environment)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// CSV output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// PNG plot of the merged light curve
    #[cfg(feature = "plot")]
    #[arg(long)]
    plot: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<SessionConfig> {
    Ok(match path {
        Some(path) => SessionConfig::from_file(path)?,
        None => match SessionConfig::from_default_location() {
            Ok(config) => config,
            Err(_) => SessionConfig::from_env()?,
        },
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Logs go to stderr so CSV on stdout stays clean
    FmtSubscriber::builder()
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::INFO })
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(args.config.as_ref())?;
    let session = Session::new(&config)?;
    let results = session
        .query_all(args.ra, args.dec, &args.date_min, &args.date_max)
        .await?;

    for (source, table) in &results {
        info!("{}: {} observations", source, table.len());
    }

    match &args.output {
        Some(path) => {
            write_results_csv(&results, BufWriter::new(File::create(path)?))?;
            info!("Light curve written to {}", path.display());
        }
        None => write_results_csv(&results, io::stdout().lock())?,
    }

    write_plot(&args, &results)?;

    Ok(())
}

#[cfg(feature = "plot")]
fn write_plot(args: &Args, results: &QueryResults) -> anyhow::Result<()> {
    if let Some(path) = &args.plot {
        let plot_config = lightfirst::plot::PlotConfig {
            title: format!("ra={} dec={}", args.ra, args.dec),
            ..Default::default()
        };
        lightfirst::plot::plot_results(results, path, &plot_config)
            .map_err(|e| anyhow::anyhow!("Failed to plot light curve: {}", e))?;
        info!("Plot saved to {}", path.display());
    }
    Ok(())
}

#[cfg(not(feature = "plot"))]
fn write_plot(_args: &Args, _results: &QueryResults) -> anyhow::Result<()> {
    Ok(())
}
