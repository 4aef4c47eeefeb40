//! Command-line interface definitions and argument parsing

use clap::Parser;
use std::path::PathBuf;

use crate::cluster::DEFAULT_CUT_HEIGHT_KM;
use crate::grouping::RepresentativePolicy;

/// Generate summary statistics and map-ready location clusters from parsed orders
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the CSV file with parsed, geocoded orders
    pub orders: String,

    /// Directory to write the summary tables to
    pub output_dir: PathBuf,

    /// Height (km) at which the location merge tree is cut; smaller values
    /// produce more, smaller clusters
    #[arg(long, default_value_t = DEFAULT_CUT_HEIGHT_KM)]
    pub height: f64,

    /// How to pick the representative zip/city/country when several orders
    /// share the exact same coordinates
    #[arg(long, value_enum, default_value = "first-seen")]
    pub representative: RepresentativePolicy,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Reject parameter values the pipeline cannot work with.
    pub fn validate(&self) -> crate::Result<()> {
        if !self.height.is_finite() || self.height < 0.0 {
            anyhow::bail!("--height must be a non-negative number of kilometers");
        }
        Ok(())
    }
}
