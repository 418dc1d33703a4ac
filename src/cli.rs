//! Command-line arguments.

use clap::Parser;
use std::path::PathBuf;

/// Water conservation reports for California urban water suppliers.
///
/// Loads the monthly supplier reports and the supplier roster, then builds
/// the statewide overview, per-region pages and cumulative savings tables.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Monthly supplier report export
    #[arg(long, default_value = "monthly_reports.csv", value_name = "FILE", env = "WATER_REPORTS_CSV")]
    pub reports: PathBuf,

    /// Supplier roster with baseline production and reduction targets
    #[arg(long, default_value = "suppliers.csv", value_name = "FILE", env = "WATER_SUPPLIERS_CSV")]
    pub suppliers: PathBuf,

    /// Monthly enforcement export (complaints, warnings, penalties)
    #[arg(long, default_value = "enforcement.csv", value_name = "FILE", env = "WATER_ENFORCEMENT_CSV")]
    pub enforcement: PathBuf,

    /// Display configuration file
    ///
    /// If not specified, looks for display_config.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Directory for generated report files (overrides the config file)
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_working_directory() {
        let args = Args::parse_from(["cali_water_report"]);
        assert_eq!(args.reports, PathBuf::from("monthly_reports.csv"));
        assert_eq!(args.suppliers, PathBuf::from("suppliers.csv"));
        assert_eq!(args.enforcement, PathBuf::from("enforcement.csv"));
        assert!(args.config.is_none());
        assert!(!args.verbose);
    }

    #[test]
    fn accepts_overrides() {
        let args = Args::parse_from([
            "cali_water_report",
            "--reports",
            "data/reports.csv",
            "-c",
            "display.toml",
            "-o",
            "site",
            "-v",
        ]);
        assert_eq!(args.reports, PathBuf::from("data/reports.csv"));
        assert_eq!(args.config, Some(PathBuf::from("display.toml")));
        assert_eq!(args.output_dir, Some(PathBuf::from("site")));
        assert!(args.verbose);
    }
}
