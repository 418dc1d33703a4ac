// Entry point and interactive menu.
//
// - Option [1] loads the monthly reports, the supplier roster and the
//   enforcement export.
// - Option [2] builds the statewide overview, region pages, cumulative
//   savings and the per-region comparisons, writes them out and previews
//   them.
// - Option [3] shows one supplier's page.
use anyhow::{Context, Result};
use cali_water_report::cli::Args;
use cali_water_report::config::DisplayConfig;
use cali_water_report::types::{EnforcementRecord, SupplierBaseline, UsageRecord};
use cali_water_report::{loader, logging, output, reports, util};
use clap::Parser;
use once_cell::sync::Lazy;
use std::io::{self, BufRead, Write};
use std::sync::Mutex;

// Loaded once, reused by every report run in the session.
static APP_STATE: Lazy<Mutex<AppState>> = Lazy::new(|| Mutex::new(AppState::default()));

#[derive(Default)]
struct AppState {
    records: Option<Vec<UsageRecord>>,
    suppliers: Vec<SupplierBaseline>,
    enforcement: Vec<EnforcementRecord>,
}

struct Loaded {
    records: Vec<UsageRecord>,
    suppliers: Vec<SupplierBaseline>,
    enforcement: Vec<EnforcementRecord>,
}

/// Read one trimmed line; `None` once the input is closed or unreadable.
fn read_answer<R: BufRead>(input: &mut R) -> Option<String> {
    let mut buf = String::new();
    match input.read_line(&mut buf) {
        Ok(0) => None,
        Ok(_) => Some(buf.trim().to_string()),
        Err(e) => {
            tracing::warn!(error = %e, "failed to read from stdin");
            None
        }
    }
}

fn prompt(label: &str) -> Option<String> {
    print!("{}", label);
    let _ = io::stdout().flush();
    read_answer(&mut io::stdin().lock())
}

/// Ask whether to return to the menu; `true` for `Y`, `false` for `N` or
/// end of input.
fn prompt_back_to_menu() -> bool {
    loop {
        let Some(answer) = prompt("Back to Report Selection (Y/N): ") else {
            return false;
        };
        match answer.to_uppercase().as_str() {
            "Y" => return true,
            "N" => return false,
            _ => println!("Invalid choice. Please enter Y or N."),
        }
    }
}

fn handle_load(args: &Args) {
    let (records, report) = match loader::load_usage_records(&args.reports) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Failed to load reports: {}\n", e);
            return;
        }
    };
    println!(
        "Processing monthly reports... ({} rows read, {} kept)",
        util::format_int(report.total_rows),
        util::format_int(report.kept_rows)
    );
    if report.parse_errors > 0 {
        println!(
            "Note: {} rows skipped due to parse/validation errors.",
            util::format_int(report.parse_errors)
        );
    }

    let suppliers = match loader::load_suppliers(&args.suppliers) {
        Ok((suppliers, report)) => {
            println!(
                "Supplier roster: {} suppliers ({} rows skipped)",
                util::format_int(report.kept_rows),
                util::format_int(report.parse_errors)
            );
            suppliers
        }
        Err(e) => {
            // Averages still work without a roster; savings will show no data.
            tracing::warn!(error = %e, "continuing without supplier roster");
            println!("Warning: {}. Cumulative savings will be unavailable.", e);
            Vec::new()
        }
    };

    let enforcement = match loader::load_enforcement(&args.enforcement) {
        Ok((enforcement, report)) => {
            println!(
                "Enforcement reports: {} rows ({} skipped)",
                util::format_int(report.kept_rows),
                util::format_int(report.parse_errors)
            );
            enforcement
        }
        Err(e) => {
            tracing::warn!(error = %e, "continuing without enforcement reports");
            println!("Warning: {}. Enforcement comparisons will be empty.", e);
            Vec::new()
        }
    };
    println!();

    let mut state = APP_STATE.lock().unwrap_or_else(|p| p.into_inner());
    state.records = Some(records);
    state.suppliers = suppliers;
    state.enforcement = enforcement;
}

fn loaded_data() -> Option<Loaded> {
    let state = APP_STATE.lock().unwrap_or_else(|p| p.into_inner());
    Some(Loaded {
        records: state.records.clone()?,
        suppliers: state.suppliers.clone(),
        enforcement: state.enforcement.clone(),
    })
}

fn handle_generate_reports(config: &DisplayConfig) -> Result<()> {
    let Some(Loaded {
        records,
        suppliers,
        enforcement,
    }) = loaded_data()
    else {
        println!("Error: No data loaded. Please load the CSV files first (option 1).\n");
        return Ok(());
    };
    let out_dir = &config.output.dir;
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("creating output directory {}", out_dir.display()))?;
    let rows = config.output.preview_rows;

    println!("Generating reports...\n");

    match reports::build_state_overview(&records, &suppliers, config) {
        Ok(overview) => {
            let region_rows = reports::region_rows(&overview.map_data);
            output::write_csv(&out_dir.join("region_summary.csv"), &region_rows)?;
            output::write_json(&out_dir.join("state_overview.json"), &overview)?;
            let title = format!(
                "Residential Gallons Per Capita Per Day by Region, {}",
                overview.target_report.format("%B %Y")
            );
            output::preview_table(
                &title,
                Some("Positions are relative to the statewide min/max"),
                &region_rows,
                rows,
            );
            println!(
                "Statewide average: {} RGPCD (last month: {})\n",
                util::format_number(overview.state_avg_latest, 1),
                overview
                    .state_avg_last
                    .map(|v| util::format_number(v, 1))
                    .unwrap_or_else(|| "n/a".to_string())
            );
        }
        Err(e) => {
            tracing::error!(error = %e, "state overview failed");
            eprintln!("State overview could not be built: {}\n", e);
        }
    }

    let details = reports::build_all_region_details(&records, &suppliers, config);
    let savings_rows = reports::savings_rows(&details);
    output::write_csv(&out_dir.join("supplier_savings.csv"), &savings_rows)?;
    output::write_json(&out_dir.join("region_details.json"), &details)?;
    let window = format!("Window {} to {}", config.savings.start, config.savings.end);
    output::preview_table(
        "Cumulative Savings Against Reduction Targets",
        Some(window.as_str()),
        &savings_rows,
        rows,
    );
    for detail in &details {
        println!(
            "{}: {} achieving, {} narrowly missed, {} failed, {} no data",
            detail.summary.hydrologic_region,
            detail.buckets.achieved_target.len(),
            detail.buckets.missed_target.len(),
            detail.buckets.failed_target.len(),
            detail.buckets.no_data.len()
        );
    }

    let comparisons = reports::build_all_reduction_comparisons(&suppliers);
    output::write_json(&out_dir.join("reduction_comparisons.json"), &comparisons)?;

    let enforcement_pages = reports::build_all_enforcement_comparisons(&enforcement);
    let enforcement_rows = reports::enforcement_rows(&enforcement_pages);
    output::write_csv(&out_dir.join("enforcement_summary.csv"), &enforcement_rows)?;
    output::write_json(&out_dir.join("enforcement_comparisons.json"), &enforcement_pages)?;
    println!();
    output::preview_table(
        "Conservation Enforcement by Supplier",
        None,
        &enforcement_rows,
        rows,
    );

    println!("(Full tables exported to {})\n", out_dir.display());
    Ok(())
}

fn handle_supplier(config: &DisplayConfig) -> Result<()> {
    let Some(Loaded {
        records, suppliers, ..
    }) = loaded_data()
    else {
        println!("Error: No data loaded. Please load the CSV files first (option 1).\n");
        return Ok(());
    };
    let Some(slug) = prompt("Supplier slug: ") else {
        return Ok(());
    };
    match reports::build_supplier_detail(&slug, &records, &suppliers, config) {
        Ok(detail) => {
            println!("\n{}", serde_json::to_string_pretty(&detail)?);
            println!();
        }
        Err(e) => println!("No page for '{}': {}\n", slug, e),
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    let mut config = DisplayConfig::load_or_default(args.config.as_deref())
        .context("loading display configuration")?;
    if let Some(dir) = &args.output_dir {
        config.output.dir = dir.clone();
    }
    logging::init(&config.logging.level, args.verbose).context("initializing logging")?;

    loop {
        println!("Select an option:");
        println!("[1] Load the data files");
        println!("[2] Generate Reports");
        println!("[3] Supplier detail\n");
        let Some(choice) = prompt("Enter choice: ") else {
            println!("\nExiting the program.");
            break;
        };
        match choice.as_str() {
            "1" => handle_load(&args),
            "2" => {
                println!();
                handle_generate_reports(&config)?;
                if !prompt_back_to_menu() {
                    println!("Exiting the program.");
                    break;
                }
            }
            "3" => handle_supplier(&config)?,
            _ => println!("Invalid choice. Please enter 1, 2 or 3.\n"),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn answers_are_trimmed_until_input_closes() {
        let mut input = io::Cursor::new("  2 \nY\n");
        assert_eq!(read_answer(&mut input).as_deref(), Some("2"));
        assert_eq!(read_answer(&mut input).as_deref(), Some("Y"));
        assert_eq!(read_answer(&mut input), None);
        assert_eq!(read_answer(&mut input), None);
    }

    #[test]
    fn blank_line_is_not_end_of_input() {
        let mut input = io::Cursor::new("\n");
        assert_eq!(read_answer(&mut input).as_deref(), Some(""));
        assert_eq!(read_answer(&mut input), None);
    }
}
