use crate::types::{
    ConservationTier, EnforcementRecord, RawEnforcementRow, RawSupplierRow, RawUsageRow,
    SupplierBaseline, TierHistory, Units, UsageRecord, BASELINE_MONTHS,
};
use crate::util::{parse_bool_safe, parse_date_safe, parse_f64_safe, parse_u64_safe};
use csv::ReaderBuilder;
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("failed to read {}: {}", .path.display(), .source)]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    pub total_rows: usize,
    pub kept_rows: usize,
    pub parse_errors: usize,
}

fn reader_builder() -> ReaderBuilder {
    let mut builder = ReaderBuilder::new();
    builder.flexible(true).trim(csv::Trim::All);
    builder
}

fn open(path: &Path) -> Result<csv::Reader<std::fs::File>, LoadError> {
    reader_builder()
        .from_path(path)
        .map_err(|source| LoadError::Csv {
            path: path.to_path_buf(),
            source,
        })
}

/// Lowercase, hyphen-separated slug for suppliers exported without one.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
    }
    slug.trim_end_matches('-').to_string()
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn residential_share(s: Option<&str>) -> Option<f64> {
    // Some exports store the share as a percentage ("85") rather than 0.85.
    let v = parse_f64_safe(s)?;
    if v < 0.0 {
        return None;
    }
    Some(if v > 1.0 { v / 100.0 } else { v })
}

fn clean_usage_row(row: RawUsageRow) -> Option<UsageRecord> {
    let supplier_name = non_empty(row.supplier_name)?;
    let supplier_slug = non_empty(row.supplier_slug).unwrap_or_else(|| slugify(&supplier_name));
    let reporting_month = parse_date_safe(row.reporting_month.as_deref())?;
    let report_date = parse_date_safe(row.report_date.as_deref())?;
    let total_population_served = parse_u64_safe(row.total_population_served.as_deref())?;
    let percent_residential_use = residential_share(row.percent_residential_use.as_deref())?;

    Some(UsageRecord {
        supplier_name,
        supplier_slug,
        hydrologic_region: non_empty(row.hydrologic_region),
        reporting_month,
        report_date,
        units: Units::from_code(row.units.as_deref().unwrap_or("")),
        total_population_served,
        production_gallons_2014: parse_f64_safe(
            row.calculated_production_monthly_gallons_month_2014.as_deref(),
        ),
        production_gallons_2013: parse_f64_safe(
            row.calculated_production_monthly_gallons_month_2013.as_deref(),
        ),
        percent_residential_use,
        rgpcd_2014: parse_f64_safe(row.calculated_rgpcd_2014.as_deref()),
        rgpcd_2013: parse_f64_safe(row.calculated_rgpcd_2013.as_deref()),
    })
}

fn tier(reduction: Option<&str>, rgpcd: Option<&str>, label: Option<String>) -> ConservationTier {
    ConservationTier {
        conservation_standard: residential_share(reduction),
        conservation_placement: parse_f64_safe(rgpcd),
        conservation_tier: non_empty(label),
        conservation_savings: None,
    }
}

fn clean_supplier_row(row: RawSupplierRow) -> Option<SupplierBaseline> {
    let supplier_name = non_empty(row.supplier_name)?;
    let supplier_slug = non_empty(row.supplier_slug).unwrap_or_else(|| slugify(&supplier_name));
    let baseline_production: [Option<f64>; BASELINE_MONTHS] = [
        row.production_2013_june,
        row.production_2013_july,
        row.production_2013_aug,
        row.production_2013_sept,
        row.production_2013_oct,
        row.production_2013_nov,
        row.production_2013_dec,
        row.production_2013_jan,
        row.production_2013_feb,
    ]
    .map(|v| parse_f64_safe(v.as_deref()));

    let tiers = TierHistory {
        april_7: tier(
            row.april_7_reduction.as_deref(),
            row.april_7_rgpcd.as_deref(),
            row.april_7_tier,
        ),
        april_18: tier(
            row.april_18_reduction.as_deref(),
            row.april_18_rgpcd.as_deref(),
            row.april_18_tier,
        ),
        april_28: tier(
            row.april_28_reduction.as_deref(),
            row.april_28_rgpcd.as_deref(),
            row.april_28_tier,
        ),
        final_tier: ConservationTier {
            conservation_savings: parse_f64_safe(row.june_11_estimated_savings.as_deref()),
            ..tier(
                row.june_11_reduction.as_deref(),
                row.june_11_rgpcd.as_deref(),
                row.june_11_tier.clone(),
            )
        },
    };

    Some(SupplierBaseline {
        supplier_name,
        supplier_slug,
        hydrologic_region: non_empty(row.hydrologic_region),
        active: parse_bool_safe(row.supplier_active.as_deref()).unwrap_or(true),
        reduction_target: residential_share(row.june_11_reduction.as_deref()),
        conservation_tier: non_empty(row.june_11_tier),
        baseline_production,
        tiers,
    })
}

fn count(s: Option<&str>) -> u64 {
    parse_u64_safe(s).unwrap_or(0)
}

fn clean_enforcement_row(row: RawEnforcementRow) -> Option<EnforcementRecord> {
    let supplier_name = non_empty(row.supplier_name)?;
    let supplier_slug = non_empty(row.supplier_slug).unwrap_or_else(|| slugify(&supplier_name));
    Some(EnforcementRecord {
        supplier_name,
        supplier_slug,
        hydrologic_region: non_empty(row.hydrologic_region),
        reporting_month: parse_date_safe(row.reporting_month.as_deref())?,
        complaints_received: count(row.complaints_received.as_deref()),
        follow_up_actions: count(row.follow_up_actions.as_deref()),
        warnings_issued: count(row.warnings_issued.as_deref()),
        penalties_assessed: count(row.penalties_assessed.as_deref()),
    })
}

/// Deserialize monthly usage rows, skipping (and counting) rows that lack a
/// supplier, either date, a population or a residential share.
pub fn read_usage_records<R: Read>(reader: R) -> (Vec<UsageRecord>, LoadReport) {
    let mut rdr = reader_builder().from_reader(reader);
    collect_rows(rdr.deserialize::<RawUsageRow>(), clean_usage_row)
}

pub fn read_suppliers<R: Read>(reader: R) -> (Vec<SupplierBaseline>, LoadReport) {
    let mut rdr = reader_builder().from_reader(reader);
    collect_rows(rdr.deserialize::<RawSupplierRow>(), clean_supplier_row)
}

/// Deserialize monthly enforcement rows; a row needs a supplier and a month.
pub fn read_enforcement<R: Read>(reader: R) -> (Vec<EnforcementRecord>, LoadReport) {
    let mut rdr = reader_builder().from_reader(reader);
    collect_rows(rdr.deserialize::<RawEnforcementRow>(), clean_enforcement_row)
}

fn collect_rows<Raw, T, I, F>(rows: I, clean: F) -> (Vec<T>, LoadReport)
where
    I: Iterator<Item = csv::Result<Raw>>,
    F: Fn(Raw) -> Option<T>,
{
    let mut report = LoadReport::default();
    let mut out = Vec::new();
    for result in rows {
        report.total_rows += 1;
        let row = match result {
            Ok(r) => r,
            Err(e) => {
                tracing::debug!(row = report.total_rows, error = %e, "undecodable csv row");
                report.parse_errors += 1;
                continue;
            }
        };
        match clean(row) {
            Some(record) => out.push(record),
            None => {
                tracing::debug!(row = report.total_rows, "row failed validation");
                report.parse_errors += 1;
            }
        }
    }
    report.kept_rows = out.len();
    (out, report)
}

pub fn load_usage_records(path: &Path) -> Result<(Vec<UsageRecord>, LoadReport), LoadError> {
    let mut rdr = open(path)?;
    let loaded = collect_rows(rdr.deserialize::<RawUsageRow>(), clean_usage_row);
    tracing::info!(
        path = %path.display(),
        rows = loaded.1.total_rows,
        kept = loaded.1.kept_rows,
        "loaded monthly reports"
    );
    Ok(loaded)
}

pub fn load_suppliers(path: &Path) -> Result<(Vec<SupplierBaseline>, LoadReport), LoadError> {
    let mut rdr = open(path)?;
    let loaded = collect_rows(rdr.deserialize::<RawSupplierRow>(), clean_supplier_row);
    tracing::info!(
        path = %path.display(),
        rows = loaded.1.total_rows,
        kept = loaded.1.kept_rows,
        "loaded suppliers"
    );
    Ok(loaded)
}

pub fn load_enforcement(path: &Path) -> Result<(Vec<EnforcementRecord>, LoadReport), LoadError> {
    let mut rdr = open(path)?;
    let loaded = collect_rows(rdr.deserialize::<RawEnforcementRow>(), clean_enforcement_row);
    tracing::info!(
        path = %path.display(),
        rows = loaded.1.total_rows,
        kept = loaded.1.kept_rows,
        "loaded enforcement reports"
    );
    Ok(loaded)
}
