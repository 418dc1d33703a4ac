use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tabled::Tabled;

/// One row of the monthly supplier report export, before validation.
#[derive(Debug, Deserialize)]
pub struct RawUsageRow {
    pub supplier_name: Option<String>,
    pub supplier_slug: Option<String>,
    pub hydrologic_region: Option<String>,
    pub reporting_month: Option<String>,
    pub report_date: Option<String>,
    pub units: Option<String>,
    pub total_population_served: Option<String>,
    pub calculated_production_monthly_gallons_month_2014: Option<String>,
    pub calculated_production_monthly_gallons_month_2013: Option<String>,
    pub percent_residential_use: Option<String>,
    pub calculated_rgpcd_2014: Option<String>,
    pub calculated_rgpcd_2013: Option<String>,
}

/// One row of the supplier roster with its baseline production figures.
#[derive(Debug, Deserialize)]
pub struct RawSupplierRow {
    pub supplier_name: Option<String>,
    pub supplier_slug: Option<String>,
    pub hydrologic_region: Option<String>,
    pub supplier_active: Option<String>,
    pub april_7_reduction: Option<String>,
    pub april_7_rgpcd: Option<String>,
    pub april_7_tier: Option<String>,
    pub april_18_reduction: Option<String>,
    pub april_18_rgpcd: Option<String>,
    pub april_18_tier: Option<String>,
    pub april_28_reduction: Option<String>,
    pub april_28_rgpcd: Option<String>,
    pub april_28_tier: Option<String>,
    pub june_11_reduction: Option<String>,
    pub june_11_rgpcd: Option<String>,
    pub june_11_tier: Option<String>,
    pub june_11_estimated_savings: Option<String>,
    pub production_2013_june: Option<String>,
    pub production_2013_july: Option<String>,
    pub production_2013_aug: Option<String>,
    pub production_2013_sept: Option<String>,
    pub production_2013_oct: Option<String>,
    pub production_2013_nov: Option<String>,
    pub production_2013_dec: Option<String>,
    pub production_2013_jan: Option<String>,
    pub production_2013_feb: Option<String>,
}

/// One row of the monthly enforcement export, before validation.
#[derive(Debug, Deserialize)]
pub struct RawEnforcementRow {
    pub supplier_name: Option<String>,
    pub supplier_slug: Option<String>,
    pub hydrologic_region: Option<String>,
    pub reporting_month: Option<String>,
    pub complaints_received: Option<String>,
    pub follow_up_actions: Option<String>,
    pub warnings_issued: Option<String>,
    pub penalties_assessed: Option<String>,
}

/// Unit code a supplier reported its production in.
///
/// Production figures are already normalized to gallons upstream, so the
/// code is carried for display only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Units {
    Gallons,
    MillionGallons,
    HundredCubicFeet,
    AcreFeet,
    Other(String),
}

impl Units {
    pub fn from_code(code: &str) -> Self {
        match code.trim().to_ascii_uppercase().as_str() {
            "G" => Units::Gallons,
            "MG" => Units::MillionGallons,
            "CCF" => Units::HundredCubicFeet,
            "AF" => Units::AcreFeet,
            other => Units::Other(other.to_string()),
        }
    }

    pub fn code(&self) -> &str {
        match self {
            Units::Gallons => "G",
            Units::MillionGallons => "MG",
            Units::HundredCubicFeet => "CCF",
            Units::AcreFeet => "AF",
            Units::Other(code) => code,
        }
    }
}

/// Which production column an average is computed against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductionPeriod {
    /// The reported month itself (`..._2014` columns).
    Current,
    /// The same month one year earlier (`..._2013` columns).
    PriorYear,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UsageRecord {
    pub supplier_name: String,
    pub supplier_slug: String,
    pub hydrologic_region: Option<String>,
    pub reporting_month: NaiveDate,
    pub report_date: NaiveDate,
    pub units: Units,
    pub total_population_served: u64,
    pub production_gallons_2014: Option<f64>,
    pub production_gallons_2013: Option<f64>,
    pub percent_residential_use: f64,
    pub rgpcd_2014: Option<f64>,
    pub rgpcd_2013: Option<f64>,
}

impl UsageRecord {
    pub fn production(&self, period: ProductionPeriod) -> Option<f64> {
        match period {
            ProductionPeriod::Current => self.production_gallons_2014,
            ProductionPeriod::PriorYear => self.production_gallons_2013,
        }
    }

    pub fn in_region(&self, region: &str) -> bool {
        self.hydrologic_region.as_deref() == Some(region)
    }
}

/// Conservation actions a supplier reported for one month. Blank counts
/// are read as zero.
#[derive(Debug, Clone, PartialEq)]
pub struct EnforcementRecord {
    pub supplier_name: String,
    pub supplier_slug: String,
    pub hydrologic_region: Option<String>,
    pub reporting_month: NaiveDate,
    pub complaints_received: u64,
    pub follow_up_actions: u64,
    pub warnings_issued: u64,
    pub penalties_assessed: u64,
}

impl EnforcementRecord {
    pub fn in_region(&self, region: &str) -> bool {
        self.hydrologic_region.as_deref() == Some(region)
    }
}

/// Number of months in the June-February baseline window.
pub const BASELINE_MONTHS: usize = 9;

#[derive(Debug, Clone, PartialEq)]
pub struct SupplierBaseline {
    pub supplier_name: String,
    pub supplier_slug: String,
    pub hydrologic_region: Option<String>,
    pub active: bool,
    /// Mandated reduction as a fraction, e.g. `0.25`.
    pub reduction_target: Option<f64>,
    pub conservation_tier: Option<String>,
    /// Production for June 2013 through February 2014, in that order.
    pub baseline_production: [Option<f64>; BASELINE_MONTHS],
    pub tiers: TierHistory,
}

/// A supplier's placement in one round of the reduction-tier drafts.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConservationTier {
    /// Reduction as a fraction.
    pub conservation_standard: Option<f64>,
    /// The RGPCD figure the placement was based on.
    pub conservation_placement: Option<f64>,
    pub conservation_tier: Option<String>,
    /// Estimated gallons saved; only published with the final tiers.
    pub conservation_savings: Option<f64>,
}

/// The April 7, 18 and 28 drafts and the June 11 final placement.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TierHistory {
    pub april_7: ConservationTier,
    pub april_18: ConservationTier,
    pub april_28: ConservationTier,
    pub final_tier: ConservationTier,
}

/// Direction of cumulative usage against the baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageTrend {
    Decreased,
    Increased,
    Flat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SavingsStatus {
    Achieving,
    NarrowlyMissed,
    FailedToMeet,
    IncreasedConsumption,
    RemainedFlat,
}

impl SavingsStatus {
    pub fn label(&self) -> &'static str {
        match self {
            SavingsStatus::Achieving => "achieving",
            SavingsStatus::NarrowlyMissed => "narrowly missed",
            SavingsStatus::FailedToMeet => "failed to meet",
            SavingsStatus::IncreasedConsumption => "increased consumption",
            SavingsStatus::RemainedFlat => "remained flat",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, SavingsStatus::Achieving)
    }

    pub fn color(&self) -> &'static str {
        match self {
            SavingsStatus::Achieving => "green",
            SavingsStatus::NarrowlyMissed => "#8F8F00",
            _ => "red",
        }
    }

    pub fn glyph(&self) -> char {
        match self {
            SavingsStatus::Achieving => '\u{2714}',
            SavingsStatus::NarrowlyMissed => '\u{2794}',
            _ => '\u{2718}',
        }
    }

    /// Inline markup used by the page templates.
    pub fn html(&self) -> String {
        format!(
            "<span style='color: {};'>&#x{:X};</span>",
            self.color(),
            self.glyph() as u32
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CumulativeSavings {
    pub supplier_slug: String,
    pub cum_baseline: f64,
    pub cum_current: f64,
    pub cum_percent_change: f64,
    pub trend: UsageTrend,
    /// Percentage points saved; `0` unless usage decreased.
    pub cum_savings: f64,
    /// Percentage points of growth, present only when usage increased.
    pub cum_increase: Option<f64>,
    pub percent_of_target: f64,
    pub points_within_target: f64,
    pub reduction_target: f64,
    pub reduction_target_as_str: String,
    pub status: SavingsStatus,
    pub cum_success: bool,
    pub cum_output: &'static str,
    pub cum_html: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SupplierDistribution {
    pub supplier_name: String,
    pub supplier_slug: String,
    pub rgpcd_2014: f64,
    pub distribution_percent: f64,
}

/// Aggregated RGPCD statistics for one region over one reporting month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionSummary {
    pub hydrologic_region: String,
    pub reporting_month: NaiveDate,
    pub this_month_avg: f64,
    pub this_month_baseline_avg: f64,
    pub last_month_avg: Option<f64>,
    pub count: usize,
    pub this_min: f64,
    pub this_max: f64,
    pub median: f64,
    pub min_range: f64,
    pub max_range: f64,
    pub median_range: f64,
    pub average_range: f64,
    pub suppliers: Vec<SupplierDistribution>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TargetBuckets {
    pub achieved_target: Vec<String>,
    pub missed_target: Vec<String>,
    pub failed_target: Vec<String>,
    pub no_data: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SupplierSavings {
    pub supplier_name: String,
    pub supplier_slug: String,
    pub cumulative: Option<CumulativeSavings>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegionDetail {
    pub summary: RegionSummary,
    pub savings: Vec<SupplierSavings>,
    pub buckets: TargetBuckets,
}

#[derive(Debug, Clone, Serialize)]
pub struct StateOverview {
    pub article_content: serde_json::Value,
    pub about_content: serde_json::Value,
    pub config_object: serde_json::Value,
    pub target_report: NaiveDate,
    pub global_min: f64,
    pub global_max: f64,
    pub state_avg_latest: f64,
    pub state_avg_last: Option<f64>,
    pub map_data: Vec<RegionSummary>,
}

/// Month-by-month series for one supplier's chart plus its standing.
#[derive(Debug, Clone, Serialize)]
pub struct SupplierDetail {
    pub supplier_name: String,
    pub supplier_slug: String,
    pub target_report: NaiveDate,
    pub latest_state_avg: f64,
    pub labels: Vec<String>,
    pub data_2014: Vec<Option<f64>>,
    pub data_2013: Vec<Option<f64>>,
    /// Unit code of the latest filing.
    pub units: String,
    pub conservation_standard: Option<f64>,
    pub conservation_tier: Option<String>,
    pub tiers: Option<TierHistory>,
    pub cumulative: Option<CumulativeSavings>,
}

/// One supplier on a region's reduction comparison page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonEntry {
    pub supplier_name: String,
    pub supplier_slug: String,
    pub reduction_target: Option<f64>,
    pub conservation_tier: Option<String>,
    pub estimated_savings: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegionComparison {
    pub hydrologic_region: String,
    pub suppliers: Vec<ComparisonEntry>,
}

/// Enforcement totals for one supplier across every month on file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnforcementSummary {
    pub supplier_name: String,
    pub hydrologic_region: String,
    pub sum_complaints_received: u64,
    pub sum_follow_up_actions: u64,
    pub sum_warnings_issued: u64,
    pub sum_penalties_assessed: u64,
    pub reporting_month_min: NaiveDate,
    pub reporting_month_max: NaiveDate,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegionEnforcement {
    pub hydrologic_region: String,
    pub suppliers: Vec<EnforcementSummary>,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct RegionSummaryRow {
    #[serde(rename = "Region")]
    #[tabled(rename = "Region")]
    pub region: String,
    #[serde(rename = "Suppliers")]
    #[tabled(rename = "Suppliers")]
    pub count: usize,
    #[serde(rename = "AvgRGPCD")]
    #[tabled(rename = "AvgRGPCD")]
    pub this_month_avg: String,
    #[serde(rename = "YearAgoRGPCD")]
    #[tabled(rename = "YearAgoRGPCD")]
    pub baseline_avg: String,
    #[serde(rename = "LastMonthRGPCD")]
    #[tabled(rename = "LastMonthRGPCD")]
    pub last_month_avg: String,
    #[serde(rename = "Min")]
    #[tabled(rename = "Min")]
    pub min: String,
    #[serde(rename = "Median")]
    #[tabled(rename = "Median")]
    pub median: String,
    #[serde(rename = "Max")]
    #[tabled(rename = "Max")]
    pub max: String,
    #[serde(rename = "AvgPosition")]
    #[tabled(rename = "AvgPosition")]
    pub average_range: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct SupplierSavingsRow {
    #[serde(rename = "Region")]
    #[tabled(rename = "Region")]
    pub region: String,
    #[serde(rename = "Supplier")]
    #[tabled(rename = "Supplier")]
    pub supplier: String,
    #[serde(rename = "BaselineGallons")]
    #[tabled(rename = "BaselineGallons")]
    pub cum_baseline: String,
    #[serde(rename = "CurrentGallons")]
    #[tabled(rename = "CurrentGallons")]
    pub cum_current: String,
    #[serde(rename = "AllowedGallons")]
    #[tabled(rename = "AllowedGallons")]
    pub allowed_production: String,
    #[serde(rename = "PctChange")]
    #[tabled(rename = "PctChange")]
    pub percent_change: String,
    #[serde(rename = "Target")]
    #[tabled(rename = "Target")]
    pub target: String,
    #[serde(rename = "PctOfTarget")]
    #[tabled(rename = "PctOfTarget")]
    pub percent_of_target: String,
    #[serde(rename = "Status")]
    #[tabled(rename = "Status")]
    pub status: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct EnforcementRow {
    #[serde(rename = "Region")]
    #[tabled(rename = "Region")]
    pub region: String,
    #[serde(rename = "Supplier")]
    #[tabled(rename = "Supplier")]
    pub supplier: String,
    #[serde(rename = "Complaints")]
    #[tabled(rename = "Complaints")]
    pub complaints: String,
    #[serde(rename = "FollowUps")]
    #[tabled(rename = "FollowUps")]
    pub follow_ups: String,
    #[serde(rename = "Warnings")]
    #[tabled(rename = "Warnings")]
    pub warnings: String,
    #[serde(rename = "Penalties")]
    #[tabled(rename = "Penalties")]
    pub penalties: String,
    #[serde(rename = "FirstMonth")]
    #[tabled(rename = "FirstMonth")]
    pub first_month: String,
    #[serde(rename = "LastMonth")]
    #[tabled(rename = "LastMonth")]
    pub last_month: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_codes_are_case_insensitive() {
        assert_eq!(Units::from_code("ccf"), Units::HundredCubicFeet);
        assert_eq!(Units::from_code(" mg "), Units::MillionGallons);
        assert_eq!(Units::from_code("gpcd"), Units::Other("GPCD".to_string()));
        assert_eq!(Units::from_code("af").code(), "AF");
    }

    #[test]
    fn status_presentation() {
        assert!(SavingsStatus::Achieving.is_success());
        assert!(!SavingsStatus::NarrowlyMissed.is_success());
        assert_eq!(
            SavingsStatus::Achieving.html(),
            "<span style='color: green;'>&#x2714;</span>"
        );
        assert_eq!(SavingsStatus::NarrowlyMissed.glyph(), '\u{2794}');
        assert_eq!(SavingsStatus::RemainedFlat.color(), "red");
    }
}
