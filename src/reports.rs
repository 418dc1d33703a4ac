// Page-level report assembly.
//
// Each builder scopes the loaded records the way one published page does
// (whole state, one region, one supplier) and runs the `stats` aggregations
// over that scope. Failures stay local to the page that hit them.
use crate::config::DisplayConfig;
use crate::error::{ReportError, Result};
use crate::stats::{
    average_rgpcd, bucket_by_target, cumulative_savings, min_max, months_in_filing,
    normalized_range_position, production_threshold, select_all_months_of_latest_filing,
    select_latest_filing, skewed_median,
};
use crate::types::{
    ComparisonEntry, EnforcementRecord, EnforcementRow, EnforcementSummary, ProductionPeriod,
    RegionComparison, RegionDetail, RegionEnforcement, RegionSummary, RegionSummaryRow,
    StateOverview, SupplierBaseline, SupplierDetail, SupplierDistribution, SupplierSavings,
    SupplierSavingsRow, UsageRecord,
};
use crate::util::{format_int, format_number};
use chrono::NaiveDate;
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap, HashSet};

/// Range positions drive a colour scale; a dataset where every supplier
/// reports the same RGPCD puts everything at the cold end.
fn position_or_zero(value: f64, min_value: f64, max_value: f64) -> f64 {
    match normalized_range_position(value, min_value, max_value) {
        Ok(p) => p,
        Err(e) => {
            tracing::debug!(%e, "degenerate range, using 0");
            0.0
        }
    }
}

fn rgpcd_values(records: &[&UsageRecord]) -> Vec<f64> {
    records.iter().filter_map(|r| r.rgpcd_2014).collect()
}

fn in_month<'a>(records: &[&'a UsageRecord], month: NaiveDate) -> Vec<&'a UsageRecord> {
    records
        .iter()
        .copied()
        .filter(|r| r.reporting_month == month)
        .collect()
}

fn in_region<'a>(records: &[&'a UsageRecord], region: &str) -> Vec<&'a UsageRecord> {
    records.iter().copied().filter(|r| r.in_region(region)).collect()
}

/// Min and max RGPCD over the latest month; the scale every position on a
/// page is measured against.
fn global_range(latest: &[&UsageRecord]) -> Result<(f64, f64)> {
    min_max(&rgpcd_values(latest)).ok_or(ReportError::EmptyInput {
        context: "the statewide RGPCD range",
    })
}

/// Hydrologic regions with at least one active supplier, or, without a
/// roster, every region present in the reports.
fn active_regions(records: &[UsageRecord], suppliers: &[SupplierBaseline]) -> Vec<String> {
    let regions: BTreeSet<String> = if suppliers.is_empty() {
        records
            .iter()
            .filter_map(|r| r.hydrologic_region.clone())
            .collect()
    } else {
        suppliers
            .iter()
            .filter(|s| s.active)
            .filter_map(|s| s.hydrologic_region.clone())
            .collect()
    };
    regions.into_iter().collect()
}

/// Average RGPCD for `month` within `scope`, or `None` when the filing has
/// no rows for that month.
fn month_average(
    scope: &[&UsageRecord],
    month: Option<NaiveDate>,
    period: ProductionPeriod,
) -> Result<Option<f64>> {
    let Some(month) = month else {
        return Ok(None);
    };
    let rows = in_month(scope, month);
    if rows.is_empty() {
        return Ok(None);
    }
    average_rgpcd(&rows, period).map(Some)
}

/// Summarize one region against the page-wide `(min, max)` scale.
///
/// `all_months` and `latest` are the already-selected filing rows for the
/// page scope; `months` lists that filing's months newest first.
pub fn summarize_region(
    region: &str,
    all_months: &[&UsageRecord],
    latest: &[&UsageRecord],
    months: &[NaiveDate],
    scale: (f64, f64),
) -> Result<RegionSummary> {
    let (global_min, global_max) = scale;
    let reporting_month = *months.first().ok_or(ReportError::EmptyInput {
        context: "a region summary",
    })?;

    let region_months = in_region(all_months, region);
    let this_month = in_month(&region_months, reporting_month);
    let this_month_avg = average_rgpcd(&this_month, ProductionPeriod::Current)?;
    let this_month_baseline_avg = average_rgpcd(&this_month, ProductionPeriod::PriorYear)?;
    let last_month_avg = month_average(
        &region_months,
        months.get(1).copied(),
        ProductionPeriod::Current,
    )?;

    let region_latest = in_region(latest, region);
    let values = rgpcd_values(&region_latest);
    let (this_min, this_max) = min_max(&values).ok_or(ReportError::EmptyInput {
        context: "a region RGPCD range",
    })?;
    let median = skewed_median(&values).ok_or(ReportError::EmptyInput {
        context: "a region median",
    })?;

    let mut suppliers: Vec<SupplierDistribution> = region_latest
        .iter()
        .filter_map(|r| {
            r.rgpcd_2014.map(|rgpcd| SupplierDistribution {
                supplier_name: r.supplier_name.clone(),
                supplier_slug: r.supplier_slug.clone(),
                rgpcd_2014: rgpcd,
                distribution_percent: position_or_zero(rgpcd, global_min, global_max),
            })
        })
        .collect();
    suppliers.sort_by(|a, b| {
        a.rgpcd_2014
            .partial_cmp(&b.rgpcd_2014)
            .unwrap_or(Ordering::Equal)
    });

    Ok(RegionSummary {
        hydrologic_region: region.to_string(),
        reporting_month,
        this_month_avg,
        this_month_baseline_avg,
        last_month_avg,
        count: region_latest.len(),
        this_min,
        this_max,
        median,
        min_range: position_or_zero(this_min, global_min, global_max),
        max_range: position_or_zero(this_max, global_min, global_max),
        median_range: position_or_zero(median, global_min, global_max),
        average_range: position_or_zero(this_month_avg, global_min, global_max),
        suppliers,
    })
}

/// The statewide landing page: one summary per region plus state averages.
pub fn build_state_overview(
    records: &[UsageRecord],
    suppliers: &[SupplierBaseline],
    config: &DisplayConfig,
) -> Result<StateOverview> {
    let latest = select_latest_filing(records)?;
    let all_months = select_all_months_of_latest_filing(records)?;
    let months = months_in_filing(&all_months);
    let (global_min, global_max) = global_range(&latest)?;
    let target_report = *months.first().ok_or(ReportError::EmptyInput {
        context: "the state overview",
    })?;

    let mut map_data = Vec::new();
    for region in active_regions(records, suppliers) {
        match summarize_region(
            &region,
            &all_months,
            &latest,
            &months,
            (global_min, global_max),
        ) {
            Ok(summary) => map_data.push(summary),
            Err(e) => tracing::warn!(region = %region, error = %e, "skipping region summary"),
        }
    }

    let state_avg_latest =
        average_rgpcd(&in_month(&all_months, target_report), ProductionPeriod::Current)?;
    let state_avg_last =
        month_average(&all_months, months.get(1).copied(), ProductionPeriod::Current)?;

    tracing::info!(
        month = %target_report,
        regions = map_data.len(),
        state_avg = state_avg_latest,
        "built state overview"
    );

    Ok(StateOverview {
        article_content: config.article_content.clone(),
        about_content: config.about_content.clone(),
        config_object: config.config_object.clone(),
        target_report,
        global_min,
        global_max,
        state_avg_latest,
        state_avg_last,
        map_data,
    })
}

fn find_supplier<'a>(suppliers: &'a [SupplierBaseline], slug: &str) -> Option<&'a SupplierBaseline> {
    suppliers.iter().find(|s| s.supplier_slug == slug)
}

/// Production figures for `slug` inside the configured savings window.
fn window_usage(all_months: &[&UsageRecord], slug: &str, config: &DisplayConfig) -> Vec<f64> {
    all_months
        .iter()
        .filter(|r| r.supplier_slug == slug && config.savings.contains(r.reporting_month))
        .filter_map(|r| r.production_gallons_2014)
        .collect()
}

fn supplier_savings(
    supplier_name: &str,
    slug: &str,
    all_months: &[&UsageRecord],
    suppliers: &[SupplierBaseline],
    config: &DisplayConfig,
) -> SupplierSavings {
    let cumulative = match find_supplier(suppliers, slug) {
        Some(SupplierBaseline {
            reduction_target: Some(target),
            baseline_production,
            ..
        }) => cumulative_savings(
            &window_usage(all_months, slug, config),
            baseline_production,
            *target,
            slug,
        ),
        Some(_) => {
            tracing::debug!(supplier = slug, "no reduction target on file");
            None
        }
        None => {
            tracing::debug!(supplier = slug, "supplier missing from roster");
            None
        }
    };
    SupplierSavings {
        supplier_name: supplier_name.to_string(),
        supplier_slug: slug.to_string(),
        cumulative,
    }
}

/// A region page: summary scaled to the region's own range, plus each
/// supplier's cumulative savings and the target buckets.
pub fn build_region_detail(
    region: &str,
    records: &[UsageRecord],
    suppliers: &[SupplierBaseline],
    config: &DisplayConfig,
) -> Result<RegionDetail> {
    let scope: Vec<&UsageRecord> = records.iter().filter(|r| r.in_region(region)).collect();
    let latest = select_latest_filing(scope.iter().copied())?;
    let all_months = select_all_months_of_latest_filing(scope.iter().copied())?;
    let months = months_in_filing(&all_months);
    let scale = global_range(&latest)?;

    let summary = summarize_region(region, &all_months, &latest, &months, scale)?;

    let mut seen: HashSet<String> = HashSet::new();
    let mut ordered: Vec<&UsageRecord> = latest.clone();
    ordered.sort_by(|a, b| a.supplier_name.cmp(&b.supplier_name));
    let savings: Vec<SupplierSavings> = ordered
        .into_iter()
        .filter(|r| seen.insert(r.supplier_slug.clone()))
        .map(|r| {
            supplier_savings(&r.supplier_name, &r.supplier_slug, &all_months, suppliers, config)
        })
        .collect();
    let buckets = bucket_by_target(&savings);

    tracing::info!(
        region,
        suppliers = savings.len(),
        achieved = buckets.achieved_target.len(),
        no_data = buckets.no_data.len(),
        "built region detail"
    );

    Ok(RegionDetail {
        summary,
        savings,
        buckets,
    })
}

/// Region pages for every active region; a region that fails is logged and
/// left out.
pub fn build_all_region_details(
    records: &[UsageRecord],
    suppliers: &[SupplierBaseline],
    config: &DisplayConfig,
) -> Vec<RegionDetail> {
    active_regions(records, suppliers)
        .into_iter()
        .filter_map(|region| {
            build_region_detail(&region, records, suppliers, config)
                .map_err(|e| tracing::warn!(region = %region, error = %e, "skipping region page"))
                .ok()
        })
        .collect()
}

/// A supplier page: its RGPCD series from the latest filing, the statewide
/// average for the latest month and its cumulative savings.
pub fn build_supplier_detail(
    slug: &str,
    records: &[UsageRecord],
    suppliers: &[SupplierBaseline],
    config: &DisplayConfig,
) -> Result<SupplierDetail> {
    let latest = select_latest_filing(records)?;
    let latest_state_avg = average_rgpcd(&latest, ProductionPeriod::Current)?;
    let target_report = latest
        .first()
        .map(|r| r.reporting_month)
        .ok_or(ReportError::EmptyInput {
            context: "the latest statewide month",
        })?;

    let all_months = select_all_months_of_latest_filing(records)?;
    let results: Vec<&UsageRecord> = all_months
        .iter()
        .copied()
        .filter(|r| r.supplier_slug == slug)
        .collect();
    let first = results.first().ok_or(ReportError::EmptyInput {
        context: "a supplier detail page",
    })?;

    let savings = supplier_savings(&first.supplier_name, slug, &results, suppliers, config);
    let roster = find_supplier(suppliers, slug);

    Ok(SupplierDetail {
        supplier_name: first.supplier_name.clone(),
        supplier_slug: slug.to_string(),
        target_report,
        latest_state_avg,
        labels: results
            .iter()
            .map(|r| r.reporting_month.format("%b %Y").to_string())
            .collect(),
        data_2014: results.iter().map(|r| r.rgpcd_2014).collect(),
        data_2013: results.iter().map(|r| r.rgpcd_2013).collect(),
        units: first.units.code().to_string(),
        conservation_standard: roster.and_then(|s| s.reduction_target),
        conservation_tier: roster.and_then(|s| s.conservation_tier.clone()),
        tiers: roster.map(|s| s.tiers.clone()),
        cumulative: savings.cumulative,
    })
}

/// Every roster supplier in `region` ordered by name, with its final
/// reduction placement.
pub fn build_reduction_comparison(
    region: &str,
    suppliers: &[SupplierBaseline],
) -> Result<RegionComparison> {
    let mut entries: Vec<ComparisonEntry> = suppliers
        .iter()
        .filter(|s| s.hydrologic_region.as_deref() == Some(region))
        .map(|s| ComparisonEntry {
            supplier_name: s.supplier_name.clone(),
            supplier_slug: s.supplier_slug.clone(),
            reduction_target: s.reduction_target,
            conservation_tier: s.conservation_tier.clone(),
            estimated_savings: s.tiers.final_tier.conservation_savings,
        })
        .collect();
    if entries.is_empty() {
        return Err(ReportError::EmptyInput {
            context: "a region reduction comparison",
        });
    }
    entries.sort_by(|a, b| a.supplier_name.cmp(&b.supplier_name));
    Ok(RegionComparison {
        hydrologic_region: region.to_string(),
        suppliers: entries,
    })
}

/// Comparison pages for every region on the roster.
pub fn build_all_reduction_comparisons(suppliers: &[SupplierBaseline]) -> Vec<RegionComparison> {
    let regions: BTreeSet<&str> = suppliers
        .iter()
        .filter_map(|s| s.hydrologic_region.as_deref())
        .collect();
    regions
        .into_iter()
        .filter_map(|region| build_reduction_comparison(region, suppliers).ok())
        .collect()
}

/// Enforcement totals per supplier in `region`, ordered by supplier name.
pub fn build_enforcement_comparison(
    region: &str,
    enforcement: &[EnforcementRecord],
) -> Result<RegionEnforcement> {
    struct Acc {
        complaints: u64,
        follow_ups: u64,
        warnings: u64,
        penalties: u64,
        first: NaiveDate,
        last: NaiveDate,
    }

    let mut map: HashMap<String, Acc> = HashMap::new();
    for r in enforcement.iter().filter(|r| r.in_region(region)) {
        let e = map.entry(r.supplier_name.clone()).or_insert_with(|| Acc {
            complaints: 0,
            follow_ups: 0,
            warnings: 0,
            penalties: 0,
            first: r.reporting_month,
            last: r.reporting_month,
        });
        e.complaints += r.complaints_received;
        e.follow_ups += r.follow_up_actions;
        e.warnings += r.warnings_issued;
        e.penalties += r.penalties_assessed;
        e.first = e.first.min(r.reporting_month);
        e.last = e.last.max(r.reporting_month);
    }
    if map.is_empty() {
        return Err(ReportError::EmptyInput {
            context: "a region enforcement comparison",
        });
    }

    let mut suppliers: Vec<EnforcementSummary> = map
        .into_iter()
        .map(|(supplier_name, acc)| EnforcementSummary {
            supplier_name,
            hydrologic_region: region.to_string(),
            sum_complaints_received: acc.complaints,
            sum_follow_up_actions: acc.follow_ups,
            sum_warnings_issued: acc.warnings,
            sum_penalties_assessed: acc.penalties,
            reporting_month_min: acc.first,
            reporting_month_max: acc.last,
        })
        .collect();
    suppliers.sort_by(|a, b| a.supplier_name.cmp(&b.supplier_name));

    tracing::debug!(region, suppliers = suppliers.len(), "built enforcement comparison");
    Ok(RegionEnforcement {
        hydrologic_region: region.to_string(),
        suppliers,
    })
}

/// Enforcement pages for every region present in the enforcement export.
pub fn build_all_enforcement_comparisons(
    enforcement: &[EnforcementRecord],
) -> Vec<RegionEnforcement> {
    let regions: BTreeSet<&str> = enforcement
        .iter()
        .filter_map(|r| r.hydrologic_region.as_deref())
        .collect();
    regions
        .into_iter()
        .filter_map(|region| build_enforcement_comparison(region, enforcement).ok())
        .collect()
}

pub fn region_rows(summaries: &[RegionSummary]) -> Vec<RegionSummaryRow> {
    summaries
        .iter()
        .map(|s| RegionSummaryRow {
            region: s.hydrologic_region.clone(),
            count: s.count,
            this_month_avg: format_number(s.this_month_avg, 1),
            baseline_avg: format_number(s.this_month_baseline_avg, 1),
            last_month_avg: s
                .last_month_avg
                .map(|v| format_number(v, 1))
                .unwrap_or_else(|| "-".to_string()),
            min: format_number(s.this_min, 1),
            median: format_number(s.median, 1),
            max: format_number(s.this_max, 1),
            average_range: format_number(s.average_range, 2),
        })
        .collect()
}

pub fn savings_rows(details: &[RegionDetail]) -> Vec<SupplierSavingsRow> {
    let mut rows = Vec::new();
    for detail in details {
        for s in &detail.savings {
            let row = match &s.cumulative {
                Some(c) => SupplierSavingsRow {
                    region: detail.summary.hydrologic_region.clone(),
                    supplier: s.supplier_name.clone(),
                    cum_baseline: format_number(c.cum_baseline, 0),
                    cum_current: format_number(c.cum_current, 0),
                    allowed_production: format_number(
                        production_threshold(c.reduction_target, c.cum_baseline),
                        0,
                    ),
                    percent_change: format_number(c.cum_percent_change, 2),
                    target: format!("{}%", c.reduction_target_as_str),
                    percent_of_target: format_number(c.percent_of_target, 1),
                    status: c.cum_output.to_string(),
                },
                None => SupplierSavingsRow {
                    region: detail.summary.hydrologic_region.clone(),
                    supplier: s.supplier_name.clone(),
                    cum_baseline: "-".to_string(),
                    cum_current: "-".to_string(),
                    allowed_production: "-".to_string(),
                    percent_change: "-".to_string(),
                    target: "-".to_string(),
                    percent_of_target: "-".to_string(),
                    status: "no data".to_string(),
                },
            };
            rows.push(row);
        }
    }
    rows
}

pub fn enforcement_rows(pages: &[RegionEnforcement]) -> Vec<EnforcementRow> {
    pages
        .iter()
        .flat_map(|page| page.suppliers.iter())
        .map(|s| EnforcementRow {
            region: s.hydrologic_region.clone(),
            supplier: s.supplier_name.clone(),
            complaints: format_int(s.sum_complaints_received),
            follow_ups: format_int(s.sum_follow_up_actions),
            warnings: format_int(s.sum_warnings_issued),
            penalties: format_int(s.sum_penalties_assessed),
            first_month: s.reporting_month_min.format("%b %Y").to_string(),
            last_month: s.reporting_month_max.format("%b %Y").to_string(),
        })
        .collect()
}
