// Aggregations over monthly supplier usage records.
//
// Every function here is pure: callers hand in records that are already
// scoped to a supplier, a region or the whole state, and get back derived
// numbers for the report pages.
use crate::error::{ReportError, Result};
use crate::types::{
    CumulativeSavings, ProductionPeriod, SavingsStatus, SupplierSavings, TargetBuckets,
    UsageRecord, UsageTrend,
};
use crate::util::{days_in_month, percentage_change, round_to};
use chrono::NaiveDate;
use std::cmp::Ordering;

/// Share of the mandated reduction at or above which a supplier counts as
/// having met its target.
pub const TARGET_MET_PCT: f64 = 100.0;
/// Lower bound of the "narrowly missed" band.
pub const NARROW_MISS_PCT: f64 = 95.0;

fn latest_report_date(records: &[&UsageRecord], context: &'static str) -> Result<NaiveDate> {
    records
        .iter()
        .map(|r| r.report_date)
        .max()
        .ok_or(ReportError::EmptyInput { context })
}

/// Records for the most recent reporting month of the most recent filing.
///
/// The filing is picked by the maximum `report_date`; the month by the
/// maximum `reporting_month` across every input record.
pub fn select_latest_filing<'a, I>(records: I) -> Result<Vec<&'a UsageRecord>>
where
    I: IntoIterator<Item = &'a UsageRecord>,
{
    let records: Vec<&UsageRecord> = records.into_iter().collect();
    let report_date = latest_report_date(&records, "the latest filing")?;
    let latest_month = records
        .iter()
        .map(|r| r.reporting_month)
        .max()
        .ok_or(ReportError::EmptyInput {
            context: "the latest filing",
        })?;
    Ok(records
        .into_iter()
        .filter(|r| r.report_date == report_date && r.reporting_month >= latest_month)
        .collect())
}

/// Every month carried by the most recent filing, newest month first.
pub fn select_all_months_of_latest_filing<'a, I>(records: I) -> Result<Vec<&'a UsageRecord>>
where
    I: IntoIterator<Item = &'a UsageRecord>,
{
    let records: Vec<&UsageRecord> = records.into_iter().collect();
    let report_date = latest_report_date(&records, "the months of the latest filing")?;
    let mut out: Vec<&UsageRecord> = records
        .into_iter()
        .filter(|r| r.report_date == report_date)
        .collect();
    // Stable sort keeps the caller's ordering within a month.
    out.sort_by(|a, b| b.reporting_month.cmp(&a.reporting_month));
    Ok(out)
}

/// Distinct reporting months, newest first.
pub fn months_in_filing(records: &[&UsageRecord]) -> Vec<NaiveDate> {
    let mut months: Vec<NaiveDate> = records.iter().map(|r| r.reporting_month).collect();
    months.sort_unstable_by(|a, b| b.cmp(a));
    months.dedup();
    months
}

/// Population-weighted residential gallons per capita per day.
///
/// All records must describe the same reporting month; the day count is
/// taken from the first one. Unit codes are not consulted because
/// production figures are already expressed in gallons.
///
/// A record without a production figure for `period` is left out of both
/// the gallons and the population totals. Only when no record has one is
/// the average `MissingProduction`.
pub fn average_rgpcd(records: &[&UsageRecord], period: ProductionPeriod) -> Result<f64> {
    let first = records.first().ok_or(ReportError::EmptyInput {
        context: "an average RGPCD",
    })?;
    let days = days_in_month(first.reporting_month);

    let mut residential_gallons = 0.0;
    let mut population: u64 = 0;
    let mut counted = 0usize;
    for r in records {
        let Some(production) = r.production(period) else {
            tracing::debug!(
                supplier = %r.supplier_slug,
                month = %r.reporting_month,
                ?period,
                "no production figure, left out of average"
            );
            continue;
        };
        residential_gallons += production * r.percent_residential_use;
        population += r.total_population_served;
        counted += 1;
    }

    if counted == 0 {
        return Err(ReportError::MissingProduction {
            supplier: first.supplier_slug.clone(),
            month: first.reporting_month,
        });
    }

    if population == 0 {
        return Err(ReportError::ZeroPopulation {
            month: first.reporting_month,
        });
    }
    let total_gallons = residential_gallons.trunc();
    Ok((total_gallons / population as f64) / days as f64)
}

/// Position of `value` between `min_value` and `max_value` as a percentage,
/// rounded to two places. Values outside the range are not clamped.
pub fn normalized_range_position(value: f64, min_value: f64, max_value: f64) -> Result<f64> {
    let range = values_range(min_value, max_value);
    if range == 0.0 {
        return Err(ReportError::DegenerateRange { value });
    }
    Ok(round_to(((value - min_value) / range) * 100.0, 2))
}

pub fn values_range(min_value: f64, max_value: f64) -> f64 {
    max_value - min_value
}

/// Production still allowed after applying a mandated `reduction` fraction.
pub fn production_threshold(reduction: f64, amount: f64) -> f64 {
    amount - amount * reduction
}

/// Smallest and largest value, or `None` for an empty slice.
pub fn min_max(values: &[f64]) -> Option<(f64, f64)> {
    values.iter().copied().fold(None, |acc, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })
}

/// The published "median": sort ascending and take index `round(n / 2)`.
///
/// For even counts this is the upper middle value, and for odd counts the
/// element just above the middle. The index is clamped to the last element
/// so a single-value set returns that value.
pub fn skewed_median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    let idx = ((sorted.len() as f64) / 2.0).round() as usize;
    Some(sorted[idx.min(sorted.len() - 1)])
}

/// Compare cumulative production in the current window with the fixed
/// baseline window and classify the supplier against its reduction target.
///
/// Returns `None` when any baseline month is missing or the baseline sums to
/// zero; either way there is nothing to compare against.
pub fn cumulative_savings(
    current_usage: &[f64],
    baseline_usage: &[Option<f64>],
    reduction_target: f64,
    supplier_id: &str,
) -> Option<CumulativeSavings> {
    let Some(baseline) = baseline_usage.iter().copied().collect::<Option<Vec<f64>>>() else {
        tracing::debug!(supplier = supplier_id, "lacking baseline production figures");
        return None;
    };

    let cum_baseline: f64 = baseline.iter().sum();
    let cum_current: f64 = current_usage.iter().sum();
    let Some(cum_percent_change) = percentage_change(cum_baseline, cum_current) else {
        tracing::debug!(supplier = supplier_id, "baseline production totals zero");
        return None;
    };

    let target_pct = reduction_target * 100.0;
    let (trend, cum_savings, cum_increase) = if cum_percent_change < 0.0 {
        (UsageTrend::Decreased, cum_percent_change.abs(), None)
    } else if cum_percent_change > 0.0 {
        (UsageTrend::Increased, 0.0, Some(cum_percent_change.abs()))
    } else {
        (UsageTrend::Flat, 0.0, None)
    };

    let (percent_of_target, status) = match trend {
        UsageTrend::Decreased => {
            let pct = if reduction_target > 0.0 {
                cum_savings / reduction_target
            } else {
                // No mandated cut: any decrease meets it.
                TARGET_MET_PCT
            };
            let status = if pct >= TARGET_MET_PCT {
                SavingsStatus::Achieving
            } else if pct >= NARROW_MISS_PCT {
                SavingsStatus::NarrowlyMissed
            } else {
                SavingsStatus::FailedToMeet
            };
            (pct, status)
        }
        UsageTrend::Increased => (0.0, SavingsStatus::IncreasedConsumption),
        UsageTrend::Flat => (0.0, SavingsStatus::RemainedFlat),
    };

    tracing::trace!(
        supplier = supplier_id,
        change = cum_percent_change,
        status = status.label(),
        "classified cumulative savings"
    );

    Some(CumulativeSavings {
        supplier_slug: supplier_id.to_string(),
        cum_baseline,
        cum_current,
        cum_percent_change,
        trend,
        cum_savings,
        cum_increase,
        percent_of_target,
        points_within_target: cum_savings - target_pct,
        reduction_target,
        reduction_target_as_str: format!("{:.0}", target_pct),
        status,
        cum_success: status.is_success(),
        cum_output: status.label(),
        cum_html: status.html(),
    })
}

/// Group per-supplier outcomes into the four buckets shown on region pages.
///
/// Increased and flat consumption land in the failed bucket.
pub fn bucket_by_target(savings: &[SupplierSavings]) -> TargetBuckets {
    let mut buckets = TargetBuckets::default();
    for s in savings {
        let slug = s.supplier_slug.clone();
        match s.cumulative.as_ref().map(|c| c.status) {
            None => buckets.no_data.push(slug),
            Some(SavingsStatus::Achieving) => buckets.achieved_target.push(slug),
            Some(SavingsStatus::NarrowlyMissed) => buckets.missed_target.push(slug),
            Some(_) => buckets.failed_target.push(slug),
        }
    }
    buckets
}
