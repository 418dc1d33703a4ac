use cali_water_report::error::ReportError;
use cali_water_report::stats::{
    average_rgpcd, cumulative_savings, normalized_range_position, select_latest_filing,
};
use cali_water_report::types::{ProductionPeriod, SavingsStatus, Units, UsageRecord, UsageTrend};
use chrono::NaiveDate;

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn record(
    slug: &str,
    month: NaiveDate,
    filed: NaiveDate,
    pop: u64,
    prod: f64,
    share: f64,
) -> UsageRecord {
    UsageRecord {
        supplier_name: slug.to_string(),
        supplier_slug: slug.to_string(),
        hydrologic_region: Some("South Coast".to_string()),
        reporting_month: month,
        report_date: filed,
        units: Units::from_code("G"),
        total_population_served: pop,
        production_gallons_2014: Some(prod),
        production_gallons_2013: Some(prod),
        percent_residential_use: share,
        rgpcd_2014: None,
        rgpcd_2013: None,
    }
}

/// June through February, totalling exactly 1000.
fn baseline_of_1000() -> Vec<Option<f64>> {
    let mut months = vec![Some(100.0); 9];
    months[0] = Some(200.0);
    months
}

#[test]
fn latest_filing_only_returns_newest_report_and_month() {
    // Three filings; the September filing restates June-August.
    let mut records = Vec::new();
    for (filed, months) in [
        (d(2015, 7, 20), vec![d(2015, 6, 1)]),
        (d(2015, 8, 20), vec![d(2015, 6, 1), d(2015, 7, 1)]),
        (d(2015, 9, 20), vec![d(2015, 6, 1), d(2015, 7, 1), d(2015, 8, 1)]),
    ] {
        for month in months {
            for slug in ["a", "b", "c"] {
                records.push(record(slug, month, filed, 100, 1000.0, 0.5));
            }
        }
    }

    let latest = select_latest_filing(&records).unwrap();
    let max_date = records.iter().map(|r| r.report_date).max().unwrap();
    let max_month = latest.iter().map(|r| r.reporting_month).max().unwrap();
    assert_eq!(latest.len(), 3);
    for r in &latest {
        assert_eq!(r.report_date, max_date);
        assert!(r.reporting_month >= max_month);
    }
}

#[test]
fn average_is_independent_of_record_order() {
    let month = d(2015, 8, 1);
    let filed = d(2015, 9, 20);
    let records = vec![
        record("a", month, filed, 12_000, 91_234_567.0, 0.71),
        record("b", month, filed, 340_000, 2_400_000_000.0, 0.64),
        record("c", month, filed, 5_100, 40_000_001.5, 0.9),
        record("d", month, filed, 77_777, 655_555_555.0, 0.58),
    ];
    let forward: Vec<&UsageRecord> = records.iter().collect();
    let mut backward = forward.clone();
    backward.reverse();
    let mut shuffled = forward.clone();
    shuffled.swap(0, 2);
    shuffled.swap(1, 3);

    let expected = average_rgpcd(&forward, ProductionPeriod::Current).unwrap();
    for order in [&backward, &shuffled] {
        let got = average_rgpcd(order, ProductionPeriod::Current).unwrap();
        assert!((got - expected).abs() < 1e-9, "{} != {}", got, expected);
    }
}

#[test]
fn average_treats_every_unit_code_the_same() {
    let month = d(2015, 8, 1);
    let filed = d(2015, 9, 20);
    let mut a = record("a", month, filed, 1000, 3_100_000.0, 0.5);
    let baseline = average_rgpcd(&[&a], ProductionPeriod::Current).unwrap();
    for code in ["MG", "CCF", "AF", "something else"] {
        a.units = Units::from_code(code);
        assert_eq!(average_rgpcd(&[&a], ProductionPeriod::Current).unwrap(), baseline);
    }
    // 1,550,000 gallons / 1000 people / 31 days
    assert!((baseline - 50.0).abs() < 1e-12);
}

#[test]
fn range_endpoints_map_to_zero_and_hundred() {
    for (min, max) in [(0.0, 1.0), (42.5, 310.25), (-10.0, 10.0), (65.0, 65.0001)] {
        assert_eq!(normalized_range_position(min, min, max).unwrap(), 0.0);
        assert_eq!(normalized_range_position(max, min, max).unwrap(), 100.0);
    }
}

#[test]
fn range_position_is_monotonic() {
    let (min, max) = (38.4, 287.9);
    let mut last = f64::NEG_INFINITY;
    let mut v = min - 50.0;
    while v <= max + 50.0 {
        let p = normalized_range_position(v, min, max).unwrap();
        assert!(p >= last, "position fell at {}: {} < {}", v, p, last);
        last = p;
        v += 0.37;
    }
}

#[test]
fn degenerate_range_is_an_error() {
    assert!(matches!(
        normalized_range_position(80.0, 80.0, 80.0),
        Err(ReportError::DegenerateRange { .. })
    ));
}

#[test]
fn missing_baseline_month_means_no_result() {
    let baseline = [
        Some(100.0),
        None,
        Some(50.0),
        Some(50.0),
        Some(50.0),
        Some(50.0),
        Some(50.0),
        Some(50.0),
        Some(50.0),
    ];
    assert!(cumulative_savings(&[10.0, 20.0], &baseline, 0.25, "lacking").is_none());
}

#[test]
fn quarter_cut_meets_quarter_target() {
    let baseline = baseline_of_1000();
    let result = cumulative_savings(&[250.0, 250.0, 250.0], &baseline, 0.25, "meets").unwrap();
    assert_eq!(result.cum_baseline, 1000.0);
    assert_eq!(result.cum_current, 750.0);
    assert_eq!(result.cum_percent_change, -25.0);
    assert_eq!(result.cum_savings, 25.0);
    assert_eq!(result.percent_of_target, 100.0);
    assert_eq!(result.trend, UsageTrend::Decreased);
    assert_eq!(result.status, SavingsStatus::Achieving);
    assert_eq!(result.cum_output, "achieving");
    assert!(result.cum_success);
    assert_eq!(result.reduction_target_as_str, "25");
    assert!(result.cum_html.contains("green"));
}

#[test]
fn twenty_percent_cut_fails_quarter_target() {
    let baseline = baseline_of_1000();
    let result = cumulative_savings(&[400.0, 400.0], &baseline, 0.25, "short").unwrap();
    assert!((result.cum_percent_change + 20.0).abs() < 1e-9);
    assert!((result.percent_of_target - 80.0).abs() < 1e-9);
    assert_eq!(result.status, SavingsStatus::FailedToMeet);
    assert_eq!(result.cum_output, "failed to meet");
    assert!(!result.cum_success);
    assert!(result.cum_html.contains("red"));
}

#[test]
fn small_decrease_still_fails() {
    let baseline = baseline_of_1000();
    let result = cumulative_savings(&[970.0], &baseline, 0.25, "barely").unwrap();
    assert!((result.cum_percent_change + 3.0).abs() < 1e-9);
    assert!((result.percent_of_target - 12.0).abs() < 1e-9);
    assert_eq!(result.trend, UsageTrend::Decreased);
    assert_eq!(result.status, SavingsStatus::FailedToMeet);
}

#[test]
fn increase_always_fails_regardless_of_target() {
    let baseline = baseline_of_1000();
    for target in [0.04, 0.25, 0.36] {
        let result = cumulative_savings(&[1100.0], &baseline, target, "thirsty").unwrap();
        assert!((result.cum_percent_change - 10.0).abs() < 1e-9);
        assert_eq!(result.trend, UsageTrend::Increased);
        assert_eq!(result.status, SavingsStatus::IncreasedConsumption);
        assert_eq!(result.cum_output, "increased consumption");
        assert!(!result.cum_success);
        assert!((result.cum_increase.unwrap() - 10.0).abs() < 1e-9);
        assert_eq!(result.cum_savings, 0.0);
        assert_eq!(result.percent_of_target, 0.0);
    }
}
