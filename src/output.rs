use serde::Serialize;
use std::path::Path;
use tabled::{settings::Style, Table, Tabled};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OutputError {
    #[error("csv write error: {0}")]
    Csv(#[from] csv::Error),
    #[error("json encode error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<(), OutputError> {
    let mut wtr = csv::Writer::from_path(path)?;
    for r in rows {
        wtr.serialize(r)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), OutputError> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s)?;
    Ok(())
}

/// Render up to `max_rows` rows as a markdown table.
pub fn render_table<T>(rows: &[T], max_rows: usize) -> String
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().take(max_rows).cloned().collect();
    if slice.is_empty() {
        return "(no rows)".to_string();
    }
    Table::new(slice).with(Style::markdown()).to_string()
}

pub fn preview_table<T>(title: &str, note: Option<&str>, rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    println!("{}", title);
    if let Some(n) = note {
        println!("({})", n);
    }
    println!();
    println!("{}\n", render_table(rows, max_rows));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RegionSummaryRow;

    fn row(region: &str) -> RegionSummaryRow {
        RegionSummaryRow {
            region: region.to_string(),
            count: 3,
            this_month_avg: "88.2".to_string(),
            baseline_avg: "105.9".to_string(),
            last_month_avg: "-".to_string(),
            min: "40.0".to_string(),
            median: "90.1".to_string(),
            max: "210.4".to_string(),
            average_range: "28.07".to_string(),
        }
    }

    #[test]
    fn writes_csv_with_renamed_headers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("regions.csv");
        write_csv(&path, &[row("North Coast")]).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("Region,Suppliers,AvgRGPCD,YearAgoRGPCD,LastMonthRGPCD,Min,Median,Max,AvgPosition")
        );
        assert_eq!(lines.next(), Some("North Coast,3,88.2,105.9,-,40.0,90.1,210.4,28.07"));
    }

    #[test]
    fn table_preview_is_truncated() {
        let rows = vec![row("North Coast"), row("South Coast"), row("Tulare Lake")];
        let table = render_table(&rows, 2);
        assert!(table.contains("North Coast"));
        assert!(table.contains("South Coast"));
        assert!(!table.contains("Tulare Lake"));
        assert_eq!(render_table::<RegionSummaryRow>(&[], 2), "(no rows)");
    }
}
