use chrono::NaiveDate;
use thiserror::Error;

/// Failures raised by the aggregation layer.
///
/// A missing baseline is deliberately absent from this list: cumulative
/// savings for such a supplier is reported as "no data", not as an error.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReportError {
    #[error("no records available to compute {context}")]
    EmptyInput { context: &'static str },

    #[error("cannot position {value} inside a range whose min equals its max")]
    DegenerateRange { value: f64 },

    #[error("total population served is zero for {month}")]
    ZeroPopulation { month: NaiveDate },

    #[error("{supplier} has no production figure for {month}")]
    MissingProduction { supplier: String, month: NaiveDate },
}

pub type Result<T> = std::result::Result<T, ReportError>;
