//! Error types for each layer: input normalization, the trade engine,
//! summary aggregation and configuration.

use rust_decimal::Decimal;
use thiserror::Error;

/// Errors raised while turning a raw broker export into fills.
///
/// All of these are fatal: the engine never runs on a report that failed
/// to normalize.
#[derive(Error, Debug)]
pub enum NormalizeError {
    #[error("unrecognized report format: {0}")]
    UnrecognizedFormat(String),

    #[error("record {record}: malformed {field} '{value}'")]
    MalformedField {
        record: usize,
        field: &'static str,
        value: String,
    },

    #[error("record {record}: missing {field}")]
    MissingField { record: usize, field: &'static str },

    #[error("failed to read delimited report: {0}")]
    Csv(#[from] csv::Error),
}

/// Errors raised by the trade engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Strict point-value lookup miss. The engine records this in-band as
    /// [`crate::models::PnlStatus::UnknownPointValue`] instead of failing.
    #[error("no point value configured for instrument {instrument} (prefix '{prefix}')")]
    UnknownInstrumentPointValue { instrument: String, prefix: String },

    #[error("fill {index} ({instrument}): price must be positive, got {price}")]
    NonPositivePrice {
        index: usize,
        instrument: String,
        price: Decimal,
    },

    #[error("fill {index} ({instrument}) is earlier than the previous fill for that instrument")]
    OutOfOrder { index: usize, instrument: String },

    #[error("fill {index} ({instrument}): position or entry value overflowed")]
    Overflow { index: usize, instrument: String },
}

/// Errors raised when a statistic is undefined for the input set.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryError {
    #[error("no realized trades to summarize")]
    EmptyInputSet,

    #[error("ratio undefined: {0}")]
    Undefined(&'static str),
}

/// Engine configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}
