//! Input normalizer: turns a raw broker export into chronologically ordered
//! fills. Format-specific layout knowledge lives here and nowhere else.

mod binance;
mod canonical;
mod parse;
mod table;
mod vtb;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::NormalizeError;
use crate::models::Fill;

pub use vtb::SECTION_MARKER;

/// Supported export layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// Derivatives-broker statement with a titled trades section
    Vtb,
    /// Exchange order-history export
    Binance,
    /// `instrument,timestamp,quantity,price[,fee]`
    Canonical,
}

impl ReportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportFormat::Vtb => "vtb",
            ReportFormat::Binance => "binance",
            ReportFormat::Canonical => "canonical",
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportFormat {
    type Err = NormalizeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "vtb" => Ok(Self::Vtb),
            "binance" => Ok(Self::Binance),
            "canonical" | "fills" => Ok(Self::Canonical),
            other => Err(NormalizeError::UnrecognizedFormat(other.to_string())),
        }
    }
}

/// File name without directories or extensions.
fn file_stem(source_name: &str) -> &str {
    let name = source_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(source_name);
    name.split('.').next().unwrap_or(name)
}

/// Infer the layout from the file name and contents.
///
/// Exchange exports are named "Export ..."; statements are recognized by
/// their trades section title; canonical tables by their header.
pub fn detect_format(source_name: &str, content: &str) -> Result<ReportFormat, NormalizeError> {
    let first_word = file_stem(source_name)
        .split_whitespace()
        .next()
        .unwrap_or("")
        .to_lowercase();
    if first_word == "export" {
        return Ok(ReportFormat::Binance);
    }

    if content
        .to_lowercase()
        .contains(&SECTION_MARKER.to_lowercase())
    {
        return Ok(ReportFormat::Vtb);
    }

    let rows = table::read_rows(content)?;
    if rows.first().is_some_and(canonical::is_header) {
        return Ok(ReportFormat::Canonical);
    }

    Err(NormalizeError::UnrecognizedFormat(source_name.to_string()))
}

/// Normalize a raw export into fills, stable-sorted by timestamp.
///
/// `format` overrides detection. The result keeps original record order
/// among equal timestamps.
pub fn normalize(
    source_name: &str,
    content: &str,
    format: Option<ReportFormat>,
) -> Result<Vec<Fill>, NormalizeError> {
    let format = match format {
        Some(format) => format,
        None => detect_format(source_name, content)?,
    };

    let rows = table::read_rows(content)?;
    let mut fills = match format {
        ReportFormat::Vtb => vtb::parse(&rows)?,
        ReportFormat::Binance => binance::parse(&rows)?,
        ReportFormat::Canonical => canonical::parse(&rows)?,
    };
    fills.sort_by_key(|f| f.timestamp);

    info!(
        source = %source_name,
        format = %format,
        fills = fills.len(),
        "Normalized report"
    );

    Ok(fills)
}
