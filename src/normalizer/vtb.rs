//! Derivatives-broker statement (VTB layout).
//!
//! The statement is a free-form sheet. Futures trades sit between two rows
//! carrying the section title; the first row after the title is the column
//! header. Columns are positional once empty ones are dropped.

use tracing::debug;

use crate::error::NormalizeError;
use crate::models::Fill;

use super::parse;
use super::table::Row;

/// Title row that opens and closes the derivatives trades section.
pub const SECTION_MARKER: &str =
    "Сделки с Производными финансовыми инструментами в отчетном периоде";

/// Side value marking a sell.
const SELL: &str = "продажа";

const COLUMNS: usize = 8;

pub(crate) fn is_section_marker(row: &Row) -> bool {
    let marker = SECTION_MARKER.to_lowercase();
    row.cells
        .iter()
        .any(|c| c.to_lowercase().contains(&marker))
}

pub(crate) fn parse(rows: &[Row]) -> Result<Vec<Fill>, NormalizeError> {
    let markers: Vec<usize> = rows
        .iter()
        .enumerate()
        .filter(|(_, row)| is_section_marker(row))
        .map(|(i, _)| i)
        .collect();

    let (start, end) = match markers.as_slice() {
        [start, end, ..] => (*start + 1, *end),
        [_] => {
            return Err(NormalizeError::UnrecognizedFormat(
                "derivatives trades section is not terminated".to_string(),
            ))
        }
        [] => {
            return Err(NormalizeError::UnrecognizedFormat(
                "derivatives trades section not found".to_string(),
            ))
        }
    };

    let section = &rows[start..end];

    // Columns that hold a value anywhere in the section, header included.
    let width = section.iter().map(|r| r.cells.len()).max().unwrap_or(0);
    let kept: Vec<usize> = (0..width)
        .filter(|&col| section.iter().any(|r| !r.cell(col).is_empty()))
        .take(COLUMNS)
        .collect();

    if kept.len() < COLUMNS {
        return Err(NormalizeError::UnrecognizedFormat(format!(
            "derivatives trades section has {} columns, expected {}",
            kept.len(),
            COLUMNS
        )));
    }

    let mut fills = Vec::with_capacity(section.len().saturating_sub(1));
    for row in section.iter().skip(1) {
        let cell = |i: usize| row.cell(kept[i]);
        let record = row.record;

        let instrument = parse::required(record, "instrument", cell(0))?;
        let timestamp = parse::timestamp(record, "timestamp", cell(1))?;
        let side = parse::required(record, "side", cell(2))?;
        let mut quantity = parse::integral(record, "quantity", cell(3))?;
        let price = parse::decimal(record, "price", cell(4))?;
        let fee = parse::optional_decimal(record, "exchange fee", cell(6))?
            + parse::optional_decimal(record, "broker fee", cell(7))?;

        if side.to_lowercase() == SELL {
            quantity = -quantity;
        }

        fills.push(Fill {
            instrument: instrument.to_string(),
            timestamp,
            quantity,
            price,
            fee,
        });
    }

    debug!(fills = fills.len(), "Parsed derivatives trades section");
    Ok(fills)
}
