//! Exchange order-history export (Binance layout).

use rust_decimal::Decimal;
use tracing::debug;

use crate::error::NormalizeError;
use crate::models::Fill;

use super::parse;
use super::table::{column_index, Row};

const DATE: &str = "Date(UTC)";
const PAIR: &str = "Pair";
const TYPE: &str = "Type";
const PRICE: &str = "Order Price";
const FILLED: &str = "Filled";

pub(crate) fn parse(rows: &[Row]) -> Result<Vec<Fill>, NormalizeError> {
    let Some((header, body)) = rows.split_first() else {
        return Err(NormalizeError::UnrecognizedFormat(
            "order export is empty".to_string(),
        ));
    };

    let column = |name: &str| {
        column_index(header, name).ok_or_else(|| {
            NormalizeError::UnrecognizedFormat(format!("order export has no '{}' column", name))
        })
    };
    let date = column(DATE)?;
    let pair = column(PAIR)?;
    let side = column(TYPE)?;
    let price = column(PRICE)?;
    let filled = column(FILLED)?;

    let mut fills = Vec::with_capacity(body.len());
    let mut unfilled = 0usize;

    for row in body {
        let record = row.record;
        let mut quantity = parse::decimal(record, "quantity", row.cell(filled))?;

        // Orders that never executed are not fills.
        if quantity.is_zero() {
            unfilled += 1;
            continue;
        }

        match parse::required(record, "side", row.cell(side))?.to_ascii_uppercase().as_str() {
            "BUY" => {}
            "SELL" => quantity = -quantity,
            other => {
                return Err(NormalizeError::MalformedField {
                    record,
                    field: "side",
                    value: other.to_string(),
                })
            }
        }

        fills.push(Fill {
            instrument: parse::required(record, "instrument", row.cell(pair))?.to_string(),
            timestamp: parse::timestamp(record, "timestamp", row.cell(date))?,
            quantity,
            price: parse::decimal(record, "price", row.cell(price))?,
            fee: Decimal::ZERO,
        });
    }

    debug!(fills = fills.len(), unfilled, "Parsed order export");
    Ok(fills)
}
