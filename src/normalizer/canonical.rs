//! Already-normalized fills: `instrument,timestamp,quantity,price[,fee]`.

use crate::error::NormalizeError;
use crate::models::Fill;

use super::parse;
use super::table::{column_index, Row};

pub(crate) const HEADER: [&str; 5] = ["instrument", "timestamp", "quantity", "price", "fee"];

pub(crate) fn is_header(row: &Row) -> bool {
    row.cell(0).eq_ignore_ascii_case(HEADER[0])
}

pub(crate) fn parse(rows: &[Row]) -> Result<Vec<Fill>, NormalizeError> {
    let Some((header, body)) = rows.split_first() else {
        return Ok(Vec::new());
    };

    let required = |name: &str| {
        column_index(header, name).ok_or_else(|| {
            NormalizeError::UnrecognizedFormat(format!("fill table has no '{}' column", name))
        })
    };
    let instrument = required(HEADER[0])?;
    let timestamp = required(HEADER[1])?;
    let quantity = required(HEADER[2])?;
    let price = required(HEADER[3])?;
    let fee = column_index(header, HEADER[4]);

    body.iter()
        .map(|row| -> Result<Fill, NormalizeError> {
            let record = row.record;
            Ok(Fill {
                instrument: parse::required(record, "instrument", row.cell(instrument))?
                    .to_string(),
                timestamp: parse::timestamp(record, "timestamp", row.cell(timestamp))?,
                quantity: parse::decimal(record, "quantity", row.cell(quantity))?,
                price: parse::decimal(record, "price", row.cell(price))?,
                fee: match fee {
                    Some(col) => parse::optional_decimal(record, "fee", row.cell(col))?,
                    None => Default::default(),
                },
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    use crate::normalizer::table::read_rows;

    #[test]
    fn test_parses_with_and_without_fee() {
        let rows = read_rows(
            "instrument,timestamp,quantity,price,fee\n\
             SiH4,2024-02-01 10:00:00,3,90000,1.2\n\
             SiH4,2024-02-01 10:05:00,-3,90100,\n",
        )
        .unwrap();
        let fills = parse(&rows).unwrap();

        assert!(is_header(&rows[0]));
        assert_eq!(fills.len(), 2);
        assert_eq!(fills[0].fee, dec!(1.2));
        assert_eq!(fills[1].quantity, dec!(-3));
        assert_eq!(fills[1].fee, dec!(0));

        let no_fee = read_rows("price,quantity,timestamp,instrument\n1,2,2024-02-01,BR\n").unwrap();
        let fills = parse(&no_fee).unwrap();
        assert_eq!(fills[0].instrument, "BR");
        assert_eq!(fills[0].price, dec!(1));
    }

    #[test]
    fn test_non_numeric_quantity_is_rejected() {
        let rows = read_rows("instrument,timestamp,quantity,price\nSiH4,2024-02-01,ten,1\n").unwrap();
        assert!(matches!(
            parse(&rows),
            Err(NormalizeError::MalformedField { record: 2, field: "quantity", .. })
        ));
    }
}
