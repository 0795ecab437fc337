//! Fill model representing one executed order leg from a broker report.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One executed order leg, already normalized.
///
/// Quantity is signed: positive for buys, negative for sells. The fee is
/// kept separate from the price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fill {
    /// Instrument identifier as printed by the broker (e.g. "SiH4", "BRJ4")
    pub instrument: String,

    /// Execution time in the broker's local clock
    pub timestamp: NaiveDateTime,

    /// Signed quantity (buy > 0, sell < 0)
    pub quantity: Decimal,

    /// Execution price per unit
    pub price: Decimal,

    /// Total fee charged for this leg
    #[serde(default)]
    pub fee: Decimal,
}

impl Fill {
    /// Create a fill with no fee.
    pub fn new(
        instrument: impl Into<String>,
        timestamp: NaiveDateTime,
        quantity: Decimal,
        price: Decimal,
    ) -> Self {
        Self {
            instrument: instrument.into(),
            timestamp,
            quantity,
            price,
            fee: Decimal::ZERO,
        }
    }

    /// Attach a fee to this fill.
    pub fn with_fee(mut self, fee: Decimal) -> Self {
        self.fee = fee;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn at(hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .and_then(|d| d.and_hms_opt(hour, 0, 0))
            .unwrap()
    }

    #[test]
    fn test_new_has_no_fee() {
        let fill = Fill::new("SiH4", at(10), dec!(-3), dec!(91500));

        assert_eq!(fill.fee, Decimal::ZERO);
        assert_eq!(fill.timestamp, at(10));
        assert_eq!(fill.instrument, "SiH4");
    }

    #[test]
    fn test_fee_defaults_to_zero_when_missing() {
        let json = r#"{"instrument":"BRJ4","timestamp":"2024-03-01T10:00:00","quantity":"2","price":"83.5"}"#;
        let fill: Fill = serde_json::from_str(json).unwrap();

        assert_eq!(fill.fee, Decimal::ZERO);
        assert_eq!(fill.quantity, dec!(2));
        assert_eq!(fill.with_fee(dec!(1.2)).fee, dec!(1.2));
    }
}
