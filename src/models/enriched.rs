//! Enriched fill rows produced by the trade engine.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::fill::Fill;

/// Identifier of a reconstructed trade (flat-to-flat position cycle).
pub type TradeId = u64;

/// Direction of a reconstructed trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeSide {
    Long,
    Short,
}

impl TradeSide {
    /// Side implied by the position after a trade's first fill.
    pub fn from_opening_position(position: Decimal) -> Self {
        if position >= Decimal::ZERO {
            TradeSide::Long
        } else {
            TradeSide::Short
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TradeSide::Long => "long",
            TradeSide::Short => "short",
        }
    }

    /// Whether a fill of this quantity adds to a position on this side.
    pub fn is_entry(&self, quantity: Decimal) -> bool {
        match self {
            TradeSide::Long => quantity > Decimal::ZERO,
            TradeSide::Short => quantity < Decimal::ZERO,
        }
    }
}

/// Why a fill does or does not carry a realized PnL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PnlStatus {
    /// Closing fill with a computed PnL
    Realized,
    /// Non-closing fill of a trade that did close
    Interim,
    /// Fill of a trade that never returned to flat
    Open,
    /// Closing fill whose instrument has no configured point value
    UnknownPointValue,
    /// Closing fill of a trade with no entry fills to price against
    NoEntryBasis,
    /// Closing fill whose PnL or resulting equity does not fit a `Decimal`
    Overflow,
}

impl PnlStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PnlStatus::Realized => "realized",
            PnlStatus::Interim => "interim",
            PnlStatus::Open => "open",
            PnlStatus::UnknownPointValue => "unknown_point_value",
            PnlStatus::NoEntryBasis => "no_entry_basis",
            PnlStatus::Overflow => "overflow",
        }
    }

    /// Closing fill whose PnL could not be priced.
    pub fn is_unpriced(&self) -> bool {
        matches!(
            self,
            PnlStatus::UnknownPointValue | PnlStatus::NoEntryBasis | PnlStatus::Overflow
        )
    }

    /// Whether this fill ended its trade.
    pub fn is_closing(&self) -> bool {
        matches!(
            self,
            PnlStatus::Realized
                | PnlStatus::UnknownPointValue
                | PnlStatus::NoEntryBasis
                | PnlStatus::Overflow
        )
    }
}

/// One input fill plus everything the engine derived for it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedFill {
    #[serde(flatten)]
    pub fill: Fill,

    /// Net position for the instrument after this fill
    pub position: Decimal,

    /// Trade this fill belongs to
    pub trade_id: TradeId,

    /// Side of the whole trade
    pub side: TradeSide,

    /// Volume-weighted entry price; carried forward on the closing fill
    pub avg_entry_price: Option<Decimal>,

    /// Realized PnL, present only on priced closing fills
    pub pnl: Option<Decimal>,

    pub pnl_status: PnlStatus,

    /// Initial capital plus all realized PnL up to and including this fill
    pub cumulative_equity: Decimal,
}

impl EnrichedFill {
    pub fn is_closing(&self) -> bool {
        self.pnl_status.is_closing()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_side_from_opening_position() {
        assert_eq!(TradeSide::from_opening_position(dec!(5)), TradeSide::Long);
        assert_eq!(TradeSide::from_opening_position(dec!(0)), TradeSide::Long);
        assert_eq!(TradeSide::from_opening_position(dec!(-1)), TradeSide::Short);
    }

    #[test]
    fn test_entry_direction() {
        assert!(TradeSide::Long.is_entry(dec!(2)));
        assert!(!TradeSide::Long.is_entry(dec!(-2)));
        assert!(TradeSide::Short.is_entry(dec!(-2)));
        assert!(!TradeSide::Short.is_entry(dec!(0)));
    }

    #[test]
    fn test_status_classification() {
        assert!(PnlStatus::UnknownPointValue.is_unpriced());
        assert!(PnlStatus::UnknownPointValue.is_closing());
        assert!(!PnlStatus::Open.is_unpriced());
        assert!(!PnlStatus::Open.is_closing());
        assert!(!PnlStatus::Interim.is_closing());
        assert_eq!(PnlStatus::NoEntryBasis.as_str(), "no_entry_basis");
        assert!(PnlStatus::Overflow.is_unpriced());
        assert!(PnlStatus::Overflow.is_closing());
    }
}
