//! Closed round-trip trades collapsed from enriched fills.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::enriched::{PnlStatus, TradeId, TradeSide};

/// A trade that went from flat back to flat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundTrip {
    pub trade_id: TradeId,
    pub instrument: String,
    pub side: TradeSide,

    /// Time of the first fill
    pub opened_at: NaiveDateTime,

    /// Time of the closing fill
    pub closed_at: NaiveDateTime,

    /// Number of fills in the trade, closing fill included
    pub fills: usize,

    /// Absolute quantity of all entry fills
    pub entry_volume: Decimal,

    pub avg_entry_price: Option<Decimal>,
    pub close_price: Decimal,

    /// Signed quantity of the closing fill
    pub close_quantity: Decimal,

    pub pnl: Option<Decimal>,
    pub pnl_status: PnlStatus,

    /// Fees over every fill of the trade
    pub fees: Decimal,
}

impl RoundTrip {
    /// PnL net of fees, when the trade was priced.
    pub fn net_pnl(&self) -> Option<Decimal> {
        self.pnl.map(|pnl| pnl - self.fees)
    }
}
