//! Data models for fills, enriched ledger rows, round trips and summaries.

mod enriched;
mod fill;
mod round_trip;
mod summary;

pub use enriched::{EnrichedFill, PnlStatus, TradeId, TradeSide};
pub use fill::Fill;
pub use round_trip::RoundTrip;
pub use summary::{InstrumentSummary, PnlStats, PortfolioSummary, TradeCount};
