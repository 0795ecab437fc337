//! Portfolio and per-instrument performance summaries.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::SummaryError;

/// Reduction of a set of realized PnL values.
///
/// Ratios that are undefined for the input (no trades, no winners, no
/// losers) are stored as `None`. The accessor methods turn that into a
/// [`SummaryError`] for callers that need a hard value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PnlStats {
    /// Sum of realized PnL
    pub total_pnl: Decimal,

    /// Number of realized trades
    pub count: usize,

    /// Trades with PnL > 0
    pub winning_trades: usize,

    /// Trades with PnL <= 0
    pub losing_trades: usize,

    /// Mean PnL of winning trades
    pub avg_profit: Option<Decimal>,

    /// Mean PnL of non-winning trades (zero or negative)
    pub avg_loss: Option<Decimal>,

    /// Winning trades / all realized trades (0.0 to 1.0)
    pub win_rate: Option<f64>,

    /// |avg_profit / avg_loss|
    pub profit_factor: Option<f64>,
}

impl PnlStats {
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Win rate, or [`SummaryError::EmptyInputSet`] with no realized trades.
    pub fn win_rate(&self) -> Result<f64, SummaryError> {
        if self.is_empty() {
            return Err(SummaryError::EmptyInputSet);
        }
        self.win_rate.ok_or(SummaryError::Undefined("win_rate"))
    }

    pub fn profit_factor(&self) -> Result<f64, SummaryError> {
        if self.is_empty() {
            return Err(SummaryError::EmptyInputSet);
        }
        self.profit_factor
            .ok_or(SummaryError::Undefined("profit_factor"))
    }
}

/// Single-row summary over every realized trade in the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSummary {
    #[serde(flatten)]
    pub stats: PnlStats,

    /// `1 + win_rate * profit_factor`
    pub expected_value: Option<f64>,

    /// Largest peak-to-trough equity decline, in percent of the peak
    pub max_drawdown_pct: Option<f64>,

    pub initial_capital: Decimal,

    pub final_equity: Decimal,

    /// Fees over all fills
    pub total_fees: Decimal,

    /// Trades that never returned to flat
    pub open_trades: usize,

    /// Closed trades whose PnL could not be priced
    pub unpriced_trades: usize,
}

impl PortfolioSummary {
    pub fn expected_value(&self) -> Result<f64, SummaryError> {
        if self.stats.is_empty() {
            return Err(SummaryError::EmptyInputSet);
        }
        self.expected_value
            .ok_or(SummaryError::Undefined("expected_value"))
    }
}

/// Summary row for one instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentSummary {
    pub instrument: String,

    #[serde(flatten)]
    pub stats: PnlStats,

    /// `(1 - win_rate) * avg_loss + win_rate * avg_profit`
    pub expected_avg_value: Option<Decimal>,

    /// Fees over this instrument's fills
    pub total_fees: Decimal,

    /// Net position left after the last fill
    pub position: Decimal,

    pub open_trades: usize,

    pub unpriced_trades: usize,
}

impl InstrumentSummary {
    pub fn expected_avg_value(&self) -> Result<Decimal, SummaryError> {
        if self.stats.is_empty() {
            return Err(SummaryError::EmptyInputSet);
        }
        self.expected_avg_value
            .ok_or(SummaryError::Undefined("expected_avg_value"))
    }
}

/// Instrument ranked by number of realized trades.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeCount {
    pub instrument: String,
    pub trades: usize,
}
