//! Report assembly: runs the engine and the aggregator over one set of
//! fills and renders the resulting tables.

use std::fmt;

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::engine::{TradeEngine, TradeLedger};
use crate::error::EngineError;
use crate::metrics::{self, SummaryCalculator};
use crate::models::{EnrichedFill, Fill, InstrumentSummary, PortfolioSummary, RoundTrip, TradeCount};

/// Number of instruments kept in the trade-count ranking.
pub const DEFAULT_TOP: usize = 5;

/// Everything derived from one broker report.
#[derive(Debug, Clone, Serialize)]
pub struct BrokerReport {
    pub portfolio: PortfolioSummary,

    /// Sorted by descending total PnL
    pub instruments: Vec<InstrumentSummary>,

    pub top_instruments: Vec<TradeCount>,

    pub round_trips: Vec<RoundTrip>,

    /// Starting capital, then equity after each closing fill
    pub equity_curve: Vec<(Option<NaiveDateTime>, Decimal)>,

    pub fills: Vec<EnrichedFill>,
}

impl BrokerReport {
    /// Run the engine and compute every summary.
    pub fn build(engine: &TradeEngine, fills: &[Fill]) -> Result<Self, EngineError> {
        let ledger = engine.run(fills)?;
        Ok(Self::from_ledger(ledger, DEFAULT_TOP))
    }

    pub fn from_ledger(ledger: TradeLedger, top: usize) -> Self {
        let portfolio = SummaryCalculator::portfolio(&ledger);
        let mut instruments = SummaryCalculator::per_instrument(&ledger);
        metrics::sort_by_total_pnl(&mut instruments);

        Self {
            portfolio,
            instruments,
            top_instruments: metrics::top_instruments_by_trade_count(&ledger, top),
            round_trips: ledger.round_trips(),
            equity_curve: ledger.equity_curve(),
            fills: ledger.fills,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

fn opt<T: fmt::Display>(value: Option<T>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| v.to_string())
}

fn money(value: Option<Decimal>) -> String {
    opt(value.map(|v| v.round_dp(2)))
}

fn pct(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{:.1}%", v * 100.0))
}

fn ratio(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{:.2}", v))
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}

impl fmt::Display for PortfolioSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "\n{:=^60}", " PORTFOLIO SUMMARY ")?;
        writeln!(f)?;
        writeln!(f, "--- Capital ---")?;
        writeln!(f, "Initial:        {:.2}", self.initial_capital)?;
        writeln!(f, "Final:          {:.2}", self.final_equity)?;
        writeln!(f, "Total P&L:      {:.2}", self.stats.total_pnl)?;
        writeln!(f, "Fees Paid:      {:.2}", self.total_fees)?;
        writeln!(f)?;
        writeln!(f, "--- Trades ---")?;
        writeln!(
            f,
            "Realized:       {} ({} open, {} unpriced)",
            self.stats.count, self.open_trades, self.unpriced_trades
        )?;
        writeln!(f, "Winners:        {} ({})", self.stats.winning_trades, pct(self.stats.win_rate))?;
        writeln!(f, "Losers:         {}", self.stats.losing_trades)?;
        writeln!(f, "Avg Profit:     {}", money(self.stats.avg_profit))?;
        writeln!(f, "Avg Loss:       {}", money(self.stats.avg_loss))?;
        writeln!(f, "Profit Factor:  {}", ratio(self.stats.profit_factor))?;
        writeln!(f, "Expected Value: {}", ratio(self.expected_value))?;
        writeln!(f)?;
        writeln!(f, "--- Risk ---")?;
        writeln!(
            f,
            "Max Drawdown:   {}",
            self.max_drawdown_pct
                .map_or_else(|| "n/a".to_string(), |v| format!("{:.2}%", v))
        )?;
        write!(f, "{:=^60}", "")
    }
}

/// Per-instrument summary rows as a text table.
pub struct InstrumentTable<'a>(pub &'a [InstrumentSummary]);

impl fmt::Display for InstrumentTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:<14} {:>12} {:>6} {:>7} {:>11} {:>11} {:>7} {:>11} {:>8}",
            "INSTRUMENT", "P&L", "TRADES", "WIN%", "AVG PROFIT", "AVG LOSS", "PF", "EXP AVG", "POSITION"
        )?;
        writeln!(f, "{}", "-".repeat(96))?;
        for row in self.0 {
            writeln!(
                f,
                "{:<14} {:>12.2} {:>6} {:>7} {:>11} {:>11} {:>7} {:>11} {:>8}",
                truncate(&row.instrument, 14),
                row.stats.total_pnl,
                row.stats.count,
                pct(row.stats.win_rate),
                money(row.stats.avg_profit),
                money(row.stats.avg_loss),
                ratio(row.stats.profit_factor),
                money(row.expected_avg_value),
                row.position,
            )?;
        }
        Ok(())
    }
}

/// Enriched fills as a text table.
pub struct FillTable<'a>(pub &'a [EnrichedFill]);

impl fmt::Display for FillTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:<19} {:<12} {:>8} {:>12} {:>8} {:>6} {:<5} {:>12} {:>12} {:<19} {:>14}",
            "TIME", "INSTRUMENT", "QTY", "PRICE", "POS", "TRADE", "SIDE", "AVG ENTRY", "P&L", "STATUS", "EQUITY"
        )?;
        writeln!(f, "{}", "-".repeat(138))?;
        for row in self.0 {
            writeln!(
                f,
                "{:<19} {:<12} {:>8} {:>12} {:>8} {:>6} {:<5} {:>12} {:>12} {:<19} {:>14.2}",
                row.fill.timestamp.format("%Y-%m-%d %H:%M:%S"),
                truncate(&row.fill.instrument, 12),
                row.fill.quantity,
                row.fill.price,
                row.position,
                row.trade_id,
                row.side.as_str(),
                opt(row.avg_entry_price.map(|p| p.round_dp(4))),
                money(row.pnl),
                row.pnl_status.as_str(),
                row.cumulative_equity,
            )?;
        }
        Ok(())
    }
}

/// Closed round trips as a text table.
pub struct RoundTripTable<'a>(pub &'a [RoundTrip]);

impl fmt::Display for RoundTripTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:>6} {:<12} {:<5} {:<16} {:<16} {:>5} {:>8} {:>12} {:>12} {:>12} {:>9}",
            "TRADE", "INSTRUMENT", "SIDE", "OPENED", "CLOSED", "FILLS", "VOLUME", "AVG ENTRY", "EXIT", "P&L", "FEES"
        )?;
        writeln!(f, "{}", "-".repeat(124))?;
        for trip in self.0 {
            writeln!(
                f,
                "{:>6} {:<12} {:<5} {:<16} {:<16} {:>5} {:>8} {:>12} {:>12} {:>12} {:>9.2}",
                trip.trade_id,
                truncate(&trip.instrument, 12),
                trip.side.as_str(),
                trip.opened_at.format("%Y-%m-%d %H:%M"),
                trip.closed_at.format("%Y-%m-%d %H:%M"),
                trip.fills,
                trip.entry_volume,
                opt(trip.avg_entry_price.map(|p| p.round_dp(4))),
                trip.close_price,
                if trip.pnl_status.is_unpriced() {
                    trip.pnl_status.as_str().to_string()
                } else {
                    money(trip.pnl)
                },
                trip.fees,
            )?;
        }
        Ok(())
    }
}

/// Instruments ranked by number of realized trades.
pub struct TradeCountTable<'a>(pub &'a [TradeCount]);

impl fmt::Display for TradeCountTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:<14} {:>8}", "INSTRUMENT", "TRADES")?;
        writeln!(f, "{}", "-".repeat(23))?;
        for row in self.0 {
            writeln!(f, "{:<14} {:>8}", truncate(&row.instrument, 14), row.trades)?;
        }
        Ok(())
    }
}

impl fmt::Display for BrokerReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.portfolio)?;
        writeln!(f, "\n--- Instruments ({}) ---", self.instruments.len())?;
        write!(f, "{}", InstrumentTable(&self.instruments))
    }
}
