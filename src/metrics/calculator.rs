//! Calculator for trade performance summaries: win rate, profit factor,
//! expectancy and drawdown.

use std::collections::HashMap;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tracing::debug;

use crate::engine::TradeLedger;
use crate::error::SummaryError;
use crate::models::{InstrumentSummary, PnlStats, PnlStatus, PortfolioSummary, TradeId};

/// Calculator for portfolio and per-instrument summaries.
pub struct SummaryCalculator;

impl SummaryCalculator {
    /// Reduce a set of realized PnL values.
    pub fn pnl_stats(pnls: &[Decimal]) -> PnlStats {
        let (wins, losses): (Vec<Decimal>, Vec<Decimal>) =
            pnls.iter().partition(|&&p| p > Decimal::ZERO);

        let avg_profit = mean(&wins);
        let avg_loss = mean(&losses);

        let win_rate = Self::win_rate(pnls).ok();

        let profit_factor = match (avg_profit, avg_loss) {
            (Some(profit), Some(loss)) => profit
                .checked_div(loss)
                .and_then(|ratio| ratio.abs().to_f64()),
            _ => None,
        };

        PnlStats {
            total_pnl: pnls.iter().copied().sum(),
            count: pnls.len(),
            winning_trades: wins.len(),
            losing_trades: losses.len(),
            avg_profit,
            avg_loss,
            win_rate,
            profit_factor,
        }
    }

    /// Share of strictly positive values.
    pub fn win_rate(pnls: &[Decimal]) -> Result<f64, SummaryError> {
        if pnls.is_empty() {
            return Err(SummaryError::EmptyInputSet);
        }
        let wins = pnls.iter().filter(|&&p| p > Decimal::ZERO).count();
        Ok(wins as f64 / pnls.len() as f64)
    }

    /// Portfolio-level expected value: `1 + win_rate * profit_factor`.
    ///
    /// This is not the conventional expectancy (see
    /// [`Self::expected_avg_value`]); both are reported as-is.
    pub fn expected_value(stats: &PnlStats) -> Option<f64> {
        stats
            .win_rate
            .zip(stats.profit_factor)
            .map(|(win_rate, profit_factor)| 1.0 + win_rate * profit_factor)
    }

    /// Per-instrument expectancy:
    /// `(1 - win_rate) * avg_loss + win_rate * avg_profit`.
    ///
    /// Undefined when there are no winners or no losers.
    pub fn expected_avg_value(stats: &PnlStats) -> Option<Decimal> {
        if stats.count == 0 {
            return None;
        }
        let win_rate = Decimal::from(stats.winning_trades) / Decimal::from(stats.count);
        let (profit, loss) = stats.avg_profit.zip(stats.avg_loss)?;
        Some((Decimal::ONE - win_rate) * loss + win_rate * profit)
    }

    /// Maximum peak-to-trough decline of an equity series, in percent of
    /// the running peak. Points are skipped while the peak is not positive.
    pub fn max_drawdown_pct(equity: &[Decimal]) -> Option<f64> {
        let mut peak: Option<Decimal> = None;
        let mut max_dd: Option<f64> = None;

        for &value in equity {
            let running = match peak {
                Some(p) if p >= value => p,
                _ => value,
            };
            peak = Some(running);

            if running <= Decimal::ZERO {
                continue;
            }
            let dd = ((running - value) / running * Decimal::ONE_HUNDRED)
                .to_f64()
                .unwrap_or(0.0);
            max_dd = Some(max_dd.map_or(dd, |m: f64| m.max(dd)));
        }

        max_dd
    }

    /// Summary over every realized trade in the ledger.
    pub fn portfolio(ledger: &TradeLedger) -> PortfolioSummary {
        let stats = Self::pnl_stats(&ledger.realized_pnls());

        let equity: Vec<Decimal> = std::iter::once(ledger.initial_capital)
            .chain(ledger.fills.iter().map(|f| f.cumulative_equity))
            .collect();

        debug!(trades = stats.count, total_pnl = %stats.total_pnl, "Computed portfolio summary");

        PortfolioSummary {
            expected_value: Self::expected_value(&stats),
            max_drawdown_pct: Self::max_drawdown_pct(&equity),
            initial_capital: ledger.initial_capital,
            final_equity: ledger.final_equity(),
            total_fees: ledger.fills.iter().map(|f| f.fill.fee).sum(),
            open_trades: ledger.open_trades(),
            unpriced_trades: ledger.unpriced_trades(),
            stats,
        }
    }

    /// One summary per instrument, in order of first appearance.
    ///
    /// Use [`super::sort_by_total_pnl`] for the presentation order.
    pub fn per_instrument(ledger: &TradeLedger) -> Vec<InstrumentSummary> {
        #[derive(Default)]
        struct Acc {
            pnls: Vec<Decimal>,
            fees: Decimal,
            position: Decimal,
            open_ids: Vec<TradeId>,
            unpriced: usize,
        }

        let mut by_instrument: HashMap<&str, Acc> = HashMap::new();
        for row in &ledger.fills {
            let acc = by_instrument.entry(row.fill.instrument.as_str()).or_default();
            acc.fees += row.fill.fee;
            acc.position = row.position;
            if let Some(pnl) = row.pnl {
                acc.pnls.push(pnl);
            }
            if row.pnl_status.is_unpriced() {
                acc.unpriced += 1;
            }
            if row.pnl_status == PnlStatus::Open && !acc.open_ids.contains(&row.trade_id) {
                acc.open_ids.push(row.trade_id);
            }
        }

        ledger
            .instruments()
            .into_iter()
            .filter_map(|instrument| {
                let acc = by_instrument.remove(instrument)?;
                let stats = Self::pnl_stats(&acc.pnls);
                Some(InstrumentSummary {
                    instrument: instrument.to_string(),
                    expected_avg_value: Self::expected_avg_value(&stats),
                    total_fees: acc.fees,
                    position: acc.position,
                    open_trades: acc.open_ids.len(),
                    unpriced_trades: acc.unpriced,
                    stats,
                })
            })
            .collect()
    }
}

fn mean(values: &[Decimal]) -> Option<Decimal> {
    if values.is_empty() {
        return None;
    }
    let sum: Decimal = values.iter().sum();
    Some(sum / Decimal::from(values.len()))
}
