//! Summary statistics over the enriched fill ledger.

mod calculator;

use std::cmp::Ordering;

pub use calculator::SummaryCalculator;

use crate::engine::TradeLedger;
use crate::models::{InstrumentSummary, TradeCount};

/// Presentation order: descending total PnL, ties keep their input order.
pub fn sort_by_total_pnl(rows: &mut [InstrumentSummary]) {
    rows.sort_by(|a, b| b.stats.total_pnl.cmp(&a.stats.total_pnl));
}

/// Instruments with the most realized trades, descending; ties by name.
pub fn top_instruments_by_trade_count(ledger: &TradeLedger, limit: usize) -> Vec<TradeCount> {
    let mut counts: Vec<TradeCount> = SummaryCalculator::per_instrument(ledger)
        .into_iter()
        .filter(|row| row.stats.count > 0)
        .map(|row| TradeCount {
            instrument: row.instrument,
            trades: row.stats.count,
        })
        .collect();

    counts.sort_by(|a, b| match b.trades.cmp(&a.trades) {
        Ordering::Equal => a.instrument.cmp(&b.instrument),
        other => other,
    });
    counts.truncate(limit);
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use crate::engine::{EngineConfig, PointValueTable, TradeEngine};
    use crate::models::{Fill, PnlStats};

    fn row(instrument: &str, total: Decimal) -> InstrumentSummary {
        InstrumentSummary {
            instrument: instrument.to_string(),
            stats: PnlStats {
                total_pnl: total,
                ..Default::default()
            },
            expected_avg_value: None,
            total_fees: Decimal::ZERO,
            position: Decimal::ZERO,
            open_trades: 0,
            unpriced_trades: 0,
        }
    }

    #[test]
    fn test_sort_by_total_pnl_descending() {
        let mut rows = vec![
            row("SiM4", dec!(-50)),
            row("BRM4", dec!(300)),
            row("GDM4", dec!(0)),
            row("EDM4", dec!(300)),
        ];
        sort_by_total_pnl(&mut rows);

        let names: Vec<_> = rows.iter().map(|r| r.instrument.as_str()).collect();
        assert_eq!(names, vec!["BRM4", "EDM4", "GDM4", "SiM4"]);
    }

    #[test]
    fn test_top_instruments_by_trade_count() {
        let start = NaiveDate::from_ymd_opt(2024, 5, 2)
            .and_then(|d| d.and_hms_opt(10, 0, 0))
            .unwrap();
        let mut fills = Vec::new();
        let mut minute = 0;
        for (instrument, trips) in [("SiM4", 1), ("BRM4", 3), ("EDM4", 3), ("GOM4", 2)] {
            for _ in 0..trips {
                fills.push(Fill::new(instrument, start + Duration::minutes(minute), dec!(1), dec!(10)));
                fills.push(Fill::new(instrument, start + Duration::minutes(minute + 1), dec!(-1), dec!(11)));
                minute += 2;
            }
        }
        let ledger = TradeEngine::new(EngineConfig::new(dec!(1000), PointValueTable::moex_futures()))
            .run(&fills)
            .unwrap();

        let top = top_instruments_by_trade_count(&ledger, 3);
        let names: Vec<_> = top.iter().map(|c| (c.instrument.as_str(), c.trades)).collect();
        assert_eq!(names, vec![("BRM4", 3), ("EDM4", 3), ("GOM4", 2)]);
    }
}
