//! Trade & statistics engine: reconstructs trades from fills and keeps the
//! enriched per-fill ledger that every summary is computed from.

mod config;
mod reconstruct;

use std::collections::{HashMap, HashSet};

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use tracing::info;

use crate::error::EngineError;
use crate::models::{EnrichedFill, Fill, PnlStatus, RoundTrip, TradeId};

pub use config::{instrument_prefix, EngineConfig, PointValueTable, PREFIX_LEN};
pub use reconstruct::{realized_pnl, PNL_SCALE, PRICE_SCALE};

use reconstruct::Reconstructor;

/// Engine bound to one configuration. Cheap to reuse across reports.
#[derive(Debug, Clone, Default)]
pub struct TradeEngine {
    config: EngineConfig,
}

impl TradeEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Enrich every fill with position, trade grouping, average entry price,
    /// realized PnL and cumulative equity.
    ///
    /// Fills of different instruments may interleave; each instrument's
    /// sub-sequence must be chronological. Output order equals input order.
    pub fn run(&self, fills: &[Fill]) -> Result<TradeLedger, EngineError> {
        info!(fills = fills.len(), "Reconstructing trades");

        let mut machine = Reconstructor::new(&self.config, fills.len());
        for fill in fills {
            machine.push(fill)?;
        }
        let ledger = TradeLedger {
            initial_capital: self.config.initial_capital,
            fills: machine.finish(),
        };

        info!(
            closed = ledger.closed_trades(),
            open = ledger.open_trades(),
            unpriced = ledger.unpriced_trades(),
            final_equity = %ledger.final_equity(),
            "Trade reconstruction complete"
        );

        Ok(ledger)
    }
}

/// Enriched fill table plus the capital it was computed against.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeLedger {
    pub initial_capital: Decimal,
    pub fills: Vec<EnrichedFill>,
}

impl TradeLedger {
    pub fn is_empty(&self) -> bool {
        self.fills.is_empty()
    }

    /// Realized PnL values in input order.
    pub fn realized_pnls(&self) -> Vec<Decimal> {
        self.fills.iter().filter_map(|f| f.pnl).collect()
    }

    /// Equity after the last fill.
    pub fn final_equity(&self) -> Decimal {
        self.fills
            .last()
            .map(|f| f.cumulative_equity)
            .unwrap_or(self.initial_capital)
    }

    /// Distinct instruments in order of first appearance.
    pub fn instruments(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.fills
            .iter()
            .map(|f| f.fill.instrument.as_str())
            .filter(|i| seen.insert(*i))
            .collect()
    }

    pub fn closed_trades(&self) -> usize {
        self.fills.iter().filter(|f| f.is_closing()).count()
    }

    pub fn unpriced_trades(&self) -> usize {
        self.fills
            .iter()
            .filter(|f| f.pnl_status.is_unpriced())
            .count()
    }

    pub fn open_trades(&self) -> usize {
        self.fills
            .iter()
            .filter(|f| f.pnl_status == PnlStatus::Open)
            .map(|f| f.trade_id)
            .collect::<HashSet<TradeId>>()
            .len()
    }

    /// Starting capital followed by the equity after each closing fill.
    pub fn equity_curve(&self) -> Vec<(Option<NaiveDateTime>, Decimal)> {
        std::iter::once((None, self.initial_capital))
            .chain(
                self.fills
                    .iter()
                    .filter(|f| f.is_closing())
                    .map(|f| (Some(f.fill.timestamp), f.cumulative_equity)),
            )
            .collect()
    }

    /// Collapse closed trades into one row each, ordered by trade id.
    pub fn round_trips(&self) -> Vec<RoundTrip> {
        let mut trips = Vec::new();
        let mut pending: HashMap<TradeId, Vec<&EnrichedFill>> = HashMap::new();

        for row in &self.fills {
            if row.pnl_status == PnlStatus::Open {
                continue;
            }
            let members = pending.entry(row.trade_id).or_default();
            members.push(row);

            if !row.is_closing() {
                continue;
            }
            let Some(members) = pending.remove(&row.trade_id) else {
                continue;
            };
            let opened_at = members
                .first()
                .map(|f| f.fill.timestamp)
                .unwrap_or(row.fill.timestamp);

            trips.push(RoundTrip {
                trade_id: row.trade_id,
                instrument: row.fill.instrument.clone(),
                side: row.side,
                opened_at,
                closed_at: row.fill.timestamp,
                fills: members.len(),
                entry_volume: members
                    .iter()
                    .filter(|f| row.side.is_entry(f.fill.quantity))
                    .map(|f| f.fill.quantity.abs())
                    .sum(),
                avg_entry_price: row.avg_entry_price,
                close_price: row.fill.price,
                close_quantity: row.fill.quantity,
                pnl: row.pnl,
                pnl_status: row.pnl_status,
                fees: members.iter().map(|f| f.fill.fee).sum(),
            });
        }

        trips.sort_by_key(|t| t.trade_id);
        trips
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    use crate::models::TradeSide;

    fn t0() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 2, 5)
            .and_then(|d| d.and_hms_opt(10, 0, 0))
            .unwrap()
    }

    fn leg(instrument: &str, minute: i64, qty: Decimal, price: Decimal) -> Fill {
        Fill::new(instrument, t0() + Duration::minutes(minute), qty, price)
    }

    fn unit_engine() -> TradeEngine {
        TradeEngine::new(EngineConfig::new(
            dec!(100000),
            PointValueTable::new().with("si", dec!(1)).with("br", dec!(700)),
        ))
    }

    #[test]
    fn test_simple_round_trip() {
        let ledger = unit_engine()
            .run(&[
                leg("SiH4", 0, dec!(10), dec!(100)),
                leg("SiH4", 1, dec!(-10), dec!(110)),
            ])
            .unwrap();

        let close = &ledger.fills[1];
        assert_eq!(ledger.fills[0].trade_id, close.trade_id);
        assert_eq!(close.side, TradeSide::Long);
        assert_eq!(close.avg_entry_price, Some(dec!(100)));
        assert_eq!(close.pnl, Some(dec!(100)));
        assert_eq!(ledger.fills[0].pnl, None);
        assert_eq!(ledger.final_equity(), dec!(100100));
    }

    #[test]
    fn test_partial_close_then_extend_is_one_trade() {
        let ledger = unit_engine()
            .run(&[
                leg("SiH4", 0, dec!(10), dec!(100)),
                leg("SiH4", 1, dec!(-4), dec!(90)),
                leg("SiH4", 2, dec!(6), dec!(110)),
                leg("SiH4", 3, dec!(-12), dec!(120)),
            ])
            .unwrap();

        assert!(ledger.fills.iter().all(|f| f.trade_id == 0));
        assert_eq!(ledger.closed_trades(), 1);

        // The -4 reduction does not move the average
        assert_eq!(ledger.fills[1].avg_entry_price, Some(dec!(100)));
        // (10 * 100 + 6 * 110) / 16
        assert_eq!(ledger.fills[2].avg_entry_price, Some(dec!(103.75)));
        assert_eq!(ledger.fills[3].avg_entry_price, Some(dec!(103.75)));
        assert_eq!(ledger.fills[3].pnl, Some(dec!(195)));
    }

    #[test]
    fn test_closing_fill_never_moves_average() {
        let ledger = unit_engine()
            .run(&[
                leg("SiH4", 0, dec!(2), dec!(100)),
                leg("SiH4", 1, dec!(3), dec!(105)),
                leg("SiH4", 2, dec!(-5), dec!(1000000)),
            ])
            .unwrap();

        assert_eq!(ledger.fills[1].avg_entry_price, Some(dec!(103)));
        assert_eq!(ledger.fills[2].avg_entry_price, Some(dec!(103)));
    }

    #[test]
    fn test_interleaved_instruments_are_independent() {
        let ledger = unit_engine()
            .run(&[
                leg("SiH4", 0, dec!(1), dec!(90000)),
                leg("BRJ4", 1, dec!(-2), dec!(80)),
                leg("SiH4", 2, dec!(-1), dec!(90100)),
                leg("BRJ4", 3, dec!(2), dec!(79.5)),
            ])
            .unwrap();

        let pnls = ledger.realized_pnls();
        assert_eq!(pnls, vec![dec!(100), dec!(700)]);
        assert_eq!(ledger.fills[2].trade_id, 0);
        assert_eq!(ledger.fills[3].trade_id, 1);
        assert_eq!(ledger.fills[1].side, TradeSide::Short);
        assert_eq!(ledger.fills[3].cumulative_equity, dec!(100800));
        assert_eq!(ledger.instruments(), vec!["SiH4", "BRJ4"]);
    }

    #[test]
    fn test_unknown_point_value_does_not_abort() {
        let ledger = unit_engine()
            .run(&[
                leg("BTCUSDT", 0, dec!(1), dec!(40000)),
                leg("SiH4", 1, dec!(1), dec!(100)),
                leg("BTCUSDT", 2, dec!(-1), dec!(41000)),
                leg("SiH4", 3, dec!(-1), dec!(101)),
            ])
            .unwrap();

        assert_eq!(ledger.fills[2].pnl, None);
        assert_eq!(ledger.fills[2].pnl_status, PnlStatus::UnknownPointValue);
        assert_eq!(ledger.fills[2].avg_entry_price, Some(dec!(40000)));
        assert_eq!(ledger.fills[3].pnl, Some(dec!(1)));
        assert_eq!(ledger.unpriced_trades(), 1);
        assert_eq!(ledger.final_equity(), dec!(100001));
    }

    #[test]
    fn test_open_trade_is_distinct_from_unpriced() {
        let ledger = unit_engine()
            .run(&[
                leg("SiH4", 0, dec!(3), dec!(100)),
                leg("SiH4", 1, dec!(2), dec!(106)),
            ])
            .unwrap();

        assert!(ledger.fills.iter().all(|f| f.pnl_status == PnlStatus::Open));
        assert_eq!(ledger.fills[1].avg_entry_price, Some(dec!(102.4)));
        assert_eq!(ledger.open_trades(), 1);
        assert_eq!(ledger.unpriced_trades(), 0);
        assert!(ledger.round_trips().is_empty());
    }

    #[test]
    fn test_round_trips_and_equity_curve() {
        let ledger = unit_engine()
            .run(&[
                leg("SiH4", 0, dec!(2), dec!(100)).with_fee(dec!(1)),
                leg("SiH4", 1, dec!(-1), dec!(90)).with_fee(dec!(0.5)),
                leg("SiH4", 2, dec!(-1), dec!(95)).with_fee(dec!(0.5)),
                leg("SiH4", 3, dec!(-1), dec!(95)),
                leg("SiH4", 4, dec!(1), dec!(97)),
            ])
            .unwrap();

        let trips = ledger.round_trips();
        assert_eq!(trips.len(), 2);

        assert_eq!(trips[0].fills, 3);
        assert_eq!(trips[0].entry_volume, dec!(2));
        assert_eq!(trips[0].pnl, Some(dec!(-5)));
        assert_eq!(trips[0].fees, dec!(2));
        assert_eq!(trips[0].opened_at, t0());

        assert_eq!(trips[1].side, TradeSide::Short);
        assert_eq!(trips[1].pnl, Some(dec!(-2)));

        let curve = ledger.equity_curve();
        assert_eq!(curve.len(), 3);
        assert_eq!(curve[0], (None, dec!(100000)));
        assert_eq!(curve[2].1, dec!(99993));
    }

    #[test]
    fn test_equity_is_exact_with_repeating_averages() {
        let ledger = TradeEngine::new(EngineConfig::new(
            dec!(69173.33),
            PointValueTable::new().with("si", dec!(1)).with("br", dec!(700)),
        ))
        .run(&[
            leg("BRJ4", 0, dec!(1), dec!(7)),
            leg("SiH4", 1, dec!(2), dec!(10)),
            leg("BRJ4", 2, dec!(2), dec!(8)),
            leg("SiH4", 3, dec!(1), dec!(11)),
            leg("BRJ4", 4, dec!(-3), dec!(9)),
            leg("SiH4", 5, dec!(-3), dec!(12)),
        ])
        .unwrap();

        // BR average 23 / 3, Si average 31 / 3, both cut to ten places
        assert_eq!(ledger.fills[4].avg_entry_price, Some(dec!(7.6666666667)));
        assert_eq!(ledger.fills[5].avg_entry_price, Some(dec!(10.3333333333)));

        let total: Decimal = ledger.realized_pnls().iter().copied().sum();
        assert_eq!(ledger.final_equity(), ledger.initial_capital + total);
        assert_eq!(ledger.fills[4].pnl, Some(dec!(2799.999999930)));
    }

    #[test]
    fn test_empty_input() {
        let ledger = unit_engine().run(&[]).unwrap();

        assert!(ledger.is_empty());
        assert_eq!(ledger.final_equity(), dec!(100000));
        assert_eq!(ledger.equity_curve().len(), 1);
    }

    fn arb_fills() -> impl Strategy<Value = Vec<Fill>> {
        prop::collection::vec(
            (0usize..3, -5i64..=5, 1i64..200),
            0..60,
        )
        .prop_map(|legs| {
            legs.into_iter()
                .enumerate()
                .map(|(i, (inst, qty, price))| {
                    let instrument = ["SiH4", "BRJ4", "XXZ4"][inst];
                    leg(instrument, i as i64, Decimal::from(qty), Decimal::from(price))
                })
                .collect()
        })
    }

    proptest! {
        #[test]
        fn prop_closed_trades_sum_to_zero(fills in arb_fills()) {
            let ledger = unit_engine().run(&fills).unwrap();
            prop_assert_eq!(ledger.fills.len(), fills.len());

            for trip in ledger.round_trips() {
                let total: Decimal = ledger
                    .fills
                    .iter()
                    .filter(|f| f.trade_id == trip.trade_id)
                    .map(|f| f.fill.quantity)
                    .sum();
                prop_assert_eq!(total, Decimal::ZERO);
            }
        }

        #[test]
        fn prop_trade_ids_and_sides_are_consistent(fills in arb_fills()) {
            let ledger = unit_engine().run(&fills).unwrap();

            for instrument in ledger.instruments() {
                let rows: Vec<_> = ledger
                    .fills
                    .iter()
                    .filter(|f| f.fill.instrument == instrument)
                    .collect();
                for pair in rows.windows(2) {
                    prop_assert!(pair[0].trade_id <= pair[1].trade_id);
                    if pair[0].trade_id == pair[1].trade_id {
                        prop_assert_eq!(pair[0].side, pair[1].side);
                    }
                }
            }

            let distinct: HashSet<TradeId> = ledger.fills.iter().map(|f| f.trade_id).collect();
            prop_assert_eq!(
                distinct.len(),
                ledger.closed_trades() + ledger.open_trades()
            );
        }

        #[test]
        fn prop_equity_tracks_realized_pnl(fills in arb_fills()) {
            let ledger = unit_engine().run(&fills).unwrap();
            let total: Decimal = ledger.realized_pnls().iter().copied().sum();

            prop_assert_eq!(ledger.final_equity(), ledger.initial_capital + total);
            prop_assert!(ledger
                .fills
                .iter()
                .filter(|f| f.fill.instrument == "XXZ4")
                .all(|f| f.pnl.is_none()));
        }
    }
}
