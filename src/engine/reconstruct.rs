//! Trade reconstruction: folds an ordered fill stream into enriched rows.
//!
//! Each instrument carries its own running position and, while a trade is
//! in progress, the entry sums behind its average price. A fill that brings
//! the position back to exactly zero closes the trade; it inherits the
//! average accumulated before it and is the only fill that can carry PnL.
//!
//! Once a trade's position has passed through zero without stopping there,
//! its basis switches to the blend of every fill so far (signed notional
//! over net quantity), which makes the closing PnL equal the trade's cash
//! flow.

use std::collections::HashMap;

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::error::EngineError;
use crate::models::{EnrichedFill, Fill, PnlStatus, TradeId, TradeSide};

use super::config::{instrument_prefix, EngineConfig};

/// Decimal places kept for average entry prices.
pub const PRICE_SCALE: u32 = 10;

/// Decimal places kept for realized PnL and equity.
pub const PNL_SCALE: u32 = 10;

/// Checked arithmetic left the representable range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Overflow;

/// Trade in progress for one instrument.
#[derive(Debug)]
struct OpenTrade {
    side: TradeSide,
    /// Output rows belonging to this trade so far
    members: Vec<usize>,
    /// Sum of |quantity| * price over entry fills
    entry_notional: Decimal,
    /// Sum of |quantity| over entry fills
    entry_volume: Decimal,
    /// Sum of price * quantity over every fill
    net_notional: Decimal,
    /// Sum of quantity over every fill
    net_quantity: Decimal,
    /// Position has changed sign without flattening
    crossed: bool,
}

impl OpenTrade {
    fn new(side: TradeSide) -> Self {
        Self {
            side,
            members: Vec::new(),
            entry_notional: Decimal::ZERO,
            entry_volume: Decimal::ZERO,
            net_notional: Decimal::ZERO,
            net_quantity: Decimal::ZERO,
            crossed: false,
        }
    }

    fn add(&mut self, quantity: Decimal, price: Decimal) -> Result<(), Overflow> {
        let signed = price.checked_mul(quantity).ok_or(Overflow)?;
        self.net_notional = self.net_notional.checked_add(signed).ok_or(Overflow)?;
        self.net_quantity = self.net_quantity.checked_add(quantity).ok_or(Overflow)?;

        if self.side.is_entry(quantity) {
            let size = quantity.abs();
            let notional = size.checked_mul(price).ok_or(Overflow)?;
            self.entry_notional = self.entry_notional.checked_add(notional).ok_or(Overflow)?;
            self.entry_volume = self.entry_volume.checked_add(size).ok_or(Overflow)?;
        }
        Ok(())
    }

    fn average_price(&self) -> Result<Option<Decimal>, Overflow> {
        let (notional, volume) = if self.crossed {
            (self.net_notional, self.net_quantity)
        } else {
            (self.entry_notional, self.entry_volume)
        };
        if volume.is_zero() {
            return Ok(None);
        }
        notional
            .checked_div(volume)
            .map(|avg| Some(avg.round_dp(PRICE_SCALE)))
            .ok_or(Overflow)
    }

    /// PnL of the fill that flattens this trade. `None` on overflow.
    fn close_pnl(&self, fill: &Fill, avg: Decimal, point_value: Decimal) -> Option<Decimal> {
        let pnl = if self.crossed {
            // Cash flow of the whole trade: close value of the remaining
            // position less the signed notional already traded.
            fill.price
                .checked_mul(self.net_quantity)?
                .checked_sub(self.net_notional)?
                .checked_mul(point_value)?
        } else {
            realized_pnl(fill.price, fill.quantity, avg, point_value)?
        };
        Some(pnl.round_dp(PNL_SCALE))
    }
}

#[derive(Debug, Default)]
struct InstrumentState {
    position: Decimal,
    last_timestamp: Option<NaiveDateTime>,
    trade: Option<OpenTrade>,
}

/// Realized PnL of a closing fill against the carried average entry price.
///
/// Returns `None` when the result does not fit a `Decimal`.
pub fn realized_pnl(
    close_price: Decimal,
    close_quantity: Decimal,
    avg_entry_price: Decimal,
    point_value: Decimal,
) -> Option<Decimal> {
    close_price
        .checked_sub(avg_entry_price)?
        .checked_mul(-close_quantity)?
        .checked_mul(point_value)
}

fn overflow(index: usize, fill: &Fill) -> EngineError {
    EngineError::Overflow {
        index,
        instrument: fill.instrument.clone(),
    }
}

/// Single-pass grouping state machine.
pub(crate) struct Reconstructor<'a> {
    config: &'a EngineConfig,
    states: HashMap<String, InstrumentState>,
    rows: Vec<EnrichedFill>,
    next_trade_id: TradeId,
    equity: Decimal,
}

impl<'a> Reconstructor<'a> {
    pub(crate) fn new(config: &'a EngineConfig, capacity: usize) -> Self {
        Self {
            config,
            states: HashMap::new(),
            rows: Vec::with_capacity(capacity),
            next_trade_id: 0,
            equity: config.initial_capital,
        }
    }

    /// Fold one fill. Fills must arrive in merged input order.
    pub(crate) fn push(&mut self, fill: &Fill) -> Result<(), EngineError> {
        let index = self.rows.len();

        if fill.price <= Decimal::ZERO {
            return Err(EngineError::NonPositivePrice {
                index,
                instrument: fill.instrument.clone(),
                price: fill.price,
            });
        }

        let state = self.states.entry(fill.instrument.clone()).or_default();

        if let Some(last) = state.last_timestamp {
            if fill.timestamp < last {
                return Err(EngineError::OutOfOrder {
                    index,
                    instrument: fill.instrument.clone(),
                });
            }
        }

        let previous = state.position;
        let position = previous
            .checked_add(fill.quantity)
            .ok_or_else(|| overflow(index, fill))?;
        state.last_timestamp = Some(fill.timestamp);
        state.position = position;

        let trade = state
            .trade
            .get_or_insert_with(|| OpenTrade::new(TradeSide::from_opening_position(position)));
        trade.members.push(index);

        if !position.is_zero() {
            trade
                .add(fill.quantity, fill.price)
                .map_err(|_| overflow(index, fill))?;

            if !previous.is_zero() && previous.is_sign_negative() != position.is_sign_negative() {
                warn!(
                    instrument = %fill.instrument,
                    index,
                    from = %previous,
                    to = %position,
                    "Position crossed zero without flattening; trade continues"
                );
                trade.crossed = true;
            }

            let avg_entry_price = trade.average_price().map_err(|_| overflow(index, fill))?;
            let side = trade.side;

            self.rows.push(EnrichedFill {
                fill: fill.clone(),
                position,
                trade_id: 0,
                side,
                avg_entry_price,
                pnl: None,
                pnl_status: PnlStatus::Open,
                cumulative_equity: self.equity,
            });
            return Ok(());
        }

        // Closing fill: the average is carried from the fills before it.
        let Some(trade) = state.trade.take() else {
            return Ok(());
        };
        let avg_entry_price = trade.average_price().map_err(|_| overflow(index, fill))?;

        let (pnl, pnl_status) = match avg_entry_price {
            None => (None, PnlStatus::NoEntryBasis),
            Some(avg) => match self.config.point_values.lookup(&fill.instrument) {
                Ok(point_value) => {
                    let priced = trade
                        .close_pnl(fill, avg, point_value)
                        .and_then(|pnl| self.equity.checked_add(pnl).map(|equity| (pnl, equity)));
                    match priced {
                        Some((pnl, equity)) => {
                            self.equity = equity;
                            (Some(pnl), PnlStatus::Realized)
                        }
                        None => {
                            warn!(instrument = %fill.instrument, index, "Trade PnL overflowed; left unpriced");
                            (None, PnlStatus::Overflow)
                        }
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Trade left unpriced");
                    (None, PnlStatus::UnknownPointValue)
                }
            },
        };

        let trade_id = self.next_trade_id;
        self.next_trade_id += 1;

        for &member in &trade.members {
            if let Some(row) = self.rows.get_mut(member) {
                row.trade_id = trade_id;
                row.pnl_status = PnlStatus::Interim;
            }
        }

        debug!(
            trade_id,
            instrument = %fill.instrument,
            side = trade.side.as_str(),
            fills = trade.members.len(),
            crossed = trade.crossed,
            avg_entry = ?avg_entry_price,
            pnl = ?pnl,
            status = pnl_status.as_str(),
            "Closed trade"
        );

        self.rows.push(EnrichedFill {
            fill: fill.clone(),
            position,
            trade_id,
            side: trade.side,
            avg_entry_price,
            pnl,
            pnl_status,
            cumulative_equity: self.equity,
        });

        Ok(())
    }

    /// Number open trades after all closed ones, in order of their first
    /// fill, and return the finished rows.
    pub(crate) fn finish(mut self) -> Vec<EnrichedFill> {
        let mut open: Vec<OpenTrade> = self
            .states
            .into_values()
            .filter_map(|state| state.trade)
            .collect();
        open.sort_by_key(|trade| trade.members.first().copied().unwrap_or(usize::MAX));

        for trade in open {
            let trade_id = self.next_trade_id;
            self.next_trade_id += 1;

            if let Some(&first) = trade.members.first() {
                if let Some(row) = self.rows.get(first) {
                    debug!(
                        trade_id,
                        instrument = %row.fill.instrument,
                        prefix = %instrument_prefix(&row.fill.instrument),
                        fills = trade.members.len(),
                        "Trade still open at end of report"
                    );
                }
            }

            for &member in &trade.members {
                if let Some(row) = self.rows.get_mut(member) {
                    row.trade_id = trade_id;
                }
            }
        }

        self.rows
    }
}
