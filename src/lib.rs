//! Broker trade-execution report engine.
//!
//! Normalizes broker exports into fills, reconstructs flat-to-flat
//! round-trip trades per instrument, and computes PnL, cumulative equity and
//! portfolio / per-instrument performance summaries.

pub mod engine;
pub mod error;
pub mod metrics;
pub mod models;
pub mod normalizer;
pub mod report;

pub use engine::{EngineConfig, PointValueTable, TradeEngine, TradeLedger};
pub use error::{ConfigError, EngineError, NormalizeError, SummaryError};
pub use metrics::SummaryCalculator;
pub use models::{
    EnrichedFill, Fill, InstrumentSummary, PnlStats, PnlStatus, PortfolioSummary, RoundTrip,
    TradeCount, TradeId, TradeSide,
};
pub use normalizer::{detect_format, normalize, ReportFormat};
pub use report::BrokerReport;
