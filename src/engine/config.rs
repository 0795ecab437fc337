//! Engine configuration: starting capital and the point-value table.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, EngineError};

/// Number of leading characters of an instrument id that select its class.
pub const PREFIX_LEN: usize = 2;

/// Normalized instrument-class prefix: first two characters, lowercased.
pub fn instrument_prefix(instrument: &str) -> String {
    instrument
        .trim()
        .chars()
        .take(PREFIX_LEN)
        .flat_map(char::to_lowercase)
        .collect()
}

/// Monetary value of one unit of price movement, per instrument class.
///
/// Keys are normalized prefixes (see [`instrument_prefix`]). Instruments whose
/// prefix is missing have no point value and their trades stay unpriced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, Decimal>", into = "BTreeMap<String, Decimal>")]
pub struct PointValueTable {
    values: BTreeMap<String, Decimal>,
}

impl PointValueTable {
    /// Empty table: every instrument is unpriced until entries are added.
    pub fn new() -> Self {
        Self::default()
    }

    /// Moscow Exchange futures classes used by the derivatives statement:
    /// Si (USD/RUB), BR (Brent), GO (gold), ED (EUR/USD).
    pub fn moex_futures() -> Self {
        Self::new()
            .with("si", dec!(1))
            .with("br", dec!(700))
            .with("go", dec!(70))
            .with("ed", dec!(600))
    }

    /// Add or replace an entry, builder style.
    pub fn with(mut self, prefix: &str, value: Decimal) -> Self {
        self.insert(prefix, value);
        self
    }

    /// Add or replace an entry. The prefix is normalized the same way
    /// instrument ids are.
    pub fn insert(&mut self, prefix: &str, value: Decimal) -> Option<Decimal> {
        self.values.insert(instrument_prefix(prefix), value)
    }

    /// Merge another table over this one; its entries win.
    pub fn extend(&mut self, other: PointValueTable) {
        self.values.extend(other.values);
    }

    /// Point value for an instrument, if its class is configured.
    pub fn get(&self, instrument: &str) -> Option<Decimal> {
        self.values.get(&instrument_prefix(instrument)).copied()
    }

    /// Strict lookup that names the missing prefix.
    pub fn lookup(&self, instrument: &str) -> Result<Decimal, EngineError> {
        let prefix = instrument_prefix(instrument);
        self.values
            .get(&prefix)
            .copied()
            .ok_or_else(|| EngineError::UnknownInstrumentPointValue {
                instrument: instrument.to_string(),
                prefix,
            })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Decimal)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl From<BTreeMap<String, Decimal>> for PointValueTable {
    fn from(raw: BTreeMap<String, Decimal>) -> Self {
        let mut table = Self::new();
        for (prefix, value) in raw {
            table.insert(&prefix, value);
        }
        table
    }
}

impl From<PointValueTable> for BTreeMap<String, Decimal> {
    fn from(table: PointValueTable) -> Self {
        table.values
    }
}

/// Configuration for the trade engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Equity before the first fill; the base for drawdown
    pub initial_capital: Decimal,

    /// Point values by instrument class
    pub point_values: PointValueTable,
}

impl EngineConfig {
    pub fn new(initial_capital: Decimal, point_values: PointValueTable) -> Self {
        Self {
            initial_capital,
            point_values,
        }
    }

    /// Parse a TOML document. Missing keys fall back to [`Default`]; a
    /// `[point_values]` table extends the default classes rather than
    /// replacing them.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        #[derive(Deserialize)]
        #[serde(deny_unknown_fields)]
        struct Partial {
            initial_capital: Option<Decimal>,
            #[serde(default)]
            point_values: Option<PointValueTable>,
            #[serde(default)]
            replace_point_values: bool,
        }

        let partial: Partial = toml::from_str(raw)?;
        let mut config = Self::default();

        if let Some(capital) = partial.initial_capital {
            config = config.with_initial_capital(capital)?;
        }
        if let Some(table) = partial.point_values {
            if partial.replace_point_values {
                config.point_values = table;
            } else {
                config.point_values.extend(table);
            }
        }

        Ok(config)
    }

    /// Override the starting capital. It must be positive for drawdown to
    /// be meaningful.
    pub fn with_initial_capital(mut self, capital: Decimal) -> Result<Self, ConfigError> {
        if capital <= Decimal::ZERO {
            return Err(ConfigError::InvalidValue {
                field: "initial_capital",
                reason: format!("must be positive, got {}", capital),
            });
        }
        self.initial_capital = capital;
        Ok(self)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            initial_capital: dec!(100000),
            point_values: PointValueTable::moex_futures(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_is_case_insensitive() {
        assert_eq!(instrument_prefix("SiH4"), "si");
        assert_eq!(instrument_prefix("BR-3.24"), "br");
        assert_eq!(instrument_prefix(" GOLD-6.24"), "go");
        assert_eq!(instrument_prefix("X"), "x");
    }

    #[test]
    fn test_lookup_known_and_unknown() {
        let table = PointValueTable::moex_futures();

        assert_eq!(table.get("BRJ4"), Some(dec!(700)));
        assert_eq!(table.lookup("edm4"), Ok(dec!(600)));
        assert_eq!(
            table.lookup("BTCUSDT"),
            Err(EngineError::UnknownInstrumentPointValue {
                instrument: "BTCUSDT".to_string(),
                prefix: "bt".to_string(),
            })
        );
    }

    #[test]
    fn test_caller_can_extend_table() {
        let mut table = PointValueTable::moex_futures();
        table.insert("BT", dec!(1));
        table.insert("Si", dec!(10));

        assert_eq!(table.get("BTCUSDT"), Some(dec!(1)));
        assert_eq!(table.get("SiM4"), Some(dec!(10)));
        assert_eq!(table.len(), 5);
    }

    #[test]
    fn test_toml_extends_defaults() {
        let config = EngineConfig::from_toml_str(
            r#"
            initial_capital = 50000

            [point_values]
            RI = 2
            "#,
        )
        .unwrap();

        assert_eq!(config.initial_capital, dec!(50000));
        assert_eq!(config.point_values.get("RIM4"), Some(dec!(2)));
        assert_eq!(config.point_values.get("SiM4"), Some(dec!(1)));
    }

    #[test]
    fn test_toml_can_replace_defaults() {
        let config = EngineConfig::from_toml_str(
            r#"
            replace_point_values = true

            [point_values]
            bt = "0.5"
            "#,
        )
        .unwrap();

        assert_eq!(config.initial_capital, dec!(100000));
        assert_eq!(config.point_values.len(), 1);
        assert_eq!(config.point_values.get("SiM4"), None);
    }

    #[test]
    fn test_rejects_non_positive_capital() {
        assert!(EngineConfig::from_toml_str("initial_capital = 0").is_err());
        assert!(EngineConfig::from_toml_str("unknown = 1").is_err());
    }
}
