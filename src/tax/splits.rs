use chrono::NaiveDate;
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Read;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SplitError {
    #[error("split ratio must be at least 2, got {ratio} for {security} on {date}")]
    InvalidRatio {
        security: String,
        date: NaiveDate,
        ratio: u32,
    },
    #[error("split on {0} has an empty security id")]
    MissingSecurity(NaiveDate),
}

/// A forward stock split, e.g. ratio 4 turns every share into four.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SplitEvent {
    /// Ticker of the security being split (e.g. "AAPL")
    pub security: String,
    /// Date the split takes effect; transactions before it are restated
    pub date: NaiveDate,
    /// New shares per old share (at least 2)
    pub ratio: u32,
}

/// Split configuration file root
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct SplitConfig {
    #[serde(default)]
    pub splits: Vec<SplitEvent>,
}

impl SplitConfig {
    pub fn read_json<R: Read>(reader: R) -> anyhow::Result<SplitConfig> {
        let config: SplitConfig = serde_json::from_reader(reader)?;
        Ok(config)
    }
}

/// Split history per security, used to restate historical share counts in
/// current share units.
#[derive(Debug, Clone, Default)]
pub struct SplitTable {
    splits: BTreeMap<String, Vec<SplitEvent>>,
}

impl SplitTable {
    pub fn new(events: Vec<SplitEvent>) -> Result<Self, SplitError> {
        let mut splits: BTreeMap<String, Vec<SplitEvent>> = BTreeMap::new();
        for event in events {
            if event.security.trim().is_empty() {
                return Err(SplitError::MissingSecurity(event.date));
            }
            if event.ratio < 2 {
                return Err(SplitError::InvalidRatio {
                    security: event.security,
                    date: event.date,
                    ratio: event.ratio,
                });
            }
            splits.entry(event.security.clone()).or_default().push(event);
        }
        for events in splits.values_mut() {
            events.sort_by_key(|e| e.date);
        }
        Ok(SplitTable { splits })
    }

    pub fn from_config(config: SplitConfig) -> Result<Self, SplitError> {
        Self::new(config.splits)
    }

    pub fn event_count(&self) -> usize {
        self.splits.values().map(Vec::len).sum()
    }

    /// Product of the ratios of every split of `security` that takes effect
    /// after `as_of`. A transaction dated on the split day is already in
    /// post-split units.
    pub fn multiplier(&self, security: &str, as_of: NaiveDate) -> Decimal {
        self.splits
            .get(security)
            .map(|events| {
                events
                    .iter()
                    .filter(|e| e.date > as_of)
                    .fold(Decimal::ONE, |acc, e| acc * Decimal::from(e.ratio))
            })
            .unwrap_or(Decimal::ONE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn split(security: &str, d: &str, ratio: u32) -> SplitEvent {
        SplitEvent {
            security: security.to_string(),
            date: date(d),
            ratio,
        }
    }

    #[test]
    fn no_history_means_no_adjustment() {
        let table = SplitTable::new(vec![split("AAPL", "2020-08-28", 4)]).unwrap();
        assert_eq!(table.multiplier("MSFT", date("2010-01-01")), Decimal::ONE);
        assert_eq!(SplitTable::default().multiplier("AAPL", date("2010-01-01")), Decimal::ONE);
    }

    #[test]
    fn four_for_one_split() {
        let table = SplitTable::new(vec![split("AAPL", "2020-08-28", 4)]).unwrap();
        assert_eq!(table.multiplier("AAPL", date("2020-01-01")), dec!(4));
        assert_eq!(table.multiplier("AAPL", date("2020-08-27")), dec!(4));
        assert_eq!(table.multiplier("AAPL", date("2020-08-28")), dec!(1));
        assert_eq!(table.multiplier("AAPL", date("2020-09-01")), dec!(1));
    }

    #[test]
    fn consecutive_splits_compound() {
        let table = SplitTable::new(vec![
            split("TSLA", "2022-08-25", 3),
            split("TSLA", "2020-08-31", 5),
        ])
        .unwrap();
        assert_eq!(table.multiplier("TSLA", date("2020-01-01")), dec!(15));
        assert_eq!(table.multiplier("TSLA", date("2021-01-01")), dec!(3));
        assert_eq!(table.multiplier("TSLA", date("2023-01-01")), dec!(1));
        assert_eq!(table.event_count(), 2);
    }

    #[test]
    fn rejects_ratio_below_two() {
        let err = SplitTable::new(vec![split("AAPL", "2020-08-28", 1)]).unwrap_err();
        assert_eq!(
            err,
            SplitError::InvalidRatio {
                security: "AAPL".to_string(),
                date: date("2020-08-28"),
                ratio: 1,
            }
        );
    }

    #[test]
    fn rejects_empty_security() {
        let err = SplitTable::new(vec![split(" ", "2020-08-28", 2)]).unwrap_err();
        assert_eq!(err, SplitError::MissingSecurity(date("2020-08-28")));
    }

    #[test]
    fn reads_json_config() {
        let json = r#"{"splits": [{"security": "AAPL", "date": "2020-08-28", "ratio": 4}]}"#;
        let config = SplitConfig::read_json(json.as_bytes()).unwrap();
        let table = SplitTable::from_config(config).unwrap();
        assert_eq!(table.multiplier("AAPL", date("2019-05-01")), dec!(4));
    }

    #[test]
    fn empty_config_object_is_valid() {
        let config = SplitConfig::read_json("{}".as_bytes()).unwrap();
        assert!(config.splits.is_empty());
    }
}
