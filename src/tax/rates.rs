use chrono::NaiveDate;
use rust_decimal::Decimal;

/// A single published exchange rate (local currency per unit of foreign currency)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateObservation {
    pub date: NaiveDate,
    pub rate: Decimal,
}

impl RateObservation {
    pub fn new(date: NaiveDate, rate: Decimal) -> Self {
        RateObservation { date, rate }
    }
}

/// Date-indexed exchange rate table.
///
/// Lookups are backward looking: a transaction on day D is converted with the
/// most recent rate published *before* D, never the rate of D itself.
#[derive(Debug, Clone, Default)]
pub struct RateTable {
    observations: Vec<RateObservation>,
}

impl RateTable {
    /// Builds the table, ordering observations by date. When a date occurs
    /// more than once the value read last wins.
    pub fn new(mut observations: Vec<RateObservation>) -> Self {
        observations.sort_by_key(|o| o.date);
        let mut deduped: Vec<RateObservation> = Vec::with_capacity(observations.len());
        for obs in observations {
            match deduped.last_mut() {
                Some(last) if last.date == obs.date => *last = obs,
                _ => deduped.push(obs),
            }
        }
        RateTable {
            observations: deduped,
        }
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.observations.first().map(|o| o.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.observations.last().map(|o| o.date)
    }

    /// Rate of the last observation strictly before `date`.
    ///
    /// Returns `None` when no observation precedes `date`, or when no
    /// observation falls on or after it (the table does not cover `date`).
    pub fn rate_as_of(&self, date: NaiveDate) -> Option<Decimal> {
        let idx = self.observations.partition_point(|o| o.date < date);
        if idx == 0 || idx == self.observations.len() {
            None
        } else {
            Some(self.observations[idx - 1].rate)
        }
    }
}
