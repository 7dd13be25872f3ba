#![expect(
    clippy::module_name_repetitions,
    reason = "The ledger type exposes its domain in the name for clarity"
)]

use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, SecondsFormat, Utc};

/// Text reported when the session never dropped.
const NO_DOWNTIME: &str = "no downtime observed";

/// Append-only record of detected session failures.
///
/// The supervisor appends one timestamp per transport error or abnormal
/// close, always before the retry decision runs. Entries are never cleared;
/// [`DowntimeLedger::summary`] renders the full ordered list once the
/// monitor shuts down.
#[derive(Debug, Default)]
pub struct DowntimeLedger {
    entries: Mutex<Vec<DateTime<Utc>>>,
}

impl DowntimeLedger {
    pub fn record(&self, at: DateTime<Utc>) {
        self.lock().push(at);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Every recorded failure timestamp, in the order observed.
    #[must_use]
    pub fn entries(&self) -> Vec<DateTime<Utc>> {
        self.lock().clone()
    }

    /// Render the shutdown report: either [`NO_DOWNTIME`] or the ordered
    /// failure timestamps joined for display.
    #[must_use]
    pub fn summary(&self) -> String {
        let entries = self.lock();
        if entries.is_empty() {
            NO_DOWNTIME.to_owned()
        } else {
            entries
                .iter()
                .map(|at| at.to_rfc3339_opts(SecondsFormat::Millis, true))
                .collect::<Vec<_>>()
                .join(", ")
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<DateTime<Utc>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone as _;

    use super::*;

    fn stamp(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).single().expect("valid timestamp")
    }

    #[test]
    fn empty_ledger_reports_no_downtime() {
        let ledger = DowntimeLedger::default();
        assert!(ledger.is_empty());
        assert_eq!(ledger.summary(), "no downtime observed");
    }

    #[test]
    fn summary_joins_entries_in_recorded_order() {
        let ledger = DowntimeLedger::default();
        ledger.record(stamp(1_700_000_000));
        ledger.record(stamp(1_700_000_060));

        let summary = ledger.summary();
        assert_eq!(ledger.len(), 2);
        assert_eq!(
            summary,
            "2023-11-14T22:13:20.000Z, 2023-11-14T22:14:20.000Z"
        );
    }

    #[test]
    fn entries_returns_chronological_copies() {
        let ledger = DowntimeLedger::default();
        for secs in [1, 2, 3] {
            ledger.record(stamp(secs));
        }

        let entries = ledger.entries();
        assert_eq!(entries.len(), 3);
        assert!(entries.windows(2).all(|pair| pair[0] <= pair[1]));
    }

    #[test]
    fn summary_does_not_consume_the_ledger() {
        let ledger = DowntimeLedger::default();
        ledger.record(stamp(10));
        assert_eq!(ledger.summary(), ledger.summary());
        assert_eq!(ledger.len(), 1);
    }
}
