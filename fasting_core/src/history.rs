//! History ledger of terminated fasting sessions.
//!
//! The ledger keeps at most one entry per local calendar day: recording a
//! second session on the same day replaces the first. Entries are never
//! deleted. Stored order is insertion order, which readers must not rely
//! on; use [`HistoryLedger::sorted_by_date`] when order matters.

use crate::store::{self, keys, KeyValueStore};
use crate::types::HistoryEntry;
use crate::Result;
use chrono::NaiveDate;

/// Sessions at or below this net duration are not archived
pub const MIN_ARCHIVED_DURATION_MS: i64 = 60_000;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HistoryLedger {
    entries: Vec<HistoryEntry>,
}

impl HistoryLedger {
    pub fn new(entries: Vec<HistoryEntry>) -> Self {
        Self { entries }
    }

    /// Load the ledger, starting empty if the stored copy is missing or corrupt
    pub fn load<S: KeyValueStore + ?Sized>(store: &S) -> Self {
        let entries: Vec<HistoryEntry> =
            store::load_or_else(store, keys::FASTING_HISTORY, Vec::new);
        tracing::debug!("Loaded {} history entries", entries.len());
        Self { entries }
    }

    pub fn save<S: KeyValueStore + ?Sized>(&self, store: &mut S) -> Result<()> {
        store::save_record(store, keys::FASTING_HISTORY, &self.entries)
    }

    /// Upsert by date: replace the entry for `entry.date` or append.
    ///
    /// Returns the entry that was replaced, if any.
    pub fn record(&mut self, entry: HistoryEntry) -> Option<HistoryEntry> {
        match self.entries.iter_mut().find(|e| e.date == entry.date) {
            Some(existing) => {
                tracing::debug!("Replacing history entry for {}", entry.date);
                Some(std::mem::replace(existing, entry))
            }
            None => {
                tracing::debug!("Appending history entry for {}", entry.date);
                self.entries.push(entry);
                None
            }
        }
    }

    /// Entries in stored order
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    /// Entries sorted by date, newest first
    pub fn sorted_by_date(&self) -> Vec<&HistoryEntry> {
        let mut sorted: Vec<_> = self.entries.iter().collect();
        sorted.sort_by(|a, b| b.date.cmp(&a.date));
        sorted
    }

    pub fn entry_for(&self, date: NaiveDate) -> Option<&HistoryEntry> {
        self.entries.iter().find(|e| e.date == date)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::from_millis;
    use crate::store::MemoryStore;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn entry(date: NaiveDate, duration: i64, completed: bool) -> HistoryEntry {
        HistoryEntry {
            date,
            start_time: from_millis(0),
            end_time: from_millis(duration),
            duration,
            plan_id: "16-8".into(),
            completed,
        }
    }

    #[test]
    fn test_same_day_replaces() {
        let mut ledger = HistoryLedger::default();
        assert!(ledger.record(entry(day(3), 120_000, false)).is_none());

        let replaced = ledger.record(entry(day(3), 900_000, true));
        assert_eq!(replaced.unwrap().duration, 120_000);

        assert_eq!(ledger.len(), 1);
        let only = ledger.entry_for(day(3)).unwrap();
        assert_eq!(only.duration, 900_000);
        assert!(only.completed);
    }

    #[test]
    fn test_different_days_append() {
        let mut ledger = HistoryLedger::default();
        ledger.record(entry(day(5), 100_000, true));
        ledger.record(entry(day(2), 100_000, true));
        ledger.record(entry(day(9), 100_000, false));

        assert_eq!(ledger.len(), 3);
        // Stored order is insertion order
        let stored: Vec<_> = ledger.entries().iter().map(|e| e.date).collect();
        assert_eq!(stored, vec![day(5), day(2), day(9)]);

        let sorted: Vec<_> = ledger.sorted_by_date().iter().map(|e| e.date).collect();
        assert_eq!(sorted, vec![day(9), day(5), day(2)]);
    }

    #[test]
    fn test_replace_keeps_position() {
        let mut ledger = HistoryLedger::default();
        ledger.record(entry(day(1), 100_000, true));
        ledger.record(entry(day(2), 100_000, true));
        ledger.record(entry(day(1), 200_000, false));

        assert_eq!(ledger.entries()[0].date, day(1));
        assert_eq!(ledger.entries()[0].duration, 200_000);
    }

    #[test]
    fn test_persist_roundtrip() {
        let mut store = MemoryStore::new();
        let mut ledger = HistoryLedger::default();
        ledger.record(entry(day(7), 3_600_000, true));
        ledger.save(&mut store).unwrap();

        let loaded = HistoryLedger::load(&store);
        assert_eq!(loaded, ledger);
    }

    #[test]
    fn test_corrupt_history_loads_empty() {
        let mut store = MemoryStore::new();
        store
            .set(keys::FASTING_HISTORY, "[{\"date\":\"not-a-date\"}]")
            .unwrap();

        let loaded = HistoryLedger::load(&store);
        assert!(loaded.is_empty());
    }
}
