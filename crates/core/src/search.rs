//! List and search view model.
//!
//! Holds the state behind the record list: a snapshot of the store, the search query, and
//! the set of records selected for export. Rendering is left to the caller.

use crate::record::{PatientRecord, RecordStatus};
use crate::report::ReportRenderer;
use crate::store::RecordStore;
use crate::{ScribeError, ScribeResult};
use scribe_types::RecordId;
use std::collections::BTreeSet;

/// Records whose patient name or id contains `query`, ignoring case, in store order.
///
/// A blank query matches every record.
pub fn filter<'a>(records: &'a [PatientRecord], query: &str) -> Vec<&'a PatientRecord> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return records.iter().collect();
    }
    records
        .iter()
        .filter(|record| record.matches_lowercase(&needle))
        .collect()
}

/// Counts shown above the record list.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Statistics {
    pub total: usize,
    pub drafts: usize,
    pub updated: usize,
}

impl Statistics {
    pub fn from_records(records: &[PatientRecord]) -> Self {
        records.iter().fold(Self::default(), |mut stats, record| {
            stats.total += 1;
            match record.status {
                RecordStatus::Draft => stats.drafts += 1,
                RecordStatus::Updated => stats.updated += 1,
            }
            stats
        })
    }
}

/// Result of [`ListView::delete_with_confirmation`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    Declined,
    NotFound,
}

#[derive(Clone, Debug, Default)]
pub struct ListView {
    records: Vec<PatientRecord>,
    query: String,
    selected: BTreeSet<RecordId>,
}

impl ListView {
    pub fn new(records: Vec<PatientRecord>) -> Self {
        Self {
            records,
            query: String::new(),
            selected: BTreeSet::new(),
        }
    }

    /// Loads a fresh snapshot from `store`.
    pub fn load(store: &impl RecordStore) -> ScribeResult<Self> {
        Ok(Self::new(store.list()?))
    }

    pub fn records(&self) -> &[PatientRecord] {
        &self.records
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    /// Changes the query and drops any selected record that is no longer visible.
    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
        let visible: BTreeSet<RecordId> = self.visible_ids().collect();
        self.selected.retain(|id| visible.contains(id));
    }

    pub fn visible(&self) -> Vec<&PatientRecord> {
        filter(&self.records, &self.query)
    }

    fn visible_ids(&self) -> impl Iterator<Item = RecordId> + '_ {
        self.visible().into_iter().map(|record| record.id.clone())
    }

    /// Flips selection of a visible record. Returns whether it is selected afterwards.
    ///
    /// Ids that are not visible under the current query are ignored and report `false`.
    pub fn toggle(&mut self, id: &RecordId) -> bool {
        if !self.visible().iter().any(|record| &record.id == id) {
            return false;
        }
        if self.selected.remove(id) {
            false
        } else {
            self.selected.insert(id.clone());
            true
        }
    }

    /// Selects exactly the visible records, or clears the selection.
    pub fn select_all(&mut self, select: bool) {
        let selected = if select {
            self.visible_ids().collect()
        } else {
            BTreeSet::new()
        };
        self.selected = selected;
    }

    pub fn is_selected(&self, id: &RecordId) -> bool {
        self.selected.contains(id)
    }

    pub fn selected_ids(&self) -> &BTreeSet<RecordId> {
        &self.selected
    }

    /// True when there is at least one visible record and every visible record is selected.
    pub fn all_selected(&self) -> bool {
        let visible = self.visible();
        !visible.is_empty()
            && visible
                .iter()
                .all(|record| self.selected.contains(&record.id))
    }

    /// Selected records in store order.
    pub fn selected_records(&self) -> Vec<&PatientRecord> {
        self.records
            .iter()
            .filter(|record| self.selected.contains(&record.id))
            .collect()
    }

    /// Renders the selected records as one printable document.
    ///
    /// # Errors
    ///
    /// Returns `ScribeError::NothingSelected` if no record is selected.
    pub fn export(&self, renderer: &ReportRenderer) -> ScribeResult<String> {
        let chosen = self.selected_records();
        if chosen.is_empty() {
            return Err(ScribeError::NothingSelected);
        }
        Ok(renderer.render(chosen))
    }

    pub fn statistics(&self) -> Statistics {
        Statistics::from_records(&self.records)
    }

    /// Deletes a record once `confirm` agrees.
    ///
    /// `confirm` is asked only for records present in the snapshot, and the store is
    /// untouched unless it answers `true`. On deletion the record also leaves the snapshot
    /// and the selection.
    pub fn delete_with_confirmation(
        &mut self,
        store: &mut impl RecordStore,
        id: &RecordId,
        confirm: impl FnOnce(&PatientRecord) -> bool,
    ) -> ScribeResult<DeleteOutcome> {
        let Some(index) = self.records.iter().position(|record| &record.id == id) else {
            return Ok(DeleteOutcome::NotFound);
        };

        if !confirm(&self.records[index]) {
            return Ok(DeleteOutcome::Declined);
        }

        if !store.delete(id)? {
            tracing::warn!(id = %id, "record vanished from the store before deletion");
        }
        self.records.remove(index);
        self.selected.remove(id);
        Ok(DeleteOutcome::Deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::FormModel;
    use crate::store::MemoryRecordStore;
    use proptest::prelude::*;

    fn record(id: &str, name: &str) -> PatientRecord {
        PatientRecord {
            id: RecordId::new(id).unwrap(),
            patient_name: name.to_string(),
            status: RecordStatus::Draft,
            date_created: "2024-05-01".into(),
            form_data: FormModel::new(),
        }
    }

    fn id(raw: &str) -> RecordId {
        RecordId::new(raw).unwrap()
    }

    fn sample() -> Vec<PatientRecord> {
        vec![
            record("F1", "Asha"),
            record("F2", "Rahul"),
            record("F3", "Ashok"),
        ]
    }

    #[test]
    fn test_filter_matches_name_case_insensitively() {
        let records = vec![record("F1", "Asha"), record("F2", "Rahul")];
        let hits = filter(&records, "asha");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id.as_str(), "F1");
    }

    #[test]
    fn test_filter_matches_id() {
        let records = sample();
        let hits: Vec<&str> = filter(&records, "f2").iter().map(|r| r.id.as_str()).collect();
        assert_eq!(hits, vec!["F2"]);
    }

    #[test]
    fn test_blank_query_returns_everything_in_order() {
        let records = sample();
        for query in ["", "   "] {
            let hits: Vec<&PatientRecord> = filter(&records, query);
            assert_eq!(hits, records.iter().collect::<Vec<_>>());
        }
    }

    #[test]
    fn test_select_all_is_relative_to_filter() {
        let mut view = ListView::new(sample());
        view.set_query("ash");
        view.select_all(true);

        assert!(view.is_selected(&id("F1")));
        assert!(view.is_selected(&id("F3")));
        assert!(!view.is_selected(&id("F2")));
        assert!(view.all_selected());

        view.select_all(false);
        assert!(view.selected_ids().is_empty());
    }

    #[test]
    fn test_narrowing_query_prunes_selection() {
        let mut view = ListView::new(sample());
        view.select_all(true);
        view.set_query("rahul");

        let selected: Vec<&str> = view.selected_ids().iter().map(|i| i.as_str()).collect();
        assert_eq!(selected, vec!["F2"]);

        view.set_query("");
        assert!(!view.all_selected());
    }

    #[test]
    fn test_toggle_ignores_hidden_records() {
        let mut view = ListView::new(sample());
        view.set_query("rahul");
        assert!(!view.toggle(&id("F1")));
        assert!(view.toggle(&id("F2")));
        assert!(!view.toggle(&id("F2")));
        assert!(view.selected_ids().is_empty());
    }

    #[test]
    fn test_all_selected_false_for_empty_view() {
        let mut view = ListView::new(sample());
        view.set_query("nobody");
        view.select_all(true);
        assert!(!view.all_selected());
    }

    #[test]
    fn test_export_requires_selection() {
        let view = ListView::new(sample());
        let err = view.export(&ReportRenderer::new()).unwrap_err();
        assert!(matches!(err, ScribeError::NothingSelected));
    }

    #[test]
    fn test_export_uses_store_order() {
        let mut view = ListView::new(sample());
        view.toggle(&id("F3"));
        view.toggle(&id("F1"));

        let html = view.export(&ReportRenderer::new()).unwrap();
        let first = html.find("F1").unwrap();
        let third = html.find("F3").unwrap();
        assert!(first < third);
        assert!(!html.contains("Rahul"));
    }

    #[test]
    fn test_delete_requires_confirmation() {
        let mut store = MemoryRecordStore::from_records(sample());
        let mut view = ListView::load(&store).unwrap();
        view.toggle(&id("F2"));

        let outcome = view
            .delete_with_confirmation(&mut store, &id("F2"), |_| false)
            .unwrap();
        assert_eq!(outcome, DeleteOutcome::Declined);
        assert_eq!(store.records().len(), 3);

        let outcome = view
            .delete_with_confirmation(&mut store, &id("F2"), |r| r.patient_name == "Rahul")
            .unwrap();
        assert_eq!(outcome, DeleteOutcome::Deleted);
        assert_eq!(store.records().len(), 2);
        assert_eq!(view.records().len(), 2);
        assert!(!view.is_selected(&id("F2")));
    }

    #[test]
    fn test_delete_unknown_id_never_asks() {
        let mut store = MemoryRecordStore::from_records(sample());
        let mut view = ListView::load(&store).unwrap();
        let outcome = view
            .delete_with_confirmation(&mut store, &id("F9"), |_| panic!("should not ask"))
            .unwrap();
        assert_eq!(outcome, DeleteOutcome::NotFound);
    }

    #[test]
    fn test_statistics() {
        let mut records = sample();
        records[1].status = RecordStatus::Updated;
        let stats = Statistics::from_records(&records);
        assert_eq!(
            stats,
            Statistics {
                total: 3,
                drafts: 2,
                updated: 1
            }
        );
    }

    fn arb_records() -> impl Strategy<Value = Vec<PatientRecord>> {
        proptest::collection::vec("[A-Za-z ]{0,8}", 0..12).prop_map(|names| {
            names
                .into_iter()
                .enumerate()
                .map(|(i, name)| record(&format!("F{:06}", i), &name))
                .collect()
        })
    }

    proptest! {
        #[test]
        fn prop_filter_is_an_ordered_matching_subsequence(
            records in arb_records(),
            query in "[A-Za-z0-9 ]{0,4}",
        ) {
            let hits = filter(&records, &query);
            let needle = query.trim().to_lowercase();

            let mut cursor = records.iter();
            for hit in &hits {
                prop_assert!(cursor.any(|r| std::ptr::eq(r, *hit)));
                prop_assert!(
                    hit.patient_name.to_lowercase().contains(&needle)
                        || hit.id.as_str().to_lowercase().contains(&needle)
                );
            }

            let expected = records
                .iter()
                .filter(|r| {
                    r.patient_name.to_lowercase().contains(&needle)
                        || r.id.as_str().to_lowercase().contains(&needle)
                })
                .count();
            prop_assert_eq!(hits.len(), expected);
        }

        #[test]
        fn prop_selection_never_escapes_filter(
            records in arb_records(),
            first in "[A-Za-z]{0,2}",
            second in "[A-Za-z]{0,2}",
        ) {
            let mut view = ListView::new(records);
            view.set_query(first);
            view.select_all(true);
            view.set_query(second);

            let visible: BTreeSet<RecordId> =
                view.visible().iter().map(|r| r.id.clone()).collect();
            prop_assert!(view.selected_ids().is_subset(&visible));
        }
    }
}
