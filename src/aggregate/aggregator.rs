//! Event store, roster and table materialization.

use super::roster::Roster;
use crate::models::{CollisionPolicy, ExportedRow, Table, VoteEvent};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Outcome of ingesting one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ingest {
    /// The combined-title key was new.
    Inserted,
    /// An existing event with the same key was overwritten.
    Replaced,
    /// An existing event with the same key was kept; the new one dropped.
    Kept,
    /// The new votes were merged into the existing event.
    Merged,
}

/// Accumulates vote events and the member roster for one run.
///
/// Events are stored by combined-title key. Storage order is the order in
/// which keys were first seen; an overwrite keeps the original slot.
#[derive(Debug, Clone)]
pub struct Aggregator {
    roster: Roster,
    events: Vec<VoteEvent>,
    index: HashMap<String, usize>,
    policy: CollisionPolicy,
    collisions: usize,
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new(Roster::default(), CollisionPolicy::default())
    }
}

impl Aggregator {
    pub fn new(roster: Roster, policy: CollisionPolicy) -> Self {
        Self {
            roster,
            events: Vec::new(),
            index: HashMap::new(),
            policy,
            collisions: 0,
        }
    }

    /// Register the event's members and store the event.
    pub fn ingest(&mut self, event: VoteEvent) -> Ingest {
        for member in event.members() {
            if self.roster.insert_if_absent(member) {
                debug!("New member: {}", member);
            }
        }

        let Some(&slot) = self.index.get(&event.key) else {
            self.index.insert(event.key.clone(), self.events.len());
            self.events.push(event);
            return Ingest::Inserted;
        };

        self.collisions += 1;
        let existing = &mut self.events[slot];
        warn!(
            "Duplicate vote title {:?} / {:?} ({} vs {}), policy: {}",
            event.title_ch, event.title_en, existing.timestamp, event.timestamp, self.policy
        );

        match self.policy {
            CollisionPolicy::Overwrite => {
                *existing = event;
                Ingest::Replaced
            }
            CollisionPolicy::KeepFirst => Ingest::Kept,
            CollisionPolicy::Merge => {
                for vote in event.votes {
                    existing.record_vote(vote.member, &vote.name_en, &vote.vote);
                }
                Ingest::Merged
            }
        }
    }

    /// Ingest every event of one document, in order.
    pub fn ingest_all(&mut self, events: impl IntoIterator<Item = VoteEvent>) -> usize {
        let mut count = 0;
        for event in events {
            self.ingest(event);
            count += 1;
        }
        count
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    /// Stored events in storage order.
    #[allow(dead_code)] // Inspection accessor; used by tests
    pub fn events(&self) -> &[VoteEvent] {
        &self.events
    }

    #[allow(dead_code)] // Lookup by key; used by tests
    pub fn get(&self, key: &str) -> Option<&VoteEvent> {
        self.index.get(key).map(|&slot| &self.events[slot])
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Number of title collisions seen so far.
    pub fn collisions(&self) -> usize {
        self.collisions
    }

    /// Flatten everything into a column-complete table sorted by date.
    ///
    /// Columns are the whole roster at the time of the call. Members with no
    /// vote on an event get the roster placeholder. The sort is stable, so
    /// events with equal timestamps keep storage order.
    pub fn materialize(&self) -> Table {
        let members = self.roster.members().to_vec();
        let placeholder = self.roster.placeholder();

        let mut rows: Vec<ExportedRow> = self
            .events
            .iter()
            .map(|event| ExportedRow {
                date: event.timestamp,
                title_ch: event.title_ch.clone(),
                title_en: event.title_en.clone(),
                votes: members
                    .iter()
                    .map(|m| event.vote_of(m).unwrap_or(placeholder).to_string())
                    .collect(),
            })
            .collect();

        rows.sort_by_key(|row| row.date);

        Table { members, rows }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::process_document;
    use crate::models::{MemberId, TimestampPolicy};
    use chrono::NaiveDateTime;

    const TWO_VOTES: &str = include_str!("../../fixtures/two_votes.xml");
    const SINGLE_VOTE: &str = include_str!("../../fixtures/single_vote.xml");
    const MALFORMED: &str = include_str!("../../fixtures/malformed.xml");

    fn ts(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn event(ch: &str, en: &str, at: &str, votes: &[(&str, &str)]) -> VoteEvent {
        let mut event = VoteEvent::new(ch, en, ts(at));
        for (name, vote) in votes {
            event.record_vote(MemberId::new(name), "", vote);
        }
        event
    }

    fn load(aggregator: &mut Aggregator, text: &str) {
        if let Ok(extraction) = process_document(text, TimestampPolicy::Strict) {
            aggregator.ingest_all(extraction.events);
        }
    }

    #[test]
    fn test_worked_example() {
        let mut aggregator = Aggregator::default();
        load(&mut aggregator, TWO_VOTES);

        let table = aggregator.materialize();
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].title_en, "Motion A");
        assert_eq!(table.rows[1].title_en, "Motion B");
        assert_eq!(table.rows[0].date, ts("2017-03-01 10:00:00"));

        assert_eq!(table.cell(0, "陳X"), Some("Yes"));
        assert_eq!(table.cell(0, "李Y"), Some("-"));
        assert_eq!(table.cell(1, "陳X"), Some("-"));
        assert_eq!(table.cell(1, "李Y"), Some("No"));
    }

    #[test]
    fn test_malformed_document_leaves_state_untouched() {
        let mut aggregator = Aggregator::default();
        load(&mut aggregator, TWO_VOTES);
        let roster_before = aggregator.roster().members().to_vec();

        load(&mut aggregator, MALFORMED);

        assert_eq!(aggregator.len(), 2);
        assert_eq!(aggregator.roster().members(), roster_before.as_slice());
        assert!(!aggregator.roster().contains(&MemberId::new("張W")));
    }

    #[test]
    fn test_reprocessing_is_idempotent() {
        let mut once = Aggregator::default();
        load(&mut once, TWO_VOTES);
        load(&mut once, SINGLE_VOTE);

        let mut twice = Aggregator::default();
        load(&mut twice, TWO_VOTES);
        load(&mut twice, SINGLE_VOTE);
        load(&mut twice, TWO_VOTES);

        assert_eq!(once.events(), twice.events());
        assert_eq!(once.roster().members(), twice.roster().members());
        assert_eq!(twice.collisions(), 2);
    }

    #[test]
    fn test_roster_covers_every_event() {
        let mut aggregator = Aggregator::default();
        load(&mut aggregator, TWO_VOTES);
        load(&mut aggregator, SINGLE_VOTE);

        for event in aggregator.events() {
            for member in event.members() {
                assert!(aggregator.roster().contains(member));
            }
        }
        assert_eq!(aggregator.roster().len(), 3);
    }

    #[test]
    fn test_rows_are_column_complete_and_sorted() {
        let mut aggregator = Aggregator::default();
        aggregator.ingest(event("丙", "C", "2018-06-14 16:00:00", &[("王Z", "Yes")]));
        aggregator.ingest(event("甲", "A", "2017-03-01 10:00:00", &[("陳X", "No")]));
        aggregator.ingest(event("乙", "B", "2017-03-02 11:00:00", &[]));

        let table = aggregator.materialize();
        assert_eq!(table.members.len(), 2);
        assert!(table.rows.iter().all(|r| r.votes.len() == table.members.len()));
        assert!(table.rows.windows(2).all(|w| w[0].date <= w[1].date));
        assert_eq!(table.rows[0].title_en, "A");
        assert_eq!(table.rows[2].title_en, "C");
    }

    #[test]
    fn test_equal_timestamps_keep_insertion_order() {
        let mut aggregator = Aggregator::default();
        aggregator.ingest(event("乙", "B", "2017-03-01 10:00:00", &[]));
        aggregator.ingest(event("甲", "A", "2017-03-01 10:00:00", &[]));

        let titles: Vec<String> = aggregator
            .materialize()
            .rows
            .into_iter()
            .map(|r| r.title_en)
            .collect();
        assert_eq!(titles, vec!["B", "A"]);
    }

    #[test]
    fn test_overwrite_keeps_slot() {
        let mut aggregator = Aggregator::default();
        let first = event("甲", "A", "2017-03-01 10:00:00", &[("陳X", "Yes")]);
        let key = first.key.clone();

        assert_eq!(aggregator.ingest(first), Ingest::Inserted);
        aggregator.ingest(event("乙", "B", "2017-03-02 10:00:00", &[]));
        let outcome = aggregator.ingest(event("甲", "A", "2017-04-01 10:00:00", &[("李Y", "No")]));

        assert_eq!(outcome, Ingest::Replaced);
        assert_eq!(aggregator.len(), 2);
        assert_eq!(aggregator.events()[0].key, key);
        let stored = aggregator.get(&key).unwrap();
        assert_eq!(stored.timestamp, ts("2017-04-01 10:00:00"));
        assert_eq!(stored.vote_of(&MemberId::new("陳X")), None);
        // Members of the overwritten event stay on the roster.
        assert!(aggregator.roster().contains(&MemberId::new("陳X")));
    }

    #[test]
    fn test_keep_first_policy() {
        let mut aggregator = Aggregator::new(Roster::default(), CollisionPolicy::KeepFirst);
        aggregator.ingest(event("甲", "A", "2017-03-01 10:00:00", &[("陳X", "Yes")]));
        let outcome = aggregator.ingest(event("甲", "A", "2017-04-01 10:00:00", &[("李Y", "No")]));

        assert_eq!(outcome, Ingest::Kept);
        let stored = &aggregator.events()[0];
        assert_eq!(stored.timestamp, ts("2017-03-01 10:00:00"));
        assert_eq!(stored.vote_of(&MemberId::new("陳X")), Some("Yes"));
        assert_eq!(aggregator.collisions(), 1);
    }

    #[test]
    fn test_merge_policy() {
        let mut aggregator = Aggregator::new(Roster::new("N/A"), CollisionPolicy::Merge);
        let first = event(
            "甲",
            "A",
            "2017-03-01 10:00:00",
            &[("陳X", "Yes"), ("李Y", "No")],
        );
        let second = event(
            "甲",
            "A",
            "2017-04-01 10:00:00",
            &[("李Y", "Yes"), ("王Z", "Absent")],
        );
        aggregator.ingest(first);
        let outcome = aggregator.ingest(second);

        assert_eq!(outcome, Ingest::Merged);
        let stored = &aggregator.events()[0];
        assert_eq!(stored.timestamp, ts("2017-03-01 10:00:00"));
        assert_eq!(stored.vote_of(&MemberId::new("陳X")), Some("Yes"));
        assert_eq!(stored.vote_of(&MemberId::new("李Y")), Some("Yes"));
        assert_eq!(stored.vote_of(&MemberId::new("王Z")), Some("Absent"));
    }

    #[test]
    fn test_empty_aggregator() {
        let aggregator = Aggregator::default();
        assert!(aggregator.is_empty());
        let table = aggregator.materialize();
        assert!(table.members.is_empty());
        assert!(table.rows.is_empty());
    }
}
