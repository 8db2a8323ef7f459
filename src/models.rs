//! Data models for the vote collector.
//!
//! This module contains the core data structures shared by the extractor,
//! the aggregator and the exporters: member identities, vote events, the
//! flattened export table and the policies that govern how they merge.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable key for one legislator: the native-script (Chinese) name.
///
/// English names are not used as keys because several members changed the
/// English spelling of their names during a term.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemberId(String);

impl MemberId {
    /// Create a member id, trimming surrounding whitespace.
    pub fn new(name: &str) -> Self {
        Self(name.trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for MemberId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// One member's recorded vote within a vote event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberVote {
    /// Member identity (native-script name).
    pub member: MemberId,
    /// English display name as printed on this record. Not used for keying.
    pub name_en: String,
    /// Recorded vote value ("Yes", "No", "Abstain", "Present", ...).
    pub vote: String,
}

/// One recorded vote taken at a meeting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteEvent {
    /// Combined-title key, unique within one run.
    pub key: String,
    /// Motion title in Chinese.
    pub title_ch: String,
    /// Motion title in English.
    pub title_en: String,
    /// When the vote was taken.
    pub timestamp: NaiveDateTime,
    /// Per-member votes in document order, one entry per member.
    pub votes: Vec<MemberVote>,
}

impl VoteEvent {
    /// Creates an event with no recorded votes.
    pub fn new(title_ch: &str, title_en: &str, timestamp: NaiveDateTime) -> Self {
        Self {
            key: title_key(title_ch, title_en),
            title_ch: title_ch.to_string(),
            title_en: title_en.to_string(),
            timestamp,
            votes: Vec::new(),
        }
    }

    /// Record a member's vote. A second entry for the same member replaces
    /// the first.
    pub fn record_vote(&mut self, member: MemberId, name_en: &str, vote: &str) {
        match self.votes.iter_mut().find(|v| v.member == member) {
            Some(existing) => {
                existing.name_en = name_en.to_string();
                existing.vote = vote.to_string();
            }
            None => self.votes.push(MemberVote {
                member,
                name_en: name_en.to_string(),
                vote: vote.to_string(),
            }),
        }
    }

    /// Returns the vote recorded for `member`, if any.
    pub fn vote_of(&self, member: &MemberId) -> Option<&str> {
        self.votes
            .iter()
            .find(|v| &v.member == member)
            .map(|v| v.vote.as_str())
    }

    /// Iterate over the members referenced by this event.
    pub fn members(&self) -> impl Iterator<Item = &MemberId> {
        self.votes.iter().map(|v| &v.member)
    }
}

/// Build the combined-title key from both locale titles.
///
/// The titles are joined with a single space and percent-encoded.
pub fn title_key(title_ch: &str, title_en: &str) -> String {
    urlencoding::encode(&format!("{} {}", title_ch, title_en)).into_owned()
}

/// What to do when two vote records share a combined-title key.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum CollisionPolicy {
    /// The later record replaces the earlier one (keeps its position).
    #[default]
    Overwrite,
    /// The earlier record is kept and the later one is dropped.
    KeepFirst,
    /// Votes from the later record are merged into the earlier one.
    Merge,
}

impl fmt::Display for CollisionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollisionPolicy::Overwrite => write!(f, "overwrite"),
            CollisionPolicy::KeepFirst => write!(f, "keep-first"),
            CollisionPolicy::Merge => write!(f, "merge"),
        }
    }
}

/// How strictly vote timestamps are parsed.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum TimestampPolicy {
    /// Date and time must both parse; otherwise the record is skipped.
    #[default]
    Strict,
    /// Fall back to the date alone (at midnight) when the time is unusable.
    DateOnlyFallback,
}

/// One flattened row of the export table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportedRow {
    pub date: NaiveDateTime,
    pub title_ch: String,
    pub title_en: String,
    /// One cell per column of [`Table::members`], same order.
    pub votes: Vec<String>,
}

/// The materialized, column-complete export table.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Table {
    /// Member columns, in roster order.
    pub members: Vec<MemberId>,
    /// Rows sorted ascending by date.
    pub rows: Vec<ExportedRow>,
}

/// Fixed leading columns of the export.
pub const FIXED_HEADERS: [&str; 3] = ["VoteDate", "VoteTitleTC", "VoteTitleEN"];

impl Table {
    /// Header row: the fixed columns followed by one column per member.
    pub fn headers(&self) -> Vec<String> {
        FIXED_HEADERS
            .iter()
            .map(|h| h.to_string())
            .chain(self.members.iter().map(|m| m.as_str().to_string()))
            .collect()
    }

    /// Look up a single cell by row index and member name.
    #[allow(dead_code)] // Used by tests and handy for ad-hoc inspection
    pub fn cell(&self, row: usize, member: &str) -> Option<&str> {
        let col = self.members.iter().position(|m| m.as_str() == member)?;
        self.rows.get(row)?.votes.get(col).map(String::as_str)
    }
}

/// Counters collected over one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Source groups enumerated.
    pub groups: usize,
    /// Documents listed across all groups.
    pub documents_listed: usize,
    /// Documents that failed to fetch, parse or extract.
    pub documents_failed: usize,
    /// Individual vote records skipped (bad timestamp, missing fields).
    pub records_skipped: usize,
    /// Vote events handed to the aggregator.
    pub events_ingested: usize,
}

impl RunSummary {
    /// Documents that were processed successfully.
    pub fn documents_ok(&self) -> usize {
        self.documents_listed.saturating_sub(self.documents_failed)
    }
}
