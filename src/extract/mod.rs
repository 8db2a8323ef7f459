//! Vote record extraction.
//!
//! Turns one parsed vote document into normalized [`VoteEvent`]s. A document
//! holds a single meeting with one or more vote records; each record carries
//! its date, time, bilingual motion title and the individual member votes.
//!
//! Extraction never touches the aggregator: a document's events are returned
//! as a whole so that a failed document leaves no partial state behind.

use crate::error::{DocumentError, ExtractError};
use crate::markup::{self, Document, Element};
use crate::models::{MemberId, TimestampPolicy, VoteEvent};
use chrono::{NaiveDate, NaiveDateTime};
use tracing::{debug, warn};

/// Root element name of a vote document.
pub const ROOT_ELEMENT: &str = "legcohk-vote";

/// Timestamp pattern for `vote-date` + `vote-time`.
pub const DATETIME_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

/// Pattern for `vote-date` alone.
pub const DATE_FORMAT: &str = "%d/%m/%Y";

/// Events extracted from one document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    pub events: Vec<VoteEvent>,
    /// Records that were present but could not be used.
    pub skipped: usize,
}

/// Parse document text and extract its vote events.
pub fn process_document(text: &str, policy: TimestampPolicy) -> Result<Extraction, DocumentError> {
    let document = markup::parse(text)?;
    Ok(extract_document(&document, policy)?)
}

/// Extract all vote events from a parsed document.
///
/// Fails when the document is not a vote document at all. Individual bad
/// records are skipped and counted.
pub fn extract_document(
    document: &Document,
    policy: TimestampPolicy,
) -> Result<Extraction, ExtractError> {
    if document.root_name != ROOT_ELEMENT {
        return Err(ExtractError::UnexpectedRoot(document.root_name.clone()));
    }

    let meeting = document
        .root
        .first("meeting")
        .ok_or(ExtractError::MissingElement("meeting"))?;

    let records = meeting.children("vote");
    if records.is_empty() {
        debug!("Meeting has no vote records");
    }

    Ok(extract_records(records, policy))
}

/// Extract a sequence of vote records, skipping the ones that fail.
pub fn extract_records(records: &[Element], policy: TimestampPolicy) -> Extraction {
    let mut extraction = Extraction::default();

    for (index, record) in records.iter().enumerate() {
        match extract_record(record, policy) {
            Ok(event) => extraction.events.push(event),
            Err(e) => {
                warn!("Skipping vote record #{}: {}", index + 1, e);
                extraction.skipped += 1;
            }
        }
    }

    extraction
}

/// Extract one vote record.
pub fn extract_record(record: &Element, policy: TimestampPolicy) -> Result<VoteEvent, ExtractError> {
    let date = required_text(record, "vote-date")?;
    let time = record.child_text("vote-time").unwrap_or("");
    let timestamp = parse_timestamp(date, time, policy)?;

    let title_ch = required_text(record, "motion-ch")?;
    let title_en = required_text(record, "motion-en")?;

    let mut event = VoteEvent::new(title_ch, title_en, timestamp);

    let members = record
        .first("individual-votes")
        .map(|votes| votes.children("member"))
        .unwrap_or(&[]);

    for member in members {
        let name_ch = member
            .attr("name-ch")
            .filter(|name| !name.trim().is_empty())
            .ok_or(ExtractError::MissingAttribute("name-ch"))?;
        let name_en = member.attr("name-en").unwrap_or("").trim();
        let vote = member.child_text("vote").unwrap_or("");

        event.record_vote(MemberId::new(name_ch), name_en, vote);
    }

    Ok(event)
}

/// Parse a record's timestamp from its date and time fields.
pub fn parse_timestamp(
    date: &str,
    time: &str,
    policy: TimestampPolicy,
) -> Result<NaiveDateTime, ExtractError> {
    let combined = format!("{} {}", date.trim(), time.trim());

    let source = match NaiveDateTime::parse_from_str(&combined, DATETIME_FORMAT) {
        Ok(timestamp) => return Ok(timestamp),
        Err(e) => e,
    };

    match policy {
        TimestampPolicy::Strict => Err(ExtractError::Timestamp {
            value: combined,
            source,
        }),
        TimestampPolicy::DateOnlyFallback => {
            let day = NaiveDate::parse_from_str(date.trim(), DATE_FORMAT).map_err(|source| {
                ExtractError::Timestamp {
                    value: combined.clone(),
                    source,
                }
            })?;
            debug!("Using date-only timestamp for {:?}", combined);
            day.and_hms_opt(0, 0, 0).ok_or(ExtractError::Timestamp {
                value: combined,
                source,
            })
        }
    }
}

fn required_text<'a>(record: &'a Element, name: &'static str) -> Result<&'a str, ExtractError> {
    record
        .child_text(name)
        .ok_or(ExtractError::MissingElement(name))
}
