//! Member roster: every member seen so far, in first-seen order.

use crate::models::MemberId;
use std::collections::HashSet;

/// Default cell value for a member with no vote on an event.
pub const DEFAULT_PLACEHOLDER: &str = "-";

/// Growing set of member identities sharing one placeholder vote.
#[derive(Debug, Clone)]
pub struct Roster {
    placeholder: String,
    order: Vec<MemberId>,
    seen: HashSet<MemberId>,
}

impl Default for Roster {
    fn default() -> Self {
        Self::new(DEFAULT_PLACEHOLDER)
    }
}

impl Roster {
    pub fn new(placeholder: &str) -> Self {
        Self {
            placeholder: placeholder.to_string(),
            order: Vec::new(),
            seen: HashSet::new(),
        }
    }

    /// Add `member` if it is new. Returns `true` when it was added.
    pub fn insert_if_absent(&mut self, member: &MemberId) -> bool {
        if self.seen.contains(member) {
            return false;
        }
        self.seen.insert(member.clone());
        self.order.push(member.clone());
        true
    }

    #[allow(dead_code)] // Membership check; used by tests
    pub fn contains(&self, member: &MemberId) -> bool {
        self.seen.contains(member)
    }

    pub fn placeholder(&self) -> &str {
        &self.placeholder
    }

    /// Members in first-seen order.
    pub fn members(&self) -> &[MemberId] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
