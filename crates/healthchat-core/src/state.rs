//! UI-agnostic conversation state
//!
//! The chat log and its entries. Nothing here knows about timers, HTTP or any
//! particular front end; the engine mutates a [`ChatLog`] and renderers read it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies one accepted submission and everything produced for it
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "req-{}", self.0)
    }
}

/// The role of a chat entry's author
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChatRole {
    User,
    Assistant,
}

/// One turn in the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatEntry {
    pub role: ChatRole,
    pub text: String,
    /// True only while an assistant reply is still being revealed
    pub revealing: bool,
    pub request_id: RequestId,
}

impl ChatEntry {
    pub fn user(request_id: RequestId, text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            text: text.into(),
            revealing: false,
            request_id,
        }
    }

    pub fn assistant(request_id: RequestId, text: impl Into<String>, revealing: bool) -> Self {
        Self {
            role: ChatRole::Assistant,
            text: text.into(),
            revealing,
            request_id,
        }
    }

    fn is_revealing_for(&self, request_id: RequestId) -> bool {
        self.role == ChatRole::Assistant && self.revealing && self.request_id == request_id
    }
}

/// Ordered, append-only chat log
///
/// Only the trailing assistant entry of the request currently being revealed
/// can change after it is pushed, and only until it is finalized.
#[derive(Debug, Clone, Default)]
pub struct ChatLog {
    entries: Vec<ChatEntry>,
    revision: u64,
}

impl ChatLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[ChatEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&ChatEntry> {
        self.entries.last()
    }

    /// Bumped on every mutation; renderers scroll to the newest entry when it changes
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn push_user(&mut self, request_id: RequestId, text: impl Into<String>) {
        self.entries.push(ChatEntry::user(request_id, text));
        self.revision += 1;
    }

    /// Publish the current state of the assistant reply for `request_id`.
    ///
    /// Updates the last entry in place when it is the revealing reply of the
    /// same request, otherwise appends a new assistant entry.
    pub fn publish_assistant(&mut self, request_id: RequestId, text: &str, revealing: bool) {
        match self.entries.last_mut() {
            Some(last) if last.is_revealing_for(request_id) => {
                last.text.clear();
                last.text.push_str(text);
                last.revealing = revealing;
            }
            _ => self
                .entries
                .push(ChatEntry::assistant(request_id, text, revealing)),
        }
        self.revision += 1;
    }

    /// Finalize a reply that is still revealing, keeping whatever text it has.
    /// Returns false when no entry of `request_id` is mid-reveal.
    pub fn finalize(&mut self, request_id: RequestId) -> bool {
        match self.entries.last_mut() {
            Some(last) if last.is_revealing_for(request_id) => {
                last.revealing = false;
                self.revision += 1;
                true
            }
            _ => false,
        }
    }

    pub fn revealing_count(&self) -> usize {
        self.entries.iter().filter(|e| e.revealing).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_creates_then_updates_in_place() {
        let mut log = ChatLog::new();
        let id = RequestId(1);
        log.push_user(id, "hi");
        log.publish_assistant(id, "H", true);
        log.publish_assistant(id, "He", true);

        assert_eq!(log.len(), 2);
        assert_eq!(log.last().unwrap().text, "He");
        assert!(log.last().unwrap().revealing);
        assert_eq!(log.revealing_count(), 1);
    }

    #[test]
    fn test_finalized_entry_is_never_reopened() {
        let mut log = ChatLog::new();
        let first = RequestId(1);
        log.publish_assistant(first, "done", false);
        log.publish_assistant(first, "d", true);

        assert_eq!(log.len(), 2);
        assert_eq!(log.entries()[0].text, "done");
        assert!(!log.entries()[0].revealing);
    }

    #[test]
    fn test_other_request_does_not_touch_revealing_entry() {
        let mut log = ChatLog::new();
        log.publish_assistant(RequestId(1), "abc", true);
        log.publish_assistant(RequestId(2), "x", true);

        assert_eq!(log.len(), 2);
        assert_eq!(log.entries()[0].text, "abc");
    }

    #[test]
    fn test_finalize_only_matching_request() {
        let mut log = ChatLog::new();
        log.publish_assistant(RequestId(3), "par", true);

        assert!(!log.finalize(RequestId(4)));
        assert!(log.finalize(RequestId(3)));
        assert!(!log.finalize(RequestId(3)));
        assert_eq!(log.revealing_count(), 0);
        assert_eq!(log.last().unwrap().text, "par");
    }

    #[test]
    fn test_revision_tracks_every_mutation() {
        let mut log = ChatLog::new();
        assert_eq!(log.revision(), 0);
        log.push_user(RequestId(1), "q");
        log.publish_assistant(RequestId(1), "a", true);
        log.publish_assistant(RequestId(1), "ab", false);
        assert_eq!(log.revision(), 3);
    }
}
