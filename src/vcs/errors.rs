//! Accumulated, human-readable error messages
//!
//! Fallible factory and adapter operations return `None` and record why here,
//! so callers can keep going (e.g. try another provider) and still report a
//! specific diagnostic.
//!
//! Every message gets a sequence number. An [`ErrorMark`] taken before an
//! operation selects only what was recorded after it, even across
//! [`ErrorList::reset_errors`]. The list keeps the most recent
//! [`MAX_RETAINED_ERRORS`] messages.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

pub const MAX_RETAINED_ERRORS: usize = 256;

/// Position in an [`ErrorList`], see [`ErrorList::mark`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ErrorMark(u64);

#[derive(Debug, Default)]
struct Entries {
    next: u64,
    messages: VecDeque<(u64, String)>,
}

impl Entries {
    fn push(&mut self, message: String) {
        if self.messages.len() == MAX_RETAINED_ERRORS {
            self.messages.pop_front();
        }
        self.messages.push_back((self.next, message));
        self.next += 1;
    }
}

#[derive(Debug, Default)]
pub struct ErrorList {
    entries: Mutex<Entries>,
}

impl ErrorList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&self, message: impl Into<String>) {
        self.lock().push(message.into());
    }

    pub fn import_errors<I, S>(&self, errors: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut entries = self.lock();
        for message in errors {
            entries.push(message.into());
        }
    }

    pub fn errors(&self) -> Vec<String> {
        self.lock()
            .messages
            .iter()
            .map(|(_, message)| message.clone())
            .collect()
    }

    /// Marks the current end of the list
    pub fn mark(&self) -> ErrorMark {
        ErrorMark(self.lock().next)
    }

    /// Errors recorded after `mark`
    pub fn errors_since(&self, mark: ErrorMark) -> Vec<String> {
        self.lock()
            .messages
            .iter()
            .filter(|(seq, _)| *seq >= mark.0)
            .map(|(_, message)| message.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lock().messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().messages.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        !self.is_empty()
    }

    pub fn reset_errors(&self) {
        self.lock().messages.clear();
    }

    // A poisoned list still holds valid strings.
    fn lock(&self) -> MutexGuard<'_, Entries> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
