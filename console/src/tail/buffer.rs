//! Bounded, deduplicated log buffer

use std::collections::{HashSet, VecDeque};

use crate::tail::entry::{EntryId, LogEntry};

/// Default number of lines kept on screen
pub const DEFAULT_CAPACITY: usize = 1000;

/// Ordered display lines plus the identities already shown.
///
/// The seen-set is never trimmed with the lines: an entry evicted from the
/// buffer must still not come back.
#[derive(Debug, Clone)]
pub struct LogBuffer {
    lines: VecDeque<String>,
    seen: HashSet<EntryId>,
    capacity: usize,
}

impl LogBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            lines: VecDeque::with_capacity(capacity.min(DEFAULT_CAPACITY)),
            seen: HashSet::new(),
            capacity,
        }
    }

    /// Append the entries not seen before, in arrival order. Returns the
    /// display lines that were appended.
    pub fn append_entries(&mut self, entries: &[LogEntry]) -> Vec<String> {
        let mut appended = Vec::new();
        for entry in entries {
            if self.seen.insert(entry.identity()) {
                appended.push(entry.display_line());
            }
        }
        self.push_lines(appended.iter().cloned());
        appended
    }

    /// Append lines of a plain text chunk.
    ///
    /// A line is dropped when it already appears in the trailing window of
    /// the buffer whose size is the number of lines in the chunk. Repeated
    /// legitimate lines can be suppressed and shifted chunk boundaries can
    /// slip duplicates through; the id based path has neither problem.
    pub fn append_text(&mut self, text: &str) -> Vec<String> {
        if text.is_empty() {
            return Vec::new();
        }
        let chunk: Vec<&str> = text.strip_suffix('\n').unwrap_or(text).split('\n').collect();

        let window_start = self.lines.len().saturating_sub(chunk.len());
        let appended: Vec<String> = chunk
            .into_iter()
            .filter(|line| !self.lines.range(window_start..).any(|prev| prev.as_str() == *line))
            .map(str::to_string)
            .collect();

        self.push_lines(appended.iter().cloned());
        appended
    }

    /// Swap the whole display for a single diagnostic document
    pub fn replace_with(&mut self, document: String) {
        self.lines.clear();
        self.lines.push_back(document);
    }

    pub fn clear(&mut self) {
        self.lines.clear();
        self.seen.clear();
    }

    fn push_lines(&mut self, lines: impl IntoIterator<Item = String>) {
        self.lines.extend(lines);
        while self.lines.len() > self.capacity {
            self.lines.pop_front();
        }
    }

    pub fn lines(&self) -> impl Iterator<Item = &String> {
        self.lines.iter()
    }

    pub fn snapshot(&self) -> Vec<String> {
        self.lines.iter().cloned().collect()
    }

    pub fn has_seen(&self, id: &EntryId) -> bool {
        self.seen.contains(id)
    }

    pub fn seen_len(&self) -> usize {
        self.seen.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
