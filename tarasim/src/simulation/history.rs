//! Append-only audit log owned by the caller.
//!
//! The simulation never creates or discards a log; it only appends
//! human-readable status lines to one that has been attached.

pub trait HistoryLog {
    fn append(&mut self, entry: &str);
}

/// In-memory history, one entry per appended line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryHistory {
    entries: Vec<String>,
}

impl MemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }
}

impl HistoryLog for MemoryHistory {
    fn append(&mut self, entry: &str) {
        self.entries.push(entry.to_owned());
    }
}
