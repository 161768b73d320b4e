//! Bounded, most-recent-first command history with an Up/Down browse cursor.

/// Result of moving the browse cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Browse<'a> {
    /// Load this entry into the input line.
    Entry(&'a str),
    /// Browsed past the newest entry: back to an empty, fresh line.
    Fresh,
    /// Already at the boundary.
    Unchanged,
}

#[derive(Debug, Clone)]
pub struct History {
    entries: Vec<String>,
    capacity: usize,
    /// Index of the entry loaded into the line while browsing; `None` = editing a fresh line.
    browse: Option<usize>,
}

impl History {
    pub fn new(capacity: u16) -> Self {
        debug_assert!(capacity > 0, "history capacity must be positive");
        Self {
            entries: Vec::with_capacity(capacity.min(128) as usize),
            capacity: capacity as usize,
            browse: None,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Entries, most recent first.
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn snapshot(&self) -> Vec<String> {
        self.entries.clone()
    }

    pub fn browse_index(&self) -> Option<usize> {
        self.browse
    }

    /// Insert at the front, evicting the oldest entry when full. Returns the evicted entry.
    pub fn push(&mut self, command: String) -> Option<String> {
        let evicted = if self.entries.len() >= self.capacity {
            self.entries.pop()
        } else {
            None
        };
        self.entries.insert(0, command);
        debug_assert!(self.entries.len() <= self.capacity);
        evicted
    }

    /// Up-arrow: step to the next older entry.
    pub fn older(&mut self) -> Browse<'_> {
        let next = self.browse.map_or(0, |index| index + 1);
        if next >= self.entries.len() {
            return Browse::Unchanged;
        }
        self.browse = Some(next);
        Browse::Entry(&self.entries[next])
    }

    /// Down-arrow: step to the next newer entry, or back to a fresh line.
    pub fn newer(&mut self) -> Browse<'_> {
        match self.browse {
            None => Browse::Unchanged,
            Some(0) => {
                self.browse = None;
                Browse::Fresh
            }
            Some(index) => {
                self.browse = Some(index - 1);
                Browse::Entry(&self.entries[index - 1])
            }
        }
    }

    pub fn reset_browse(&mut self) {
        self.browse = None;
    }

    /// Change the bound; shrinking drops the oldest entries immediately.
    pub fn set_capacity(&mut self, capacity: u16) {
        debug_assert!(capacity > 0, "history capacity must be positive");
        self.capacity = capacity as usize;
        self.entries.truncate(self.capacity);
        if self.browse.is_some_and(|index| index >= self.entries.len()) {
            self.browse = None;
        }
    }
}
