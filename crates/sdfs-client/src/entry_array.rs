//! Directory listing results.

use std::slice;

use crate::entry::Entry;

/// The entries produced by one completed `read_entries`.
///
/// Order is whatever the backend enumerated. Immutable once built.
#[derive(Debug, Clone, Default)]
pub struct EntryArray {
    entries: Vec<Entry>,
}

impl EntryArray {
    pub(crate) fn new(entries: Vec<Entry>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The entry at `index`, or `None` when out of range.
    pub fn item(&self, index: usize) -> Option<&Entry> {
        self.entries.get(index)
    }

    pub fn iter(&self) -> slice::Iter<'_, Entry> {
        self.entries.iter()
    }
}

impl<'a> IntoIterator for &'a EntryArray {
    type Item = &'a Entry;
    type IntoIter = slice::Iter<'a, Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl IntoIterator for EntryArray {
    type Item = Entry;
    type IntoIter = std::vec::IntoIter<Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
