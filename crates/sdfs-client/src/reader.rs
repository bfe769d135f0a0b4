//! Directory enumeration.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use sdfs_types::{Operation, Payload};

use crate::dispatch::{Dispatcher, ErrorCallback, SuccessCallback};
use crate::entry::Entry;
use crate::entry_array::EntryArray;
use crate::error::FsResult;

/// Enumerates one directory.
///
/// The path is copied when the reader is created; the reader holds no
/// reference to the entry it came from. Every `read_entries` call is an
/// independent request that returns the full listing; there is no cursor.
#[derive(Debug)]
pub struct DirectoryReader {
    full_path: String,
    dispatcher: Arc<Dispatcher>,
    reads_completed: Arc<AtomicUsize>,
}

impl DirectoryReader {
    pub(crate) fn new(full_path: String, dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            full_path,
            dispatcher,
            reads_completed: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// The directory this reader enumerates.
    pub fn full_path(&self) -> &str {
        &self.full_path
    }

    /// How many reads have delivered a listing so far.
    pub fn reads_completed(&self) -> usize {
        self.reads_completed.load(Ordering::Acquire)
    }

    /// List the directory, delivering one [`EntryArray`] or one error.
    ///
    /// Unlike the entry operations, both callbacks are required.
    pub fn read_entries(&self, on_success: SuccessCallback<EntryArray>, on_error: ErrorCallback) {
        let op = Operation::ReadEntries {
            path: self.full_path.clone(),
        };
        let dispatcher = self.dispatcher.clone();
        let reads_completed = self.reads_completed.clone();
        let on_success: SuccessCallback<EntryArray> = Box::new(move |entries| {
            reads_completed.fetch_add(1, Ordering::AcqRel);
            on_success(entries)
        });
        self.dispatcher.dispatch_with(
            op,
            move |payload| to_entry_array(payload, &dispatcher),
            on_success,
            Some(on_error),
        );
    }

    /// Async form of [`read_entries`](Self::read_entries).
    pub async fn read(&self) -> FsResult<EntryArray> {
        let op = Operation::ReadEntries {
            path: self.full_path.clone(),
        };
        let entries = self
            .dispatcher
            .call_with(op, |payload| to_entry_array(payload, &self.dispatcher))
            .await?;
        self.reads_completed.fetch_add(1, Ordering::AcqRel);
        Ok(entries)
    }
}

fn to_entry_array(payload: Payload, dispatcher: &Arc<Dispatcher>) -> Option<EntryArray> {
    match payload {
        Payload::Entries(infos) => Some(EntryArray::new(
            infos
                .into_iter()
                .map(|info| Entry::from_info(info, dispatcher.clone()))
                .collect(),
        )),
        _ => None,
    }
}
