//! Facade behaviour against a scripted backend.
//!
//! The fake backend holds the raw [`BackendLink`]: it records every request
//! the facade sends and answers only when a test tells it to. That makes it
//! possible to check what was (and was not) dispatched, to answer out of
//! order, and to inject malformed replies.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use sdfs_client::{
    DirectoryEntry, DomError, Entry, EntryArray, EntryFlags, ErrorCallback, FileEntry, FileSystem,
    Metadata, SuccessCallback,
};
use sdfs_types::link::{self, BackendLink};
use sdfs_types::{
    EntryInfo, EntryKind, ErrorInfo, ErrorName, MetadataInfo, Operation, Payload, Reply, Request,
    RequestId, frame,
};
use tokio::sync::mpsc;

// ============================================================================
// Shared test setup
// ============================================================================

struct FakeBackend {
    link: BackendLink,
}

impl FakeBackend {
    async fn next(&mut self) -> Request {
        tokio::time::timeout(Duration::from_secs(5), self.link.recv())
            .await
            .expect("timed out waiting for a request")
            .expect("facade hung up")
    }

    fn succeed(&self, id: RequestId, payload: Payload) {
        self.link.reply(Reply::success(id, payload)).unwrap();
    }

    fn fail(&self, id: RequestId, err: ErrorInfo) {
        self.link.reply(Reply::error(id, err)).unwrap();
    }

    /// Nothing has been sent since the last `next()`.
    fn assert_idle(&mut self) {
        assert!(
            self.link.requests.try_recv().is_err(),
            "facade dispatched a request"
        );
    }
}

fn setup() -> (FileSystem, FakeBackend) {
    let (client, backend) = link::pair();
    let fs = FileSystem::connect(client, "SD Card");
    (fs, FakeBackend { link: backend })
}

#[derive(Debug)]
enum Event<T> {
    Success(T),
    Error(DomError),
}

/// A continuation pair that reports into a channel.
///
/// Both callbacks own a sender, so once the dispatcher has run (and dropped)
/// the completion the channel closes: receiving one event followed by `None`
/// proves exactly one callback ran.
fn recorder<T: Send + 'static>() -> (
    SuccessCallback<T>,
    ErrorCallback,
    mpsc::UnboundedReceiver<Event<T>>,
) {
    let (tx, rx) = mpsc::unbounded_channel();
    let err_tx = tx.clone();
    let on_success: SuccessCallback<T> = Box::new(move |value| {
        let _ = tx.send(Event::Success(value));
    });
    let on_error: ErrorCallback = Box::new(move |err| {
        let _ = err_tx.send(Event::Error(err));
    });
    (on_success, on_error, rx)
}

async fn only_event<T>(rx: &mut mpsc::UnboundedReceiver<Event<T>>) -> Event<T> {
    let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for a callback")
        .expect("no callback ran");
    let rest = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("completion was not released");
    assert!(rest.is_none(), "a second callback ran");
    event
}

async fn no_event<T>(rx: &mut mpsc::UnboundedReceiver<Event<T>>) {
    assert!(rx.recv().await.is_none(), "a callback ran for a dropped call");
}

async fn list(fs: &FileSystem, backend: &mut FakeBackend, children: Vec<EntryInfo>) -> EntryArray {
    let reader = fs.root().create_reader();
    let (ok, err, mut rx) = recorder::<EntryArray>();
    reader.read_entries(ok, err);
    let request = backend.next().await;
    assert_eq!(request.op, Operation::ReadEntries { path: "/".into() });
    backend.succeed(request.id, Payload::Entries(children));
    match only_event(&mut rx).await {
        Event::Success(entries) => entries,
        Event::Error(e) => panic!("listing failed: {e}"),
    }
}

async fn file_entry(fs: &FileSystem, backend: &mut FakeBackend, path: &str) -> Entry {
    let entries = list(fs, backend, vec![EntryInfo::file(path)]).await;
    entries.item(0).cloned().unwrap()
}

// ============================================================================
// FileSystem
// ============================================================================

#[tokio::test]
async fn test_root_is_fixed_directory() {
    let (fs, mut backend) = setup();
    let root: &DirectoryEntry = fs.root();

    assert_eq!(fs.name(), "SD Card");
    assert_eq!(root.name(), "");
    assert_eq!(root.full_path(), "/");
    assert!(root.is_root());
    assert!(std::ptr::eq(fs.root(), fs.root()));
    backend.assert_idle();
}

#[tokio::test]
async fn test_with_defaults_names_sd_card() {
    let (client, _backend) = link::pair();
    let dispatcher = sdfs_client::Dispatcher::spawn(client);
    let fs = FileSystem::with_defaults(dispatcher);
    assert_eq!(fs.name(), sdfs_client::constants::DEFAULT_FS_NAME);
}

// ============================================================================
// Metadata
// ============================================================================

#[tokio::test]
async fn test_get_metadata_delivers_backend_values_unchanged() {
    let (fs, mut backend) = setup();
    let t = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);

    let (ok, err, mut rx) = recorder::<Metadata>();
    fs.root().get_metadata(Some(ok), Some(err));

    let request = backend.next().await;
    assert_eq!(request.op, Operation::GetMetadata { path: "/".into() });
    backend.succeed(
        request.id,
        Payload::Metadata(MetadataInfo {
            modification_time: t,
            size: 1024,
        }),
    );

    match only_event(&mut rx).await {
        Event::Success(meta) => {
            assert_eq!(meta.size(), 1024);
            assert_eq!(meta.modification_time(), t);
        }
        Event::Error(e) => panic!("unexpected error: {e}"),
    }
}

#[tokio::test]
async fn test_get_metadata_of_file_reports_size() {
    let (fs, mut backend) = setup();
    let file = file_entry(&fs, &mut backend, "/a/b.txt").await;

    let (ok, err, mut rx) = recorder::<Metadata>();
    file.get_metadata(Some(ok), Some(err));

    let request = backend.next().await;
    assert_eq!(
        request.op,
        Operation::GetMetadata {
            path: "/a/b.txt".into()
        }
    );
    backend.succeed(
        request.id,
        Payload::Metadata(MetadataInfo {
            modification_time: SystemTime::UNIX_EPOCH,
            size: 42,
        }),
    );

    match only_event(&mut rx).await {
        Event::Success(meta) => assert_eq!(meta.size(), 42),
        Event::Error(e) => panic!("unexpected error: {e}"),
    }
}

// ============================================================================
// Remove / errors
// ============================================================================

#[tokio::test]
async fn test_remove_not_found_goes_to_error_callback_only() {
    let (fs, mut backend) = setup();
    let entry = file_entry(&fs, &mut backend, "/a/b.txt").await;
    let file = entry.as_file().unwrap();

    let (ok, err, mut rx) = recorder::<()>();
    file.remove(Some(ok), Some(err));

    let request = backend.next().await;
    assert_eq!(
        request.op,
        Operation::Remove {
            path: "/a/b.txt".into()
        }
    );
    backend.fail(request.id, ErrorInfo::not_found("/a/b.txt"));

    match only_event(&mut rx).await {
        Event::Error(e) => assert_eq!(e.name(), "NotFoundError"),
        Event::Success(()) => panic!("success callback ran"),
    }
}

#[tokio::test]
async fn test_error_without_error_callback_is_dropped() {
    let (fs, mut backend) = setup();
    let (ok, _, mut rx) = recorder::<Metadata>();
    fs.root().get_metadata(Some(ok), None);

    let request = backend.next().await;
    backend.fail(request.id, ErrorInfo::not_found("/"));

    // The success callback is released without running.
    assert!(rx.recv().await.is_none());
    assert_eq!(fs.dispatcher().pending(), 0);
}

// ============================================================================
// Dropped calls
// ============================================================================

#[tokio::test]
async fn test_copy_without_parent_never_dispatches() {
    let (fs, mut backend) = setup();
    let file = file_entry(&fs, &mut backend, "/a/b.txt").await;

    let (ok, err, mut rx) = recorder::<Entry>();
    file.copy_to(None, Some("c.txt"), Some(ok), Some(err));

    no_event(&mut rx).await;
    backend.assert_idle();
    assert_eq!(fs.dispatcher().pending(), 0);
}

#[tokio::test]
async fn test_missing_success_callback_never_dispatches() {
    let (fs, mut backend) = setup();
    let entry = file_entry(&fs, &mut backend, "/a/b.txt").await;
    let file = entry.as_file().unwrap();
    let root = fs.root();
    let dispatched_before = fs.dispatcher().stats().dispatched;

    let (_, err, mut rx) = recorder::<()>();
    file.get_metadata(None, Some(err));
    no_event(&mut rx).await;

    let (_, err, mut rx) = recorder::<()>();
    file.copy_to(Some(root), None, None, Some(err));
    no_event(&mut rx).await;

    let (_, err, mut rx) = recorder::<()>();
    file.move_to(Some(root), None, None, Some(err));
    no_event(&mut rx).await;

    let (_, err, mut rx) = recorder::<()>();
    file.remove(None, Some(err));
    no_event(&mut rx).await;

    let (_, err, mut rx) = recorder::<()>();
    file.get_parent(None, Some(err));
    no_event(&mut rx).await;

    let (_, err, mut rx) = recorder::<()>();
    root.copy_to(Some(root), Some("x"), None, Some(err));
    no_event(&mut rx).await;

    backend.assert_idle();
    assert_eq!(fs.dispatcher().stats().dispatched, dispatched_before);
}

// ============================================================================
// Copy / move / parent
// ============================================================================

#[tokio::test]
async fn test_copy_delivers_new_entry() {
    let (fs, mut backend) = setup();
    let file = file_entry(&fs, &mut backend, "/a/b.txt").await;

    let (ok, err, mut rx) = recorder::<Entry>();
    file.copy_to(Some(fs.root()), None, Some(ok), Some(err));

    let request = backend.next().await;
    assert_eq!(
        request.op,
        Operation::Copy {
            path: "/a/b.txt".into(),
            parent: "/".into(),
            new_name: None,
        }
    );
    backend.succeed(request.id, Payload::Entry(EntryInfo::file("/b.txt")));

    match only_event(&mut rx).await {
        Event::Success(copy) => {
            assert!(copy.is_file());
            assert_eq!(copy.full_path(), "/b.txt");
            assert_eq!(copy.name(), "b.txt");
        }
        Event::Error(e) => panic!("unexpected error: {e}"),
    }
    // The source handle is untouched.
    assert_eq!(file.full_path(), "/a/b.txt");
}

#[tokio::test]
async fn test_move_keeps_source_handle_path() {
    let (fs, mut backend) = setup();
    let entry = file_entry(&fs, &mut backend, "/a/b.txt").await;
    let file = entry.as_file().unwrap();

    let moved = tokio::spawn({
        let file = file.clone();
        let root = fs.root().clone();
        async move { file.move_into(&root, Some("renamed.txt")).await }
    });

    let request = backend.next().await;
    assert_eq!(
        request.op,
        Operation::Move {
            path: "/a/b.txt".into(),
            parent: "/".into(),
            new_name: Some("renamed.txt".into()),
        }
    );
    backend.succeed(request.id, Payload::Entry(EntryInfo::file("/renamed.txt")));

    let moved = moved.await.unwrap().unwrap();
    assert_eq!(moved.full_path(), "/renamed.txt");
    assert_eq!(file.full_path(), "/a/b.txt");
}

#[tokio::test]
async fn test_get_parent_delivers_directory() {
    let (fs, mut backend) = setup();
    let file = file_entry(&fs, &mut backend, "/a/b.txt").await;

    let (ok, err, mut rx) = recorder::<DirectoryEntry>();
    file.get_parent(Some(ok), Some(err));

    let request = backend.next().await;
    backend.succeed(request.id, Payload::Entry(EntryInfo::directory("/a")));

    match only_event(&mut rx).await {
        Event::Success(dir) => {
            assert_eq!(dir.full_path(), "/a");
            assert_eq!(dir.name(), "a");
        }
        Event::Error(e) => panic!("unexpected error: {e}"),
    }
}

#[tokio::test]
async fn test_parent_reply_naming_a_file_is_an_error() {
    let (fs, mut backend) = setup();
    let file = file_entry(&fs, &mut backend, "/a/b.txt").await;

    let (ok, err, mut rx) = recorder::<DirectoryEntry>();
    file.get_parent(Some(ok), Some(err));
    let request = backend.next().await;
    backend.succeed(request.id, Payload::Entry(EntryInfo::file("/a")));

    match only_event(&mut rx).await {
        Event::Error(e) => assert_eq!(e.kind(), ErrorName::Unknown),
        Event::Success(_) => panic!("a file was delivered as a directory"),
    }
}

// ============================================================================
// Reading directories
// ============================================================================

#[tokio::test]
async fn test_read_entries_of_empty_directory() {
    let (fs, mut backend) = setup();
    let entries = list(&fs, &mut backend, vec![]).await;
    assert_eq!(entries.len(), 0);
    assert!(entries.is_empty());
    assert!(entries.item(0).is_none());
}

#[tokio::test]
async fn test_read_entries_preserves_backend_children() {
    let (fs, mut backend) = setup();
    let children = vec![
        EntryInfo::directory("/DCIM"),
        EntryInfo::file("/notes.txt"),
        EntryInfo::directory("/music"),
    ];
    let entries = list(&fs, &mut backend, children.clone()).await;

    assert_eq!(entries.len(), children.len());
    for (i, expected) in children.iter().enumerate() {
        let entry = entries.item(i).unwrap();
        assert_eq!(entry.full_path(), expected.full_path);
        assert_eq!(entry.name(), expected.name);
        assert_eq!(entry.kind(), expected.kind);
    }
    assert!(entries.item(children.len()).is_none());
    assert!(entries.item(usize::MAX).is_none());
}

#[tokio::test]
async fn test_reader_counts_independent_reads() {
    let (fs, mut backend) = setup();
    let reader = fs.root().create_reader();
    assert_eq!(reader.reads_completed(), 0);

    for round in 0..2 {
        let (ok, err, mut rx) = recorder::<EntryArray>();
        reader.read_entries(ok, err);
        let request = backend.next().await;
        backend.succeed(
            request.id,
            Payload::Entries(vec![EntryInfo::file("/only.txt")]),
        );
        match only_event(&mut rx).await {
            Event::Success(entries) => assert_eq!(entries.len(), 1),
            Event::Error(e) => panic!("round {round}: {e}"),
        }
    }
    assert_eq!(reader.reads_completed(), 2);
}

#[tokio::test]
async fn test_reader_path_is_a_snapshot() {
    let (fs, mut backend) = setup();
    let entries = list(
        &fs,
        &mut backend,
        vec![EntryInfo::directory("/pictures")],
    )
    .await;
    let dir = entries.item(0).and_then(Entry::as_directory).unwrap().clone();
    let reader = dir.create_reader();
    drop(entries);
    drop(dir);

    assert_eq!(reader.full_path(), "/pictures");
    backend.assert_idle();

    let (ok, err, _rx) = recorder::<EntryArray>();
    reader.read_entries(ok, err);
    let request = backend.next().await;
    assert_eq!(
        request.op,
        Operation::ReadEntries {
            path: "/pictures".into()
        }
    );
}

#[tokio::test]
async fn test_wrong_payload_shape_reaches_error_callback() {
    let (fs, mut backend) = setup();
    let reader = fs.root().create_reader();
    let (ok, err, mut rx) = recorder::<EntryArray>();
    reader.read_entries(ok, err);

    let request = backend.next().await;
    backend.succeed(request.id, Payload::Void);

    match only_event(&mut rx).await {
        Event::Error(e) => assert_eq!(e.name(), "Unknown"),
        Event::Success(_) => panic!("malformed reply was delivered as success"),
    }
    assert_eq!(reader.reads_completed(), 0);
}

// ============================================================================
// Correlation
// ============================================================================

#[tokio::test]
async fn test_replies_in_reverse_order_reach_their_callbacks() {
    let (fs, mut backend) = setup();
    const N: usize = 8;

    let mut receivers = Vec::new();
    for _ in 0..N {
        let (ok, err, rx) = recorder::<Metadata>();
        fs.root().get_metadata(Some(ok), Some(err));
        receivers.push(rx);
    }
    let mut requests = Vec::new();
    for _ in 0..N {
        requests.push(backend.next().await);
    }
    assert_eq!(fs.dispatcher().pending(), N);

    for (i, request) in requests.iter().enumerate().rev() {
        backend.succeed(
            request.id,
            Payload::Metadata(MetadataInfo {
                modification_time: SystemTime::UNIX_EPOCH,
                size: i as u64,
            }),
        );
    }

    for (i, rx) in receivers.iter_mut().enumerate() {
        match only_event(rx).await {
            Event::Success(meta) => assert_eq!(meta.size(), i as u64),
            Event::Error(e) => panic!("request {i}: {e}"),
        }
    }
    assert_eq!(fs.dispatcher().pending(), 0);
}

#[tokio::test]
async fn test_concurrent_dispatch_from_many_tasks() {
    let (fs, mut backend) = setup();
    let fs = Arc::new(fs);
    const N: u64 = 32;

    let mut tasks = Vec::new();
    for _ in 0..N {
        let fs = fs.clone();
        tasks.push(tokio::spawn(async move { fs.root().metadata().await }));
    }

    let mut seen = std::collections::HashSet::new();
    for _ in 0..N {
        let request = backend.next().await;
        assert!(seen.insert(request.id), "duplicate request id");
        backend.succeed(
            request.id,
            Payload::Metadata(MetadataInfo {
                modification_time: SystemTime::UNIX_EPOCH,
                size: request.id.get(),
            }),
        );
    }

    for task in tasks {
        let meta = task.await.unwrap().unwrap();
        assert!(seen.contains(&RequestId::from_raw(meta.size())));
    }
}

#[tokio::test]
async fn test_unknown_and_duplicate_replies_are_dropped() {
    let (fs, mut backend) = setup();

    let (ok, err, mut rx) = recorder::<()>();
    let entry = file_entry(&fs, &mut backend, "/x").await;
    entry.as_file().unwrap().remove(Some(ok), Some(err));
    let request = backend.next().await;

    backend.succeed(RequestId::from_raw(10_000), Payload::Void);
    backend.succeed(request.id, Payload::Void);
    backend.fail(request.id, ErrorInfo::not_found("/x"));

    match only_event(&mut rx).await {
        Event::Success(()) => {}
        Event::Error(e) => panic!("duplicate reply overrode the first: {e}"),
    }

    // Flush the pump with one more round trip before reading the counters.
    let _ = list(&fs, &mut backend, vec![]).await;
    assert_eq!(fs.dispatcher().stats().orphaned_replies, 2);
}

#[tokio::test]
async fn test_panicking_callback_leaves_dispatcher_running() {
    let (fs, mut backend) = setup();
    let root = fs.root();

    fn buggy(_: Metadata) {
        panic!("caller bug");
    }
    root.get_metadata(Some(Box::new(buggy)), None);
    let (ok, err, mut rx) = recorder::<Metadata>();
    root.get_metadata(Some(ok), Some(err));

    let first = backend.next().await;
    let second = backend.next().await;
    let meta = MetadataInfo {
        modification_time: SystemTime::UNIX_EPOCH,
        size: 3,
    };
    backend.succeed(first.id, Payload::Metadata(meta.clone()));
    backend.succeed(second.id, Payload::Metadata(meta));

    match only_event(&mut rx).await {
        Event::Success(meta) => assert_eq!(meta.size(), 3),
        Event::Error(e) => panic!("unexpected error: {e}"),
    }
    assert!(fs.dispatcher().is_connected());
    assert_eq!(fs.dispatcher().pending(), 0);
}

// ============================================================================
// Lookup by path
// ============================================================================

#[tokio::test]
async fn test_get_file_resolves_relative_path() {
    let (fs, mut backend) = setup();
    let (ok, err, mut rx) = recorder::<FileEntry>();
    fs.root().get_file("a/./b.txt", EntryFlags::CREATE, Some(ok), Some(err));

    let request = backend.next().await;
    assert_eq!(
        request.op,
        Operation::GetEntry {
            path: "/a/b.txt".into(),
            kind: EntryKind::File,
            flags: EntryFlags::CREATE,
        }
    );
    backend.succeed(request.id, Payload::Entry(EntryInfo::file("/a/b.txt")));

    match only_event(&mut rx).await {
        Event::Success(file) => {
            assert_eq!(file.name(), "b.txt");
            assert_eq!(file.full_path(), "/a/b.txt");
        }
        Event::Error(e) => panic!("unexpected error: {e}"),
    }
}

#[tokio::test]
async fn test_get_directory_errors_reach_error_callback() {
    let (fs, mut backend) = setup();
    let cases = [
        (ErrorInfo::encoding("invalid path"), "EncodingError"),
        (ErrorInfo::not_found("/x"), "NotFoundError"),
        (ErrorInfo::path_exists("/x"), "PathExistsError"),
        (ErrorInfo::type_mismatch("/x"), "TypeMismatchError"),
    ];
    for (error, expected) in cases {
        let (ok, err, mut rx) = recorder::<DirectoryEntry>();
        fs.root().get_directory("x", EntryFlags::OPEN, Some(ok), Some(err));
        let request = backend.next().await;
        backend.fail(request.id, error);
        match only_event(&mut rx).await {
            Event::Error(e) => assert_eq!(e.name(), expected),
            Event::Success(_) => panic!("success callback ran for {expected}"),
        }
    }
}

#[tokio::test]
async fn test_get_file_reply_naming_a_directory_is_an_error() {
    let (fs, mut backend) = setup();
    let lookup = tokio::spawn({
        let root = fs.root().clone();
        async move { root.file("/DCIM", EntryFlags::OPEN).await }
    });
    let request = backend.next().await;
    backend.succeed(request.id, Payload::Entry(EntryInfo::directory("/DCIM")));
    let err = lookup.await.unwrap().unwrap_err();
    assert_eq!(err.kind(), ErrorName::Unknown);
}

#[tokio::test]
async fn test_remove_recursively_targets_directory() {
    let (fs, mut backend) = setup();
    let dcim = list(&fs, &mut backend, vec![EntryInfo::directory("/DCIM")])
        .await
        .item(0)
        .and_then(Entry::as_directory)
        .cloned()
        .unwrap();

    let (ok, err, mut rx) = recorder::<()>();
    dcim.remove_recursively(Some(ok), Some(err));
    let request = backend.next().await;
    assert_eq!(
        request.op,
        Operation::RemoveRecursively {
            path: "/DCIM".into()
        }
    );
    backend.succeed(request.id, Payload::Void);
    assert!(matches!(only_event(&mut rx).await, Event::Success(())));
}

// ============================================================================
// Disconnect
// ============================================================================

#[tokio::test]
async fn test_backend_drop_fails_pending_once() {
    let (fs, mut backend) = setup();

    let mut receivers = Vec::new();
    for _ in 0..3 {
        let (ok, err, rx) = recorder::<Metadata>();
        fs.root().get_metadata(Some(ok), Some(err));
        receivers.push(rx);
    }
    for _ in 0..3 {
        backend.next().await;
    }
    drop(backend);

    for rx in receivers.iter_mut() {
        match only_event(rx).await {
            Event::Error(e) => assert_eq!(e.name(), "InvalidStateError"),
            Event::Success(_) => panic!("success after disconnect"),
        }
    }
    assert_eq!(fs.dispatcher().pending(), 0);
}

#[tokio::test]
async fn test_dispatch_after_disconnect_fails_immediately() {
    let (fs, backend) = setup();
    drop(backend);

    let err = fs.root().metadata().await.unwrap_err();
    assert_eq!(err.kind(), ErrorName::InvalidState);
}

#[tokio::test]
async fn test_late_callback_after_shutdown() {
    let (fs, mut backend) = setup();
    let (ok, err, mut rx) = recorder::<Metadata>();
    fs.root().get_metadata(Some(ok), Some(err));
    let request = backend.next().await;

    assert_eq!(fs.shutdown(), 1);
    backend.succeed(
        request.id,
        Payload::Metadata(MetadataInfo {
            modification_time: SystemTime::UNIX_EPOCH,
            size: 5,
        }),
    );
    match only_event(&mut rx).await {
        Event::Success(meta) => assert_eq!(meta.size(), 5),
        Event::Error(e) => panic!("unexpected error: {e}"),
    }
}

// ============================================================================
// Framed transport
// ============================================================================

#[tokio::test]
async fn test_facade_over_framed_stream() {
    let (client_stream, backend_stream) = tokio::io::duplex(64 * 1024);
    let fs = FileSystem::connect(frame::bridge_client(client_stream), "SD Card");
    let mut backend = FakeBackend {
        link: frame::bridge_backend(backend_stream),
    };

    let listing = tokio::spawn({
        let root = fs.root().clone();
        async move { root.entries().await }
    });
    let request = backend.next().await;
    backend.succeed(
        request.id,
        Payload::Entries(vec![
            EntryInfo::directory("/DCIM"),
            EntryInfo::file("/a.txt"),
        ]),
    );

    let listing = listing.await.unwrap().unwrap();
    let paths: Vec<&str> = listing.iter().map(Entry::full_path).collect();
    assert_eq!(paths, vec!["/DCIM", "/a.txt"]);
}

#[tokio::test]
async fn test_framed_metadata_before_epoch() {
    let (client_stream, backend_stream) = tokio::io::duplex(64 * 1024);
    let fs = FileSystem::connect(frame::bridge_client(client_stream), "SD Card");
    let mut backend = FakeBackend {
        link: frame::bridge_backend(backend_stream),
    };
    let old = SystemTime::UNIX_EPOCH - Duration::from_secs(86_400);

    let stat = tokio::spawn({
        let root = fs.root().clone();
        async move { root.metadata().await }
    });
    let request = backend.next().await;
    backend.succeed(
        request.id,
        Payload::Metadata(MetadataInfo {
            modification_time: old,
            size: 0,
        }),
    );
    assert_eq!(stat.await.unwrap().unwrap().modification_time(), old);

    // The link survives and keeps serving.
    let listing = tokio::spawn({
        let root = fs.root().clone();
        async move { root.entries().await }
    });
    let request = backend.next().await;
    backend.succeed(request.id, Payload::Entries(vec![]));
    assert!(listing.await.unwrap().unwrap().is_empty());
    assert!(fs.dispatcher().is_connected());
}
