//! Request dispatch and reply routing.
//!
//! Every entry and reader operation goes through one [`Dispatcher`]:
//!
//! ```text
//!   FileEntry / DirectoryEntry / DirectoryReader
//!        │ dispatch(op, completion)
//!        ▼
//!   ┌────────────────────────┐  requests (mpsc)   ┌─────────┐
//!   │ Dispatcher             │ ─────────────────▶ │ backend │
//!   │  pending: DashMap<     │                    │         │
//!   │   RequestId,Completion>│ ◀───────────────── │         │
//!   └────────────────────────┘   replies (pump)   └─────────┘
//! ```
//!
//! A completion is removed from the pending table before it runs, so each one
//! runs at most once; every dispatched request is eventually completed, either
//! by its reply or by the disconnect sweep when the reply stream ends.
//!
//! Completions run on the reply pump. A completion that panics is logged and
//! the pump moves on to the next reply.

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use dashmap::DashMap;
use parking_lot::Mutex;
use sdfs_types::{
    ClientLink, ErrorInfo, Operation, OperationKind, Outcome, Payload, Reply, Request, RequestId,
    RequestIdAllocator,
};
use tokio::sync::{mpsc, oneshot};

use crate::constants::{BACKEND_DISCONNECTED, BACKEND_UNAVAILABLE};
use crate::error::{DomError, FsResult};

/// Continuation invoked with the outcome of one request.
pub type Completion = Box<dyn FnOnce(Outcome) + Send + 'static>;

/// Success continuation for a typed operation result.
pub type SuccessCallback<T> = Box<dyn FnOnce(T) + Send + 'static>;

/// Error continuation.
pub type ErrorCallback = Box<dyn FnOnce(DomError) + Send + 'static>;

/// Counters for one dispatcher.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    /// Requests handed to the link (or failed at hand-off).
    pub dispatched: u64,
    /// Completions that have run.
    pub completed: u64,
    /// Replies dropped because no request was waiting on their id.
    pub orphaned_replies: u64,
}

struct Pending {
    kind: OperationKind,
    // Only here so the pending table is Sync; never contended.
    completion: Mutex<Completion>,
}

/// State shared between the dispatcher handle and its reply pump.
struct Shared {
    pending: DashMap<RequestId, Pending>,
    closed: AtomicBool,
    dispatched: AtomicU64,
    completed: AtomicU64,
    orphaned: AtomicU64,
}

impl Shared {
    fn complete(&self, id: RequestId, pending: Pending, outcome: Outcome) {
        self.completed.fetch_add(1, Ordering::Relaxed);
        let completion = pending.completion.into_inner();
        if catch_unwind(AssertUnwindSafe(|| completion(outcome))).is_err() {
            tracing::error!(%id, kind = %pending.kind, "completion panicked");
        }
    }

    fn route(&self, reply: Reply) {
        let Some((id, pending)) = self.pending.remove(&reply.id) else {
            self.orphaned.fetch_add(1, Ordering::Relaxed);
            tracing::error!(id = %reply.id, "reply for unknown or already completed request, dropping");
            return;
        };

        let outcome = match reply.outcome {
            Outcome::Success(payload) if !pending.kind.accepts(&payload) => {
                tracing::warn!(%id, kind = %pending.kind, "backend replied with the wrong payload shape");
                Outcome::Error(ErrorInfo::unknown(format!(
                    "backend sent a malformed {} reply",
                    pending.kind
                )))
            }
            outcome => outcome,
        };
        tracing::debug!(%id, kind = %pending.kind, success = outcome.is_success(), "request completed");
        self.complete(id, pending, outcome);
    }

    /// Fail every outstanding request. Runs once the reply stream has ended.
    fn fail_all(&self) {
        self.closed.store(true, Ordering::SeqCst);
        let ids: Vec<RequestId> = self.pending.iter().map(|p| *p.key()).collect();
        if !ids.is_empty() {
            tracing::warn!(count = ids.len(), "backend disconnected with requests outstanding");
        }
        for id in ids {
            if let Some((_, pending)) = self.pending.remove(&id) {
                self.complete(
                    id,
                    pending,
                    Outcome::Error(ErrorInfo::invalid_state(BACKEND_DISCONNECTED)),
                );
            }
        }
    }
}

/// Fails everything still pending when the reply pump exits, however it
/// exits.
struct FailOnExit(Arc<Shared>);

impl Drop for FailOnExit {
    fn drop(&mut self) {
        self.0.fail_all();
    }
}

/// The facade side of the backend link.
///
/// Cheap to share: entries and readers hold an `Arc<Dispatcher>`. Requests
/// may be dispatched concurrently from any task.
pub struct Dispatcher {
    requests: mpsc::UnboundedSender<Request>,
    ids: RequestIdAllocator,
    shared: Arc<Shared>,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("pending", &self.pending())
            .field("connected", &self.is_connected())
            .finish()
    }
}

impl Dispatcher {
    /// Take ownership of a link and start routing its replies.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(link: ClientLink) -> Arc<Self> {
        let ClientLink {
            requests,
            mut replies,
        } = link;
        let shared = Arc::new(Shared {
            pending: DashMap::new(),
            closed: AtomicBool::new(false),
            dispatched: AtomicU64::new(0),
            completed: AtomicU64::new(0),
            orphaned: AtomicU64::new(0),
        });

        let pump = FailOnExit(shared.clone());
        tokio::spawn(async move {
            while let Some(reply) = replies.recv().await {
                pump.0.route(reply);
            }
            tracing::debug!("reply stream ended");
        });

        Arc::new(Self {
            requests,
            ids: RequestIdAllocator::new(),
            shared,
        })
    }

    /// Send `op` to the backend and run `completion` with its outcome.
    ///
    /// Returns immediately. `completion` runs exactly once: with the backend's
    /// reply, or with an `InvalidStateError` if the link is gone.
    pub fn dispatch<F>(&self, op: Operation, completion: F) -> RequestId
    where
        F: FnOnce(Outcome) + Send + 'static,
    {
        let id = self.ids.next();
        let kind = op.kind();
        self.shared.dispatched.fetch_add(1, Ordering::Relaxed);
        self.shared.pending.insert(
            id,
            Pending {
                kind,
                completion: Mutex::new(Box::new(completion)),
            },
        );

        tracing::debug!(%id, %kind, path = op.path(), "dispatching");
        if self.requests.send(Request { id, op }).is_err() {
            tracing::warn!(%id, %kind, "backend link closed, failing request");
            self.fail_one(id, BACKEND_UNAVAILABLE);
        } else if self.shared.closed.load(Ordering::SeqCst) {
            // The reply stream ended after the sweep; nothing will answer this.
            self.fail_one(id, BACKEND_DISCONNECTED);
        }
        id
    }

    fn fail_one(&self, id: RequestId, message: &str) {
        if let Some((_, pending)) = self.shared.pending.remove(&id) {
            self.shared
                .complete(id, pending, Outcome::Error(ErrorInfo::invalid_state(message)));
        }
    }

    /// Dispatch `op` and wait for its payload.
    pub async fn call(&self, op: Operation) -> FsResult<Payload> {
        let (tx, rx) = oneshot::channel();
        self.dispatch(op, move |outcome| {
            let _ = tx.send(outcome);
        });
        match rx.await {
            Ok(outcome) => outcome.into_result().map_err(DomError::from),
            Err(_) => Err(DomError::backend_disconnected()),
        }
    }

    /// Dispatch `op` and map its payload with `extract`.
    pub(crate) async fn call_with<T, F>(&self, op: Operation, extract: F) -> FsResult<T>
    where
        F: FnOnce(Payload) -> Option<T>,
    {
        let kind = op.kind();
        let payload = self.call(op).await?;
        extract(payload).ok_or_else(|| DomError::unexpected_payload(kind))
    }

    /// Dispatch `op` and deliver the mapped payload to a continuation pair.
    pub(crate) fn dispatch_with<T, F>(
        &self,
        op: Operation,
        extract: F,
        on_success: SuccessCallback<T>,
        on_error: Option<ErrorCallback>,
    ) where
        T: 'static,
        F: FnOnce(Payload) -> Option<T> + Send + 'static,
    {
        let kind = op.kind();
        self.dispatch(op, move |outcome| match outcome.into_result() {
            Ok(payload) => match extract(payload) {
                Some(value) => on_success(value),
                None => report(on_error, DomError::unexpected_payload(kind)),
            },
            Err(info) => report(on_error, info.into()),
        });
    }

    /// Number of requests waiting for a reply.
    pub fn pending(&self) -> usize {
        self.shared.pending.len()
    }

    /// False once the backend's reply stream has ended.
    pub fn is_connected(&self) -> bool {
        !self.shared.closed.load(Ordering::SeqCst)
    }

    pub fn stats(&self) -> DispatchStats {
        DispatchStats {
            dispatched: self.shared.dispatched.load(Ordering::Relaxed),
            completed: self.shared.completed.load(Ordering::Relaxed),
            orphaned_replies: self.shared.orphaned.load(Ordering::Relaxed),
        }
    }
}

fn report(on_error: Option<ErrorCallback>, err: DomError) {
    match on_error {
        Some(on_error) => on_error(err),
        None => tracing::debug!(error = %err, "no error callback installed, dropping error"),
    }
}
