//! In-process link between the facade and the backend.
//!
//! ```text
//!   ClientLink                 requests (mpsc)          BackendLink
//!   ┌──────────────────┐   ───────────────────▶   ┌──────────────────┐
//!   │ Dispatcher       │                          │ Service          │
//!   │                  │   ◀───────────────────   │                  │
//!   └──────────────────┘     replies (mpsc)       └──────────────────┘
//! ```
//!
//! The request sender is the single shared outbound channel; it may be cloned
//! and used from any number of tasks.

use thiserror::Error;
use tokio::sync::mpsc;

use crate::wire::{Reply, Request};

/// The link has been torn down on the other side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("link closed")]
pub struct LinkClosed;

/// Facade end: send requests, receive replies.
#[derive(Debug)]
pub struct ClientLink {
    pub requests: mpsc::UnboundedSender<Request>,
    pub replies: mpsc::UnboundedReceiver<Reply>,
}

/// Backend end: receive requests, send replies.
#[derive(Debug)]
pub struct BackendLink {
    pub requests: mpsc::UnboundedReceiver<Request>,
    pub replies: mpsc::UnboundedSender<Reply>,
}

impl BackendLink {
    /// Wait for the next request; `None` once every client sender is gone.
    pub async fn recv(&mut self) -> Option<Request> {
        self.requests.recv().await
    }

    /// Send a reply back to the facade.
    pub fn reply(&self, reply: Reply) -> Result<(), LinkClosed> {
        self.replies.send(reply).map_err(|_| LinkClosed)
    }
}

/// Create a connected pair of link ends.
pub fn pair() -> (ClientLink, BackendLink) {
    let (request_tx, request_rx) = mpsc::unbounded_channel();
    let (reply_tx, reply_rx) = mpsc::unbounded_channel();
    (
        ClientLink {
            requests: request_tx,
            replies: reply_rx,
        },
        BackendLink {
            requests: request_rx,
            replies: reply_tx,
        },
    )
}
