//! Length-prefixed postcard frames.
//!
//! Carries [`Request`]s and [`Reply`]s over any byte stream (a socketpair to a
//! privileged helper process, a pipe, `tokio::io::duplex` in tests). Each frame
//! is a big-endian `u32` length followed by that many bytes of postcard.
//!
//! [`bridge_client`] / [`bridge_backend`] adapt a stream into the same
//! [`ClientLink`] / [`BackendLink`] ends that [`link::pair`](crate::link::pair)
//! produces, so neither side cares which transport it is on.

use std::io;

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

use crate::constants::MAX_FRAME_LEN;
use crate::error::ErrorInfo;
use crate::link::{BackendLink, ClientLink};
use crate::wire::{Reply, Request};

/// Errors from the frame codec.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("codec error: {0}")]
    Codec(#[from] postcard::Error),

    #[error("frame of {0} bytes exceeds limit of {MAX_FRAME_LEN}")]
    TooLarge(usize),
}

impl FrameError {
    /// Whether the stream is unusable after this error.
    ///
    /// Encoding failures happen before any byte is written, so only I/O
    /// errors leave the stream in an unknown state.
    pub fn is_fatal(&self) -> bool {
        matches!(self, FrameError::Io(_))
    }
}

/// Write one value as a frame.
pub async fn write_frame<W, T>(writer: &mut W, value: &T) -> Result<(), FrameError>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let bytes = postcard::to_stdvec(value)?;
    if bytes.len() > MAX_FRAME_LEN {
        return Err(FrameError::TooLarge(bytes.len()));
    }
    writer.write_u32(bytes.len() as u32).await?;
    writer.write_all(&bytes).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one frame. Returns `Ok(None)` on a clean end of stream.
pub async fn read_frame<R, T>(reader: &mut R) -> Result<Option<T>, FrameError>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    let len = match reader.read_u32().await {
        Ok(len) => len as usize,
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    if len > MAX_FRAME_LEN {
        return Err(FrameError::TooLarge(len));
    }
    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf).await?;
    Ok(Some(postcard::from_bytes(&buf)?))
}

/// Run the facade side of a link over `stream`.
///
/// Spawns a writer task (requests → frames) and a reader task (frames →
/// replies). Either task ending closes its half of the returned link.
///
/// A request that cannot be encoded never reaches the backend; its caller
/// gets an `UnknownError` reply locally and the link stays up.
pub fn bridge_client<S>(stream: S) -> ClientLink
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let (requests, replies) = bridge::<S, Request, Reply>(stream, "client", |request, e| {
        Rejected::Deliver(Reply::error(
            request.id,
            ErrorInfo::unknown(format!("request could not be encoded: {e}")),
        ))
    });
    ClientLink { requests, replies }
}

/// Run the backend side of a link over `stream`.
///
/// A reply that cannot be encoded is replaced by an `UnknownError` reply for
/// the same request.
pub fn bridge_backend<S>(stream: S) -> BackendLink
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let (replies, requests) = bridge::<S, Reply, Request>(stream, "backend", |reply, e| {
        Rejected::Replace(Reply::error(
            reply.id,
            ErrorInfo::unknown(format!("reply could not be encoded: {e}")),
        ))
    });
    BackendLink { requests, replies }
}

/// What to do with an outbound value the codec refused.
enum Rejected<Out, In> {
    /// Write this instead.
    Replace(Out),
    /// Hand this to the local receiver as if it had been read.
    Deliver(In),
}

fn bridge<S, Out, In>(
    stream: S,
    side: &'static str,
    reject: fn(Out, &FrameError) -> Rejected<Out, In>,
) -> (mpsc::UnboundedSender<Out>, mpsc::UnboundedReceiver<In>)
where
    S: AsyncRead + AsyncWrite + Send + 'static,
    Out: Serialize + Send + Sync + 'static,
    In: DeserializeOwned + Send + 'static,
{
    let (mut reader, mut writer) = tokio::io::split(stream);
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<Out>();
    let (in_tx, in_rx) = mpsc::unbounded_channel::<In>();
    // Weak, so the receiver still closes when the reader task ends.
    let local = in_tx.downgrade();

    tokio::spawn(async move {
        while let Some(value) = out_rx.recv().await {
            let e = match write_frame(&mut writer, &value).await {
                Ok(()) => continue,
                Err(e) if e.is_fatal() => {
                    tracing::warn!(side, "frame write failed, closing link: {e}");
                    break;
                }
                Err(e) => e,
            };
            tracing::warn!(side, "dropping unencodable frame: {e}");
            match reject(value, &e) {
                Rejected::Replace(substitute) => {
                    if let Err(e) = write_frame(&mut writer, &substitute).await {
                        tracing::warn!(side, "substitute frame failed, closing link: {e}");
                        break;
                    }
                }
                Rejected::Deliver(value) => {
                    if let Some(tx) = local.upgrade() {
                        let _ = tx.send(value);
                    }
                }
            }
        }
        let _ = writer.shutdown().await;
        tracing::debug!(side, "frame writer finished");
    });

    tokio::spawn(async move {
        loop {
            match read_frame::<_, In>(&mut reader).await {
                Ok(Some(value)) => {
                    if in_tx.send(value).is_err() {
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::error!(side, "corrupt frame stream, closing link: {e}");
                    break;
                }
            }
        }
        tracing::debug!(side, "frame reader finished");
    });

    (out_tx, in_rx)
}
