//! Per-connection session loop.
//!
//! Each connection exclusively owns an accumulation buffer: inbound chunks
//! are appended to it, complete messages are classified off its front,
//! dispatched, and their bytes trimmed. A single chunk may complete several
//! messages; a message may also span many chunks.

use std::io;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use bytes::{Buf, BytesMut};
use log::*;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::common::hex::hex_dump;
use crate::config::Config;
use crate::engine::SqlEngine;
use crate::metrics::METRICS;
use crate::protocol::{classify, encode_response, AuthPhase, FrontendKind};

/// Initial accumulation buffer capacity.
const READ_BUF_BYTES: usize = 8 * 1024;

/// Write all bytes to the stream and flush.
#[inline]
pub async fn write_all<W: AsyncWrite + Unpin>(w: &mut W, buf: &[u8]) -> io::Result<()> {
    write_all_chunked(w, buf).await?;
    w.flush().await
}

/// Write bytes in chunks with yield points to prevent worker thread starvation.
///
/// Engine result sets can run to megabytes of row data; breaking the write
/// into chunks and yielding between them keeps other connections responsive
/// while a large response drains.
async fn write_all_chunked<W: AsyncWrite + Unpin>(w: &mut W, buf: &[u8]) -> io::Result<()> {
    const CHUNK_SIZE: usize = 64 * 1024;

    if buf.len() <= CHUNK_SIZE {
        return w.write_all(buf).await;
    }

    let mut offset = 0;
    while offset < buf.len() {
        let end = (offset + CHUNK_SIZE).min(buf.len());
        w.write_all(&buf[offset..end]).await?;
        offset = end;

        if offset < buf.len() {
            tokio::task::yield_now().await;
        }
    }

    Ok(())
}

/// Drive one client connection until it closes.
///
/// Message handling is serialized per connection: the next message is only
/// classified after the previous response has been written and its bytes
/// trimmed from the buffer. Returns cleanly on peer EOF, Terminate,
/// CancelRequest, unrecognized input and buffer overflow; transport errors
/// propagate to the caller.
pub async fn handle_client<S, E>(mut stream: S, cfg: Arc<Config>, engine: Arc<E>) -> io::Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
    E: SqlEngine,
{
    let mut buf = BytesMut::with_capacity(READ_BUF_BYTES);
    let mut phase = AuthPhase::Startup;

    loop {
        let n = stream.read_buf(&mut buf).await?;
        if n == 0 {
            debug!("peer closed ({} byte(s) left unconsumed)", buf.len());
            return Ok(());
        }

        loop {
            let msg = classify(&buf, phase);
            match msg.kind {
                FrontendKind::InsufficientData => {
                    if buf.len() > cfg.limits.max_buffered_bytes {
                        warn!(
                            "buffered {} bytes without completing a message (cap {}); closing",
                            buf.len(),
                            cfg.limits.max_buffered_bytes
                        );
                        METRICS.overflow_closes.fetch_add(1, Ordering::Relaxed);
                        return Ok(());
                    }
                    break;
                }
                FrontendKind::Unknown => {
                    warn!("unrecognized leading byte 0x{:02x}; closing", buf[0]);
                    if log_enabled!(log::Level::Debug) {
                        debug!("offending buffer hex dump:\n{}", hex_dump(&buf, 64));
                    }
                    METRICS.unknown_closes.fetch_add(1, Ordering::Relaxed);
                    return Ok(());
                }
                FrontendKind::Terminate => {
                    debug!("client sent Terminate");
                    return Ok(());
                }
                _ => {
                    debug!("dispatching {:?} ({} bytes)", msg.kind, msg.length);

                    if let Some(response) = encode_response(&msg, engine.as_ref(), &cfg).await {
                        write_all(&mut stream, &response).await?;
                    }
                    METRICS.messages_total.fetch_add(1, Ordering::Relaxed);

                    if msg.kind == FrontendKind::CancelRequest {
                        // Cancel arrives on a dedicated side connection; once
                        // seen there is nothing further to read on it.
                        debug!("cancel request; closing side connection");
                        return Ok(());
                    }

                    if msg.kind == FrontendKind::StartupMessage && phase == AuthPhase::Startup {
                        phase = AuthPhase::Ready;
                    }

                    buf.advance(msg.length);
                }
            }
        }
    }
}
