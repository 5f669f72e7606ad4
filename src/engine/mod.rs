//! SQL engine collaborator interface.
//!
//! The front-end does not parse SQL or build result rows itself. Each
//! query-family protocol message is handed to an engine as raw bytes, and
//! whatever backend wire bytes the engine produces are relayed to the client
//! unchanged. Engine construction and schema seeding happen before the
//! listener starts and are the embedder's concern.

use async_trait::async_trait;
use bytes::Bytes;

pub use crate::common::error::EngineError;

/// An embedded SQL engine that consumes extended/simple-query protocol bytes.
///
/// One call per frontend message. On success the returned bytes are already
/// wire-encoded backend messages; on failure the diagnostic string is wrapped
/// in an ErrorResponse and the connection stays open. The engine is shared by
/// every connection and provides its own internal serialization.
#[async_trait]
pub trait SqlEngine: Send + Sync {
    /// Execute one already-framed protocol message.
    async fn exec_protocol(&self, message: &[u8]) -> Result<Bytes, EngineError>;
}
