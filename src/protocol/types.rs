//! Frontend protocol type definitions.

use bytes::Bytes;

/// Recognized frontend message kinds, plus the two classifier sentinels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrontendKind {
    Bind,
    CancelRequest,
    Close,
    CopyFail,
    Describe,
    Execute,
    Flush,
    FunctionCall,
    GssEncRequest,
    GssResponse,
    Parse,
    PasswordMessage,
    Query,
    SaslResponse,
    SslRequest,
    StartupMessage,
    Sync,
    Terminate,
    /// Leading byte not in the tag table and not a startup-phase probe.
    Unknown,
    /// Not enough buffered bytes to classify yet.
    InsufficientData,
}

/// Authentication sub-phase of a connection.
///
/// The identifier byte `p` names three different messages on the wire;
/// only the current phase tells them apart.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthPhase {
    /// Connection negotiation, before the startup response is sent.
    Startup,
    /// The server asked for a cleartext or md5 password.
    PasswordRequested,
    /// The server started a GSSAPI exchange.
    GssRequested,
    /// The server started a SASL exchange.
    SaslRequested,
    /// Authentication finished; normal query traffic.
    Ready,
}

/// One classified frontend message.
///
/// `length` is the total on-wire size including any tag byte and length
/// header (0 for the sentinels); `payload` is an independent copy of exactly
/// that many bytes from the front of the accumulation buffer, so the buffer
/// can be trimmed without invalidating it.
#[derive(Clone, Debug)]
pub struct FrontendMessage {
    pub kind: FrontendKind,
    pub length: usize,
    pub payload: Bytes,
}

impl FrontendMessage {
    pub(crate) fn sentinel(kind: FrontendKind) -> Self {
        Self {
            kind,
            length: 0,
            payload: Bytes::new(),
        }
    }
}
