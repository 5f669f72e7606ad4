//! Backend message builders and response dispatch.

use bytes::{BufMut, Bytes, BytesMut};
use log::*;
use std::sync::atomic::Ordering;

use crate::config::Config;
use crate::engine::SqlEngine;
use crate::metrics::METRICS;

use super::codec::{frame, put_cstr};
use super::types::{FrontendKind, FrontendMessage};

/// Transaction status reported in ReadyForQuery: idle.
const TX_IDLE: u8 = b'I';

/// Single-byte refusal sent for SSLRequest and GSSENCRequest; no further
/// negotiation follows.
pub fn encode_tls_refusal() -> Bytes {
    Bytes::from_static(b"N")
}

/// AuthenticationOk: `R`, length 8, auth code 0.
pub fn encode_authentication_ok() -> BytesMut {
    let mut p = BytesMut::with_capacity(4);
    p.put_u32(0);
    frame(b'R', &p)
}

/// ParameterStatus: `S`, null-terminated key and value.
pub fn encode_parameter_status(key: &str, value: &str) -> BytesMut {
    let mut p = BytesMut::with_capacity(key.len() + value.len() + 2);
    put_cstr(&mut p, key);
    put_cstr(&mut p, value);
    frame(b'S', &p)
}

/// BackendKeyData: `K`, length 12, process id and secret key.
pub fn encode_backend_key_data(process_id: u32, secret_key: u32) -> BytesMut {
    let mut p = BytesMut::with_capacity(8);
    p.put_u32(process_id);
    p.put_u32(secret_key);
    frame(b'K', &p)
}

/// ReadyForQuery: `Z`, length 5, idle transaction status.
pub fn encode_ready_for_query() -> BytesMut {
    frame(b'Z', &[TX_IDLE])
}

/// ErrorResponse carrying a single `M` diagnostic field, immediately
/// followed by ReadyForQuery so the client can continue.
pub fn encode_error_response(message: &str) -> BytesMut {
    let mut p = BytesMut::with_capacity(1 + message.len() + 2);
    p.put_u8(b'M');
    put_cstr(&mut p, message);
    // End of fields
    p.put_u8(0);
    let mut out = frame(b'E', &p);
    out.extend_from_slice(&encode_ready_for_query());
    out
}

/// Fixed startup handshake: AuthenticationOk, ParameterStatus (when a server
/// version is configured), BackendKeyData, ReadyForQuery.
///
/// Some client tools query `server_version` during startup but treat the
/// value as opaque; only its presence matters.
pub fn encode_startup_response(cfg: &Config) -> BytesMut {
    let srv = &cfg.server;
    let mut out = encode_authentication_ok();
    if !srv.server_version.is_empty() {
        out.extend_from_slice(&encode_parameter_status("server_version", &srv.server_version));
    }
    out.extend_from_slice(&encode_backend_key_data(srv.process_id, srv.secret_key));
    out.extend_from_slice(&encode_ready_for_query());
    out
}

/// Encode the response owed for one classified message, calling the engine
/// for the query-family kinds. `None` means no bytes are owed.
///
/// `Terminate`, `Unknown` and `InsufficientData` are intercepted by the
/// session loop and never dispatched here.
pub async fn encode_response<E>(msg: &FrontendMessage, engine: &E, cfg: &Config) -> Option<Bytes>
where
    E: SqlEngine + ?Sized,
{
    match msg.kind {
        FrontendKind::SslRequest | FrontendKind::GssEncRequest => Some(encode_tls_refusal()),

        FrontendKind::StartupMessage => Some(encode_startup_response(cfg).freeze()),

        // The sender is a short-lived side connection distinct from the one
        // running the query; nothing is answered and no cancellation is
        // forwarded. The session loop closes the connection afterward.
        FrontendKind::CancelRequest => None,

        FrontendKind::Bind
        | FrontendKind::Close
        | FrontendKind::CopyFail
        | FrontendKind::Describe
        | FrontendKind::Execute
        | FrontendKind::Flush
        | FrontendKind::FunctionCall
        | FrontendKind::GssResponse
        | FrontendKind::Parse
        | FrontendKind::PasswordMessage
        | FrontendKind::Query
        | FrontendKind::SaslResponse
        | FrontendKind::Sync => match engine.exec_protocol(&msg.payload).await {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                debug!("engine rejected {:?}: {}", msg.kind, e);
                METRICS.engine_errors.fetch_add(1, Ordering::Relaxed);
                Some(encode_error_response(e.message()).freeze())
            }
        },

        FrontendKind::Terminate | FrontendKind::Unknown | FrontendKind::InsufficientData => None,
    }
}
