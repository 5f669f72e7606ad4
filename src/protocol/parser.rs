//! Streaming frontend message classification.
//!
//! Two message families share the wire. Startup-phase messages carry no tag
//! byte and are identified by a fixed 4-byte magic at offset 4, with the
//! total length in a big-endian u32 at offset 0. Regular messages carry a
//! single tag byte followed by a big-endian u32 length that counts itself
//! and the payload but not the tag.

use bytes::Bytes;

use super::types::{AuthPhase, FrontendKind, FrontendMessage};

/// Tag byte size for regular messages.
const TAG_LENGTH: usize = 1;

/// Bytes needed before a startup-phase probe can be evaluated: the 4-byte
/// length header plus the 4-byte magic behind it.
const PROBE_WINDOW: usize = 8;

/// Startup-phase probe entry: expected magic at offset 4, resulting kind.
struct Probe {
    magic: [u8; 4],
    kind: FrontendKind,
}

/// Probe priority order. The cancel/GSSENC/SSL requests carry reserved fake
/// version numbers (1234.5678, 1234.5680, 1234.5679); StartupMessage carries
/// the real protocol version 3.0.
const PROBES: [Probe; 4] = [
    Probe {
        magic: [0x04, 0xd2, 0x16, 0x2e],
        kind: FrontendKind::CancelRequest,
    },
    Probe {
        magic: [0x04, 0xd2, 0x16, 0x30],
        kind: FrontendKind::GssEncRequest,
    },
    Probe {
        magic: [0x04, 0xd2, 0x16, 0x2f],
        kind: FrontendKind::SslRequest,
    },
    Probe {
        magic: [0x00, 0x03, 0x00, 0x00],
        kind: FrontendKind::StartupMessage,
    },
];

/// Resolve a leading tag byte, using the auth phase to tell the three
/// `p`-tagged messages apart. Outside an active GSSAPI/SASL exchange a `p`
/// message is read as a password.
fn resolve_tag(tag: u8, phase: AuthPhase) -> Option<FrontendKind> {
    let kind = match tag {
        b'B' => FrontendKind::Bind,
        b'C' => FrontendKind::Close,
        b'f' => FrontendKind::CopyFail,
        b'D' => FrontendKind::Describe,
        b'E' => FrontendKind::Execute,
        b'H' => FrontendKind::Flush,
        b'F' => FrontendKind::FunctionCall,
        b'P' => FrontendKind::Parse,
        b'Q' => FrontendKind::Query,
        b'S' => FrontendKind::Sync,
        b'X' => FrontendKind::Terminate,
        b'p' => match phase {
            AuthPhase::GssRequested => FrontendKind::GssResponse,
            AuthPhase::SaslRequested => FrontendKind::SaslResponse,
            AuthPhase::Startup | AuthPhase::PasswordRequested | AuthPhase::Ready => {
                FrontendKind::PasswordMessage
            }
        },
        _ => return None,
    };
    Some(kind)
}

/// Classify the front of the accumulation buffer.
///
/// Returns `InsufficientData` whenever the buffered bytes cannot be
/// classified yet, `Unknown` for an unrecognized or structurally insane
/// leading sequence, and otherwise the recognized kind together with an
/// owned copy of exactly its on-wire bytes. The declared length is always
/// verified against the buffered byte count before slicing; a truncated
/// payload is never produced.
pub fn classify(buf: &[u8], phase: AuthPhase) -> FrontendMessage {
    if buf.is_empty() {
        return FrontendMessage::sentinel(FrontendKind::InsufficientData);
    }

    if buf.len() >= PROBE_WINDOW {
        for probe in &PROBES {
            if buf[4..PROBE_WINDOW] == probe.magic {
                let declared = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]) as usize;
                if declared < PROBE_WINDOW {
                    // The length header must at least cover itself and the
                    // magic; anything shorter cannot be a real message.
                    return FrontendMessage::sentinel(FrontendKind::Unknown);
                }
                if buf.len() < declared {
                    return FrontendMessage::sentinel(FrontendKind::InsufficientData);
                }
                return slice_message(probe.kind, declared, buf);
            }
        }
    }

    let Some(kind) = resolve_tag(buf[0], phase) else {
        // A startup-phase message begins with its length header, so until a
        // full probe window is buffered the leading byte cannot be ruled
        // unknown without misrouting partially-delivered probes.
        if buf.len() < PROBE_WINDOW {
            return FrontendMessage::sentinel(FrontendKind::InsufficientData);
        }
        return FrontendMessage::sentinel(FrontendKind::Unknown);
    };

    if buf.len() < TAG_LENGTH + 4 {
        return FrontendMessage::sentinel(FrontendKind::InsufficientData);
    }
    let declared_body = u32::from_be_bytes([buf[1], buf[2], buf[3], buf[4]]) as usize;
    if declared_body < 4 {
        // The length field counts itself.
        return FrontendMessage::sentinel(FrontendKind::Unknown);
    }
    let declared = TAG_LENGTH + declared_body;
    if buf.len() < declared {
        return FrontendMessage::sentinel(FrontendKind::InsufficientData);
    }
    slice_message(kind, declared, buf)
}

fn slice_message(kind: FrontendKind, length: usize, buf: &[u8]) -> FrontendMessage {
    FrontendMessage {
        kind,
        length,
        payload: Bytes::copy_from_slice(&buf[..length]),
    }
}
