//! End-to-end tests over real TCP connections.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{sleep, timeout};

use veles::common::EngineError;
use veles::config::{Config, Limits};
use veles::engine::SqlEngine;
use veles::net::accept_loop;

/// Engine stub recording payloads and answering with canned result bytes.
struct RecordingEngine {
    calls: Mutex<Vec<Vec<u8>>>,
    result: &'static [u8],
}

impl RecordingEngine {
    fn new(result: &'static [u8]) -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            result,
        })
    }

    fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl SqlEngine for RecordingEngine {
    async fn exec_protocol(&self, message: &[u8]) -> Result<Bytes, EngineError> {
        self.calls.lock().unwrap().push(message.to_vec());
        Ok(Bytes::from_static(self.result))
    }
}

async fn start_server(engine: Arc<RecordingEngine>, cfg: Config) -> SocketAddr {
    let _ = env_logger::builder().is_test(true).try_init();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(accept_loop(listener, Arc::new(cfg), engine));
    addr
}

fn ssl_request() -> Vec<u8> {
    let mut wire = 8u32.to_be_bytes().to_vec();
    wire.extend_from_slice(&[0x04, 0xd2, 0x16, 0x2f]);
    wire
}

fn gssenc_request() -> Vec<u8> {
    let mut wire = 8u32.to_be_bytes().to_vec();
    wire.extend_from_slice(&[0x04, 0xd2, 0x16, 0x30]);
    wire
}

fn startup_message() -> Vec<u8> {
    let params = b"user\0postgres\0database\0postgres\0\0";
    let mut wire = ((8 + params.len()) as u32).to_be_bytes().to_vec();
    wire.extend_from_slice(&[0x00, 0x03, 0x00, 0x00]);
    wire.extend_from_slice(params);
    wire
}

fn query_message(sql: &str) -> Vec<u8> {
    let mut wire = vec![b'Q'];
    wire.extend_from_slice(&((4 + sql.len() + 1) as u32).to_be_bytes());
    wire.extend_from_slice(sql.as_bytes());
    wire.push(0);
    wire
}

/// The handshake bytes owed for the default configuration.
fn expected_handshake(server_version: &str, process_id: u32, secret_key: u32) -> Vec<u8> {
    let mut out = vec![b'R', 0, 0, 0, 8, 0, 0, 0, 0];

    out.push(b'S');
    let body_len = 4 + "server_version".len() + 1 + server_version.len() + 1;
    out.extend_from_slice(&(body_len as u32).to_be_bytes());
    out.extend_from_slice(b"server_version\0");
    out.extend_from_slice(server_version.as_bytes());
    out.push(0);

    out.extend_from_slice(&[b'K', 0, 0, 0, 12]);
    out.extend_from_slice(&process_id.to_be_bytes());
    out.extend_from_slice(&secret_key.to_be_bytes());

    out.extend_from_slice(&[b'Z', 0, 0, 0, 5, b'I']);
    out
}

async fn read_exact_timed(stream: &mut TcpStream, n: usize) -> Vec<u8> {
    let mut buf = vec![0u8; n];
    timeout(Duration::from_secs(5), stream.read_exact(&mut buf))
        .await
        .expect("read timed out")
        .expect("read failed");
    buf
}

#[tokio::test]
async fn ssl_probe_then_startup_handshake_is_byte_exact() {
    let engine = RecordingEngine::new(b"");
    let addr = start_server(engine, Config::default()).await;

    let mut stream = TcpStream::connect(addr).await.unwrap();

    // Real clients probe for SSL first and fall back on 'N'
    stream.write_all(&ssl_request()).await.unwrap();
    let refusal = read_exact_timed(&mut stream, 1).await;
    assert_eq!(&refusal, b"N");

    stream.write_all(&startup_message()).await.unwrap();
    let expected = expected_handshake("16.3", 1, 2);
    let handshake = read_exact_timed(&mut stream, expected.len()).await;
    assert_eq!(handshake, expected);
}

#[tokio::test]
async fn query_delivered_across_three_writes_dispatches_once() {
    let engine = RecordingEngine::new(b"result-bytes-from-engine");
    let addr = start_server(engine.clone(), Config::default()).await;

    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(&startup_message()).await.unwrap();
    let expected = expected_handshake("16.3", 1, 2);
    read_exact_timed(&mut stream, expected.len()).await;

    let wire = query_message("select 1;");
    for chunk in [&wire[..2], &wire[2..9], &wire[9..]] {
        stream.write_all(chunk).await.unwrap();
        stream.flush().await.unwrap();
        sleep(Duration::from_millis(20)).await;
    }

    let out = read_exact_timed(&mut stream, b"result-bytes-from-engine".len()).await;
    assert_eq!(&out, b"result-bytes-from-engine");
    assert_eq!(engine.call_count(), 1, "exactly one dispatch");
    assert_eq!(engine.calls.lock().unwrap()[0], wire);
}

#[tokio::test]
async fn gssenc_request_is_refused() {
    let engine = RecordingEngine::new(b"");
    let addr = start_server(engine.clone(), Config::default()).await;

    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(&gssenc_request()).await.unwrap();
    let refusal = read_exact_timed(&mut stream, 1).await;
    assert_eq!(&refusal, b"N");
    assert_eq!(engine.call_count(), 0);
}

#[tokio::test]
async fn connection_limit_drops_extra_clients() {
    let engine = RecordingEngine::new(b"");
    let cfg = Config {
        limits: Limits {
            max_active_conns: 0,
            ..Default::default()
        },
        ..Default::default()
    };
    let addr = start_server(engine, cfg).await;

    let mut stream = TcpStream::connect(addr).await.unwrap();
    let mut buf = [0u8; 1];
    let n = timeout(Duration::from_secs(5), stream.read(&mut buf))
        .await
        .expect("read timed out")
        .expect("read failed");
    assert_eq!(n, 0, "refused connection must be dropped");
}
