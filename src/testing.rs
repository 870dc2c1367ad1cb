//! Local stand-in for the avatar host, used by the tests.
//!
//! The first character of the requested hash picks the response:
//! `j` JPEG, `p` PNG, `c` PNG sent one byte per chunk, `s` a two byte body,
//! `x` a 404, anything else a GIF (unknown to the sniffer).

use std::{
    collections::HashMap,
    io,
    net::SocketAddr,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use axum::{
    Router,
    body::{Body, Bytes},
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};

use crate::cache::avatar_url;

pub const JPEG_BODY: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F'];
pub const PNG_BODY: &[u8] = &[0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1A, b'\n', 0x00, 0x0D];
pub const UNKNOWN_BODY: &[u8] = b"GIF89a\x01\x00\x01\x00";

/// A 32 character hash starting with `kind`
pub fn test_hash(kind: char) -> String {
    format!("{kind}{}", "0".repeat(31))
}

pub struct AvatarServer {
    addr: SocketAddr,
    hits: Arc<AtomicUsize>,
}

impl AvatarServer {
    pub async fn start() -> Self {
        let hits = Arc::new(AtomicUsize::new(0));
        let app = Router::new()
            .route("/avatar/{hash}", get(avatar))
            .with_state(hits.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, hits }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}/avatar", self.addr)
    }

    pub fn avatar_url(&self, hash: &str) -> String {
        avatar_url(&self.base_url(), hash)
    }

    /// Client that never goes through a proxy from the environment
    pub fn client(&self) -> reqwest::Client {
        reqwest::Client::builder().no_proxy().build().unwrap()
    }

    /// Number of avatar requests served so far
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

async fn avatar(
    State(hits): State<Arc<AtomicUsize>>,
    Path(hash): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    hits.fetch_add(1, Ordering::SeqCst);

    let canonical = params.get("s").map(String::as_str) == Some("50")
        && params.get("d").map(String::as_str) == Some("identicon")
        && params.get("r").map(String::as_str) == Some("pg");
    if !canonical {
        return (StatusCode::BAD_REQUEST, "unexpected avatar query").into_response();
    }

    match hash.chars().next() {
        Some('j') => JPEG_BODY.into_response(),
        Some('p') => PNG_BODY.into_response(),
        Some('c') => {
            let chunks = PNG_BODY
                .iter()
                .map(|byte| Ok::<_, std::io::Error>(Bytes::from(vec![*byte])));
            Body::from_stream(futures_util::stream::iter(chunks)).into_response()
        }
        Some('s') => (&b"\x89P"[..]).into_response(),
        Some('x') => (StatusCode::NOT_FOUND, "no such avatar").into_response(),
        _ => UNKNOWN_BODY.into_response(),
    }
}

/// Log output captured by [`capture_logs`]
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Route this thread's `tracing` output into a buffer until the guard drops.
///
/// Only sound with a current-thread runtime, which `#[tokio::test]` uses.
pub fn capture_logs() -> (tracing::subscriber::DefaultGuard, CapturedLogs) {
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();

    (tracing::subscriber::set_default(subscriber), logs)
}
