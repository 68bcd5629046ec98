//! Test fixtures: configs, payloads and HTTP servers

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use remote_dl::{Config, DownloadRequest};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use wiremock::{Request, Respond, ResponseTemplate};

/// Config rooted in `root`, tuned for fast tests
pub fn test_config(root: &Path) -> Config {
    let mut config = Config::default();
    config.download.download_dir = root.join("downloads");
    config.download.max_concurrent_downloads = 2;
    config.download.chunk_size = 64 * 1024;
    config.download.timeout = Duration::from_secs(20);
    config.persistence.state_dir = root.join("state");
    config.persistence.state_save_interval = Duration::from_millis(100);
    config.retry.max_attempts = 3;
    config.retry.base_delay = Duration::from_millis(20);
    config.notifications.notify_interval = Duration::from_millis(100);
    config
}

/// Deterministic payload of `len` bytes
pub fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 7 % 256) as u8).collect()
}

/// Request for `url` with defaults
pub fn request(url: impl Into<String>) -> DownloadRequest {
    DownloadRequest {
        url: url.into(),
        ..Default::default()
    }
}

/// Byte offset from a `Range: bytes=N-` value
pub fn range_start(value: &str) -> Option<usize> {
    value
        .strip_prefix("bytes=")?
        .trim_end_matches('-')
        .parse()
        .ok()
}

/// wiremock responder serving `body` with `Range` support
pub struct RangeResponder {
    /// Full resource
    pub body: Vec<u8>,
    /// Delay applied to every response
    pub delay: Duration,
}

impl RangeResponder {
    /// Immediate responses
    pub fn new(body: Vec<u8>) -> Self {
        Self {
            body,
            delay: Duration::ZERO,
        }
    }
}

impl Respond for RangeResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let len = self.body.len();
        let start = request
            .headers
            .get("range")
            .and_then(|v| v.to_str().ok())
            .and_then(range_start);
        let template = match start {
            Some(start) if start >= len => ResponseTemplate::new(416)
                .insert_header("content-range", format!("bytes */{len}")),
            Some(start) => ResponseTemplate::new(206)
                .insert_header("content-range", format!("bytes {start}-{}/{len}", len - 1))
                .set_body_bytes(self.body[start..].to_vec()),
            None => ResponseTemplate::new(200).set_body_bytes(self.body.clone()),
        };
        template.set_delay(self.delay)
    }
}

/// Range headers seen by [`spawn_truncating_server`], one entry per request
pub type SeenRanges = Arc<Mutex<Vec<Option<String>>>>;

/// Serve `body` over raw HTTP/1.1, dropping the first connection after `cut_at` bytes.
///
/// The first response promises the full length and closes early. Every later
/// request is answered with a 206 from its `Range` offset.
pub async fn spawn_truncating_server(body: Vec<u8>, cut_at: usize) -> (String, SeenRanges) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let seen: SeenRanges = Arc::new(Mutex::new(Vec::new()));
    let ranges = seen.clone();

    tokio::spawn(async move {
        let mut first = true;
        while let Ok((mut socket, _)) = listener.accept().await {
            let head = read_request_head(&mut socket).await;
            let range = head.lines().find_map(|line| {
                let (name, value) = line.split_once(':')?;
                name.eq_ignore_ascii_case("range")
                    .then(|| value.trim().to_string())
            });
            ranges.lock().unwrap().push(range.clone());

            if first {
                first = false;
                let head = format!(
                    "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    body.len()
                );
                socket.write_all(head.as_bytes()).await.ok();
                socket.write_all(&body[..cut_at]).await.ok();
                socket.flush().await.ok();
                // Dropped here, mid-body
                continue;
            }

            let start = range.as_deref().and_then(range_start).unwrap_or(0);
            let rest = &body[start..];
            let head = format!(
                "HTTP/1.1 206 Partial Content\r\nContent-Length: {}\r\nContent-Range: bytes {}-{}/{}\r\nConnection: close\r\n\r\n",
                rest.len(),
                start,
                body.len() - 1,
                body.len()
            );
            socket.write_all(head.as_bytes()).await.ok();
            socket.write_all(rest).await.ok();
            socket.shutdown().await.ok();
        }
    });

    (format!("http://{addr}"), seen)
}

async fn read_request_head(socket: &mut tokio::net::TcpStream) -> String {
    let mut head = Vec::new();
    let mut buf = [0u8; 4096];
    loop {
        let n = socket.read(&mut buf).await.unwrap_or(0);
        if n == 0 {
            break;
        }
        head.extend_from_slice(&buf[..n]);
        if head.windows(4).any(|w| w == b"\r\n\r\n") {
            break;
        }
    }
    String::from_utf8_lossy(&head).into_owned()
}
