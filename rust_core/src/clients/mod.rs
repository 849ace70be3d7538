//! Upstream market source and outbound alert delivery.

use crate::alerts::PriceAlert;
use crate::models::Market;
use async_trait::async_trait;

pub mod polymarket;
pub mod telegram;

// Re-export commonly used types
pub use polymarket::{FetchError, PolymarketClient};
pub use telegram::{SendRejected, TelegramClient};

/// Where the monitor gets its markets from, once per cycle.
#[async_trait]
pub trait MarketSource: Send + Sync {
    /// Current listing. Errors are transient; callers treat them as "no
    /// markets this cycle".
    async fn fetch_markets(&self) -> Result<Vec<Market>, FetchError>;

    /// Source name for logging
    fn source_name(&self) -> &str;
}

/// Best-effort alert delivery.
#[async_trait]
pub trait AlertSink: Send + Sync {
    /// Deliver one alert. Returns whether delivery succeeded; failures are
    /// logged by the implementation and never retried.
    async fn notify(&self, alert: &PriceAlert) -> bool;
}

/// One-request-per-connection HTTP stub for client tests.
#[cfg(test)]
pub(crate) mod test_server {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::task::JoinHandle;

    /// Answer each incoming connection with the next canned `(status, body)`.
    /// The task resolves to the request bodies it received, in order.
    pub async fn serve(responses: Vec<(u16, &'static str)>) -> (String, JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());

        let task = tokio::spawn(async move {
            let mut bodies = Vec::new();
            for (status, body) in responses {
                let (mut stream, _) = listener.accept().await.unwrap();
                bodies.push(read_body(&mut stream).await);
                let reply = format!(
                    "HTTP/1.1 {} Stub\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                stream.write_all(reply.as_bytes()).await.unwrap();
                let _ = stream.shutdown().await;
            }
            bodies
        });

        (base, task)
    }

    async fn read_body(stream: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = stream.read(&mut chunk).await.unwrap();
            if n == 0 {
                return String::new();
            }
            buf.extend_from_slice(&chunk[..n]);

            if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                let head = String::from_utf8_lossy(&buf[..end]).to_lowercase();
                let len = head
                    .lines()
                    .find_map(|line| line.strip_prefix("content-length:"))
                    .and_then(|v| v.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                while buf.len() < end + 4 + len {
                    let n = stream.read(&mut chunk).await.unwrap();
                    if n == 0 {
                        break;
                    }
                    buf.extend_from_slice(&chunk[..n]);
                }
                return String::from_utf8_lossy(&buf[end + 4..]).into_owned();
            }
        }
    }
}
