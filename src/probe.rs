use async_trait::async_trait;
use std::future::Future;
use std::io;
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tracing::debug;

use crate::models::{ProbeResult, Status};

/// A single reachability check against the target.
#[async_trait]
pub trait Probe: Send + Sync {
    async fn probe(&self, host: &str, port: u16) -> ProbeResult;
}

/// Plain TCP connect probe. One attempt, bounded by `timeout`.
pub struct TcpProbe {
    timeout: Duration,
}

impl TcpProbe {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl Probe for TcpProbe {
    async fn probe(&self, host: &str, port: u16) -> ProbeResult {
        let result = tcp_check(host, port, self.timeout).await;
        debug!(host, port, status = %result.status, reason = %result.message, "Probe finished");
        result
    }
}

pub async fn tcp_check(host: &str, port: u16, timeout: Duration) -> ProbeResult {
    bounded_connect(TcpStream::connect((host, port)), timeout).await
}

/// Maps one connect attempt, cut off at `timeout`, onto a probe outcome.
async fn bounded_connect<F, S>(connect: F, timeout: Duration) -> ProbeResult
where
    F: Future<Output = io::Result<S>>,
{
    let start = Instant::now();
    match tokio::time::timeout(timeout, connect).await {
        Ok(Ok(_stream)) => ProbeResult {
            status: Status::Reachable,
            latency_ms: Some(start.elapsed().as_secs_f64() * 1000.0),
            message: "TCP handshake succeeded".into(),
        },
        Ok(Err(e)) => ProbeResult {
            status: Status::Unreachable,
            latency_ms: None,
            message: format!("Connection failed: {}", e),
        },
        Err(_) => ProbeResult {
            status: Status::Unreachable,
            latency_ms: None,
            message: format!("No answer within {}ms", timeout.as_millis()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_listening_port_is_reachable() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let result = TcpProbe::new(Duration::from_secs(2)).probe("127.0.0.1", port).await;

        assert_eq!(result.status, Status::Reachable);
        assert!(result.latency_ms.is_some());
    }

    #[tokio::test]
    async fn test_closed_port_is_unreachable() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let result = TcpProbe::new(Duration::from_secs(2)).probe("127.0.0.1", port).await;

        assert_eq!(result.status, Status::Unreachable);
        assert!(result.latency_ms.is_none());
    }

    #[tokio::test]
    async fn test_unresolvable_host_is_unreachable() {
        let result = tcp_check("no-such-host.invalid", 22, Duration::from_secs(2)).await;
        assert_eq!(result.status, Status::Unreachable);
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_that_never_completes_times_out() {
        let start = tokio::time::Instant::now();
        let result = bounded_connect(
            std::future::pending::<io::Result<TcpStream>>(),
            Duration::from_millis(3000),
        )
        .await;

        assert_eq!(result.status, Status::Unreachable);
        assert_eq!(result.message, "No answer within 3000ms");
        assert!(start.elapsed() >= Duration::from_millis(3000));
    }

    #[tokio::test]
    async fn test_timeout_bounds_the_attempt() {
        // TEST-NET-3 may be routed somewhere; only the deadline is guaranteed.
        let start = Instant::now();
        let result = tcp_check("203.0.113.7", 22, Duration::from_millis(200)).await;

        assert!(start.elapsed() < Duration::from_secs(2));
        if result.message.starts_with("No answer") {
            assert_eq!(result.status, Status::Unreachable);
        }
    }
}
