//! Readiness probe primitives.
//!
//! A probe answers one question: is the service ready to serve
//! dependents right now? Each attempt is bounded by the caller's
//! timeout; the retry/interval policy lives in the gate, not here.

use std::time::Duration;

use tracing::debug;

/// Result of a single probe attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeResult {
    /// The probe succeeded.
    Healthy,
    /// The probe executed but reported not-ready (non-2xx, exit != 0).
    Unhealthy,
    /// The probe could not be executed (connection error, timeout).
    Failed,
}

/// Attempt a TCP connection; an accepted connection means ready.
pub async fn tcp_probe(address: &str, timeout: Duration) -> ProbeResult {
    match tokio::time::timeout(timeout, tokio::net::TcpStream::connect(address)).await {
        Ok(Ok(_stream)) => ProbeResult::Healthy,
        Ok(Err(e)) => {
            debug!(error = %e, %address, "tcp probe connection failed");
            ProbeResult::Failed
        }
        Err(_) => {
            debug!(%address, "tcp probe timed out");
            ProbeResult::Failed
        }
    }
}

/// GET an HTTP path; a 2xx response means ready.
pub async fn http_probe(address: &str, path: &str, timeout: Duration) -> ProbeResult {
    let uri = format!("http://{address}{path}");

    let result = tokio::time::timeout(timeout, async {
        let stream = match tokio::net::TcpStream::connect(address).await {
            Ok(s) => s,
            Err(e) => {
                debug!(error = %e, %uri, "http probe connection failed");
                return ProbeResult::Failed;
            }
        };

        let io = hyper_util::rt::TokioIo::new(stream);
        let (mut sender, conn) = match hyper::client::conn::http1::handshake(io).await {
            Ok(pair) => pair,
            Err(e) => {
                debug!(error = %e, %uri, "http probe handshake failed");
                return ProbeResult::Failed;
            }
        };

        // Drive the connection in the background.
        tokio::spawn(async move {
            let _ = conn.await;
        });

        let req = match http::Request::builder()
            .method("GET")
            .uri(&uri)
            .header("host", address)
            .header("user-agent", "convoy-health/0.1")
            .body(http_body_util::Empty::<bytes::Bytes>::new())
        {
            Ok(req) => req,
            Err(e) => {
                debug!(error = %e, %uri, "http probe request build failed");
                return ProbeResult::Failed;
            }
        };

        match sender.send_request(req).await {
            Ok(resp) => {
                if resp.status().is_success() {
                    ProbeResult::Healthy
                } else {
                    debug!(status = %resp.status(), %uri, "http probe non-2xx");
                    ProbeResult::Unhealthy
                }
            }
            Err(e) => {
                debug!(error = %e, %uri, "http probe request failed");
                ProbeResult::Failed
            }
        }
    })
    .await;

    match result {
        Ok(probe) => probe,
        Err(_) => {
            debug!(%uri, "http probe timed out");
            ProbeResult::Failed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    const TIMEOUT: Duration = Duration::from_secs(2);

    async fn local_listener() -> (TcpListener, String) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        (listener, addr)
    }

    #[tokio::test]
    async fn tcp_probe_succeeds_against_listener() {
        let (listener, addr) = local_listener().await;
        tokio::spawn(async move {
            let _ = listener.accept().await;
        });

        assert_eq!(tcp_probe(&addr, TIMEOUT).await, ProbeResult::Healthy);
    }

    #[tokio::test]
    async fn tcp_probe_fails_against_closed_port() {
        let (listener, addr) = local_listener().await;
        drop(listener);

        assert_eq!(tcp_probe(&addr, TIMEOUT).await, ProbeResult::Failed);
    }

    async fn serve_http_status(listener: TcpListener, status_line: &'static str) {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut buf = [0u8; 1024];
        let _ = stream.read(&mut buf).await;
        let response = format!("HTTP/1.1 {status_line}\r\ncontent-length: 0\r\n\r\n");
        stream.write_all(response.as_bytes()).await.unwrap();
    }

    #[tokio::test]
    async fn http_probe_healthy_on_200() {
        let (listener, addr) = local_listener().await;
        tokio::spawn(serve_http_status(listener, "200 OK"));

        assert_eq!(
            http_probe(&addr, "/healthz", TIMEOUT).await,
            ProbeResult::Healthy
        );
    }

    #[tokio::test]
    async fn http_probe_unhealthy_on_503() {
        let (listener, addr) = local_listener().await;
        tokio::spawn(serve_http_status(listener, "503 Service Unavailable"));

        assert_eq!(
            http_probe(&addr, "/healthz", TIMEOUT).await,
            ProbeResult::Unhealthy
        );
    }

    #[tokio::test]
    async fn http_probe_fails_without_server() {
        let (listener, addr) = local_listener().await;
        drop(listener);

        assert_eq!(
            http_probe(&addr, "/healthz", TIMEOUT).await,
            ProbeResult::Failed
        );
    }
}
