//! Minimal HTTP endpoint serving the Prometheus text format.

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::metrics::encode_metrics;
use crate::TelemetryError;

/// Longest request line read before routing.
const MAX_REQUEST_LINE: u64 = 8 * 1024;

/// Bind the metrics listener on `0.0.0.0:port`.
pub async fn bind_metrics(port: u16) -> Result<TcpListener, TelemetryError> {
    TcpListener::bind(("0.0.0.0", port))
        .await
        .map_err(|e| TelemetryError::MetricsInit(format!("bind port {port}: {e}")))
}

/// Serve `GET /metrics` until `shutdown` flips to `true`.
pub async fn serve_metrics(listener: TcpListener, mut shutdown: watch::Receiver<bool>) {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "Metrics endpoint listening");
    }

    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, addr)) => {
                    debug!(%addr, "Metrics request");
                    tokio::spawn(handle_connection(stream));
                }
                Err(e) => warn!(error = %e, "Failed to accept metrics connection"),
            },
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    debug!("Metrics endpoint stopping");
                    return;
                }
            }
        }
    }
}

async fn handle_connection(mut stream: TcpStream) {
    let (reader, mut writer) = stream.split();
    let request_line = match read_request_line(reader).await {
        Ok(line) => line,
        Err(e) => {
            debug!(error = %e, "Failed to read metrics request");
            return;
        }
    };

    let response = render_response(&request_line);
    if let Err(e) = writer.write_all(response.as_bytes()).await {
        debug!(error = %e, "Failed to write metrics response");
    }
}

/// Read up to and including the first `\n`, however many segments it spans.
async fn read_request_line<R>(reader: R) -> std::io::Result<String>
where
    R: AsyncRead + Unpin,
{
    let mut line = Vec::new();
    BufReader::new(reader.take(MAX_REQUEST_LINE))
        .read_until(b'\n', &mut line)
        .await?;
    Ok(String::from_utf8_lossy(&line).into_owned())
}

fn render_response(request: &str) -> String {
    let path = request
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or("/");

    match path {
        "/metrics" => match encode_metrics() {
            Ok(body) => format!(
                "HTTP/1.1 200 OK\r\nContent-Type: text/plain; version=0.0.4\r\nContent-Length: {}\r\n\r\n{}",
                body.len(),
                body
            ),
            Err(e) => {
                let body = e.to_string();
                format!(
                    "HTTP/1.1 500 Internal Server Error\r\nContent-Length: {}\r\n\r\n{}",
                    body.len(),
                    body
                )
            }
        },
        _ => "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\n\r\n".to_string(),
    }
}
