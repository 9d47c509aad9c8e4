// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Raw TCP print client (JetDirect, port 9100).
//
// Open a socket and write the document.  The printer must understand the
// format natively; there is no job tracking and no settings channel.

use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::{debug, info, instrument};

use printdock_core::error::{PrintdockError, Result};

/// Default raw TCP port (HP JetDirect).
pub const RAW_PORT: u16 = 9100;

const CHUNK_SIZE: usize = 8192;

/// Send `document` to `ip:port`, bounded by `timeout` for the whole transfer.
#[instrument(skip(document), fields(bytes = document.len()))]
pub async fn send_raw(ip: &str, port: u16, document: &[u8], timeout: Duration) -> Result<()> {
    let addr = format!("{}:{}", ip, port);

    tokio::time::timeout(timeout, write_all(&addr, document))
        .await
        .map_err(|_| {
            PrintdockError::Execution(format!(
                "raw TCP transfer to {} timed out after {}s",
                addr,
                timeout.as_secs()
            ))
        })??;

    info!(addr = %addr, total = document.len(), "raw TCP job sent");
    Ok(())
}

async fn write_all(addr: &str, document: &[u8]) -> Result<()> {
    let mut stream = TcpStream::connect(addr)
        .await
        .map_err(|e| PrintdockError::Execution(format!("raw TCP connect to {}: {}", addr, e)))?;

    let mut sent = 0;
    for chunk in document.chunks(CHUNK_SIZE) {
        stream.write_all(chunk).await.map_err(|e| {
            PrintdockError::Execution(format!("raw TCP send failed at byte {}: {}", sent, e))
        })?;
        sent += chunk.len();
        debug!(sent, total = document.len(), "raw TCP progress");
    }

    stream
        .flush()
        .await
        .map_err(|e| PrintdockError::Execution(format!("raw TCP flush: {e}")))?;
    stream
        .shutdown()
        .await
        .map_err(|e| PrintdockError::Execution(format!("raw TCP shutdown: {e}")))?;
    Ok(())
}

/// Whether a TCP connection to `ip:port` can be opened within `timeout`.
pub async fn probe(ip: &str, port: u16, timeout: Duration) -> bool {
    let addr = format!("{}:{}", ip, port);
    match tokio::time::timeout(timeout, TcpStream::connect(&addr)).await {
        Ok(Ok(_)) => {
            debug!(addr = %addr, "probe connected");
            true
        }
        Ok(Err(e)) => {
            debug!(addr = %addr, error = %e, "probe refused");
            false
        }
        Err(_) => {
            debug!(addr = %addr, "probe timed out");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn sends_every_byte() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("addr").port();

        let receiver = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.expect("accept");
            let mut received = Vec::new();
            socket.read_to_end(&mut received).await.expect("read");
            received
        });

        let document: Vec<u8> = (0..20_000u32).map(|i| (i % 251) as u8).collect();
        send_raw("127.0.0.1", port, &document, Duration::from_secs(5))
            .await
            .expect("send");

        assert_eq!(receiver.await.expect("join"), document);
    }

    #[tokio::test]
    async fn refused_connection_is_an_execution_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("addr").port();
        drop(listener);

        let err = send_raw("127.0.0.1", port, b"%PDF", Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, PrintdockError::Execution(_)));
    }

    #[tokio::test]
    async fn probe_reports_reachability() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("addr").port();
        assert!(probe("127.0.0.1", port, Duration::from_secs(2)).await);

        drop(listener);
        assert!(!probe("127.0.0.1", port, Duration::from_secs(2)).await);
    }
}
