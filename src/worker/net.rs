//! Net Worker (TCP/UDP/UNIX): dials the target, writes an optional payload,
//! reads until EOF or deadline, grounded in the original `Dial`/`Read`
//! (`worker_net.go`).

use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, UdpSocket, UnixStream};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::{TargetScheme, WorkerConfig};
use crate::errors::WorkerOutcome;
use crate::metrics::MetricsRegistry;
use crate::sync::SyncBarrier;
use crate::worker::BaselineTracker;

pub struct NetWorker {
    config: Arc<WorkerConfig>,
    metrics: Arc<MetricsRegistry>,
    sync_barrier: Arc<SyncBarrier>,
    baseline: BaselineTracker,
}

impl NetWorker {
    pub fn new(config: Arc<WorkerConfig>, metrics: Arc<MetricsRegistry>, sync_barrier: Arc<SyncBarrier>) -> Self {
        Self { config, metrics, sync_barrier, baseline: BaselineTracker::new() }
    }

    pub async fn run(&mut self, token: CancellationToken) {
        let barrier_id = self.config.sync.then(|| self.sync_barrier.join());

        loop {
            if token.is_cancelled() {
                break;
            }

            let outcome = self.do_one(&token).await;
            self.metrics.inc_requests_total();
            if outcome.is_failure() {
                self.metrics.inc_requests_failed();
            }

            if token.is_cancelled() {
                break;
            }
            if let Some(id) = barrier_id {
                self.sync_barrier.wait(id).await;
            }
        }

        if let Some(id) = barrier_id {
            self.sync_barrier.leave(id);
        }
    }

    async fn do_one(&mut self, token: &CancellationToken) -> WorkerOutcome {
        let start = Instant::now();

        let read_len = tokio::select! {
            _ = token.cancelled() => {
                debug!("cancellation observed while dialing/reading socket");
                self.metrics.inc_requests_aborted();
                return WorkerOutcome::Aborted;
            }
            result = self.dial_and_read() => match result {
                Ok(n) => n,
                Err(SocketError::Timeout) => {
                    self.metrics.inc_requests_aborted();
                    return WorkerOutcome::Aborted;
                }
                Err(SocketError::Other(e)) => {
                    debug!(error = %e, "net transport error");
                    self.metrics.inc_requests_error();
                    return WorkerOutcome::Error;
                }
            },
        };

        let elapsed = start.elapsed();

        if self.baseline.check(read_len, &self.metrics) {
            self.metrics.code_counter(200).inc();
            self.metrics.observe_response_time_ns(elapsed.as_nanos() as f64);
            WorkerOutcome::Success
        } else {
            self.metrics.inc_requests_blength();
            WorkerOutcome::BodyLengthMismatch
        }
    }

    /// Dials, writes the payload (if any) once, then reads until EOF or the
    /// per-request timeout — a peek-then-drain pattern is an acceptable
    /// equivalent (spec.md §4.2.2 note); this reads to completion or
    /// deadline directly since Tokio's `timeout` already gives that shape.
    async fn dial_and_read(&self) -> Result<usize, SocketError> {
        let timeout = self.config.net.timeout;
        tokio::time::timeout(timeout, async {
            match self.config.target.scheme {
                TargetScheme::Tcp => {
                    let mut stream = TcpStream::connect(&self.config.target.address)
                        .await
                        .map_err(SocketError::Other)?;
                    if let Some(payload) = &self.config.payload {
                        stream.write_all(payload).await.map_err(SocketError::Other)?;
                    }
                    read_to_end_or_eof(&mut stream).await
                }
                TargetScheme::Unix => {
                    let mut stream = UnixStream::connect(&self.config.target.address)
                        .await
                        .map_err(SocketError::Other)?;
                    if let Some(payload) = &self.config.payload {
                        stream.write_all(payload).await.map_err(SocketError::Other)?;
                    }
                    read_to_end_or_eof(&mut stream).await
                }
                TargetScheme::Udp => {
                    let socket = UdpSocket::bind("0.0.0.0:0").await.map_err(SocketError::Other)?;
                    socket.connect(&self.config.target.address).await.map_err(SocketError::Other)?;
                    if let Some(payload) = &self.config.payload {
                        socket.send(payload).await.map_err(SocketError::Other)?;
                    }
                    let mut buf = vec![0u8; 65536];
                    let n = socket.recv(&mut buf).await.map_err(SocketError::Other)?;
                    Ok(n)
                }
                TargetScheme::Http | TargetScheme::Https => unreachable!("HTTP targets dispatch to HttpWorker"),
            }
        })
        .await
        .unwrap_or(Err(SocketError::Timeout))
    }
}

enum SocketError {
    Timeout,
    Other(std::io::Error),
}

/// Reads until the peer closes the connection, returning the total bytes
/// read (spec.md: "total bytes readable at the point the peer closes").
async fn read_to_end_or_eof<S: tokio::io::AsyncRead + Unpin>(stream: &mut S) -> Result<usize, SocketError> {
    let mut buf = Vec::new();
    stream.read_to_end(&mut buf).await.map_err(SocketError::Other)?;
    Ok(buf.len())
}
