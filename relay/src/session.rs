use crate::error::Error;
use crate::frame;
use crate::lifecycle::Lifecycle;
use crate::request::UpstreamRequest;
use axum::body::Bytes;
use futures_util::StreamExt;
use log::*;
use reqwest::StatusCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::Sender;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Why a relay session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// The upstream body reached a clean end of stream.
    Completed,
    /// The upstream call failed; an error frame was written if the client was still there.
    Failed(Error),
    /// The client went away before the upstream finished.
    ClientDisconnected,
    /// The server is shutting down.
    Shutdown,
}

/// One upstream streaming call paired with one downstream event stream.
///
/// The session is a single event loop: the upstream copy, the keep-alive
/// ticker and the downstream close signal are raced with `select!`, and
/// whichever finishes first ends the loop. The downstream sender is owned by
/// the session, so the channel closes exactly once, when `run` returns.
pub struct RelaySession {
    tag: String,
    client: reqwest::Client,
    request: UpstreamRequest,
    keep_alive: Duration,
    lifecycle: Arc<Lifecycle>,
}

impl RelaySession {
    pub fn new(
        tag: impl Into<String>,
        client: reqwest::Client,
        request: UpstreamRequest,
        keep_alive: Duration,
        token: CancellationToken,
    ) -> Self {
        Self {
            tag: tag.into(),
            client,
            request,
            keep_alive,
            lifecycle: Arc::new(Lifecycle::new(token)),
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Shared handle on the session's termination guard.
    pub fn lifecycle(&self) -> Arc<Lifecycle> {
        Arc::clone(&self.lifecycle)
    }

    /// Drives the session to completion, writing frames and forwarded upstream
    /// chunks to `downstream`. Never panics on a failed write.
    pub async fn run(self, downstream: Sender<Bytes>) -> CloseReason {
        if downstream.send(frame::connected()).await.is_err() {
            self.lifecycle.close();
            debug!("{} client left before the stream opened", self.tag);
            return CloseReason::ClientDisconnected;
        }

        let mut keep_alive =
            time::interval_at(Instant::now() + self.keep_alive, self.keep_alive);
        keep_alive.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let reason = {
            let upstream = self.copy_upstream(&downstream);
            tokio::pin!(upstream);

            loop {
                tokio::select! {
                    biased;
                    _ = self.lifecycle.cancelled() => break CloseReason::Shutdown,
                    _ = downstream.closed() => break CloseReason::ClientDisconnected,
                    result = &mut upstream => break match result {
                        Ok(()) => CloseReason::Completed,
                        Err(err) => CloseReason::Failed(err),
                    },
                    _ = keep_alive.tick() => self.ping(&downstream),
                }
            }
        };

        if let CloseReason::Failed(err) = &reason {
            self.report(err, &downstream).await;
        }

        if self.lifecycle.close() {
            debug!("{} session closed: {:?}", self.tag, reason);
        }
        reason
    }

    /// Issues the upstream call and copies its body downstream chunk by chunk.
    ///
    /// Each chunk is handed off before the next one is read, so a slow client
    /// pauses upstream reads instead of growing a buffer.
    async fn copy_upstream(&self, downstream: &Sender<Bytes>) -> Result<(), Error> {
        let response = self
            .request
            .to_reqwest(&self.client)
            .send()
            .await
            .map_err(|err| {
                error!("{} proxy failed: {err:?}", self.tag);
                Error::transport(&err)
            })?;
        self.lifecycle.begin_streaming();

        let status = response.status();
        if !status.is_success() {
            let headers = response.headers();
            let header = |name: &str| {
                headers
                    .get(name)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string()
            };
            let (www_authenticate, request_id, content_type) = (
                header("www-authenticate"),
                header("x-request-id"),
                header("content-type"),
            );
            let body = response.text().await.unwrap_or_default();
            error!(
                "{} upstream error {}: www-authenticate={:?}, x-request-id={:?}, content-type={:?}, body={}",
                self.tag, status, www_authenticate, request_id, content_type, body
            );
            return Err(Error::upstream_status(status.as_u16(), body));
        }

        if status == StatusCode::NO_CONTENT || response.content_length() == Some(0) {
            warn!("{} upstream returned {} without a body", self.tag, status);
            return Err(Error::UpstreamBodyMissing {
                status: status.as_u16(),
            });
        }

        let mut chunks = response.bytes_stream();
        while let Some(chunk) = chunks.next().await {
            let chunk = chunk.map_err(|err| {
                error!("{} stream error: {err:?}", self.tag);
                Error::transport(&err)
            })?;
            if chunk.is_empty() {
                continue;
            }
            downstream
                .send(chunk)
                .await
                .map_err(|_| Error::Transport("client disconnected".to_string()))?;
        }

        trace!("{} upstream reached end of stream", self.tag);
        Ok(())
    }

    /// Best-effort keep-alive. A full or closed channel is ignored here; the
    /// close signal is handled by the session loop.
    fn ping(&self, downstream: &Sender<Bytes>) {
        if let Err(err) = downstream.try_send(frame::ping()) {
            trace!("{} keep-alive skipped: {err}", self.tag);
        }
    }

    /// Writes the error frame if the client is still reading.
    async fn report(&self, err: &Error, downstream: &Sender<Bytes>) {
        if downstream.is_closed() {
            return;
        }
        tokio::select! {
            biased;
            _ = self.lifecycle.cancelled() => {}
            result = downstream.send(frame::error(err)) => {
                if result.is_err() {
                    debug!("{} client left before the error frame was written", self.tag);
                }
            }
        }
    }
}
