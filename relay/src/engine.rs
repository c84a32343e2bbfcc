use crate::error::Error;
use crate::frame;
use crate::request::UpstreamRequest;
use crate::session::RelaySession;
use async_stream::stream;
use axum::body::{Body, Bytes};
use axum::http::header::{HeaderName, CACHE_CONTROL, CONNECTION, CONTENT_TYPE};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use log::*;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

const X_ACCEL_BUFFERING: &str = "x-accel-buffering";

/// Per-session tuning shared by every relay session.
#[derive(Debug, Clone)]
pub struct RelayOptions {
    /// Period between `: ping` keep-alive frames.
    pub keep_alive: Duration,
    /// Capacity of the hand-off between the upstream reader and the client.
    pub buffer: usize,
}

impl Default for RelayOptions {
    fn default() -> Self {
        Self {
            keep_alive: Duration::from_secs(1),
            buffer: 16,
        }
    }
}

/// Entry point of the relay engine. Cheap to clone; every clone shares the
/// same HTTP client and the same shutdown signal.
#[derive(Debug, Clone)]
pub struct Relay {
    client: reqwest::Client,
    options: RelayOptions,
    shutdown: CancellationToken,
}

impl Relay {
    pub fn new(client: reqwest::Client, options: RelayOptions) -> Self {
        Self {
            client,
            options,
            shutdown: CancellationToken::new(),
        }
    }

    /// Builds the upstream HTTP client. Only connection establishment is
    /// bounded; streamed responses may run for as long as the upstream keeps
    /// them open.
    pub fn build_client(connect_timeout: Duration) -> Result<reqwest::Client, Error> {
        reqwest::Client::builder()
            .use_rustls_tls()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|err| {
                error!("Failed to build upstream HTTP client: {err:?}");
                Error::transport(&err)
            })
    }

    /// Creates a session for `request` without starting it.
    pub fn session(&self, tag: impl Into<String>, request: UpstreamRequest) -> RelaySession {
        RelaySession::new(
            tag,
            self.client.clone(),
            request,
            self.options.keep_alive,
            self.shutdown.child_token(),
        )
    }

    /// Commits the event-stream response and relays `request` into it on a
    /// spawned task.
    pub fn stream(&self, tag: impl Into<String>, request: UpstreamRequest) -> Response {
        let (tx, mut rx) = mpsc::channel::<Bytes>(self.options.buffer.max(1));
        let session = self.session(tag, request);

        tokio::spawn(async move {
            let tag = session.tag().to_string();
            let reason = session.run(tx).await;
            debug!("{tag} relay finished: {reason:?}");
        });

        let body = stream! {
            while let Some(chunk) = rx.recv().await {
                yield Ok::<_, Infallible>(chunk);
            }
        };

        event_stream_response(Body::from_stream(body))
    }

    /// An event-stream response carrying only the error frame for `err`.
    /// Used for failures detected before any upstream call is attempted.
    pub fn reject(err: &Error) -> Response {
        event_stream_response(Body::from(frame::error(err)))
    }

    /// Ends every live session. Sessions still write their final frames and
    /// close their streams normally.
    pub fn shutdown(&self) {
        info!("Closing open relay sessions");
        self.shutdown.cancel();
    }
}

/// Wraps `body` in a 200 response carrying the event-stream headers.
pub fn event_stream_response(body: Body) -> Response {
    (
        StatusCode::OK,
        [
            (CONTENT_TYPE, frame::EVENT_STREAM_CONTENT_TYPE),
            (CACHE_CONTROL, "no-cache, no-transform"),
            (CONNECTION, "keep-alive"),
            (HeaderName::from_static(X_ACCEL_BUFFERING), "no"),
        ],
        body,
    )
        .into_response()
}
