//! Error taxonomy reported to relay clients.
//!
//! Once the event-stream headers are committed, no failure can change the HTTP
//! status any more, so every variant here is surfaced to the client as a single
//! `event: error` frame (see [`crate::frame::error`]).

use serde::Serialize;
use std::error::Error as StdError;
use std::fmt;

/// Body text reported when the upstream API answered without a usable body.
pub const NO_BODY: &str = "no body";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A required server-side credential or target identifier is missing.
    /// The message names the missing item.
    Configuration(String),

    /// A required caller-supplied payload field is missing.
    Validation(String),

    /// The upstream API answered with a non-success HTTP status.
    UpstreamStatus { status: u16, body: String },

    /// The upstream API answered with a success status but no usable body.
    UpstreamBodyMissing { status: u16 },

    /// Establishing or reading the upstream connection failed, or a write to
    /// either side of the relay failed.
    Transport(String),
}

/// JSON payload carried in the `data:` line of an error frame.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub(crate) enum ErrorPayload<'a> {
    Message { message: &'a str },
    Status { status: u16, body: &'a str },
}

impl Error {
    /// Builds an `UpstreamStatus` error, substituting [`NO_BODY`] for an empty body.
    pub fn upstream_status(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        Error::UpstreamStatus {
            status,
            body: if body.is_empty() {
                NO_BODY.to_string()
            } else {
                body
            },
        }
    }

    /// Builds a `Transport` error from an underlying failure, flattening its
    /// source chain so the client sees the root cause.
    pub fn transport(err: &(dyn StdError + 'static)) -> Self {
        let mut message = err.to_string();
        let mut source = err.source();
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        if message.is_empty() {
            message = "stream failed".to_string();
        }
        Error::Transport(message)
    }

    pub(crate) fn payload(&self) -> ErrorPayload<'_> {
        match self {
            Error::Configuration(message)
            | Error::Validation(message)
            | Error::Transport(message) => ErrorPayload::Message { message },
            Error::UpstreamStatus { status, body } => ErrorPayload::Status {
                status: *status,
                body,
            },
            Error::UpstreamBodyMissing { status } => ErrorPayload::Status {
                status: *status,
                body: NO_BODY,
            },
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Configuration(msg) => write!(f, "Configuration error: {msg}"),
            Error::Validation(msg) => write!(f, "Validation error: {msg}"),
            Error::UpstreamStatus { status, body } => {
                write!(f, "Upstream responded with status {status}: {body}")
            }
            Error::UpstreamBodyMissing { status } => {
                write!(f, "Upstream responded with status {status} but no body")
            }
            Error::Transport(msg) => write!(f, "Transport error: {msg}"),
        }
    }
}

impl StdError for Error {}
