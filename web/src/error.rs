use std::error::Error as StdError;

use axum::response::{IntoResponse, Response};
use log::*;
use relay::{Error as RelayError, Relay};

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug)]
pub struct Error(RelayError);

impl StdError for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> core::result::Result<(), std::fmt::Error> {
        write!(fmt, "{}", self.0)
    }
}

// Streaming endpoints never answer with an HTTP error status: the client is
// already committed to reading an event stream, so every error becomes a
// single `event: error` frame on a 200 response.
impl IntoResponse for Error {
    fn into_response(self) -> Response {
        debug!("Rejecting relay request: {}", self.0);
        Relay::reject(&self.0)
    }
}

impl<E> From<E> for Error
where
    E: Into<RelayError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
