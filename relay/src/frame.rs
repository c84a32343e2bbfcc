//! Synthetic SSE frames written by the relay alongside forwarded upstream bytes.

use crate::error::Error;
use axum::body::Bytes;
use log::*;

pub const EVENT_STREAM_CONTENT_TYPE: &str = "text/event-stream; charset=utf-8";

const CONNECTED: &[u8] = b": connected\n\n";
const PING: &[u8] = b": ping\n\n";
const FALLBACK_ERROR_DATA: &str = r#"{"message":"stream failed"}"#;

/// Comment frame written as soon as the stream opens so intermediary buffers flush early.
pub fn connected() -> Bytes {
    Bytes::from_static(CONNECTED)
}

/// Zero-payload keep-alive comment frame.
pub fn ping() -> Bytes {
    Bytes::from_static(PING)
}

/// An `event: error` frame whose data line is the error's JSON payload.
pub fn error(err: &Error) -> Bytes {
    let data = match serde_json::to_string(&err.payload()) {
        Ok(json) => json,
        Err(e) => {
            error!("Failed to serialize error frame payload: {e}");
            FALLBACK_ERROR_DATA.to_string()
        }
    };
    Bytes::from(format!("event: error\ndata: {data}\n\n"))
}

/// Returns true for frames the relay synthesizes itself rather than forwards.
pub fn is_keep_alive(frame: &[u8]) -> bool {
    frame == CONNECTED || frame == PING
}
