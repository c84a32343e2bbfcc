//! Streaming SSE relay between an upstream workflow API and a browser client.
//!
//! Each relay session pairs one upstream streaming call with one downstream
//! event-stream response and forwards the upstream body as opaque chunks.
//!
//! # Architecture
//!
//! - **Committed headers first**: the downstream `text/event-stream` response
//!   is returned before the upstream call is made, followed immediately by a
//!   `: connected` comment so buffering proxies flush early.
//! - **Bounded hand-off**: upstream chunks travel to the response body over a
//!   bounded `mpsc` channel. A slow client fills the channel, which pauses
//!   upstream reads.
//! - **Keep-alive**: a `: ping` comment is written every period while the
//!   session is open. Failed pings are ignored.
//! - **Single termination**: client disconnect, upstream completion, upstream
//!   failure and server shutdown race to end a session; the [`Lifecycle`]
//!   guard lets only the first one tear it down.
//! - **Errors as frames**: failures are reported as a single
//!   `event: error` frame, never as an HTTP status.
//!
//! # Modules
//!
//! - `engine`: the [`Relay`] handle that spawns sessions and builds responses
//! - `session`: the per-request event loop
//! - `lifecycle`: the once-only state guard
//! - `request`: the immutable upstream request descriptor
//! - `frame`: synthetic SSE frames
//! - `error`: the error taxonomy surfaced to clients

pub mod engine;
pub mod error;
pub mod frame;
pub mod lifecycle;
pub mod request;
pub mod session;

pub use engine::{event_stream_response, Relay, RelayOptions};
pub use error::Error;
pub use lifecycle::{Lifecycle, SessionState};
pub use request::UpstreamRequest;
pub use session::{CloseReason, RelaySession};
