//! # Web chat session engine
//!
//! [`Client`] starts chats and answers the one-shot lookups (queue status,
//! server configuration). Each started chat is a [`ChatSession`] backed by a
//! background poll task that is the only writer of the chat state:
//!
//! - events are decoded and delivered in order on an [`EventStream`]
//! - own echoes are suppressed and disconnects become stop events
//! - an unavailable endpoint triggers a switchover to the next one
//! - a chat the service no longer knows ends quietly

pub mod client;
pub mod error;
mod poller;
pub mod session;
pub mod stream;

pub use client::Client;
pub use error::{ChatError, ChatResult};
pub use session::{clamp_poll_interval, ChatInfo, ChatSession, ChatSnapshot, MIN_POLL_INTERVAL};
pub use stream::EventStream;
