//! Reliable request/response delivery over UDP.
//!
//! The crate layers at-most-once message delivery on top of a plain datagram
//! socket: application messages are split into numbered packets sharing one
//! message id, every non-acknowledgement packet is retained and retransmitted
//! until the peer acknowledges it, receivers reassemble packets through a
//! bitmap-tracked partial and actively request missing fragments, and
//! completed requests are answered from a response cache so a retransmitted
//! request never re-executes its handler.
//!
//! [`engine::Engine`] ties the pieces together around one UDP socket; the
//! application plugs in through the [`engine::MessageHandler`] trait and
//! replies with [`engine::Engine::send_response`].

#![warn(rust_2018_idioms)]
#![allow(dead_code)]

pub mod assembler;
pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod history;
pub mod message;
pub mod proto;
pub mod response;
pub mod stats;

pub use crate::cache::{CacheLookup, ResponseCache};
pub use crate::config::{Config, EnvSettings};
pub use crate::engine::{Engine, MessageHandler};
pub use crate::error::{Error, Result};
pub use crate::message::Message;
pub use crate::proto::header::DistilledHeader;
pub use crate::proto::message_id::MessageId;
pub use crate::proto::message_type::MessageType;
pub use crate::response::{Response, StatusCode};
pub use crate::stats::NetStats;
