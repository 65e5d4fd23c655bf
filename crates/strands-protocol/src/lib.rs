//! Strands relay - protocol types
//!
//! Line-oriented text protocol spoken between puzzle clients and the relay.
//! This crate is the single source of truth for verb names, the command
//! tokenizer, outbound reply lines and the error-to-reply mapping.

pub mod command;
pub mod error;
pub mod reply;
pub mod verbs;

pub use command::{Command, Credentials};
pub use error::RelayError;
pub use reply::Reply;
pub use verbs::Verbs;

/// Result type returned by every command handler.
pub type HandlerResult = Result<Vec<Reply>, RelayError>;
