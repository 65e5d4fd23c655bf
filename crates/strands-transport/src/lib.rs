//! Strands transport layer
//!
//! Serves the relay over WebSocket. The transport layer handles:
//! - Connection lifecycle (open, text frame, close)
//! - One socket writer task per connection, fed through an [`Outbound`] handle
//! - Rejection of binary frames
//! - Connection limit and health endpoint
//!
//! The transport is decoupled from the relay logic via the `SessionHandler` trait.

pub mod connection;
pub mod server;

pub use connection::{ConnectionClosed, Outbound};
pub use server::{SessionHandler, TransportConfig, TransportServer};
