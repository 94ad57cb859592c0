//! Network Module
//!
//! TCP server, connection handling and the protocol client.
//!
//! ## Architecture
//! - Single acceptor thread
//! - One handler thread per connection
//! - Requests routed through the shared Registry

mod server;
mod connection;
mod client;

pub use server::{AcceptBackoff, Server, ShutdownHandle};
pub use connection::Connection;
pub use client::Client;
