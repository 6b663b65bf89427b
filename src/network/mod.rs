//! Network Module
//!
//! TCP server and per-connection handling. Each accepted connection gets its
//! own thread running a blocking read → decode → dispatch → encode → write
//! loop, one request at a time; connections run fully in parallel with
//! respect to each other.

mod connection;
mod server;

pub use connection::Connection;
pub use server::Server;
