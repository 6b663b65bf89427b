//! TCP Server
//!
//! Accepts connections and serves each on its own thread. The storage engine
//! and authenticator are explicit instances constructed at startup and shared
//! with every connection handler through the dispatcher; no hidden globals.

use std::net::{SocketAddr, TcpListener};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use crate::auth::Authenticator;
use crate::config::Config;
use crate::dispatch::Dispatcher;
use crate::error::Result;
use crate::storage::StorageEngine;

use super::connection::Connection;

/// TCP server for flatdb
pub struct Server {
    config: Config,
    listener: TcpListener,
    dispatcher: Dispatcher,

    /// Connections currently being served, bounded by `max_connections`
    active: Arc<AtomicUsize>,
}

impl Server {
    /// Bind the listening socket and prepare the dispatcher
    pub fn bind(
        config: Config,
        storage: Arc<StorageEngine>,
        auth: Arc<Authenticator>,
    ) -> Result<Self> {
        let listener = TcpListener::bind(&config.listen_addr)?;
        let dispatcher = Dispatcher::new(storage, auth);

        Ok(Self {
            config,
            listener,
            dispatcher,
            active: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// The bound address (useful when binding to port 0)
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections forever (blocking)
    pub fn run(&self) -> Result<()> {
        tracing::info!(
            "flatdb listening on {} (max {} connections)",
            self.listener.local_addr()?,
            self.config.max_connections
        );

        for stream in self.listener.incoming() {
            let stream = match stream {
                Ok(s) => s,
                Err(e) => {
                    tracing::warn!("Failed to accept connection: {}", e);
                    continue;
                }
            };

            if self.active.load(Ordering::SeqCst) >= self.config.max_connections {
                tracing::warn!(
                    "Connection limit ({}) reached, refusing {}",
                    self.config.max_connections,
                    stream
                        .peer_addr()
                        .map(|a| a.to_string())
                        .unwrap_or_else(|_| "unknown".to_string())
                );
                drop(stream);
                continue;
            }

            self.active.fetch_add(1, Ordering::SeqCst);
            let active = Arc::clone(&self.active);
            let dispatcher = self.dispatcher.clone();
            let read_ms = self.config.read_timeout_ms;
            let write_ms = self.config.write_timeout_ms;

            thread::spawn(move || {
                match Connection::new(stream, dispatcher) {
                    Ok(mut connection) => {
                        if let Err(e) = connection.set_timeouts(read_ms, write_ms) {
                            tracing::warn!("Failed to set connection timeouts: {}", e);
                        }
                        if let Err(e) = connection.handle() {
                            tracing::warn!(
                                "Connection {} ended with error: {}",
                                connection.peer_addr(),
                                e
                            );
                        }
                    }
                    Err(e) => tracing::warn!("Failed to set up connection: {}", e),
                }
                active.fetch_sub(1, Ordering::SeqCst);
            });
        }

        Ok(())
    }
}
