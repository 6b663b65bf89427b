//! Connection Handler
//!
//! Handles individual client connections: reads one frame at a time, decodes
//! and dispatches it, and writes the response frame back. Every typed failure
//! is caught at the action boundary and converted to an ERROR response, so a
//! single malformed request never brings down the connection.

use std::io::{BufReader, BufWriter};
use std::net::TcpStream;
use std::time::Duration;

use bytes::BytesMut;

use crate::dispatch::Dispatcher;
use crate::error::{DbError, Result};
use crate::protocol::{read_frame, write_frame, Action, Response};

/// Handles a single client connection
pub struct Connection {
    /// TCP stream reader (buffered for efficiency)
    reader: BufReader<TcpStream>,

    /// TCP stream writer (buffered for efficiency)
    writer: BufWriter<TcpStream>,

    /// Routes decoded actions to storage and auth
    dispatcher: Dispatcher,

    /// Reassembly buffer carrying leftover bytes between frames
    buf: BytesMut,

    /// Peer address for logging
    peer_addr: String,
}

impl Connection {
    /// Create a new connection handler
    ///
    /// Sets up buffered I/O; timeouts are configured separately.
    pub fn new(stream: TcpStream, dispatcher: Dispatcher) -> Result<Self> {
        let peer_addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        // Disable Nagle's algorithm for low latency
        stream.set_nodelay(true)?;

        let read_stream = stream.try_clone()?;
        let write_stream = stream;

        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(write_stream),
            dispatcher,
            buf: BytesMut::new(),
            peer_addr,
        })
    }

    /// Configure connection timeouts
    pub fn set_timeouts(&mut self, read_ms: u64, write_ms: u64) -> Result<()> {
        let read_stream = self.reader.get_ref();
        let write_stream = self.writer.get_ref();

        if read_ms > 0 {
            read_stream.set_read_timeout(Some(Duration::from_millis(read_ms)))?;
        }
        if write_ms > 0 {
            write_stream.set_write_timeout(Some(Duration::from_millis(write_ms)))?;
        }

        Ok(())
    }

    /// Handle the connection (blocking until closed)
    ///
    /// Reads frames in a loop and sends responses. Returns when the client
    /// disconnects, times out, or an unrecoverable I/O error occurs.
    pub fn handle(&mut self) -> Result<()> {
        tracing::debug!("Connection established from {}", self.peer_addr);

        loop {
            let payload = match read_frame(&mut self.reader, &mut self.buf) {
                Ok(Some(payload)) => payload,
                Ok(None) => {
                    tracing::debug!("Client {} disconnected", self.peer_addr);
                    return Ok(());
                }
                Err(e @ (DbError::MissingQueryLength | DbError::InvalidQueryLength)) => {
                    // Recoverable framing error: answer it and keep serving
                    tracing::debug!("Framing error from {}: {}", self.peer_addr, e);
                    self.send_response(&Response::from_error(&e))?;
                    continue;
                }
                Err(DbError::Io(ref e))
                    if matches!(
                        e.kind(),
                        std::io::ErrorKind::UnexpectedEof
                            | std::io::ErrorKind::ConnectionReset
                            | std::io::ErrorKind::ConnectionAborted
                    ) =>
                {
                    tracing::debug!("Connection closed by client {}", self.peer_addr);
                    return Ok(());
                }
                Err(DbError::Io(ref e))
                    if matches!(
                        e.kind(),
                        std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
                    ) =>
                {
                    // Read timeout: a stalled client does not hold its
                    // serving thread forever
                    tracing::debug!("Read timeout for client {}", self.peer_addr);
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!("Error reading from {}: {}", self.peer_addr, e);
                    let _ = self.send_response(&Response::from_error(&e));
                    return Err(e);
                }
            };

            let response = self.process(&payload);

            if let Err(e) = self.send_response(&response) {
                if let DbError::Io(ref io_err) = e {
                    match io_err.kind() {
                        std::io::ErrorKind::ConnectionAborted
                        | std::io::ErrorKind::ConnectionReset
                        | std::io::ErrorKind::BrokenPipe => {
                            tracing::debug!(
                                "Client {} disconnected before response could be sent: {}",
                                self.peer_addr,
                                e
                            );
                            return Ok(());
                        }
                        _ => {}
                    }
                }
                tracing::warn!("Error writing to {}: {}", self.peer_addr, e);
                return Err(e);
            }
        }
    }

    /// Decode and dispatch one request payload. Every failure becomes an
    /// ERROR response rather than terminating the serving loop.
    fn process(&self, payload: &[u8]) -> Response {
        let action = match Action::decode(payload) {
            Ok(action) => action,
            Err(e) => {
                tracing::debug!("Undecodable request from {}: {}", self.peer_addr, e);
                return Response::from_error(&e);
            }
        };

        match self.dispatcher.dispatch(&action) {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!(
                    "Action '{}' from {} failed: {}",
                    action.action,
                    self.peer_addr,
                    e
                );
                Response::from_error(&e)
            }
        }
    }

    /// Frame and send a response to the client
    fn send_response(&mut self, response: &Response) -> Result<()> {
        let bytes = response.encode()?;
        write_frame(&mut self.writer, &bytes)
    }

    /// Get the peer address string
    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }
}
