//! Protocol framing
//!
//! One logical message = a text header naming the payload byte-length,
//! `\r\n\r\n`, then exactly that many payload bytes:
//!
//! ```text
//! QUERY_LENGTH: 42\r\n\r\n{"action": "SELECT", ...}
//! ```
//!
//! Header and payload may arrive split across arbitrarily many partial
//! reads; bytes accumulate in the caller's buffer until a full frame is
//! present. A peer close mid-header or mid-body abandons the message. A
//! complete header with a missing or unparsable length is a recoverable
//! protocol error: the buffer is dropped and the connection keeps serving.

use std::io::{Read, Write};

use bytes::{Buf, BytesMut};

use crate::error::{DbError, Result};

/// Header line key
const HEADER_KEY: &str = "QUERY_LENGTH";

/// Header terminator; the payload follows immediately
const HEADER_DELIMITER: &[u8] = b"\r\n\r\n";

/// Maximum payload size (16 MB); larger declared lengths are a framing error
pub const MAX_PAYLOAD_SIZE: usize = 16 * 1024 * 1024;

/// Socket read chunk size
const READ_CHUNK: usize = 1024;

/// Read exactly one framed message, returning its payload bytes.
///
/// `buf` holds leftover bytes between calls on the same connection; bytes
/// belonging to a following pipelined frame stay in it. Returns `Ok(None)`
/// when the peer closed before a complete frame arrived.
pub fn read_frame<R: Read>(reader: &mut R, buf: &mut BytesMut) -> Result<Option<Vec<u8>>> {
    loop {
        if let Some(pos) = find_delimiter(buf) {
            let length = match parse_length(&buf[..pos]) {
                Ok(length) => length,
                Err(e) => {
                    // Without a usable length there is no way to find the end
                    // of this payload; drop everything buffered and resync on
                    // the client's next frame.
                    buf.clear();
                    return Err(e);
                }
            };

            if length > MAX_PAYLOAD_SIZE {
                buf.clear();
                return Err(DbError::InvalidQueryLength);
            }

            let frame_end = pos + HEADER_DELIMITER.len() + length;
            while buf.len() < frame_end {
                if fill(reader, buf)? == 0 {
                    // Peer closed mid-body: abandon the message
                    return Ok(None);
                }
            }

            let payload = buf[pos + HEADER_DELIMITER.len()..frame_end].to_vec();
            buf.advance(frame_end);
            return Ok(Some(payload));
        }

        if fill(reader, buf)? == 0 {
            // Clean close, or peer closed mid-header: abandon
            return Ok(None);
        }
    }
}

/// Write one framed message
pub fn write_frame<W: Write>(writer: &mut W, payload: &[u8]) -> Result<()> {
    write!(writer, "{HEADER_KEY}: {}\r\n\r\n", payload.len())?;
    writer.write_all(payload)?;
    writer.flush()?;
    Ok(())
}

/// Read one chunk from the stream into the buffer, returning the byte count
fn fill<R: Read>(reader: &mut R, buf: &mut BytesMut) -> Result<usize> {
    let mut chunk = [0u8; READ_CHUNK];
    let n = reader.read(&mut chunk)?;
    buf.extend_from_slice(&chunk[..n]);
    Ok(n)
}

fn find_delimiter(buf: &BytesMut) -> Option<usize> {
    buf.windows(HEADER_DELIMITER.len())
        .position(|window| window == HEADER_DELIMITER)
}

/// Extract the payload length from the header bytes.
///
/// Distinct failures: no `QUERY_LENGTH` line at all vs. a line whose value
/// is absent or non-numeric.
fn parse_length(header: &[u8]) -> Result<usize> {
    let header = String::from_utf8_lossy(header);

    for line in header.split("\r\n") {
        if line.trim_start().starts_with(HEADER_KEY) {
            let value = line
                .splitn(2, ':')
                .nth(1)
                .ok_or(DbError::InvalidQueryLength)?;
            return value
                .trim()
                .parse::<usize>()
                .map_err(|_| DbError::InvalidQueryLength);
        }
    }

    Err(DbError::MissingQueryLength)
}
