//! Request/response serialization and framing
//!
//! The wire format is JSON over TCP. A request is a single JSON object with
//! no terminator and no length prefix; it must arrive within one read of at
//! most [`MAX_REQUEST_SIZE`] bytes. A request spanning multiple reads is out
//! of contract. A response is a single JSON object followed by a `\n`
//! terminator.
//!
//! Decoding a request is staged so the connection handler can answer each
//! failure mode with the right wire message:
//!
//! 1. not valid JSON at all -> [`ProtocolError::InvalidJson`]
//! 2. valid JSON but empty, not an object, or missing `"command"` ->
//!    [`ProtocolError::InvalidCommand`]
//! 3. unrecognized command discriminator -> [`ProtocolError::UnknownCommand`]
//! 4. recognized command with malformed fields -> [`ProtocolError::InvalidRequest`]

use crate::error::{ProtocolError, Result};
use crate::messages::{CommandRequest, CommandResponse};

#[cfg(feature = "async")]
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};

/// Single-read ceiling for a request; the protocol is not length-prefixed
pub const MAX_REQUEST_SIZE: usize = 1024;

/// Client-side ceiling for a response line (device lists can be sizeable)
pub const MAX_RESPONSE_SIZE: usize = 256 * 1024;

/// Encode a request to its wire bytes (no terminator)
pub fn encode_request(request: &CommandRequest) -> Result<Vec<u8>> {
    serde_json::to_vec(request).map_err(|e| ProtocolError::InvalidRequest(e.to_string()))
}

/// Decode one request from raw wire bytes, staging the failure modes
pub fn decode_request(bytes: &[u8]) -> Result<CommandRequest> {
    if bytes.is_empty() || bytes.iter().all(|b| b.is_ascii_whitespace()) {
        return Err(ProtocolError::InvalidCommand);
    }

    let value: serde_json::Value =
        serde_json::from_slice(bytes).map_err(|e| ProtocolError::InvalidJson(e.to_string()))?;

    let Some(object) = value.as_object() else {
        return Err(ProtocolError::InvalidCommand);
    };
    if object.is_empty() {
        return Err(ProtocolError::InvalidCommand);
    }
    let Some(command) = object.get("command").and_then(|c| c.as_str()) else {
        return Err(ProtocolError::InvalidCommand);
    };

    match command {
        "list" | "attach" => serde_json::from_value(value)
            .map_err(|e| ProtocolError::InvalidRequest(e.to_string())),
        _ => Err(ProtocolError::UnknownCommand),
    }
}

/// Encode a response to its wire bytes, including the `\n` terminator
pub fn encode_response(response: &CommandResponse) -> Result<Vec<u8>> {
    let mut bytes = serde_json::to_vec(response)
        .map_err(|e| ProtocolError::InvalidRequest(e.to_string()))?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// Decode a response line (terminator already stripped or still attached)
pub fn decode_response(bytes: &[u8]) -> Result<CommandResponse> {
    serde_json::from_slice(bytes).map_err(|e| ProtocolError::InvalidJson(e.to_string()))
}

/// Async: read one request with a single bounded read
///
/// Returns the raw bytes; pass them to [`decode_request`] so decode errors
/// can be answered on the wire. Zero bytes means the peer closed without
/// sending anything, which decodes to `InvalidCommand`.
#[cfg(feature = "async")]
pub async fn read_request<R>(reader: &mut R) -> Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; MAX_REQUEST_SIZE];
    let n = reader.read(&mut buf).await?;
    buf.truncate(n);
    Ok(buf)
}

/// Async: write one request (no terminator), flushing the stream
#[cfg(feature = "async")]
pub async fn write_request<W>(writer: &mut W, request: &CommandRequest) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let bytes = encode_request(request)?;
    if bytes.len() > MAX_REQUEST_SIZE {
        return Err(ProtocolError::RequestTooLarge {
            size: bytes.len(),
            max: MAX_REQUEST_SIZE,
        });
    }
    writer.write_all(&bytes).await?;
    writer.flush().await?;
    Ok(())
}

/// Async: write one response with its `\n` terminator, flushing the stream
#[cfg(feature = "async")]
pub async fn write_response<W>(writer: &mut W, response: &CommandResponse) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let bytes = encode_response(response)?;
    writer.write_all(&bytes).await?;
    writer.flush().await?;
    Ok(())
}

/// Async: read one newline-terminated response, bounded by
/// [`MAX_RESPONSE_SIZE`]
#[cfg(feature = "async")]
pub async fn read_response<R>(reader: R) -> Result<CommandResponse>
where
    R: AsyncRead + Unpin,
{
    let mut limited = BufReader::new(reader.take(MAX_RESPONSE_SIZE as u64 + 1));
    let mut line = Vec::new();
    limited.read_until(b'\n', &mut line).await?;
    if line.len() > MAX_RESPONSE_SIZE {
        return Err(ProtocolError::ResponseTooLarge {
            max: MAX_RESPONSE_SIZE,
        });
    }
    decode_response(&line)
}
