//! Per-connection request handling
//!
//! One accepted connection, end to end: read one bounded chunk, decode,
//! dispatch, write exactly one newline-terminated response, close. The
//! connection is strictly single-request/single-response.
//!
//! This is also the isolation boundary: every failure mode — malformed
//! input, a domain failure, or an unexpected internal error — becomes a
//! response on this connection and nothing else. A misbehaving client can
//! never affect another connection or the accept loop.

use protocol::{CommandRequest, CommandResponse, codec};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::{debug, error, info, warn};

use crate::dispatch::Dispatcher;

/// Handle one accepted connection to completion
pub async fn handle_connection(mut stream: TcpStream, peer: SocketAddr, dispatcher: Arc<Dispatcher>) {
    debug!(%peer, "connection accepted");

    let response = run_request(&mut stream, peer, &dispatcher).await;

    if let Err(e) = codec::write_response(&mut stream, &response).await {
        warn!(%peer, "failed to write response: {}", e);
    }
    let _ = stream.shutdown().await;

    debug!(%peer, "connection closed");
}

/// Produce the single response for this connection
///
/// Infallible by construction: every error path collapses into a wire
/// response here rather than propagating out of the handler task.
async fn run_request(
    stream: &mut TcpStream,
    peer: SocketAddr,
    dispatcher: &Dispatcher,
) -> CommandResponse {
    let bytes = match codec::read_request(stream).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(%peer, "read failed: {}", e);
            return CommandResponse::error(e.to_string());
        }
    };

    let request = match codec::decode_request(&bytes) {
        Ok(request) => request,
        Err(e) => {
            warn!(%peer, "protocol error: {}", e);
            return CommandResponse::error(e.to_string());
        }
    };

    match &request {
        CommandRequest::List => info!(%peer, "list request"),
        CommandRequest::Attach(args) => info!(
            %peer,
            id = args.id.as_deref().unwrap_or("-"),
            bus = args.bus.as_deref().unwrap_or("-"),
            "attach request"
        ),
    }

    match dispatcher.dispatch(request).await {
        Ok(response) => response,
        Err(e) => {
            error!(%peer, "internal error: {:#}", e);
            CommandResponse::error(e.to_string())
        }
    }
}
