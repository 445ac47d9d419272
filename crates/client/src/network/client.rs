//! Command client
//!
//! The request-builder counterpart of the server's connection handler.
//! Each call opens a fresh TCP connection, sends exactly one request, reads
//! the one newline-terminated response, and closes — there is no keep-alive
//! in the protocol.

use anyhow::{Context, Result, anyhow};
use protocol::{AttachArgs, CommandRequest, CommandResponse, DeviceDescriptor, codec};
use tokio::net::TcpStream;
use tracing::debug;

/// Client for the usbshare control protocol
#[derive(Debug, Clone)]
pub struct CommandClient {
    host: String,
    port: u16,
}

impl CommandClient {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Request the server's current device list
    pub async fn list(&self) -> Result<Vec<DeviceDescriptor>> {
        match self.send(&CommandRequest::List).await? {
            CommandResponse::Success { data } => Ok(data),
            other => Err(response_error("list", other)),
        }
    }

    /// Request an attach for the device matching `args`
    pub async fn attach(&self, args: AttachArgs) -> Result<()> {
        match self.send(&CommandRequest::Attach(args)).await? {
            CommandResponse::Success { .. } => Ok(()),
            other => Err(response_error("attach", other)),
        }
    }

    /// One request/response exchange on a fresh connection
    pub async fn send(&self, request: &CommandRequest) -> Result<CommandResponse> {
        let mut stream = TcpStream::connect((self.host.as_str(), self.port))
            .await
            .with_context(|| format!("Failed to connect to {}:{}", self.host, self.port))?;

        debug!("connected to {}:{}", self.host, self.port);

        codec::write_request(&mut stream, request)
            .await
            .context("Failed to send request")?;

        let response = codec::read_response(stream)
            .await
            .context("Failed to read response")?;

        Ok(response)
    }
}

/// Turn a non-success response into a displayable error
fn response_error(command: &str, response: CommandResponse) -> anyhow::Error {
    match response {
        CommandResponse::Success { .. } => unreachable!("success handled by caller"),
        CommandResponse::Failure { message } => match message {
            Some(message) => anyhow!("{command} failed: {message}"),
            None => anyhow!("{command} failed"),
        },
        CommandResponse::Error { message } => anyhow!("server error: {message}"),
    }
}
