//! Protocol message definitions
//!
//! One request, one response, one connection. Requests are tagged by the
//! `"command"` field, responses by `"status"`, matching the wire examples:
//!
//! ```text
//! -> {"command":"list"}
//! <- {"status":"success","data":[{"busId":"1-2",...}]}
//!
//! -> {"command":"attach","id":"0bda:5400","first":true}
//! <- {"status":"success"}
//! ```
//!
//! The attach selector fields live flat on the request object. This is the
//! single canonical shape; a nested `args` object is not part of the
//! protocol and its contents are ignored.

use crate::types::DeviceDescriptor;
use serde::{Deserialize, Serialize};

/// Selector fields for an attach request
///
/// At least one of `id`/`bus`/`serial`/`description` must be supplied for
/// the selector to be valid; the server rejects an empty selector rather
/// than matching every device. When several fields are supplied a device
/// must satisfy all of them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachArgs {
    /// Vendor:product pair, e.g. `"0bda:5400"` (hex, case-insensitive)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Exact bus id, e.g. `"1-2.3"`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bus: Option<String>,
    /// Exact serial number
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serial: Option<String>,
    /// Case-insensitive substring of the device description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// On an ambiguous match, take the first candidate in enumeration order
    /// instead of failing
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub first: bool,
}

impl AttachArgs {
    /// True when no selector field is supplied
    pub fn is_empty(&self) -> bool {
        self.id.is_none()
            && self.bus.is_none()
            && self.serial.is_none()
            && self.description.is_none()
    }
}

/// Client-to-server command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "lowercase")]
pub enum CommandRequest {
    /// List the devices currently shareable on the server
    List,
    /// Attach the device matching the given selector
    Attach(AttachArgs),
}

/// Server-to-client result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum CommandResponse {
    /// The command succeeded; `data` carries the device list for `list`
    /// and is omitted for `attach`
    Success {
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        data: Vec<DeviceDescriptor>,
    },
    /// The request was well-formed but could not be satisfied
    /// (no match, ambiguous match, empty selector, enumeration failure)
    Failure {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    /// The request was malformed, unrecognized, or hit an internal error
    Error { message: String },
}

impl CommandResponse {
    /// Successful attach (no payload)
    pub fn ok() -> Self {
        Self::Success { data: Vec::new() }
    }

    /// Successful list carrying the snapshot
    pub fn devices(data: Vec<DeviceDescriptor>) -> Self {
        Self::Success { data }
    }

    /// Business failure with a human-readable reason
    pub fn failure(message: impl Into<String>) -> Self {
        Self::Failure {
            message: Some(message.into()),
        }
    }

    /// Protocol or internal error
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}
