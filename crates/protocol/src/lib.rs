//! Protocol library for usbshare
//!
//! This crate defines the control protocol spoken between the usbshare server
//! and client: type-safe request/response definitions, the JSON wire codec,
//! framing rules, and the device descriptor model shared by both sides.
//!
//! # Wire format
//!
//! A client sends exactly one JSON request object per connection; the server
//! replies with exactly one JSON response object terminated by `\n`, then both
//! sides close. Requests are not length-prefixed and must fit in a single
//! [`MAX_REQUEST_SIZE`] read.
//!
//! # Example
//!
//! ```
//! use protocol::{CommandRequest, CommandResponse, encode_request, encode_response};
//!
//! let req = encode_request(&CommandRequest::List).unwrap();
//! assert_eq!(req, br#"{"command":"list"}"#);
//!
//! let resp = encode_response(&CommandResponse::Success { data: vec![] }).unwrap();
//! assert_eq!(resp, b"{\"status\":\"success\"}\n");
//! ```

pub mod codec;
pub mod error;
pub mod messages;
pub mod types;

pub use codec::{
    MAX_REQUEST_SIZE, MAX_RESPONSE_SIZE, decode_request, decode_response, encode_request,
    encode_response,
};

#[cfg(feature = "async")]
pub use codec::{read_request, read_response, write_request, write_response};
pub use error::{ProtocolError, Result};
pub use messages::{AttachArgs, CommandRequest, CommandResponse};
pub use types::{BusId, BusIdParseError, DeviceDescriptor};
