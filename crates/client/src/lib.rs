//! usbshare client library
//!
//! The request-builder side of the control protocol: connect, send one
//! request, read one response, close. Plus the client's TOML configuration.

pub mod config;
pub mod network;

pub use config::ClientConfig;
pub use network::CommandClient;
