//! usbshare server library
//!
//! The command server: TOML configuration, the TCP listener with its
//! bounded accept loop, per-connection request handling, command dispatch,
//! and the device matcher that resolves attach selectors against a registry
//! snapshot.

pub mod config;
pub mod dispatch;
pub mod matcher;
pub mod network;

pub use config::ServerConfig;
pub use dispatch::Dispatcher;
pub use matcher::{MatchOutcome, Selector, SelectorError, match_devices};
pub use network::{Listener, ShutdownHandle};
