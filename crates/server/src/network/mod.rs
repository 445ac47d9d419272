//! TCP network layer
//!
//! The listener owns the accept loop; each accepted connection is handed
//! to an independent handler task for its single request/response exchange.

pub mod connection;
pub mod listener;

pub use connection::handle_connection;
pub use listener::{Listener, ShutdownHandle};
