//! Network client

pub mod client;

pub use client::CommandClient;
