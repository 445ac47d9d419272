//! Common error types

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("enumeration failed: {0}")]
    Enumeration(String),

    #[error("USB error: {0}")]
    Usb(#[from] rusb::Error),

    #[error("attach failed: {0}")]
    Attach(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
