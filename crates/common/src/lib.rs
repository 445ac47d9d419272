//! Common utilities for usbshare
//!
//! This crate provides the functionality shared between the server and
//! client: error handling, logging setup, and the USB subsystem — device
//! registry, enumeration back-ends, detail-enrichment back-ends, and the
//! attach executor boundary.

pub mod error;
pub mod logging;
pub mod usb;

pub use error::{Error, Result};
pub use logging::setup_logging;
pub use usb::{
    AttachExecutor, DetailBackend, DetailProvider, DeviceDetails, DeviceEnumerator,
    DeviceRegistry, EnumerationBackend, RawDevice, UsbipBindExecutor, create_registry,
};
