//! USB subsystem
//!
//! Device discovery is split into two collaborator seams so the registry and
//! everything above it can be tested with fakes:
//!
//! - [`DeviceEnumerator`]: lists raw `(bus id, vendor id, product id)`
//!   triples for the devices currently shareable on this host.
//! - [`DetailProvider`]: enriches one raw triple with serial, description,
//!   device node, and raw attributes.
//!
//! Two back-ends exist for each seam (external tool scraping and libusb),
//! selected by configuration. The [`AttachExecutor`] seam wraps the
//! kernel-level attach step the same way.

pub mod attach;
pub mod details;
pub mod enumerate;
pub mod registry;

pub use attach::{AttachExecutor, UsbipBindExecutor};
pub use details::{LibusbDetailProvider, UdevDetailProvider};
pub use enumerate::{LibusbEnumerator, UsbipEnumerator};
pub use registry::{DetailProvider, DeviceDetails, DeviceEnumerator, DeviceRegistry, RawDevice};

use serde::{Deserialize, Serialize};

/// Which enumeration back-end the registry invokes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnumerationBackend {
    /// Scrape `usbip list -pl` output
    #[default]
    Usbip,
    /// Walk the libusb device list
    Libusb,
}

/// Which detail-enrichment back-end the registry invokes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetailBackend {
    /// Query the udev property database via `udevadm info`
    #[default]
    Udev,
    /// Open the device through libusb and read string descriptors
    Libusb,
}

/// Build a registry wired to the configured back-ends
pub fn create_registry(enumeration: EnumerationBackend, details: DetailBackend) -> DeviceRegistry {
    let enumerator: Box<dyn DeviceEnumerator> = match enumeration {
        EnumerationBackend::Usbip => Box::new(UsbipEnumerator::default()),
        EnumerationBackend::Libusb => Box::new(LibusbEnumerator),
    };
    let provider: Box<dyn DetailProvider> = match details {
        DetailBackend::Udev => Box::new(UdevDetailProvider::default()),
        DetailBackend::Libusb => Box::new(LibusbDetailProvider),
    };
    DeviceRegistry::new(enumerator, provider)
}
