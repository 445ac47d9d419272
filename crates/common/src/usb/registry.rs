//! Device registry
//!
//! Produces a snapshot of the devices currently present on this host by
//! invoking the enumeration collaborator and enriching each raw entry with
//! detail attributes. Snapshots are never cached: every call re-runs the
//! enumerator, trading cost (an external process or hardware probe per
//! call) for always-fresh results.

use crate::error::Result;
use protocol::{BusId, DeviceDescriptor};
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, warn};

/// Raw enumeration record before enrichment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDevice {
    /// Bus number and port path
    pub bus_id: BusId,
    /// USB vendor id
    pub vendor_id: u16,
    /// USB product id
    pub product_id: u16,
}

/// Enrichment result for one device
///
/// Every field is optional in practice; the defaults are the deterministic
/// fallbacks used when enrichment fails outright.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceDetails {
    /// Host path to the kernel device file
    pub device_node: String,
    /// Serial number, empty when unreadable
    pub serial: String,
    /// Human-readable description
    pub description: String,
    /// Raw properties (udev keys, descriptor fields)
    pub attributes: BTreeMap<String, String>,
}

impl Default for DeviceDetails {
    fn default() -> Self {
        Self {
            device_node: String::new(),
            serial: String::new(),
            description: "unknown".to_string(),
            attributes: BTreeMap::new(),
        }
    }
}

/// Lists the raw devices currently shareable on this host
pub trait DeviceEnumerator: Send + Sync {
    fn enumerate(&self) -> Result<Vec<RawDevice>>;
}

/// Enriches one raw device with serial, description, node, and attributes
///
/// May fail for a single device (insufficient permission, device vanished
/// mid-enumeration); the registry tolerates that per-device.
pub trait DetailProvider: Send + Sync {
    fn details(&self, raw: &RawDevice) -> Result<DeviceDetails>;
}

/// Snapshot producer over the enumeration and enrichment collaborators
pub struct DeviceRegistry {
    enumerator: Box<dyn DeviceEnumerator>,
    provider: Box<dyn DetailProvider>,
}

impl DeviceRegistry {
    pub fn new(enumerator: Box<dyn DeviceEnumerator>, provider: Box<dyn DetailProvider>) -> Self {
        Self {
            enumerator,
            provider,
        }
    }

    /// Enumerate and enrich the devices currently present
    ///
    /// Fails only when enumeration itself fails. A device whose enrichment
    /// fails is kept with the deterministic fallback fields rather than
    /// aborting the snapshot. A duplicate bus id from a misbehaving
    /// enumerator is dropped (first entry wins, in enumerator order) so a
    /// snapshot never contains two descriptors with the same bus id.
    pub fn snapshot(&self) -> Result<Vec<DeviceDescriptor>> {
        let raw_devices = self.enumerator.enumerate()?;

        let mut seen: HashSet<BusId> = HashSet::new();
        let mut devices = Vec::with_capacity(raw_devices.len());

        for raw in raw_devices {
            if !seen.insert(raw.bus_id.clone()) {
                warn!(bus_id = %raw.bus_id, "duplicate bus id from enumerator, dropping");
                continue;
            }

            let details = match self.provider.details(&raw) {
                Ok(details) => details,
                Err(e) => {
                    warn!(bus_id = %raw.bus_id, "detail enrichment failed: {e}");
                    DeviceDetails::default()
                }
            };

            devices.push(DeviceDescriptor {
                bus_id: raw.bus_id,
                vendor_id: raw.vendor_id,
                product_id: raw.product_id,
                device_node: details.device_node,
                serial: details.serial,
                description: details.description,
                attributes: details.attributes,
            });
        }

        debug!("snapshot: {} device(s)", devices.len());
        Ok(devices)
    }
}
