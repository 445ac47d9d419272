//! Enumeration back-ends
//!
//! Two ways to list the shareable devices on this host: scraping the
//! parseable output of `usbip list -pl`, or walking the libusb device list.
//! Both produce the same raw `(bus id, vendor id, product id)` triples; the
//! registry neither knows nor cares which one ran.

use crate::error::{Error, Result};
use crate::usb::registry::{DeviceEnumerator, RawDevice};
use protocol::BusId;
use regex::Regex;
use std::process::Command;
use std::sync::LazyLock;
use tracing::warn;

/// One record per line: `busid=1-2#usbid=0bda:5400#`
static USBIP_RECORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"busid=([^#]+)#usbid=([0-9a-fA-F]+):([0-9a-fA-F]+)#").expect("valid regex")
});

/// Enumerates via the `usbip` command-line tool
#[derive(Debug, Clone)]
pub struct UsbipEnumerator {
    /// Tool name or path, `"usbip"` unless overridden
    pub program: String,
}

impl Default for UsbipEnumerator {
    fn default() -> Self {
        Self {
            program: "usbip".to_string(),
        }
    }
}

impl DeviceEnumerator for UsbipEnumerator {
    fn enumerate(&self) -> Result<Vec<RawDevice>> {
        let output = Command::new(&self.program)
            .args(["list", "-pl"])
            .output()
            .map_err(|e| Error::Enumeration(format!("failed to run {}: {}", self.program, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Enumeration(format!(
                "{} list exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        Ok(parse_usbip_list(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// Parse `usbip list -pl` output into raw devices
///
/// A record that fails to parse is skipped with a warning rather than
/// failing the whole listing; the tool occasionally emits entries for
/// devices that vanished mid-listing.
pub fn parse_usbip_list(output: &str) -> Vec<RawDevice> {
    let mut devices = Vec::new();

    for capture in USBIP_RECORD.captures_iter(output) {
        let bus_id: BusId = match capture[1].parse() {
            Ok(id) => id,
            Err(e) => {
                warn!("skipping unparseable busid {:?}: {e}", &capture[1]);
                continue;
            }
        };
        let Ok(vendor_id) = u16::from_str_radix(&capture[2], 16) else {
            warn!("skipping record with invalid vendor id {:?}", &capture[2]);
            continue;
        };
        let Ok(product_id) = u16::from_str_radix(&capture[3], 16) else {
            warn!("skipping record with invalid product id {:?}", &capture[3]);
            continue;
        };

        devices.push(RawDevice {
            bus_id,
            vendor_id,
            product_id,
        });
    }

    devices
}

/// Enumerates by walking the libusb device list
#[derive(Debug, Clone, Copy)]
pub struct LibusbEnumerator;

impl DeviceEnumerator for LibusbEnumerator {
    fn enumerate(&self) -> Result<Vec<RawDevice>> {
        let devices = rusb::devices()
            .map_err(|e| Error::Enumeration(format!("libusb device list: {e}")))?;

        let mut raw = Vec::new();
        for device in devices.iter() {
            let descriptor = match device.device_descriptor() {
                Ok(d) => d,
                Err(e) => {
                    warn!(
                        "skipping device on bus {}: no descriptor: {e}",
                        device.bus_number()
                    );
                    continue;
                }
            };

            // Root hubs have no port path and cannot be shared over usbip.
            let ports = device.port_numbers().unwrap_or_default();
            if ports.is_empty() {
                continue;
            }

            raw.push(RawDevice {
                bus_id: BusId {
                    bus: device.bus_number(),
                    ports,
                },
                vendor_id: descriptor.vendor_id(),
                product_id: descriptor.product_id(),
            });
        }

        Ok(raw)
    }
}
