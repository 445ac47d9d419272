//! Detail-enrichment back-ends
//!
//! Given a raw enumerated device, resolve its serial, description, device
//! node, and raw attributes. The udev back-end queries the system property
//! database through `udevadm`; the libusb back-end opens the device and
//! reads its string descriptors directly. Vendor/product strings are often
//! unreadable without elevated permissions, which is exactly why the udev
//! database is the default.

use crate::error::{Error, Result};
use crate::usb::registry::{DetailProvider, DeviceDetails, RawDevice};
use regex::Regex;
use std::collections::BTreeMap;
use std::process::Command;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::debug;

/// Property lines look like `E: ID_MODEL=USB2.0_Hub`
static UDEV_PROPERTY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^E: (\w+)=(.+)$").expect("valid regex"));

/// Timeout for libusb string-descriptor reads
const DESCRIPTOR_TIMEOUT: Duration = Duration::from_millis(200);

/// Enriches from the udev property database via `udevadm info`
#[derive(Debug, Clone)]
pub struct UdevDetailProvider {
    /// Tool name or path, `"udevadm"` unless overridden
    pub program: String,
}

impl Default for UdevDetailProvider {
    fn default() -> Self {
        Self {
            program: "udevadm".to_string(),
        }
    }
}

impl DetailProvider for UdevDetailProvider {
    fn details(&self, raw: &RawDevice) -> Result<DeviceDetails> {
        let sysfs_path = format!("/sys/bus/usb/devices/{}", raw.bus_id);
        let output = Command::new(&self.program)
            .args(["info", "--query=all", "--path"])
            .arg(&sysfs_path)
            .output()
            .map_err(|e| Error::Enumeration(format!("failed to run {}: {}", self.program, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Enumeration(format!(
                "{} info exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        Ok(details_from_udev_output(&String::from_utf8_lossy(
            &output.stdout,
        )))
    }
}

/// Parse `udevadm info --query=all` output into enrichment details
pub fn details_from_udev_output(output: &str) -> DeviceDetails {
    let attributes = parse_udev_properties(output);

    let device_node = attributes.get("DEVNAME").cloned().unwrap_or_default();
    let serial = attributes
        .get("ID_SERIAL_SHORT")
        .cloned()
        .unwrap_or_default();
    let description = attributes
        .get("ID_MODEL_FROM_DATABASE")
        .cloned()
        .or_else(|| {
            attributes
                .get("ID_MODEL")
                .map(|model| model.replace('_', " "))
        })
        .unwrap_or_else(|| "unknown".to_string());

    DeviceDetails {
        device_node,
        serial,
        description,
        attributes,
    }
}

/// Parse `E: KEY=VALUE` property lines into a map
pub fn parse_udev_properties(output: &str) -> BTreeMap<String, String> {
    UDEV_PROPERTY
        .captures_iter(output)
        .map(|capture| (capture[1].to_string(), capture[2].to_string()))
        .collect()
}

/// Enriches by opening the device through libusb
///
/// Locates the device with a predicate over vendor id, product id, bus
/// number, and the exact port-number tuple — never a prefix of it.
#[derive(Debug, Clone, Copy)]
pub struct LibusbDetailProvider;

impl DetailProvider for LibusbDetailProvider {
    fn details(&self, raw: &RawDevice) -> Result<DeviceDetails> {
        let devices = rusb::devices()?;

        for device in devices.iter() {
            if device.bus_number() != raw.bus_id.bus {
                continue;
            }
            if device.port_numbers().unwrap_or_default() != raw.bus_id.ports {
                continue;
            }
            let descriptor = match device.device_descriptor() {
                Ok(d) => d,
                Err(_) => continue,
            };
            if descriptor.vendor_id() != raw.vendor_id
                || descriptor.product_id() != raw.product_id
            {
                continue;
            }

            let mut details = DeviceDetails {
                device_node: format!(
                    "/dev/bus/usb/{:03}/{:03}",
                    device.bus_number(),
                    device.address()
                ),
                ..DeviceDetails::default()
            };

            match device.open() {
                Ok(handle) => {
                    if let Ok(languages) = handle.read_languages(DESCRIPTOR_TIMEOUT)
                        && let Some(language) = languages.first().copied()
                    {
                        if let Ok(serial) = handle.read_serial_number_string(
                            language,
                            &descriptor,
                            DESCRIPTOR_TIMEOUT,
                        ) {
                            details.serial = serial;
                        }
                        let manufacturer = handle
                            .read_manufacturer_string(language, &descriptor, DESCRIPTOR_TIMEOUT)
                            .unwrap_or_default();
                        let product = handle
                            .read_product_string(language, &descriptor, DESCRIPTOR_TIMEOUT)
                            .unwrap_or_default();
                        let description =
                            format!("{} {}", manufacturer.trim(), product.trim());
                        let description = description.trim();
                        if !description.is_empty() {
                            details.description = description.to_string();
                        }
                    }
                }
                Err(e) => {
                    // Typically a permissions failure; serial stays empty
                    // and the description keeps its fallback.
                    debug!(bus_id = %raw.bus_id, "cannot open device: {e}");
                }
            }

            return Ok(details);
        }

        // Device vanished between enumeration and enrichment.
        Err(Error::Usb(rusb::Error::NoDevice))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_UDEV_OUTPUT: &str = "\
P: /devices/pci0000:00/0000:00:14.0/usb1/1-2
N: bus/usb/001/004
E: DEVPATH=/devices/pci0000:00/0000:00:14.0/usb1/1-2
E: DEVNAME=/dev/bus/usb/001/004
E: DEVTYPE=usb_device
E: ID_VENDOR_ID=0bda
E: ID_MODEL_ID=5400
E: ID_MODEL=4-Port_USB_2.0_Hub
E: ID_MODEL_FROM_DATABASE=RTS5411 Hub
E: ID_SERIAL_SHORT=SER001
E: BUSNUM=001
E: DEVNUM=004
";

    #[test]
    fn test_parse_udev_properties() {
        let props = parse_udev_properties(SAMPLE_UDEV_OUTPUT);
        assert_eq!(props.get("DEVNAME").unwrap(), "/dev/bus/usb/001/004");
        assert_eq!(props.get("ID_VENDOR_ID").unwrap(), "0bda");
        assert_eq!(props.get("BUSNUM").unwrap(), "001");
        // non-property lines are not captured
        assert!(!props.contains_key("P"));
    }

    #[test]
    fn test_details_prefer_database_model() {
        let details = details_from_udev_output(SAMPLE_UDEV_OUTPUT);
        assert_eq!(details.device_node, "/dev/bus/usb/001/004");
        assert_eq!(details.serial, "SER001");
        assert_eq!(details.description, "RTS5411 Hub");
    }

    #[test]
    fn test_details_fall_back_to_raw_model() {
        let output = "E: DEVNAME=/dev/bus/usb/001/004\nE: ID_MODEL=USB2.0_Hub\n";
        let details = details_from_udev_output(output);
        assert_eq!(details.description, "USB2.0 Hub");
        assert_eq!(details.serial, "");
    }

    #[test]
    fn test_details_from_empty_output() {
        let details = details_from_udev_output("");
        assert_eq!(details.description, "unknown");
        assert_eq!(details.serial, "");
        assert_eq!(details.device_node, "");
        assert!(details.attributes.is_empty());
    }
}
