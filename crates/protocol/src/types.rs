//! Device descriptor and bus-id types
//!
//! This module defines the canonical device record exchanged between server
//! and client, and the `BusId` key that identifies a physical USB port path.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Physical USB port path identifier
///
/// Wire form is `"<bus>-<port>.<port>..."`, e.g. `"1-2.3"` for bus 1,
/// port chain (2, 3). A bus id is only unique among currently-connected
/// devices; after a disconnect the same id can be reused by new hardware.
///
/// Comparisons use the full `(bus, ports)` tuple. Never match on a prefix
/// of the port chain: `"1-2"` and `"1-2.3"` are different physical ports.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BusId {
    /// Bus number
    pub bus: u8,
    /// Port numbers from the root hub down to the device
    pub ports: Vec<u8>,
}

/// Error parsing a bus id string
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BusIdParseError {
    /// Missing the `-` separator between bus and port chain
    #[error("bus id {0:?} is missing the bus-port separator")]
    MissingSeparator(String),

    /// Bus or port component was not a number
    #[error("bus id component {0:?} is not a valid number")]
    InvalidNumber(String),

    /// Port chain was empty
    #[error("bus id {0:?} has an empty port chain")]
    EmptyPorts(String),
}

impl FromStr for BusId {
    type Err = BusIdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (bus_str, ports_str) = s
            .split_once('-')
            .ok_or_else(|| BusIdParseError::MissingSeparator(s.to_string()))?;

        let bus: u8 = bus_str
            .parse()
            .map_err(|_| BusIdParseError::InvalidNumber(bus_str.to_string()))?;

        if ports_str.is_empty() {
            return Err(BusIdParseError::EmptyPorts(s.to_string()));
        }

        let ports = ports_str
            .split('.')
            .map(|p| {
                p.parse::<u8>()
                    .map_err(|_| BusIdParseError::InvalidNumber(p.to_string()))
            })
            .collect::<Result<Vec<u8>, _>>()?;

        Ok(Self { bus, ports })
    }
}

impl fmt::Display for BusId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-", self.bus)?;
        for (i, port) in self.ports.iter().enumerate() {
            if i > 0 {
                write!(f, ".")?;
            }
            write!(f, "{}", port)?;
        }
        Ok(())
    }
}

impl Serialize for BusId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for BusId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Serde helper for 16-bit ids carried as 4-hex-digit strings
///
/// Serializes lowercase (`"0bda"`); accepts any case on input.
pub(crate) mod hex4 {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u16, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&format_args!("{:04x}", value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u16, D::Error> {
        let s = String::deserialize(deserializer)?;
        u16::from_str_radix(&s, 16)
            .map_err(|_| serde::de::Error::custom(format!("invalid hex id: {:?}", s)))
    }
}

/// One physical USB device exposed for sharing
///
/// Built fresh on every registry snapshot and never mutated afterwards.
/// Optional enrichment that could not be resolved falls back to an empty
/// `serial`, an `"unknown"` description, and an empty `device_node`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceDescriptor {
    /// Bus number and port path, unique at snapshot time
    pub bus_id: BusId,
    /// USB vendor id, 4 hex digits on the wire
    #[serde(with = "hex4")]
    pub vendor_id: u16,
    /// USB product id, 4 hex digits on the wire
    #[serde(with = "hex4")]
    pub product_id: u16,
    /// Host path to the kernel device file, empty if unresolved
    #[serde(default)]
    pub device_node: String,
    /// Serial number, empty when unavailable (typically permissions)
    #[serde(default)]
    pub serial: String,
    /// Human-readable description, `"unknown"` when not resolvable
    #[serde(default)]
    pub description: String,
    /// Raw enrichment properties, keys unique
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
}

impl DeviceDescriptor {
    /// Vendor:product pair as it appears in selectors, e.g. `"0bda:5400"`
    pub fn usb_id(&self) -> String {
        format!("{:04x}:{:04x}", self.vendor_id, self.product_id)
    }
}

impl fmt::Display for DeviceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "id={} bus={:<13} dev={:<20} desc={}",
            self.usb_id(),
            self.bus_id,
            self.device_node,
            self.description
        )?;
        if !self.serial.is_empty() {
            write!(f, " [serial={}]", self.serial)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bus_id_parse_simple() {
        let id: BusId = "1-2".parse().unwrap();
        assert_eq!(id.bus, 1);
        assert_eq!(id.ports, vec![2]);
    }

    #[test]
    fn test_bus_id_parse_chained_ports() {
        let id: BusId = "3-2.3.4".parse().unwrap();
        assert_eq!(id.bus, 3);
        assert_eq!(id.ports, vec![2, 3, 4]);
    }

    #[test]
    fn test_bus_id_display_roundtrip() {
        for s in ["1-2", "1-2.3", "12-1.2.3.4"] {
            let id: BusId = s.parse().unwrap();
            assert_eq!(id.to_string(), s);
        }
    }

    #[test]
    fn test_bus_id_rejects_garbage() {
        assert_eq!(
            "12".parse::<BusId>(),
            Err(BusIdParseError::MissingSeparator("12".to_string()))
        );
        assert_eq!(
            "1-".parse::<BusId>(),
            Err(BusIdParseError::EmptyPorts("1-".to_string()))
        );
        assert!(matches!(
            "a-2".parse::<BusId>(),
            Err(BusIdParseError::InvalidNumber(_))
        ));
        assert!(matches!(
            "1-2.x".parse::<BusId>(),
            Err(BusIdParseError::InvalidNumber(_))
        ));
    }

    #[test]
    fn test_bus_id_no_prefix_equality() {
        let short: BusId = "1-2".parse().unwrap();
        let long: BusId = "1-2.3".parse().unwrap();
        assert_ne!(short, long);
    }

    #[test]
    fn test_descriptor_json_shape() {
        let dev = DeviceDescriptor {
            bus_id: "1-2".parse().unwrap(),
            vendor_id: 0x0bda,
            product_id: 0x5400,
            device_node: "/dev/bus/usb/001/004".to_string(),
            serial: String::new(),
            description: "Realtek Hub".to_string(),
            attributes: BTreeMap::new(),
        };

        let json = serde_json::to_value(&dev).unwrap();
        assert_eq!(json["busId"], "1-2");
        assert_eq!(json["vendorId"], "0bda");
        assert_eq!(json["productId"], "5400");
        assert_eq!(json["description"], "Realtek Hub");
        // empty attributes stay off the wire
        assert!(json.get("attributes").is_none());
    }

    #[test]
    fn test_descriptor_hex_ids_accept_uppercase() {
        let json = r#"{
            "busId": "1-2",
            "vendorId": "0BDA",
            "productId": "5400",
            "deviceNode": "",
            "serial": "",
            "description": "unknown"
        }"#;
        let dev: DeviceDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(dev.vendor_id, 0x0bda);
        assert_eq!(dev.product_id, 0x5400);
    }
}
