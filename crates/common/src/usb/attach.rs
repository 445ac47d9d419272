//! Attach executor boundary
//!
//! Making a device usable by a remote caller is a kernel-level operation
//! outside this crate's scope; the dispatcher only calls the seam and
//! interprets success or failure.

use crate::error::{Error, Result};
use protocol::DeviceDescriptor;
use std::process::Command;
use tracing::info;

/// Performs the kernel-level attach/export of one device
pub trait AttachExecutor: Send + Sync {
    fn attach(&self, device: &DeviceDescriptor) -> Result<()>;
}

/// Binds the device to the usbip host driver via `usbip bind`
#[derive(Debug, Clone)]
pub struct UsbipBindExecutor {
    /// Tool name or path, `"usbip"` unless overridden
    pub program: String,
}

impl Default for UsbipBindExecutor {
    fn default() -> Self {
        Self {
            program: "usbip".to_string(),
        }
    }
}

impl AttachExecutor for UsbipBindExecutor {
    fn attach(&self, device: &DeviceDescriptor) -> Result<()> {
        let bus_id = device.bus_id.to_string();
        info!(bus_id = %bus_id, "binding device for export");

        let output = Command::new(&self.program)
            .args(["bind", "-b"])
            .arg(&bus_id)
            .output()
            .map_err(|e| Error::Attach(format!("failed to run {}: {}", self.program, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Attach(format!(
                "{} bind exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn device() -> DeviceDescriptor {
        DeviceDescriptor {
            bus_id: "1-2".parse().unwrap(),
            vendor_id: 0x0bda,
            product_id: 0x5400,
            device_node: String::new(),
            serial: String::new(),
            description: "unknown".to_string(),
            attributes: BTreeMap::new(),
        }
    }

    #[test]
    fn test_bind_missing_tool_reports_attach_failure() {
        let executor = UsbipBindExecutor {
            program: "/nonexistent/usbip".to_string(),
        };
        let err = executor.attach(&device()).unwrap_err();
        assert!(matches!(err, Error::Attach(_)));
    }
}
