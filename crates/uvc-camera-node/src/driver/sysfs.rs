//! USB identity of video4linux nodes, read from sysfs.

use std::path::{Path, PathBuf};

const VIDEO4LINUX_CLASS: &str = "/sys/class/video4linux";

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct UsbIdentity {
    pub vendor_id: u16,
    pub product_id: u16,
    pub serial: Option<String>,
}

/// sysfs directory of the USB device that owns `/dev/video{index}`.
///
/// The class link points at the USB interface; its parent is the device.
pub(crate) fn usb_device_dir(index: usize) -> Option<PathBuf> {
    let interface =
        std::fs::canonicalize(Path::new(VIDEO4LINUX_CLASS).join(format!("video{}/device", index)))
            .ok()?;
    interface.parent().map(Path::to_path_buf)
}

/// Read `idVendor`, `idProduct` and the optional `serial` of a USB device
/// directory.
pub(crate) fn read_usb_identity(dir: &Path) -> Option<UsbIdentity> {
    Some(UsbIdentity {
        vendor_id: parse_hex_id(&std::fs::read_to_string(dir.join("idVendor")).ok()?)?,
        product_id: parse_hex_id(&std::fs::read_to_string(dir.join("idProduct")).ok()?)?,
        serial: std::fs::read_to_string(dir.join("serial"))
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()),
    })
}

/// sysfs USB ids are bare hex with a trailing newline, e.g. `"046d\n"`.
pub(crate) fn parse_hex_id(raw: &str) -> Option<u16> {
    u16::from_str_radix(raw.trim(), 16).ok()
}
