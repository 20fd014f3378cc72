use crate::format::{FrameFormat, StreamFormat};
use serde::{Deserialize, Serialize};

/// Camera driver backend used to open the device.
///
/// Defaults to `v4l2` when the crate is built with that feature and to
/// `synthetic` otherwise.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Linux uvcvideo device through V4L2 (requires the `v4l2` feature)
    #[cfg_attr(feature = "v4l2", default)]
    V4l2,
    /// Generated test pattern, no hardware needed
    #[cfg_attr(not(feature = "v4l2"), default)]
    Synthetic,
}

/// A stream mode advertised by the synthetic backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeConfig {
    pub format: FrameFormat,
    pub width: u32,
    pub height: u32,
    pub fps: Vec<u32>,
}

/// Node configuration, read once at startup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// USB vendor id, hex encoded (e.g. "0x046d")
    #[serde(default = "default_vendor_id")]
    pub vendor_id: String,
    /// USB product id, hex encoded (e.g. "0x0825")
    #[serde(default = "default_product_id")]
    pub product_id: String,
    /// Serial number of the device; empty matches any
    #[serde(default)]
    pub serial_num: String,
    /// Requested stream family: "", ANY, UNCOMPRESSED or MJPEG
    #[serde(default = "default_frame_fmt")]
    pub frame_fmt: String,
    /// Requested width, 0 = unconstrained
    #[serde(default)]
    pub image_width: u32,
    /// Requested height, 0 = unconstrained
    #[serde(default)]
    pub image_height: u32,
    #[serde(default = "default_frames_per_second")]
    pub frames_per_second: u32,
    /// Coordinate frame label stamped on every published image
    #[serde(default = "default_frame_id")]
    pub frame_id: String,
    #[serde(default)]
    pub backend: Backend,
    /// Drop frames whose pixel format has no encoding tag instead of
    /// publishing them with an empty encoding
    #[serde(default)]
    pub drop_unmapped_frames: bool,
    #[serde(default = "default_synthetic_modes")]
    pub synthetic_modes: Vec<ModeConfig>,
}

fn default_vendor_id() -> String {
    "0x046d".to_string()
}

fn default_product_id() -> String {
    "0x0825".to_string()
}

fn default_frame_fmt() -> String {
    "UNCOMPRESSED".to_string()
}

fn default_frames_per_second() -> u32 {
    30
}

fn default_frame_id() -> String {
    "camera".to_string()
}

fn default_synthetic_modes() -> Vec<ModeConfig> {
    vec![
        ModeConfig {
            format: FrameFormat::Yuyv,
            width: 640,
            height: 480,
            fps: vec![30, 15],
        },
        ModeConfig {
            format: FrameFormat::Gray8,
            width: 320,
            height: 240,
            fps: vec![30],
        },
        ModeConfig {
            format: FrameFormat::Mjpeg,
            width: 640,
            height: 480,
            fps: vec![30],
        },
    ]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            vendor_id: default_vendor_id(),
            product_id: default_product_id(),
            serial_num: String::new(),
            frame_fmt: default_frame_fmt(),
            image_width: 0,
            image_height: 0,
            frames_per_second: default_frames_per_second(),
            frame_id: default_frame_id(),
            backend: Backend::default(),
            drop_unmapped_frames: false,
            synthetic_modes: default_synthetic_modes(),
        }
    }
}

/// Which physical device to open
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceSelector {
    pub vendor_id: u16,
    pub product_id: u16,
    pub serial_number: Option<String>,
}

impl DeviceSelector {
    pub fn matches(&self, vendor_id: u16, product_id: u16, serial_number: Option<&str>) -> bool {
        if self.vendor_id != vendor_id || self.product_id != product_id {
            return false;
        }
        match &self.serial_number {
            Some(wanted) => serial_number == Some(wanted.as_str()),
            None => true,
        }
    }
}

impl std::fmt::Display for DeviceSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04x}:{:04x}", self.vendor_id, self.product_id)?;
        if let Some(serial) = &self.serial_number {
            write!(f, " (serial {})", serial)?;
        }
        Ok(())
    }
}

/// Effective stream request resolved from the configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamRequest {
    pub device: DeviceSelector,
    pub format: StreamFormat,
    pub width: u32,
    pub height: u32,
    pub frame_rate: u32,
}

impl Config {
    pub fn requested_format(&self) -> Result<StreamFormat, ConfigError> {
        self.frame_fmt
            .parse()
            .map_err(|e: crate::format::InvalidStreamFormat| {
                ConfigError::InvalidParameter(e.to_string())
            })
    }

    pub fn device_selector(&self) -> Result<DeviceSelector, ConfigError> {
        let serial_number = if self.serial_num.is_empty() {
            None
        } else {
            Some(self.serial_num.clone())
        };
        Ok(DeviceSelector {
            vendor_id: parse_usb_id("vendor_id", &self.vendor_id)?,
            product_id: parse_usb_id("product_id", &self.product_id)?,
            serial_number,
        })
    }

    /// Resolve the stream request. Fails on any invalid parameter, so callers
    /// run it before touching the device.
    pub fn stream_request(&self) -> Result<StreamRequest, ConfigError> {
        let format = self.requested_format()?;
        let device = self.device_selector()?;
        Ok(StreamRequest {
            device,
            format,
            width: self.image_width,
            height: self.image_height,
            frame_rate: self.frames_per_second,
        })
    }
}

/// Parse a USB id such as "0x046d", "046d" or "0X046D".
fn parse_usb_id(name: &str, value: &str) -> Result<u16, ConfigError> {
    let trimmed = value.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    u16::from_str_radix(digits, 16).map_err(|_| {
        ConfigError::InvalidParameter(format!("{} '{}' is not a hex USB id", name, value))
    })
}

/// Configuration values that parse as YAML but cannot be used
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}
