//! Pixel formats reported by the camera and the encodings they publish as.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Encoding tags understood by image consumers (ROS `sensor_msgs` vocabulary).
pub mod encodings {
    pub const YUV422_YUY2: &str = "yuv422_yuy2";
    pub const YUV422: &str = "yuv422";
    pub const RGB8: &str = "rgb8";
    pub const BGR8: &str = "bgr8";
    pub const MONO8: &str = "mono8";
    pub const MONO16: &str = "mono16";
    pub const BAYER_BGGR8: &str = "bayer_bggr8";
    pub const BAYER_GRBG8: &str = "bayer_grbg8";
    pub const BAYER_GBRG8: &str = "bayer_gbrg8";
    pub const BAYER_RGGB8: &str = "bayer_rggb8";
}

/// Pixel layout of a frame delivered by the camera driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FrameFormat {
    Yuyv,
    Uyvy,
    Rgb,
    Bgr,
    Mjpeg,
    H264,
    Gray8,
    Gray16,
    By8,
    Ba81,
    Sgrbg8,
    Sgbrg8,
    Srggb8,
    Sbggr8,
    Nv12,
}

impl FrameFormat {
    pub const ALL: [FrameFormat; 15] = [
        FrameFormat::Yuyv,
        FrameFormat::Uyvy,
        FrameFormat::Rgb,
        FrameFormat::Bgr,
        FrameFormat::Mjpeg,
        FrameFormat::H264,
        FrameFormat::Gray8,
        FrameFormat::Gray16,
        FrameFormat::By8,
        FrameFormat::Ba81,
        FrameFormat::Sgrbg8,
        FrameFormat::Sgbrg8,
        FrameFormat::Srggb8,
        FrameFormat::Sbggr8,
        FrameFormat::Nv12,
    ];

    /// Encoding tag published for this format, `None` when consumers have no
    /// name for it (compressed streams and a few exotic layouts).
    pub fn encoding(self) -> Option<&'static str> {
        match self {
            FrameFormat::Yuyv => Some(encodings::YUV422_YUY2),
            FrameFormat::Uyvy => Some(encodings::YUV422),
            FrameFormat::Rgb => Some(encodings::RGB8),
            FrameFormat::Bgr => Some(encodings::BGR8),
            FrameFormat::Gray8 => Some(encodings::MONO8),
            FrameFormat::Gray16 => Some(encodings::MONO16),
            FrameFormat::Ba81 | FrameFormat::Sbggr8 => Some(encodings::BAYER_BGGR8),
            FrameFormat::Sgrbg8 => Some(encodings::BAYER_GRBG8),
            FrameFormat::Sgbrg8 => Some(encodings::BAYER_GBRG8),
            FrameFormat::Srggb8 => Some(encodings::BAYER_RGGB8),
            FrameFormat::Mjpeg | FrameFormat::H264 | FrameFormat::By8 | FrameFormat::Nv12 => None,
        }
    }

    pub fn is_compressed(self) -> bool {
        matches!(self, FrameFormat::Mjpeg | FrameFormat::H264)
    }

    /// Map a V4L2 fourcc code. `SBGGR8` shares `BA81` and is never returned.
    pub fn from_fourcc(code: &[u8; 4]) -> Option<Self> {
        let format = match code {
            b"YUYV" => FrameFormat::Yuyv,
            b"UYVY" => FrameFormat::Uyvy,
            b"RGB3" => FrameFormat::Rgb,
            b"BGR3" => FrameFormat::Bgr,
            b"MJPG" => FrameFormat::Mjpeg,
            b"H264" => FrameFormat::H264,
            b"GREY" => FrameFormat::Gray8,
            b"Y16 " => FrameFormat::Gray16,
            b"BY8 " => FrameFormat::By8,
            b"BA81" => FrameFormat::Ba81,
            b"GRBG" => FrameFormat::Sgrbg8,
            b"GBRG" => FrameFormat::Sgbrg8,
            b"RGGB" => FrameFormat::Srggb8,
            b"NV12" => FrameFormat::Nv12,
            _ => return None,
        };
        Some(format)
    }

    pub fn fourcc(self) -> [u8; 4] {
        match self {
            FrameFormat::Yuyv => *b"YUYV",
            FrameFormat::Uyvy => *b"UYVY",
            FrameFormat::Rgb => *b"RGB3",
            FrameFormat::Bgr => *b"BGR3",
            FrameFormat::Mjpeg => *b"MJPG",
            FrameFormat::H264 => *b"H264",
            FrameFormat::Gray8 => *b"GREY",
            FrameFormat::Gray16 => *b"Y16 ",
            FrameFormat::By8 => *b"BY8 ",
            FrameFormat::Ba81 | FrameFormat::Sbggr8 => *b"BA81",
            FrameFormat::Sgrbg8 => *b"GRBG",
            FrameFormat::Sgbrg8 => *b"GBRG",
            FrameFormat::Srggb8 => *b"RGGB",
            FrameFormat::Nv12 => *b"NV12",
        }
    }

    /// Bytes per row for packed layouts. `None` for compressed or planar data,
    /// or when the row length does not fit in a `u32`.
    pub fn packed_step(self, width: u32) -> Option<u32> {
        let bytes_per_pixel = match self {
            FrameFormat::Gray8
            | FrameFormat::By8
            | FrameFormat::Ba81
            | FrameFormat::Sgrbg8
            | FrameFormat::Sgbrg8
            | FrameFormat::Srggb8
            | FrameFormat::Sbggr8 => 1,
            FrameFormat::Yuyv | FrameFormat::Uyvy | FrameFormat::Gray16 => 2,
            FrameFormat::Rgb | FrameFormat::Bgr => 3,
            FrameFormat::Mjpeg | FrameFormat::H264 | FrameFormat::Nv12 => return None,
        };
        width.checked_mul(bytes_per_pixel)
    }
}

impl fmt::Display for FrameFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FrameFormat::Yuyv => "YUYV",
            FrameFormat::Uyvy => "UYVY",
            FrameFormat::Rgb => "RGB",
            FrameFormat::Bgr => "BGR",
            FrameFormat::Mjpeg => "MJPEG",
            FrameFormat::H264 => "H264",
            FrameFormat::Gray8 => "GRAY8",
            FrameFormat::Gray16 => "GRAY16",
            FrameFormat::By8 => "BY8",
            FrameFormat::Ba81 => "BA81",
            FrameFormat::Sgrbg8 => "SGRBG8",
            FrameFormat::Sgbrg8 => "SGBRG8",
            FrameFormat::Srggb8 => "SRGGB8",
            FrameFormat::Sbggr8 => "SBGGR8",
            FrameFormat::Nv12 => "NV12",
        };
        f.write_str(name)
    }
}

/// Stream family requested through `frame_fmt`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StreamFormat {
    #[default]
    Any,
    Uncompressed,
    Mjpeg,
}

impl StreamFormat {
    /// Whether a device mode with pixel format `format` belongs to this family.
    pub fn matches(self, format: FrameFormat) -> bool {
        match self {
            StreamFormat::Any => true,
            StreamFormat::Uncompressed => !format.is_compressed(),
            StreamFormat::Mjpeg => format == FrameFormat::Mjpeg,
        }
    }
}

/// Unknown `frame_fmt` string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid frame_fmt '{0}'. Valid values are ANY, UNCOMPRESSED, or MJPEG")]
pub struct InvalidStreamFormat(pub String);

impl FromStr for StreamFormat {
    type Err = InvalidStreamFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "ANY" => Ok(StreamFormat::Any),
            "UNCOMPRESSED" => Ok(StreamFormat::Uncompressed),
            "MJPEG" => Ok(StreamFormat::Mjpeg),
            other => Err(InvalidStreamFormat(other.to_string())),
        }
    }
}

impl fmt::Display for StreamFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamFormat::Any => f.write_str("ANY"),
            StreamFormat::Uncompressed => f.write_str("UNCOMPRESSED"),
            StreamFormat::Mjpeg => f.write_str("MJPEG"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encoding_table() {
        let expected = [
            (FrameFormat::Yuyv, Some("yuv422_yuy2")),
            (FrameFormat::Uyvy, Some("yuv422")),
            (FrameFormat::Rgb, Some("rgb8")),
            (FrameFormat::Bgr, Some("bgr8")),
            (FrameFormat::Mjpeg, None),
            (FrameFormat::H264, None),
            (FrameFormat::Gray8, Some("mono8")),
            (FrameFormat::Gray16, Some("mono16")),
            (FrameFormat::By8, None),
            (FrameFormat::Ba81, Some("bayer_bggr8")),
            (FrameFormat::Sgrbg8, Some("bayer_grbg8")),
            (FrameFormat::Sgbrg8, Some("bayer_gbrg8")),
            (FrameFormat::Srggb8, Some("bayer_rggb8")),
            (FrameFormat::Sbggr8, Some("bayer_bggr8")),
            (FrameFormat::Nv12, None),
        ];
        assert_eq!(expected.len(), FrameFormat::ALL.len());
        for (format, encoding) in expected {
            assert_eq!(format.encoding(), encoding, "encoding for {}", format);
        }
    }

    #[test]
    fn test_encoding_is_deterministic() {
        for format in FrameFormat::ALL {
            assert_eq!(format.encoding(), format.encoding());
        }
    }

    #[test]
    fn test_parse_stream_format() {
        assert_eq!("".parse::<StreamFormat>().unwrap(), StreamFormat::Any);
        assert_eq!("ANY".parse::<StreamFormat>().unwrap(), StreamFormat::Any);
        assert_eq!(
            "UNCOMPRESSED".parse::<StreamFormat>().unwrap(),
            StreamFormat::Uncompressed
        );
        assert_eq!("MJPEG".parse::<StreamFormat>().unwrap(), StreamFormat::Mjpeg);
    }

    #[test]
    fn test_parse_stream_format_is_case_exact() {
        assert!("mjpeg".parse::<StreamFormat>().is_err());
        assert!("bogus".parse::<StreamFormat>().is_err());
    }

    #[test]
    fn test_stream_format_matching() {
        assert!(StreamFormat::Any.matches(FrameFormat::H264));
        assert!(StreamFormat::Uncompressed.matches(FrameFormat::Yuyv));
        assert!(StreamFormat::Uncompressed.matches(FrameFormat::Nv12));
        assert!(!StreamFormat::Uncompressed.matches(FrameFormat::Mjpeg));
        assert!(StreamFormat::Mjpeg.matches(FrameFormat::Mjpeg));
        assert!(!StreamFormat::Mjpeg.matches(FrameFormat::Yuyv));
    }

    #[test]
    fn test_fourcc_mapping() {
        for format in FrameFormat::ALL {
            let mapped = FrameFormat::from_fourcc(&format.fourcc()).unwrap();
            if format == FrameFormat::Sbggr8 {
                assert_eq!(mapped, FrameFormat::Ba81);
            } else {
                assert_eq!(mapped, format);
            }
        }
        assert_eq!(FrameFormat::from_fourcc(b"XXXX"), None);
    }

    #[test]
    fn test_packed_step() {
        assert_eq!(FrameFormat::Yuyv.packed_step(640), Some(1280));
        assert_eq!(FrameFormat::Rgb.packed_step(640), Some(1920));
        assert_eq!(FrameFormat::Gray8.packed_step(320), Some(320));
        assert_eq!(FrameFormat::Mjpeg.packed_step(640), None);
        assert_eq!(FrameFormat::Rgb.packed_step(u32::MAX), None);
        assert_eq!(FrameFormat::Gray8.packed_step(u32::MAX), Some(u32::MAX));
    }
}
