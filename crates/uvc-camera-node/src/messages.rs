//! Protobuf messages published by the node.
//!
//! Field numbers follow `bubbaloop.header.v1.Header` and
//! `bubbaloop.camera.v1.RawImage`, so existing subscribers decode them as-is.

/// Metadata stamped on every message.
#[derive(Clone, PartialEq, prost::Message)]
pub struct Header {
    /// Acquisition time, nanoseconds since the Unix epoch
    #[prost(uint64, tag = "1")]
    pub acq_time: u64,
    /// Publication time, nanoseconds since the Unix epoch
    #[prost(uint64, tag = "2")]
    pub pub_time: u64,
    #[prost(uint32, tag = "3")]
    pub sequence: u32,
    /// Coordinate frame of the sensor
    #[prost(string, tag = "4")]
    pub frame_id: String,
    #[prost(string, tag = "5")]
    pub machine_id: String,
    #[prost(string, tag = "6")]
    pub scope: String,
}

/// An uncompressed (or passed-through) camera frame.
#[derive(Clone, PartialEq, prost::Message)]
pub struct RawImage {
    #[prost(message, optional, tag = "1")]
    pub header: Option<Header>,
    #[prost(uint32, tag = "2")]
    pub width: u32,
    #[prost(uint32, tag = "3")]
    pub height: u32,
    /// Pixel layout tag; empty when the source format has no name
    #[prost(string, tag = "4")]
    pub encoding: String,
    #[prost(uint32, tag = "5")]
    pub step: u32,
    #[prost(bytes = "vec", tag = "6")]
    pub data: Vec<u8>,
}

impl RawImage {
    pub const TYPE_NAME: &'static str = "bubbaloop.camera.v1.RawImage";
}
