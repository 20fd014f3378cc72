//! End-to-end tests of the node on the synthetic backend: config in,
//! negotiated stream, frames relayed to an in-memory publisher.

mod common;

use common::{labels, MemoryPublisher};
use std::time::Duration;
use tokio::sync::watch;
use uvc_camera_node::runtime::load_config;
use uvc_camera_node::{
    open_driver, Backend, CameraDriver, Config, FrameFormat, ModeConfig, NodeError,
    UvcCameraNode,
};

fn synthetic_config(yaml: &str) -> Config {
    let mut config: Config = serde_yaml::from_str(yaml).unwrap();
    config.backend = Backend::Synthetic;
    config.synthetic_modes = vec![
        ModeConfig {
            format: FrameFormat::Yuyv,
            width: 16,
            height: 8,
            fps: vec![100, 30],
        },
        ModeConfig {
            format: FrameFormat::Mjpeg,
            width: 16,
            height: 8,
            fps: vec![100],
        },
    ];
    config
}

fn start(config: &Config, publisher: &MemoryPublisher) -> uvc_camera_node::Result<UvcCameraNode> {
    let (shutdown_tx, _rx) = watch::channel(());
    UvcCameraNode::start(
        config,
        labels(&config.frame_id),
        |device| open_driver(config, device),
        Box::new(publisher.clone()),
        &shutdown_tx,
    )
}

#[test]
fn first_available_stream_relays_uncompressed_frames() {
    let config = synthetic_config("frame_fmt: ANY\nframes_per_second: 0\nframe_id: test_cam\n");
    let publisher = MemoryPublisher::default();

    let mut node = start(&config, &publisher).unwrap();
    assert_eq!(node.selection().format, FrameFormat::Yuyv);
    assert_eq!(node.selection().fps, 100);

    let images = publisher.wait_for(3, Duration::from_secs(5));
    node.stop().unwrap();

    assert!(images.len() >= 3);
    for image in &images {
        assert_eq!(image.encoding, "yuv422_yuy2");
        assert_eq!((image.width, image.height, image.step), (16, 8, 32));
        assert_eq!(image.data.len(), 16 * 8 * 2);
        let header = image.header.as_ref().unwrap();
        assert_eq!(header.frame_id, "test_cam");
        assert_eq!(header.machine_id, "test_machine");
    }
    let sequences: Vec<u32> = images
        .iter()
        .map(|i| i.header.as_ref().unwrap().sequence)
        .collect();
    assert!(sequences.windows(2).all(|w| w[1] == w[0] + 1));
}

#[test]
fn mjpeg_stream_passes_payload_through() {
    let config = synthetic_config(
        "frame_fmt: MJPEG\nimage_width: 16\nimage_height: 8\nframes_per_second: 100\n",
    );
    let publisher = MemoryPublisher::default();

    let mut node = start(&config, &publisher).unwrap();
    let images = publisher.wait_for(1, Duration::from_secs(5));
    node.stop().unwrap();

    assert!(!images.is_empty());
    let image = &images[0];
    assert_eq!(image.encoding, "");
    assert_eq!(image.step, 0);
    assert_eq!(&image.data[..2], &[0xFF, 0xD8]);
    assert_eq!(&image.data[image.data.len() - 2..], &[0xFF, 0xD9]);
}

#[test]
fn unmapped_frames_dropped_when_configured() {
    let mut config = synthetic_config(
        "frame_fmt: MJPEG\nimage_width: 16\nimage_height: 8\nframes_per_second: 100\n",
    );
    config.drop_unmapped_frames = true;
    let publisher = MemoryPublisher::default();

    let mut node = start(&config, &publisher).unwrap();
    std::thread::sleep(Duration::from_millis(100));
    node.stop().unwrap();

    assert!(publisher.images().is_empty());
    assert!(node.relay().dropped() > 0);
}

#[test]
fn unsupported_request_never_streams() {
    let config = synthetic_config(
        "frame_fmt: MJPEG\nimage_width: 640\nimage_height: 480\nframes_per_second: 30\n",
    );
    let publisher = MemoryPublisher::default();
    let (shutdown_tx, shutdown_rx) = watch::channel(());

    let result = UvcCameraNode::start(
        &config,
        labels("camera"),
        |device| open_driver(&config, device),
        Box::new(publisher.clone()),
        &shutdown_tx,
    );

    assert!(matches!(result, Err(NodeError::StreamUnsupported(_))));
    assert!(shutdown_rx.has_changed().unwrap());
    std::thread::sleep(Duration::from_millis(50));
    assert!(publisher.images().is_empty());
}

#[test]
fn v4l2_backend_without_device_fails() {
    let config = Config {
        vendor_id: "0xffff".to_string(),
        product_id: "0xfffe".to_string(),
        frame_fmt: "ANY".to_string(),
        frames_per_second: 0,
        backend: Backend::V4l2,
        ..Default::default()
    };
    let publisher = MemoryPublisher::default();

    let result = start(&config, &publisher);
    assert!(matches!(result, Err(NodeError::Device(_))));
}

#[test]
fn default_config_opens_a_compiled_in_backend() {
    let config = Config::default();
    let device = config.device_selector().unwrap();
    let result = open_driver(&config, &device);
    if cfg!(feature = "v4l2") {
        // no such camera on a build host; the V4L2 path is still taken
        assert!(!matches!(&result, Err(NodeError::Device(msg)) if msg.contains("feature")));
    } else {
        assert!(!result.unwrap().supported_formats().is_empty());
    }
}

#[test]
fn example_config_parses() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/configs/uvc_camera.yaml");
    let config: Config = load_config(path).unwrap();
    let request = config.stream_request().unwrap();
    assert_eq!(request.device.vendor_id, 0x046d);
    assert_eq!(request.device.product_id, 0x0825);
}
