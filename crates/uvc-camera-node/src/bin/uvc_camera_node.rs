//! UVC camera node binary

use uvc_camera_node::runtime::run_node;
use uvc_camera_node::UvcCameraNode;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    run_node::<UvcCameraNode>().await
}
