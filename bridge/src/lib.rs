//! HTTP bridge to the referee robot.
//!
//! [`connect`] builds the command client and spawns the two background
//! readers (MJPEG camera stream and tap event stream) that feed the game loop.

pub mod client;
pub mod events;
pub mod mjpeg;

use rlgl_common::config::RobotConfig;
use rlgl_common::robot::RobotEvent;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::info;

pub use client::HttpRobot;

#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("failed to build HTTP client: {0}")]
    Client(reqwest::Error),
    #[error("HTTP connection failed: {0}")]
    HttpConnect(reqwest::Error),
    #[error("HTTP stream error: {0}")]
    HttpStream(reqwest::Error),
    #[error("failed to read HTTP response body: {0}")]
    HttpBody(reqwest::Error),
    #[error("HTTP status {0}")]
    HttpStatus(u16),
}

/// Connect to the robot bridge. Must be called from within a tokio runtime.
pub fn connect(config: &RobotConfig) -> Result<(HttpRobot, mpsc::Receiver<RobotEvent>), BridgeError> {
    let client = reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .build()
        .map_err(BridgeError::Client)?;
    // Streams stay open indefinitely; only commands get a request timeout.
    let command_client = reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .build()
        .map_err(BridgeError::Client)?;

    let robot = HttpRobot::new(command_client, config);
    let (tx, rx) = mpsc::channel(config.event_buffer);

    tokio::spawn(mjpeg::run_camera_stream(
        client.clone(),
        robot.url("camera/stream"),
        tx.clone(),
    ));
    tokio::spawn(events::run_event_stream(client, robot.url("events"), tx));

    info!(base_url = config.base_url, "robot bridge connected");
    Ok((robot, rx))
}
