//! Capability interface the game loop drives.
//!
//! Game logic only talks to a [`Robot`]; the transport to the physical robot
//! lives in an implementation (see `rlgl-bridge`). Camera frames and cube taps
//! flow the other way as [`RobotEvent`]s over a channel created by the
//! implementation.

use std::time::Duration;

use crate::frame::CameraFrame;
use crate::game::{CubeId, LightPattern, Speech};

#[derive(Debug, Clone)]
pub enum RobotEvent {
    CameraFrame(CameraFrame),
    Tapped { cube: CubeId },
}

#[allow(async_fn_in_trait)]
pub trait Robot {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Turn the camera stream on, set the volume, start the idle animation,
    /// and put the head and lift in their game positions.
    async fn prepare(&mut self, volume: f32) -> Result<(), Self::Error>;

    /// Wait until `count` cubes are visible. Returns `Ok(None)` when `timeout`
    /// elapses first.
    async fn discover_cubes(
        &mut self,
        count: usize,
        timeout: Duration,
    ) -> Result<Option<Vec<CubeId>>, Self::Error>;

    async fn speak(&mut self, speech: &Speech) -> Result<(), Self::Error>;

    async fn set_cube_lights(
        &mut self,
        cube: &CubeId,
        pattern: LightPattern,
    ) -> Result<(), Self::Error>;

    async fn set_backpack_lights(&mut self, pattern: LightPattern) -> Result<(), Self::Error>;

    /// Resolves once the turn is complete.
    async fn turn_in_place(&mut self, degrees: f32) -> Result<(), Self::Error>;

    /// Resolves once the animation is complete.
    async fn play_animation(&mut self, trigger: &str) -> Result<(), Self::Error>;
}
