use rlgl_common::config::RobotConfig;
use rlgl_common::game::{CubeId, LightPattern, Speech};
use rlgl_common::robot::Robot;
use serde::Serialize;
use serde_json::json;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::BridgeError;

/// `Robot` implementation that drives the robot through its HTTP bridge.
///
/// Every command is a JSON `POST`. Commands that must finish before the game
/// continues (turns, animations, blocking speech) rely on the bridge holding
/// the response until the action completes.
#[derive(Clone)]
pub struct HttpRobot {
    client: reqwest::Client,
    base_url: String,
    cube_poll: Duration,
}

impl HttpRobot {
    pub fn new(client: reqwest::Client, config: &RobotConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            cube_poll: Duration::from_millis(config.cube_poll_ms),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn post<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<(), BridgeError> {
        let url = self.url(path);
        debug!(url, "robot command");
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(BridgeError::HttpConnect)?;
        if !response.status().is_success() {
            return Err(BridgeError::HttpStatus(response.status().as_u16()));
        }
        Ok(())
    }

    async fn visible_cubes(&self) -> Result<Vec<CubeId>, BridgeError> {
        let response = self
            .client
            .get(self.url("cubes"))
            .send()
            .await
            .map_err(BridgeError::HttpConnect)?;
        if !response.status().is_success() {
            return Err(BridgeError::HttpStatus(response.status().as_u16()));
        }
        response.json().await.map_err(BridgeError::HttpBody)
    }
}

impl Robot for HttpRobot {
    type Error = BridgeError;

    async fn prepare(&mut self, volume: f32) -> Result<(), BridgeError> {
        self.post("camera", &json!({ "enabled": true })).await?;
        self.post("volume", &json!({ "level": volume })).await?;
        self.post("idle_animation", &json!({ "trigger": "Count" })).await?;
        self.post("head", &json!({ "degrees": 0.0 })).await?;
        self.post("lift", &json!({ "height": 0.0 })).await?;
        info!(volume, "robot ready");
        Ok(())
    }

    async fn discover_cubes(
        &mut self,
        count: usize,
        timeout: Duration,
    ) -> Result<Option<Vec<CubeId>>, BridgeError> {
        let deadline = Instant::now() + timeout;
        loop {
            let mut cubes = self.visible_cubes().await?;
            if cubes.len() >= count {
                cubes.truncate(count);
                return Ok(Some(cubes));
            }
            debug!(visible = cubes.len(), wanted = count, "waiting for cubes");
            if Instant::now() + self.cube_poll > deadline {
                return Ok(None);
            }
            tokio::time::sleep(self.cube_poll).await;
        }
    }

    async fn speak(&mut self, speech: &Speech) -> Result<(), BridgeError> {
        self.post("say", speech).await
    }

    async fn set_cube_lights(
        &mut self,
        cube: &CubeId,
        pattern: LightPattern,
    ) -> Result<(), BridgeError> {
        self.post(&format!("cubes/{cube}/lights"), &pattern).await
    }

    async fn set_backpack_lights(&mut self, pattern: LightPattern) -> Result<(), BridgeError> {
        self.post("backpack/lights", &pattern).await
    }

    async fn turn_in_place(&mut self, degrees: f32) -> Result<(), BridgeError> {
        self.post("turn", &json!({ "degrees": degrees })).await
    }

    async fn play_animation(&mut self, trigger: &str) -> Result<(), BridgeError> {
        self.post("animation", &json!({ "trigger": trigger })).await
    }
}
