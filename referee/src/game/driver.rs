use std::time::Duration;

use chrono::Utc;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rlgl_api::GameLink;
use rlgl_common::config::Config;
use rlgl_common::frame::CameraFrame;
use rlgl_common::game::{CubeId, Outcome};
use rlgl_common::robot::{Robot, RobotEvent};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::machine::{Action, GameMachine, Rules};
use super::timer::LightTimer;
use super::RefereeError;

/// The game's single event loop: light timer, camera frames, cube taps and
/// quit requests all run here, one at a time.
pub struct Referee<R: Robot> {
    robot: R,
    events: mpsc::Receiver<RobotEvent>,
    link: GameLink,
    machine: GameMachine,
    timer: LightTimer,
    rng: StdRng,
    volume: f32,
    discovery_timeout: Duration,
}

impl<R: Robot> Referee<R> {
    pub fn new(
        robot: R,
        events: mpsc::Receiver<RobotEvent>,
        link: GameLink,
        config: &Config,
    ) -> Self {
        Self {
            robot,
            events,
            link,
            machine: GameMachine::new(Rules::from_config(&config.game, &config.vision)),
            timer: LightTimer::new(config.game.min_light_secs, config.game.max_light_secs),
            rng: StdRng::from_entropy(),
            volume: config.robot.volume,
            discovery_timeout: Duration::from_secs(config.robot.discovery_timeout_secs),
        }
    }

    #[cfg(test)]
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    /// Play one game to its end.
    pub async fn run(mut self) -> Result<Outcome, RefereeError> {
        self.robot
            .prepare(self.volume)
            .await
            .map_err(RefereeError::robot)?;

        info!(
            timeout_secs = self.discovery_timeout.as_secs(),
            "looking for player cubes"
        );
        let found = tokio::select! {
            biased;
            _ = self.link.wait_for_quit() => None,
            found = self.robot.discover_cubes(2, self.discovery_timeout) => {
                Some(found.map_err(RefereeError::robot)?)
            }
        };
        let cubes = match found {
            None => {
                info!("quit requested during cube discovery");
                self.machine.cancel();
                return Ok(Outcome::Cancelled);
            }
            Some(None) => {
                warn!("cubes not found");
                self.machine.players_not_found();
                return Ok(Outcome::PlayersNotFound);
            }
            Some(Some(cubes)) => cubes,
        };
        let players: [CubeId; 2] = match cubes.try_into() {
            Ok(players) => players,
            Err(cubes) => {
                warn!(found = cubes.len(), "robot reported the wrong number of cubes");
                self.machine.players_not_found();
                return Ok(Outcome::PlayersNotFound);
            }
        };

        let actions = self.machine.start(players);
        self.execute(actions).await?;

        loop {
            if let Some(outcome) = self.machine.outcome() {
                info!(?outcome, "game over");
                return Ok(outcome);
            }

            tokio::select! {
                biased;
                _ = self.link.wait_for_quit() => {
                    info!("quit requested");
                    self.machine.cancel();
                }
                _ = self.timer.expired() => {
                    debug!(phase = ?self.machine.phase(), "light timer fired");
                    let actions = self.machine.flip();
                    self.execute(actions).await?;
                }
                event = self.events.recv() => match event {
                    Some(RobotEvent::CameraFrame(frame)) => self.handle_frame(frame).await?,
                    Some(RobotEvent::Tapped { cube }) => {
                        let actions = self.machine.on_tap(&cube);
                        self.execute(actions).await?;
                    }
                    None => return Err(RefereeError::EventsClosed),
                },
            }
        }
    }

    async fn handle_frame(&mut self, frame: CameraFrame) -> Result<(), RefereeError> {
        if !self.machine.is_armed() {
            return Ok(());
        }
        debug!(
            seq = frame.seq,
            lag_ms = frame.age_ms(Utc::now().timestamp_millis()),
            "camera frame"
        );
        let report = self.machine.on_frame(&frame, self.link.threshold())?;
        if let Some(comparison) = report.comparison {
            self.link.publish_diff(comparison.display);
        }
        self.execute(report.actions).await
    }

    async fn execute(&mut self, actions: Vec<Action>) -> Result<(), RefereeError> {
        for action in actions {
            match action {
                Action::Speak(speech) => {
                    self.robot.speak(&speech).await.map_err(RefereeError::robot)?
                }
                Action::CubeLights { slot, pattern } => {
                    let Some(cube) = self.machine.cube(slot) else {
                        continue;
                    };
                    self.robot
                        .set_cube_lights(cube, pattern)
                        .await
                        .map_err(RefereeError::robot)?
                }
                Action::BackpackLights(pattern) => self
                    .robot
                    .set_backpack_lights(pattern)
                    .await
                    .map_err(RefereeError::robot)?,
                Action::Turn { degrees } => self
                    .robot
                    .turn_in_place(degrees)
                    .await
                    .map_err(RefereeError::robot)?,
                Action::Animate(trigger) => self
                    .robot
                    .play_animation(trigger)
                    .await
                    .map_err(RefereeError::robot)?,
                Action::Pause(duration) => tokio::time::sleep(duration).await,
                Action::ArmDetector => self.machine.arm(Utc::now().timestamp_millis()),
                Action::ScheduleFlip => {
                    let delay = self.timer.schedule(&mut self.rng);
                    debug!(
                        delay_secs = delay.as_secs(),
                        deadline = ?self.timer.deadline(),
                        "next light change scheduled"
                    );
                }
                Action::FlipNow => self.timer.fire_now(),
            }
        }
        Ok(())
    }
}
