use std::time::Duration;

use image::GrayImage;
use rlgl_common::config::{DifferenceMode, GameConfig, VisionConfig};
use rlgl_common::frame::CameraFrame;
use rlgl_common::game::{
    CubeId, LightColor, LightPattern, LightState, Outcome, PlayerSlot, Speech,
};
use tracing::{debug, info, warn};

use crate::vision::{self, preprocess, Comparison, MotionDetector, VisionError};

pub const WIN_ANIMATION: &str = "ReactToBlockPickupSuccess";

/// A robot or timer command produced by a state transition, executed in
/// order by the driver.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Speak(Speech),
    CubeLights { slot: PlayerSlot, pattern: LightPattern },
    BackpackLights(LightPattern),
    Turn { degrees: f32 },
    Animate(&'static str),
    Pause(Duration),
    /// Start comparing frames captured from now on.
    ArmDetector,
    /// Draw a random light duration and restart the timer.
    ScheduleFlip,
    /// Flip the light as soon as the current actions are done.
    FlipNow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Setup,
    Playing(LightState),
    Finished(Outcome),
}

/// Timings and vision settings fixed for the length of a game.
#[derive(Debug, Clone)]
pub struct Rules {
    pub turn_degrees: f32,
    pub penalty_pause: Duration,
    pub victory_pause: Duration,
    pub blur_sigma: f32,
    pub difference: DifferenceMode,
    pub min_density_percent: f64,
}

impl Rules {
    pub fn from_config(game: &GameConfig, vision: &VisionConfig) -> Self {
        Self {
            turn_degrees: game.turn_degrees,
            penalty_pause: Duration::from_secs(game.penalty_pause_secs),
            victory_pause: Duration::from_secs(game.victory_pause_secs),
            blur_sigma: vision.blur_sigma,
            difference: vision.difference,
            min_density_percent: vision.min_density_percent,
        }
    }
}

#[derive(Debug, Default)]
pub struct FrameReport {
    pub actions: Vec<Action>,
    /// Present when the frame was compared against a previous one.
    pub comparison: Option<Comparison>,
}

/// The referee's game state. Every input returns the actions to perform;
/// no I/O happens here.
pub struct GameMachine {
    rules: Rules,
    detector: MotionDetector,
    phase: Phase,
    players: Option<[CubeId; 2]>,
    /// Frames captured before this instant (Unix millis) are not compared.
    armed_at_ms: Option<i64>,
    previous: Option<GrayImage>,
}

impl GameMachine {
    pub fn new(rules: Rules) -> Self {
        let detector = MotionDetector::new(rules.min_density_percent);
        Self {
            rules,
            detector,
            phase: Phase::Setup,
            players: None,
            armed_at_ms: None,
            previous: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn outcome(&self) -> Option<Outcome> {
        match self.phase {
            Phase::Finished(outcome) => Some(outcome),
            _ => None,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.armed_at_ms.is_some()
    }

    pub fn cube(&self, slot: PlayerSlot) -> Option<&CubeId> {
        self.players.as_ref().map(|p| &p[slot.index()])
    }

    fn slot_of(&self, cube: &CubeId) -> Option<PlayerSlot> {
        PlayerSlot::ALL
            .into_iter()
            .find(|slot| self.cube(*slot) == Some(cube))
    }

    /// Bind the player cubes and open the game with a green light.
    pub fn start(&mut self, players: [CubeId; 2]) -> Vec<Action> {
        if self.phase != Phase::Setup {
            warn!(phase = ?self.phase, "start ignored, game already started");
            return Vec::new();
        }
        info!(first = %players[0], second = %players[1], "players bound");
        self.players = Some(players);
        self.phase = Phase::Playing(LightState::Green);

        let blue = LightPattern::solid(LightColor::Blue);
        let mut actions = all_lights(blue);
        actions.push(Action::Speak(Speech::new("1, 2, 3, green light").duration_scalar(1.0)));
        actions.extend(all_lights(LightState::Green.into()));
        actions.push(Action::ScheduleFlip);
        actions
    }

    pub fn players_not_found(&mut self) {
        self.phase = Phase::Finished(Outcome::PlayersNotFound);
    }

    pub fn cancel(&mut self) {
        if self.outcome().is_none() {
            self.phase = Phase::Finished(Outcome::Cancelled);
        }
        self.disarm();
    }

    /// Light timer fired.
    pub fn flip(&mut self) -> Vec<Action> {
        let Phase::Playing(light) = self.phase else {
            return Vec::new();
        };
        let next = light.toggled();
        self.phase = Phase::Playing(next);
        info!(light = %next, "light changed");

        let mut actions = Vec::new();
        match next {
            LightState::Green => {
                self.disarm();
                actions.push(Action::Speak(Speech::new("green light").in_parallel()));
                actions.extend(all_lights(next.into()));
                actions.push(Action::Turn {
                    degrees: self.rules.turn_degrees,
                });
            }
            LightState::Red => {
                actions.push(Action::Speak(Speech::new("red light").in_parallel()));
                actions.extend(all_lights(next.into()));
                actions.push(Action::Turn {
                    degrees: self.rules.turn_degrees,
                });
                actions.push(Action::ArmDetector);
            }
        }
        actions.push(Action::ScheduleFlip);
        actions
    }

    /// Start watching. Only honored while the light is red.
    pub fn arm(&mut self, now_ms: i64) {
        if self.phase == Phase::Playing(LightState::Red) {
            self.armed_at_ms = Some(now_ms);
            self.previous = None;
            debug!(now_ms, "motion detector armed");
        }
    }

    fn disarm(&mut self) {
        self.armed_at_ms = None;
        self.previous = None;
    }

    pub fn on_frame(
        &mut self,
        frame: &CameraFrame,
        threshold: u8,
    ) -> Result<FrameReport, VisionError> {
        let Some(armed_at_ms) = self.armed_at_ms else {
            return Ok(FrameReport::default());
        };
        if self.phase != Phase::Playing(LightState::Red) {
            return Ok(FrameReport::default());
        }
        if frame.captured_at_ms < armed_at_ms {
            debug!(seq = frame.seq, "frame captured before arming, skipping");
            return Ok(FrameReport::default());
        }

        let current = preprocess::prepare(&frame.image, self.rules.blur_sigma);
        let Some(previous) = self.previous.take() else {
            debug!(seq = frame.seq, "first frame after arming, keeping as reference");
            self.previous = Some(current);
            return Ok(FrameReport::default());
        };

        let comparison = vision::compare(
            &previous,
            &current,
            threshold,
            self.rules.difference,
            &self.detector,
        )?;
        self.previous = Some(current);

        let movement = comparison.movement;
        debug!(
            seq = frame.seq,
            threshold,
            left = format!("{:.3}", movement.left.density_percent),
            right = format!("{:.3}", movement.right.density_percent),
            "frame compared"
        );

        let actions = if movement.any() {
            self.penalty(&movement.moving_slots())
        } else {
            Vec::new()
        };
        Ok(FrameReport {
            actions,
            comparison: Some(comparison),
        })
    }

    fn penalty(&mut self, moving: &[PlayerSlot]) -> Vec<Action> {
        info!(?moving, "movement during red light");
        self.disarm();

        let mut actions: Vec<Action> = moving
            .iter()
            .map(|slot| Action::CubeLights {
                slot: *slot,
                pattern: LightPattern::flashing(LightColor::Red),
            })
            .collect();
        actions.push(Action::BackpackLights(LightPattern::OFF));
        actions.push(Action::Speak(Speech::new("go back")));
        actions.push(Action::Pause(self.rules.penalty_pause));
        actions.push(Action::FlipNow);
        actions
    }

    pub fn on_tap(&mut self, cube: &CubeId) -> Vec<Action> {
        if self.phase != Phase::Playing(LightState::Green) {
            debug!(%cube, phase = ?self.phase, "tap ignored");
            return Vec::new();
        }
        let Some(winner) = self.slot_of(cube) else {
            warn!(%cube, "tap from a cube that is not playing");
            return Vec::new();
        };

        info!(%winner, %cube, "winner");
        self.phase = Phase::Finished(Outcome::Winner(winner));
        self.disarm();

        vec![
            Action::CubeLights {
                slot: winner,
                pattern: LightPattern::flashing(LightColor::Blue),
            },
            Action::CubeLights {
                slot: winner.other(),
                pattern: LightPattern::solid(LightColor::Red),
            },
            Action::BackpackLights(LightPattern::solid(LightColor::White)),
            Action::Turn {
                degrees: self.rules.turn_degrees,
            },
            Action::Animate(WIN_ANIMATION),
            Action::Speak(Speech::new("you win").duration_scalar(1.1)),
            Action::Pause(self.rules.victory_pause),
            Action::BackpackLights(LightPattern::OFF),
            Action::CubeLights {
                slot: PlayerSlot::First,
                pattern: LightPattern::OFF,
            },
            Action::CubeLights {
                slot: PlayerSlot::Second,
                pattern: LightPattern::OFF,
            },
        ]
    }
}

/// Both cubes and the backpack set to `pattern`.
fn all_lights(pattern: LightPattern) -> Vec<Action> {
    vec![
        Action::CubeLights {
            slot: PlayerSlot::First,
            pattern,
        },
        Action::CubeLights {
            slot: PlayerSlot::Second,
            pattern,
        },
        Action::BackpackLights(pattern),
    ]
}
