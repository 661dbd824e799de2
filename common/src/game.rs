//! Vocabulary shared by the game loop and the robot bridge.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a physical light cube as reported by the robot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CubeId(pub String);

impl CubeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CubeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One of the two players. `First` stands in the left half of the camera
/// image, `Second` in the right half.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlayerSlot {
    First,
    Second,
}

impl PlayerSlot {
    pub const ALL: [PlayerSlot; 2] = [PlayerSlot::First, PlayerSlot::Second];

    pub fn index(self) -> usize {
        match self {
            PlayerSlot::First => 0,
            PlayerSlot::Second => 1,
        }
    }

    pub fn other(self) -> PlayerSlot {
        match self {
            PlayerSlot::First => PlayerSlot::Second,
            PlayerSlot::Second => PlayerSlot::First,
        }
    }
}

impl fmt::Display for PlayerSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "player {}", self.index() + 1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightState {
    Green,
    Red,
}

impl LightState {
    pub fn toggled(self) -> LightState {
        match self {
            LightState::Green => LightState::Red,
            LightState::Red => LightState::Green,
        }
    }
}

impl fmt::Display for LightState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LightState::Green => f.write_str("green"),
            LightState::Red => f.write_str("red"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LightColor {
    Off,
    Blue,
    Green,
    Red,
    White,
}

/// A cube or backpack light setting, serialized as `{"color": "red", "flash": true}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LightPattern {
    pub color: LightColor,
    pub flash: bool,
}

impl LightPattern {
    pub const OFF: LightPattern = LightPattern::solid(LightColor::Off);

    pub const fn solid(color: LightColor) -> Self {
        Self {
            color,
            flash: false,
        }
    }

    pub const fn flashing(color: LightColor) -> Self {
        Self { color, flash: true }
    }
}

impl From<LightState> for LightPattern {
    fn from(light: LightState) -> Self {
        match light {
            LightState::Green => LightPattern::solid(LightColor::Green),
            LightState::Red => LightPattern::solid(LightColor::Red),
        }
    }
}

/// A text-to-speech request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Speech {
    pub text: String,
    pub duration_scalar: f32,
    pub voice_pitch: f32,
    /// Block until the robot finished speaking.
    pub wait: bool,
}

impl Speech {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            duration_scalar: 1.2,
            voice_pitch: 0.0,
            wait: true,
        }
    }

    pub fn duration_scalar(mut self, scalar: f32) -> Self {
        self.duration_scalar = scalar;
        self
    }

    /// Speak while the next actions run.
    pub fn in_parallel(mut self) -> Self {
        self.wait = false;
        self
    }
}

/// How a game ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Winner(PlayerSlot),
    /// The two player cubes were not seen within the discovery window.
    PlayersNotFound,
    /// Termination was requested from the console or the control panel.
    Cancelled,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slots_are_ordered_and_paired() {
        assert_eq!(PlayerSlot::First.index(), 0);
        assert_eq!(PlayerSlot::Second.index(), 1);
        assert_eq!(PlayerSlot::First.other(), PlayerSlot::Second);
        assert_eq!(PlayerSlot::Second.to_string(), "player 2");
    }

    #[test]
    fn light_toggles() {
        assert_eq!(LightState::Green.toggled(), LightState::Red);
        assert_eq!(LightState::Red.toggled().toggled(), LightState::Red);
    }

    #[test]
    fn light_pattern_wire_format() {
        let fields = wire_fields(&LightPattern::flashing(LightColor::Red));
        assert_eq!(fields, "color=red flash=true");
    }

    fn wire_fields(pattern: &LightPattern) -> String {
        let value = toml::Value::try_from(pattern).unwrap();
        let table = value.as_table().unwrap();
        format!(
            "color={} flash={}",
            table["color"].as_str().unwrap(),
            table["flash"].as_bool().unwrap()
        )
    }

    #[test]
    fn speech_defaults_wait() {
        let speech = Speech::new("go back");
        assert!(speech.wait);
        assert_eq!(speech.duration_scalar, 1.2);
        assert!(!Speech::new("red light").in_parallel().wait);
    }
}
