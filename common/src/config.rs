use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub robot: RobotConfig,
    #[serde(default)]
    pub game: GameConfig,
    #[serde(default)]
    pub vision: VisionConfig,
    #[serde(default)]
    pub control: ControlConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RobotConfig {
    /// Base URL of the robot's HTTP bridge, e.g. `http://cozmo.local:8080`.
    pub base_url: String,
    #[serde(default = "default_discovery_timeout")]
    pub discovery_timeout_secs: u64,
    #[serde(default = "default_cube_poll_ms")]
    pub cube_poll_ms: u64,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_volume")]
    pub volume: f32,
    /// Capacity of the camera/tap event queue between the bridge and the game loop.
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GameConfig {
    /// Each light phase lasts a whole number of seconds drawn from
    /// `[min_light_secs, max_light_secs)`.
    #[serde(default = "default_min_light")]
    pub min_light_secs: u64,
    #[serde(default = "default_max_light")]
    pub max_light_secs: u64,
    #[serde(default = "default_turn_degrees")]
    pub turn_degrees: f32,
    #[serde(default = "default_penalty_pause")]
    pub penalty_pause_secs: u64,
    #[serde(default = "default_victory_pause")]
    pub victory_pause_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VisionConfig {
    /// Initial binarization threshold. The control panel can change it live.
    #[serde(default = "default_threshold")]
    pub threshold: u8,
    /// Gaussian blur sigma applied after grayscale conversion. 0 disables blurring.
    #[serde(default = "default_blur_sigma")]
    pub blur_sigma: f32,
    #[serde(default)]
    pub difference: DifferenceMode,
    /// A half counts as moving when its on-pixel density (percent) is above this.
    #[serde(default)]
    pub min_density_percent: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DifferenceMode {
    /// `|current - previous|`
    #[default]
    Absolute,
    /// `max(current - previous, 0)`: only pixels that got brighter.
    Saturating,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ControlConfig {
    #[serde(default = "default_control_enabled")]
    pub enabled: bool,
    #[serde(default = "default_control_bind")]
    pub bind: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            min_light_secs: default_min_light(),
            max_light_secs: default_max_light(),
            turn_degrees: default_turn_degrees(),
            penalty_pause_secs: default_penalty_pause(),
            victory_pause_secs: default_victory_pause(),
        }
    }
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            blur_sigma: default_blur_sigma(),
            difference: DifferenceMode::default(),
            min_density_percent: 0.0,
        }
    }
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            enabled: default_control_enabled(),
            bind: default_control_bind(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadFile(path.display().to_string(), e))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.robot.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid("robot.base_url must not be empty".into()));
        }
        if self.robot.event_buffer == 0 {
            return Err(ConfigError::Invalid("robot.event_buffer must be at least 1".into()));
        }
        if self.game.min_light_secs >= self.game.max_light_secs {
            return Err(ConfigError::Invalid(format!(
                "game.min_light_secs ({}) must be below game.max_light_secs ({})",
                self.game.min_light_secs, self.game.max_light_secs
            )));
        }
        if !self.vision.blur_sigma.is_finite() || self.vision.blur_sigma < 0.0 {
            return Err(ConfigError::Invalid(
                "vision.blur_sigma must be a non-negative number".into(),
            ));
        }
        if !(0.0..100.0).contains(&self.vision.min_density_percent) {
            return Err(ConfigError::Invalid(
                "vision.min_density_percent must be in [0, 100)".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {0}: {1}")]
    ReadFile(String, std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(String),
    #[error("invalid config: {0}")]
    Invalid(String),
}

// Default value functions
fn default_discovery_timeout() -> u64 {
    60
}
fn default_cube_poll_ms() -> u64 {
    500
}
fn default_request_timeout() -> u64 {
    30
}
fn default_volume() -> f32 {
    1.0
}
fn default_event_buffer() -> usize {
    8
}
fn default_min_light() -> u64 {
    1
}
fn default_max_light() -> u64 {
    5
}
fn default_turn_degrees() -> f32 {
    180.0
}
fn default_penalty_pause() -> u64 {
    2
}
fn default_victory_pause() -> u64 {
    2
}
fn default_threshold() -> u8 {
    100
}
fn default_blur_sigma() -> f32 {
    1.1
}
fn default_control_enabled() -> bool {
    true
}
fn default_control_bind() -> String {
    "127.0.0.1:8090".into()
}
fn default_log_level() -> String {
    "info".into()
}
