// Loop rate, timing, pin map and motor tuning
//
// The constants are the defaults; any of them can be overridden from a JSON
// file passed with `--config`. Missing keys keep their default.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::messages::{MoveCommand, MovementPresets};
use crate::motor::{BalanceMode, MotionError};
use crate::sim::SimConfig;

// Runtime loop frequency
pub const LOOP_HZ: u64 = 50;

// Pause after both wheels reach the goal, before reporting completion
pub const PAUSE_TIME_MS: u64 = 500;

// Speed balancing sample window
pub const SPEED_SAMPLE_PERIOD_MS: u64 = 100;

// Smallest nonzero throttle that still turns the wheels
pub const MIN_THROTTLE: f32 = 0.25;

// Calibration factor change per balancing sample
pub const BALANCE_STEP: f32 = 0.01;

// Run button
pub const BUTTON_PIN: u8 = 4;
pub const DEBOUNCE_PERIOD_MS: u64 = 200;

// Motor driver pins (Crickit motor ports A and B)
pub const LEFT_MOTOR_PINS: [u8; 2] = [22, 23];
pub const RIGHT_MOTOR_PINS: [u8; 2] = [19, 18];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("invalid '{command}' preset: {source}")]
    Preset {
        command: MoveCommand,
        source: MotionError,
    },
}

/// Tuning for the two drive motors and the balancer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotorsConfig {
    pub min_throttle: f32,
    pub pause_time_ms: u64,
    pub speed_sample_period_ms: u64,
    pub balance_step: f32,
    pub balance_mode: BalanceMode,
    /// Tick-to-distance scale for each wheel's encoder
    pub left_encoder_factor: f32,
    pub right_encoder_factor: f32,
}

impl Default for MotorsConfig {
    fn default() -> Self {
        Self {
            min_throttle: MIN_THROTTLE,
            pause_time_ms: PAUSE_TIME_MS,
            speed_sample_period_ms: SPEED_SAMPLE_PERIOD_MS,
            balance_step: BALANCE_STEP,
            balance_mode: BalanceMode::default(),
            left_encoder_factor: 1.0,
            right_encoder_factor: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ButtonConfig {
    pub pin: u8,
    pub debounce_period_ms: u64,
}

impl Default for ButtonConfig {
    fn default() -> Self {
        Self {
            pin: BUTTON_PIN,
            debounce_period_ms: DEBOUNCE_PERIOD_MS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RobotConfig {
    pub loop_hz: u64,
    pub motors: MotorsConfig,
    pub button: ButtonConfig,
    pub left_pins: [u8; 2],
    pub right_pins: [u8; 2],
    pub presets: MovementPresets,
    pub sim: SimConfig,
}

impl Default for RobotConfig {
    fn default() -> Self {
        Self {
            loop_hz: LOOP_HZ,
            motors: MotorsConfig::default(),
            button: ButtonConfig::default(),
            left_pins: LEFT_MOTOR_PINS,
            right_pins: RIGHT_MOTOR_PINS,
            presets: MovementPresets::default(),
            sim: SimConfig::default(),
        }
    }
}

impl RobotConfig {
    /// Read and validate a JSON config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!("Loading config from {}", path.display());
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.loop_hz == 0 || self.loop_hz > 1000 {
            return Err(ConfigError::Invalid(format!(
                "loop_hz must be in 1..=1000, got {}",
                self.loop_hz
            )));
        }

        let motors = &self.motors;
        if !(0.0..=1.0).contains(&motors.min_throttle) {
            return Err(ConfigError::Invalid(format!(
                "min_throttle must be within [0, 1], got {}",
                motors.min_throttle
            )));
        }
        if motors.left_encoder_factor <= 0.0 || motors.right_encoder_factor <= 0.0 {
            return Err(ConfigError::Invalid(
                "encoder factors must be positive".to_string(),
            ));
        }
        if motors.balance_step < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "balance_step must not be negative, got {}",
                motors.balance_step
            )));
        }
        if self.left_pins.iter().any(|pin| self.right_pins.contains(pin)) {
            return Err(ConfigError::Invalid(
                "left and right motors share a pin".to_string(),
            ));
        }

        for command in [MoveCommand::Forward, MoveCommand::Right, MoveCommand::Left] {
            self.presets
                .profile(command)
                .validate()
                .map_err(|source| ConfigError::Preset { command, source })?;
        }

        Ok(())
    }
}
