// Message types for the runtime: movement commands, profiles, status

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::motor::{MotionError, MotorMovement, RobotMotorsState};

/// Movement commands understood by the robot
///
/// The companion app sends these as single bytes, one at a time, waiting for
/// the robot to finish the previous movement before sending the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveCommand {
    Forward,
    Right,
    Left,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("unknown command byte 0x{0:02X}")]
    UnknownByte(u8),

    #[error("unknown command '{0}' (expected forward, right or left)")]
    UnknownName(String),
}

impl MoveCommand {
    pub fn as_byte(self) -> u8 {
        match self {
            MoveCommand::Forward => 0x01,
            MoveCommand::Right => 0x02,
            MoveCommand::Left => 0x03,
        }
    }
}

impl TryFrom<u8> for MoveCommand {
    type Error = CommandError;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        match byte {
            0x01 => Ok(MoveCommand::Forward),
            0x02 => Ok(MoveCommand::Right),
            0x03 => Ok(MoveCommand::Left),
            other => Err(CommandError::UnknownByte(other)),
        }
    }
}

// Accepts the command name or its byte value ("2", "0x02")
impl FromStr for MoveCommand {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s.to_ascii_lowercase().as_str() {
            "forward" | "f" => return Ok(MoveCommand::Forward),
            "right" | "r" => return Ok(MoveCommand::Right),
            "left" | "l" => return Ok(MoveCommand::Left),
            _ => {}
        }

        let byte = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            Some(hex) => u8::from_str_radix(hex, 16),
            None => s.parse::<u8>(),
        };
        match byte {
            Ok(byte) => MoveCommand::try_from(byte),
            Err(_) => Err(CommandError::UnknownName(s.to_string())),
        }
    }
}

impl fmt::Display for MoveCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MoveCommand::Forward => "forward",
            MoveCommand::Right => "right",
            MoveCommand::Left => "left",
        };
        f.write_str(name)
    }
}

/// Parameters for one two-wheel movement
///
/// Timing and tick thresholds are shared by both wheels, throttles are per side.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MovementProfile {
    pub ramp_up_time_ms: u64,
    pub left_throttle: f32,
    pub right_throttle: f32,
    pub ramp_down_count: u32,
    pub count_goal: u32,
    pub left_end_throttle: f32,
    pub right_end_throttle: f32,
}

impl MovementProfile {
    /// Check the profile against the ramp preconditions
    pub fn validate(&self) -> Result<(), MotionError> {
        MotorMovement::new(
            0,
            self.ramp_up_time_ms,
            self.left_throttle,
            self.ramp_down_count,
            self.count_goal,
            self.left_end_throttle,
        )
        .map(|_| ())
    }
}

/// Profile used for each movement command
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementPresets {
    pub forward: MovementProfile,
    pub right: MovementProfile,
    pub left: MovementProfile,
}

impl MovementPresets {
    pub fn profile(&self, command: MoveCommand) -> &MovementProfile {
        match command {
            MoveCommand::Forward => &self.forward,
            MoveCommand::Right => &self.right,
            MoveCommand::Left => &self.left,
        }
    }
}

impl Default for MovementPresets {
    fn default() -> Self {
        // Turns spin the wheels in opposite directions on the spot
        let turn = |left: f32, right: f32| MovementProfile {
            ramp_up_time_ms: 200,
            left_throttle: left,
            right_throttle: right,
            ramp_down_count: 180,
            count_goal: 260,
            left_end_throttle: left / 2.0,
            right_end_throttle: right / 2.0,
        };

        Self {
            forward: MovementProfile {
                ramp_up_time_ms: 300,
                left_throttle: 0.8,
                right_throttle: 0.8,
                ramp_down_count: 600,
                count_goal: 800,
                left_end_throttle: 0.3,
                right_end_throttle: 0.3,
            },
            right: turn(0.6, -0.6),
            left: turn(-0.6, 0.6),
        }
    }
}

/// Snapshot published by the runtime each tick
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RobotStatus {
    pub time_ms: u64,
    pub state: RobotMotorsState,
    pub command: Option<MoveCommand>,
    pub left_count: u32,
    pub right_count: u32,
    pub left_throttle_factor: f32,
    pub right_throttle_factor: f32,
    pub remaining: usize,
    pub movements_completed: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_bytes() {
        assert_eq!(MoveCommand::try_from(0x01), Ok(MoveCommand::Forward));
        assert_eq!(MoveCommand::try_from(0x02), Ok(MoveCommand::Right));
        assert_eq!(MoveCommand::try_from(0x03), Ok(MoveCommand::Left));
        assert_eq!(
            MoveCommand::try_from(0x04),
            Err(CommandError::UnknownByte(0x04))
        );

        for cmd in [MoveCommand::Forward, MoveCommand::Right, MoveCommand::Left] {
            assert_eq!(MoveCommand::try_from(cmd.as_byte()), Ok(cmd));
        }
    }

    #[test]
    fn test_command_parsing() {
        assert_eq!("forward".parse(), Ok(MoveCommand::Forward));
        assert_eq!(" Left ".parse(), Ok(MoveCommand::Left));
        assert_eq!("r".parse(), Ok(MoveCommand::Right));
        assert_eq!("0x03".parse(), Ok(MoveCommand::Left));
        assert_eq!("1".parse(), Ok(MoveCommand::Forward));
        assert_eq!(
            "9".parse::<MoveCommand>(),
            Err(CommandError::UnknownByte(9))
        );
        assert!(matches!(
            "backward".parse::<MoveCommand>(),
            Err(CommandError::UnknownName(_))
        ));
    }

    #[test]
    fn test_default_presets_are_valid() {
        let presets = MovementPresets::default();
        for cmd in [MoveCommand::Forward, MoveCommand::Right, MoveCommand::Left] {
            assert!(presets.profile(cmd).validate().is_ok(), "{} preset", cmd);
        }
        // Turns drive the wheels against each other
        let right = presets.profile(MoveCommand::Right);
        assert!(right.left_throttle > 0.0 && right.right_throttle < 0.0);
    }

    #[test]
    fn test_status_serializes_snake_case_state() {
        let status = RobotStatus {
            time_ms: 10,
            state: RobotMotorsState::PauseAtEndOfMovement,
            command: Some(MoveCommand::Forward),
            left_count: 1,
            right_count: 2,
            left_throttle_factor: 1.0,
            right_throttle_factor: 0.5,
            remaining: 0,
            movements_completed: 3,
        };
        let json = serde_json::to_string(&status).unwrap();
        assert!(json.contains("\"state\":\"pause_at_end_of_movement\""));
        assert!(json.contains("\"command\":\"forward\""));
    }
}
