use glam::{DQuat, EulerRot};
use serde::{Deserialize, Serialize};

/// Orientation reading from the head-worn sensor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrientationSample {
    /// Rotation about the vertical axis (radians).
    pub yaw: f64,
    /// Rotation about the lateral axis (radians).
    pub pitch: f64,
    /// Rotation about the longitudinal axis (radians).
    pub roll: f64,
    /// Sensor timestamp in milliseconds.
    pub timestamp: u64,
}

impl OrientationSample {
    pub fn new(yaw: f64, pitch: f64, roll: f64, timestamp: u64) -> Self {
        Self {
            yaw,
            pitch,
            roll,
            timestamp,
        }
    }

    /// Decompose a game-rotation quaternion into yaw/pitch/roll.
    ///
    /// The sensor frame is Y-up: yaw about Y, pitch about X, roll about Z.
    pub fn from_quaternion(quaternion: DQuat, timestamp: u64) -> Self {
        let (yaw, pitch, roll) = quaternion.normalize().to_euler(EulerRot::YXZ);
        Self::new(yaw, pitch, roll, timestamp)
    }
}

/// Listener orientation handed to the spatial audio renderer, in degrees.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ListenerPose {
    /// Heading relative to the calibrated forward direction, in [-180, 180].
    pub yaw: f32,
    pub pitch: f32,
    pub roll: f32,
}
