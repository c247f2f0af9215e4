pub mod controller;
pub mod stub;

pub use controller::{Interruption, SessionEvent, SpatialSession};

use spatial_config::AudioConfig;
use spatial_pose::tracker::ListenerPoseTracker;
use spatial_pose::types::ListenerPose;
use spatial_pose::PoseClient;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Audio engine failed to start: {0}")]
    EngineStart(String),
    #[error("Audio environment setup failed: {0}")]
    RendererSetup(String),
}

/// The spatial renderer whose listener orientation follows the head.
pub trait ListenerRenderer: Send {
    /// Place listener and source, pick the rendering algorithm.
    fn configure(&mut self, audio: &AudioConfig) -> Result<(), SessionError>;
    fn set_listener_orientation(&mut self, pose: ListenerPose);
}

/// Looping playback of the ambient asset.
pub trait PlaybackEngine: Send {
    fn start(&mut self) -> Result<(), SessionError>;
    fn stop(&mut self);
    fn is_running(&self) -> bool;
}

/// Anything holding the forward reference of a listener pose pipeline.
///
/// After `reset_calibration` returns, the implementor must not hand out poses
/// computed against the previous anchor. [`PoseClient`] applies the reset on
/// its tracker task later and filters out poses tracked before that.
pub trait Calibration {
    fn reset_calibration(&mut self);
}

impl Calibration for ListenerPoseTracker {
    fn reset_calibration(&mut self) {
        self.reset();
    }
}

impl Calibration for PoseClient {
    fn reset_calibration(&mut self) {
        self.reset();
    }
}
