use crate::{ListenerRenderer, PlaybackEngine, SessionError};
use spatial_config::AudioConfig;
use spatial_pose::types::ListenerPose;
use tracing::{debug, info};

/// Renderer that records and logs listener orientation.
///
/// Stands in for a platform HRTF renderer. Real output would hand the pose to
/// the environment node's listener orientation setter.
#[derive(Debug, Default)]
pub struct LoggingRenderer {
    audio: Option<AudioConfig>,
    listener: ListenerPose,
    updates: u64,
}

impl LoggingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn listener(&self) -> ListenerPose {
        self.listener
    }

    pub fn audio(&self) -> Option<&AudioConfig> {
        self.audio.as_ref()
    }
}

impl ListenerRenderer for LoggingRenderer {
    fn configure(&mut self, audio: &AudioConfig) -> Result<(), SessionError> {
        if audio.output_channels == 0 {
            return Err(SessionError::RendererSetup(
                "output format needs at least one channel".to_string(),
            ));
        }

        info!(
            asset = %audio.asset,
            rendering = ?audio.rendering,
            source = ?audio.source_position,
            channels = audio.output_channels,
            "Audio environment configured (stub)"
        );
        self.audio = Some(audio.clone());
        self.listener = ListenerPose::default();
        Ok(())
    }

    fn set_listener_orientation(&mut self, pose: ListenerPose) {
        self.listener = pose;
        self.updates += 1;
        if self.updates % 250 == 0 {
            debug!(
                yaw = pose.yaw,
                pitch = pose.pitch,
                roll = pose.roll,
                "Listener orientation"
            );
        }
    }
}

/// Engine that only tracks its running state.
#[derive(Debug, Default)]
pub struct SilentEngine {
    running: bool,
}

impl SilentEngine {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PlaybackEngine for SilentEngine {
    fn start(&mut self) -> Result<(), SessionError> {
        self.running = true;
        info!("Playback engine started (stub)");
        Ok(())
    }

    fn stop(&mut self) {
        self.running = false;
        info!("Playback engine stopped (stub)");
    }

    fn is_running(&self) -> bool {
        self.running
    }
}
