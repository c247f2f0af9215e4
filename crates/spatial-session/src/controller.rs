use crate::{Calibration, ListenerRenderer, PlaybackEngine, SessionError};
use spatial_config::{AudioConfig, SessionConfig};
use spatial_pose::types::ListenerPose;
use tracing::{info, warn};

/// Audio session interruption (phone call, another app taking audio).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interruption {
    Began,
    Ended { should_resume: bool },
}

/// Events the host delivers to the session, in order, from one queue.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SessionEvent {
    Interruption(Interruption),
    RouteChanged,
    MediaServicesReset,
    DeviceConnected,
    DeviceDisconnected,
    Pose(ListenerPose),
}

/// Playback session for head-tracked ambient audio.
///
/// Owns the renderer, the playback engine, and the calibration handle. Every
/// transition into playback clears the forward reference, and so does every
/// stop, so a new session always re-anchors on its first orientation sample.
pub struct SpatialSession<R, E, C> {
    renderer: R,
    engine: E,
    calibration: C,
    audio: AudioConfig,
    policy: SessionConfig,
    playing: bool,
    controls_enabled: bool,
    status: String,
}

impl<R, E, C> SpatialSession<R, E, C>
where
    R: ListenerRenderer,
    E: PlaybackEngine,
    C: Calibration,
{
    pub fn new(
        mut renderer: R,
        engine: E,
        calibration: C,
        audio: AudioConfig,
        policy: SessionConfig,
    ) -> Result<Self, SessionError> {
        renderer.configure(&audio)?;
        renderer.set_listener_orientation(ListenerPose::default());

        Ok(Self {
            renderer,
            engine,
            calibration,
            audio,
            policy,
            playing: false,
            controls_enabled: false,
            status: "Please connect your device".to_string(),
        })
    }

    /// Start playback. Engine failures are reported in the status text.
    pub fn start(&mut self) -> Result<(), SessionError> {
        self.calibration.reset_calibration();

        if let Err(e) = self.engine.start() {
            warn!(?e, "Playback failed to start");
            self.playing = false;
            self.status = e.to_string();
            return Err(e);
        }

        self.playing = true;
        info!("Playback started");
        Ok(())
    }

    pub fn stop(&mut self) {
        if self.engine.is_running() || self.playing {
            self.engine.stop();
            info!("Playback stopped");
        }
        self.playing = false;
        self.calibration.reset_calibration();
        self.status.clear();
    }

    /// Start/stop button.
    pub fn toggle(&mut self) -> Result<(), SessionError> {
        if self.playing {
            self.stop();
            Ok(())
        } else {
            self.start()
        }
    }

    pub fn handle(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Interruption(Interruption::Began) => {
                self.stop();
                self.status = "Audio playback interrupted".to_string();
            }
            SessionEvent::Interruption(Interruption::Ended { should_resume: true }) => {
                if self.start().is_ok() {
                    self.status = "Audio playback resumed".to_string();
                }
            }
            SessionEvent::Interruption(Interruption::Ended {
                should_resume: false,
            }) => {
                self.stop();
                self.status = "Audio playback stopped".to_string();
            }
            SessionEvent::RouteChanged => {
                if self.policy.recalibrate_on_route_change && self.playing {
                    info!("Route changed, re-anchoring listener");
                    self.calibration.reset_calibration();
                }
                self.status = "Audio route changed".to_string();
            }
            SessionEvent::MediaServicesReset => {
                if let Err(e) = self.renderer.configure(&self.audio) {
                    warn!(?e, "Audio environment setup failed after media reset");
                }
                self.stop();
                self.status = "Media services have been reset".to_string();
            }
            SessionEvent::DeviceConnected => {
                self.controls_enabled = true;
                self.status = "Connected to device".to_string();
            }
            SessionEvent::DeviceDisconnected => {
                self.stop();
                self.controls_enabled = false;
                self.status = "Lost connection to the device".to_string();
            }
            SessionEvent::Pose(pose) => {
                self.renderer.set_listener_orientation(pose);
                if self.playing {
                    self.status = format!("{:.1}˚", pose.yaw);
                }
            }
        }
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Whether the start/stop control should accept input.
    pub fn controls_enabled(&self) -> bool {
        self.controls_enabled
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn calibration_mut(&mut self) -> &mut C {
        &mut self.calibration
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stub::{LoggingRenderer, SilentEngine};
    use spatial_pose::tracker::ListenerPoseTracker;
    use spatial_pose::types::OrientationSample;

    #[derive(Default)]
    struct CountingCalibration {
        resets: usize,
    }

    impl Calibration for CountingCalibration {
        fn reset_calibration(&mut self) {
            self.resets += 1;
        }
    }

    struct BrokenEngine;

    impl PlaybackEngine for BrokenEngine {
        fn start(&mut self) -> Result<(), SessionError> {
            Err(SessionError::EngineStart("no output device".to_string()))
        }

        fn stop(&mut self) {}

        fn is_running(&self) -> bool {
            false
        }
    }

    fn session<C: Calibration>(
        calibration: C,
        policy: SessionConfig,
    ) -> SpatialSession<LoggingRenderer, SilentEngine, C> {
        SpatialSession::new(
            LoggingRenderer::new(),
            SilentEngine::new(),
            calibration,
            AudioConfig::default(),
            policy,
        )
        .unwrap()
    }

    fn pose(yaw: f32) -> ListenerPose {
        ListenerPose {
            yaw,
            pitch: 0.0,
            roll: 0.0,
        }
    }

    #[test]
    fn new_session_waits_for_device() {
        let s = session(CountingCalibration::default(), SessionConfig::default());
        assert_eq!(s.status(), "Please connect your device");
        assert!(!s.controls_enabled());
        assert!(!s.is_playing());
        assert!(s.renderer().audio().is_some());
        assert_eq!(s.renderer().listener(), ListenerPose::default());
    }

    #[test]
    fn start_and_stop_clear_calibration() {
        let mut s = session(CountingCalibration::default(), SessionConfig::default());
        s.handle(SessionEvent::DeviceConnected);
        assert!(s.controls_enabled());
        assert_eq!(s.status(), "Connected to device");

        s.toggle().unwrap();
        assert!(s.is_playing());
        assert_eq!(s.calibration_mut().resets, 1);

        s.toggle().unwrap();
        assert!(!s.is_playing());
        assert_eq!(s.calibration_mut().resets, 2);
        assert_eq!(s.status(), "");
    }

    #[test]
    fn pose_updates_renderer_and_status_while_playing() {
        let mut s = session(CountingCalibration::default(), SessionConfig::default());

        s.handle(SessionEvent::Pose(pose(12.34)));
        assert_eq!(s.renderer().listener().yaw, 12.34);
        assert_eq!(s.status(), "Please connect your device");

        s.start().unwrap();
        s.handle(SessionEvent::Pose(pose(-7.3)));
        assert_eq!(s.renderer().listener().yaw, -7.3);
        assert_eq!(s.status(), "-7.3˚");
    }

    #[test]
    fn interruption_stops_and_resumes() {
        let mut s = session(CountingCalibration::default(), SessionConfig::default());
        s.start().unwrap();

        s.handle(SessionEvent::Interruption(Interruption::Began));
        assert!(!s.is_playing());
        assert_eq!(s.status(), "Audio playback interrupted");

        s.handle(SessionEvent::Interruption(Interruption::Ended {
            should_resume: true,
        }));
        assert!(s.is_playing());
        assert_eq!(s.status(), "Audio playback resumed");

        s.handle(SessionEvent::Interruption(Interruption::Ended {
            should_resume: false,
        }));
        assert!(!s.is_playing());
        assert_eq!(s.status(), "Audio playback stopped");
    }

    #[test]
    fn route_change_recalibrates_only_when_enabled() {
        let mut s = session(CountingCalibration::default(), SessionConfig::default());
        s.start().unwrap();
        s.handle(SessionEvent::RouteChanged);
        assert_eq!(s.calibration_mut().resets, 1);
        assert_eq!(s.status(), "Audio route changed");
        assert!(s.is_playing());

        let policy = SessionConfig {
            recalibrate_on_route_change: true,
        };
        let mut s = session(CountingCalibration::default(), policy);
        s.handle(SessionEvent::RouteChanged);
        assert_eq!(s.calibration_mut().resets, 0);

        s.start().unwrap();
        s.handle(SessionEvent::RouteChanged);
        assert_eq!(s.calibration_mut().resets, 2);
    }

    #[test]
    fn disconnect_stops_and_disables_controls() {
        let mut s = session(CountingCalibration::default(), SessionConfig::default());
        s.handle(SessionEvent::DeviceConnected);
        s.start().unwrap();

        s.handle(SessionEvent::DeviceDisconnected);
        assert!(!s.is_playing());
        assert!(!s.controls_enabled());
        assert_eq!(s.status(), "Lost connection to the device");
    }

    #[test]
    fn media_reset_reconfigures_and_stops() {
        let mut s = session(CountingCalibration::default(), SessionConfig::default());
        s.start().unwrap();
        s.handle(SessionEvent::Pose(pose(30.0)));

        s.handle(SessionEvent::MediaServicesReset);
        assert!(!s.is_playing());
        assert_eq!(s.renderer().listener(), ListenerPose::default());
        assert_eq!(s.status(), "Media services have been reset");
    }

    #[test]
    fn renderer_setup_failure_is_returned_from_new() {
        let audio = AudioConfig {
            output_channels: 0,
            ..AudioConfig::default()
        };
        let result = SpatialSession::new(
            LoggingRenderer::new(),
            SilentEngine::new(),
            CountingCalibration::default(),
            audio,
            SessionConfig::default(),
        );
        assert!(matches!(result, Err(SessionError::RendererSetup(_))));
    }

    #[test]
    fn engine_failure_is_reported_in_status() {
        let mut s = SpatialSession::new(
            LoggingRenderer::new(),
            BrokenEngine,
            CountingCalibration::default(),
            AudioConfig::default(),
            SessionConfig::default(),
        )
        .unwrap();

        assert!(s.start().is_err());
        assert!(!s.is_playing());
        assert_eq!(s.status(), "Audio engine failed to start: no output device");

        s.handle(SessionEvent::Interruption(Interruption::Ended {
            should_resume: true,
        }));
        assert!(!s.is_playing());
        assert_eq!(s.status(), "Audio engine failed to start: no output device");
    }

    #[test]
    fn restart_reanchors_inline_tracker() {
        let mut s = session(ListenerPoseTracker::new(), SessionConfig::default());
        s.start().unwrap();

        let first = s
            .calibration_mut()
            .update(&OrientationSample::new(0.5, 0.0, 0.0, 0));
        assert_eq!(first.yaw, 0.0);
        s.handle(SessionEvent::Pose(first));

        s.stop();
        assert!(!s.calibration_mut().is_calibrated());

        s.start().unwrap();
        let again = s
            .calibration_mut()
            .update(&OrientationSample::new(-1.5, 0.0, 0.0, 40));
        assert_eq!(again.yaw, 0.0);
    }
}
