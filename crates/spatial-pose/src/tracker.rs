use crate::types::{ListenerPose, OrientationSample};

/// Beyond this magnitude the yaw is reduced with `%` (in f64) before the
/// wrap loop, so the loop runs at most once for any finite input.
const WRAP_REDUCE_THRESHOLD: f64 = 720.0;

/// Converts orientation samples into a renderer-ready listener pose.
///
/// The first sample after a reset becomes the forward reference: its yaw is
/// stored as the calibration offset and every later yaw is reported relative
/// to it. Pitch and roll pass through without an offset.
#[derive(Debug, Default)]
pub struct ListenerPoseTracker {
    /// Yaw (degrees) captured from the first sample of the session.
    yaw_offset: Option<f64>,
}

impl ListenerPoseTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget the forward reference. The next sample re-anchors yaw to 0.
    pub fn reset(&mut self) {
        if self.yaw_offset.take().is_some() {
            tracing::info!("Listener calibration cleared");
        }
    }

    /// Process one sample and return the listener pose.
    pub fn update(&mut self, sample: &OrientationSample) -> ListenerPose {
        let yaw = sample.yaw.to_degrees();

        let offset = *self.yaw_offset.get_or_insert_with(|| {
            tracing::info!(offset_deg = yaw, "Listener forward direction captured");
            yaw
        });

        ListenerPose {
            yaw: wrap_degrees(yaw - offset),
            pitch: sample.pitch.to_degrees() as f32,
            roll: sample.roll.to_degrees() as f32,
        }
    }

    /// Calibration offset in degrees, if the session has been anchored.
    pub fn yaw_offset(&self) -> Option<f64> {
        self.yaw_offset
    }

    pub fn is_calibrated(&self) -> bool {
        self.yaw_offset.is_some()
    }
}

/// Narrow to f32, then bring the angle back into [-180, 180].
/// Non-finite values pass through.
fn wrap_degrees(degrees: f64) -> f32 {
    if !degrees.is_finite() {
        return degrees as f32;
    }

    let mut wrapped = if degrees.abs() > WRAP_REDUCE_THRESHOLD {
        (degrees % 360.0) as f32
    } else {
        degrees as f32
    };

    while wrapped < -180.0 {
        wrapped += 360.0;
    }
    while wrapped > 180.0 {
        wrapped -= 360.0;
    }
    wrapped
}
