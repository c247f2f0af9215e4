use crate::types::OrientationSample;
use glam::DQuat;
use std::collections::VecDeque;
use thiserror::Error;

/// Frame marker for a game-rotation report ("GROT").
const FRAME_MAGIC: [u8; 4] = [0x47, 0x52, 0x4F, 0x54];
/// Timestamp: u64 milliseconds, little endian.
const TIMESTAMP_LEN: usize = 8;
/// Quaternion: 4 x f32 little endian, ordered x, y, z, w.
const QUATERNION_LEN: usize = 16;
/// Full frame size including the marker.
pub const FRAME_LEN: usize = FRAME_MAGIC.len() + TIMESTAMP_LEN + QUATERNION_LEN;

#[derive(Debug, Error, PartialEq)]
pub enum ProtocolError {
    #[error("Rotation quaternion has zero length")]
    DegenerateQuaternion,
}

/// Streaming decoder for the sensor bridge feed.
///
/// Feed raw socket bytes via `push_data`, then drain decoded samples via `next_sample`.
pub struct SensorFeedParser {
    buffer: VecDeque<u8>,
}

impl SensorFeedParser {
    pub fn new() -> Self {
        Self {
            buffer: VecDeque::with_capacity(1024),
        }
    }

    /// Append received bytes to the internal buffer.
    pub fn push_data(&mut self, data: &[u8]) {
        self.buffer.extend(data);
    }

    /// Try to decode the next frame from the buffer.
    /// Returns `None` if no complete frame is available yet.
    pub fn next_sample(&mut self) -> Option<Result<OrientationSample, ProtocolError>> {
        let frame: [u8; FRAME_LEN] = {
            let buf = self.buffer.make_contiguous();

            let Some(start) = find_pattern(buf, &FRAME_MAGIC) else {
                // Keep a possible partial marker at the tail.
                let keep = (FRAME_MAGIC.len() - 1).min(buf.len());
                let discard = buf.len() - keep;
                self.buffer.drain(..discard);
                return None;
            };

            if start > 0 {
                tracing::trace!(skipped = start, "Discarding bytes before frame marker");
            }
            if buf.len() - start < FRAME_LEN {
                self.buffer.drain(..start);
                return None;
            }

            let mut frame = [0u8; FRAME_LEN];
            frame.copy_from_slice(&buf[start..start + FRAME_LEN]);
            self.buffer.drain(..start + FRAME_LEN);
            frame
        };

        Some(decode_frame(&frame))
    }
}

impl Default for SensorFeedParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Encode a sample frame as emitted by the sensor bridge.
pub fn encode_frame(quaternion: [f32; 4], timestamp: u64) -> [u8; FRAME_LEN] {
    let mut frame = [0u8; FRAME_LEN];
    frame[..4].copy_from_slice(&FRAME_MAGIC);
    frame[4..12].copy_from_slice(&timestamp.to_le_bytes());
    for (i, component) in quaternion.iter().enumerate() {
        let offset = 12 + i * 4;
        frame[offset..offset + 4].copy_from_slice(&component.to_le_bytes());
    }
    frame
}

fn decode_frame(frame: &[u8; FRAME_LEN]) -> Result<OrientationSample, ProtocolError> {
    let body = &frame[FRAME_MAGIC.len()..];

    let mut ts = [0u8; TIMESTAMP_LEN];
    ts.copy_from_slice(&body[..TIMESTAMP_LEN]);
    let timestamp = u64::from_le_bytes(ts);

    let f = |index: usize| -> f64 {
        let offset = TIMESTAMP_LEN + index * 4;
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&body[offset..offset + 4]);
        f32::from_le_bytes(bytes) as f64
    };

    let quaternion = DQuat::from_xyzw(f(0), f(1), f(2), f(3));
    if quaternion.length_squared() == 0.0 {
        return Err(ProtocolError::DegenerateQuaternion);
    }

    Ok(OrientationSample::from_quaternion(quaternion, timestamp))
}

/// Find the first occurrence of `pattern` in `data`.
fn find_pattern(data: &[u8], pattern: &[u8]) -> Option<usize> {
    data.windows(pattern.len())
        .position(|window| window == pattern)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yaw_frame(yaw_deg: f32, timestamp: u64) -> [u8; FRAME_LEN] {
        let q = glam::Quat::from_rotation_y(yaw_deg.to_radians());
        encode_frame([q.x, q.y, q.z, q.w], timestamp)
    }

    #[test]
    fn decode_single_frame() {
        let mut parser = SensorFeedParser::new();
        parser.push_data(&yaw_frame(30.0, 1234));

        let sample = parser.next_sample().unwrap().unwrap();
        assert_eq!(sample.timestamp, 1234);
        assert!((sample.yaw.to_degrees() - 30.0).abs() < 1e-4);
        assert!(sample.pitch.abs() < 1e-6);
        assert!(sample.roll.abs() < 1e-6);

        assert!(parser.next_sample().is_none());
    }

    #[test]
    fn decode_fragmented_frame() {
        let frame = yaw_frame(-45.0, 40);
        let mid = FRAME_LEN / 2;

        let mut parser = SensorFeedParser::new();
        parser.push_data(&frame[..mid]);
        assert!(parser.next_sample().is_none());

        parser.push_data(&frame[mid..]);
        let sample = parser.next_sample().unwrap().unwrap();
        assert!((sample.yaw.to_degrees() + 45.0).abs() < 1e-4);
    }

    #[test]
    fn skips_garbage_between_frames() {
        let mut parser = SensorFeedParser::new();
        parser.push_data(&[0xde, 0xad, 0x47, 0x52]);
        parser.push_data(&yaw_frame(10.0, 0));
        parser.push_data(&[0x00, 0xff]);
        parser.push_data(&yaw_frame(20.0, 40));

        let s1 = parser.next_sample().unwrap().unwrap();
        assert_eq!(s1.timestamp, 0);
        let s2 = parser.next_sample().unwrap().unwrap();
        assert_eq!(s2.timestamp, 40);
        assert!((s2.yaw.to_degrees() - 20.0).abs() < 1e-4);

        assert!(parser.next_sample().is_none());
    }

    #[test]
    fn marker_split_across_reads() {
        let frame = yaw_frame(5.0, 99);
        let mut parser = SensorFeedParser::new();

        parser.push_data(&[0x01, 0x02, 0x03]);
        parser.push_data(&frame[..2]);
        assert!(parser.next_sample().is_none());

        parser.push_data(&frame[2..]);
        let sample = parser.next_sample().unwrap().unwrap();
        assert_eq!(sample.timestamp, 99);
    }

    #[test]
    fn zero_quaternion_is_rejected_and_consumed() {
        let mut parser = SensorFeedParser::new();
        parser.push_data(&encode_frame([0.0; 4], 1));
        parser.push_data(&yaw_frame(0.0, 2));

        assert_eq!(
            parser.next_sample().unwrap(),
            Err(ProtocolError::DegenerateQuaternion)
        );
        let sample = parser.next_sample().unwrap().unwrap();
        assert_eq!(sample.timestamp, 2);
    }
}
