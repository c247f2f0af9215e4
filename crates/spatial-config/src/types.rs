use glam::Vec3;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Orientation sensor configuration.
    pub sensor: SensorConfig,
    /// Spatial audio environment.
    pub audio: AudioConfig,
    /// Playback session policy.
    pub session: SessionConfig,
}

impl AppConfig {
    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.sensor.sample_period_ms == 0 {
            anyhow::bail!("sensor.sample_period_ms must be greater than zero");
        }
        if self.audio.output_channels == 0 {
            anyhow::bail!("audio.output_channels must be greater than zero");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    /// `host:port` of the sensor bridge. `None` runs the simulated head sweep.
    pub bridge_addr: Option<String>,
    /// Orientation report period in milliseconds.
    pub sample_period_ms: u32,
    /// Wait between reconnection attempts after the feed drops.
    pub reconnect_delay_ms: u64,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            bridge_addr: None,
            sample_period_ms: 40,
            reconnect_delay_ms: 2000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Looping ambient asset (must be mono for point-source spatialization).
    pub asset: String,
    /// Listener position in meters. The listener starts facing -Z.
    #[serde(with = "vec3_serde")]
    pub listener_position: Vec3,
    /// Sound source position in meters.
    #[serde(with = "vec3_serde")]
    pub source_position: Vec3,
    pub rendering: RenderingAlgorithm,
    /// Preferred IO buffer duration in milliseconds.
    pub io_buffer_ms: f32,
    pub output_channels: u32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            asset: "fishermansWharf_L.mp3".to_string(),
            listener_position: Vec3::ZERO,
            source_position: Vec3::new(0.0, 0.0, -5.0),
            rendering: RenderingAlgorithm::HrtfHq,
            io_buffer_ms: 5.0,
            output_channels: 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RenderingAlgorithm {
    EqualPowerPanning,
    SphericalHead,
    /// Head-related transfer function.
    Hrtf,
    /// Higher quality HRTF, more CPU.
    HrtfHq,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Re-anchor the forward direction when the audio route changes
    /// (e.g. headphones swapped) while playing.
    pub recalibrate_on_route_change: bool,
}

// Serde helper for glam types, written as plain arrays in TOML.

mod vec3_serde {
    use glam::Vec3;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(v: &Vec3, s: S) -> Result<S::Ok, S::Error> {
        [v.x, v.y, v.z].serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec3, D::Error> {
        let [x, y, z] = <[f32; 3]>::deserialize(d)?;
        Ok(Vec3::new(x, y, z))
    }
}
