pub mod protocol;
pub mod tracker;
pub mod types;

use anyhow::Result;
use protocol::SensorFeedParser;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio::sync::{mpsc, watch};
use tracker::ListenerPoseTracker;
use types::{ListenerPose, OrientationSample};

/// Shortest report period the simulated feed will run at.
const MIN_SIMULATED_PERIOD: Duration = Duration::from_millis(1);

/// Commands sent to the pose processing task.
enum PoseCommand {
    /// Clear the forward reference and stamp later poses with this generation.
    Reset(u64),
}

/// A pose tagged with the reset generation it was computed under.
type StampedPose = (u64, ListenerPose);

/// Client for the head-orientation sensor feed.
///
/// Reads orientation samples, runs them through a [`ListenerPoseTracker`] on a
/// single task, and publishes the latest listener pose.
///
/// Resets travel to the task over a channel. Every reset bumps a generation
/// counter, and `changed()` skips poses computed before the task applied the
/// latest reset, so callers never see a pose relative to a stale anchor.
pub struct PoseClient {
    pose_rx: watch::Receiver<StampedPose>,
    command_tx: mpsc::UnboundedSender<PoseCommand>,
    generation: u64,
    task: tokio::task::JoinHandle<()>,
}

impl PoseClient {
    /// Connect to a sensor bridge and start processing its feed.
    pub async fn connect(addr: impl ToSocketAddrs + std::fmt::Display) -> Result<Self> {
        tracing::info!(%addr, "Connecting to sensor bridge");
        let stream = TcpStream::connect(&addr).await?;
        tracing::info!("Connected to sensor bridge");

        Ok(Self::spawn(move |pose_tx, command_rx| {
            sensor_read_loop(stream, pose_tx, command_rx)
        }))
    }

    /// Synthetic head sweep for development without a sensor connected.
    ///
    /// A period below 1 ms is raised to 1 ms.
    pub fn simulated(period: Duration) -> Self {
        let period = if period < MIN_SIMULATED_PERIOD {
            tracing::warn!(?period, "Simulated report period too short, using 1 ms");
            MIN_SIMULATED_PERIOD
        } else {
            period
        };
        Self::spawn(move |pose_tx, command_rx| simulated_loop(period, pose_tx, command_rx))
    }

    fn spawn<F, Fut>(run: F) -> Self
    where
        F: FnOnce(watch::Sender<StampedPose>, mpsc::UnboundedReceiver<PoseCommand>) -> Fut,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        let (pose_tx, pose_rx) = watch::channel((0, ListenerPose::default()));
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run(pose_tx, command_rx));
        Self {
            pose_rx,
            command_tx,
            generation: 0,
            task,
        }
    }

    /// Latest listener pose (non-blocking). Facing forward until the first
    /// sample after the latest reset has been tracked.
    pub fn pose(&self) -> ListenerPose {
        let (generation, pose) = *self.pose_rx.borrow();
        if generation == self.generation {
            pose
        } else {
            ListenerPose::default()
        }
    }

    /// Wait for the next pose computed after the latest reset.
    /// Fails once the feed has ended.
    pub async fn changed(&mut self) -> Result<ListenerPose> {
        loop {
            self.pose_rx.changed().await?;
            let (generation, pose) = *self.pose_rx.borrow_and_update();
            if generation == self.generation {
                return Ok(pose);
            }
            tracing::trace!(generation, "Dropping pose from before reset");
        }
    }

    /// Drop the forward reference; the next sample re-anchors yaw to 0.
    pub fn reset(&mut self) {
        self.generation += 1;
        let _ = self.command_tx.send(PoseCommand::Reset(self.generation));
    }
}

impl Drop for PoseClient {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Apply a command to the tracker. Runs on the same task as `update`.
fn apply_command(tracker: &mut ListenerPoseTracker, generation: &mut u64, command: PoseCommand) {
    match command {
        PoseCommand::Reset(next) => {
            tracker.reset();
            *generation = next;
        }
    }
}

/// Background task: read the socket, decode samples, track, publish poses.
async fn sensor_read_loop(
    mut stream: TcpStream,
    pose_tx: watch::Sender<StampedPose>,
    mut command_rx: mpsc::UnboundedReceiver<PoseCommand>,
) {
    let mut parser = SensorFeedParser::new();
    let mut tracker = ListenerPoseTracker::new();
    let mut generation = 0;
    let mut buf = [0u8; 1024];
    let mut sample_count: u64 = 0;

    loop {
        tokio::select! {
            result = stream.read(&mut buf) => {
                match result {
                    Ok(0) => {
                        tracing::warn!("Sensor bridge connection closed");
                        break;
                    }
                    Ok(n) => {
                        parser.push_data(&buf[..n]);

                        while let Some(result) = parser.next_sample() {
                            match result {
                                Ok(sample) => {
                                    let _ = pose_tx.send((generation, tracker.update(&sample)));
                                    sample_count += 1;
                                    if sample_count % 250 == 0 {
                                        tracing::debug!(sample_count, "Orientation samples processed");
                                    }
                                }
                                Err(e) => {
                                    tracing::trace!(?e, "Skipping sensor frame");
                                }
                            }
                        }
                    }
                    Err(e) => {
                        tracing::error!(?e, "Sensor bridge read error");
                        break;
                    }
                }
            }
            Some(cmd) = command_rx.recv() => apply_command(&mut tracker, &mut generation, cmd),
        }
    }
}

/// Background task: emit a slow side-to-side head sweep at the report period.
async fn simulated_loop(
    period: Duration,
    pose_tx: watch::Sender<StampedPose>,
    mut command_rx: mpsc::UnboundedReceiver<PoseCommand>,
) {
    let mut tracker = ListenerPoseTracker::new();
    let mut generation = 0;
    let mut interval = tokio::time::interval(period);
    let mut timestamp: u64 = 0;
    let step_ms = period.as_millis() as u64;

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let t = timestamp as f64 / 1000.0;
                let sample = OrientationSample::new(
                    (t * 0.5).sin() * std::f64::consts::FRAC_PI_2,
                    (t * 0.3).sin() * 0.1,
                    0.0,
                    timestamp,
                );
                if pose_tx.send((generation, tracker.update(&sample))).is_err() {
                    break;
                }
                timestamp += step_ms;
            }
            Some(cmd) = command_rx.recv() => apply_command(&mut tracker, &mut generation, cmd),
        }
    }
}
