use anyhow::Result;
use spatial_config::AppConfig;
use spatial_pose::PoseClient;
use spatial_session::stub::{LoggingRenderer, SilentEngine};
use spatial_session::{SessionEvent, SpatialSession};
use std::future::Future;
use std::time::Duration;
use tracing::{error, info, warn};

type Session = SpatialSession<LoggingRenderer, SilentEngine, PoseClient>;

/// Connect to the configured sensor bridge, or fall back to the simulated sweep.
async fn open_pose_client(config: &AppConfig) -> PoseClient {
    let period = Duration::from_millis(config.sensor.sample_period_ms as u64);

    match &config.sensor.bridge_addr {
        Some(addr) => match PoseClient::connect(addr.as_str()).await {
            Ok(client) => {
                info!("Sensor connected");
                client
            }
            Err(e) => {
                warn!(?e, "Sensor not available, using simulated head sweep");
                PoseClient::simulated(period)
            }
        },
        None => {
            info!(?period, "No sensor bridge configured, using simulated head sweep");
            PoseClient::simulated(period)
        }
    }
}

/// Retry the sensor bridge until it answers.
async fn reconnect(addr: &str, delay: Duration) -> PoseClient {
    loop {
        tokio::time::sleep(delay).await;
        match PoseClient::connect(addr).await {
            Ok(client) => return client,
            Err(e) => warn!(?e, "Sensor reconnect failed"),
        }
    }
}

/// Feed poses into the session until `shutdown` resolves or a feed without a
/// bridge to reconnect to ends. Returns the session for teardown.
async fn run<F>(config: &AppConfig, mut session: Session, shutdown: F) -> Result<Session>
where
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    let reconnect_delay = Duration::from_millis(config.sensor.reconnect_delay_ms);
    let mut last_status = String::new();

    loop {
        tokio::select! {
            result = session.calibration_mut().changed() => match result {
                Ok(pose) => session.handle(SessionEvent::Pose(pose)),
                Err(_) => {
                    session.handle(SessionEvent::DeviceDisconnected);
                    warn!(status = session.status(), "Sensor feed ended");

                    let Some(addr) = config.sensor.bridge_addr.as_deref() else {
                        break;
                    };
                    tokio::select! {
                        client = reconnect(addr, reconnect_delay) => {
                            *session.calibration_mut() = client;
                            session.handle(SessionEvent::DeviceConnected);
                            session.start()?;
                        }
                        _ = &mut shutdown => {
                            info!("Shutting down while reconnecting");
                            break;
                        }
                    }
                }
            },
            _ = &mut shutdown => {
                info!("Shutting down");
                break;
            }
        }

        // Status changes every sample while playing; only log transitions.
        if session.status() != last_status && !session.status().ends_with('˚') {
            info!(status = session.status(), "Session status");
            last_status = session.status().to_string();
        }
    }

    Ok(session)
}

/// Resolves on the first Ctrl-C. Never resolves if the handler can't be installed.
async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(?e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "spatial_listener=info,spatial_pose=info,spatial_session=info".into()
            }),
        )
        .init();

    info!("Spatial listener starting");

    // Load config.
    let config = spatial_config::load_config().unwrap_or_else(|e| {
        warn!(?e, "Failed to load config, using defaults");
        AppConfig::default()
    });

    info!(
        period_ms = config.sensor.sample_period_ms,
        asset = %config.audio.asset,
        "Config loaded"
    );

    let pose_client = open_pose_client(&config).await;

    let mut session = SpatialSession::new(
        LoggingRenderer::new(),
        SilentEngine::new(),
        pose_client,
        config.audio.clone(),
        config.session.clone(),
    )?;
    session.handle(SessionEvent::DeviceConnected);
    session.start()?;

    let result = run(&config, session, ctrl_c()).await.map(|mut session| {
        session.stop();
    });

    if let Err(e) = spatial_config::save_config(&config) {
        error!(?e, "Failed to save config");
    }

    result
}
