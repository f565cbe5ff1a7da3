use anyhow::Result;
use framecast_protocol::SessionDescription;
use framecast_server::state;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "framecast_server=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Framecast server...");

    // Load configuration
    let config = state::Config::load()?;

    // Build the pipeline on the synthetic capture source
    let pipeline = framecast_server::create_pipeline(&config)?;

    // Register a pre-negotiated demo viewer so the loop has somewhere to
    // deliver frames
    let peer_id = format!("viewer-{}", Uuid::new_v4());
    pipeline.add_peer(&peer_id).await?;
    pipeline
        .set_local_sdp(&peer_id, SessionDescription::new("v=0 demo-local"))
        .await?;
    pipeline
        .set_remote_sdp(&peer_id, SessionDescription::new("v=0 demo-remote"))
        .await?;

    // Mirror pipeline events into the log
    let mut events = pipeline.subscribe_events();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            tracing::debug!(?event, "pipeline event");
        }
    });

    pipeline.start().await;
    tracing::info!(stream = %pipeline.stream_id(), fps = config.target_fps, "streaming");

    tokio::signal::ctrl_c().await?;

    pipeline.stop().await;
    let stats = pipeline.stats().await;
    tracing::info!(
        frames = stats.frames_encoded,
        bytes = stats.bytes_produced,
        delivered = stats.frames_delivered,
        "shutdown complete"
    );

    Ok(())
}
