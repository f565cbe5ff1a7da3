//! Pipeline orchestrator
//!
//! Pulls one raw frame per tick, encodes it once, and fans the encoded
//! frame out to every negotiated peer. Peers join, negotiate, and leave
//! freely while the loop runs; the loop itself is started and stopped
//! explicitly.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{Mutex, RwLock, broadcast};
use tokio::task::JoinHandle;
use uuid::Uuid;

use framecast_media::{EncodedFrame, EncoderConfig, FrameEncoder, FrameSource};
use framecast_protocol::{
    IceCandidate, PeerStatsData, PipelineEvent, PipelineState, PipelineStatsData,
    SessionDescription,
};

use crate::error::Result;
use crate::events::EventBus;
use crate::peer::{BroadcastOutcome, PeerRegistry};

/// Result of a single capture/encode/fan-out pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Capture had no frame ready; not an error
    Idle,
    /// A frame was pulled but encoding failed; no peer received it
    EncodeFailed,
    /// The encoded frame was offered to every registered peer
    Broadcast(BroadcastOutcome),
}

#[derive(Debug, Default)]
struct Counters {
    frames_captured: AtomicU64,
    frames_encoded: AtomicU64,
    encode_failures: AtomicU64,
    bytes_produced: AtomicU64,
    frames_delivered: AtomicU64,
}

/// Orchestrates capture, encoding, and fan-out delivery.
///
/// Cheap to clone; clones share the same pipeline.
#[derive(Clone)]
pub struct StreamPipeline {
    stream_id: Uuid,
    source: Arc<Mutex<Box<dyn FrameSource>>>,
    encoder: Arc<dyn FrameEncoder>,
    config: Arc<RwLock<EncoderConfig>>,
    registry: Arc<PeerRegistry>,
    events: EventBus,
    running: Arc<AtomicBool>,
    tick_task: Arc<Mutex<Option<JoinHandle<()>>>>,
    tick_interval: Duration,
    counters: Arc<Counters>,
    latest_frame: Arc<RwLock<Option<Arc<EncodedFrame>>>>,
    /// Moving average of capture-to-delivery latency, microseconds
    latency_us: Arc<AtomicU64>,
}

impl StreamPipeline {
    /// Create a stopped pipeline ticking at `ticks_per_second` once
    /// started.
    pub fn new(
        source: Box<dyn FrameSource>,
        encoder: Arc<dyn FrameEncoder>,
        config: EncoderConfig,
        ticks_per_second: u32,
    ) -> Self {
        let stream_id = Uuid::new_v4();
        let tick_interval = Duration::from_micros(1_000_000 / u64::from(ticks_per_second.max(1)));

        tracing::info!(
            stream = %stream_id,
            encoder = encoder.name(),
            bitrate_kbps = config.bitrate_kbps,
            ?tick_interval,
            "pipeline created"
        );

        Self {
            stream_id,
            source: Arc::new(Mutex::new(source)),
            encoder,
            config: Arc::new(RwLock::new(config)),
            registry: Arc::new(PeerRegistry::new()),
            events: EventBus::new(),
            running: Arc::new(AtomicBool::new(false)),
            tick_task: Arc::new(Mutex::new(None)),
            tick_interval,
            counters: Arc::new(Counters::default()),
            latest_frame: Arc::new(RwLock::new(None)),
            latency_us: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn stream_id(&self) -> Uuid {
        self.stream_id
    }

    pub fn registry(&self) -> Arc<PeerRegistry> {
        self.registry.clone()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<PipelineEvent> {
        self.events.subscribe()
    }

    pub fn state(&self) -> PipelineState {
        if self.running.load(Ordering::SeqCst) {
            PipelineState::Running
        } else {
            PipelineState::Stopped
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Start the tick loop. Starting a running pipeline is a no-op.
    pub async fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            tracing::debug!(stream = %self.stream_id, "start ignored, already running");
            return;
        }

        let pipeline = self.clone();
        let handle = tokio::spawn(async move { pipeline.run_ticks().await });
        *self.tick_task.lock().await = Some(handle);

        self.events.publish(PipelineEvent::Started {
            stream_id: self.stream_id,
        });
        tracing::info!(stream = %self.stream_id, "pipeline started");
    }

    /// Stop the tick loop. A tick already in flight finishes its delivery
    /// pass before the task exits. Stopping a stopped pipeline is a no-op.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }

        if let Some(handle) = self.tick_task.lock().await.take() {
            if let Err(e) = handle.await {
                tracing::warn!(stream = %self.stream_id, error = %e, "tick task join failed");
            }
        }

        self.events.publish(PipelineEvent::Stopped {
            stream_id: self.stream_id,
        });
        tracing::info!(stream = %self.stream_id, "pipeline stopped");
    }

    async fn run_ticks(&self) {
        let mut interval = tokio::time::interval(self.tick_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        while self.running.load(Ordering::SeqCst) {
            interval.tick().await;
            if !self.running.load(Ordering::SeqCst) {
                break;
            }
            self.tick().await;
        }
    }

    /// Run one capture/encode/fan-out pass.
    ///
    /// Normally driven by the interval loop spawned by `start`; exposed so
    /// an external scheduler can pace the pipeline itself.
    pub async fn tick(&self) -> TickOutcome {
        let frame = { self.source.lock().await.try_pull_frame() };
        let Some(frame) = frame else {
            return TickOutcome::Idle;
        };
        self.counters.frames_captured.fetch_add(1, Ordering::Relaxed);

        let config = *self.config.read().await;
        let encoded = match self.encoder.encode(&frame, &config) {
            Ok(encoded) => encoded,
            Err(e) => {
                self.counters.encode_failures.fetch_add(1, Ordering::Relaxed);
                self.events.publish(PipelineEvent::EncodeFailed {
                    sequence: frame.sequence,
                    reason: e.to_string(),
                });
                tracing::warn!(
                    stream = %self.stream_id,
                    sequence = frame.sequence,
                    error = %e,
                    "encode failed, tick abandoned"
                );
                return TickOutcome::EncodeFailed;
            }
        };

        self.counters.frames_encoded.fetch_add(1, Ordering::Relaxed);
        self.counters
            .bytes_produced
            .fetch_add(encoded.size() as u64, Ordering::Relaxed);

        let encoded = Arc::new(encoded);
        let outcome = self.registry.broadcast_frame(&encoded).await;
        self.counters
            .frames_delivered
            .fetch_add(outcome.delivered as u64, Ordering::Relaxed);

        self.observe_latency(&encoded);
        *self.latest_frame.write().await = Some(encoded.clone());

        self.events.publish(PipelineEvent::FrameBroadcast {
            sequence: encoded.sequence,
            encoded_bytes: encoded.size(),
            peers_delivered: outcome.delivered,
            peers_skipped: outcome.skipped,
        });

        TickOutcome::Broadcast(outcome)
    }

    fn observe_latency(&self, encoded: &EncodedFrame) {
        let sample = (Utc::now() - encoded.captured_at)
            .num_microseconds()
            .unwrap_or(0)
            .max(0) as u64;
        let previous = self.latency_us.load(Ordering::Relaxed);
        let next = if previous == 0 {
            sample
        } else {
            (previous * 7 + sample) / 8
        };
        self.latency_us.store(next, Ordering::Relaxed);
    }

    // --- control surface ---------------------------------------------------

    pub async fn add_peer(&self, id: &str) -> Result<()> {
        self.registry.add_peer(id).await?;
        self.events.publish(PipelineEvent::PeerAdded {
            peer_id: id.to_string(),
        });
        Ok(())
    }

    pub async fn remove_peer(&self, id: &str) -> Result<()> {
        self.registry.remove_peer(id).await?;
        self.events.publish(PipelineEvent::PeerRemoved {
            peer_id: id.to_string(),
        });
        Ok(())
    }

    pub async fn set_local_sdp(&self, id: &str, sdp: SessionDescription) -> Result<()> {
        let peer = self.registry.get(id).await?;
        let mut peer = peer.write().await;
        let was_negotiated = peer.can_receive_frame();
        peer.set_local_sdp(sdp);
        let now_negotiated = peer.can_receive_frame();
        drop(peer);
        self.publish_if_newly_negotiated(id, was_negotiated, now_negotiated);
        Ok(())
    }

    pub async fn set_remote_sdp(&self, id: &str, sdp: SessionDescription) -> Result<()> {
        let peer = self.registry.get(id).await?;
        let mut peer = peer.write().await;
        let was_negotiated = peer.can_receive_frame();
        peer.set_remote_sdp(sdp);
        let now_negotiated = peer.can_receive_frame();
        drop(peer);
        self.publish_if_newly_negotiated(id, was_negotiated, now_negotiated);
        Ok(())
    }

    fn publish_if_newly_negotiated(&self, id: &str, was: bool, now: bool) {
        if !was && now {
            self.events.publish(PipelineEvent::PeerNegotiated {
                peer_id: id.to_string(),
            });
        }
    }

    pub async fn add_ice_candidate(&self, id: &str, candidate: IceCandidate) -> Result<()> {
        let peer = self.registry.get(id).await?;
        peer.write().await.add_ice_candidate(candidate);
        Ok(())
    }

    pub async fn peer_stats(&self, id: &str) -> Result<PeerStatsData> {
        let peer = self.registry.get(id).await?;
        let stats = peer.read().await.stats();
        Ok(stats)
    }

    pub async fn encoder_config(&self) -> EncoderConfig {
        *self.config.read().await
    }

    /// Replace the encoder configuration. Takes effect on the next tick.
    pub async fn set_encoder_config(&self, config: EncoderConfig) {
        *self.config.write().await = config;
        self.events.publish(PipelineEvent::ConfigUpdated {
            bitrate_kbps: config.bitrate_kbps,
        });
        tracing::info!(
            stream = %self.stream_id,
            bitrate_kbps = config.bitrate_kbps,
            "encoder config updated"
        );
    }

    /// The most recently broadcast encoded frame, shared, not copied.
    pub async fn latest_frame(&self) -> Option<Arc<EncodedFrame>> {
        self.latest_frame.read().await.clone()
    }

    /// Moving average of capture-to-delivery latency in milliseconds.
    pub fn latency_ms(&self) -> f64 {
        self.latency_us.load(Ordering::Relaxed) as f64 / 1_000.0
    }

    pub async fn stats(&self) -> PipelineStatsData {
        PipelineStatsData {
            stream_id: self.stream_id,
            state: self.state(),
            peer_count: self.registry.peer_count().await,
            frames_captured: self.counters.frames_captured.load(Ordering::Relaxed),
            frames_encoded: self.counters.frames_encoded.load(Ordering::Relaxed),
            encode_failures: self.counters.encode_failures.load(Ordering::Relaxed),
            bytes_produced: self.counters.bytes_produced.load(Ordering::Relaxed),
            frames_delivered: self.counters.frames_delivered.load(Ordering::Relaxed),
            latency_ms: self.latency_ms(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use framecast_media::{SoftwareEncoder, SyntheticSource};

    fn test_pipeline() -> StreamPipeline {
        StreamPipeline::new(
            Box::new(SyntheticSource::new(4_096)),
            Arc::new(SoftwareEncoder::new()),
            EncoderConfig::default(),
            200,
        )
    }

    #[tokio::test]
    async fn start_is_idempotent() {
        let pipeline = test_pipeline();
        let mut events = pipeline.subscribe_events();

        pipeline.start().await;
        pipeline.start().await;
        assert_eq!(pipeline.state(), PipelineState::Running);

        pipeline.stop().await;
        assert_eq!(pipeline.state(), PipelineState::Stopped);

        // Exactly one Started for the two start calls
        assert!(matches!(
            events.recv().await.unwrap(),
            PipelineEvent::Started { .. }
        ));
        loop {
            match events.recv().await.unwrap() {
                PipelineEvent::Started { .. } => panic!("second Started event"),
                PipelineEvent::Stopped { .. } => break,
                _ => {}
            }
        }
    }

    #[tokio::test]
    async fn stop_when_stopped_is_a_no_op() {
        let pipeline = test_pipeline();
        pipeline.stop().await;
        assert_eq!(pipeline.state(), PipelineState::Stopped);
    }

    #[tokio::test]
    async fn idle_source_skips_the_tick() {
        let pipeline = StreamPipeline::new(
            Box::new(SyntheticSource::new(1_024).with_limit(0)),
            Arc::new(SoftwareEncoder::new()),
            EncoderConfig::default(),
            30,
        );

        assert_eq!(pipeline.tick().await, TickOutcome::Idle);
        let stats = pipeline.stats().await;
        assert_eq!(stats.frames_captured, 0);
        assert_eq!(stats.frames_encoded, 0);
    }

    #[tokio::test]
    async fn ticks_update_aggregates_and_latest_frame() {
        let pipeline = test_pipeline();

        pipeline.tick().await;
        pipeline.tick().await;
        pipeline.tick().await;

        let stats = pipeline.stats().await;
        assert_eq!(stats.frames_captured, 3);
        assert_eq!(stats.frames_encoded, 3);
        assert_eq!(stats.encode_failures, 0);
        assert!(stats.bytes_produced > 0);

        let latest = pipeline.latest_frame().await.unwrap();
        assert_eq!(latest.sequence, 2);
    }

    #[tokio::test]
    async fn config_updates_apply_to_later_ticks() {
        let pipeline = test_pipeline();
        assert_eq!(pipeline.encoder_config().await.bitrate_kbps, 2_500);

        pipeline
            .set_encoder_config(EncoderConfig::new(40_000).unwrap())
            .await;
        assert_eq!(pipeline.encoder_config().await.bitrate_kbps, 40_000);
    }
}
