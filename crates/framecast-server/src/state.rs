//! Runtime configuration loaded from the environment.

use framecast_media::{EncoderConfig, MAX_BITRATE_KBPS, MIN_BITRATE_KBPS};

#[derive(Debug, Clone)]
pub struct Config {
    /// Tick cadence of the capture loop, frames per second
    pub target_fps: u32,
    /// Encoder bitrate in kilobits per second
    pub bitrate_kbps: u32,
    /// Byte size of the synthetic demo frames
    pub frame_bytes: usize,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let target_fps = env_or("FRAMECAST_FPS", 30);

        let mut bitrate_kbps = env_or("FRAMECAST_BITRATE_KBPS", EncoderConfig::default().bitrate_kbps);
        if EncoderConfig::new(bitrate_kbps).is_err() {
            tracing::warn!(
                bitrate_kbps,
                "FRAMECAST_BITRATE_KBPS outside [{MIN_BITRATE_KBPS}, {MAX_BITRATE_KBPS}], using default"
            );
            bitrate_kbps = EncoderConfig::default().bitrate_kbps;
        }

        let frame_bytes = env_or("FRAMECAST_FRAME_BYTES", 64 * 1024);

        Ok(Config {
            target_fps,
            bitrate_kbps,
            frame_bytes,
        })
    }
}

fn env_or<T: std::str::FromStr + Copy>(name: &str, default: T) -> T {
    match std::env::var(name) {
        Ok(value) => value.parse().unwrap_or_else(|_| {
            tracing::warn!("{name} is not a valid number, using default");
            default
        }),
        Err(_) => default,
    }
}
