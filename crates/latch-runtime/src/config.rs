//! # Runtime Configuration
//!
//! Environment-driven configuration with sane defaults. All variables are
//! optional; without AWS settings the runtime wires the in-memory blob store
//! and face indexer instead of the cloud adapters.
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `LATCH_S3_BUCKET` | unset | S3 bucket for enrollment/capture images; enables the AWS adapters |
//! | `LATCH_PRESIGN_EXPIRY_SECS` | `60` | Lifetime of presigned download URLs |
//! | `LATCH_PENDING_TTL_SECS` | `900` | Age at which stale pending requests are expired (`0` disables the sweep) |
//! | `LATCH_SWEEP_INTERVAL_SECS` | `60` | How often the sweep runs |
//! | `RUST_LOG` | `info` | Log filter (standard env-filter syntax) |

use std::env;
use std::time::Duration;

/// Complete runtime configuration.
#[derive(Debug, Clone)]
pub struct LatchConfig {
    /// S3 bucket backing the blob store; `None` selects the in-memory
    /// adapters.
    pub s3_bucket: Option<String>,
    /// Lifetime of presigned download URLs.
    pub presign_expiry: Duration,
    /// Age at which stale pending-request entries are expired; `None`
    /// disables the sweep.
    pub pending_ttl: Option<Duration>,
    /// Interval between sweep runs.
    pub sweep_interval: Duration,
}

impl Default for LatchConfig {
    fn default() -> Self {
        Self {
            s3_bucket: None,
            presign_expiry: Duration::from_secs(60),
            pending_ttl: Some(Duration::from_secs(900)),
            sweep_interval: Duration::from_secs(60),
        }
    }
}

impl LatchConfig {
    /// Load configuration from the environment.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(bucket) = env::var("LATCH_S3_BUCKET") {
            if !bucket.is_empty() {
                config.s3_bucket = Some(bucket);
            }
        }
        if let Some(secs) = env_secs("LATCH_PRESIGN_EXPIRY_SECS") {
            config.presign_expiry = Duration::from_secs(secs);
        }
        if let Some(secs) = env_secs("LATCH_PENDING_TTL_SECS") {
            config.pending_ttl = (secs > 0).then(|| Duration::from_secs(secs));
        }
        if let Some(secs) = env_secs("LATCH_SWEEP_INTERVAL_SECS") {
            config.sweep_interval = Duration::from_secs(secs.max(1));
        }

        config
    }
}

fn env_secs(name: &str) -> Option<u64> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}
