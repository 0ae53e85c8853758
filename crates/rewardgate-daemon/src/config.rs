use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use rewardgate_core::address::WalletAddress;
use rewardgate_core::error::ClaimError;
use rewardgate_core::track::{RewardTrack, TrackTable};
use serde::Deserialize;
use thiserror::Error;

pub const REDIS_URL_ENV: &str = "REWARDGATE_REDIS_URL";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

impl From<ClaimError> for ConfigError {
    fn from(err: ClaimError) -> Self {
        Self::Invalid(err.to_string())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DaemonConfig {
    #[serde(default = "default_listen")]
    pub listen: String,
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    pub default_track: String,
    pub tracks: BTreeMap<String, RewardTrack>,
    pub default_chain: String,
    pub chains: BTreeMap<String, ChainConfig>,
    pub directory: DirectoryConfig,
    #[serde(default)]
    pub reputation: Option<ReputationConfig>,
    #[serde(default = "default_lock_ttl_ms")]
    pub lock_ttl_ms: u64,
    #[serde(default = "default_audit_cap")]
    pub audit_cap: usize,
    #[serde(default)]
    pub denylist: DenylistConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChainConfig {
    pub rpc_url: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DirectoryConfig {
    pub base_url: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Hard ceiling on pages walked while looking for a linked wallet.
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReputationConfig {
    pub base_url: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default)]
    pub min_score: Option<f64>,
    #[serde(default)]
    pub min_followers: Option<u64>,
    #[serde(default)]
    pub min_active_days: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DenylistConfig {
    #[serde(default)]
    pub addresses: Vec<WalletAddress>,
    #[serde(default)]
    pub accounts: Vec<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", deny_unknown_fields)]
pub enum StoreConfig {
    #[default]
    Memory,
    Redis {
        url: String,
    },
}

fn default_listen() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_max_body_bytes() -> usize {
    4_096
}

fn default_lock_ttl_ms() -> u64 {
    10_000
}

fn default_audit_cap() -> usize {
    1_000
}

fn default_timeout_ms() -> u64 {
    3_000
}

fn default_max_pages() -> usize {
    1_000
}

impl DaemonConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let payload = fs::read(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let mut cfg = Self::from_json(&payload)?;
        cfg.apply_env_overrides();
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_json(payload: &[u8]) -> Result<Self, ConfigError> {
        Ok(serde_json::from_slice(payload)?)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var(REDIS_URL_ENV) {
            if !url.is_empty() {
                self.store = StoreConfig::Redis { url };
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.track_table()?;
        if !self.chains.contains_key(&self.default_chain) {
            return Err(ConfigError::Invalid(format!(
                "default chain {:?} is not configured",
                self.default_chain
            )));
        }
        for (id, track) in &self.tracks {
            if let Some(chain) = track.chain.as_deref() {
                if !self.chains.contains_key(chain) {
                    return Err(ConfigError::Invalid(format!(
                        "track {id:?} is bound to unknown chain {chain:?}"
                    )));
                }
            }
        }
        if self.lock_ttl_ms == 0 {
            return Err(ConfigError::Invalid("lock_ttl_ms must be positive".to_string()));
        }
        if self.audit_cap == 0 {
            return Err(ConfigError::Invalid("audit_cap must be positive".to_string()));
        }
        if self.directory.max_pages == 0 {
            return Err(ConfigError::Invalid(
                "directory.max_pages must be positive".to_string(),
            ));
        }
        if let Some(rep) = &self.reputation {
            if rep.min_score.is_some_and(|s| !s.is_finite()) {
                return Err(ConfigError::Invalid(
                    "reputation.min_score must be finite".to_string(),
                ));
            }
        }
        Ok(())
    }

    pub fn track_table(&self) -> Result<TrackTable, ConfigError> {
        Ok(TrackTable::new(
            self.tracks.clone(),
            self.default_track.clone(),
        )?)
    }
}
