use std::path::PathBuf;

use clawarts_core::settlement::SettlementRates;
use clawarts_core::CoreResult;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub board: BoardConfig,
    #[serde(default)]
    pub settlement: SettlementConfig,
    #[serde(default)]
    pub round: RoundConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub archive: ArchiveConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct StoreConfig {
    /// JSON snapshot written after every committed write; in-memory only when unset
    #[serde(default)]
    pub snapshot_path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct BoardConfig {
    /// Shared secret expected in the `x-tick-key` header
    #[serde(default)]
    pub sync_key: Option<String>,
    /// Also require the key on ledger mutations
    #[serde(default)]
    pub protect_world_writes: bool,
}

/// What settlement and funding do when a funder never joined the world
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum MissingParticipantPolicy {
    /// Drop the update and report it in the settlement summary
    #[default]
    Skip,
    /// Create the participant on the fly
    Provision,
    /// Abort the whole operation
    Fail,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SettlementConfig {
    pub treasury_fee_bps: u32,
    pub challenger_bonus_bps: u32,
    /// Reject a second settlement of the same round
    pub guard_double_settlement: bool,
    pub missing_participant: MissingParticipantPolicy,
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self {
            treasury_fee_bps: 1000,
            challenger_bonus_bps: 1000,
            guard_double_settlement: true,
            missing_participant: MissingParticipantPolicy::Skip,
        }
    }
}

impl SettlementConfig {
    pub fn rates(&self) -> CoreResult<SettlementRates> {
        SettlementRates::from_bps(self.treasury_fee_bps, self.challenger_bonus_bps)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RoundConfig {
    pub duration_secs: u64,
}

impl Default for RoundConfig {
    fn default() -> Self {
        Self { duration_secs: 600 }
    }
}

impl RoundConfig {
    pub fn duration_ms(&self) -> i64 {
        (self.duration_secs as i64).saturating_mul(1000)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    /// Maximum number of cached entries
    pub max_capacity: u64,
    /// TTL for cached entries in seconds
    pub ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_capacity: 1000,
            ttl_seconds: 5,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ArchiveConfig {
    pub enabled: bool,
    pub url: String,
    pub database: String,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: "http://localhost:8123".to_string(),
            database: "clawarts".to_string(),
            user: None,
            password: None,
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            // Start with default values
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            .set_default("board.protect_world_writes", false)?
            .set_default("settlement.treasury_fee_bps", 1000)?
            .set_default("settlement.challenger_bonus_bps", 1000)?
            .set_default("settlement.guard_double_settlement", true)?
            .set_default("settlement.missing_participant", "skip")?
            .set_default("round.duration_secs", 600)?
            .set_default("cache.max_capacity", 1000)?
            .set_default("cache.ttl_seconds", 5)?
            .set_default("archive.enabled", false)?
            .set_default("archive.url", "http://localhost:8123")?
            .set_default("archive.database", "clawarts")?;

        // Secret name used by the tick-sync script; CLAWARTS__BOARD__SYNC_KEY wins
        if let Ok(key) = std::env::var("TICK_SYNC_KEY") {
            builder = builder.set_default("board.sync_key", key)?;
        }

        let config = builder
            // Load from config file if it exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // Override with environment variables (CLAWARTS__SERVER__PORT, etc.)
            .add_source(
                Environment::with_prefix("CLAWARTS")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 3000,
            },
            store: StoreConfig::default(),
            board: BoardConfig::default(),
            settlement: SettlementConfig::default(),
            round: RoundConfig::default(),
            cache: CacheConfig::default(),
            archive: ArchiveConfig::default(),
        }
    }
}
