// src/config.rs
//! TOML configuration with env-var path override and full defaults, so the
//! binary starts with no config file at all.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::sources::FetchPolicy;

pub const ENV_CONFIG_PATH: &str = "TRACKER_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/tracker.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub schedule: ScheduleConfig,
    pub orchestrator: OrchestratorConfig,
    pub store: StoreConfig,
    pub server: ServerConfig,
    pub normalizer: NormalizerConfig,
    pub adapters: AdaptersConfig,
}

impl TrackerConfig {
    /// Load from an explicit TOML file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        let cfg: TrackerConfig = toml::from_str(&content)
            .with_context(|| format!("parsing config at {}", path.display()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Resolution order:
    /// 1) $TRACKER_CONFIG_PATH (must exist)
    /// 2) config/tracker.toml
    /// 3) built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            return Self::load_from(&pb);
        }
        let default = PathBuf::from(DEFAULT_CONFIG_PATH);
        if default.exists() {
            return Self::load_from(&default);
        }
        Ok(Self::default())
    }

    pub fn validate(&self) -> Result<()> {
        if self.schedule.interval_secs == 0 {
            return Err(anyhow!("schedule.interval_secs must be positive"));
        }
        if self.orchestrator.run_deadline_secs == 0 {
            return Err(anyhow!("orchestrator.run_deadline_secs must be positive"));
        }
        for (name, common) in [
            ("indices", &self.adapters.indices.common),
            ("sectors", &self.adapters.sectors.common),
            ("metals", &self.adapters.metals.common),
            ("crypto", &self.adapters.crypto.common),
            ("futures", &self.adapters.futures.common),
            ("social", &self.adapters.social.common),
            ("repos", &self.adapters.repos.common),
        ] {
            if common.max_attempts == 0 {
                return Err(anyhow!("adapters.{name}.max_attempts must be at least 1"));
            }
            if common.timeout_secs == 0 {
                return Err(anyhow!("adapters.{name}.timeout_secs must be positive"));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Spawn the in-process interval scheduler. Off, the pipeline only runs
    /// via the HTTP trigger.
    pub enabled: bool,
    pub interval_secs: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 24 * 3600,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Wall-clock cap for one whole fan-out; adapters still pending when it
    /// expires are recorded as timeouts.
    pub run_deadline_secs: u64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            run_deadline_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("state/history.jsonl"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Cross-source derivation rules. Explicit configuration, never ambient
/// state: the normalizer receives these as an argument.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
    /// Focus bucket -> exact sector names. Anything unmatched lands in
    /// "other".
    pub sector_buckets: BTreeMap<String, Vec<String>>,
    /// Symbols flagged as meme assets, case-insensitive.
    pub meme_assets: Vec<String>,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        let mut buckets = BTreeMap::new();
        buckets.insert(
            "tech".to_string(),
            vec![
                "Electronics".to_string(),
                "Computers".to_string(),
                "Telecommunications".to_string(),
            ],
        );
        buckets.insert(
            "cyclical".to_string(),
            vec![
                "Nonferrous Metals".to_string(),
                "Steel".to_string(),
                "Coal".to_string(),
                "Chemicals".to_string(),
            ],
        );
        buckets.insert("agriculture".to_string(), vec!["Agriculture".to_string()]);
        Self {
            sector_buckets: buckets,
            meme_assets: vec![
                "DOGE".to_string(),
                "SHIB".to_string(),
                "PEPE".to_string(),
                "FLOKI".to_string(),
                "BONK".to_string(),
                "WIF".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdapterCommon {
    pub enabled: bool,
    pub timeout_secs: u64,
    pub max_attempts: u32,
    pub backoff_ms: u64,
}

impl Default for AdapterCommon {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_secs: 5,
            max_attempts: 2,
            backoff_ms: 250,
        }
    }
}

impl AdapterCommon {
    pub fn policy(&self) -> FetchPolicy {
        FetchPolicy {
            timeout: Duration::from_secs(self.timeout_secs),
            max_attempts: self.max_attempts.max(1),
            backoff: Duration::from_millis(self.backoff_ms),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AdaptersConfig {
    pub indices: IndicesConfig,
    pub sectors: SectorsConfig,
    pub metals: MetalsConfig,
    pub crypto: CryptoConfig,
    pub futures: FuturesConfig,
    pub social: SocialConfig,
    pub repos: ReposConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexSymbol {
    pub code: String,
    pub name: String,
}

impl Default for IndexSymbol {
    fn default() -> Self {
        Self {
            code: String::new(),
            name: String::new(),
        }
    }
}

fn sym(code: &str, name: &str) -> IndexSymbol {
    IndexSymbol {
        code: code.to_string(),
        name: name.to_string(),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicesConfig {
    #[serde(flatten)]
    pub common: AdapterCommon,
    /// Market-data gateway endpoint returning index quotes as JSON.
    pub quote_url: String,
    pub symbols: Vec<IndexSymbol>,
}

impl Default for IndicesConfig {
    fn default() -> Self {
        Self {
            common: AdapterCommon::default(),
            quote_url: "http://localhost:8010/indices".to_string(),
            symbols: vec![
                sym("sh000001", "Shanghai Composite"),
                sym("sz399001", "Shenzhen Component"),
                sym("sh000300", "CSI 300"),
                sym("sz399006", "ChiNext"),
                sym("sh000688", "STAR 50"),
                sym("sh000905", "CSI 500"),
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SectorsConfig {
    #[serde(flatten)]
    pub common: AdapterCommon,
    pub board_url: String,
}

impl Default for SectorsConfig {
    fn default() -> Self {
        Self {
            common: AdapterCommon::default(),
            board_url: "http://localhost:8010/sector-boards".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetalsConfig {
    #[serde(flatten)]
    pub common: AdapterCommon,
    pub quote_url: String,
    pub symbols: Vec<String>,
    pub unit: String,
}

impl Default for MetalsConfig {
    fn default() -> Self {
        Self {
            common: AdapterCommon::default(),
            quote_url: "https://query1.finance.yahoo.com/v7/finance/quote".to_string(),
            symbols: vec!["GC=F".to_string(), "SI=F".to_string()],
            unit: "USD/oz".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CryptoConfig {
    #[serde(flatten)]
    pub common: AdapterCommon,
    pub api_base: String,
    /// CoinGecko coin ids.
    pub coins: Vec<String>,
    pub vs_currency: String,
}

impl Default for CryptoConfig {
    fn default() -> Self {
        Self {
            common: AdapterCommon::default(),
            api_base: "https://api.coingecko.com/api/v3".to_string(),
            coins: vec![
                "bitcoin".to_string(),
                "ethereum".to_string(),
                "solana".to_string(),
                "ripple".to_string(),
                "dogecoin".to_string(),
                "shiba-inu".to_string(),
                "pepe".to_string(),
            ],
            vs_currency: "usd".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FuturesConfig {
    #[serde(flatten)]
    pub common: AdapterCommon,
    pub quote_url: String,
    pub codes: Vec<String>,
}

impl Default for FuturesConfig {
    fn default() -> Self {
        Self {
            common: AdapterCommon::default(),
            quote_url: "http://localhost:8010/futures".to_string(),
            codes: vec![
                "AU".to_string(),
                "AG".to_string(),
                "CU".to_string(),
                "RB".to_string(),
                "I".to_string(),
                "SC".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SocialConfig {
    #[serde(flatten)]
    pub common: AdapterCommon,
    /// Nitter instance base URL; self-hosted instances are the stable path.
    pub instance: String,
    pub accounts: Vec<String>,
    pub max_items_per_account: usize,
}

impl Default for SocialConfig {
    fn default() -> Self {
        Self {
            common: AdapterCommon::default(),
            instance: std::env::var("NITTER_INSTANCE")
                .unwrap_or_else(|_| "http://localhost:8080".to_string()),
            accounts: vec![
                "VitalikButerin".to_string(),
                "WatcherGuru".to_string(),
                "DefiLlama".to_string(),
            ],
            max_items_per_account: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReposConfig {
    #[serde(flatten)]
    pub common: AdapterCommon,
    pub api_base: String,
    pub min_stars: u32,
    pub lookback_days: u32,
    pub fetch_count: usize,
    /// "ENV" reads GITHUB_TOKEN; empty means unauthenticated (60 req/h).
    pub token: String,
}

impl Default for ReposConfig {
    fn default() -> Self {
        Self {
            common: AdapterCommon::default(),
            api_base: "https://api.github.com".to_string(),
            min_stars: 100,
            lookback_days: 7,
            fetch_count: 10,
            token: "ENV".to_string(),
        }
    }
}

impl ReposConfig {
    /// Resolve the token the way the rest of the config resolves secrets:
    /// the literal "ENV" defers to the environment at startup.
    pub fn resolved_token(&self) -> Option<String> {
        if self.token.trim().eq_ignore_ascii_case("env") {
            std::env::var("GITHUB_TOKEN").ok().filter(|t| !t.is_empty())
        } else if self.token.trim().is_empty() {
            None
        } else {
            Some(self.token.clone())
        }
    }
}
