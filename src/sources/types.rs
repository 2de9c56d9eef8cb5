// src/sources/types.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One quoted index, e.g. the Shanghai Composite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexQuote {
    pub code: String,
    pub name: String,
    pub price: f64,
    pub change: f64,
    pub change_pct: f64,
    pub volume: f64,
    pub source: String,
    pub observed_at: DateTime<Utc>,
}

/// One industry board row. `bucket` starts as "other" and is assigned by the
/// normalizer from the configured focus mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectorQuote {
    pub name: String,
    pub change_pct: f64,
    #[serde(default)]
    pub leading_stocks: Vec<String>,
    #[serde(default = "default_bucket")]
    pub bucket: String,
    pub source: String,
    pub observed_at: DateTime<Utc>,
}

fn default_bucket() -> String {
    "other".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetalQuote {
    pub symbol: String,
    pub name: String,
    pub price: f64,
    pub change: f64,
    pub change_pct: f64,
    pub unit: String,
    pub source: String,
    pub observed_at: DateTime<Utc>,
}

/// Crypto market row with two change windows. `is_meme` starts false and is
/// set by the normalizer against the configured allow-list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CryptoQuote {
    pub symbol: String,
    pub name: String,
    pub price_usd: f64,
    pub change_24h: f64,
    pub change_7d: f64,
    pub market_cap: f64,
    pub volume_24h: f64,
    #[serde(default)]
    pub is_meme: bool,
    pub source: String,
    pub observed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FuturesClass {
    Commodity,
    Index,
    International,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuturesQuote {
    pub code: String,
    pub name: String,
    pub price: f64,
    pub change: f64,
    pub change_pct: f64,
    pub class: FuturesClass,
    pub source: String,
    pub observed_at: DateTime<Utc>,
}

/// One social or repository trend item. `score` is the source's own heat
/// measure (stars for repositories, 0 where the feed has none).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendItem {
    pub id: String,
    pub title: String,
    pub score: f64,
    pub url: Option<String>,
    pub source: String,
    pub observed_at: DateTime<Utc>,
}

/// Typed record produced by exactly one adapter. Immutable once built; the
/// normalizer is the only component that rewrites derived fields (`bucket`,
/// `is_meme`) while assembling a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceRecord {
    Index(IndexQuote),
    Sector(SectorQuote),
    PreciousMetal(MetalQuote),
    CryptoAsset(CryptoQuote),
    FuturesContract(FuturesQuote),
    SocialTrend(TrendItem),
}

impl SourceRecord {
    /// Stable identifier used for cross-run delta matching.
    pub fn symbol(&self) -> &str {
        match self {
            SourceRecord::Index(q) => &q.code,
            SourceRecord::Sector(q) => &q.name,
            SourceRecord::PreciousMetal(q) => &q.symbol,
            SourceRecord::CryptoAsset(q) => &q.symbol,
            SourceRecord::FuturesContract(q) => &q.code,
            SourceRecord::SocialTrend(t) => &t.id,
        }
    }

    /// Name of the adapter that produced the record.
    pub fn source(&self) -> &str {
        match self {
            SourceRecord::Index(q) => &q.source,
            SourceRecord::Sector(q) => &q.source,
            SourceRecord::PreciousMetal(q) => &q.source,
            SourceRecord::CryptoAsset(q) => &q.source,
            SourceRecord::FuturesContract(q) => &q.source,
            SourceRecord::SocialTrend(t) => &t.source,
        }
    }

    pub fn observed_at(&self) -> DateTime<Utc> {
        match self {
            SourceRecord::Index(q) => q.observed_at,
            SourceRecord::Sector(q) => q.observed_at,
            SourceRecord::PreciousMetal(q) => q.observed_at,
            SourceRecord::CryptoAsset(q) => q.observed_at,
            SourceRecord::FuturesContract(q) => q.observed_at,
            SourceRecord::SocialTrend(t) => t.observed_at,
        }
    }

    /// Primary comparable metric, where the record has one. Sector and
    /// trend records compare on change/score instead of price.
    pub fn primary_value(&self) -> Option<f64> {
        match self {
            SourceRecord::Index(q) => Some(q.price),
            SourceRecord::Sector(_) => None,
            SourceRecord::PreciousMetal(q) => Some(q.price),
            SourceRecord::CryptoAsset(q) => Some(q.price_usd),
            SourceRecord::FuturesContract(q) => Some(q.price),
            SourceRecord::SocialTrend(_) => None,
        }
    }
}

/// Whole seconds where they divide evenly, milliseconds otherwise.
fn fmt_ms(ms: &u64) -> String {
    if *ms >= 1000 && ms % 1000 == 0 {
        format!("{}s", ms / 1000)
    } else {
        format!("{ms}ms")
    }
}

/// Closed failure set at the adapter boundary. Carried as data into the
/// snapshot and the rendered report, never thrown across the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FetchError {
    #[error("timed out after {}", fmt_ms(.timeout_ms))]
    Timeout { timeout_ms: u64 },
    #[error("rate limited: {detail}")]
    RateLimited { detail: String },
    #[error("malformed payload: {detail}")]
    Parse { detail: String },
    #[error("unreachable: {detail}")]
    Unreachable { detail: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FetchResult {
    Success { records: Vec<SourceRecord> },
    Failure { error: FetchError },
}

/// Per-adapter result of one orchestrated run. An empty `records` list is a
/// valid success (a quiet feed), distinct from any `Failure`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchOutcome {
    pub adapter: String,
    /// Attempts actually made; 0 means the task was aborted at the run
    /// deadline before any attempt finished.
    pub attempts: u32,
    pub result: FetchResult,
}

impl FetchOutcome {
    pub fn success(adapter: impl Into<String>, attempts: u32, records: Vec<SourceRecord>) -> Self {
        Self {
            adapter: adapter.into(),
            attempts,
            result: FetchResult::Success { records },
        }
    }

    pub fn failure(adapter: impl Into<String>, attempts: u32, error: FetchError) -> Self {
        Self {
            adapter: adapter.into(),
            attempts,
            result: FetchResult::Failure { error },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.result, FetchResult::Success { .. })
    }

    pub fn records(&self) -> &[SourceRecord] {
        match &self.result {
            FetchResult::Success { records } => records,
            FetchResult::Failure { .. } => &[],
        }
    }

    pub fn error(&self) -> Option<&FetchError> {
        match &self.result {
            FetchResult::Success { .. } => None,
            FetchResult::Failure { error } => Some(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_success_is_not_a_failure() {
        let ok = FetchOutcome::success("repos", 1, vec![]);
        let err = FetchOutcome::failure(
            "repos",
            1,
            FetchError::Parse {
                detail: "unexpected EOF".into(),
            },
        );
        assert!(ok.is_success());
        assert!(ok.records().is_empty());
        assert!(!err.is_success());
        assert_eq!(
            err.error(),
            Some(&FetchError::Parse {
                detail: "unexpected EOF".into()
            })
        );
    }

    #[test]
    fn fetch_error_messages_are_operator_readable() {
        let e = FetchError::Timeout { timeout_ms: 5000 };
        assert_eq!(e.to_string(), "timed out after 5s");
        let e = FetchError::Timeout { timeout_ms: 150 };
        assert_eq!(e.to_string(), "timed out after 150ms");
        let e = FetchError::Unreachable {
            detail: "http status 502".into(),
        };
        assert_eq!(e.to_string(), "unreachable: http status 502");
    }

    #[test]
    fn record_serde_round_trips_with_kind_tag() {
        let rec = SourceRecord::CryptoAsset(CryptoQuote {
            symbol: "BTC".into(),
            name: "Bitcoin".into(),
            price_usd: 98250.0,
            change_24h: 1.2,
            change_7d: -0.4,
            market_cap: 1.9e12,
            volume_24h: 3.1e10,
            is_meme: false,
            source: "crypto".into(),
            observed_at: Utc::now(),
        });
        let json = serde_json::to_string(&rec).unwrap();
        assert!(json.contains(r#""kind":"crypto_asset""#));
        let back: SourceRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, rec);
    }
}
