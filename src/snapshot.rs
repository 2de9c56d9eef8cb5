//! # Snapshot Normalizer
//! Pure construction of one immutable `Snapshot` from an ordered
//! `FetchOutcome` list. Identical inputs (including the timestamp) always
//! serialize to identical bytes; nothing here touches the clock, the
//! network, or global state.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::NormalizerConfig;
use crate::sources::types::{FetchOutcome, FetchResult, SourceRecord};

/// Adapter success ratio, summarized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Health {
    Complete,
    Partial,
    Failed,
}

impl std::fmt::Display for Health {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Health::Complete => "complete",
            Health::Partial => "partial",
            Health::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Cross-source derivation rules, passed explicitly by the caller.
#[derive(Debug, Clone, Default)]
pub struct NormalizerRules {
    /// bucket -> exact sector names.
    pub sector_buckets: BTreeMap<String, Vec<String>>,
    /// Meme allow-list, matched case-insensitively on the symbol.
    pub meme_assets: Vec<String>,
}

impl From<&NormalizerConfig> for NormalizerRules {
    fn from(cfg: &NormalizerConfig) -> Self {
        Self {
            sector_buckets: cfg.sector_buckets.clone(),
            meme_assets: cfg.meme_assets.clone(),
        }
    }
}

/// One run's aggregation root. Exactly one outcome per adapter that was
/// registered for the run, success or not; immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub generated_at: DateTime<Utc>,
    pub health: Health,
    pub outcomes: Vec<FetchOutcome>,
    /// bucket -> sector names seen this run, in record order.
    pub sector_buckets: BTreeMap<String, Vec<String>>,
}

impl Snapshot {
    pub fn failed_outcomes(&self) -> impl Iterator<Item = &FetchOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }

    pub fn outcome(&self, adapter: &str) -> Option<&FetchOutcome> {
        self.outcomes.iter().find(|o| o.adapter == adapter)
    }

    pub fn records(&self) -> impl Iterator<Item = &SourceRecord> {
        self.outcomes.iter().flat_map(|o| o.records().iter())
    }

    /// Content digest of the serialized snapshot, used as the history entry
    /// id.
    pub fn digest(&self) -> String {
        let bytes = serde_json::to_vec(self).expect("snapshot serializes");
        let hash = Sha256::digest(&bytes);
        hex_string(&hash)
    }
}

fn hex_string(bytes: &[u8]) -> String {
    use std::fmt::Write;
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(s, "{b:02x}");
    }
    s
}

fn health_of(outcomes: &[FetchOutcome]) -> Health {
    if outcomes.is_empty() {
        return Health::Failed;
    }
    let ok = outcomes.iter().filter(|o| o.is_success()).count();
    if ok == outcomes.len() {
        Health::Complete
    } else if ok == 0 {
        Health::Failed
    } else {
        Health::Partial
    }
}

/// Build the snapshot: assign sector buckets by exact name, flag meme
/// assets, compute health. The outcome list passes through unchanged in
/// order and length.
pub fn build_snapshot(
    generated_at: DateTime<Utc>,
    outcomes: Vec<FetchOutcome>,
    rules: &NormalizerRules,
) -> Snapshot {
    // Reverse lookup: sector name -> bucket.
    let mut bucket_of: BTreeMap<&str, &str> = BTreeMap::new();
    for (bucket, names) in &rules.sector_buckets {
        for name in names {
            bucket_of.insert(name.as_str(), bucket.as_str());
        }
    }

    let health = health_of(&outcomes);
    let mut sector_buckets: BTreeMap<String, Vec<String>> = BTreeMap::new();

    let outcomes = outcomes
        .into_iter()
        .map(|mut outcome| {
            if let FetchResult::Success { records } = &mut outcome.result {
                for record in records.iter_mut() {
                    match record {
                        SourceRecord::Sector(sector) => {
                            let bucket = bucket_of
                                .get(sector.name.as_str())
                                .copied()
                                .unwrap_or("other");
                            sector.bucket = bucket.to_string();
                            sector_buckets
                                .entry(bucket.to_string())
                                .or_default()
                                .push(sector.name.clone());
                        }
                        SourceRecord::CryptoAsset(coin) => {
                            coin.is_meme = rules
                                .meme_assets
                                .iter()
                                .any(|m| m.eq_ignore_ascii_case(&coin.symbol));
                        }
                        _ => {}
                    }
                }
            }
            outcome
        })
        .collect();

    Snapshot {
        generated_at,
        health,
        outcomes,
        sector_buckets,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::types::{CryptoQuote, FetchError, SectorQuote};
    use chrono::TimeZone;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 7, 9, 30, 0).unwrap()
    }

    fn sector(name: &str, change_pct: f64) -> SourceRecord {
        SourceRecord::Sector(SectorQuote {
            name: name.to_string(),
            change_pct,
            leading_stocks: vec![],
            bucket: "other".to_string(),
            source: "sectors".to_string(),
            observed_at: ts(),
        })
    }

    fn coin(symbol: &str) -> SourceRecord {
        SourceRecord::CryptoAsset(CryptoQuote {
            symbol: symbol.to_string(),
            name: symbol.to_string(),
            price_usd: 1.0,
            change_24h: 0.0,
            change_7d: 0.0,
            market_cap: 0.0,
            volume_24h: 0.0,
            is_meme: false,
            source: "crypto".to_string(),
            observed_at: ts(),
        })
    }

    fn rules() -> NormalizerRules {
        let mut buckets = BTreeMap::new();
        buckets.insert("tech".to_string(), vec!["Electronics".to_string()]);
        NormalizerRules {
            sector_buckets: buckets,
            meme_assets: vec!["DOGE".to_string()],
        }
    }

    #[test]
    fn health_truth_table() {
        let ok = FetchOutcome::success("a", 1, vec![]);
        let bad = FetchOutcome::failure(
            "b",
            1,
            FetchError::Unreachable {
                detail: "x".into(),
            },
        );
        let r = NormalizerRules::default();

        assert_eq!(build_snapshot(ts(), vec![], &r).health, Health::Failed);
        assert_eq!(
            build_snapshot(ts(), vec![bad.clone(), bad.clone()], &r).health,
            Health::Failed
        );
        assert_eq!(
            build_snapshot(ts(), vec![ok.clone(), bad.clone()], &r).health,
            Health::Partial
        );
        assert_eq!(
            build_snapshot(ts(), vec![ok.clone(), ok.clone()], &r).health,
            Health::Complete
        );
    }

    #[test]
    fn unmatched_sectors_default_to_other() {
        let outcome = FetchOutcome::success(
            "sectors",
            1,
            vec![sector("Electronics", 1.0), sector("Shipbuilding", -0.5)],
        );
        let snap = build_snapshot(ts(), vec![outcome], &rules());
        let names: Vec<&str> = snap
            .records()
            .map(|r| match r {
                SourceRecord::Sector(s) => s.bucket.as_str(),
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(names, vec!["tech", "other"]);
        assert_eq!(snap.sector_buckets["tech"], vec!["Electronics"]);
        assert_eq!(snap.sector_buckets["other"], vec!["Shipbuilding"]);
    }

    #[test]
    fn meme_flag_matches_case_insensitively() {
        let outcome = FetchOutcome::success("crypto", 1, vec![coin("doge"), coin("BTC")]);
        let snap = build_snapshot(ts(), vec![outcome], &rules());
        let flags: Vec<bool> = snap
            .records()
            .map(|r| match r {
                SourceRecord::CryptoAsset(c) => c.is_meme,
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(flags, vec![true, false]);
    }

    #[test]
    fn normalization_is_deterministic() {
        let outcomes = vec![
            FetchOutcome::success("sectors", 1, vec![sector("Electronics", 2.1)]),
            FetchOutcome::failure(
                "futures",
                2,
                FetchError::Timeout { timeout_ms: 5000 },
            ),
            FetchOutcome::success("crypto", 1, vec![coin("DOGE")]),
        ];
        let a = build_snapshot(ts(), outcomes.clone(), &rules());
        let b = build_snapshot(ts(), outcomes, &rules());
        assert_eq!(
            serde_json::to_vec(&a).unwrap(),
            serde_json::to_vec(&b).unwrap()
        );
        assert_eq!(a.digest(), b.digest());
    }

    #[test]
    fn outcome_order_and_count_pass_through() {
        let outcomes = vec![
            FetchOutcome::success("indices", 1, vec![]),
            FetchOutcome::failure(
                "sectors",
                1,
                FetchError::Parse { detail: "x".into() },
            ),
            FetchOutcome::success("crypto", 1, vec![]),
        ];
        let snap = build_snapshot(ts(), outcomes, &NormalizerRules::default());
        let names: Vec<&str> = snap.outcomes.iter().map(|o| o.adapter.as_str()).collect();
        assert_eq!(names, vec!["indices", "sectors", "crypto"]);
    }
}
