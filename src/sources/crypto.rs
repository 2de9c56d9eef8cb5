// src/sources/crypto.rs
//! Crypto markets adapter over the CoinGecko `/coins/markets` endpoint.

use async_trait::async_trait;
use chrono::Utc;
use metrics::counter;
use serde::Deserialize;

use crate::config::CryptoConfig;
use crate::sources::types::{CryptoQuote, FetchError, SourceRecord};
use crate::sources::{get_text, SourceAdapter};

const ADAPTER_NAME: &str = "crypto";

#[derive(Debug, Deserialize)]
struct MarketRow {
    id: String,
    symbol: String,
    name: String,
    current_price: f64,
    #[serde(default)]
    market_cap: Option<f64>,
    #[serde(default)]
    total_volume: Option<f64>,
    #[serde(default)]
    price_change_percentage_24h: Option<f64>,
    #[serde(default)]
    price_change_percentage_7d_in_currency: Option<f64>,
}

pub struct CryptoMarketsAdapter {
    mode: Mode,
}

enum Mode {
    Http { client: reqwest::Client, url: String },
    Fixture(String),
}

impl CryptoMarketsAdapter {
    pub fn from_config(cfg: &CryptoConfig) -> Self {
        let url = format!(
            "{}/coins/markets?vs_currency={}&ids={}&order=market_cap_desc&per_page={}&page=1&sparkline=false&price_change_percentage=24h%2C7d",
            cfg.api_base.trim_end_matches('/'),
            cfg.vs_currency,
            cfg.coins.join("%2C"),
            cfg.coins.len().max(1),
        );
        Self {
            mode: Mode::Http {
                client: reqwest::Client::new(),
                url,
            },
        }
    }

    pub fn from_fixture(body: &str) -> Self {
        Self {
            mode: Mode::Fixture(body.to_string()),
        }
    }

    fn parse_markets(body: &str) -> Result<Vec<SourceRecord>, FetchError> {
        let rows: Vec<MarketRow> = serde_json::from_str(body).map_err(|e| FetchError::Parse {
            detail: format!("coins/markets json: {e}"),
        })?;
        let observed_at = Utc::now();

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(SourceRecord::CryptoAsset(CryptoQuote {
                symbol: row.symbol.to_uppercase(),
                name: if row.name.is_empty() { row.id } else { row.name },
                price_usd: row.current_price,
                change_24h: row.price_change_percentage_24h.unwrap_or(0.0),
                change_7d: row.price_change_percentage_7d_in_currency.unwrap_or(0.0),
                market_cap: row.market_cap.unwrap_or(0.0),
                volume_24h: row.total_volume.unwrap_or(0.0),
                is_meme: false,
                source: ADAPTER_NAME.to_string(),
                observed_at,
            }));
        }
        counter!("tracker_records_total", "adapter" => ADAPTER_NAME).increment(out.len() as u64);
        Ok(out)
    }
}

#[async_trait]
impl SourceAdapter for CryptoMarketsAdapter {
    async fn fetch(&self) -> Result<Vec<SourceRecord>, FetchError> {
        let body = match &self.mode {
            Mode::Http { client, url } => get_text(client, url).await?,
            Mode::Fixture(body) => body.clone(),
        };
        Self::parse_markets(&body)
    }

    fn name(&self) -> &'static str {
        ADAPTER_NAME
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_price_is_a_parse_failure() {
        let body = r#"[{"id":"bitcoin","symbol":"btc","name":"Bitcoin"}]"#;
        let err = CryptoMarketsAdapter::parse_markets(body).unwrap_err();
        assert!(matches!(err, FetchError::Parse { .. }));
    }

    #[test]
    fn null_change_windows_default_to_zero() {
        let body = r#"[{
            "id":"pepe","symbol":"pepe","name":"Pepe","current_price":0.000012,
            "market_cap":5000000000,"total_volume":800000000,
            "price_change_percentage_24h":null,
            "price_change_percentage_7d_in_currency":null
        }]"#;
        let recs = CryptoMarketsAdapter::parse_markets(body).unwrap();
        match &recs[0] {
            SourceRecord::CryptoAsset(q) => {
                assert_eq!(q.symbol, "PEPE");
                assert_eq!(q.change_24h, 0.0);
                assert_eq!(q.change_7d, 0.0);
            }
            other => panic!("unexpected record {other:?}"),
        }
    }
}
