// src/sources/metals.rs
//! Precious metal quotes via the Yahoo v7 quote endpoint (GC=F, SI=F, ...).

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;

use crate::config::MetalsConfig;
use crate::sources::types::{FetchError, MetalQuote, SourceRecord};
use crate::sources::{get_text, SourceAdapter};

const ADAPTER_NAME: &str = "metals";

#[derive(Debug, Deserialize)]
struct QuoteEnvelope {
    #[serde(rename = "quoteResponse")]
    quote_response: QuoteResponse,
}

#[derive(Debug, Deserialize)]
struct QuoteResponse {
    result: Vec<YahooQuote>,
}

#[derive(Debug, Deserialize)]
struct YahooQuote {
    symbol: String,
    #[serde(rename = "shortName", default)]
    short_name: Option<String>,
    #[serde(rename = "regularMarketPrice")]
    price: f64,
    #[serde(rename = "regularMarketChange", default)]
    change: f64,
    #[serde(rename = "regularMarketChangePercent", default)]
    change_pct: f64,
}

pub struct PreciousMetalAdapter {
    mode: Mode,
    unit: String,
}

enum Mode {
    Http { client: reqwest::Client, url: String },
    Fixture(String),
}

impl PreciousMetalAdapter {
    pub fn from_config(cfg: &MetalsConfig) -> Self {
        let url = format!("{}?symbols={}", cfg.quote_url, cfg.symbols.join(","));
        Self {
            mode: Mode::Http {
                client: reqwest::Client::new(),
                url,
            },
            unit: cfg.unit.clone(),
        }
    }

    pub fn from_fixture(body: &str, unit: &str) -> Self {
        Self {
            mode: Mode::Fixture(body.to_string()),
            unit: unit.to_string(),
        }
    }

    fn parse_quotes(&self, body: &str) -> Result<Vec<SourceRecord>, FetchError> {
        let envelope: QuoteEnvelope =
            serde_json::from_str(body).map_err(|e| FetchError::Parse {
                detail: format!("yahoo quote json: {e}"),
            })?;
        let observed_at = Utc::now();

        Ok(envelope
            .quote_response
            .result
            .into_iter()
            .map(|q| {
                let name = q
                    .short_name
                    .filter(|n| !n.is_empty())
                    .unwrap_or_else(|| q.symbol.clone());
                SourceRecord::PreciousMetal(MetalQuote {
                    symbol: q.symbol,
                    name,
                    price: q.price,
                    change: q.change,
                    change_pct: q.change_pct,
                    unit: self.unit.clone(),
                    source: ADAPTER_NAME.to_string(),
                    observed_at,
                })
            })
            .collect())
    }
}

#[async_trait]
impl SourceAdapter for PreciousMetalAdapter {
    async fn fetch(&self) -> Result<Vec<SourceRecord>, FetchError> {
        let body = match &self.mode {
            Mode::Http { client, url } => get_text(client, url).await?,
            Mode::Fixture(body) => body.clone(),
        };
        self.parse_quotes(&body)
    }

    fn name(&self) -> &'static str {
        ADAPTER_NAME
    }
}
