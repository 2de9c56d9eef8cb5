// src/sources/indices.rs
//! A-share index quotes via the local market-data gateway.
//!
//! The gateway mirrors the exchange feed as plain JSON:
//! `{"quotes":[{"code":"sh000001","name":"...","price":...,"change":...,
//! "change_pct":...,"volume":...}]}`. Symbols of interest come from config;
//! quotes for codes we did not ask about are dropped.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;

use crate::config::IndicesConfig;
use crate::sources::types::{FetchError, IndexQuote, SourceRecord};
use crate::sources::{get_text, SourceAdapter};

const ADAPTER_NAME: &str = "indices";

#[derive(Debug, Deserialize)]
struct QuoteFeed {
    quotes: Vec<QuoteRow>,
}

#[derive(Debug, Deserialize)]
struct QuoteRow {
    code: String,
    #[serde(default)]
    name: Option<String>,
    price: f64,
    change: f64,
    change_pct: f64,
    #[serde(default)]
    volume: f64,
}

pub struct IndexAdapter {
    mode: Mode,
    /// code -> display name, from config; feed names are a fallback.
    symbols: HashMap<String, String>,
}

enum Mode {
    Http { client: reqwest::Client, url: String },
    Fixture(String),
}

impl IndexAdapter {
    pub fn from_config(cfg: &IndicesConfig) -> Self {
        let codes: Vec<&str> = cfg.symbols.iter().map(|s| s.code.as_str()).collect();
        let url = format!("{}?symbols={}", cfg.quote_url, codes.join(","));
        Self {
            mode: Mode::Http {
                client: reqwest::Client::new(),
                url,
            },
            symbols: cfg
                .symbols
                .iter()
                .map(|s| (s.code.clone(), s.name.clone()))
                .collect(),
        }
    }

    pub fn from_fixture(body: &str, cfg: &IndicesConfig) -> Self {
        Self {
            mode: Mode::Fixture(body.to_string()),
            symbols: cfg
                .symbols
                .iter()
                .map(|s| (s.code.clone(), s.name.clone()))
                .collect(),
        }
    }

    fn parse_quotes(&self, body: &str) -> Result<Vec<SourceRecord>, FetchError> {
        let feed: QuoteFeed = serde_json::from_str(body).map_err(|e| FetchError::Parse {
            detail: format!("index quote json: {e}"),
        })?;
        let observed_at = Utc::now();

        let mut out = Vec::new();
        for row in feed.quotes {
            let Some(configured_name) = self.symbols.get(&row.code) else {
                continue;
            };
            let name = row
                .name
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| configured_name.clone());
            out.push(SourceRecord::Index(IndexQuote {
                code: row.code,
                name,
                price: row.price,
                change: row.change,
                change_pct: row.change_pct,
                volume: row.volume,
                source: ADAPTER_NAME.to_string(),
                observed_at,
            }));
        }
        Ok(out)
    }
}

#[async_trait]
impl SourceAdapter for IndexAdapter {
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
