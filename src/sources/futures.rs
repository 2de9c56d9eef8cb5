// src/sources/futures.rs
//! Futures contracts adapter (commodity, index and international contracts
//! from the market-data gateway).

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;

use crate::config::FuturesConfig;
use crate::sources::types::{FetchError, FuturesClass, FuturesQuote, SourceRecord};
use crate::sources::{get_text, SourceAdapter};

const ADAPTER_NAME: &str = "futures";

#[derive(Debug, Deserialize)]
struct ContractFeed {
    contracts: Vec<ContractRow>,
}

#[derive(Debug, Deserialize)]
struct ContractRow {
    code: String,
    name: String,
    price: f64,
    change: f64,
    change_pct: f64,
    class: String,
}

fn parse_class(raw: &str) -> Result<FuturesClass, FetchError> {
    match raw {
        "commodity" => Ok(FuturesClass::Commodity),
        "index" => Ok(FuturesClass::Index),
        "international" => Ok(FuturesClass::International),
        other => Err(FetchError::Parse {
            detail: format!("unknown futures class {other:?}"),
        }),
    }
}

pub struct FuturesAdapter {
    mode: Mode,
}

enum Mode {
    Http { client: reqwest::Client, url: String },
    Fixture(String),
}

impl FuturesAdapter {
    pub fn from_config(cfg: &FuturesConfig) -> Self {
        let url = format!("{}?codes={}", cfg.quote_url, cfg.codes.join(","));
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

    fn parse_contracts(body: &str) -> Result<Vec<SourceRecord>, FetchError> {
        let feed: ContractFeed = serde_json::from_str(body).map_err(|e| FetchError::Parse {
            detail: format!("futures contract json: {e}"),
        })?;
        let observed_at = Utc::now();

        let mut out = Vec::with_capacity(feed.contracts.len());
        for row in feed.contracts {
            let class = parse_class(&row.class)?;
            out.push(SourceRecord::FuturesContract(FuturesQuote {
                code: row.code,
                name: row.name,
                price: row.price,
                change: row.change,
                change_pct: row.change_pct,
                class,
                source: ADAPTER_NAME.to_string(),
                observed_at,
            }));
        }
        Ok(out)
    }
}

#[async_trait]
impl SourceAdapter for FuturesAdapter {
    async fn fetch(&self) -> Result<Vec<SourceRecord>, FetchError> {
        let body = match &self.mode {
            Mode::Http { client, url } => get_text(client, url).await?,
            Mode::Fixture(body) => body.clone(),
        };
        Self::parse_contracts(&body)
    }

    fn name(&self) -> &'static str {
        ADAPTER_NAME
    }
}
