// src/sources/sectors.rs
//! Industry sector board adapter. Bucket assignment (tech/cyclical/...)
//! is the normalizer's job; records leave here with bucket = "other".

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;

use crate::config::SectorsConfig;
use crate::sources::types::{FetchError, SectorQuote, SourceRecord};
use crate::sources::{get_text, SourceAdapter};

const ADAPTER_NAME: &str = "sectors";

#[derive(Debug, Deserialize)]
struct BoardFeed {
    boards: Vec<BoardRow>,
}

#[derive(Debug, Deserialize)]
struct BoardRow {
    name: String,
    change_pct: f64,
    #[serde(default)]
    leader: Option<String>,
}

pub struct SectorBoardAdapter {
    mode: Mode,
}

enum Mode {
    Http { client: reqwest::Client, url: String },
    Fixture(String),
}

impl SectorBoardAdapter {
    pub fn from_config(cfg: &SectorsConfig) -> Self {
        Self {
            mode: Mode::Http {
                client: reqwest::Client::new(),
                url: cfg.board_url.clone(),
            },
        }
    }

    pub fn from_fixture(body: &str) -> Self {
        Self {
            mode: Mode::Fixture(body.to_string()),
        }
    }

    fn parse_boards(body: &str) -> Result<Vec<SourceRecord>, FetchError> {
        let feed: BoardFeed = serde_json::from_str(body).map_err(|e| FetchError::Parse {
            detail: format!("sector board json: {e}"),
        })?;
        let observed_at = Utc::now();

        Ok(feed
            .boards
            .into_iter()
            .map(|row| {
                let leading_stocks = row
                    .leader
                    .filter(|l| !l.is_empty())
                    .map(|l| vec![l])
                    .unwrap_or_default();
                SourceRecord::Sector(SectorQuote {
                    name: row.name,
                    change_pct: row.change_pct,
                    leading_stocks,
                    bucket: "other".to_string(),
                    source: ADAPTER_NAME.to_string(),
                    observed_at,
                })
            })
            .collect())
    }
}

#[async_trait]
impl SourceAdapter for SectorBoardAdapter {
    async fn fetch(&self) -> Result<Vec<SourceRecord>, FetchError> {
        let body = match &self.mode {
            Mode::Http { client, url } => get_text(client, url).await?,
            Mode::Fixture(body) => body.clone(),
        };
        Self::parse_boards(&body)
    }

    fn name(&self) -> &'static str {
        ADAPTER_NAME
    }
}
