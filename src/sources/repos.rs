// src/sources/repos.rs
//! Repository trend adapter over the GitHub search API: repositories created
//! in the lookback window with enough stars, ordered by stars. GitHub
//! signals rate limiting with 403 as well as 429.

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use serde::Deserialize;

use crate::config::ReposConfig;
use crate::sources::types::{FetchError, SourceRecord, TrendItem};
use crate::sources::SourceAdapter;

const ADAPTER_NAME: &str = "repos";

#[derive(Debug, Deserialize)]
struct SearchEnvelope {
    #[serde(default)]
    items: Vec<RepoRow>,
}

#[derive(Debug, Deserialize)]
struct RepoRow {
    full_name: String,
    #[serde(default)]
    description: Option<String>,
    stargazers_count: u64,
    #[serde(default)]
    language: Option<String>,
    html_url: String,
}

pub struct RepoTrendAdapter {
    mode: Mode,
}

enum Mode {
    Http {
        client: reqwest::Client,
        api_base: String,
        min_stars: u32,
        lookback_days: u32,
        fetch_count: usize,
        token: Option<String>,
    },
    Fixture(String),
}

impl RepoTrendAdapter {
    pub fn from_config(cfg: &ReposConfig) -> Self {
        Self {
            mode: Mode::Http {
                client: reqwest::Client::new(),
                api_base: cfg.api_base.trim_end_matches('/').to_string(),
                min_stars: cfg.min_stars,
                lookback_days: cfg.lookback_days,
                fetch_count: cfg.fetch_count,
                token: cfg.resolved_token(),
            },
        }
    }

    pub fn from_fixture(body: &str) -> Self {
        Self {
            mode: Mode::Fixture(body.to_string()),
        }
    }

    fn parse_search(body: &str) -> Result<Vec<SourceRecord>, FetchError> {
        let envelope: SearchEnvelope =
            serde_json::from_str(body).map_err(|e| FetchError::Parse {
                detail: format!("github search json: {e}"),
            })?;
        let observed_at = Utc::now();

        Ok(envelope
            .items
            .into_iter()
            .map(|row| {
                let mut title = row.description.unwrap_or_default();
                if let Some(lang) = row.language.filter(|l| !l.is_empty()) {
                    title = if title.is_empty() {
                        format!("[{lang}]")
                    } else {
                        format!("[{lang}] {title}")
                    };
                }
                SourceRecord::SocialTrend(TrendItem {
                    id: row.full_name,
                    title,
                    score: row.stargazers_count as f64,
                    url: Some(row.html_url),
                    source: ADAPTER_NAME.to_string(),
                    observed_at,
                })
            })
            .collect())
    }

    async fn fetch_http(
        client: &reqwest::Client,
        api_base: &str,
        min_stars: u32,
        lookback_days: u32,
        fetch_count: usize,
        token: Option<&str>,
    ) -> Result<String, FetchError> {
        let since = (Utc::now() - ChronoDuration::days(i64::from(lookback_days)))
            .format("%Y-%m-%d")
            .to_string();
        let url = format!(
            "{api_base}/search/repositories?q=created:>{since}+stars:>{min_stars}&sort=stars&order=desc&per_page={fetch_count}"
        );

        let mut req = client
            .get(&url)
            .header("accept", "application/vnd.github+json")
            .header("user-agent", "daily-market-tracker");
        if let Some(token) = token {
            req = req.header("authorization", format!("Bearer {token}"));
        }

        let resp = req.send().await.map_err(|e| FetchError::Unreachable {
            detail: e.to_string(),
        })?;
        let status = resp.status().as_u16();
        if status == 403 || status == 429 {
            return Err(FetchError::RateLimited {
                detail: format!("http status {status} from github search"),
            });
        }
        if !resp.status().is_success() {
            return Err(FetchError::Unreachable {
                detail: format!("http status {status} from github search"),
            });
        }
        resp.text().await.map_err(|e| FetchError::Unreachable {
            detail: format!("reading body: {e}"),
        })
    }
}

#[async_trait]
impl SourceAdapter for RepoTrendAdapter {
    async fn fetch(&self) -> Result<Vec<SourceRecord>, FetchError> {
        let body = match &self.mode {
            Mode::Http {
                client,
                api_base,
                min_stars,
                lookback_days,
                fetch_count,
                token,
            } => {
                Self::fetch_http(
                    client,
                    api_base,
                    *min_stars,
                    *lookback_days,
                    *fetch_count,
                    token.as_deref(),
                )
                .await?
            }
            Mode::Fixture(body) => body.clone(),
        };
        Self::parse_search(&body)
    }

    fn name(&self) -> &'static str {
        ADAPTER_NAME
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_results_today_is_an_empty_success() {
        let recs = RepoTrendAdapter::parse_search(r#"{"total_count":0,"items":[]}"#).unwrap();
        assert!(recs.is_empty());
    }
}
