// src/sources/social.rs
//! Social trend adapter reading per-account Nitter RSS feeds.
//!
//! One feed per configured account; an account whose feed fails is skipped
//! with a warning, and the adapter only fails as a whole when every feed
//! does.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use once_cell::sync::OnceCell;
use quick_xml::de::from_str;
use serde::Deserialize;
use time::format_description::well_known::Rfc2822;
use time::OffsetDateTime;

use crate::config::SocialConfig;
use crate::sources::types::{FetchError, SourceRecord, TrendItem};
use crate::sources::{get_text, SourceAdapter};

const ADAPTER_NAME: &str = "social";

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
}

fn parse_rfc2822(ts: &str) -> Option<DateTime<Utc>> {
    let dt = OffsetDateTime::parse(ts, &Rfc2822).ok()?;
    Utc.timestamp_opt(dt.unix_timestamp(), 0).single()
}

/// Decode entities, strip tags, collapse whitespace. Feed titles arrive as
/// HTML fragments.
fn clean_text(s: &str) -> String {
    let decoded = html_escape::decode_html_entities(s).to_string();

    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    let stripped = re_tags.replace_all(&decoded, "");

    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    re_ws.replace_all(&stripped, " ").trim().to_string()
}

pub struct SocialTrendAdapter {
    mode: Mode,
    accounts: Vec<String>,
    max_items_per_account: usize,
}

enum Mode {
    Http {
        client: reqwest::Client,
        instance: String,
    },
    /// One fixture body stands in for every account's feed.
    Fixture(String),
}

impl SocialTrendAdapter {
    pub fn from_config(cfg: &SocialConfig) -> Self {
        Self {
            mode: Mode::Http {
                client: reqwest::Client::new(),
                instance: cfg.instance.trim_end_matches('/').to_string(),
            },
            accounts: cfg.accounts.clone(),
            max_items_per_account: cfg.max_items_per_account,
        }
    }

    pub fn from_fixture(body: &str, accounts: Vec<String>, max_items_per_account: usize) -> Self {
        Self {
            mode: Mode::Fixture(body.to_string()),
            accounts,
            max_items_per_account,
        }
    }

    fn parse_feed(
        account: &str,
        body: &str,
        cap: usize,
    ) -> Result<Vec<SourceRecord>, FetchError> {
        let rss: Rss = from_str(body).map_err(|e| FetchError::Parse {
            detail: format!("rss for @{account}: {e}"),
        })?;
        let now = Utc::now();

        let mut out = Vec::new();
        for item in rss.channel.item.into_iter().take(cap) {
            let title = clean_text(item.title.as_deref().unwrap_or_default());
            if title.is_empty() {
                continue;
            }
            out.push(SourceRecord::SocialTrend(TrendItem {
                id: format!("@{account}"),
                title,
                score: 0.0,
                url: item.link,
                source: ADAPTER_NAME.to_string(),
                observed_at: item
                    .pub_date
                    .as_deref()
                    .and_then(parse_rfc2822)
                    .unwrap_or(now),
            }));
        }
        Ok(out)
    }
}

#[async_trait]
impl SourceAdapter for SocialTrendAdapter {
    async fn fetch(&self) -> Result<Vec<SourceRecord>, FetchError> {
        let mut records = Vec::new();
        let mut last_err: Option<FetchError> = None;

        for account in &self.accounts {
            let feed = match &self.mode {
                Mode::Http { client, instance } => {
                    let url = format!("{instance}/{account}/rss");
                    match get_text(client, &url).await {
                        Ok(body) => {
                            Self::parse_feed(account, &body, self.max_items_per_account)
                        }
                        Err(e) => Err(e),
                    }
                }
                Mode::Fixture(body) => {
                    Self::parse_feed(account, body, self.max_items_per_account)
                }
            };
            match feed {
                Ok(mut items) => records.append(&mut items),
                Err(e) => {
                    tracing::warn!(account = %account, error = %e, "social feed skipped");
                    last_err = Some(e);
                }
            }
        }

        match (records.is_empty(), last_err) {
            (true, Some(e)) => Err(e),
            _ => Ok(records),
        }
    }

    fn name(&self) -> &'static str {
        ADAPTER_NAME
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_text_strips_markup() {
        let s = "  <p>BTC&nbsp;to&nbsp;the   moon</p> ";
        assert_eq!(clean_text(s), "BTC to the moon");
    }

    #[test]
    fn feed_with_no_items_is_valid_and_empty() {
        let xml = r#"<rss version="2.0"><channel><title>t</title></channel></rss>"#;
        let recs = SocialTrendAdapter::parse_feed("whale_alert", xml, 10).unwrap();
        assert!(recs.is_empty());
    }
}
