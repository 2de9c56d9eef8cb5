// src/sources/mod.rs
pub mod crypto;
pub mod futures;
pub mod indices;
pub mod metals;
pub mod repos;
pub mod sectors;
pub mod social;
pub mod types;

use std::sync::Arc;
use std::time::Duration;

use crate::config::TrackerConfig;
use crate::sources::types::{FetchError, SourceRecord};

/// One external data source. Every failure mode must surface as a
/// `FetchError`; implementations never panic and have no side effects
/// beyond the network call.
#[async_trait::async_trait]
pub trait SourceAdapter: Send + Sync {
    async fn fetch(&self) -> Result<Vec<SourceRecord>, FetchError>;
    fn name(&self) -> &'static str;
}

/// Retry/timeout policy applied per adapter by the orchestrator.
#[derive(Debug, Clone, Copy)]
pub struct FetchPolicy {
    pub timeout: Duration,
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            max_attempts: 2,
            backoff: Duration::from_millis(250),
        }
    }
}

/// An adapter plus its run policy, as registered for one pipeline.
#[derive(Clone)]
pub struct RegisteredAdapter {
    pub name: String,
    pub adapter: Arc<dyn SourceAdapter>,
    pub policy: FetchPolicy,
}

impl RegisteredAdapter {
    pub fn new(adapter: Arc<dyn SourceAdapter>, policy: FetchPolicy) -> Self {
        Self {
            name: adapter.name().to_string(),
            adapter,
            policy,
        }
    }
}

/// Build the per-run adapter set from configuration. Disabled adapters are
/// left out entirely; the configured order here fixes the outcome order for
/// every downstream consumer.
pub fn build_registry(cfg: &TrackerConfig) -> Vec<RegisteredAdapter> {
    let mut registry = Vec::new();

    if cfg.adapters.indices.common.enabled {
        registry.push(RegisteredAdapter::new(
            Arc::new(indices::IndexAdapter::from_config(&cfg.adapters.indices)),
            cfg.adapters.indices.common.policy(),
        ));
    }
    if cfg.adapters.sectors.common.enabled {
        registry.push(RegisteredAdapter::new(
            Arc::new(sectors::SectorBoardAdapter::from_config(
                &cfg.adapters.sectors,
            )),
            cfg.adapters.sectors.common.policy(),
        ));
    }
    if cfg.adapters.metals.common.enabled {
        registry.push(RegisteredAdapter::new(
            Arc::new(metals::PreciousMetalAdapter::from_config(
                &cfg.adapters.metals,
            )),
            cfg.adapters.metals.common.policy(),
        ));
    }
    if cfg.adapters.crypto.common.enabled {
        registry.push(RegisteredAdapter::new(
            Arc::new(crypto::CryptoMarketsAdapter::from_config(
                &cfg.adapters.crypto,
            )),
            cfg.adapters.crypto.common.policy(),
        ));
    }
    if cfg.adapters.futures.common.enabled {
        registry.push(RegisteredAdapter::new(
            Arc::new(futures::FuturesAdapter::from_config(&cfg.adapters.futures)),
            cfg.adapters.futures.common.policy(),
        ));
    }
    if cfg.adapters.social.common.enabled {
        registry.push(RegisteredAdapter::new(
            Arc::new(social::SocialTrendAdapter::from_config(
                &cfg.adapters.social,
            )),
            cfg.adapters.social.common.policy(),
        ));
    }
    if cfg.adapters.repos.common.enabled {
        registry.push(RegisteredAdapter::new(
            Arc::new(repos::RepoTrendAdapter::from_config(&cfg.adapters.repos)),
            cfg.adapters.repos.common.policy(),
        ));
    }

    registry
}

/// GET a URL and return the body, mapping transport and status failures to
/// the adapter error taxonomy. 429 is rate limiting everywhere; callers with
/// source-specific conventions (e.g. GitHub's 403) layer on top.
pub(crate) async fn get_text(
    client: &reqwest::Client,
    url: &str,
) -> Result<String, FetchError> {
    let resp = client
        .get(url)
        .send()
        .await
        .map_err(|e| FetchError::Unreachable {
            detail: e.to_string(),
        })?;
    let status = resp.status();
    if status.as_u16() == 429 {
        return Err(FetchError::RateLimited {
            detail: format!("http status {status} from {url}"),
        });
    }
    if !status.is_success() {
        return Err(FetchError::Unreachable {
            detail: format!("http status {status} from {url}"),
        });
    }
    resp.text().await.map_err(|e| FetchError::Unreachable {
        detail: format!("reading body: {e}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TrackerConfig;

    #[test]
    fn registry_skips_disabled_adapters() {
        let mut cfg = TrackerConfig::default();
        cfg.adapters.futures.common.enabled = false;
        cfg.adapters.social.common.enabled = false;
        let names: Vec<String> = build_registry(&cfg).iter().map(|r| r.name.clone()).collect();
        assert_eq!(names, vec!["indices", "sectors", "metals", "crypto", "repos"]);
    }

    #[test]
    fn registry_preserves_configured_order() {
        let cfg = TrackerConfig::default();
        let names: Vec<String> = build_registry(&cfg).iter().map(|r| r.name.clone()).collect();
        assert_eq!(
            names,
            vec!["indices", "sectors", "metals", "crypto", "futures", "social", "repos"]
        );
    }
}
