// tests/adapter_fixtures.rs
// Every adapter parsed against a captured feed fixture.

use daily_market_tracker::config::{IndicesConfig, TrackerConfig};
use daily_market_tracker::sources::crypto::CryptoMarketsAdapter;
use daily_market_tracker::sources::futures::FuturesAdapter;
use daily_market_tracker::sources::indices::IndexAdapter;
use daily_market_tracker::sources::metals::PreciousMetalAdapter;
use daily_market_tracker::sources::repos::RepoTrendAdapter;
use daily_market_tracker::sources::sectors::SectorBoardAdapter;
use daily_market_tracker::sources::social::SocialTrendAdapter;
use daily_market_tracker::sources::SourceAdapter;
use daily_market_tracker::{FetchError, SourceRecord};

#[tokio::test]
async fn crypto_fixture_parses_market_rows() {
    let adapter =
        CryptoMarketsAdapter::from_fixture(include_str!("fixtures/coingecko_markets.json"));
    let records = adapter.fetch().await.unwrap();
    assert_eq!(records.len(), 3);
    match &records[0] {
        SourceRecord::CryptoAsset(c) => {
            assert_eq!(c.symbol, "BTC");
            assert_eq!(c.price_usd, 98250.0);
            assert_eq!(c.change_7d, 4.87);
            assert!(!c.is_meme, "meme flagging belongs to the normalizer");
        }
        other => panic!("unexpected record {other:?}"),
    }
}

#[tokio::test]
async fn crypto_malformed_body_is_a_parse_failure() {
    let adapter = CryptoMarketsAdapter::from_fixture("<html>upstream maintenance</html>");
    let err = adapter.fetch().await.unwrap_err();
    assert!(matches!(err, FetchError::Parse { .. }));
}

#[tokio::test]
async fn repo_fixture_parses_stars_and_language() {
    let adapter = RepoTrendAdapter::from_fixture(include_str!("fixtures/github_search.json"));
    let records = adapter.fetch().await.unwrap();
    assert_eq!(records.len(), 2);
    match &records[0] {
        SourceRecord::SocialTrend(t) => {
            assert_eq!(t.id, "acme/tensor-serve");
            assert_eq!(t.score, 4215.0);
            assert!(t.title.starts_with("[Rust]"));
        }
        other => panic!("unexpected record {other:?}"),
    }
    match &records[1] {
        // Null description still yields a usable title.
        SourceRecord::SocialTrend(t) => assert_eq!(t.title, "[Python]"),
        other => panic!("unexpected record {other:?}"),
    }
}

#[tokio::test]
async fn social_fixture_skips_empty_titles_and_strips_markup() {
    let adapter = SocialTrendAdapter::from_fixture(
        include_str!("fixtures/nitter_rss.xml"),
        vec!["whale_alert".to_string()],
        10,
    );
    let records = adapter.fetch().await.unwrap();
    assert_eq!(records.len(), 2);
    match &records[1] {
        SourceRecord::SocialTrend(t) => {
            assert_eq!(t.id, "@whale_alert");
            assert_eq!(t.title, "ETH whale moves 40,000 ETH to cold storage");
        }
        other => panic!("unexpected record {other:?}"),
    }
}

#[tokio::test]
async fn index_fixture_keeps_only_requested_symbols() {
    let cfg = IndicesConfig::default();
    let adapter = IndexAdapter::from_fixture(include_str!("fixtures/index_quotes.json"), &cfg);
    let records = adapter.fetch().await.unwrap();
    let codes: Vec<&str> = records.iter().map(|r| r.symbol()).collect();
    assert_eq!(codes, vec!["sh000001", "sz399001", "sh000300"]);
}

#[tokio::test]
async fn metal_fixture_parses_yahoo_quotes() {
    let adapter =
        PreciousMetalAdapter::from_fixture(include_str!("fixtures/yahoo_metals.json"), "USD/oz");
    let records = adapter.fetch().await.unwrap();
    assert_eq!(records.len(), 2);
    match &records[0] {
        SourceRecord::PreciousMetal(m) => {
            assert_eq!(m.name, "Gold");
            assert_eq!(m.price, 2645.3);
            assert_eq!(m.unit, "USD/oz");
        }
        other => panic!("unexpected record {other:?}"),
    }
}

#[tokio::test]
async fn futures_fixture_classifies_contracts() {
    let adapter = FuturesAdapter::from_fixture(include_str!("fixtures/futures_contracts.json"));
    let records = adapter.fetch().await.unwrap();
    assert_eq!(records.len(), 4);
    let classes: Vec<String> = records
        .iter()
        .map(|r| match r {
            SourceRecord::FuturesContract(q) => format!("{:?}", q.class),
            other => panic!("unexpected record {other:?}"),
        })
        .collect();
    assert_eq!(classes, vec!["Commodity", "Commodity", "Index", "International"]);
}

#[tokio::test]
async fn sector_fixture_parses_board_rows() {
    let adapter = SectorBoardAdapter::from_fixture(include_str!("fixtures/sector_boards.json"));
    let records = adapter.fetch().await.unwrap();
    assert_eq!(records.len(), 5);
    match &records[0] {
        SourceRecord::Sector(s) => {
            assert_eq!(s.name, "Electronics");
            assert_eq!(s.leading_stocks, vec!["SMIC"]);
            assert_eq!(s.bucket, "other", "bucket assignment happens later");
        }
        other => panic!("unexpected record {other:?}"),
    }
    // Null leader means no leading stocks, not a parse failure.
    match &records[4] {
        SourceRecord::Sector(s) => assert!(s.leading_stocks.is_empty()),
        other => panic!("unexpected record {other:?}"),
    }
}

#[tokio::test]
async fn default_config_builds_all_seven_adapters() {
    let cfg = TrackerConfig::default();
    let registry = daily_market_tracker::build_registry(&cfg);
    assert_eq!(registry.len(), 7);
}
