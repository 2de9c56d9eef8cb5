//! # Report Renderer
//! Turns one `Snapshot` (plus the most recent prior snapshot, when the
//! history has one) into a fixed-section plain-text report and a
//! machine-readable JSON form. Failed sources are always itemized with
//! their cause; partial data is never dressed up as complete.

use std::collections::HashMap;
use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::snapshot::{Health, Snapshot};
use crate::sources::types::{FetchOutcome, FuturesClass, SourceRecord};

/// The pipeline's product for one run. `archived` carries the history entry
/// id once persistence succeeds, and stays `None` when it fails.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderedReport {
    pub generated_at: DateTime<Utc>,
    pub health: Health,
    pub archived: Option<String>,
    pub text: String,
    pub snapshot: serde_json::Value,
}

fn kind_key(record: &SourceRecord) -> &'static str {
    match record {
        SourceRecord::Index(_) => "index",
        SourceRecord::Sector(_) => "sector",
        SourceRecord::PreciousMetal(_) => "precious_metal",
        SourceRecord::CryptoAsset(_) => "crypto_asset",
        SourceRecord::FuturesContract(_) => "futures_contract",
        SourceRecord::SocialTrend(_) => "social_trend",
    }
}

/// (kind, symbol) -> prior primary value. Only successful prior outcomes
/// contribute, so a metric missing on either side simply yields no delta.
fn prior_values(prior: Option<&Snapshot>) -> HashMap<(&'static str, String), f64> {
    let mut map = HashMap::new();
    if let Some(prior) = prior {
        for record in prior.records() {
            if let Some(value) = record.primary_value() {
                map.insert((kind_key(record), record.symbol().to_string()), value);
            }
        }
    }
    map
}

/// Day-over-day suffix, or empty when there is nothing to compare against.
/// A zero prior value suppresses the percentage, never divides by it.
fn delta_suffix(
    priors: &HashMap<(&'static str, String), f64>,
    record: &SourceRecord,
) -> String {
    let Some(current) = record.primary_value() else {
        return String::new();
    };
    let Some(prior) = priors.get(&(kind_key(record), record.symbol().to_string())) else {
        return String::new();
    };
    let abs = current - prior;
    if *prior == 0.0 {
        format!(" | d/d {abs:+.2}")
    } else {
        let pct = abs / prior * 100.0;
        format!(" | d/d {abs:+.2} ({pct:+.2}%)")
    }
}

fn section(text: &mut String, title: &str) {
    let _ = writeln!(text, "\n[{title}]");
}

fn unavailable_line(text: &mut String, outcome: &FetchOutcome) {
    let error = outcome.error().map(|e| e.to_string()).unwrap_or_default();
    if outcome.attempts > 1 {
        let _ = writeln!(
            text,
            "  unavailable: {error} ({} attempts)",
            outcome.attempts
        );
    } else {
        let _ = writeln!(text, "  unavailable: {error}");
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_chars).collect();
        format!("{cut}...")
    }
}

pub fn render(snapshot: &Snapshot, prior: Option<&Snapshot>) -> RenderedReport {
    let priors = prior_values(prior);
    let mut text = String::new();

    let ok = snapshot.outcomes.iter().filter(|o| o.is_success()).count();
    let total = snapshot.outcomes.len();
    let _ = writeln!(
        text,
        "Daily Market Report - {}",
        snapshot.generated_at.format("%Y-%m-%d %H:%M UTC")
    );
    let _ = writeln!(text, "Health: {} ({ok}/{total} sources ok)", snapshot.health);

    let failed: Vec<&FetchOutcome> = snapshot.failed_outcomes().collect();
    if !failed.is_empty() {
        let _ = writeln!(text, "\nUnavailable sources:");
        for outcome in &failed {
            let error = outcome.error().map(|e| e.to_string()).unwrap_or_default();
            let _ = writeln!(text, "  - {}: {error}", outcome.adapter);
        }
    }

    render_indices(&mut text, snapshot, &priors);
    render_sectors(&mut text, snapshot);
    render_metals(&mut text, snapshot, &priors);
    render_crypto(&mut text, snapshot, &priors);
    render_futures(&mut text, snapshot, &priors);
    render_trends(&mut text, snapshot, "social", "Social Trends");
    render_trends(&mut text, snapshot, "repos", "Repository Trends");

    RenderedReport {
        generated_at: snapshot.generated_at,
        health: snapshot.health,
        archived: None,
        text,
        snapshot: serde_json::to_value(snapshot).expect("snapshot serializes"),
    }
}

fn render_indices(
    text: &mut String,
    snapshot: &Snapshot,
    priors: &HashMap<(&'static str, String), f64>,
) {
    let Some(outcome) = snapshot.outcome("indices") else {
        return;
    };
    section(text, "Indices");
    if !outcome.is_success() {
        unavailable_line(text, outcome);
        return;
    }
    for record in outcome.records() {
        if let SourceRecord::Index(q) = record {
            let _ = writeln!(
                text,
                "  {}: {:.2} ({:+.2}%){}",
                q.name,
                q.price,
                q.change_pct,
                delta_suffix(priors, record)
            );
        }
    }
}

fn render_sectors(text: &mut String, snapshot: &Snapshot) {
    let Some(outcome) = snapshot.outcome("sectors") else {
        return;
    };
    section(text, "Sectors");
    if !outcome.is_success() {
        unavailable_line(text, outcome);
        return;
    }

    let mut by_name: HashMap<&str, f64> = HashMap::new();
    for record in outcome.records() {
        if let SourceRecord::Sector(s) = record {
            by_name.insert(s.name.as_str(), s.change_pct);
        }
    }

    // Focus buckets first, leftovers summarized.
    for (bucket, names) in &snapshot.sector_buckets {
        if bucket == "other" {
            continue;
        }
        let _ = writeln!(text, "  {bucket}:");
        for name in names {
            let change = by_name.get(name.as_str()).copied().unwrap_or(0.0);
            let _ = writeln!(text, "    {name}: {change:+.2}%");
        }
    }
    if let Some(other) = snapshot.sector_buckets.get("other") {
        let _ = writeln!(text, "  other: {} sectors", other.len());
    }

    // Top movers across the whole board.
    let mut movers: Vec<(&str, f64)> = by_name.into_iter().collect();
    movers.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    if let (Some(top), Some(bottom)) = (movers.first(), movers.last()) {
        if movers.len() > 1 {
            let _ = writeln!(
                text,
                "  top {}: {:+.2}% / bottom {}: {:+.2}%",
                top.0, top.1, bottom.0, bottom.1
            );
        }
    }
}

fn render_metals(
    text: &mut String,
    snapshot: &Snapshot,
    priors: &HashMap<(&'static str, String), f64>,
) {
    let Some(outcome) = snapshot.outcome("metals") else {
        return;
    };
    section(text, "Precious Metals");
    if !outcome.is_success() {
        unavailable_line(text, outcome);
        return;
    }
    for record in outcome.records() {
        if let SourceRecord::PreciousMetal(q) = record {
            let _ = writeln!(
                text,
                "  {}: {:.2} {} ({:+.2}%){}",
                q.name,
                q.price,
                q.unit,
                q.change_pct,
                delta_suffix(priors, record)
            );
        }
    }
}

fn render_crypto(
    text: &mut String,
    snapshot: &Snapshot,
    priors: &HashMap<(&'static str, String), f64>,
) {
    let Some(outcome) = snapshot.outcome("crypto") else {
        return;
    };
    section(text, "Crypto");
    if !outcome.is_success() {
        unavailable_line(text, outcome);
        return;
    }

    let coins: Vec<&SourceRecord> = outcome.records().iter().collect();
    for record in &coins {
        if let SourceRecord::CryptoAsset(c) = record {
            let _ = writeln!(
                text,
                "  {}: ${:.2} 24h {:+.2}% 7d {:+.2}%{}",
                c.symbol,
                c.price_usd,
                c.change_24h,
                c.change_7d,
                delta_suffix(priors, record)
            );
        }
    }

    let memes: Vec<&str> = coins
        .iter()
        .filter_map(|r| match r {
            SourceRecord::CryptoAsset(c) if c.is_meme => Some(c.symbol.as_str()),
            _ => None,
        })
        .collect();
    if !memes.is_empty() {
        let _ = writeln!(text, "  meme subset: {}", memes.join(", "));
    }

    let mut by_change: Vec<(&str, f64)> = coins
        .iter()
        .filter_map(|r| match r {
            SourceRecord::CryptoAsset(c) => Some((c.symbol.as_str(), c.change_24h)),
            _ => None,
        })
        .collect();
    by_change.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    if let (Some(top), Some(bottom)) = (by_change.first(), by_change.last()) {
        if by_change.len() > 1 {
            let _ = writeln!(
                text,
                "  24h top {}: {:+.2}% / bottom {}: {:+.2}%",
                top.0, top.1, bottom.0, bottom.1
            );
        }
    }
}

fn render_futures(
    text: &mut String,
    snapshot: &Snapshot,
    priors: &HashMap<(&'static str, String), f64>,
) {
    let Some(outcome) = snapshot.outcome("futures") else {
        return;
    };
    section(text, "Futures");
    if !outcome.is_success() {
        unavailable_line(text, outcome);
        return;
    }
    for class in [
        FuturesClass::Commodity,
        FuturesClass::Index,
        FuturesClass::International,
    ] {
        let rows: Vec<&SourceRecord> = outcome
            .records()
            .iter()
            .filter(|r| matches!(r, SourceRecord::FuturesContract(q) if q.class == class))
            .collect();
        if rows.is_empty() {
            continue;
        }
        let label = match class {
            FuturesClass::Commodity => "commodity",
            FuturesClass::Index => "index",
            FuturesClass::International => "international",
        };
        let _ = writeln!(text, "  {label}:");
        for record in rows {
            if let SourceRecord::FuturesContract(q) = record {
                let _ = writeln!(
                    text,
                    "    {}: {:.2} ({:+.2}%){}",
                    q.name,
                    q.price,
                    q.change_pct,
                    delta_suffix(priors, record)
                );
            }
        }
    }
}

fn render_trends(text: &mut String, snapshot: &Snapshot, adapter: &str, title: &str) {
    let Some(outcome) = snapshot.outcome(adapter) else {
        return;
    };
    section(text, title);
    if !outcome.is_success() {
        unavailable_line(text, outcome);
        return;
    }
    if outcome.records().is_empty() {
        let _ = writeln!(text, "  nothing trending today");
        return;
    }
    for record in outcome.records() {
        if let SourceRecord::SocialTrend(t) = record {
            if t.score > 0.0 {
                let _ = writeln!(
                    text,
                    "  {} ({:.0} stars) {}",
                    t.id,
                    t.score,
                    truncate(&t.title, 80)
                );
            } else {
                let _ = writeln!(text, "  {}: {}", t.id, truncate(&t.title, 80));
            }
        }
    }
}
