use std::collections::HashSet;
use std::sync::LazyLock;
use std::time::Duration;

use rand::seq::SliceRandom;
use regex::Regex;
use reqwest::Client;

use crate::scraper::{NetworkPath, ScraperError};

static RE_PROXY_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:(https?)://)?([A-Za-z0-9.\-]+):(\d{1,5})$").expect("invalid regex: proxy line")
});

/// Parses a plain-text proxy list, one `host:port` per line.
///
/// Lines that do not look like a proxy are skipped. Entries are returned as
/// `scheme://host:port` (defaulting to `http`), deduplicated in first-seen
/// order.
pub fn parse_proxy_list(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut proxies = Vec::new();

    for line in text.lines().map(str::trim) {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some(caps) = RE_PROXY_LINE.captures(line) else {
            log::debug!("Skipping proxy line '{}'", line);
            continue;
        };
        let Ok(port) = caps[3].parse::<u16>() else {
            continue;
        };
        if port == 0 {
            continue;
        }

        let scheme = caps.get(1).map_or("http", |m| m.as_str());
        let proxy = format!("{}://{}:{}", scheme, &caps[2], port);
        if seen.insert(proxy.clone()) {
            proxies.push(proxy);
        }
    }

    proxies
}

/// Downloads and parses a public proxy list.
pub async fn fetch_proxy_list(url: &str, timeout: Duration) -> Result<Vec<String>, ScraperError> {
    log::info!("Fetching proxy list from {}...", url);
    let client = Client::builder().timeout(timeout).build()?;
    let text = client
        .get(url)
        .send()
        .await
        .inspect_err(|e| log::error!("HTTP error: {e:?}"))?
        .error_for_status()?
        .text()
        .await
        .inspect_err(|e| log::error!("Decode error: {e:?}"))?;

    let proxies = parse_proxy_list(&text);
    log::info!("Proxy list yielded {} candidate(s)", proxies.len());
    Ok(proxies)
}

/// Orders network paths for one run: the direct path first when enabled,
/// then proxies (optionally shuffled), capped at `max_attempts` in total.
pub fn build_candidates(
    direct: bool,
    mut proxies: Vec<String>,
    max_attempts: usize,
    shuffle: bool,
) -> Vec<NetworkPath> {
    if shuffle {
        proxies.shuffle(&mut rand::thread_rng());
    }

    let mut candidates = Vec::with_capacity(proxies.len() + 1);
    if direct {
        candidates.push(NetworkPath::Direct);
    }
    candidates.extend(proxies.into_iter().map(NetworkPath::Proxy));
    candidates.truncate(max_attempts);
    candidates
}
