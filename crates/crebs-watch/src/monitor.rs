use serde::Serialize;

use crate::config::Config;
use crate::diff::{Diff, diff};
use crate::format::{render_changes, render_failure};
use crate::notifier::{NotifyError, TelegramNotifier};
use crate::parser::{extract_bookings, extract_results};
use crate::proxy::{build_candidates, fetch_proxy_list};
use crate::scraper::{PortalScraper, ScraperError};
use crate::snapshot::Snapshot;
use crate::store::{JsonFileStore, SnapshotStore, StoreError};
use crate::types::ChangeRecord;

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error(transparent)]
    Scraper(#[from] ScraperError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("Failed to set up notifier: {0}")]
    Notify(#[from] NotifyError),
}

#[derive(Debug, Clone)]
pub struct CheckOutcome {
    pub diff: Diff,
    /// Rendered notification, present only when there is something to report.
    pub message: Option<String>,
    pub persisted: bool,
}

/// Compares fresh snapshots against the persisted one and keeps it current.
pub struct Monitor<S> {
    store: S,
    dry_run: bool,
}

impl<S: SnapshotStore> Monitor<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            dry_run: false,
        }
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Diffs `current` against the stored snapshot. When there are reportable
    /// changes the message is rendered and `current` is saved, once.
    pub fn check(&mut self, current: &Snapshot) -> Result<CheckOutcome, StoreError> {
        let previous = self.store.load();
        let diff = diff(current, &previous);

        if !diff.should_persist() {
            if diff.changed {
                log::info!("Snapshot differs only by removed entries; nothing to report");
            } else {
                log::info!("No changes detected");
            }
            return Ok(CheckOutcome {
                diff,
                message: None,
                persisted: false,
            });
        }

        log::info!("Detected {} change(s)", diff.changes.len());
        let message = render_changes(&diff.changes);

        let persisted = if self.dry_run {
            log::info!("Dry run: state not saved");
            false
        } else {
            self.store.save(current)?;
            true
        };

        Ok(CheckOutcome {
            diff,
            message: Some(message),
            persisted,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub results: usize,
    pub bookings: usize,
    pub changes: Vec<ChangeRecord>,
    pub message: Option<String>,
    pub persisted: bool,
    pub notified: bool,
}

/// One full run: fetch, extract, normalize, diff, persist and notify.
///
/// When every network path fails a failure notice is sent (best effort) and
/// the fetch error is returned.
pub async fn run(config: &Config) -> Result<RunReport, RunError> {
    let notifier = match &config.telegram {
        Some(telegram) if !config.dry_run => Some(TelegramNotifier::new(telegram.clone())?),
        Some(_) => None,
        None => {
            log::info!("Telegram credentials not set; notifications disabled");
            None
        }
    };

    let store = JsonFileStore::open(&config.state_path)?;
    let mut monitor = Monitor::new(store).dry_run(config.dry_run);

    let mut proxies = config.proxy.proxies.clone();
    if let Some(source) = &config.proxy.source_url {
        match fetch_proxy_list(source, config.portal.timeout).await {
            Ok(fetched) => proxies.extend(fetched),
            Err(e) => log::warn!("Failed to fetch proxy list: {}", e),
        }
    }
    let candidates = build_candidates(
        config.proxy.direct,
        proxies,
        config.proxy.max_attempts,
        config.proxy.shuffle,
    );

    let scraper = PortalScraper::new(config.portal.clone());
    let pages = match scraper
        .fetch_with_candidates(&config.credentials, &candidates)
        .await
    {
        Ok(pages) => pages,
        Err(e) => {
            log::error!("Giving up: {}", e);
            if let Some(notifier) = &notifier {
                notifier.notify(&render_failure(&e)).await;
            }
            return Err(e.into());
        }
    };

    let results = extract_results(&pages.results_html);
    let bookings = extract_bookings(&pages.bookings_html);
    log::info!(
        "Extracted {} result(s) and {} booking(s)",
        results.len(),
        bookings.len()
    );

    let current = Snapshot::from_records(&results, &bookings);
    let outcome = monitor.check(&current)?;

    let notified = match (&outcome.message, &notifier) {
        (Some(message), Some(notifier)) => notifier.notify(message).await,
        _ => false,
    };

    Ok(RunReport {
        results: results.len(),
        bookings: bookings.len(),
        changes: outcome.diff.changes,
        message: outcome.message,
        persisted: outcome.persisted,
        notified,
    })
}
