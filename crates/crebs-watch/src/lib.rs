pub mod config;
pub mod diff;
pub mod format;
pub mod monitor;
pub mod notifier;
mod parser;
pub mod proxy;
pub mod scraper;
pub mod snapshot;
pub mod store;
#[cfg(test)]
mod test_support;
pub mod types;

pub use config::Config;
pub use diff::{Diff, diff};
pub use monitor::{Monitor, RunError, RunReport, run};
pub use parser::{extract_bookings, extract_results};
pub use scraper::{NetworkPath, PortalScraper, ScraperError};
pub use snapshot::Snapshot;
pub use store::{JsonFileStore, SnapshotStore, StoreError};
