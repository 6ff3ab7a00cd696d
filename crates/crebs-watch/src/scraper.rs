use std::fmt::Display;

use reqwest::header::{HeaderMap, HeaderValue, ORIGIN, REFERER};
use reqwest::{Client, Proxy, StatusCode, Url};

use crate::config::{Credentials, PortalConfig};

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Text only present on pages served to a signed-in candidate.
pub const SIGNED_IN_MARKERS: [&str; 2] = ["Signout", "Welcome"];

#[derive(Debug, thiserror::Error)]
pub enum ScraperError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("Unexpected status {status} from {url}")]
    Status { url: String, status: StatusCode },
    #[error("Login rejected: no signed-in marker in response from {url}")]
    NotSignedIn { url: String },
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    #[error("Invalid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),
    #[error("All {attempts} network path(s) failed; last error: {last}")]
    Exhausted { attempts: usize, last: String },
}

/// How a request leaves this machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkPath {
    Direct,
    Proxy(String),
}

impl Display for NetworkPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NetworkPath::Direct => write!(f, "direct"),
            NetworkPath::Proxy(url) => write!(f, "proxy {}", url),
        }
    }
}

/// Raw page bodies from one signed-in session.
#[derive(Debug, Clone)]
pub struct PortalPages {
    pub results_html: String,
    pub bookings_html: String,
}

#[derive(Debug, Clone)]
pub struct PortalScraper {
    config: PortalConfig,
}

impl PortalScraper {
    pub fn new(config: PortalConfig) -> Self {
        Self { config }
    }

    fn client_for(&self, path: &NetworkPath) -> Result<Client, ScraperError> {
        let base = Url::parse(&self.config.base_url)
            .map_err(|e| ScraperError::InvalidUrl(format!("{}: {}", self.config.base_url, e)))?;

        let mut headers = HeaderMap::new();
        headers.insert(
            ORIGIN,
            HeaderValue::from_str(&base.origin().ascii_serialization())?,
        );
        headers.insert(REFERER, HeaderValue::from_str(base.as_str())?);

        let mut builder = Client::builder()
            .timeout(self.config.timeout)
            .user_agent(BROWSER_USER_AGENT)
            .default_headers(headers)
            .cookie_store(true);

        builder = match path {
            NetworkPath::Direct => builder.no_proxy(),
            NetworkPath::Proxy(url) => builder.proxy(Proxy::all(url)?),
        };

        Ok(builder.build()?)
    }

    /// Signs in and fetches the results and booking pages over `path`.
    ///
    /// The results page is the body returned by the login POST; the booking
    /// list is fetched afterwards with the same session cookies.
    pub async fn login_and_fetch(
        &self,
        credentials: &Credentials,
        path: &NetworkPath,
    ) -> Result<PortalPages, ScraperError> {
        let client = self.client_for(path)?;
        let url = &self.config.base_url;

        log::info!("Fetching login page via {}...", path);
        client
            .get(url)
            .send()
            .await
            .inspect_err(|e| log::debug!("Warm-up request failed: {e:?}"))?;

        log::info!("Logging in...");
        let response = client
            .post(url)
            .form(&[
                ("txtEmail", credentials.email.as_str()),
                ("txtPassword", credentials.password.as_str()),
                ("returnUrl", ""),
            ])
            .send()
            .await
            .inspect_err(|e| log::error!("HTTP error: {e:?}"))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(ScraperError::Status {
                url: url.clone(),
                status,
            });
        }

        let results_html = response
            .text()
            .await
            .inspect_err(|e| log::error!("Decode error: {e:?}"))?;

        if !is_signed_in(&results_html) {
            return Err(ScraperError::NotSignedIn { url: url.clone() });
        }

        log::info!("Login successful, fetching booking list...");
        let bookings_html = get_html(&client, &self.config.booking_url).await?;

        Ok(PortalPages {
            results_html,
            bookings_html,
        })
    }

    /// Tries each path in order and returns the first successful fetch.
    pub async fn fetch_with_candidates(
        &self,
        credentials: &Credentials,
        candidates: &[NetworkPath],
    ) -> Result<PortalPages, ScraperError> {
        let mut last = String::from("no network paths to try");

        for (attempt, path) in candidates.iter().enumerate() {
            log::info!("Attempt {}/{} via {}", attempt + 1, candidates.len(), path);
            match self.login_and_fetch(credentials, path).await {
                Ok(pages) => return Ok(pages),
                Err(e) => {
                    log::warn!("Attempt via {} failed: {}", path, e);
                    last = e.to_string();
                }
            }
        }

        Err(ScraperError::Exhausted {
            attempts: candidates.len(),
            last,
        })
    }
}

pub fn is_signed_in(html: &str) -> bool {
    SIGNED_IN_MARKERS.iter().any(|marker| html.contains(marker))
}

async fn get_html(client: &Client, url: &str) -> Result<String, ScraperError> {
    let response = client
        .get(url)
        .send()
        .await
        .inspect_err(|e| log::error!("HTTP error: {e:?}"))?;

    let status = response.status();
    if status != StatusCode::OK {
        return Err(ScraperError::Status {
            url: url.to_string(),
            status,
        });
    }

    Ok(response
        .text()
        .await
        .inspect_err(|e| log::error!("Decode error: {e:?}"))?)
}
