use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://220.156.188.226/CREBS/";
pub const DEFAULT_BOOKING_PATH: &str = "Booking/BookingList";
pub const DEFAULT_STATE_FILE: &str = "state.json";
pub const DEFAULT_MAX_ATTEMPTS: usize = 10;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_TELEGRAM_API: &str = "https://api.telegram.org";

#[derive(Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"********")
            .finish()
    }
}

#[derive(Clone)]
pub struct TelegramConfig {
    pub token: String,
    pub chat_id: String,
    pub api_base: String,
}

impl TelegramConfig {
    /// Notifications are enabled only when both values are present and non-empty.
    pub fn from_parts(token: Option<String>, chat_id: Option<String>) -> Option<Self> {
        let token = token.filter(|t| !t.trim().is_empty())?;
        let chat_id = chat_id.filter(|c| !c.trim().is_empty())?;
        Some(Self {
            token,
            chat_id,
            api_base: DEFAULT_TELEGRAM_API.to_string(),
        })
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }
}

impl fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("token", &"********")
            .field("chat_id", &self.chat_id)
            .field("api_base", &self.api_base)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct PortalConfig {
    pub base_url: String,
    pub booking_url: String,
    pub timeout: Duration,
}

impl PortalConfig {
    pub fn new(base_url: impl Into<String>, booking_url: Option<String>) -> Self {
        let base_url = base_url.into();
        let booking_url = booking_url.unwrap_or_else(|| default_booking_url(&base_url));
        Self {
            base_url,
            booking_url,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL, None)
    }
}

fn default_booking_url(base_url: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), DEFAULT_BOOKING_PATH)
}

#[derive(Debug, Clone)]
pub struct ProxyConfig {
    /// URL of a plain-text `host:port` list.
    pub source_url: Option<String>,
    pub proxies: Vec<String>,
    /// Try the direct connection before any proxy.
    pub direct: bool,
    pub max_attempts: usize,
    pub shuffle: bool,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            source_url: None,
            proxies: Vec::new(),
            direct: true,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            shuffle: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub credentials: Credentials,
    pub telegram: Option<TelegramConfig>,
    pub portal: PortalConfig,
    pub proxy: ProxyConfig,
    pub state_path: PathBuf,
    /// Skip persistence and notification.
    pub dry_run: bool,
}

impl Config {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            telegram: None,
            portal: PortalConfig::default(),
            proxy: ProxyConfig::default(),
            state_path: PathBuf::from(DEFAULT_STATE_FILE),
            dry_run: false,
        }
    }
}
