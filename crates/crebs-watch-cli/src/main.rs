use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use crebs_watch::config::{
    Config, Credentials, DEFAULT_BASE_URL, DEFAULT_MAX_ATTEMPTS, DEFAULT_STATE_FILE,
    DEFAULT_TIMEOUT_SECS, PortalConfig, ProxyConfig, TelegramConfig,
};
use crebs_watch::{JsonFileStore, Snapshot, SnapshotStore, extract_bookings, extract_results};
use log::LevelFilter;

#[derive(Parser)]
#[command(name = "crebs-watch")]
#[command(about = "Watches the CREBS portal for new results and booking changes", long_about = None)]
struct Cli {
    #[arg(
        short = 'l',
        long = "log-level",
        value_enum,
        default_value = "info",
        global = true,
        help = "Set the logging level"
    )]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::Off,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in, diff the portal against the saved state and notify on changes
    Check {
        #[arg(long, env = "USER_EMAIL", hide_env_values = true, help = "Portal login email")]
        email: String,

        #[arg(long, env = "USER_PASSWORD", hide_env_values = true, help = "Portal password")]
        password: String,

        #[arg(long, env = "TELEGRAM_TOKEN", hide_env_values = true, help = "Telegram bot token")]
        telegram_token: Option<String>,

        #[arg(long, env = "TELEGRAM_CHAT_ID", help = "Telegram chat to notify")]
        telegram_chat_id: Option<String>,

        #[arg(
            long,
            env = "CREBS_STATE_FILE",
            default_value = DEFAULT_STATE_FILE,
            help = "Where the last snapshot is kept"
        )]
        state_file: PathBuf,

        #[arg(long, env = "CREBS_BASE_URL", default_value = DEFAULT_BASE_URL, help = "Portal login URL")]
        base_url: String,

        #[arg(long, env = "CREBS_BOOKING_URL", help = "Booking list URL [default: <base-url>/Booking/BookingList]")]
        booking_url: Option<String>,

        #[arg(long = "proxy", value_name = "HOST:PORT", help = "Proxy to try (repeatable)")]
        proxies: Vec<String>,

        #[arg(long, env = "CREBS_PROXY_SOURCE", value_name = "URL", help = "Plain-text proxy list to download")]
        proxy_source: Option<String>,

        #[arg(
            long,
            default_value_t = DEFAULT_MAX_ATTEMPTS,
            help = "Maximum number of network paths to try"
        )]
        max_attempts: usize,

        #[arg(long, help = "Only connect through proxies")]
        no_direct: bool,

        #[arg(long, help = "Try proxies in list order")]
        no_shuffle: bool,

        #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS, help = "Per-request timeout in seconds")]
        timeout: u64,

        #[arg(long, help = "Print the notification instead of sending it and keep the saved state")]
        dry_run: bool,
    },
    /// Extract and normalize saved portal pages without signing in
    Parse {
        #[arg(long, help = "Saved results page (the page shown after login)")]
        results: PathBuf,

        #[arg(long, help = "Saved booking list page")]
        bookings: PathBuf,

        #[arg(
            short = 'o',
            long = "output",
            value_enum,
            default_value = "text",
            help = "Output format"
        )]
        format: OutputFormat,
    },
    /// Print the saved snapshot
    Show {
        #[arg(long, env = "CREBS_STATE_FILE", default_value = DEFAULT_STATE_FILE)]
        state_file: PathBuf,

        #[arg(
            short = 'o',
            long = "output",
            value_enum,
            default_value = "text",
            help = "Output format"
        )]
        format: OutputFormat,
    },
}

fn serialize_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            log::error!("Error serializing to JSON: {}", e);
            process::exit(1);
        }
    }
}

fn read_page(path: &Path) -> String {
    fs::read_to_string(path).unwrap_or_else(|e| {
        log::error!("Error reading {}: {}", path.display(), e);
        process::exit(1);
    })
}

fn print_snapshot(snapshot: &Snapshot, format: &OutputFormat) {
    match format {
        OutputFormat::Json => serialize_json(snapshot),
        OutputFormat::Text if snapshot.is_empty() => println!("No entries to display."),
        OutputFormat::Text => print!("{}", snapshot),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.log_level.clone().into())
        .init();

    match cli.command {
        Commands::Check {
            email,
            password,
            telegram_token,
            telegram_chat_id,
            state_file,
            base_url,
            booking_url,
            proxies,
            proxy_source,
            max_attempts,
            no_direct,
            no_shuffle,
            timeout,
            dry_run,
        } => {
            let config = Config {
                credentials: Credentials { email, password },
                telegram: TelegramConfig::from_parts(telegram_token, telegram_chat_id),
                portal: PortalConfig::new(base_url, booking_url)
                    .with_timeout(Duration::from_secs(timeout)),
                proxy: ProxyConfig {
                    source_url: proxy_source,
                    proxies: crebs_watch::proxy::parse_proxy_list(&proxies.join("\n")),
                    direct: !no_direct,
                    max_attempts,
                    shuffle: !no_shuffle,
                },
                state_path: state_file,
                dry_run,
            };

            let report = crebs_watch::run(&config).await.unwrap_or_else(|e| {
                log::error!("Check failed: {}", e);
                process::exit(1);
            });

            log::info!(
                "Checked {} result(s) and {} booking(s): {} change(s)",
                report.results,
                report.bookings,
                report.changes.len()
            );

            if report.changes.is_empty() {
                println!("No changes.");
            } else {
                for (i, change) in report.changes.iter().enumerate() {
                    println!("{:>3}. {}", i + 1, change);
                }
            }

            if dry_run && let Some(message) = &report.message {
                println!("\n{}", message);
            }
        }

        Commands::Parse {
            results,
            bookings,
            format,
        } => {
            let results = extract_results(&read_page(&results));
            let bookings = extract_bookings(&read_page(&bookings));
            let snapshot = Snapshot::from_records(&results, &bookings);

            match format {
                OutputFormat::Json => serialize_json(&serde_json::json!({
                    "results": results,
                    "bookings": bookings,
                    "snapshot": snapshot,
                })),
                OutputFormat::Text => {
                    println!("Results ({}):", results.len());
                    for (i, result) in results.iter().enumerate() {
                        println!("{:>3}. {}", i + 1, result);
                    }
                    println!("\nBookings ({}):", bookings.len());
                    for (i, booking) in bookings.iter().enumerate() {
                        println!("{:>3}. {}", i + 1, booking);
                    }
                    println!("\nSnapshot:");
                    print_snapshot(&snapshot, &format);
                }
            }
        }

        Commands::Show { state_file, format } => {
            let store = JsonFileStore::open(&state_file).unwrap_or_else(|e| {
                log::error!("Error opening state: {}", e);
                process::exit(1);
            });
            print_snapshot(&store.load(), &format);
        }
    }
}
