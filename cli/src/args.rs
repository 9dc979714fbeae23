use clap::Parser;
use cloudsite_cli::OutputFormat;
use std::path::PathBuf;

/// cloudsh - interactive shell for cloudsite data services
#[derive(Parser, Debug)]
#[command(name = "cloudsh")]
#[command(version)]
#[command(about = "Interactive shell for cloudsite data services", long_about = None)]
pub struct Cli {
    /// Service base URL (e.g., https://api.example.com)
    #[arg(short = 'u', long = "url")]
    pub url: Option<String>,

    /// Customer id (UUID)
    #[arg(long = "customer-id")]
    pub customer_id: Option<String>,

    /// Site id (UUID)
    #[arg(long = "site-id")]
    pub site_id: Option<String>,

    /// Site api key
    #[arg(short = 'k', long = "api-key")]
    pub api_key: Option<String>,

    /// Account email used by LOGIN and REGISTER
    #[arg(long = "email")]
    pub email: Option<String>,

    /// Account password used by LOGIN and REGISTER
    #[arg(long = "password")]
    pub password: Option<String>,

    /// Execute commands from file (one per line) and exit
    #[arg(short = 'f', long = "file")]
    pub file: Option<PathBuf>,

    /// Execute one command and exit
    #[arg(short = 'c', long = "command")]
    pub command: Option<String>,

    /// Output format
    #[arg(long = "format")]
    pub format: Option<OutputFormat>,

    /// Enable JSON output (shorthand for --format=json)
    #[arg(long = "json", conflicts_with = "format")]
    pub json: bool,

    /// Enable CSV output (shorthand for --format=csv)
    #[arg(long = "csv", conflicts_with = "format")]
    pub csv: bool,

    /// Disable colored output
    #[arg(long = "no-color")]
    pub no_color: bool,

    /// Print wide values in full
    #[arg(long = "no-truncate")]
    pub no_truncate: bool,

    /// Configuration file path
    #[arg(long = "config", default_value = "~/.cloudsite/config.toml")]
    pub config: PathBuf,

    /// Enable verbose logging
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,

    /// HTTP request timeout in seconds (0 = none)
    #[arg(long = "timeout", value_name = "SECONDS")]
    pub timeout: Option<u64>,

    /// Connection timeout in seconds (TCP + TLS handshake, default: 10)
    #[arg(long = "connection-timeout", value_name = "SECONDS")]
    pub connection_timeout: Option<u64>,

    /// Maximum statements executing concurrently in the background pool
    #[arg(long = "max-workers")]
    pub max_workers: Option<usize>,

    /// Use fast timeout preset (optimized for local development)
    #[arg(long = "fast-timeouts", conflicts_with = "relaxed_timeouts")]
    pub fast_timeouts: bool,

    /// Use relaxed timeout preset (optimized for high-latency networks)
    #[arg(long = "relaxed-timeouts")]
    pub relaxed_timeouts: bool,
}
