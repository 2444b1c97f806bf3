//! Command-line surface: flags only, no interactive config-management
//! subcommand (there is no TUI here for one to manage).

use clap::Parser;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser, Debug, Default)]
#[command(name = "splus-cache", version = VERSION, about = "A networked key/value cache daemon with durable sqlite-backed storage", long_about = None)]
pub struct Cli {
    /// TCP port to bind the HTTP server to.
    #[arg(long)]
    pub port: Option<u16>,

    /// Number of HTTP worker threads / read-connection pool size.
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Path to the sqlite database file.
    #[arg(long)]
    pub database: Option<String>,

    /// Value of the `Access-Control-Max-Age` header, in seconds.
    #[arg(long = "cors-max-age")]
    pub cors_max_age: Option<u64>,

    /// Comma-separated list of origins allowed by CORS. Omit to allow any.
    #[arg(long = "allow-cors", value_delimiter = ',')]
    pub allow_cors: Option<Vec<String>>,

    /// Path to a JSON config file (overrides `SPLUS_CONF`).
    #[arg(long)]
    pub config: Option<String>,
}
