//! Layered configuration: env vars, then an optional JSON config file, then
//! CLI flags (flags win). Mirrors the teacher's `config/mod.rs` layering
//! mechanics (`FileConfig` all-`Option` fields, `.ok().or(...).unwrap_or`
//! precedence chains), swapping its TOML file format for JSON.

use std::path::PathBuf;

use serde::Deserialize;

use crate::cli::Cli;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub concurrency: usize,
    pub database: PathBuf,
    pub cors_max_age: u64,
    pub allow_cors: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            port: 8080,
            concurrency: default_concurrency(),
            database: PathBuf::from("splus-cache.db"),
            cors_max_age: 600,
            allow_cors: Vec::new(),
        }
    }
}

fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

/// Deserialized shape of the optional JSON config file. Every field is
/// optional so a partial file only overrides what it names.
#[derive(Debug, Deserialize, Default)]
pub struct FileConfig {
    pub port: Option<u16>,
    pub concurrency: Option<usize>,
    pub database: Option<String>,
    pub cors_max_age: Option<u64>,
    pub allow_cors: Option<Vec<String>>,
}

fn config_file_path(cli: &Cli) -> Option<PathBuf> {
    cli.config
        .clone()
        .or_else(|| std::env::var("SPLUS_CONF").ok())
        .map(PathBuf::from)
}

fn load_file_config(path: &PathBuf) -> FileConfig {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) => {
            eprintln!("==============================================");
            eprintln!(" failed to read config file: {}", path.display());
            eprintln!(" {err}");
            eprintln!(" tip: pass --config <path> or unset SPLUS_CONF");
            eprintln!("==============================================");
            std::process::exit(1);
        }
    };
    match serde_json::from_str(&raw) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("==============================================");
            eprintln!(" failed to parse config file: {}", path.display());
            eprintln!(" {err}");
            eprintln!(" tip: config files are JSON, not TOML");
            eprintln!("==============================================");
            std::process::exit(1);
        }
    }
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|raw| raw.parse().ok())
}

impl Config {
    /// Resolves the final configuration: env vars, then the JSON config
    /// file (if named by `--config` or `SPLUS_CONF`), then CLI flags,
    /// flags always winning when present.
    pub fn from_env(cli: &Cli) -> Config {
        let default = Config::default();
        let file = config_file_path(cli)
            .map(|path| load_file_config(&path))
            .unwrap_or_default();

        let port = cli
            .port
            .or_else(|| parse_env("SPLUS_PORT"))
            .or(file.port)
            .unwrap_or(default.port);

        let concurrency = cli
            .concurrency
            .or_else(|| parse_env("SPLUS_CONCURRENCY"))
            .or(file.concurrency)
            .unwrap_or(default.concurrency);

        let database = cli
            .database
            .clone()
            .or_else(|| std::env::var("SPLUS_DATABASE").ok())
            .or(file.database)
            .map(PathBuf::from)
            .unwrap_or(default.database);

        let cors_max_age = cli
            .cors_max_age
            .or_else(|| parse_env("SPLUS_CORS_MAX_AGE"))
            .or(file.cors_max_age)
            .unwrap_or(default.cors_max_age);

        let allow_cors = cli
            .allow_cors
            .clone()
            .or_else(|| {
                std::env::var("SPLUS_ALLOW_CORS")
                    .ok()
                    .map(|raw| raw.split(',').map(str::to_string).collect())
            })
            .or(file.allow_cors)
            .unwrap_or(default.allow_cors);

        Config {
            port,
            concurrency,
            database,
            cors_max_age,
            allow_cors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_sane_values() {
        let config = Config::default();
        assert_eq!(config.port, 8080);
        assert!(config.concurrency >= 1);
        assert_eq!(config.cors_max_age, 600);
        assert!(config.allow_cors.is_empty());
    }

    #[test]
    fn cli_flags_win_over_defaults() {
        let cli = Cli {
            port: Some(9999),
            ..Default::default()
        };
        let config = Config::from_env(&cli);
        assert_eq!(config.port, 9999);
    }

    #[test]
    fn file_config_parses_partial_overrides() {
        let file: FileConfig = serde_json::from_str(r#"{"port": 1234}"#).unwrap();
        assert_eq!(file.port, Some(1234));
        assert_eq!(file.concurrency, None);
    }
}
