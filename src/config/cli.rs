use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};

/// Command-line arguments for the notekeep binary.
#[derive(Debug, Parser)]
#[command(name = "notekeep", version, about = "Notebook and note services")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "NOTEKEEP_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the notebook service.
    Notebooks(ServeArgs),
    /// Run the note service.
    Notes(ServeArgs),
}

impl Command {
    pub fn role(&self) -> ServiceRole {
        match self {
            Command::Notebooks(_) => ServiceRole::Notebooks,
            Command::Notes(_) => ServiceRole::Notes,
        }
    }

    pub fn overrides(&self) -> &ServeOverrides {
        match self {
            Command::Notebooks(args) | Command::Notes(args) => &args.overrides,
        }
    }
}

/// Which of the two services this process runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceRole {
    Notebooks,
    Notes,
}

impl ServiceRole {
    pub fn as_str(self) -> &'static str {
        match self {
            ServiceRole::Notebooks => "notebooks",
            ServiceRole::Notes => "notes",
        }
    }
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the graceful shutdown timeout.
    #[arg(long = "server-graceful-shutdown-seconds", value_name = "SECONDS")]
    pub server_graceful_shutdown_seconds: Option<u64>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Override the database connection URL.
    #[arg(long = "database-url", value_name = "URL")]
    pub database_url: Option<String>,

    /// Override the database pool size.
    #[arg(long = "database-max-connections", value_name = "COUNT")]
    pub database_max_connections: Option<u32>,

    /// Override the Redis URL; an empty value selects the in-process store.
    #[arg(long = "cache-redis-url", value_name = "URL")]
    pub cache_redis_url: Option<String>,

    /// Override the fresh tier lifetime.
    #[arg(long = "cache-fresh-ttl-seconds", value_name = "SECONDS")]
    pub cache_fresh_ttl_seconds: Option<u64>,

    /// Override the notebook service origin.
    #[arg(long = "peers-notebooks-origin", value_name = "URL")]
    pub peers_notebooks_origin: Option<String>,

    /// Override the note service origin.
    #[arg(long = "peers-notes-origin", value_name = "URL")]
    pub peers_notes_origin: Option<String>,

    /// Override how many times a notebook reference is checked.
    #[arg(long = "retry-max-attempts", value_name = "COUNT")]
    pub retry_max_attempts: Option<u32>,

    /// Override the delay between notebook reference checks.
    #[arg(long = "retry-delay-ms", value_name = "MILLIS")]
    pub retry_delay_ms: Option<u64>,
}
