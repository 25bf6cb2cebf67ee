//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{
    net::SocketAddr,
    num::{NonZeroU32, NonZeroUsize},
    str::FromStr,
    time::Duration,
};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

use crate::application::retry::{DEFAULT_DELAY, DEFAULT_MAX_ATTEMPTS, RetryPolicy};
use crate::domain::ids::{
    DEFAULT_LENGTH, DEFAULT_MULTIPLIER, DEFAULT_NOTE_SALT, DEFAULT_NOTEBOOK_SALT, IdCodec,
    NOTE_PREFIX, NOTEBOOK_PREFIX,
};

mod cli;

pub use cli::{CliArgs, Command, ServeArgs, ServeOverrides, ServiceRole};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "notekeep";
const ENV_PREFIX: &str = "NOTEKEEP";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_NOTEBOOKS_PORT: u16 = 3001;
const DEFAULT_NOTES_PORT: u16 = 3002;
const DEFAULT_GRACEFUL_SHUTDOWN_SECS: u64 = 30;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 8;
const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";
const DEFAULT_FRESH_TTL_SECS: u64 = 1;
const DEFAULT_CACHE_TIMEOUT_MS: u64 = 500;
const DEFAULT_CACHE_POOL_SIZE: u64 = 8;
const DEFAULT_NOTEBOOKS_ORIGIN: &str = "http://127.0.0.1:3001";
const DEFAULT_NOTES_ORIGIN: &str = "http://127.0.0.1:3002";
const DEFAULT_PEER_TIMEOUT_MS: u64 = 2000;

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub role: ServiceRole,
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub database: DatabaseSettings,
    pub cache: CacheSettings,
    pub peers: PeerSettings,
    pub retry: RetryPolicy,
    pub ids: IdSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
    pub graceful_shutdown: Duration,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    /// `None` runs the service on in-memory repositories.
    pub url: Option<String>,
    pub max_connections: NonZeroU32,
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    /// `None` selects the in-process tier store.
    pub redis_url: Option<String>,
    pub fresh_ttl: Duration,
    pub timeout: Duration,
    pub pool_size: NonZeroUsize,
}

#[derive(Debug, Clone)]
pub struct PeerSettings {
    pub notebooks_origin: Url,
    pub notes_origin: Url,
    pub request_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct IdSettings {
    pub notebooks: IdCodec,
    pub notes: IdCodec,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;
    raw.apply_serve_overrides(cli.command.overrides());

    Settings::from_raw(raw, cli.command.role())
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    database: RawDatabaseSettings,
    cache: RawCacheSettings,
    peers: RawPeerSettings,
    retry: RawRetrySettings,
    ids: RawIdSettings,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(seconds) = overrides.server_graceful_shutdown_seconds {
            self.server.graceful_shutdown_seconds = Some(seconds);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(url) = overrides.database_url.as_ref() {
            self.database.url = Some(url.clone());
        }
        if let Some(max) = overrides.database_max_connections {
            self.database.max_connections = Some(max);
        }
        if let Some(url) = overrides.cache_redis_url.as_ref() {
            self.cache.redis_url = Some(url.clone());
        }
        if let Some(seconds) = overrides.cache_fresh_ttl_seconds {
            self.cache.fresh_ttl_seconds = Some(seconds);
        }
        if let Some(origin) = overrides.peers_notebooks_origin.as_ref() {
            self.peers.notebooks_origin = Some(origin.clone());
        }
        if let Some(origin) = overrides.peers_notes_origin.as_ref() {
            self.peers.notes_origin = Some(origin.clone());
        }
        if let Some(attempts) = overrides.retry_max_attempts {
            self.retry.max_attempts = Some(attempts);
        }
        if let Some(delay) = overrides.retry_delay_ms {
            self.retry.delay_ms = Some(delay);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings, role: ServiceRole) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            database,
            cache,
            peers,
            retry,
            ids,
        } = raw;

        let cache = build_cache_settings(cache)?;
        let retry = build_retry_policy(retry)?;
        ensure_retry_outlives_fresh_tier(&retry, &cache)?;

        Ok(Self {
            role,
            server: build_server_settings(server, role)?,
            logging: build_logging_settings(logging)?,
            database: build_database_settings(database)?,
            cache,
            peers: build_peer_settings(peers)?,
            retry,
            ids: build_id_settings(ids)?,
        })
    }
}

fn build_server_settings(
    server: RawServerSettings,
    role: ServiceRole,
) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());

    let default_port = match role {
        ServiceRole::Notebooks => DEFAULT_NOTEBOOKS_PORT,
        ServiceRole::Notes => DEFAULT_NOTES_PORT,
    };
    let port = server.port.unwrap_or(default_port);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }

    let addr =
        parse_socket_addr(&host, port).map_err(|reason| LoadError::invalid("server.addr", reason))?;

    let graceful_secs = server
        .graceful_shutdown_seconds
        .unwrap_or(DEFAULT_GRACEFUL_SHUTDOWN_SECS);
    if graceful_secs == 0 {
        return Err(LoadError::invalid(
            "server.graceful_shutdown_seconds",
            "must be greater than zero",
        ));
    }

    Ok(ServerSettings {
        addr,
        graceful_shutdown: Duration::from_secs(graceful_secs),
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_database_settings(database: RawDatabaseSettings) -> Result<DatabaseSettings, LoadError> {
    let url = non_blank(database.url);
    let max_connections = non_zero_u32(
        database
            .max_connections
            .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS)
            .into(),
        "database.max_connections",
    )?;

    Ok(DatabaseSettings {
        url,
        max_connections,
    })
}

fn build_cache_settings(cache: RawCacheSettings) -> Result<CacheSettings, LoadError> {
    let redis_url = match cache.redis_url {
        None => Some(DEFAULT_REDIS_URL.to_string()),
        Some(value) => non_blank(Some(value)),
    };
    if let Some(url) = redis_url.as_deref() {
        let parsed = Url::parse(url)
            .map_err(|err| LoadError::invalid("cache.redis_url", format!("invalid URL: {err}")))?;
        if !matches!(parsed.scheme(), "redis" | "rediss") {
            return Err(LoadError::invalid(
                "cache.redis_url",
                format!("unsupported scheme `{}`", parsed.scheme()),
            ));
        }
    }

    let fresh_ttl_secs = cache.fresh_ttl_seconds.unwrap_or(DEFAULT_FRESH_TTL_SECS);
    if fresh_ttl_secs == 0 {
        return Err(LoadError::invalid(
            "cache.fresh_ttl_seconds",
            "must be greater than zero",
        ));
    }

    let timeout = positive_millis(
        cache.timeout_ms.unwrap_or(DEFAULT_CACHE_TIMEOUT_MS),
        "cache.timeout_ms",
    )?;

    let pool_size_value = cache.pool_size.unwrap_or(DEFAULT_CACHE_POOL_SIZE);
    let pool_size = usize::try_from(pool_size_value)
        .ok()
        .and_then(NonZeroUsize::new)
        .ok_or_else(|| LoadError::invalid("cache.pool_size", "must be greater than zero"))?;

    Ok(CacheSettings {
        redis_url,
        fresh_ttl: Duration::from_secs(fresh_ttl_secs),
        timeout,
        pool_size,
    })
}

fn build_peer_settings(peers: RawPeerSettings) -> Result<PeerSettings, LoadError> {
    let notebooks_origin = parse_origin(
        peers.notebooks_origin.as_deref(),
        DEFAULT_NOTEBOOKS_ORIGIN,
        "peers.notebooks_origin",
    )?;
    let notes_origin = parse_origin(
        peers.notes_origin.as_deref(),
        DEFAULT_NOTES_ORIGIN,
        "peers.notes_origin",
    )?;
    let request_timeout = positive_millis(
        peers.request_timeout_ms.unwrap_or(DEFAULT_PEER_TIMEOUT_MS),
        "peers.request_timeout_ms",
    )?;

    Ok(PeerSettings {
        notebooks_origin,
        notes_origin,
        request_timeout,
    })
}

fn build_retry_policy(retry: RawRetrySettings) -> Result<RetryPolicy, LoadError> {
    let max_attempts = non_zero_u32(
        retry.max_attempts.unwrap_or(DEFAULT_MAX_ATTEMPTS).into(),
        "retry.max_attempts",
    )?;
    let delay = retry
        .delay_ms
        .map(Duration::from_millis)
        .unwrap_or(DEFAULT_DELAY);

    Ok(RetryPolicy::new(max_attempts, delay))
}

/// A retry only sees a newer listing once the fresh snapshot has expired.
fn ensure_retry_outlives_fresh_tier(
    retry: &RetryPolicy,
    cache: &CacheSettings,
) -> Result<(), LoadError> {
    if retry.max_attempts.get() > 1 && retry.delay < cache.fresh_ttl {
        return Err(LoadError::invalid(
            "retry.delay_ms",
            format!(
                "must be at least cache.fresh_ttl_seconds ({}s) when retries are enabled",
                cache.fresh_ttl.as_secs()
            ),
        ));
    }
    Ok(())
}

fn build_id_settings(ids: RawIdSettings) -> Result<IdSettings, LoadError> {
    Ok(IdSettings {
        notebooks: build_codec(
            ids.notebooks,
            NOTEBOOK_PREFIX,
            DEFAULT_NOTEBOOK_SALT,
            "ids.notebooks",
        )?,
        notes: build_codec(ids.notes, NOTE_PREFIX, DEFAULT_NOTE_SALT, "ids.notes")?,
    })
}

fn build_codec(
    raw: RawCodecSettings,
    prefix: char,
    default_salt: &str,
    key: &'static str,
) -> Result<IdCodec, LoadError> {
    let length = raw.length.unwrap_or(DEFAULT_LENGTH);
    let salt = raw.salt.unwrap_or_else(|| default_salt.to_string());
    let multiplier = raw.multiplier.unwrap_or(DEFAULT_MULTIPLIER);

    IdCodec::new(prefix, length, &salt, multiplier)
        .map_err(|err| LoadError::invalid(key, err.to_string()))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
    graceful_shutdown_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawDatabaseSettings {
    url: Option<String>,
    max_connections: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    redis_url: Option<String>,
    fresh_ttl_seconds: Option<u64>,
    timeout_ms: Option<u64>,
    pool_size: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawPeerSettings {
    notebooks_origin: Option<String>,
    notes_origin: Option<String>,
    request_timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawRetrySettings {
    max_attempts: Option<u32>,
    delay_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawIdSettings {
    notebooks: RawCodecSettings,
    notes: RawCodecSettings,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCodecSettings {
    length: Option<usize>,
    salt: Option<String>,
    multiplier: Option<u64>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

fn parse_origin(value: Option<&str>, default: &str, key: &'static str) -> Result<Url, LoadError> {
    let raw = value.map(str::trim).unwrap_or(default);
    let url = Url::parse(raw).map_err(|err| LoadError::invalid(key, format!("invalid URL: {err}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(LoadError::invalid(
            key,
            format!("unsupported scheme `{}`", url.scheme()),
        ));
    }
    Ok(url)
}

fn positive_millis(value: u64, key: &'static str) -> Result<Duration, LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    Ok(Duration::from_millis(value))
}

fn non_zero_u32(value: u64, key: &'static str) -> Result<NonZeroU32, LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    let value_u32: u32 = value
        .try_into()
        .map_err(|_| LoadError::invalid(key, "value exceeds supported range for u32"))?;
    NonZeroU32::new(value_u32).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[cfg(test)]
mod tests;
