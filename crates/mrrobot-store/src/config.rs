//! Configuration for the two stores.
//!
//! All configuration comes from environment variables. Each store reads a
//! prefixed family of keys (`STORE_A_*`, `STORE_B_*`) and falls back to the
//! shared `DB_*` key when its own is unset, so a single-database deployment
//! only needs the `DB_*` family.
//!
//! A store is considered configured when a host resolves for it. A store
//! with a host but no user or database name is a configuration error rather
//! than a silently unconfigured store.

use std::time::Duration;

use crate::error::MediatorError;
use crate::handle::StoreId;

/// Default `PostgreSQL` port.
const DEFAULT_PORT: u16 = 5432;

/// Default maximum number of pooled connections per store.
const DEFAULT_MAX_CONNECTIONS: u32 = 10;

/// Default connect / acquire timeout in milliseconds.
const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 10_000;

/// Default idle connection timeout in milliseconds.
const DEFAULT_IDLE_TIMEOUT_MS: u64 = 30_000;

/// Default timeout for startup and status probes in milliseconds.
const DEFAULT_PROBE_TIMEOUT_MS: u64 = 10_000;

/// Default minimum delay between re-probes of an unavailable store.
pub(crate) const DEFAULT_REPROBE_INTERVAL_MS: u64 = 5_000;

/// Prefix of the shared fallback keys.
const SHARED_PREFIX: &str = "DB";

/// Connection settings for one store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Database host name or address.
    pub host: String,
    /// Database port.
    pub port: u16,
    /// Login role.
    pub user: String,
    /// Login password (may be empty).
    pub password: String,
    /// Database name.
    pub database: String,
    /// Maximum number of connections in this store's pool.
    pub max_connections: u32,
    /// Connect and pool-acquire timeout.
    pub connect_timeout: Duration,
    /// Idle connection timeout.
    pub idle_timeout: Duration,
    /// Optional server-side `statement_timeout`.
    pub statement_timeout: Option<Duration>,
    /// Whether to require TLS (certificate validation relaxed).
    pub tls: bool,
}

impl StoreConfig {
    /// Create a configuration with default pool settings.
    pub fn new(host: &str, user: &str, database: &str) -> Self {
        Self {
            host: host.to_owned(),
            port: DEFAULT_PORT,
            user: user.to_owned(),
            password: String::new(),
            database: database.to_owned(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            connect_timeout: Duration::from_millis(DEFAULT_CONNECT_TIMEOUT_MS),
            idle_timeout: Duration::from_millis(DEFAULT_IDLE_TIMEOUT_MS),
            statement_timeout: None,
            tls: false,
        }
    }

    /// Set the port.
    #[must_use]
    pub const fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the password.
    #[must_use]
    pub fn with_password(mut self, password: &str) -> Self {
        password.clone_into(&mut self.password);
        self
    }

    /// Set the maximum number of pooled connections.
    #[must_use]
    pub const fn with_max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Enable or disable TLS.
    #[must_use]
    pub const fn with_tls(mut self, tls: bool) -> Self {
        self.tls = tls;
        self
    }
}

/// Configuration for the mediator: up to two stores plus probe settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediatorConfig {
    /// Store A (`STORE_A_*`), the fallback store.
    pub store_a: Option<StoreConfig>,
    /// Store B (`STORE_B_*`), the preferred store.
    pub store_b: Option<StoreConfig>,
    /// Upper bound on each startup and status probe.
    pub probe_timeout: Duration,
    /// Minimum delay between re-probes of a store marked unavailable.
    pub reprobe_interval: Duration,
}

impl MediatorConfig {
    /// Load configuration from the process environment.
    ///
    /// Per-store keys (prefix `STORE_A_` or `STORE_B_`, falling back to `DB_`):
    /// - `HOST` -- the store is configured iff this resolves
    /// - `PORT` -- default 5432
    /// - `USER`, `DATABASE` -- required once `HOST` is set
    /// - `PASSWORD` -- default empty
    /// - `POOL_MAX` -- default 10
    /// - `CONNECT_TIMEOUT_MS` -- default 10000
    /// - `IDLE_TIMEOUT_MS` -- default 30000
    /// - `STATEMENT_TIMEOUT_MS` -- unset by default
    ///
    /// Global keys:
    /// - `DB_PROBE_TIMEOUT_MS` -- default 10000
    /// - `DB_REPROBE_INTERVAL_MS` -- default 5000
    /// - `APP_ENV` / `NODE_ENV` -- `production` enables TLS on both stores
    pub fn from_env() -> Result<Self, MediatorError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, MediatorError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let tls = get("APP_ENV")
            .or_else(|| get("NODE_ENV"))
            .is_some_and(|env| env.eq_ignore_ascii_case("production"));

        let probe_timeout_ms =
            parse_or(get("DB_PROBE_TIMEOUT_MS"), "DB_PROBE_TIMEOUT_MS", DEFAULT_PROBE_TIMEOUT_MS)?;

        let reprobe_interval_ms = parse_or(
            get("DB_REPROBE_INTERVAL_MS"),
            "DB_REPROBE_INTERVAL_MS",
            DEFAULT_REPROBE_INTERVAL_MS,
        )?;

        let store_a = load_store(&get, StoreId::A, tls)?;
        let store_b = load_store(&get, StoreId::B, tls)?;

        if store_a.is_none() && store_b.is_none() {
            return Err(MediatorError::ConfigurationMissing);
        }

        Ok(Self {
            store_a,
            store_b,
            probe_timeout: Duration::from_millis(probe_timeout_ms),
            reprobe_interval: Duration::from_millis(reprobe_interval_ms),
        })
    }
}

/// Resolve one store's configuration, or `None` when no host is set.
fn load_store<F>(get: &F, store: StoreId, tls: bool) -> Result<Option<StoreConfig>, MediatorError>
where
    F: Fn(&str) -> Option<String>,
{
    let prefix = store.env_prefix();
    let resolve = |key: &str| -> (String, Option<String>) {
        let own = format!("{prefix}_{key}");
        let value = get(&own).or_else(|| get(&format!("{SHARED_PREFIX}_{key}")));
        (own, value)
    };

    let Some(host) = resolve("HOST").1 else {
        return Ok(None);
    };

    let (user_key, user) = resolve("USER");
    let user = user.ok_or_else(|| {
        MediatorError::Config(format!("{store} has a host but no user ({user_key} or DB_USER)"))
    })?;
    let (database_key, database) = resolve("DATABASE");
    let database = database.ok_or_else(|| {
        MediatorError::Config(format!(
            "{store} has a host but no database ({database_key} or DB_DATABASE)"
        ))
    })?;

    let (port_key, port) = resolve("PORT");
    let (pool_key, pool_max) = resolve("POOL_MAX");
    let (connect_key, connect_ms) = resolve("CONNECT_TIMEOUT_MS");
    let (idle_key, idle_ms) = resolve("IDLE_TIMEOUT_MS");
    let (statement_key, statement_ms) = resolve("STATEMENT_TIMEOUT_MS");

    let statement_timeout = statement_ms
        .map(|raw| parse_value::<u64>(&raw, &statement_key))
        .transpose()?
        .map(Duration::from_millis);

    Ok(Some(StoreConfig {
        host,
        port: parse_or(port, &port_key, DEFAULT_PORT)?,
        user,
        password: resolve("PASSWORD").1.unwrap_or_default(),
        database,
        max_connections: parse_or(pool_max, &pool_key, DEFAULT_MAX_CONNECTIONS)?,
        connect_timeout: Duration::from_millis(parse_or(
            connect_ms,
            &connect_key,
            DEFAULT_CONNECT_TIMEOUT_MS,
        )?),
        idle_timeout: Duration::from_millis(parse_or(idle_ms, &idle_key, DEFAULT_IDLE_TIMEOUT_MS)?),
        statement_timeout,
        tls,
    }))
}

/// Parse an optional raw value, using `default` when absent.
fn parse_or<T>(raw: Option<String>, key: &str, default: T) -> Result<T, MediatorError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.map_or(Ok(default), |raw| parse_value(&raw, key))
}

fn parse_value<T>(raw: &str, key: &str) -> Result<T, MediatorError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| MediatorError::Config(format!("invalid {key}: {e}")))
}
