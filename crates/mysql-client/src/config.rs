//! Client configuration.

use std::fmt::Write as _;
use std::time::Duration;

use mysql_auth::Credentials;

use crate::error::Error;

/// Default MySQL port.
pub const DEFAULT_PORT: u16 = 3306;

/// How the host list is ordered when opening a new session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoadBalance {
    /// Try hosts in the order given.
    #[default]
    FailOver,
    /// Try hosts in a random order.
    Random,
}

impl LoadBalance {
    fn parse(value: &str) -> Option<Self> {
        if value.eq_ignore_ascii_case("failover") {
            Some(Self::FailOver)
        } else if value.eq_ignore_ascii_case("random") {
            Some(Self::Random)
        } else {
            None
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::FailOver => "FailOver",
            Self::Random => "Random",
        }
    }
}

/// Configuration for connecting to a MySQL server.
///
/// This struct is marked `#[non_exhaustive]` to allow adding new fields
/// in future releases without breaking semver. Use [`Config::default()`]
/// or [`Config::from_connection_string()`] to construct instances.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct Config {
    /// Server host names, tried according to [`load_balance`](Self::load_balance).
    pub hosts: Vec<String>,

    /// Server port (default: 3306).
    pub port: u16,

    /// Default database.
    pub database: Option<String>,

    /// Authentication credentials.
    pub credentials: Credentials,

    /// Whether sessions are pooled (default: true).
    pub pooling: bool,

    /// Whether sessions are reset when returned to the pool (default: true).
    pub connection_reset: bool,

    /// Minimum number of sessions the reaper keeps alive (default: 0).
    pub min_pool_size: u32,

    /// Maximum number of sessions per pool (default: 100).
    pub max_pool_size: u32,

    /// Maximum session age before it is retired on return; zero disables
    /// the limit (default: 0).
    pub connection_lifetime: Duration,

    /// Idle time after which pooled sessions are reaped; zero disables
    /// reaping (default: 180s).
    pub connection_idle_timeout: Duration,

    /// Time allowed to open a session; zero waits forever (default: 15s).
    pub connect_timeout: Duration,

    /// Default time allowed for a command; zero waits forever (default: 30s).
    pub command_timeout: Duration,

    /// Allow `@name` tokens that do not match a parameter (default: false).
    pub allow_user_variables: bool,

    /// Send UUIDs as `BINARY(16)` (default: false).
    pub old_guids: bool,

    /// Perform pool returns inline instead of in the background
    /// (default: false).
    pub force_synchronous: bool,

    /// Host ordering strategy (default: fail over).
    pub load_balance: LoadBalance,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            hosts: vec!["localhost".to_string()],
            port: DEFAULT_PORT,
            database: None,
            credentials: Credentials::default(),
            pooling: true,
            connection_reset: true,
            min_pool_size: 0,
            max_pool_size: 100,
            connection_lifetime: Duration::ZERO,
            connection_idle_timeout: Duration::from_secs(180),
            connect_timeout: Duration::from_secs(15),
            command_timeout: Duration::from_secs(30),
            allow_user_variables: false,
            old_guids: false,
            force_synchronous: false,
            load_balance: LoadBalance::FailOver,
        }
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, Error> {
    if value.eq_ignore_ascii_case("true") || value.eq_ignore_ascii_case("yes") || value == "1" {
        Ok(true)
    } else if value.eq_ignore_ascii_case("false") || value.eq_ignore_ascii_case("no") || value == "0"
    {
        Ok(false)
    } else {
        Err(Error::Config(format!("invalid boolean for {key}: {value}")))
    }
}

fn parse_u32(key: &str, value: &str) -> Result<u32, Error> {
    value
        .parse()
        .map_err(|_| Error::Config(format!("invalid value for {key}: {value}")))
}

fn parse_secs(key: &str, value: &str) -> Result<Duration, Error> {
    parse_u32(key, value).map(|secs| Duration::from_secs(u64::from(secs)))
}

impl Config {
    /// Create a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a connection string into configuration.
    ///
    /// Supports `key=value;` connection strings:
    /// ```text
    /// Server=db1,db2;Port=3306;User ID=app;Password=secret;Database=shop;
    /// ```
    ///
    /// Keys are case-insensitive. Unknown keys are ignored.
    pub fn from_connection_string(conn_str: &str) -> Result<Self, Error> {
        let mut config = Self::default();
        let mut username = String::new();
        let mut password = String::new();

        for part in conn_str.split(';') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }

            let (key, value) = part
                .split_once('=')
                .ok_or_else(|| Error::Config(format!("invalid key-value: {part}")))?;

            let key = key.trim().to_lowercase();
            let value = value.trim();

            match key.as_str() {
                "server" | "host" | "data source" | "datasource" | "address" | "addr" => {
                    config.hosts = value
                        .split(',')
                        .map(str::trim)
                        .filter(|h| !h.is_empty())
                        .map(str::to_string)
                        .collect();
                }
                "port" => {
                    config.port = value
                        .parse()
                        .map_err(|_| Error::Config(format!("invalid port: {value}")))?;
                }
                "user id" | "userid" | "uid" | "user" | "username" | "user name" => {
                    username = value.to_string();
                }
                "password" | "pwd" => {
                    password = value.to_string();
                }
                "database" | "initial catalog" => {
                    config.database = (!value.is_empty()).then(|| value.to_string());
                }
                "pooling" => config.pooling = parse_bool(&key, value)?,
                "connection reset" | "connectionreset" => {
                    config.connection_reset = parse_bool(&key, value)?;
                }
                "minimum pool size" | "minimumpoolsize" | "min pool size" | "minpoolsize" => {
                    config.min_pool_size = parse_u32(&key, value)?;
                }
                "maximum pool size" | "maximumpoolsize" | "max pool size" | "maxpoolsize" => {
                    config.max_pool_size = parse_u32(&key, value)?;
                }
                "connection lifetime" | "connectionlifetime" => {
                    config.connection_lifetime = parse_secs(&key, value)?;
                }
                "connection idle timeout" | "connectionidletimeout" => {
                    config.connection_idle_timeout = parse_secs(&key, value)?;
                }
                "connect timeout" | "connecttimeout" | "connection timeout" => {
                    config.connect_timeout = parse_secs(&key, value)?;
                }
                "default command timeout" | "defaultcommandtimeout" | "command timeout" => {
                    config.command_timeout = parse_secs(&key, value)?;
                }
                "allow user variables" | "allowuservariables" => {
                    config.allow_user_variables = parse_bool(&key, value)?;
                }
                "old guids" | "oldguids" => config.old_guids = parse_bool(&key, value)?,
                "force synchronous" | "forcesynchronous" => {
                    config.force_synchronous = parse_bool(&key, value)?;
                }
                "load balance" | "loadbalance" => {
                    config.load_balance = LoadBalance::parse(value)
                        .ok_or_else(|| Error::Config(format!("invalid load balance: {value}")))?;
                }
                _ => {
                    // Ignore unknown options for forward compatibility
                    tracing::debug!(key = key, "ignoring unknown connection string option");
                }
            }
        }

        config.credentials = Credentials::new(username, password);
        config.validate()?;
        Ok(config)
    }

    /// Check the configuration for inconsistencies.
    pub fn validate(&self) -> Result<(), Error> {
        if self.hosts.is_empty() {
            return Err(Error::Config("at least one server host is required".into()));
        }
        if self.max_pool_size == 0 {
            return Err(Error::Config(
                "maximum pool size must be greater than zero".into(),
            ));
        }
        if self.min_pool_size > self.max_pool_size {
            return Err(Error::Config(
                "maximum pool size must be greater than or equal to minimum pool size".into(),
            ));
        }
        Ok(())
    }

    /// Normalized configuration string identifying the pool for this
    /// configuration.
    ///
    /// Two configurations that would open interchangeable sessions produce
    /// the same key. The key contains the password and must not be logged.
    #[must_use]
    pub fn pool_key(&self) -> String {
        let mut key = String::with_capacity(256);
        let _ = write!(
            key,
            "server={};port={};user id={};password={};database={};",
            self.hosts.join(","),
            self.port,
            self.credentials.username(),
            self.credentials.password(),
            self.database.as_deref().unwrap_or(""),
        );
        let _ = write!(
            key,
            "connection reset={};minimum pool size={};maximum pool size={};",
            self.connection_reset, self.min_pool_size, self.max_pool_size,
        );
        let _ = write!(
            key,
            "connection lifetime={};connection idle timeout={};connect timeout={};",
            self.connection_lifetime.as_secs(),
            self.connection_idle_timeout.as_secs(),
            self.connect_timeout.as_secs(),
        );
        let _ = write!(
            key,
            "allow user variables={};old guids={};load balance={}",
            self.allow_user_variables,
            self.old_guids,
            self.load_balance.as_str(),
        );
        key
    }

    /// Set a single server host.
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.hosts = vec![host.into()];
        self
    }

    /// Set the list of server hosts.
    #[must_use]
    pub fn hosts<I, S>(mut self, hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.hosts = hosts.into_iter().map(Into::into).collect();
        self
    }

    /// Set the server port.
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the database name.
    #[must_use]
    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// Set the credentials.
    #[must_use]
    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    /// Enable or disable pooling.
    #[must_use]
    pub fn pooling(mut self, enabled: bool) -> Self {
        self.pooling = enabled;
        self
    }

    /// Enable or disable resetting sessions on return to the pool.
    #[must_use]
    pub fn connection_reset(mut self, enabled: bool) -> Self {
        self.connection_reset = enabled;
        self
    }

    /// Set the minimum pool size.
    #[must_use]
    pub fn min_pool_size(mut self, size: u32) -> Self {
        self.min_pool_size = size;
        self
    }

    /// Set the maximum pool size.
    #[must_use]
    pub fn max_pool_size(mut self, size: u32) -> Self {
        self.max_pool_size = size;
        self
    }

    /// Set the maximum session lifetime.
    #[must_use]
    pub fn connection_lifetime(mut self, lifetime: Duration) -> Self {
        self.connection_lifetime = lifetime;
        self
    }

    /// Set the idle timeout after which pooled sessions are reaped.
    #[must_use]
    pub fn connection_idle_timeout(mut self, timeout: Duration) -> Self {
        self.connection_idle_timeout = timeout;
        self
    }

    /// Set the connect timeout.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the default command timeout.
    #[must_use]
    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Allow unmatched `@name` tokens to pass through as user variables.
    #[must_use]
    pub fn allow_user_variables(mut self, allow: bool) -> Self {
        self.allow_user_variables = allow;
        self
    }

    /// Send UUIDs as binary.
    #[must_use]
    pub fn old_guids(mut self, enabled: bool) -> Self {
        self.old_guids = enabled;
        self
    }

    /// Perform pool returns inline.
    #[must_use]
    pub fn force_synchronous(mut self, enabled: bool) -> Self {
        self.force_synchronous = enabled;
        self
    }

    /// Set the host ordering strategy.
    #[must_use]
    pub fn load_balance(mut self, strategy: LoadBalance) -> Self {
        self.load_balance = strategy;
        self
    }

    /// `connect_timeout` as an optional deadline length; zero means none.
    #[must_use]
    pub fn connect_timeout_opt(&self) -> Option<Duration> {
        (!self.connect_timeout.is_zero()).then_some(self.connect_timeout)
    }

    /// `command_timeout` as an optional budget; zero means none.
    #[must_use]
    pub fn command_timeout_opt(&self) -> Option<Duration> {
        (!self.command_timeout.is_zero()).then_some(self.command_timeout)
    }
}
