//! [`Config`]-related definitions.

use std::{collections::HashSet, path::PathBuf, time};

use clap::ValueEnum;
use config::{builder::DefaultState, ConfigBuilder, ConfigError};
use serde::Deserialize;
use service::domain::user;
use smart_default::SmartDefault;

/// Application configuration.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Config {
    /// Session configuration.
    #[serde(default)]
    pub session: Session,

    /// Session storage configuration.
    #[serde(default)]
    pub storage: Storage,

    /// Account directory configuration.
    #[serde(default)]
    pub directory: Directory,

    /// Log configuration.
    #[serde(default)]
    pub log: Log,
}

impl Config {
    /// Creates a new [`Config`] by:
    /// - loading it from the provided `path` (if any);
    /// - merging it with the environment variables (if any);
    /// - using default values for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(path: impl AsRef<str>) -> Result<Self, ConfigError> {
        ConfigBuilder::<DefaultState>::default()
            .add_source(config::File::with_name(path.as_ref()).required(false))
            .add_source(config::Environment::with_prefix("CONF").separator("."))
            .build()?
            .try_deserialize()
    }
}

/// Session configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Session {
    /// [JWT] secret signing the session tokens.
    ///
    /// [JWT]: https://wikipedia.org/wiki/JSON_Web_Token
    #[default("secret".to_owned())]
    pub jwt_secret: String,

    /// Lifetime of a session since signing in.
    #[default(service::Config::DEFAULT_SESSION_TTL)]
    #[serde(with = "humantime_serde")]
    pub ttl: time::Duration,
}

impl From<Session> for service::Config {
    fn from(value: Session) -> Self {
        let Session { jwt_secret, ttl } = value;
        Self {
            jwt_encoding_key: jsonwebtoken::EncodingKey::from_secret(
                jwt_secret.as_bytes(),
            ),
            jwt_decoding_key: jsonwebtoken::DecodingKey::from_secret(
                jwt_secret.as_bytes(),
            ),
            session_ttl: ttl,
        }
    }
}

/// Session storage configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Storage {
    /// Directory to persist the session into.
    #[default(PathBuf::from(".campus"))]
    pub dir: PathBuf,
}

/// Account directory configuration.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Directory {
    /// [`user::IdentityNumber`]s provisioned as administrators.
    pub admins: HashSet<user::IdentityNumber>,

    /// [`user::IdentityNumber`]s provisioned as moderators.
    pub moderators: HashSet<user::IdentityNumber>,
}

impl From<Directory> for service::infra::directory::mock::Config {
    fn from(value: Directory) -> Self {
        let Directory { admins, moderators } = value;
        Self { admins, moderators }
    }
}

/// Log configuration.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Log {
    /// Log level.
    pub level: LogLevel,
}

/// Log level.
#[derive(Clone, Copy, Debug, Default, Deserialize, ValueEnum)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogLevel {
    /// Designates very low priority, often extremely verbose, information.
    Trace,

    /// Designates lower priority information.
    Debug,

    /// Designates useful information.
    #[default]
    Info,

    /// Designates hazardous situations.
    Warn,

    /// Designates very serious errors.
    Error,
}

impl From<LogLevel> for tracing::Level {
    fn from(value: LogLevel) -> Self {
        match value {
            LogLevel::Trace => Self::TRACE,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Info => Self::INFO,
            LogLevel::Warn => Self::WARN,
            LogLevel::Error => Self::ERROR,
        }
    }
}

#[cfg(test)]
mod spec {
    use std::{path::Path, time::Duration};

    use super::{Config, LogLevel};

    #[test]
    fn defaults_without_sources() {
        let config = Config::new("does-not-exist.toml").unwrap();

        assert_eq!(config.session.jwt_secret, "secret");
        assert_eq!(
            config.session.ttl,
            Duration::from_secs(30 * 24 * 60 * 60),
        );
        assert_eq!(config.storage.dir, Path::new(".campus"));
        assert!(config.directory.admins.is_empty());
        assert!(matches!(config.log.level, LogLevel::Info));
    }

    #[test]
    fn converts_into_service_configs() {
        let config = Config::default();

        let session: service::Config = config.session.into();
        let directory: service::infra::directory::mock::Config =
            config.directory.into();

        assert_eq!(session.session_ttl, service::Config::DEFAULT_SESSION_TTL);
        assert!(directory.moderators.is_empty());
    }
}
