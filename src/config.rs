//! Flash Configuration
//!
//! [`FlashConfig`] selects the storage backend and codec once at startup and
//! builds the shared [`FlashMiddleware`].
//!
//! ## Environment
//!
//! | Variable                | Values                                  | Default            |
//! |-------------------------|-----------------------------------------|--------------------|
//! | `FLASH_STORAGE`         | `session`, `cookie`                     | `session`          |
//! | `FLASH_CODEC`           | `json`, `json_zstd`, `binary`           | `json`             |
//! | `FLASH_SECRET_KEY`      | any string                              | unset              |
//! | `FLASH_DEBUG`           | `true`/`false`, `1`/`0`, `yes`/`no`     | `false`            |
//! | `FLASH_IGNORE_STATIC`   | as `FLASH_DEBUG`                        | value of debug     |
//! | `FLASH_STATIC_PREFIXES` | comma-separated path prefixes           | `/static/,/media/` |
//!
//! The cookie backend signs its payload and therefore requires a secret key.

use crate::codec::{BinaryCodec, Codec, CompressedJsonCodec, JsonCodec, Signer};
use crate::middleware::FlashMiddleware;
use crate::storage::{CookieStorage, FlashStorage, SessionStorage};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

pub const ENV_STORAGE: &str = "FLASH_STORAGE";
pub const ENV_CODEC: &str = "FLASH_CODEC";
pub const ENV_SECRET_KEY: &str = "FLASH_SECRET_KEY";
pub const ENV_DEBUG: &str = "FLASH_DEBUG";
pub const ENV_IGNORE_STATIC: &str = "FLASH_IGNORE_STATIC";
pub const ENV_STATIC_PREFIXES: &str = "FLASH_STATIC_PREFIXES";

/// Path prefixes treated as static assets by default
pub const DEFAULT_STATIC_PREFIXES: [&str; 2] = ["/static/", "/media/"];

/// Errors raised while reading the configuration.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("unknown flash storage '{0}' (expected session or cookie)")]
    UnknownStorage(String),

    #[error("unknown flash codec '{0}' (expected json, json_zstd or binary)")]
    UnknownCodec(String),

    #[error("invalid value '{value}' for {name}")]
    InvalidFlag { name: String, value: String },

    #[error("the {0} storage requires a secret key")]
    MissingSecret(&'static str),
}

/// Where flashes are persisted between requests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StorageKind {
    #[default]
    Session,
    Cookie,
}

impl FromStr for StorageKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "session" => Ok(StorageKind::Session),
            "cookie" => Ok(StorageKind::Cookie),
            _ => Err(ConfigError::UnknownStorage(s.to_string())),
        }
    }
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageKind::Session => write!(f, "session"),
            StorageKind::Cookie => write!(f, "cookie"),
        }
    }
}

/// How flashes are encoded for byte-oriented backends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CodecKind {
    #[default]
    Json,
    CompressedJson,
    Binary,
}

impl CodecKind {
    pub fn build(self) -> Arc<dyn Codec> {
        match self {
            CodecKind::Json => Arc::new(JsonCodec),
            CodecKind::CompressedJson => Arc::new(CompressedJsonCodec::new()),
            CodecKind::Binary => Arc::new(BinaryCodec),
        }
    }
}

impl FromStr for CodecKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(CodecKind::Json),
            "json_zstd" | "json_zlib" | "compressed" => Ok(CodecKind::CompressedJson),
            "binary" | "bincode" => Ok(CodecKind::Binary),
            _ => Err(ConfigError::UnknownCodec(s.to_string())),
        }
    }
}

impl fmt::Display for CodecKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecKind::Json => write!(f, "json"),
            CodecKind::CompressedJson => write!(f, "json_zstd"),
            CodecKind::Binary => write!(f, "binary"),
        }
    }
}

/// Startup configuration of the flash layer.
#[derive(Clone, PartialEq)]
pub struct FlashConfig {
    /// Backend used to persist flashes
    pub storage: StorageKind,

    /// Codec used by byte-oriented backends
    pub codec: CodecKind,

    /// Key used to sign cookie payloads
    pub secret_key: Option<String>,

    /// Development mode
    pub debug: bool,

    /// Skip aging the flash on static requests (default: same as `debug`)
    pub ignore_static: Option<bool>,

    /// Path prefixes identifying static requests
    pub static_prefixes: Vec<String>,
}

impl fmt::Debug for FlashConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlashConfig")
            .field("storage", &self.storage)
            .field("codec", &self.codec)
            .field("secret_key", &self.secret_key.as_ref().map(|_| "<redacted>"))
            .field("debug", &self.debug)
            .field("ignore_static", &self.ignore_static)
            .field("static_prefixes", &self.static_prefixes)
            .finish()
    }
}

impl Default for FlashConfig {
    fn default() -> Self {
        Self {
            storage: StorageKind::default(),
            codec: CodecKind::default(),
            secret_key: None,
            debug: false,
            ignore_static: None,
            static_prefixes: DEFAULT_STATIC_PREFIXES
                .iter()
                .map(|prefix| prefix.to_string())
                .collect(),
        }
    }
}

impl FlashConfig {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(std::env::vars())
    }

    /// Reads the configuration from `(name, value)` pairs.
    ///
    /// Unrelated variables are ignored; empty values count as unset.
    pub fn from_vars<I, K, V>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut config = FlashConfig::default();

        for (name, value) in vars {
            let (name, value) = (name.as_ref(), value.as_ref());
            if value.trim().is_empty() {
                continue;
            }

            match name {
                ENV_STORAGE => config.storage = value.parse()?,
                ENV_CODEC => config.codec = value.parse()?,
                ENV_SECRET_KEY => config.secret_key = Some(value.to_string()),
                ENV_DEBUG => config.debug = parse_flag(name, value)?,
                ENV_IGNORE_STATIC => config.ignore_static = Some(parse_flag(name, value)?),
                ENV_STATIC_PREFIXES => {
                    config.static_prefixes = value
                        .split(',')
                        .map(str::trim)
                        .filter(|prefix| !prefix.is_empty())
                        .map(str::to_string)
                        .collect();
                }
                _ => {}
            }
        }

        Ok(config)
    }

    /// Returns whether static requests are exempt from aging the flash.
    pub fn ignores_static(&self) -> bool {
        self.ignore_static.unwrap_or(self.debug)
    }

    /// Builds the configured storage backend.
    pub fn build_storage(&self) -> Result<Arc<dyn FlashStorage>, ConfigError> {
        let storage: Arc<dyn FlashStorage> = match self.storage {
            StorageKind::Session => Arc::new(SessionStorage::new()),
            StorageKind::Cookie => {
                let secret = self
                    .secret_key
                    .as_deref()
                    .ok_or(ConfigError::MissingSecret("cookie"))?;
                let signer = Signer::new(self.codec.build(), secret)
                    .map_err(|_| ConfigError::MissingSecret("cookie"))?;
                Arc::new(CookieStorage::new(signer))
            }
        };
        Ok(storage)
    }

    /// Builds the middleware shared by every request.
    pub fn build_middleware(&self) -> Result<FlashMiddleware, ConfigError> {
        let storage = self.build_storage()?;
        let prefixes = self.static_prefixes.clone();

        info!(
            storage = %self.storage,
            codec = %self.codec,
            ignore_static = self.ignores_static(),
            "Flash middleware configured"
        );

        Ok(FlashMiddleware::new(storage)
            .ignore_static(self.ignores_static())
            .with_static_predicate(move |request| {
                prefixes
                    .iter()
                    .any(|prefix| request.path().starts_with(prefix.as_str()))
            }))
    }
}

fn parse_flag(name: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidFlag {
            name: name.to_string(),
            value: value.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Request;

    fn config(vars: &[(&str, &str)]) -> Result<FlashConfig, ConfigError> {
        FlashConfig::from_vars(vars.iter().copied())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[("PATH", "/usr/bin")]).unwrap();

        assert_eq!(config, FlashConfig::default());
        assert_eq!(config.storage, StorageKind::Session);
        assert_eq!(config.codec, CodecKind::Json);
        assert!(!config.ignores_static());
    }

    #[test]
    fn test_storage_aliases() {
        assert_eq!("session".parse::<StorageKind>().unwrap(), StorageKind::Session);
        assert_eq!(" Cookie ".parse::<StorageKind>().unwrap(), StorageKind::Cookie);
        assert_eq!(
            "database".parse::<StorageKind>(),
            Err(ConfigError::UnknownStorage("database".to_string()))
        );
    }

    #[test]
    fn test_codec_aliases() {
        let cases = [
            ("json", CodecKind::Json),
            ("JSON", CodecKind::Json),
            ("json_zstd", CodecKind::CompressedJson),
            ("json_zlib", CodecKind::CompressedJson),
            ("compressed", CodecKind::CompressedJson),
            ("binary", CodecKind::Binary),
            ("bincode", CodecKind::Binary),
        ];

        for (input, expected) in cases {
            assert_eq!(input.parse::<CodecKind>().unwrap(), expected, "{}", input);
        }
        assert!(matches!(
            "pickle".parse::<CodecKind>(),
            Err(ConfigError::UnknownCodec(_))
        ));
    }

    #[test]
    fn test_codec_kind_builds_named_codec() {
        assert_eq!(CodecKind::Json.build().name(), "json");
        assert_eq!(CodecKind::CompressedJson.build().name(), "json_zstd");
        assert_eq!(CodecKind::Binary.build().name(), "binary");
    }

    #[test]
    fn test_from_vars() {
        let config = config(&[
            (ENV_STORAGE, "cookie"),
            (ENV_CODEC, "binary"),
            (ENV_SECRET_KEY, "s3cret"),
            (ENV_DEBUG, "yes"),
            (ENV_STATIC_PREFIXES, "/assets/, ,/img/"),
        ])
        .unwrap();

        assert_eq!(config.storage, StorageKind::Cookie);
        assert_eq!(config.codec, CodecKind::Binary);
        assert_eq!(config.secret_key.as_deref(), Some("s3cret"));
        assert!(config.debug);
        assert_eq!(config.static_prefixes, vec!["/assets/", "/img/"]);
    }

    #[test]
    fn test_ignore_static_follows_debug() {
        assert!(config(&[(ENV_DEBUG, "1")]).unwrap().ignores_static());
        assert!(!config(&[(ENV_DEBUG, "0")]).unwrap().ignores_static());
        assert!(!config(&[(ENV_DEBUG, "true"), (ENV_IGNORE_STATIC, "false")])
            .unwrap()
            .ignores_static());
        assert!(config(&[(ENV_IGNORE_STATIC, "on")]).unwrap().ignores_static());
    }

    #[test]
    fn test_invalid_flag() {
        let err = config(&[(ENV_DEBUG, "maybe")]).unwrap_err();
        assert_eq!(err.to_string(), "invalid value 'maybe' for FLASH_DEBUG");
    }

    #[test]
    fn test_empty_values_are_unset() {
        let config = config(&[(ENV_STORAGE, ""), (ENV_SECRET_KEY, "  ")]).unwrap();

        assert_eq!(config.storage, StorageKind::Session);
        assert_eq!(config.secret_key, None);
    }

    #[test]
    fn test_cookie_storage_requires_secret() {
        let config = config(&[(ENV_STORAGE, "cookie")]).unwrap();

        assert_eq!(
            config.build_storage().err(),
            Some(ConfigError::MissingSecret("cookie"))
        );
    }

    #[test]
    fn test_build_storage() {
        let session = FlashConfig::default().build_storage().unwrap();
        assert_eq!(session.name(), "session");

        let cookie = config(&[(ENV_STORAGE, "cookie"), (ENV_SECRET_KEY, "k")])
            .unwrap()
            .build_storage()
            .unwrap();
        assert_eq!(cookie.name(), "cookie");
    }

    #[test]
    fn test_build_middleware_static_prefixes() {
        let middleware = config(&[(ENV_DEBUG, "true")])
            .unwrap()
            .build_middleware()
            .unwrap();

        assert!(!middleware.should_advance(&Request::new("/static/site.css")));
        assert!(!middleware.should_advance(&Request::new("/media/logo.png")));
        assert!(middleware.should_advance(&Request::new("/accounts/")));
        assert_eq!(middleware.storage().name(), "session");
    }

    #[test]
    fn test_debug_redacts_secret() {
        let config = config(&[(ENV_SECRET_KEY, "hunter2")]).unwrap();

        let debug = format!("{:?}", config);
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("<redacted>"));
    }
}
