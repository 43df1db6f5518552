// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! This module defines environment variable names, default values and the
//! [`Settings`] loader. Configuration is read once at startup; any invalid
//! value aborts the process before the listener is bound.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `ACCESS_TOKEN_SECRET` | HS256 secret for access tokens | Required |
//! | `REFRESH_TOKEN_SECRET` | HS256 secret for refresh tokens (must differ) | Required |
//! | `ACCESS_TOKEN_TTL_SECS` | Access token lifetime (1-4294967295) | `900` |
//! | `REFRESH_TOKEN_TTL_SECS` | Refresh token lifetime (1-4294967295) | `604800` |
//! | `BCRYPT_COST` | bcrypt cost factor (4-31) | `10` |
//! | `INVITE_BATCH_MAX` | Max invite codes per request (1-20) | `20` |
//! | `DATA_DIR` | Directory holding `auth.redb` | unset (in-memory) |
//! | `REVOCATION_PRUNE_INTERVAL_SECS` | Revocation pruning interval | `3600` |
//! | `SEED_ADMIN_USERNAME` / `SEED_ADMIN_PASSWORD` | Bootstrap admin | unset |
//! | `SEED_INVITE_CODE` | Bootstrap invite code | unset |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const ACCESS_TOKEN_SECRET_ENV: &str = "ACCESS_TOKEN_SECRET";
pub const REFRESH_TOKEN_SECRET_ENV: &str = "REFRESH_TOKEN_SECRET";
pub const ACCESS_TOKEN_TTL_ENV: &str = "ACCESS_TOKEN_TTL_SECS";
pub const REFRESH_TOKEN_TTL_ENV: &str = "REFRESH_TOKEN_TTL_SECS";
pub const BCRYPT_COST_ENV: &str = "BCRYPT_COST";
pub const INVITE_BATCH_MAX_ENV: &str = "INVITE_BATCH_MAX";

/// Environment variable name for the database directory.
///
/// When set, users, invite codes and revoked refresh tokens are kept in
/// `$DATA_DIR/auth.redb` and survive restarts.
pub const DATA_DIR_ENV: &str = "DATA_DIR";
pub const PRUNE_INTERVAL_ENV: &str = "REVOCATION_PRUNE_INTERVAL_SECS";
pub const SEED_ADMIN_USERNAME_ENV: &str = "SEED_ADMIN_USERNAME";
pub const SEED_ADMIN_PASSWORD_ENV: &str = "SEED_ADMIN_PASSWORD";
pub const SEED_INVITE_CODE_ENV: &str = "SEED_INVITE_CODE";
pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// Default access token lifetime (15 minutes).
pub const DEFAULT_ACCESS_TTL_SECS: u64 = 15 * 60;
/// Default refresh token lifetime (7 days).
pub const DEFAULT_REFRESH_TTL_SECS: u64 = 7 * 24 * 60 * 60;
/// Longest accepted lifetime for either token kind.
pub const MAX_TOKEN_TTL_SECS: u64 = u32::MAX as u64;
pub const DEFAULT_BCRYPT_COST: u32 = 10;
/// Upper bound on invite codes generated by one request.
pub const MAX_INVITE_BATCH: usize = 20;
pub const DEFAULT_PRUNE_INTERVAL_SECS: u64 = 60 * 60;
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

/// Database file name inside `DATA_DIR`.
pub const DATABASE_FILE: &str = "auth.redb";

/// Configuration errors. Each one is fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },

    #[error("{name} must be within {min}..={max}, got {value}")]
    OutOfRange {
        name: &'static str,
        value: u64,
        min: u64,
        max: u64,
    },

    #[error("access and refresh tokens must be signed with different secrets")]
    SharedSecret,

    #[error("refresh token lifetime ({refresh}s) must exceed access token lifetime ({access}s)")]
    RefreshNotLonger { access: u64, refresh: u64 },
}

/// Signing material and lifetimes for both token kinds.
#[derive(Clone)]
pub struct TokenSettings {
    pub access_secret: String,
    pub refresh_secret: String,
    pub access_ttl_secs: u64,
    pub refresh_ttl_secs: u64,
}

impl fmt::Debug for TokenSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSettings")
            .field("access_secret", &"<redacted>")
            .field("refresh_secret", &"<redacted>")
            .field("access_ttl_secs", &self.access_ttl_secs)
            .field("refresh_ttl_secs", &self.refresh_ttl_secs)
            .finish()
    }
}

impl TokenSettings {
    /// Reject identical secrets, out-of-range lifetimes and inverted lifetimes.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.access_secret == self.refresh_secret {
            return Err(ConfigError::SharedSecret);
        }
        in_range(ACCESS_TOKEN_TTL_ENV, self.access_ttl_secs, 1, MAX_TOKEN_TTL_SECS)?;
        in_range(REFRESH_TOKEN_TTL_ENV, self.refresh_ttl_secs, 1, MAX_TOKEN_TTL_SECS)?;
        if self.refresh_ttl_secs <= self.access_ttl_secs {
            return Err(ConfigError::RefreshNotLonger {
                access: self.access_ttl_secs,
                refresh: self.refresh_ttl_secs,
            });
        }
        Ok(())
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

impl FromStr for LogFormat {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" | "text" => Ok(LogFormat::Pretty),
            _ => Err(()),
        }
    }
}

/// Bootstrap administrator created at startup if missing.
#[derive(Clone)]
pub struct SeedAdmin {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for SeedAdmin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SeedAdmin")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Fully validated process configuration.
#[derive(Debug, Clone)]
pub struct Settings {
    pub tokens: TokenSettings,
    pub bcrypt_cost: u32,
    pub invite_batch_max: usize,
    pub data_dir: Option<PathBuf>,
    pub prune_interval: Duration,
    pub seed_admin: Option<SeedAdmin>,
    pub seed_invite_code: Option<String>,
    pub host: String,
    pub port: u16,
    pub log_format: LogFormat,
}

impl Settings {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load through an arbitrary lookup function. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let tokens = TokenSettings {
            access_secret: get(ACCESS_TOKEN_SECRET_ENV)
                .ok_or(ConfigError::Missing(ACCESS_TOKEN_SECRET_ENV))?,
            refresh_secret: get(REFRESH_TOKEN_SECRET_ENV)
                .ok_or(ConfigError::Missing(REFRESH_TOKEN_SECRET_ENV))?,
            access_ttl_secs: parse_or(
                get(ACCESS_TOKEN_TTL_ENV),
                ACCESS_TOKEN_TTL_ENV,
                DEFAULT_ACCESS_TTL_SECS,
            )?,
            refresh_ttl_secs: parse_or(
                get(REFRESH_TOKEN_TTL_ENV),
                REFRESH_TOKEN_TTL_ENV,
                DEFAULT_REFRESH_TTL_SECS,
            )?,
        };
        tokens.validate()?;

        let bcrypt_cost: u32 = parse_or(get(BCRYPT_COST_ENV), BCRYPT_COST_ENV, DEFAULT_BCRYPT_COST)?;
        in_range(BCRYPT_COST_ENV, bcrypt_cost as u64, 4, 31)?;

        let invite_batch_max: usize =
            parse_or(get(INVITE_BATCH_MAX_ENV), INVITE_BATCH_MAX_ENV, MAX_INVITE_BATCH)?;
        in_range(INVITE_BATCH_MAX_ENV, invite_batch_max as u64, 1, MAX_INVITE_BATCH as u64)?;

        let prune_secs: u64 =
            parse_or(get(PRUNE_INTERVAL_ENV), PRUNE_INTERVAL_ENV, DEFAULT_PRUNE_INTERVAL_SECS)?;
        in_range(PRUNE_INTERVAL_ENV, prune_secs, 1, u32::MAX as u64)?;

        let seed_admin = match (get(SEED_ADMIN_USERNAME_ENV), get(SEED_ADMIN_PASSWORD_ENV)) {
            (Some(username), Some(password)) => Some(SeedAdmin { username, password }),
            (None, None) => None,
            (Some(_), None) => return Err(ConfigError::Missing(SEED_ADMIN_PASSWORD_ENV)),
            (None, Some(_)) => return Err(ConfigError::Missing(SEED_ADMIN_USERNAME_ENV)),
        };

        let log_format = match get(LOG_FORMAT_ENV) {
            Some(value) => value.parse().map_err(|_| ConfigError::Invalid {
                name: LOG_FORMAT_ENV,
                value,
            })?,
            None => LogFormat::default(),
        };

        Ok(Self {
            tokens,
            bcrypt_cost,
            invite_batch_max,
            data_dir: get(DATA_DIR_ENV).map(PathBuf::from),
            prune_interval: Duration::from_secs(prune_secs),
            seed_admin,
            seed_invite_code: get(SEED_INVITE_CODE_ENV).map(|c| c.trim().to_string()),
            host: get(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: parse_or(get(PORT_ENV), PORT_ENV, DEFAULT_PORT)?,
            log_format,
        })
    }

    /// Path of the redb database, if persistence is enabled.
    pub fn database_path(&self) -> Option<PathBuf> {
        self.data_dir.as_ref().map(|dir| dir.join(DATABASE_FILE))
    }
}

fn parse_or<T: FromStr>(raw: Option<String>, name: &'static str, default: T) -> Result<T, ConfigError> {
    match raw {
        Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid { name, value }),
        None => Ok(default),
    }
}

fn in_range(name: &'static str, value: u64, min: u64, max: u64) -> Result<(), ConfigError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            name,
            value,
            min,
            max,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Settings, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|name| vars.get(name).cloned())
    }

    const SECRETS: [(&str, &str); 2] = [
        (ACCESS_TOKEN_SECRET_ENV, "access-secret"),
        (REFRESH_TOKEN_SECRET_ENV, "refresh-secret"),
    ];

    #[test]
    fn defaults_apply() {
        let settings = load(&SECRETS).unwrap();
        assert_eq!(settings.tokens.access_ttl_secs, 900);
        assert_eq!(settings.tokens.refresh_ttl_secs, 604_800);
        assert_eq!(settings.bcrypt_cost, 10);
        assert_eq!(settings.invite_batch_max, 20);
        assert_eq!(settings.port, 8080);
        assert_eq!(settings.log_format, LogFormat::Pretty);
        assert!(settings.data_dir.is_none());
        assert!(settings.database_path().is_none());
        assert!(settings.seed_admin.is_none());
    }

    #[test]
    fn identical_secrets_fail_fast() {
        let result = load(&[
            (ACCESS_TOKEN_SECRET_ENV, "same"),
            (REFRESH_TOKEN_SECRET_ENV, "same"),
        ]);
        assert!(matches!(result, Err(ConfigError::SharedSecret)));
    }

    #[test]
    fn missing_secret_is_reported() {
        let result = load(&[(ACCESS_TOKEN_SECRET_ENV, "only-one")]);
        assert!(matches!(
            result,
            Err(ConfigError::Missing(REFRESH_TOKEN_SECRET_ENV))
        ));
    }

    #[test]
    fn batch_bounds_are_enforced() {
        let mut vars = SECRETS.to_vec();
        vars.push((INVITE_BATCH_MAX_ENV, "21"));
        assert!(matches!(load(&vars), Err(ConfigError::OutOfRange { .. })));

        vars.pop();
        vars.push((INVITE_BATCH_MAX_ENV, "0"));
        assert!(matches!(load(&vars), Err(ConfigError::OutOfRange { .. })));
    }

    #[test]
    fn refresh_must_outlive_access() {
        let mut vars = SECRETS.to_vec();
        vars.push((ACCESS_TOKEN_TTL_ENV, "600"));
        vars.push((REFRESH_TOKEN_TTL_ENV, "600"));
        assert!(matches!(
            load(&vars),
            Err(ConfigError::RefreshNotLonger { .. })
        ));
    }

    #[test]
    fn token_lifetimes_are_bounded() {
        let mut vars = SECRETS.to_vec();
        vars.push((REFRESH_TOKEN_TTL_ENV, "9223372036854775000"));
        assert!(matches!(
            load(&vars),
            Err(ConfigError::OutOfRange {
                name: REFRESH_TOKEN_TTL_ENV,
                ..
            })
        ));

        vars.pop();
        vars.push((REFRESH_TOKEN_TTL_ENV, "4294967296"));
        assert!(matches!(load(&vars), Err(ConfigError::OutOfRange { .. })));

        vars.pop();
        vars.push((REFRESH_TOKEN_TTL_ENV, "4294967295"));
        assert_eq!(load(&vars).unwrap().tokens.refresh_ttl_secs, u32::MAX as u64);

        let mut vars = SECRETS.to_vec();
        vars.push((ACCESS_TOKEN_TTL_ENV, "0"));
        assert!(matches!(
            load(&vars),
            Err(ConfigError::OutOfRange {
                name: ACCESS_TOKEN_TTL_ENV,
                ..
            })
        ));
    }

    #[test]
    fn unparsable_value_is_invalid() {
        let mut vars = SECRETS.to_vec();
        vars.push((BCRYPT_COST_ENV, "lots"));
        assert!(matches!(load(&vars), Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn seed_admin_needs_both_halves() {
        let mut vars = SECRETS.to_vec();
        vars.push((SEED_ADMIN_USERNAME_ENV, "root"));
        assert!(matches!(
            load(&vars),
            Err(ConfigError::Missing(SEED_ADMIN_PASSWORD_ENV))
        ));

        vars.push((SEED_ADMIN_PASSWORD_ENV, "bootstrap-pass"));
        let settings = load(&vars).unwrap();
        assert_eq!(settings.seed_admin.unwrap().username, "root");
    }

    #[test]
    fn data_dir_enables_database() {
        let mut vars = SECRETS.to_vec();
        vars.push((DATA_DIR_ENV, "/var/lib/auth"));
        vars.push((LOG_FORMAT_ENV, "JSON"));
        let settings = load(&vars).unwrap();
        assert_eq!(
            settings.database_path(),
            Some(PathBuf::from("/var/lib/auth/auth.redb"))
        );
        assert_eq!(settings.log_format, LogFormat::Json);
    }

    #[test]
    fn debug_redacts_secrets() {
        let settings = load(&SECRETS).unwrap();
        let rendered = format!("{settings:?}");
        assert!(!rendered.contains("access-secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
