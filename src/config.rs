// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! This module defines environment variable names, default values and the
//! [`Config`] struct loaded once at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `ENV` | Deployment environment (`development`, `production`) | `development` |
//! | `DATA_DIR` | Directory holding the redb database | `./data` |
//! | `FRONTEND_URL` | Base URL used in activation links | `http://localhost:3000` |
//! | `TOKEN_SECRET` | HMAC secret for access tokens | development secret |
//! | `TOKEN_ISSUER` | `iss` claim issued and expected | `SocialApp` |
//! | `TOKEN_AUDIENCE` | `aud` claim issued and expected | value of `TOKEN_ISSUER` |
//! | `TOKEN_TTL_SECS` | Access token lifetime | `259200` |
//! | `INVITATION_TTL_SECS` | Activation invitation lifetime | `259200` |
//! | `BASIC_AUTH_USERNAME` | Username for the health endpoint | `admin` |
//! | `BASIC_AUTH_PASSWORD` | Password for the health endpoint | `admin` |
//! | `RATE_LIMITER_ENABLED` | Mount the fixed-window limiter | `true` |
//! | `RATE_LIMITER_REQUESTS_PER_TIME_FRAME` | Requests allowed per window | `20` |
//! | `RATE_LIMITER_TIME_FRAME_SECS` | Window length | `5` |
//! | `USER_CACHE_ENABLED` | Cache resolved users in process | `true` |
//! | `USER_CACHE_TTL_SECS` | User cache entry lifetime | `60` |
//! | `USER_CACHE_CAPACITY` | Max cached users | `10000` |
//! | `STORAGE_TIMEOUT_SECS` | Bound on every storage call | `5` |
//! | `FROM_EMAIL` | Sender address for outgoing mail | `no-reply@social.local` |
//! | `SENDGRID_API_KEY` | SendGrid key; empty logs mail instead | empty |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const ENV_ENV: &str = "ENV";
pub const DATA_DIR_ENV: &str = "DATA_DIR";
pub const FRONTEND_URL_ENV: &str = "FRONTEND_URL";
pub const TOKEN_SECRET_ENV: &str = "TOKEN_SECRET";
pub const TOKEN_ISSUER_ENV: &str = "TOKEN_ISSUER";
pub const TOKEN_AUDIENCE_ENV: &str = "TOKEN_AUDIENCE";
pub const TOKEN_TTL_ENV: &str = "TOKEN_TTL_SECS";
pub const INVITATION_TTL_ENV: &str = "INVITATION_TTL_SECS";
pub const BASIC_AUTH_USERNAME_ENV: &str = "BASIC_AUTH_USERNAME";
pub const BASIC_AUTH_PASSWORD_ENV: &str = "BASIC_AUTH_PASSWORD";
pub const RATE_LIMITER_ENABLED_ENV: &str = "RATE_LIMITER_ENABLED";
pub const RATE_LIMITER_REQUESTS_ENV: &str = "RATE_LIMITER_REQUESTS_PER_TIME_FRAME";
pub const RATE_LIMITER_WINDOW_ENV: &str = "RATE_LIMITER_TIME_FRAME_SECS";
pub const USER_CACHE_ENABLED_ENV: &str = "USER_CACHE_ENABLED";
pub const USER_CACHE_TTL_ENV: &str = "USER_CACHE_TTL_SECS";
pub const USER_CACHE_CAPACITY_ENV: &str = "USER_CACHE_CAPACITY";
pub const STORAGE_TIMEOUT_ENV: &str = "STORAGE_TIMEOUT_SECS";
pub const FROM_EMAIL_ENV: &str = "FROM_EMAIL";
pub const SENDGRID_API_KEY_ENV: &str = "SENDGRID_API_KEY";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// Name of the redb file inside `DATA_DIR`.
pub const DATABASE_FILE: &str = "social.redb";

const DEFAULT_TOKEN_SECRET: &str =
    "averylongandsupersecuresecretkeythatshouldbereplacedoutsideofdevelopment";
const THREE_DAYS_SECS: u64 = 60 * 60 * 24 * 3;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}")]
    Invalid { key: &'static str, value: String },
}

/// Token signing and validation settings.
#[derive(Debug, Clone)]
pub struct TokenConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl: Duration,
}

/// Static credentials guarding the health endpoint.
#[derive(Debug, Clone)]
pub struct BasicAuthConfig {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    pub enabled: bool,
    pub requests_per_window: u32,
    pub window: Duration,
}

#[derive(Debug, Clone)]
pub struct UserCacheConfig {
    pub enabled: bool,
    pub ttl: Duration,
    pub capacity: usize,
}

#[derive(Debug, Clone)]
pub struct MailConfig {
    pub from_email: String,
    pub sendgrid_api_key: Option<String>,
    pub invitation_ttl: Duration,
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub env: String,
    pub data_dir: PathBuf,
    pub frontend_url: String,
    pub storage_timeout: Duration,
    pub token: TokenConfig,
    pub basic_auth: BasicAuthConfig,
    pub rate_limiter: RateLimiterConfig,
    pub user_cache: UserCacheConfig,
    pub mail: MailConfig,
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());
        let string = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let issuer = string(TOKEN_ISSUER_ENV, "SocialApp");
        let audience = get(TOKEN_AUDIENCE_ENV).unwrap_or_else(|| issuer.clone());

        Ok(Self {
            host: string(HOST_ENV, "0.0.0.0"),
            port: parse(get(PORT_ENV), PORT_ENV, 8080)?,
            env: string(ENV_ENV, "development"),
            data_dir: PathBuf::from(string(DATA_DIR_ENV, "./data")),
            frontend_url: string(FRONTEND_URL_ENV, "http://localhost:3000"),
            storage_timeout: secs(get(STORAGE_TIMEOUT_ENV), STORAGE_TIMEOUT_ENV, 5)?,
            token: TokenConfig {
                secret: string(TOKEN_SECRET_ENV, DEFAULT_TOKEN_SECRET),
                issuer,
                audience,
                ttl: secs(get(TOKEN_TTL_ENV), TOKEN_TTL_ENV, THREE_DAYS_SECS)?,
            },
            basic_auth: BasicAuthConfig {
                username: string(BASIC_AUTH_USERNAME_ENV, "admin"),
                password: string(BASIC_AUTH_PASSWORD_ENV, "admin"),
            },
            rate_limiter: RateLimiterConfig {
                enabled: parse(get(RATE_LIMITER_ENABLED_ENV), RATE_LIMITER_ENABLED_ENV, true)?,
                requests_per_window: parse(
                    get(RATE_LIMITER_REQUESTS_ENV),
                    RATE_LIMITER_REQUESTS_ENV,
                    20,
                )?,
                window: secs(get(RATE_LIMITER_WINDOW_ENV), RATE_LIMITER_WINDOW_ENV, 5)?,
            },
            user_cache: UserCacheConfig {
                enabled: parse(get(USER_CACHE_ENABLED_ENV), USER_CACHE_ENABLED_ENV, true)?,
                ttl: secs(get(USER_CACHE_TTL_ENV), USER_CACHE_TTL_ENV, 60)?,
                capacity: parse(get(USER_CACHE_CAPACITY_ENV), USER_CACHE_CAPACITY_ENV, 10_000)?,
            },
            mail: MailConfig {
                from_email: string(FROM_EMAIL_ENV, "no-reply@social.local"),
                sendgrid_api_key: get(SENDGRID_API_KEY_ENV),
                invitation_ttl: secs(get(INVITATION_TTL_ENV), INVITATION_TTL_ENV, THREE_DAYS_SECS)?,
            },
        })
    }

    pub fn is_production(&self) -> bool {
        self.env == "production"
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(DATABASE_FILE)
    }
}

impl Default for Config {
    fn default() -> Self {
        // An empty lookup only yields defaults, which always parse.
        Self::from_lookup(|_| None).unwrap_or_else(|e| unreachable!("default config: {e}"))
    }
}

fn parse<T: FromStr>(value: Option<String>, key: &'static str, default: T) -> Result<T, ConfigError> {
    match value {
        None => Ok(default),
        Some(v) => v
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value: v }),
    }
}

fn secs(value: Option<String>, key: &'static str, default: u64) -> Result<Duration, ConfigError> {
    parse(value, key, default).map(Duration::from_secs)
}
