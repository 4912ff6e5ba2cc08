use std::{net::SocketAddr, str::FromStr};

use anyhow::Context;
use axum::http::HeaderName;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub db_max_connections: u32,
    pub session_inactivity_minutes: i64,
    pub cors_permissive: bool,
    /// Header the fronting gateway puts the authenticated identity in.
    pub caller_header: HeaderName,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "sqlite://roomchat.db?mode=rwc".to_owned(),
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            db_max_connections: 16,
            session_inactivity_minutes: 5,
            cors_permissive: false,
            caller_header: HeaderName::from_static("x-caller-id"),
        }
    }
}

impl Config {
    /// Reads the process environment, picking up a `.env` file if one exists.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| dotenv::var(key).ok())
    }

    /// Builds a config from `lookup`, falling back to defaults for absent keys.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let defaults = Self::default();

        Ok(Self {
            database_url: lookup("DATABASE_URL").unwrap_or(defaults.database_url),
            bind_addr: parse_or(&lookup, "BIND_ADDR", defaults.bind_addr)?,
            db_max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", defaults.db_max_connections)?,
            session_inactivity_minutes: parse_or(
                &lookup,
                "SESSION_INACTIVITY_MINUTES",
                defaults.session_inactivity_minutes,
            )?,
            cors_permissive: parse_or(&lookup, "CORS_PERMISSIVE", defaults.cors_permissive)?,
            caller_header: parse_or(&lookup, "CALLER_HEADER", defaults.caller_header)?,
        })
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid {key}={raw:?}")),
        None => Ok(default),
    }
}
