use crate::prelude::*;

use std::net::SocketAddr;

use anyhow::Context;

#[derive(Debug, Clone)]
pub struct Config {
    pub db_connection_url: String,
    pub db_max_connections: u32,

    pub server_host: String,
    pub server_port: u16,
    pub server_secure_cookies: bool,
    pub request_timeout_secs: u64,

    pub bootstrap_admin: Option<BootstrapAdmin>,
}

/// Staff account created (or promoted) on startup.
#[derive(Clone)]
pub struct BootstrapAdmin {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for BootstrapAdmin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BootstrapAdmin")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Config {
    pub fn server_addr(&self) -> Result<SocketAddr> {
        let addr = format!("{}:{}", self.server_host, self.server_port)
            .parse()
            .with_context(|| {
                format!(
                    "Invalid server address {}:{}",
                    self.server_host, self.server_port
                )
            })?;

        return Ok(addr);
    }
}

pub fn build() -> Result<Config> {
    dotenv::dotenv().ok();

    return from_lookup(|key| std::env::var(key).ok());
}

pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Config> {
    let db_connection_url = lookup("DATABASE_URL").context("DATABASE_URL must be set")?;

    let db_max_connections = parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 10)?;

    let server_host = lookup("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
    let server_port = parse_or(&lookup, "SERVER_PORT", 8000)?;
    let server_secure_cookies = parse_or(&lookup, "SERVER_SECURE_COOKIES", false)?;
    let request_timeout_secs = parse_or(&lookup, "REQUEST_TIMEOUT_SECS", 30)?;

    let bootstrap_admin = match (lookup("ADMIN_USERNAME"), lookup("ADMIN_PASSWORD")) {
        (Some(username), Some(password)) => Some(BootstrapAdmin { username, password }),
        (None, None) => None,
        _ => {
            return Err(anyhow::anyhow!(
                "ADMIN_USERNAME and ADMIN_PASSWORD must be set together"
            )
            .into())
        }
    };

    return Ok(Config {
        db_connection_url,
        db_max_connections,

        server_host,
        server_port,
        server_secure_cookies,
        request_timeout_secs,

        bootstrap_admin,
    });
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let Some(raw) = lookup(key) else {
        return Ok(default);
    };

    let value = raw
        .trim()
        .parse()
        .with_context(|| format!("{key} must be a valid value, got {raw:?}"))?;

    return Ok(value);
}
