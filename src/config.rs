//! Server configuration parsed from environment variables.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use crate::services::chatter::DEFAULT_COLOR;
use crate::services::message_log::DEFAULT_WELCOME;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_BIND_ADDR: IpAddr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);
pub const DEFAULT_MAX_MESSAGE_LEN: usize = 2000;
pub const DEFAULT_FORWARDED_IP_HEADER: &str = "CF-Connecting-IP";
pub const DEFAULT_STATIC_DIR: &str = "static";
pub const DEFAULT_INDEX_FILE: &str = "static/index.html";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub bind_addr: IpAddr,
    pub port: u16,
    /// Submitted text beyond this many characters is cut off.
    pub max_message_len: usize,
    /// First record of the log and the floor `reset` returns to.
    pub welcome_message: String,
    pub default_color: String,
    /// Trusted header carrying the real client IP when behind a proxy.
    pub forwarded_ip_header: String,
    pub static_dir: PathBuf,
    pub index_file: PathBuf,
}

impl Config {
    /// Build config from process environment variables.
    ///
    /// Optional (all have defaults):
    /// - `BIND_ADDR`, `PORT`
    /// - `MAX_MESSAGE_LEN`
    /// - `WELCOME_MESSAGE`, `DEFAULT_CHATTER_COLOR`
    /// - `FORWARDED_IP_HEADER`
    /// - `STATIC_DIR`, `INDEX_FILE`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` when a numeric or address value does
    /// not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// See [`Config::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Ok(Self {
            bind_addr: parse_or("BIND_ADDR", get("BIND_ADDR"), DEFAULT_BIND_ADDR)?,
            port: parse_or("PORT", get("PORT"), DEFAULT_PORT)?,
            max_message_len: parse_or("MAX_MESSAGE_LEN", get("MAX_MESSAGE_LEN"), DEFAULT_MAX_MESSAGE_LEN)?,
            welcome_message: get("WELCOME_MESSAGE").unwrap_or_else(|| DEFAULT_WELCOME.to_string()),
            default_color: get("DEFAULT_CHATTER_COLOR").unwrap_or_else(|| DEFAULT_COLOR.to_string()),
            forwarded_ip_header: get("FORWARDED_IP_HEADER")
                .unwrap_or_else(|| DEFAULT_FORWARDED_IP_HEADER.to_string()),
            static_dir: get("STATIC_DIR").map_or_else(|| PathBuf::from(DEFAULT_STATIC_DIR), PathBuf::from),
            index_file: get("INDEX_FILE").map_or_else(|| PathBuf::from(DEFAULT_INDEX_FILE), PathBuf::from),
        })
    }

    #[must_use]
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR,
            port: DEFAULT_PORT,
            max_message_len: DEFAULT_MAX_MESSAGE_LEN,
            welcome_message: DEFAULT_WELCOME.to_string(),
            default_color: DEFAULT_COLOR.to_string(),
            forwarded_ip_header: DEFAULT_FORWARDED_IP_HEADER.to_string(),
            static_dir: PathBuf::from(DEFAULT_STATIC_DIR),
            index_file: PathBuf::from(DEFAULT_INDEX_FILE),
        }
    }
}

fn parse_or<T: std::str::FromStr>(key: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError> {
    match raw {
        Some(value) => value.trim().parse::<T>().map_err(|_| invalid(key, &value)),
        None => Ok(default),
    }
}

fn invalid(key: &'static str, value: &str) -> ConfigError {
    ConfigError::Invalid { key, value: value.to_owned() }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
