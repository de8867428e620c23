use anyhow::anyhow;
use std::fmt::Display;
use std::str::FromStr;

pub const BIND_VAR: &str = "LW_BIND";
pub const STORE_CAPACITY_VAR: &str = "LW_STORE_CAPACITY";
pub const WORKERS_VAR: &str = "LW_WORKERS";
pub const MAX_UPLOAD_BYTES_VAR: &str = "LW_MAX_UPLOAD_BYTES";

pub const DEFAULT_BIND: &str = "127.0.0.1:3001";
pub const DEFAULT_STORE_CAPACITY: usize = 256;
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 32 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub store_capacity: usize,
    /// `None` means one analysis worker per CPU.
    pub workers: Option<usize>,
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND.to_string(),
            store_capacity: DEFAULT_STORE_CAPACITY,
            workers: None,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key lookup; unset or empty keys keep their default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            bind_addr: read(&lookup, BIND_VAR).unwrap_or(defaults.bind_addr),
            store_capacity: parse(&lookup, STORE_CAPACITY_VAR)?.unwrap_or(defaults.store_capacity),
            workers: parse(&lookup, WORKERS_VAR)?.or(defaults.workers),
            max_upload_bytes: parse(&lookup, MAX_UPLOAD_BYTES_VAR)?
                .unwrap_or(defaults.max_upload_bytes),
        })
    }
}

fn read(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key).map(|value| value.trim().to_string()).filter(|value| !value.is_empty())
}

fn parse<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> anyhow::Result<Option<T>>
where
    T: FromStr,
    T::Err: Display,
{
    read(lookup, key)
        .map(|value| value.parse::<T>().map_err(|e| anyhow!("invalid {key}={value}: {e}")))
        .transpose()
}
