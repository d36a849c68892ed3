// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Datadeck-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Datadeck and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Store configuration: where uploads and session records live, and how long idle sessions
//! are kept.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::store::WriteDurability;

pub const DEFAULT_UPLOAD_DIR: &str = "uploads";
pub const DEFAULT_CACHE_DIR: &str = "cache";
pub const DEFAULT_SESSION_TIMEOUT: Duration = Duration::from_secs(60 * 60);

pub const ENV_UPLOAD_DIR: &str = "DATADECK_UPLOAD_DIR";
pub const ENV_CACHE_DIR: &str = "DATADECK_CACHE_DIR";
pub const ENV_SESSION_TIMEOUT_SECS: &str = "DATADECK_SESSION_TIMEOUT_SECS";
pub const ENV_DURABLE_WRITES: &str = "DATADECK_DURABLE_WRITES";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    upload_dir: PathBuf,
    cache_dir: PathBuf,
    session_timeout: Duration,
    durability: WriteDurability,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from(DEFAULT_UPLOAD_DIR),
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            session_timeout: DEFAULT_SESSION_TIMEOUT,
            durability: WriteDurability::default(),
        }
    }
}

impl StoreConfig {
    pub fn new(upload_dir: impl Into<PathBuf>, cache_dir: impl Into<PathBuf>) -> Self {
        Self { upload_dir: upload_dir.into(), cache_dir: cache_dir.into(), ..Self::default() }
    }

    /// Defaults overridden by `DATADECK_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`StoreConfig::from_env`] with an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(dir) = lookup(ENV_UPLOAD_DIR).filter(|raw| !raw.trim().is_empty()) {
            config.upload_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup(ENV_CACHE_DIR).filter(|raw| !raw.trim().is_empty()) {
            config.cache_dir = PathBuf::from(dir);
        }
        if let Some(raw) = lookup(ENV_SESSION_TIMEOUT_SECS) {
            config.session_timeout = parse_secs(ENV_SESSION_TIMEOUT_SECS, &raw)?;
        }
        if let Some(raw) = lookup(ENV_DURABLE_WRITES) {
            if parse_flag(ENV_DURABLE_WRITES, &raw)? {
                config.durability = WriteDurability::Durable;
            }
        }

        Ok(config)
    }

    pub fn with_upload_dir(mut self, upload_dir: impl Into<PathBuf>) -> Self {
        self.upload_dir = upload_dir.into();
        self
    }

    pub fn with_cache_dir(mut self, cache_dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = cache_dir.into();
        self
    }

    pub fn with_session_timeout(mut self, session_timeout: Duration) -> Self {
        self.session_timeout = session_timeout;
        self
    }

    pub fn with_durability(mut self, durability: WriteDurability) -> Self {
        self.durability = durability;
        self
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn session_timeout(&self) -> Duration {
        self.session_timeout
    }

    pub fn durability(&self) -> WriteDurability {
        self.durability
    }

    /// Creates the upload and cache directories if they are missing.
    pub fn ensure_dirs(&self) -> Result<(), ConfigError> {
        for dir in [&self.upload_dir, &self.cache_dir] {
            fs::create_dir_all(dir)
                .map_err(|source| ConfigError::CreateDir { path: dir.clone(), source })?;
        }
        Ok(())
    }
}

/// Parses a whole number of seconds.
pub fn parse_secs(field: &'static str, raw: &str) -> Result<Duration, ConfigError> {
    raw.trim()
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|_| ConfigError::Invalid { field, value: raw.to_owned() })
}

fn parse_flag(field: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::Invalid { field, value: raw.to_owned() }),
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Invalid { field: &'static str, value: String },
    CreateDir { path: PathBuf, source: io::Error },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Invalid { field, value } => write!(f, "invalid value for {field}: {value:?}"),
            Self::CreateDir { path, source } => {
                write!(f, "cannot create directory {path:?}: {source}")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Invalid { .. } => None,
            Self::CreateDir { source, .. } => Some(source),
        }
    }
}
