// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Datadeck-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Datadeck and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::fmt;
use std::fs;
use std::io;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{Dataset, DatasetError, ResultCache, Session, SessionId};

const RECORD_SUFFIX: &str = ".session.json";
const RECORD_VERSION: u32 = 1;

#[derive(Debug)]
pub enum StoreError {
    Io { path: PathBuf, source: io::Error },
    Json { path: PathBuf, source: serde_json::Error },
    SymlinkRefused { path: PathBuf },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "io error at {path:?}: {source}"),
            Self::Json { path, source } => write!(f, "json error at {path:?}: {source}"),
            Self::SymlinkRefused { path } => {
                write!(f, "refusing to write through symlink at {path:?}")
            }
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Json { source, .. } => Some(source),
            Self::SymlinkRefused { .. } => None,
        }
    }
}

/// Why a record file exists but cannot be turned back into a session.
#[derive(Debug)]
pub enum CorruptRecord {
    Json(serde_json::Error),
    UnsupportedVersion(u32),
    IdMismatch { found: String },
    Dataset(DatasetError),
}

impl fmt::Display for CorruptRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json(source) => write!(f, "undecodable record: {source}"),
            Self::UnsupportedVersion(version) => write!(f, "unsupported record version {version}"),
            Self::IdMismatch { found } => write!(f, "record belongs to session {found:?}"),
            Self::Dataset(source) => write!(f, "invalid dataset: {source}"),
        }
    }
}

#[derive(Debug)]
pub enum LoadRecordError {
    NotFound { path: PathBuf },
    Corrupt { path: PathBuf, reason: CorruptRecord },
    Io { path: PathBuf, source: io::Error },
}

impl fmt::Display for LoadRecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { path } => write!(f, "no session record at {path:?}"),
            Self::Corrupt { path, reason } => {
                write!(f, "corrupt session record {path:?}: {reason}")
            }
            Self::Io { path, source } => write!(f, "io error at {path:?}: {source}"),
        }
    }
}

impl std::error::Error for LoadRecordError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::NotFound { .. } => None,
            Self::Corrupt { reason: CorruptRecord::Json(source), .. } => Some(source),
            Self::Corrupt { reason: CorruptRecord::Dataset(source), .. } => Some(source),
            Self::Corrupt { .. } => None,
            Self::Io { source, .. } => Some(source),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum WriteDurability {
    /// Fast, best-effort persistence.
    ///
    /// - Writes a temp file and renames atomically into place.
    /// - Does not perform per-file fsync/sync.
    #[default]
    BestEffort,

    /// Slower, best-effort durability.
    ///
    /// Attempts to flush written file contents and rename operations to stable storage where
    /// possible. Exact guarantees are platform/filesystem-dependent.
    Durable,
}

/// One JSON file per session under a single directory.
///
/// The layer only serializes, deserializes and deletes by id; it knows nothing about cache
/// invalidation or expiry.
#[derive(Debug, Clone)]
pub struct SessionRecords {
    root: PathBuf,
    durability: WriteDurability,
}

impl SessionRecords {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into(), durability: WriteDurability::default() }
    }

    pub fn with_durability(mut self, durability: WriteDurability) -> Self {
        self.durability = durability;
        self
    }

    pub fn durability(&self) -> WriteDurability {
        self.durability
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn record_path(&self, session_id: &SessionId) -> PathBuf {
        self.root.join(format!("{session_id}{RECORD_SUFFIX}"))
    }

    /// Writes the full session, replacing any previous record for the same id.
    pub fn persist(&self, session: &Session) -> Result<(), StoreError> {
        let path = self.record_path(session.session_id());
        let record = record_to_json(session);
        let encoded = serde_json::to_vec(&record)
            .map_err(|source| StoreError::Json { path: path.clone(), source })?;

        write_atomic(&self.root, &path, &encoded, self.durability)
    }

    pub fn load(&self, session_id: &SessionId) -> Result<Session, LoadRecordError> {
        let path = self.record_path(session_id);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(source) if source.kind() == io::ErrorKind::NotFound => {
                return Err(LoadRecordError::NotFound { path });
            }
            Err(source) => return Err(LoadRecordError::Io { path, source }),
        };

        let record: SessionRecordJson = match serde_json::from_slice(&bytes) {
            Ok(record) => record,
            Err(source) => {
                return Err(LoadRecordError::Corrupt { path, reason: CorruptRecord::Json(source) });
            }
        };

        record_from_json(session_id, record)
            .map_err(|reason| LoadRecordError::Corrupt { path, reason })
    }

    /// Deletes the record for `session_id`; returns whether a file was removed.
    pub fn remove(&self, session_id: &SessionId) -> Result<bool, StoreError> {
        remove_file_if_exists(&self.record_path(session_id))
    }

    /// Ids of every record currently on disk, in no particular order.
    ///
    /// Files that do not look like session records (temp files, foreign files) are skipped.
    pub fn list_ids(&self) -> Result<Vec<SessionId>, StoreError> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(source) if source.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(StoreError::Io { path: self.root.clone(), source }),
        };

        let mut ids = Vec::new();
        for entry in entries {
            let entry =
                entry.map_err(|source| StoreError::Io { path: self.root.clone(), source })?;
            let file_name = entry.file_name();
            let Some(stem) = file_name.to_str().and_then(|name| name.strip_suffix(RECORD_SUFFIX))
            else {
                continue;
            };
            if let Ok(session_id) = stem.parse::<SessionId>() {
                ids.push(session_id);
            }
        }

        Ok(ids)
    }
}

#[derive(Debug, Serialize)]
struct SessionRecordJsonRef<'a> {
    version: u32,
    session_id: String,
    display_name: &'a str,
    source_path: &'a Path,
    revision: u64,
    created_at: DateTime<Utc>,
    last_accessed_at: DateTime<Utc>,
    dataset: &'a Dataset,
    cache: &'a ResultCache,
}

#[derive(Debug, Deserialize)]
struct SessionRecordJson {
    version: u32,
    session_id: String,
    display_name: String,
    source_path: PathBuf,
    #[serde(default)]
    revision: u64,
    created_at: DateTime<Utc>,
    last_accessed_at: DateTime<Utc>,
    dataset: Dataset,
    #[serde(default)]
    cache: ResultCache,
}

// Conversion and filesystem helpers for `SessionRecords`.
include!("records/helpers.rs");
