// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Datadeck-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Datadeck and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;

use super::cache::{CacheKey, ResultCache};
use super::dataset::Dataset;
use super::ids::SessionId;

/// One user's working context: an uploaded dataset plus results derived from it.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    session_id: SessionId,
    display_name: String,
    source_path: PathBuf,
    dataset: Arc<Dataset>,
    revision: u64,
    created_at: DateTime<Utc>,
    last_accessed_at: DateTime<Utc>,
    cache: ResultCache,
}

impl Session {
    pub fn new(
        session_id: SessionId,
        display_name: impl Into<String>,
        source_path: impl Into<PathBuf>,
        dataset: Dataset,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            session_id,
            display_name: display_name.into(),
            source_path: source_path.into(),
            dataset: Arc::new(dataset),
            revision: 0,
            created_at: now,
            last_accessed_at: now,
            cache: ResultCache::new(),
        }
    }

    /// Reassembles a session from its persisted parts.
    ///
    /// `last_accessed_at` is clamped to `created_at` so a hand-edited record cannot break the
    /// timestamp ordering.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_parts(
        session_id: SessionId,
        display_name: String,
        source_path: PathBuf,
        dataset: Dataset,
        revision: u64,
        created_at: DateTime<Utc>,
        last_accessed_at: DateTime<Utc>,
        cache: ResultCache,
    ) -> Self {
        Self {
            session_id,
            display_name,
            source_path,
            dataset: Arc::new(dataset),
            revision,
            created_at,
            last_accessed_at: last_accessed_at.max(created_at),
            cache,
        }
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    pub fn dataset(&self) -> &Arc<Dataset> {
        &self.dataset
    }

    /// Bumped every time the dataset is replaced.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn last_accessed_at(&self) -> DateTime<Utc> {
        self.last_accessed_at
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    pub fn cached(&self, key: &CacheKey) -> Option<&Value> {
        self.cache.get(key)
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_accessed_at = self.last_accessed_at.max(now);
    }

    /// Swaps in a new snapshot and drops every cached result in the same step.
    pub fn replace_dataset(&mut self, dataset: Dataset) {
        self.dataset = Arc::new(dataset);
        self.revision = self.revision.wrapping_add(1);
        self.cache.clear();
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    pub fn insert_cached(&mut self, key: CacheKey, value: Value) -> Option<Value> {
        self.cache.insert(key, value)
    }

    pub fn idle_for(&self, now: DateTime<Utc>) -> chrono::Duration {
        now.signed_duration_since(self.last_accessed_at)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};
    use serde_json::json;

    use super::Session;
    use crate::model::fixtures::small_dataset;
    use crate::model::{CacheKey, SessionId};

    #[test]
    fn replace_dataset_clears_cache_and_bumps_revision() {
        let t0 = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let mut session =
            Session::new(SessionId::generate(), "a.csv", "/up/a.csv", small_dataset(), t0);
        session.insert_cached(CacheKey::new("insights"), json!({"rows": 3}));

        session.replace_dataset(small_dataset());

        assert!(session.cache().is_empty());
        assert_eq!(session.revision(), 1);
    }

    #[test]
    fn touch_never_moves_backwards() {
        let t0 = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let mut session =
            Session::new(SessionId::generate(), "a.csv", "/up/a.csv", small_dataset(), t0);

        session.touch(t0 + Duration::seconds(10));
        session.touch(t0 + Duration::seconds(5));

        assert_eq!(session.last_accessed_at(), t0 + Duration::seconds(10));
        assert!(session.last_accessed_at() >= session.created_at());
    }
}
