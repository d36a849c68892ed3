// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Datadeck-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Datadeck and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::clock::{Clock, SystemClock};
use super::records::{remove_file_if_exists, LoadRecordError, SessionRecords, StoreError};
use crate::config::StoreConfig;
use crate::model::{CacheKey, Cleaner, Dataset, DatasetLoader, Session, SessionId};

/// Uniform "this session does not exist" signal.
///
/// Unknown ids, deleted or expired sessions, malformed ids and unreadable records all end up
/// here so every caller can react the same way (redirect or 404).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    NotFound { session_id: String },
}

impl SessionError {
    pub fn not_found(session_id: impl fmt::Display) -> Self {
        Self::NotFound { session_id: session_id.to_string() }
    }
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { session_id } => write!(f, "session not found: {session_id}"),
        }
    }
}

impl std::error::Error for SessionError {}

/// Parses a caller-supplied id; malformed ids are reported as not found.
pub fn parse_session_id(raw: &str) -> Result<SessionId, SessionError> {
    raw.parse().map_err(|_| SessionError::not_found(raw))
}

/// Failure of an operation that hands the session's dataset to an outside routine.
#[derive(Debug)]
pub enum CollaboratorError<E> {
    Session(SessionError),
    Failed(E),
}

impl<E> From<SessionError> for CollaboratorError<E> {
    fn from(err: SessionError) -> Self {
        Self::Session(err)
    }
}

impl<E: fmt::Display> fmt::Display for CollaboratorError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Session(err) => fmt::Display::fmt(err, f),
            Self::Failed(err) => fmt::Display::fmt(err, f),
        }
    }
}

impl<E> std::error::Error for CollaboratorError<E>
where
    E: std::error::Error + 'static,
{
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Session(err) => Some(err),
            Self::Failed(err) => Some(err),
        }
    }
}

/// Result of a mutation that was applied in memory.
///
/// The mutation always stands. `persist_error` is set when writing the durable record failed,
/// in which case the change survives only until the process exits (or the next successful
/// write of the same session).
#[must_use]
#[derive(Debug)]
pub struct Committed<T> {
    value: T,
    persist_error: Option<StoreError>,
}

impl<T> Committed<T> {
    fn new(value: T, persist_error: Option<StoreError>) -> Self {
        Self { value, persist_error }
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn into_value(self) -> T {
        self.value
    }

    pub fn is_durable(&self) -> bool {
        self.persist_error.is_none()
    }

    pub fn persist_error(&self) -> Option<&StoreError> {
        self.persist_error.as_ref()
    }

    pub fn into_parts(self) -> (T, Option<StoreError>) {
        (self.value, self.persist_error)
    }
}

/// Replaceable parts of a session.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionUpdate {
    /// Commit a new snapshot; every cached result is dropped with the old one.
    Dataset(Dataset),
    ClearCache,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RehydrateReport {
    pub loaded: usize,
    pub already_live: usize,
    pub unreadable: usize,
}

#[derive(Debug)]
enum Slot {
    /// Registered in the table but not yet recovered from disk.
    Vacant,
    Live(Session),
    /// Deleted or evicted; the handle may still be held by a racing caller.
    Removed,
}

type SlotHandle = Arc<Mutex<Slot>>;

/// Registry of live sessions, mirrored to one durable record per session.
///
/// Each session sits behind its own lock, so operations on different sessions never wait on
/// each other. The table's shard locks are only held long enough to look up or swap a handle,
/// never across file I/O.
///
/// Expiry happens only when [`SessionStore::sweep`] is called; the store never schedules it.
pub struct SessionStore {
    config: StoreConfig,
    records: SessionRecords,
    sessions: DashMap<SessionId, SlotHandle>,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionStore")
            .field("config", &self.config)
            .field("sessions", &self.sessions.len())
            .finish_non_exhaustive()
    }
}

impl SessionStore {
    pub fn new(config: StoreConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: StoreConfig, clock: Arc<dyn Clock>) -> Self {
        let records = SessionRecords::new(config.cache_dir()).with_durability(config.durability());
        Self { config, records, sessions: DashMap::new(), clock }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn records(&self) -> &SessionRecords {
        &self.records
    }

    /// Number of table entries, including ones that are mid-recovery or mid-removal.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn session_ids(&self) -> Vec<SessionId> {
        self.sessions.iter().map(|entry| *entry.key()).collect()
    }

    /// Registers a new session with an empty cache and persists it.
    pub fn create(
        &self,
        display_name: impl Into<String>,
        source_path: impl Into<PathBuf>,
        dataset: Dataset,
    ) -> Committed<SessionId> {
        let display_name = display_name.into();
        let source_path = source_path.into();
        let now = self.clock.now();

        loop {
            let session_id = SessionId::generate();
            let Entry::Vacant(entry) = self.sessions.entry(session_id) else {
                continue;
            };

            let handle = Arc::new(Mutex::new(Slot::Vacant));
            let mut slot = handle.lock();
            entry.insert(Arc::clone(&handle));

            let session = Session::new(session_id, display_name, source_path, dataset, now);
            debug!(
                session_id = %session_id,
                display_name = session.display_name(),
                rows = session.dataset().row_count(),
                "session created"
            );
            let persist_error = self.persist_locked(&session);
            *slot = Slot::Live(session);
            return Committed::new(session_id, persist_error);
        }
    }

    /// Loads an upload through `loader` and registers the result as a new session.
    ///
    /// Loader failures are returned as-is and leave no trace in the store.
    pub fn create_from_upload<L: DatasetLoader>(
        &self,
        loader: &L,
        display_name: impl Into<String>,
        source_path: impl Into<PathBuf>,
    ) -> Result<Committed<SessionId>, L::Error> {
        let source_path = source_path.into();
        let dataset = loader.load(&source_path)?;
        Ok(self.create(display_name, source_path, dataset))
    }

    /// Returns a snapshot of the session and refreshes its access time.
    ///
    /// Sessions missing from memory are recovered from their durable record; a missing or
    /// corrupt record yields [`SessionError::NotFound`].
    pub fn get(&self, session_id: &SessionId) -> Result<Session, SessionError> {
        let now = self.clock.now();
        self.with_session(session_id, |session| {
            session.touch(now);
            session.clone()
        })
    }

    pub fn update(
        &self,
        session_id: &SessionId,
        update: SessionUpdate,
    ) -> Result<Committed<()>, SessionError> {
        let now = self.clock.now();
        self.with_session(session_id, |session| {
            session.touch(now);
            match update {
                SessionUpdate::Dataset(dataset) => {
                    let dropped = session.cache().len();
                    session.replace_dataset(dataset);
                    debug!(
                        session_id = %session_id,
                        revision = session.revision(),
                        dropped,
                        "dataset replaced"
                    );
                }
                SessionUpdate::ClearCache => session.clear_cache(),
            }
            Committed::new((), self.persist_locked(session))
        })
    }

    /// Runs `cleaner` on the current dataset and commits its output.
    ///
    /// The session stays locked while the cleaner runs so no other write can slip in between
    /// reading the old snapshot and committing the new one.
    pub fn apply_cleaning<C: Cleaner>(
        &self,
        session_id: &SessionId,
        cleaner: &C,
    ) -> Result<Committed<()>, CollaboratorError<C::Error>> {
        let now = self.clock.now();
        self.with_session(session_id, |session| -> Result<_, CollaboratorError<C::Error>> {
            session.touch(now);
            let cleaned = cleaner.clean(session.dataset()).map_err(CollaboratorError::Failed)?;
            session.replace_dataset(cleaned);
            debug!(session_id = %session_id, revision = session.revision(), "cleaning committed");
            Ok(Committed::new((), self.persist_locked(session)))
        })?
    }

    pub fn cache_put(
        &self,
        session_id: &SessionId,
        key: CacheKey,
        value: Value,
    ) -> Result<Committed<()>, SessionError> {
        let now = self.clock.now();
        self.with_session(session_id, |session| {
            session.touch(now);
            session.insert_cached(key, value);
            Committed::new((), self.persist_locked(session))
        })
    }

    /// Reads a cached result. `Ok(None)` is a miss.
    ///
    /// Refreshes the access time in memory only; nothing is written to disk.
    pub fn cache_get(
        &self,
        session_id: &SessionId,
        key: &CacheKey,
    ) -> Result<Option<Value>, SessionError> {
        let now = self.clock.now();
        self.with_session(session_id, |session| {
            session.touch(now);
            session.cached(key).cloned()
        })
    }

    /// Returns the cached result for `key`, computing and caching it on a miss.
    ///
    /// `compute` runs without holding the session lock. Its result is cached only if the
    /// dataset was not replaced in the meantime; otherwise it is returned to the caller but
    /// never stored, so it cannot be served against the newer dataset.
    pub fn get_or_compute<E, F>(
        &self,
        session_id: &SessionId,
        key: CacheKey,
        compute: F,
    ) -> Result<Committed<Value>, CollaboratorError<E>>
    where
        F: FnOnce(&Dataset) -> Result<Value, E>,
    {
        let now = self.clock.now();
        let lookup = self.with_session(session_id, |session| {
            session.touch(now);
            match session.cached(&key) {
                Some(value) => Ok(value.clone()),
                None => Err((Arc::clone(session.dataset()), session.revision())),
            }
        })?;

        let (dataset, revision) = match lookup {
            Ok(value) => return Ok(Committed::new(value, None)),
            Err(snapshot) => snapshot,
        };

        debug!(session_id = %session_id, key = %key, "cache miss");
        let value = compute(dataset.as_ref()).map_err(CollaboratorError::Failed)?;

        let now = self.clock.now();
        let persist_error = self.with_session(session_id, |session| {
            if session.revision() != revision {
                debug!(
                    session_id = %session_id,
                    key = %key,
                    computed_for = revision,
                    current = session.revision(),
                    "dataset changed during computation; result not cached"
                );
                return None;
            }
            session.touch(now);
            session.insert_cached(key, value.clone());
            self.persist_locked(session)
        })?;

        Ok(Committed::new(value, persist_error))
    }

    /// Removes the session from memory together with its record and its uploaded file.
    ///
    /// Deleting an unknown or already deleted session is not an error. Sessions that only
    /// exist on disk are removed as well.
    ///
    /// If a file cannot be removed the error is returned and the id stays registered as removed,
    /// so the leftover record is never loaded again by this store. Calling `delete` again
    /// retries the removal.
    pub fn delete(&self, session_id: &SessionId) -> Result<(), StoreError> {
        let handle = self.slot(session_id);
        let mut slot = handle.lock();
        let result = self.evict_locked(session_id, &mut slot);
        drop(slot);
        if result.is_ok() {
            self.sessions.remove_if(session_id, |_, current| Arc::ptr_eq(current, &handle));
        }
        result
    }

    /// Evicts every in-memory session idle for strictly longer than the configured timeout.
    ///
    /// Sessions are locked one at a time, so concurrent operations on other sessions proceed
    /// during the scan. Returns the number of evicted sessions.
    pub fn sweep(&self, now: DateTime<Utc>) -> usize {
        let timeout = self.config.session_timeout();
        let handles = self
            .sessions
            .iter()
            .map(|entry| (*entry.key(), Arc::clone(entry.value())))
            .collect::<Vec<_>>();

        let mut evicted = 0;
        for (session_id, handle) in handles {
            let mut slot = handle.lock();
            let expired = match &*slot {
                Slot::Live(session) => {
                    session.idle_for(now).to_std().is_ok_and(|idle| idle > timeout)
                }
                Slot::Vacant | Slot::Removed => false,
            };
            if !expired {
                continue;
            }

            let result = self.evict_locked(&session_id, &mut slot);
            drop(slot);
            match result {
                Ok(()) => {
                    self.sessions
                        .remove_if(&session_id, |_, current| Arc::ptr_eq(current, &handle));
                }
                Err(err) => {
                    warn!(
                        session_id = %session_id,
                        error = %err,
                        "expired session left files behind"
                    );
                }
            }
            evicted += 1;
        }

        if evicted > 0 {
            info!(evicted, remaining = self.sessions.len(), "expired sessions evicted");
        }
        evicted
    }

    /// Loads every durable record that is not in memory yet.
    ///
    /// Meant for process start, so that sweeps also reach sessions written by a previous run.
    /// Access times are kept as persisted.
    pub fn rehydrate_all(&self) -> Result<RehydrateReport, StoreError> {
        let mut report = RehydrateReport::default();

        for session_id in self.records.list_ids()? {
            let handle = self.slot(&session_id);
            let mut slot = handle.lock();
            match &*slot {
                Slot::Live(_) => report.already_live += 1,
                Slot::Removed => {}
                Slot::Vacant => match self.recover(&session_id) {
                    Some(session) => {
                        *slot = Slot::Live(session);
                        report.loaded += 1;
                    }
                    None => {
                        drop(slot);
                        self.sessions
                            .remove_if(&session_id, |_, current| Arc::ptr_eq(current, &handle));
                        report.unreadable += 1;
                    }
                },
            }
        }

        info!(
            loaded = report.loaded,
            already_live = report.already_live,
            unreadable = report.unreadable,
            "session records rehydrated"
        );
        Ok(report)
    }

    fn slot(&self, session_id: &SessionId) -> SlotHandle {
        let entry = self
            .sessions
            .entry(*session_id)
            .or_insert_with(|| Arc::new(Mutex::new(Slot::Vacant)));
        Arc::clone(entry.value())
    }

    /// Runs `f` against the live session under its lock, recovering it from disk first if
    /// needed.
    fn with_session<R>(
        &self,
        session_id: &SessionId,
        f: impl FnOnce(&mut Session) -> R,
    ) -> Result<R, SessionError> {
        let handle = self.slot(session_id);
        let mut slot = handle.lock();

        if matches!(*slot, Slot::Vacant) {
            match self.recover(session_id) {
                Some(session) => *slot = Slot::Live(session),
                None => {
                    drop(slot);
                    self.sessions.remove_if(session_id, |_, current| Arc::ptr_eq(current, &handle));
                    return Err(SessionError::not_found(session_id));
                }
            }
        }

        match &mut *slot {
            Slot::Live(session) => Ok(f(session)),
            Slot::Vacant | Slot::Removed => Err(SessionError::not_found(session_id)),
        }
    }

    fn recover(&self, session_id: &SessionId) -> Option<Session> {
        match self.records.load(session_id) {
            Ok(session) => {
                debug!(session_id = %session_id, "session recovered from disk");
                Some(session)
            }
            Err(LoadRecordError::NotFound { .. }) => None,
            Err(err) => {
                warn!(session_id = %session_id, error = %err, "session record unreadable");
                None
            }
        }
    }

    fn persist_locked(&self, session: &Session) -> Option<StoreError> {
        match self.records.persist(session) {
            Ok(()) => None,
            Err(err) => {
                warn!(
                    session_id = %session.session_id(),
                    error = %err,
                    "session change kept in memory only"
                );
                Some(err)
            }
        }
    }

    /// Marks the slot removed and deletes the session's files. The caller drops the table
    /// entry afterwards, but only on success: a `Removed` slot left in the table keeps a
    /// record that could not be deleted from being recovered.
    fn evict_locked(&self, session_id: &SessionId, slot: &mut Slot) -> Result<(), StoreError> {
        let source_path = match std::mem::replace(slot, Slot::Removed) {
            Slot::Live(session) => Some(session.source_path().to_path_buf()),
            Slot::Vacant => self
                .records
                .load(session_id)
                .ok()
                .map(|session| session.source_path().to_path_buf()),
            Slot::Removed => None,
        };

        let record_result = self.records.remove(session_id).map(|_| ());
        let source_result = match source_path.as_deref() {
            Some(path) => remove_file_if_exists(path).map(|_| ()),
            None => Ok(()),
        };

        debug!(session_id = %session_id, "session removed");
        record_result.and(source_result)
    }
}
