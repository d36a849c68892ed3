// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Datadeck-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Datadeck and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Session registry and its persistence.
//!
//! `SessionStore` owns the in-memory table, cache invalidation and expiry; `SessionRecords`
//! reads and writes the one-file-per-session format it mirrors to.

pub mod clock;
pub mod records;
pub mod session_store;

#[cfg(test)]
pub(crate) mod test_support;

pub use clock::{Clock, SystemClock};
pub use records::{CorruptRecord, LoadRecordError, SessionRecords, StoreError, WriteDurability};
pub use session_store::{
    parse_session_id, CollaboratorError, Committed, RehydrateReport, SessionError, SessionStore,
    SessionUpdate,
};
