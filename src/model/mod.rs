// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Datadeck-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Datadeck and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Core data model.
//!
//! A session owns one dataset snapshot and the results derived from it.

pub mod cache;
pub mod dataset;
pub(crate) mod fixtures;
pub mod ids;
pub mod session;

pub use cache::{CacheKey, ResultCache};
pub use dataset::{Cell, Cleaner, Dataset, DatasetError, DatasetLoader};
pub use ids::{IdError, SessionId};
pub use session::Session;
