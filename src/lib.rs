// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Datadeck-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Datadeck and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Datadeck: per-user working sessions for tabular dataset analysis.
//!
//! A session holds an uploaded dataset and memoized results derived from it (insights, chart
//! payloads, predictions). Replacing the dataset drops those results; sessions are mirrored to
//! disk so they survive restarts, and idle ones are evicted by an explicit sweep.

pub mod config;
pub mod model;
pub mod store;
pub mod uploads;
