// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Datadeck-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Datadeck and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use smol_str::SmolStr;

/// Key of a memoized derived result.
///
/// Plain keys are bare operation names (`"insights"`, `"visualizations"`). Two requests that
/// share an operation name but differ in their parameters map to the same plain key and
/// overwrite each other; use [`CacheKey::with_params`] when the result depends on request
/// parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(SmolStr);

impl CacheKey {
    pub fn new(operation: impl AsRef<str>) -> Self {
        Self(SmolStr::new(operation))
    }

    /// Builds `operation#<hash>` where the hash is a stable FNV-1a digest of the parameters'
    /// JSON encoding.
    ///
    /// Struct fields serialize in declaration order and `serde_json::Value` objects are sorted,
    /// so equal parameters always produce equal keys across processes.
    pub fn with_params<P: Serialize + ?Sized>(
        operation: &str,
        params: &P,
    ) -> Result<Self, serde_json::Error> {
        let encoded = serde_json::to_vec(params)?;
        Ok(Self(smol_str::format_smolstr!("{operation}#{:016x}", fnv1a64(&encoded))))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// The operation part of the key (everything before `#`).
    pub fn operation(&self) -> &str {
        self.as_str().split_once('#').map_or(self.as_str(), |(operation, _)| operation)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Borrow<str> for CacheKey {
    fn borrow(&self) -> &str {
        self.as_str()
    }
}

impl From<&str> for CacheKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for CacheKey {
    fn from(value: String) -> Self {
        Self(SmolStr::from(value))
    }
}

fn fnv1a64(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;

    bytes.iter().fold(OFFSET, |hash, &b| (hash ^ u64::from(b)).wrapping_mul(PRIME))
}

/// Memoized derived results of one session.
pub type ResultCache = BTreeMap<CacheKey, Value>;
