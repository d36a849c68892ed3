// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Datadeck-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Datadeck and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque session identifier.
///
/// Backed by a random (v4) UUID so ids are unique for the lifetime of a store and are never
/// reused after a session is deleted. The textual form is the hyphenated lowercase UUID, which
/// is also used as the stem of the session's durable record file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0.hyphenated(), f)
    }
}

impl FromStr for SessionId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(IdError::Empty);
        }
        Uuid::parse_str(s).map(Self).map_err(|_| IdError::Malformed { value: s.to_owned() })
    }
}

impl TryFrom<String> for SessionId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdError {
    Empty,
    Malformed { value: String },
}

impl fmt::Display for IdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("session id must not be empty"),
            Self::Malformed { value } => write!(f, "session id is not a uuid: {value:?}"),
        }
    }
}

impl std::error::Error for IdError {}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::{IdError, SessionId};

    #[test]
    fn id_rejects_empty() {
        assert_eq!("".parse::<SessionId>(), Err(IdError::Empty));
    }

    #[test]
    fn id_rejects_path_like_values() {
        let result = "../../etc/passwd".parse::<SessionId>();
        assert!(matches!(result, Err(IdError::Malformed { .. })));
    }

    #[test]
    fn id_display_parses_back() {
        let id = SessionId::generate();
        let parsed: SessionId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn ten_thousand_generated_ids_are_distinct() {
        let ids = (0..10_000).map(|_| SessionId::generate()).collect::<HashSet<_>>();
        assert_eq!(ids.len(), 10_000);
    }
}
