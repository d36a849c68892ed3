// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Datadeck-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Datadeck and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Naming of uploaded source files.
//!
//! Uploads are stored flat under the configured upload directory, named after the
//! user-supplied filename with everything that could escape that directory stripped.

use std::fmt;
use std::path::{Path, PathBuf};

pub const ALLOWED_EXTENSIONS: &[&str] = &["csv", "xlsx", "xls"];

/// Reduces a user-supplied filename to a single safe path segment.
///
/// Path separators become word breaks, runs of whitespace become `_`, and every character
/// outside `[A-Za-z0-9_.-]` is dropped. Leading and trailing `.`/`_` are trimmed so the result
/// can be neither hidden nor `..`. Windows device names get a `_` prefix. Returns `None` when
/// nothing usable is left.
pub fn sanitize_filename(raw: &str) -> Option<String> {
    let spaced = raw.replace(['/', '\\'], " ");
    let joined = spaced.split_whitespace().collect::<Vec<_>>().join("_");
    let filtered = joined
        .chars()
        .filter(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '_' | '.' | '-'))
        .collect::<String>();
    let trimmed = filtered.trim_matches(['.', '_']);
    if trimmed.is_empty() {
        return None;
    }

    let base = trimmed.split('.').next().unwrap_or(trimmed);
    if is_windows_device_name(base) {
        return Some(format!("_{trimmed}"));
    }

    Some(trimmed.to_owned())
}

fn is_windows_device_name(base: &str) -> bool {
    let base = base.to_ascii_uppercase();
    match base.as_str() {
        "CON" | "PRN" | "AUX" | "NUL" => true,
        _ => {
            if let Some(num) = base.strip_prefix("COM") {
                matches!(num, "1" | "2" | "3" | "4" | "5" | "6" | "7" | "8" | "9")
            } else if let Some(num) = base.strip_prefix("LPT") {
                matches!(num, "1" | "2" | "3" | "4" | "5" | "6" | "7" | "8" | "9")
            } else {
                false
            }
        }
    }
}

/// Whether the filename carries one of [`ALLOWED_EXTENSIONS`] (case-insensitive).
pub fn is_allowed_extension(filename: &str) -> bool {
    filename.rsplit_once('.').is_some_and(|(_, ext)| {
        ALLOWED_EXTENSIONS.iter().any(|allowed| ext.eq_ignore_ascii_case(allowed))
    })
}

/// Where an upload named `raw_filename` is stored, plus the sanitized display name.
pub fn upload_path(
    upload_dir: &Path,
    raw_filename: &str,
) -> Result<(String, PathBuf), UploadError> {
    if !is_allowed_extension(raw_filename) {
        return Err(UploadError::UnsupportedType { filename: raw_filename.to_owned() });
    }
    let filename = sanitize_filename(raw_filename)
        .filter(|name| is_allowed_extension(name))
        .ok_or_else(|| UploadError::InvalidName { filename: raw_filename.to_owned() })?;

    let path = upload_dir.join(&filename);
    Ok((filename, path))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadError {
    InvalidName { filename: String },
    UnsupportedType { filename: String },
}

impl fmt::Display for UploadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidName { filename } => write!(f, "unusable upload filename {filename:?}"),
            Self::UnsupportedType { filename } => write!(
                f,
                "unsupported file type for {filename:?}; expected one of {}",
                ALLOWED_EXTENSIONS.join(", ")
            ),
        }
    }
}

impl std::error::Error for UploadError {}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use rstest::rstest;

    use super::{is_allowed_extension, sanitize_filename, upload_path, UploadError};

    #[rstest]
    #[case("sales.csv", Some("sales.csv"))]
    #[case("../../etc/passwd", Some("etc_passwd"))]
    #[case("..\\..\\boot.ini", Some("boot.ini"))]
    #[case("My Report 2026.xlsx", Some("My_Report_2026.xlsx"))]
    #[case(".hidden.csv", Some("hidden.csv"))]
    #[case("résumé.csv", Some("rsum.csv"))]
    #[case("con.csv", Some("_con.csv"))]
    #[case("LPT1", Some("_LPT1"))]
    #[case("../..", None)]
    #[case("", None)]
    fn sanitizes_filenames(#[case] raw: &str, #[case] expected: Option<&str>) {
        assert_eq!(sanitize_filename(raw).as_deref(), expected);
    }

    #[rstest]
    #[case("a.csv", true)]
    #[case("a.CSV", true)]
    #[case("a.xls", true)]
    #[case("a.xlsx", true)]
    #[case("a.json", false)]
    #[case("csv", false)]
    fn checks_extensions(#[case] name: &str, #[case] expected: bool) {
        assert_eq!(is_allowed_extension(name), expected);
    }

    #[test]
    fn upload_path_stays_inside_upload_dir() {
        let (name, path) =
            upload_path(Path::new("/srv/uploads"), "../../../tmp/evil.csv").unwrap();
        assert_eq!(name, "tmp_evil.csv");
        assert_eq!(path, Path::new("/srv/uploads/tmp_evil.csv"));
    }

    #[test]
    fn upload_path_rejects_unsupported_types() {
        let err = upload_path(Path::new("/srv/uploads"), "payload.exe").unwrap_err();
        assert_eq!(err, UploadError::UnsupportedType { filename: "payload.exe".to_owned() });
    }

    #[test]
    fn upload_path_rejects_names_that_sanitize_away() {
        let err = upload_path(Path::new("/srv/uploads"), "ñ.csv").unwrap_err();
        assert!(matches!(err, UploadError::InvalidName { .. }));
    }
}
