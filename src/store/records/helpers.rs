// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Datadeck-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Datadeck and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

/// Session record helpers:
/// json conversion, safe atomic writes, and idempotent removal.
fn record_to_json(session: &Session) -> SessionRecordJsonRef<'_> {
    SessionRecordJsonRef {
        version: RECORD_VERSION,
        session_id: session.session_id().to_string(),
        display_name: session.display_name(),
        source_path: session.source_path(),
        revision: session.revision(),
        created_at: session.created_at(),
        last_accessed_at: session.last_accessed_at(),
        dataset: session.dataset(),
        cache: session.cache(),
    }
}

fn record_from_json(
    expected_id: &SessionId,
    record: SessionRecordJson,
) -> Result<Session, CorruptRecord> {
    if record.version != RECORD_VERSION {
        return Err(CorruptRecord::UnsupportedVersion(record.version));
    }

    match record.session_id.parse::<SessionId>() {
        Ok(found) if &found == expected_id => {}
        _ => return Err(CorruptRecord::IdMismatch { found: record.session_id }),
    }

    record.dataset.validate().map_err(CorruptRecord::Dataset)?;

    Ok(Session::from_parts(
        *expected_id,
        record.display_name,
        record.source_path,
        record.dataset,
        record.revision,
        record.created_at,
        record.last_accessed_at,
        record.cache,
    ))
}

/// Removes `path` if it exists; a missing file is not an error.
pub(crate) fn remove_file_if_exists(path: &Path) -> Result<bool, StoreError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(source) if source.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(source) => Err(StoreError::Io { path: path.to_path_buf(), source }),
    }
}

fn rename_overwrite(from: &Path, to: &Path) -> io::Result<()> {
    #[cfg(windows)]
    {
        match fs::rename(from, to) {
            Ok(()) => Ok(()),
            Err(err)
                if matches!(
                    err.kind(),
                    io::ErrorKind::AlreadyExists | io::ErrorKind::PermissionDenied
                ) =>
            {
                let _ = fs::remove_file(to);
                fs::rename(from, to)
            }
            Err(err) => Err(err),
        }
    }

    #[cfg(not(windows))]
    {
        fs::rename(from, to)
    }
}

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

fn write_atomic(
    root: &Path,
    path: &Path,
    contents: &[u8],
    durability: WriteDurability,
) -> Result<(), StoreError> {
    fs::create_dir_all(root)
        .map_err(|source| StoreError::Io { path: root.to_path_buf(), source })?;

    match fs::symlink_metadata(path) {
        Ok(md) if md.file_type().is_symlink() => {
            return Err(StoreError::SymlinkRefused { path: path.to_path_buf() });
        }
        Ok(_) => {}
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(source) => return Err(StoreError::Io { path: path.to_path_buf(), source }),
    }

    let Some(file_name) = path.file_name() else {
        return Err(StoreError::Io {
            path: path.to_path_buf(),
            source: io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"),
        });
    };

    let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_nanos();
    let counter = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    let tmp_path =
        root.join(format!(".datadeck.tmp.{}.{nanos}.{counter}", file_name.to_string_lossy()));

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&tmp_path)
        .map_err(|source| StoreError::Io { path: tmp_path.clone(), source })?;

    if let Err(source) = file.write_all(contents) {
        drop(file);
        let _ = fs::remove_file(&tmp_path);
        return Err(StoreError::Io { path: tmp_path, source });
    }

    if durability == WriteDurability::Durable {
        if let Err(source) = file.sync_all() {
            drop(file);
            let _ = fs::remove_file(&tmp_path);
            return Err(StoreError::Io { path: tmp_path, source });
        }
    }
    drop(file);

    if let Err(source) = rename_overwrite(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(StoreError::Io { path: path.to_path_buf(), source });
    }

    if durability == WriteDurability::Durable {
        #[cfg(unix)]
        {
            let dir = fs::File::open(root)
                .map_err(|source| StoreError::Io { path: root.to_path_buf(), source })?;
            dir.sync_all().map_err(|source| StoreError::Io { path: root.to_path_buf(), source })?;
        }
    }

    Ok(())
}
