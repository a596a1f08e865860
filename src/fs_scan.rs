use crate::error::{BatchError, Result};
use crate::types::{FileEntry, Folder, TimestampPolicy};
use std::{
    collections::BTreeSet,
    fs,
    path::Path,
    time::{SystemTime, UNIX_EPOCH},
};
use walkdir::WalkDir;

/// Pick the folder to operate on.
///
/// An explicit folder is taken verbatim, relative to `cwd`. Without one the
/// folder argument is the base name of `cwd`, relative to its parent, so the
/// listed directory is `cwd` itself.
pub fn resolve_folder(explicit_folder: Option<&str>, cwd: &Path) -> Result<Folder> {
    let folder = match explicit_folder {
        Some(name) => {
            if name.trim().is_empty() {
                return Err(BatchError::config("folder argument is empty"));
            }
            Folder {
                name: name.to_string(),
                base: cwd.to_path_buf(),
            }
        }
        None => {
            let name = cwd
                .file_name()
                .and_then(|s| s.to_str())
                .ok_or_else(|| {
                    BatchError::config(format!(
                        "cannot derive a folder name from {}",
                        cwd.display()
                    ))
                })?;
            let base = cwd.parent().unwrap_or(cwd);
            Folder {
                name: name.to_string(),
                base: base.to_path_buf(),
            }
        }
    };

    let dir = folder.dir();
    fs::read_dir(&dir)
        .map_err(|e| BatchError::config(format!("folder {} not listable: {}", dir.display(), e)))?;

    Ok(folder)
}

/// ms since epoch, negative before it
fn unix_ms(t: SystemTime) -> i64 {
    match t.duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_millis() as i64,
        Err(e) => -(e.duration().as_millis() as i64),
    }
}

pub fn read_timestamp(meta: &fs::Metadata, policy: TimestampPolicy) -> std::io::Result<i64> {
    let t = match policy {
        TimestampPolicy::Created => meta.created()?,
        TimestampPolicy::Modified => meta.modified()?,
    };
    Ok(unix_ms(t))
}

/// Direct children of `folder` whose name ends with `extension`, in
/// enumeration order.
pub fn select_files(
    folder: &Path,
    extension: &str,
    exclude: &BTreeSet<String>,
    policy: TimestampPolicy,
) -> Result<Vec<FileEntry>> {
    let mut out = Vec::new();

    for entry in WalkDir::new(folder)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
    {
        let entry = entry
            .map_err(|e| BatchError::config(format!("read_dir {}: {}", folder.display(), e)))?;

        let name = entry.file_name().to_string_lossy().to_string();

        if !entry.file_type().is_file() {
            log::debug!("skip {} (not a file)", name);
            continue;
        }
        if !name.ends_with(extension) {
            log::debug!("skip {} (extension)", name);
            continue;
        }
        if exclude.contains(&name) {
            log::debug!("skip {} (excluded)", name);
            continue;
        }

        let meta = entry
            .metadata()
            .map_err(|e| BatchError::config(format!("metadata {}: {}", name, e)))?;
        let ts = read_timestamp(&meta, policy).map_err(|e| {
            BatchError::config(format!("{:?} time unavailable for {}: {}", policy, name, e))
        })?;

        out.push(FileEntry {
            path: name,
            timestamp_unix_ms: ts,
        });
    }

    Ok(out)
}

/// Oldest first; equal timestamps keep enumeration order.
pub fn order_files(mut entries: Vec<FileEntry>) -> Vec<String> {
    entries.sort_by_key(|e| e.timestamp_unix_ms);
    entries.into_iter().map(|e| e.path).collect()
}
