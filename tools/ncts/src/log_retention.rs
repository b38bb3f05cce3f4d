use crate::errors::NctsError;
use std::fs;
use std::path::{Path, PathBuf};

/// The one older generation kept beside an event log:
/// `events.jsonl` rotates to `events.1.jsonl`.
pub fn rotated_path(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{stem}.1.{}", ext.to_string_lossy()),
        None => format!("{stem}.1"),
    };
    path.with_file_name(name)
}

/// Keeps the log and its rotated generation within `budget_bytes` together.
/// Once the live file passes half the budget it replaces the previous
/// generation. No other file in the directory is ever touched.
pub fn rotate_if_over_budget(path: &Path, budget_bytes: u64) -> Result<Option<PathBuf>, NctsError> {
    let len = match fs::metadata(path) {
        Ok(meta) => meta.len(),
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(error) => return Err(NctsError::Io(error.to_string())),
    };
    if len <= budget_bytes / 2 {
        return Ok(None);
    }
    let rotated = rotated_path(path);
    fs::rename(path, &rotated).map_err(|e| NctsError::Io(e.to_string()))?;
    Ok(Some(rotated))
}

#[cfg(test)]
mod tests {
    use super::{rotate_if_over_budget, rotated_path};
    use std::fs;
    use std::path::{Path, PathBuf};

    #[test]
    fn rotated_name_keeps_the_extension() {
        assert_eq!(
            rotated_path(Path::new("/var/tmp/ncts/events.jsonl")),
            PathBuf::from("/var/tmp/ncts/events.1.jsonl")
        );
        assert_eq!(rotated_path(Path::new("/tmp/trace")), PathBuf::from("/tmp/trace.1"));
    }

    #[test]
    fn small_log_stays_put() {
        let dir = tempfile::tempdir().expect("tempdir");
        let log = dir.path().join("events.jsonl");
        fs::write(&log, vec![b'x'; 40]).expect("log");

        assert_eq!(rotate_if_over_budget(&log, 100).expect("rotate"), None);
        assert!(log.exists());
    }

    #[test]
    fn oversized_log_replaces_the_previous_generation() {
        let dir = tempfile::tempdir().expect("tempdir");
        let log = dir.path().join("events.jsonl");
        let older = dir.path().join("events.1.jsonl");
        fs::write(&older, "old generation").expect("older");
        fs::write(&log, vec![b'x'; 60]).expect("log");

        let rotated = rotate_if_over_budget(&log, 100).expect("rotate");
        assert_eq!(rotated.as_deref(), Some(older.as_path()));
        assert!(!log.exists());
        assert_eq!(fs::read(&older).expect("read").len(), 60);
    }

    #[test]
    fn neighbouring_files_survive_rotation() {
        let dir = tempfile::tempdir().expect("tempdir");
        let log = dir.path().join("events.jsonl");
        let neighbour = dir.path().join("someone-elses-data.jsonl");
        fs::write(&neighbour, vec![b'y'; 400]).expect("neighbour");
        fs::write(&log, vec![b'x'; 80]).expect("log");

        rotate_if_over_budget(&log, 100).expect("rotate");
        assert_eq!(fs::read(&neighbour).expect("neighbour").len(), 400);
    }

    #[test]
    fn missing_log_is_not_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert_eq!(
            rotate_if_over_budget(&dir.path().join("events.jsonl"), 10).expect("rotate"),
            None
        );
    }
}
