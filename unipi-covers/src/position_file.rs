//! Persistence of `position/tilt` across restarts (§3, §6).
//!
//! Grounded on `integrations/covers.py`'s `_write_position_to_file` /
//! `_get_position_from_file`, re-expressed with `tokio::fs` so file I/O is
//! offloaded the same way `run_in_executor` offloads it in the original
//! (see SPEC_FULL.md §4.5 implementation note).

use std::path::{Path, PathBuf};

/// `<temp>/unipi/<dev>__<object_id>__cover__<class>`.
pub fn position_file_path(temp_dir: &Path, device_slug: &str, object_id: &str, device_class: &str) -> PathBuf {
    temp_dir.join("unipi").join(format!("{device_slug}__{object_id}__cover__{device_class}"))
}

/// Reads and parses the position file. A missing file, unreadable
/// contents, or an out-of-range value all return `None`, which forces
/// calibration mode on the caller's side.
pub async fn read_position(path: &Path) -> Option<(f64, f64)> {
    let contents = tokio::fs::read_to_string(path).await.ok()?;
    let mut parts = contents.trim().splitn(2, '/');
    let position: f64 = parts.next()?.parse().ok()?;
    let tilt: f64 = parts.next()?.parse().ok()?;
    if !(0.0..=100.0).contains(&position) || !(0.0..=100.0).contains(&tilt) {
        return None;
    }
    Some((position, tilt))
}

/// Writes `"{position}/{tilt}"`, creating the parent directory if needed.
pub async fn write_position(path: &Path, position: f64, tilt: f64) {
    if let Some(parent) = path.parent() {
        if let Err(err) = tokio::fs::create_dir_all(parent).await {
            log::error!("[COVERS] failed to create {}: {err}", parent.display());
            return;
        }
    }
    if let Err(err) = tokio::fs::write(path, format!("{position}/{tilt}")).await {
        log::error!("[COVERS] failed to write position file {}: {err}", path.display());
    }
}

/// Removes the position file. Its absence means "in motion" (§4.5 step 7);
/// a missing file is not an error.
pub async fn delete_position(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) | Err(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_matches_documented_scheme() {
        let path = position_file_path(Path::new("/tmp"), "myplc", "blind1", "blind");
        assert_eq!(path, PathBuf::from("/tmp/unipi/myplc__blind1__cover__blind"));
    }

    #[tokio::test]
    async fn write_then_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("unipi").join("dev__blind1__cover__blind");
        write_position(&path, 50.0, 100.0).await;
        assert_eq!(read_position(&path).await, Some((50.0, 100.0)));
    }

    #[tokio::test]
    async fn missing_file_yields_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("unipi").join("missing");
        assert_eq!(read_position(&path).await, None);
    }

    #[tokio::test]
    async fn out_of_range_value_yields_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("unipi").join("dev__blind1__cover__blind");
        write_position(&path, 150.0, 0.0).await;
        assert_eq!(read_position(&path).await, None);
    }

    #[tokio::test]
    async fn delete_is_not_an_error_when_file_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("unipi").join("never_written");
        delete_position(&path).await;
    }
}
