//! Image file access for the client: encoded payloads for display and
//! copies to the desktop.

use std::path::{Path, PathBuf};

use base64::Engine as _;
use tracing::info;

use crate::error::DaemonError;

pub const DATA_URL_PREFIX: &str = "data:image/png;base64,";
const SAVED_PREFIX: &str = "CreatingImage_";

/// `data:image/png;base64,<payload>` for the file at `path`.
pub async fn image_data(path: &Path) -> Result<String, DaemonError> {
    if path.as_os_str().is_empty() {
        return Err(DaemonError::EmptyPath);
    }
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| DaemonError::ReadImage {
            path: path.to_path_buf(),
            source,
        })?;
    let encoded = base64::engine::general_purpose::STANDARD.encode(&bytes);
    Ok(format!("{}{}", DATA_URL_PREFIX, encoded))
}

/// Copy `path` into `desktop` as `CreatingImage_<unix seconds>.png` and
/// return the destination.  The desktop directory must already exist.
pub async fn save_to_desktop(path: &Path, desktop: &Path) -> Result<PathBuf, DaemonError> {
    if path.as_os_str().is_empty() {
        return Err(DaemonError::EmptyPath);
    }
    if !tokio::fs::metadata(desktop)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false)
    {
        return Err(DaemonError::DesktopMissing(desktop.to_path_buf()));
    }

    let destination = free_name(desktop, chrono::Utc::now().timestamp()).await;
    tokio::fs::copy(path, &destination)
        .await
        .map_err(|source| DaemonError::Copy {
            from: path.to_path_buf(),
            to: destination.clone(),
            source,
        })?;
    info!("saved {} to {}", path.display(), destination.display());
    Ok(destination)
}

/// Two saves within the same second get `_1`, `_2`... instead of
/// overwriting each other.
async fn free_name(dir: &Path, stamp: i64) -> PathBuf {
    let first = dir.join(format!("{}{}.png", SAVED_PREFIX, stamp));
    if tokio::fs::metadata(&first).await.is_err() {
        return first;
    }
    let mut n = 1u32;
    loop {
        let candidate = dir.join(format!("{}{}_{}.png", SAVED_PREFIX, stamp, n));
        if tokio::fs::metadata(&candidate).await.is_err() {
            return candidate;
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_data_url() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("out.png");
        std::fs::write(&file, b"\x89PNG").unwrap();
        let data = image_data(&file).await.unwrap();
        assert_eq!(data, "data:image/png;base64,iVBORw==");
    }

    #[tokio::test]
    async fn test_missing_image() {
        let dir = tempfile::tempdir().unwrap();
        let err = image_data(&dir.path().join("nope.png")).await.unwrap_err();
        assert!(matches!(err, DaemonError::ReadImage { .. }));
        assert!(matches!(
            image_data(Path::new("")).await,
            Err(DaemonError::EmptyPath)
        ));
    }

    #[tokio::test]
    async fn test_save_copies_with_unique_names() {
        let dir = tempfile::tempdir().unwrap();
        let desktop = dir.path().join("Desktop");
        std::fs::create_dir(&desktop).unwrap();
        let file = dir.path().join("out.png");
        std::fs::write(&file, b"png-bytes").unwrap();

        let first = save_to_desktop(&file, &desktop).await.unwrap();
        let second = save_to_desktop(&file, &desktop).await.unwrap();
        assert_ne!(first, second);
        for saved in [&first, &second] {
            assert!(saved.starts_with(&desktop));
            let name = saved.file_name().unwrap().to_string_lossy().to_string();
            assert!(name.starts_with("CreatingImage_"));
            assert!(name.ends_with(".png"));
            assert_eq!(std::fs::read(saved).unwrap(), b"png-bytes");
        }
    }

    #[tokio::test]
    async fn test_save_without_desktop() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("out.png");
        std::fs::write(&file, b"x").unwrap();
        let err = save_to_desktop(&file, &dir.path().join("Desktop"))
            .await
            .unwrap_err();
        assert!(matches!(err, DaemonError::DesktopMissing(_)));
    }

    #[tokio::test]
    async fn test_save_missing_source() {
        let dir = tempfile::tempdir().unwrap();
        let err = save_to_desktop(&dir.path().join("gone.png"), dir.path())
            .await
            .unwrap_err();
        assert!(matches!(err, DaemonError::Copy { .. }));
    }
}
