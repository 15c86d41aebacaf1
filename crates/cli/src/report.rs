//! Image discovery and per-image reports

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use diagnosis_core::ClassificationResult;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

/// File extensions treated as photos when walking a directory
pub const IMAGE_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "webp", "bmp", "gif"];

/// One diagnosed image, printed as a JSON line
#[derive(Debug, Serialize)]
pub struct DiagnosisReport {
    pub file: PathBuf,
    pub diagnosed_at: DateTime<Utc>,
    pub result: ClassificationResult,
}

impl DiagnosisReport {
    pub fn new(file: impl Into<PathBuf>, result: ClassificationResult) -> Self {
        Self {
            file: file.into(),
            diagnosed_at: Utc::now(),
            result,
        }
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}

/// Resolve a file or directory argument into the images to diagnose
///
/// A file is returned as-is regardless of extension; a directory is walked
/// recursively and filtered by [`IMAGE_EXTENSIONS`], sorted by path.
/// Entries that cannot be read during the walk are skipped with a warning.
pub fn collect_images(path: &Path) -> Result<Vec<PathBuf>> {
    let metadata = std::fs::metadata(path)
        .with_context(|| format!("Cannot access {}", path.display()))?;

    if metadata.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }

    let mut images = Vec::new();
    for entry in WalkDir::new(path) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry under {}: {}", path.display(), e);
                continue;
            }
        };
        if entry.file_type().is_file() && is_image(entry.path()) {
            images.push(entry.into_path());
        }
    }
    images.sort();
    Ok(images)
}

#[cfg(test)]
mod tests {
    use super::*;
    use diagnosis_core::{Prediction, Source};

    #[test]
    fn test_is_image_case_insensitive() {
        assert!(is_image(Path::new("leaf.JPG")));
        assert!(is_image(Path::new("a/b/leaf.png")));
        assert!(!is_image(Path::new("notes.txt")));
        assert!(!is_image(Path::new("README")));
    }

    #[test]
    fn test_collect_images_walks_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("field-2");
        std::fs::create_dir(&nested).unwrap();
        std::fs::write(dir.path().join("b.jpg"), b"x").unwrap();
        std::fs::write(dir.path().join("a.png"), b"x").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"x").unwrap();
        std::fs::write(nested.join("c.jpeg"), b"x").unwrap();

        let images = collect_images(dir.path()).unwrap();
        assert_eq!(
            images,
            vec![
                dir.path().join("a.png"),
                dir.path().join("b.jpg"),
                nested.join("c.jpeg"),
            ]
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_collect_skips_unreadable_subdirectory() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let locked = dir.path().join("locked");
        std::fs::create_dir(&locked).unwrap();
        std::fs::write(locked.join("hidden.jpg"), b"x").unwrap();
        std::fs::write(dir.path().join("a.png"), b"x").unwrap();
        std::fs::write(dir.path().join("z.jpg"), b"x").unwrap();
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o000)).unwrap();

        let result = collect_images(dir.path());
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();

        // Privileged users can still read the locked directory
        let images = result.unwrap();
        assert!(images.contains(&dir.path().join("a.png")));
        assert!(images.contains(&dir.path().join("z.jpg")));
    }

    #[test]
    fn test_collect_single_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("photo.heic");
        std::fs::write(&file, b"x").unwrap();

        assert_eq!(collect_images(&file).unwrap(), vec![file]);
    }

    #[test]
    fn test_collect_missing_path() {
        assert!(collect_images(Path::new("/nonexistent/leaf.jpg")).is_err());
    }

    #[test]
    fn test_report_serialization() {
        let report = DiagnosisReport::new(
            "leaf.jpg",
            ClassificationResult::cloud(Prediction::new("Mosaic Virus", 0.5)),
        );
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["file"], "leaf.jpg");
        assert_eq!(json["result"]["source"], "cloud");
        assert_eq!(json["result"]["label"], "Mosaic Virus");
        assert!(json["diagnosed_at"].is_string());
        assert_eq!(report.result.source, Source::Cloud);
    }
}
