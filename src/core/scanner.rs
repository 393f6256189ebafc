//! Directory scanner module.
//!
//! Scans directories recursively for episode video files. Extras and sample
//! material is skipped since it never maps to a canonical episode.

use crate::models::media::MediaFile;
use crate::utils::fs::{ensure_directory, file_name_string, get_extension};
use crate::Result;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Supported video file extensions.
const VIDEO_EXTENSIONS: &[&str] = &[
    "mkv", "mp4", "avi", "mov", "wmv", "m4v", "ts", "m2ts", "flv", "webm", "mpg", "mpeg", "vob",
    "ogv", "divx", "3gp", "mts", "rmvb", "asf",
];

/// Directory names holding bonus material rather than episodes.
const EXTRAS_NAMES: &[&str] = &[
    "extras",
    "extra",
    "featurettes",
    "featurette",
    "behind the scenes",
    "deleted scenes",
    "bonus",
    "special features",
    "sample",
    "samples",
];

/// Result of scanning a directory.
#[derive(Debug, Default)]
pub struct ScanResult {
    /// Episode candidates, sorted by path.
    pub videos: Vec<MediaFile>,
    /// Video files skipped as extras or samples.
    pub skipped: usize,
    /// Total files scanned.
    pub total_files_scanned: usize,
    /// Total directories scanned.
    pub total_dirs_scanned: usize,
}

impl ScanResult {
    /// Paths of the videos found.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.videos.iter().map(|v| v.path.clone()).collect()
    }
}

/// Check if a file extension is a video format.
fn is_video_extension(ext: &str) -> bool {
    VIDEO_EXTENSIONS.contains(&ext.to_lowercase().as_str())
}

/// Check if a file sits below an extras or sample directory under `root`.
fn is_in_extras_directory(root: &Path, path: &Path) -> bool {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let Some(parent) = relative.parent() else {
        return false;
    };

    parent.components().any(|component| {
        let std::path::Component::Normal(name) = component else {
            return false;
        };
        let name = name.to_string_lossy().to_lowercase();
        EXTRAS_NAMES.contains(&name.as_str())
            || name.ends_with(".extras")
            || name.ends_with("-extras")
            || name.ends_with("_extras")
    })
}

/// Check if a filename indicates a sample file.
fn is_sample_filename(filename: &str) -> bool {
    let lower = filename.to_lowercase();
    lower.contains("sample") && !lower.contains("sampler")
}

fn create_media_file(path: &Path) -> Result<MediaFile> {
    let metadata = std::fs::metadata(path)?;
    let modified = metadata
        .modified()
        .map(chrono::DateTime::<chrono::Utc>::from)
        .unwrap_or_else(|_| chrono::Utc::now());

    Ok(MediaFile {
        path: path.to_path_buf(),
        filename: file_name_string(path),
        size: metadata.len(),
        modified,
        parent_dir: path
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from(".")),
    })
}

/// Scan a directory for video files.
pub fn scan_directory(path: &Path) -> Result<ScanResult> {
    ensure_directory(path)?;

    let mut result = ScanResult::default();

    for entry in WalkDir::new(path)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let entry_path = entry.path();

        if entry.file_type().is_dir() {
            result.total_dirs_scanned += 1;
            continue;
        }
        if !entry.file_type().is_file() {
            continue;
        }
        result.total_files_scanned += 1;

        if !get_extension(entry_path).is_some_and(|ext| is_video_extension(&ext)) {
            continue;
        }

        if is_in_extras_directory(path, entry_path)
            || is_sample_filename(&file_name_string(entry_path))
        {
            tracing::debug!("Skipping extras/sample: {}", entry_path.display());
            result.skipped += 1;
            continue;
        }

        match create_media_file(entry_path) {
            Ok(file) => result.videos.push(file),
            Err(e) => tracing::warn!("Failed to read video file {:?}: {}", entry_path, e),
        }
    }

    result.videos.sort_by(|a, b| a.path.cmp(&b.path));

    tracing::info!(
        "Scanned {} files in {} directories: {} videos, {} skipped",
        result.total_files_scanned,
        result.total_dirs_scanned,
        result.videos.len(),
        result.skipped
    );

    Ok(result)
}
