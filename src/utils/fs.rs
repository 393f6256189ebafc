//! File system utilities.

use crate::Result;
use std::path::Path;

/// Check if a path exists and is a directory.
pub fn ensure_directory(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(crate::Error::PathNotFound(path.display().to_string()));
    }
    if !path.is_dir() {
        return Err(crate::Error::NotADirectory(path.display().to_string()));
    }
    Ok(())
}

/// Get file extension in lowercase.
pub fn get_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
}

/// File name of a path as a string, empty if it has none.
pub fn file_name_string(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_get_extension() {
        assert_eq!(get_extension(&PathBuf::from("show.MKV")), Some("mkv".to_string()));
        assert_eq!(get_extension(&PathBuf::from("README")), None);
    }

    #[test]
    fn test_ensure_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ensure_directory(dir.path()).is_ok());

        let file = dir.path().join("a.mkv");
        std::fs::write(&file, b"x").unwrap();
        assert!(matches!(ensure_directory(&file), Err(crate::Error::NotADirectory(_))));
        assert!(matches!(
            ensure_directory(&dir.path().join("missing")),
            Err(crate::Error::PathNotFound(_))
        ));
    }

    #[test]
    fn test_file_name_string() {
        assert_eq!(file_name_string(Path::new("/a/b/Show S01E01.mkv")), "Show S01E01.mkv");
        assert_eq!(file_name_string(Path::new("/")), "");
    }
}
