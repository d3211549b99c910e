//! Audio file discovery
//!
//! Lists a folder (optionally recursively) and keeps the files whose
//! extension is a supported audio container.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Extensions treated as audio, matched case-insensitively
pub const AUDIO_EXTENSIONS: [&str; 4] = ["mp3", "wav", "flac", "ogg"];

/// Errors that can occur while discovering files
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Folder does not exist: {0}")]
    NotFound(PathBuf),
    #[error("Path is not a directory: {0}")]
    NotADirectory(PathBuf),
    #[error("No read permission for folder: {0}")]
    PermissionDenied(PathBuf),
    #[error("Error accessing folder {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// What to scan and how
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Directory to scan
    pub directory: PathBuf,
    /// File extensions to include
    pub extensions: Vec<String>,
    /// Whether to scan subdirectories recursively
    pub recursive: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::new(),
            extensions: AUDIO_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            recursive: false,
        }
    }
}

impl ScanConfig {
    /// Scan `directory` (top level only) for the default audio extensions
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            ..Default::default()
        }
    }

    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    fn matches(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|ext| self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
            .unwrap_or(false)
    }
}

/// Whether the path has one of the supported audio extensions
pub fn is_audio_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| AUDIO_EXTENSIONS.iter().any(|e| e.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

/// Discover audio files, sorted by path
///
/// The top-level folder must exist, be a directory, and be readable.
/// Unreadable subdirectories in a recursive scan are skipped.
pub fn discover(config: &ScanConfig) -> Result<Vec<PathBuf>, ScanError> {
    let dir = &config.directory;

    if !dir.exists() {
        return Err(ScanError::NotFound(dir.clone()));
    }
    if !dir.is_dir() {
        return Err(ScanError::NotADirectory(dir.clone()));
    }

    let mut files = collect_files(dir, config)?;
    files.sort();
    Ok(files)
}

/// Discover audio files, logging problems and returning an empty list on error
pub fn discover_or_empty(config: &ScanConfig) -> Vec<PathBuf> {
    match discover(config) {
        Ok(files) => {
            if files.is_empty() {
                tracing::warn!(
                    "No supported audio files found in {}",
                    config.directory.display()
                );
            } else {
                tracing::info!(
                    "Found {} audio file(s) in {}",
                    files.len(),
                    config.directory.display()
                );
            }
            files
        }
        Err(e) => {
            tracing::error!("{}", e);
            Vec::new()
        }
    }
}

fn collect_files(dir: &Path, config: &ScanConfig) -> Result<Vec<PathBuf>, ScanError> {
    let entries = std::fs::read_dir(dir).map_err(|e| match e.kind() {
        ErrorKind::PermissionDenied => ScanError::PermissionDenied(dir.to_path_buf()),
        _ => ScanError::Io {
            path: dir.to_path_buf(),
            source: e,
        },
    })?;

    let mut files = Vec::new();

    for entry in entries.flatten() {
        let path = entry.path();

        if path.is_file() {
            if config.matches(&path) {
                files.push(path);
            }
        } else if path.is_dir() && config.recursive {
            match collect_files(&path, config) {
                Ok(nested) => files.extend(nested),
                Err(e) => tracing::warn!("Skipping {}: {}", path.display(), e),
            }
        }
    }

    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(path: &Path) {
        fs::write(path, b"x").unwrap();
    }

    #[test]
    fn test_is_audio_file() {
        assert!(is_audio_file(Path::new("loop.wav")));
        assert!(is_audio_file(Path::new("Kick.MP3")));
        assert!(is_audio_file(Path::new("/a/b/pad.Flac")));
        assert!(!is_audio_file(Path::new("notes.txt")));
        assert!(!is_audio_file(Path::new("wav")));
        assert!(!is_audio_file(Path::new("cover.jpg")));
    }

    #[test]
    fn test_excludes_non_audio() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("b.wav"));
        touch(&dir.path().join("a.OGG"));
        touch(&dir.path().join("readme.txt"));
        touch(&dir.path().join("art.png"));

        let files = discover(&ScanConfig::new(dir.path())).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.OGG", "b.wav"]);
    }

    #[test]
    fn test_empty_folder() {
        let dir = tempfile::tempdir().unwrap();
        assert!(discover(&ScanConfig::new(dir.path())).unwrap().is_empty());
        assert!(discover_or_empty(&ScanConfig::new(dir.path())).is_empty());
    }

    #[test]
    fn test_missing_folder() {
        let config = ScanConfig::new("/nonexistent/hsoundworks/folder");
        assert!(matches!(discover(&config), Err(ScanError::NotFound(_))));
        assert!(discover_or_empty(&config).is_empty());
    }

    #[test]
    fn test_file_is_not_a_directory() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("track.wav");
        touch(&file);

        assert!(matches!(
            discover(&ScanConfig::new(&file)),
            Err(ScanError::NotADirectory(_))
        ));
    }

    #[test]
    fn test_recursive_scan() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("drums").join("kicks");
        fs::create_dir_all(&nested).unwrap();
        touch(&dir.path().join("top.wav"));
        touch(&nested.join("deep.flac"));

        let flat = discover(&ScanConfig::new(dir.path())).unwrap();
        assert_eq!(flat.len(), 1);

        let all = discover(&ScanConfig::new(dir.path()).recursive(true)).unwrap();
        assert_eq!(all.len(), 2);
        assert!(all.iter().any(|p| p.ends_with("drums/kicks/deep.flac")));
    }
}
