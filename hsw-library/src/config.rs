//! User settings for hsoundworks
//!
//! Stored as `key=value` lines with `#` comments. Missing or unreadable
//! files fall back to the defaults.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub const DEFAULT_DATABASE_PATH: &str = "audio_library.db";
pub const DEFAULT_OUTPUT_DIR: &str = "outputs";
pub const DEFAULT_EXPORT_CSV: &str = "ah_audio_sample_library.csv";
pub const DEFAULT_MIN_LOOP_DURATION: f64 = 3.0;

/// Application configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// SQLite library file
    pub database_path: PathBuf,
    /// Where images are written
    pub output_dir: PathBuf,
    /// Default target of `db --export-csv`
    pub export_csv: PathBuf,
    /// Default threshold of `db --filter-loops`, in seconds
    pub min_loop_duration: f64,
    /// Last folder that was analyzed
    pub last_folder: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from(DEFAULT_DATABASE_PATH),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            export_csv: PathBuf::from(DEFAULT_EXPORT_CSV),
            min_loop_duration: DEFAULT_MIN_LOOP_DURATION,
            last_folder: None,
        }
    }
}

impl Config {
    /// Load config from the default location
    pub fn load() -> Self {
        Self::load_or_default(&Self::config_path())
    }

    /// Load config from `path`, falling back to defaults when it can't be read
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load_from(path) {
            Ok(config) => config,
            Err(e) => {
                if e.kind() != io::ErrorKind::NotFound {
                    tracing::warn!("Could not read config {}: {}", path.display(), e);
                }
                Self::default()
            }
        }
    }

    /// Load config from a specific path
    pub fn load_from(path: &Path) -> io::Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(Self::parse(&content))
    }

    /// Save config to the default location
    pub fn save(&self) -> io::Result<()> {
        self.save_to(&Self::config_path())
    }

    /// Save config to a specific path
    pub fn save_to(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        fs::write(path, self.serialize())
    }

    /// Get the default config file path
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("hsoundworks")
            .join("config.txt")
    }

    /// Parse config from simple key=value format
    fn parse(content: &str) -> Self {
        let mut config = Self::default();

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let value = value.trim();
            if value.is_empty() {
                continue;
            }

            match key.trim() {
                "database_path" => config.database_path = PathBuf::from(value),
                "output_dir" => config.output_dir = PathBuf::from(value),
                "export_csv" => config.export_csv = PathBuf::from(value),
                "min_loop_duration" => match value.parse::<f64>() {
                    Ok(secs) if secs >= 0.0 => config.min_loop_duration = secs,
                    _ => tracing::warn!("Ignoring invalid min_loop_duration '{}'", value),
                },
                "last_folder" => config.last_folder = Some(PathBuf::from(value)),
                _ => {} // Ignore unknown keys
            }
        }

        config
    }

    /// Serialize config to simple key=value format
    fn serialize(&self) -> String {
        let mut lines = vec![
            "# hsoundworks configuration".to_string(),
            format!("database_path={}", self.database_path.display()),
            format!("output_dir={}", self.output_dir.display()),
            format!("export_csv={}", self.export_csv.display()),
            format!("min_loop_duration={}", self.min_loop_duration),
        ];

        if let Some(ref folder) = self.last_folder {
            lines.push(format!("last_folder={}", folder.display()));
        }

        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty() {
        assert_eq!(Config::parse(""), Config::default());
    }

    #[test]
    fn test_parse_values() {
        let config = Config::parse(
            "database_path=/data/samples.db\n\
             output_dir = plots\n\
             min_loop_duration=4.5\n\
             last_folder=/home/user/samples",
        );
        assert_eq!(config.database_path, PathBuf::from("/data/samples.db"));
        assert_eq!(config.output_dir, PathBuf::from("plots"));
        assert_eq!(config.export_csv, PathBuf::from(DEFAULT_EXPORT_CSV));
        assert_eq!(config.min_loop_duration, 4.5);
        assert_eq!(config.last_folder, Some(PathBuf::from("/home/user/samples")));
    }

    #[test]
    fn test_parse_skips_comments_and_junk() {
        let content = "# Comment\nlast_folder=/music\nnot a pair\ncolour=blue\nmin_loop_duration=soon";
        let config = Config::parse(content);
        assert_eq!(config.last_folder, Some(PathBuf::from("/music")));
        assert_eq!(config.min_loop_duration, DEFAULT_MIN_LOOP_DURATION);
    }

    #[test]
    fn test_serialize_roundtrip() {
        let config = Config {
            database_path: PathBuf::from("lib.db"),
            min_loop_duration: 8.0,
            last_folder: Some(PathBuf::from("/test/path")),
            ..Default::default()
        };

        assert_eq!(Config::parse(&config.serialize()), config);
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hsoundworks").join("config.txt");

        let config = Config {
            last_folder: Some(PathBuf::from("/samples")),
            ..Default::default()
        };
        config.save_to(&path).unwrap();

        assert_eq!(Config::load_from(&path).unwrap(), config);
        assert_eq!(
            Config::load_or_default(&dir.path().join("missing.txt")),
            Config::default()
        );
    }
}
