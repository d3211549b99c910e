//! CLI command implementations.

pub mod analyze;
pub mod batch;
pub mod convert;
pub mod db;

use anyhow::{bail, Context as _};
use hsw_library::{AudioLibrary, Config};
use std::path::{Path, PathBuf};

/// Settings shared by every command: the loaded config plus CLI overrides
#[derive(Debug)]
pub struct Context {
    pub config: Config,
    config_path: PathBuf,
    database_override: Option<PathBuf>,
}

impl Context {
    /// Load the config file (default location unless `config_path` is given)
    pub fn load(database: Option<PathBuf>, config_path: Option<PathBuf>) -> Self {
        let config_path = config_path.unwrap_or_else(Config::config_path);
        let config = Config::load_or_default(&config_path);
        tracing::debug!(?config, path = %config_path.display(), "config loaded");

        Self {
            config,
            config_path,
            database_override: database,
        }
    }

    /// `--database` if given, otherwise the configured path
    pub fn database_path(&self) -> &Path {
        self.database_override
            .as_deref()
            .unwrap_or(&self.config.database_path)
    }

    pub fn open_library(&self) -> anyhow::Result<AudioLibrary> {
        let path = self.database_path();
        AudioLibrary::open(path)
            .with_context(|| format!("Failed to open database {}", path.display()))
    }

    /// The folder argument, or the last folder a command ran on
    pub fn resolve_folder(&self, folder: Option<PathBuf>) -> anyhow::Result<PathBuf> {
        match folder.or_else(|| self.config.last_folder.clone()) {
            Some(folder) => Ok(folder),
            None => bail!("No folder given and no previous folder remembered"),
        }
    }

    /// Remember `folder` for the next run; failing to save only warns
    ///
    /// The absolute path is stored so a relative argument still resolves
    /// from another working directory.
    pub fn remember_folder(&mut self, folder: &Path) {
        let folder = folder
            .canonicalize()
            .unwrap_or_else(|_| folder.to_path_buf());
        if self.config.last_folder.as_deref() == Some(folder.as_path()) {
            return;
        }

        self.config.last_folder = Some(folder);
        if let Err(e) = self.config.save_to(&self.config_path) {
            tracing::warn!("Could not save config {}: {}", self.config_path.display(), e);
        }
    }
}

/// Check that `folder` is a directory, logging an error when it isn't
pub fn folder_exists(folder: &Path) -> bool {
    if folder.is_dir() {
        true
    } else {
        tracing::error!("Folder not found: {}", folder.display());
        false
    }
}
