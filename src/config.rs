use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, TemplError};

/// Environment variable that overrides the store location.
pub const STORE_DIR_ENV: &str = "TEMPL_DIR";

/// Where template collections live on disk.
///
/// Built once at startup and handed to every component, so tests can point
/// it at a temporary directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub root: PathBuf,
}

/// User-level configuration loaded from `~/.config/templ/config.toml`.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct UserConfig {
    /// Store directory to use when `TEMPL_DIR` is not set.
    #[serde(default)]
    pub store_dir: Option<PathBuf>,
}

impl StoreConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve the store root: `TEMPL_DIR`, then the user config file, then
    /// `<data dir>/templ/templates`.
    pub fn from_env() -> Result<Self> {
        if let Some(dir) = std::env::var_os(STORE_DIR_ENV).filter(|d| !d.is_empty()) {
            return Ok(Self::new(dir));
        }

        if let Some(dir) = load_user_config()?.and_then(|c| c.store_dir) {
            return Ok(Self::new(dir));
        }

        dirs::data_dir()
            .map(|d| Self::new(d.join("templ").join("templates")))
            .ok_or(TemplError::StoreDirUnavailable)
    }

    pub fn local_root(&self) -> PathBuf {
        self.root.join("local")
    }

    pub fn github_root(&self) -> PathBuf {
        self.root.join("github")
    }

    /// Create the store root if it does not exist yet.
    pub fn ensure_exists(&self) -> Result<()> {
        if self.root.is_dir() {
            return Ok(());
        }
        create_private_dir(&self.root).map_err(|e| TemplError::Io {
            context: format!("creating template store {}", self.root.display()),
            source: e,
        })?;
        tracing::debug!("created template store at {}", self.root.display());
        Ok(())
    }
}

#[cfg(unix)]
fn create_private_dir(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;

    std::fs::DirBuilder::new()
        .recursive(true)
        .mode(0o700)
        .create(path)
}

#[cfg(not(unix))]
fn create_private_dir(path: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(path)
}

fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("templ").join("config.toml"))
}

/// Load user configuration from the XDG config directory.
///
/// Returns `Ok(None)` if the config file does not exist.
pub fn load_user_config() -> Result<Option<UserConfig>> {
    match config_path() {
        Some(path) => load_user_config_from(&path),
        None => Ok(None),
    }
}

pub fn load_user_config_from(path: &Path) -> Result<Option<UserConfig>> {
    if !path.exists() {
        return Ok(None);
    }

    let content = std::fs::read_to_string(path).map_err(|e| TemplError::Io {
        context: format!("reading user config {}", path.display()),
        source: e,
    })?;

    let config: UserConfig = toml::from_str(&content).map_err(|e| TemplError::ConfigParse {
        path: path.to_path_buf(),
        source: e,
    })?;

    Ok(Some(config))
}
