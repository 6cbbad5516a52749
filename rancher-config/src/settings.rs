//! Where Homestead lives and which tools drive it.
//!
//! Settings are owned by whoever embeds the controller. They can change at any
//! time, so the controller only ever holds a [`SharedSettings`] handle and
//! takes a fresh [`LifecycleSettings::snapshot`](SharedSettings::snapshot)
//! for every operation.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use rancher_core::error::{RancherError, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// File whose presence marks the Homestead project directory.
pub const PROJECT_MARKER: &str = "Vagrantfile";
/// Homestead configuration file inside the config directory.
pub const CONFIG_FILE: &str = "Homestead.yaml";
/// Environment variable overriding the settings file location.
pub const SETTINGS_ENV: &str = "RANCHER_SETTINGS";

const DEFAULT_VAGRANT: &str = "/usr/bin/vagrant";
const DEFAULT_EDITOR: &str = "/usr/bin/xed";
const DEFAULT_TERMINAL: &str = "gnome-terminal";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleSettings {
    /// Homestead checkout, the working directory for every vagrant call.
    pub project_dir: PathBuf,
    /// Directory holding `Homestead.yaml`.
    pub config_dir: PathBuf,
    pub vagrant_path: PathBuf,
    pub editor_path: PathBuf,
    /// Terminal emulator used to open `vagrant ssh`.
    pub terminal_path: PathBuf,
    /// Give up on a vagrant call after this many seconds. Unset or 0 waits forever.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_timeout_secs: Option<u64>,
}

impl Default for LifecycleSettings {
    fn default() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        Self {
            project_dir: home.join("Homestead"),
            config_dir: home.join(".homestead"),
            vagrant_path: PathBuf::from(DEFAULT_VAGRANT),
            editor_path: PathBuf::from(DEFAULT_EDITOR),
            terminal_path: PathBuf::from(DEFAULT_TERMINAL),
            command_timeout_secs: None,
        }
    }
}

impl LifecycleSettings {
    pub fn project_marker_path(&self) -> PathBuf {
        self.project_dir.join(PROJECT_MARKER)
    }

    pub fn config_file_path(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE)
    }

    pub fn command_timeout(&self) -> Option<Duration> {
        self.command_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    /// `$RANCHER_SETTINGS`, else `<config dir>/rancher/settings.yaml`.
    pub fn default_path() -> Option<PathBuf> {
        if let Some(path) = std::env::var_os(SETTINGS_ENV) {
            return Some(PathBuf::from(path));
        }
        dirs::config_dir().map(|dir| dir.join("rancher").join("settings.yaml"))
    }

    /// Loads settings from `path`. A missing or empty file yields defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No settings file, using defaults");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(RancherError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        if contents.trim().is_empty() {
            return Ok(Self::default());
        }

        let settings: Self = serde_yaml_ng::from_str(&contents).map_err(|e| {
            RancherError::Config(format!("Invalid settings file {}: {}", path.display(), e))
        })?;
        debug!(path = %path.display(), "Loaded settings");
        Ok(settings.expanded())
    }

    /// Loads from [`LifecycleSettings::default_path`], or defaults when there is none.
    pub fn load_default() -> Result<Self> {
        match Self::default_path() {
            Some(path) => Self::load(&path),
            None => Ok(Self::default()),
        }
    }

    fn expanded(self) -> Self {
        Self {
            project_dir: expand_tilde(&self.project_dir),
            config_dir: expand_tilde(&self.config_dir),
            vagrant_path: expand_tilde(&self.vagrant_path),
            editor_path: expand_tilde(&self.editor_path),
            terminal_path: expand_tilde(&self.terminal_path),
            command_timeout_secs: self.command_timeout_secs,
        }
    }
}

fn expand_tilde(path: &Path) -> PathBuf {
    PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).into_owned())
}

/// Live, cloneable handle on the current settings.
#[derive(Debug, Clone, Default)]
pub struct SharedSettings {
    inner: Arc<RwLock<LifecycleSettings>>,
}

impl SharedSettings {
    pub fn new(settings: LifecycleSettings) -> Self {
        Self {
            inner: Arc::new(RwLock::new(settings)),
        }
    }

    /// Copy of the values as they are right now.
    pub fn snapshot(&self) -> LifecycleSettings {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn replace(&self, settings: LifecycleSettings) {
        self.update(|current| *current = settings);
    }

    pub fn set_project_dir(&self, dir: impl Into<PathBuf>) {
        let dir = dir.into();
        debug!(project_dir = %dir.display(), "Project directory changed");
        self.update(|s| s.project_dir = dir);
    }

    pub fn set_config_dir(&self, dir: impl Into<PathBuf>) {
        let dir = dir.into();
        debug!(config_dir = %dir.display(), "Config directory changed");
        self.update(|s| s.config_dir = dir);
    }

    pub fn set_vagrant_path(&self, path: impl Into<PathBuf>) {
        let path = path.into();
        debug!(vagrant_path = %path.display(), "Vagrant path changed");
        self.update(|s| s.vagrant_path = path);
    }

    pub fn set_editor_path(&self, path: impl Into<PathBuf>) {
        let path = path.into();
        debug!(editor_path = %path.display(), "Editor path changed");
        self.update(|s| s.editor_path = path);
    }

    pub fn set_terminal_path(&self, path: impl Into<PathBuf>) {
        self.update(|s| s.terminal_path = path.into());
    }

    pub fn set_command_timeout(&self, timeout: Option<Duration>) {
        self.update(|s| s.command_timeout_secs = timeout.map(|t| t.as_secs()));
    }

    fn update(&self, change: impl FnOnce(&mut LifecycleSettings)) {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        change(&mut *guard);
    }
}

impl From<LifecycleSettings> for SharedSettings {
    fn from(settings: LifecycleSettings) -> Self {
        Self::new(settings)
    }
}
