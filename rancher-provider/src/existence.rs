use std::fmt;

use rancher_config::{LifecycleSettings, CONFIG_FILE, PROJECT_MARKER};
use rancher_core::ExistenceProbe;
use serde::Serialize;

/// The three things Homestead needs before any vagrant command makes sense.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Existence {
    /// `Vagrantfile` is present in the project directory.
    pub project_marker: bool,
    /// `Homestead.yaml` is present in the config directory.
    pub config_file: bool,
    /// The vagrant executable can be run.
    pub tool: bool,
}

impl Existence {
    pub fn check(settings: &LifecycleSettings, probe: &dyn ExistenceProbe) -> Self {
        Self {
            project_marker: probe.file_exists(&settings.project_marker_path()),
            config_file: probe.file_exists(&settings.config_file_path()),
            tool: probe.resolve_on_path(&settings.vagrant_path),
        }
    }

    pub fn is_usable(&self) -> bool {
        self.project_marker && self.config_file && self.tool
    }

    pub fn missing_parts(&self) -> Vec<&'static str> {
        [
            (self.project_marker, PROJECT_MARKER),
            (self.config_file, CONFIG_FILE),
            (self.tool, "vagrant"),
        ]
        .into_iter()
        .filter(|(present, _)| !present)
        .map(|(_, name)| name)
        .collect()
    }
}

impl fmt::Display for Existence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_usable() {
            f.write_str("ready")
        } else {
            write!(f, "missing {}", self.missing_parts().join(", "))
        }
    }
}
