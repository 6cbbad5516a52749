//! File and executable lookups used to decide whether Homestead is usable.

use std::ffi::OsStr;
use std::path::Path;

use which::which;

/// Answers "is this file there" and "can this tool be run".
pub trait ExistenceProbe: Send + Sync {
    fn file_exists(&self, path: &Path) -> bool;

    /// True when `name` is an executable path or resolves through `PATH`.
    fn resolve_on_path(&self, name: &Path) -> bool;
}

/// [`ExistenceProbe`] that asks the real file system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemProbe;

impl ExistenceProbe for SystemProbe {
    fn file_exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn resolve_on_path(&self, name: &Path) -> bool {
        is_tool_installed(name)
    }
}

/// Checks if a command-line tool is available in the system's PATH.
pub fn is_tool_installed(tool_name: impl AsRef<OsStr>) -> bool {
    which(tool_name).is_ok()
}
