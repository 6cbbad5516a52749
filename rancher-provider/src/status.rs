//! Turning `vagrant status` output into a [`VmStatus`].

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VmStatus {
    Running,
    Saved,
    PoweredOff,
    NotCreated,
    /// VirtualBox cannot run machines until its kernel module is loaded.
    KernelDriverNotLoaded,
    /// The probe output matched none of the known states.
    Unknown,
}

impl VmStatus {
    /// Whether the box is up, the only state in which it serves sites.
    pub fn is_up(&self) -> bool {
        matches!(self, VmStatus::Running)
    }

    pub fn label(&self) -> &'static str {
        match self {
            VmStatus::Running => "running",
            VmStatus::Saved => "saved",
            VmStatus::PoweredOff => "powered off",
            VmStatus::NotCreated => "not created",
            VmStatus::KernelDriverNotLoaded => "kernel driver not loaded",
            VmStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for VmStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Probe patterns in priority order. The first match decides.
static STATUS_RULES: Lazy<Vec<(VmStatus, Regex)>> = Lazy::new(|| {
    [
        (VmStatus::Running, r"running"),
        (VmStatus::Saved, r"saved"),
        (VmStatus::PoweredOff, r"poweroff"),
        (VmStatus::NotCreated, r"not created"),
        (
            VmStatus::KernelDriverNotLoaded,
            r"(?i)kernel (?:module|driver).*not loaded|vboxdrv",
        ),
    ]
    .into_iter()
    .map(|(status, pattern)| (status, Regex::new(pattern).unwrap()))
    .collect()
});

/// Classifies raw probe output. Pure; returns [`VmStatus::Unknown`] when
/// nothing matches.
pub fn classify(raw_output: &str) -> VmStatus {
    STATUS_RULES
        .iter()
        .find(|(_, pattern)| pattern.is_match(raw_output))
        .map(|(status, _)| *status)
        .unwrap_or(VmStatus::Unknown)
}
