//! A deliberately small reader for `Homestead.yaml`.
//!
//! This is not a YAML parser. It scans the file one line at a time and picks
//! out the handful of values a status display needs: the box IP, memory and
//! CPU sizing, the provider, the mapped site names and the database names.
//! Anything else in the file is ignored, and lines it cannot make sense of are
//! skipped rather than reported.
//!
//! List items are only collected while their section is open. A section opens
//! at a top-level `sites:` or `databases:` key and closes at the next top-level
//! key of any other name, so items have to sit directly under their header.

use std::fs;
use std::path::Path;

use once_cell::sync::Lazy;
use rancher_core::error::{RancherError, Result};
use regex::Regex;
use serde::Serialize;
use tracing::{debug, warn};

static TOP_LEVEL_KEY: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\w+):").unwrap());
// Scalars are only read from top-level keys, so `ip:` under `networks:` is ignored.
static IP: Lazy<Regex> = Lazy::new(|| Regex::new(r#"^ip:\s*["']?([^"'\s]*)"#).unwrap());
static MEMORY: Lazy<Regex> = Lazy::new(|| Regex::new(r"^memory:\s*(\d+)").unwrap());
static CPUS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^cpus:\s*(\d+)").unwrap());
static PROVIDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^provider:\s*(\w+)").unwrap());
static SITE_ITEM: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*-\s*map:\s*(.*)").unwrap());
static DATABASE_ITEM: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*-\s*(.*)").unwrap());

/// The values read out of `Homestead.yaml`. Absent fields keep their defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HomesteadConfig {
    pub ip: String,
    pub memory_mb: u32,
    pub cpu_count: u32,
    pub provider: String,
    pub sites: Vec<String>,
    pub databases: Vec<String>,
}

/// The list section the scanner is currently inside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    None,
    Sites,
    Databases,
}

impl Section {
    fn from_key(key: &str) -> Self {
        match key {
            "sites" => Section::Sites,
            "databases" => Section::Databases,
            _ => Section::None,
        }
    }
}

/// Reads `path` and extracts the recognised fields.
///
/// Only failing to read the file is an error; its content never is.
pub fn extract(path: &Path) -> Result<HomesteadConfig> {
    let contents = fs::read_to_string(path).map_err(|source| RancherError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let config = parse_str(&contents);
    debug!(
        path = %path.display(),
        sites = config.sites.len(),
        databases = config.databases.len(),
        "Read Homestead configuration"
    );
    Ok(config)
}

/// Like [`extract`], but an unreadable file yields the all-default config.
pub fn extract_or_default(path: &Path) -> HomesteadConfig {
    extract(path).unwrap_or_else(|e| {
        warn!("Using empty Homestead configuration: {}", e);
        HomesteadConfig::default()
    })
}

/// Extracts the recognised fields from file contents.
pub fn parse_str(contents: &str) -> HomesteadConfig {
    let (config, _) = contents
        .lines()
        .fold((HomesteadConfig::default(), Section::None), scan_line);
    config
}

fn scan_line(
    (mut config, section): (HomesteadConfig, Section),
    line: &str,
) -> (HomesteadConfig, Section) {
    let section = match TOP_LEVEL_KEY.captures(line) {
        Some(caps) => Section::from_key(&caps[1]),
        None => section,
    };

    if let Some(caps) = IP.captures(line) {
        config.ip = caps[1].to_string();
    }
    if let Some(memory) = capture_number(&MEMORY, line) {
        config.memory_mb = memory;
    }
    if let Some(cpus) = capture_number(&CPUS, line) {
        config.cpu_count = cpus;
    }
    if let Some(caps) = PROVIDER.captures(line) {
        config.provider = caps[1].to_string();
    }

    match section {
        Section::Sites => {
            if let Some(caps) = SITE_ITEM.captures(line) {
                config.sites.push(caps[1].trim_end().to_string());
            }
        }
        Section::Databases => {
            if let Some(caps) = DATABASE_ITEM.captures(line) {
                config.databases.push(caps[1].trim_end().to_string());
            }
        }
        Section::None => {}
    }

    (config, section)
}

fn capture_number(pattern: &Regex, line: &str) -> Option<u32> {
    pattern
        .captures(line)
        .and_then(|caps| caps[1].parse().ok())
}
