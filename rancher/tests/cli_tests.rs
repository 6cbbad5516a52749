//! Drives the `rancher` binary against a scripted vagrant.
#![cfg(unix)]

use assert_cmd::Command;
use predicates::prelude::*;
use serial_test::serial;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::{tempdir, TempDir};

const FAKE_VAGRANT: &str = r#"#!/bin/sh
here="$(dirname "$0")"
echo "$@" >> "$here/calls.log"
state="$(cat "$here/state" 2>/dev/null || echo poweroff)"
case "$1" in
    status) printf 'homestead                 %s (virtualbox)\n' "$state" ;;
    up) echo running > "$here/state" ;;
    halt) echo poweroff > "$here/state" ;;
esac
"#;

struct Setup {
    root: TempDir,
    settings_file: PathBuf,
}

impl Setup {
    fn new() -> Self {
        let root = tempdir().unwrap();
        let project_dir = root.path().join("Homestead");
        let config_dir = root.path().join(".homestead");
        let bin_dir = root.path().join("bin");
        for dir in [&project_dir, &config_dir, &bin_dir] {
            fs::create_dir_all(dir).unwrap();
        }
        fs::write(project_dir.join("Vagrantfile"), "").unwrap();
        fs::write(
            config_dir.join("Homestead.yaml"),
            "ip: \"192.168.56.56\"\nmemory: 4096\ncpus: 4\nprovider: virtualbox\n\
             sites:\n    - map: blog.test\n      to: /home/vagrant/blog/public\n\
             databases:\n    - blog\n",
        )
        .unwrap();

        let vagrant = bin_dir.join("vagrant");
        fs::write(&vagrant, FAKE_VAGRANT).unwrap();
        fs::set_permissions(&vagrant, fs::Permissions::from_mode(0o755)).unwrap();

        let settings_file = root.path().join("settings.yaml");
        fs::write(
            &settings_file,
            format!(
                "project_dir: {}\nconfig_dir: {}\nvagrant_path: {}\neditor_path: /bin/true\n",
                project_dir.display(),
                config_dir.display(),
                vagrant.display()
            ),
        )
        .unwrap();

        Self {
            root,
            settings_file,
        }
    }

    fn path(&self, relative: &str) -> PathBuf {
        self.root.path().join(relative)
    }

    fn rancher(&self) -> Command {
        let mut cmd = Command::from(std::process::Command::new(assert_cmd::cargo::cargo_bin("rancher")));
        cmd.env("RANCHER_LOG_OUTPUT", "none")
            .arg("--settings")
            .arg(&self.settings_file);
        cmd
    }
}

fn calls(path: &Path) -> String {
    fs::read_to_string(path).unwrap_or_default()
}

#[test]
#[serial]
fn test_status_reports_box_state() {
    let setup = Setup::new();
    setup
        .rancher()
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Homestead: ready"))
        .stdout(predicate::str::contains("Box:       powered off"))
        .stdout(predicate::str::contains("Available: up, destroy"));
}

#[test]
#[serial]
fn test_up_then_halt() {
    let setup = Setup::new();
    setup
        .rancher()
        .arg("up")
        .assert()
        .success()
        .stderr(predicate::str::contains("Box is now running"));
    setup
        .rancher()
        .arg("halt")
        .assert()
        .success()
        .stderr(predicate::str::contains("Box is now powered off"));

    assert_eq!(
        calls(&setup.path("bin/calls.log")),
        "up\nstatus\nhalt\nstatus\n"
    );
}

#[test]
#[serial]
fn test_config_json() {
    let setup = Setup::new();
    let output = setup.rancher().args(["config", "--json"]).output().unwrap();
    assert!(output.status.success());

    let config: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(config["ip"], "192.168.56.56");
    assert_eq!(config["memory_mb"], 4096);
    assert_eq!(config["cpu_count"], 4);
    assert_eq!(config["sites"], serde_json::json!(["blog.test"]));
    assert_eq!(config["databases"], serde_json::json!(["blog"]));
}

#[test]
#[serial]
fn test_missing_homestead_fails_transition() {
    let setup = Setup::new();
    let empty = setup.path("empty");
    fs::create_dir_all(&empty).unwrap();

    setup
        .rancher()
        .arg("up")
        .arg("--project-dir")
        .arg(&empty)
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("missing Vagrantfile"));
    assert!(calls(&setup.path("bin/calls.log")).is_empty());
}

#[test]
#[serial]
fn test_status_of_missing_homestead_still_succeeds() {
    let setup = Setup::new();
    setup
        .rancher()
        .arg("status")
        .arg("--vagrant")
        .arg("/nonexistent/vagrant")
        .assert()
        .success()
        .stdout(predicate::str::contains("Homestead: missing vagrant"))
        .stdout(predicate::str::contains("missing or not configured"));
}

#[test]
#[serial]
fn test_edit_opens_editor() {
    let setup = Setup::new();
    setup
        .rancher()
        .arg("edit")
        .assert()
        .success()
        .stderr(predicate::str::contains("Opened Homestead.yaml"));
}
