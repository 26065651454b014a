//! Shared test helpers for integration tests
//!
//! Every test gets its own data directory and a config path that does not
//! exist, so the user's real inventory and config are never touched.

#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;

use assert_cmd::cargo;
use assert_cmd::Command;
use tempfile::TempDir;

/// Isolated data and config location for one test
pub struct TestEnv {
    pub tmp: TempDir,
}

impl TestEnv {
    pub fn new() -> Self {
        Self {
            tmp: TempDir::new().unwrap(),
        }
    }

    pub fn data_dir(&self) -> PathBuf {
        self.tmp.path().join("data")
    }

    pub fn config_path(&self) -> PathBuf {
        self.tmp.path().join("config.yaml")
    }

    /// Write a config file for this environment
    pub fn write_config(&self, yaml: &str) {
        fs::write(self.config_path(), yaml).unwrap();
    }

    /// A `materiel` command bound to this environment
    pub fn materiel(&self) -> Command {
        let mut cmd = Command::new(cargo::cargo_bin!("materiel"));
        cmd.env("MATERIEL_DATA_DIR", self.data_dir())
            .env("MATERIEL_CONFIG", self.config_path())
            .env_remove("MATERIEL_PREMIUM")
            .env_remove("MATERIEL_LOG");
        cmd
    }

    /// Run a creating command and return the short id it prints
    pub fn create(&self, args: &[&str]) -> String {
        let output = self
            .materiel()
            .args(args)
            .args(["--format", "short-id"])
            .output()
            .unwrap();
        assert!(
            output.status.success(),
            "{:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
        String::from_utf8_lossy(&output.stdout).trim().to_string()
    }

    pub fn stdout(&self, args: &[&str]) -> String {
        let output = self.materiel().args(args).output().unwrap();
        assert!(
            output.status.success(),
            "{:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
        String::from_utf8_lossy(&output.stdout).to_string()
    }

    pub fn equipment(&self, name: &str) -> String {
        self.create(&["equipment", "new", "--name", name, "--value", "100"])
    }

    pub fn person(&self, first: &str, last: &str) -> String {
        self.create(&["person", "new", "--first", first, "--last", last])
    }
}

/// Helper to get a materiel command with no environment isolation
pub fn materiel() -> Command {
    Command::new(cargo::cargo_bin!("materiel"))
}
