//! Common test utilities for settings-vault integration tests.
//!
//! Provides `TestEnv` for isolated test environments that don't pollute
//! the user's `~/.local/share/settings-vault/` directory.

#![allow(dead_code)]

use assert_cmd::Command;
pub use tempfile::TempDir;

/// A test environment with isolated directories.
///
/// - `data_dir`: Holds stored settings (via `SVAULT_DIR`)
/// - `config_dir`: Holds config.toml (via `SVAULT_CONFIG_DIR`)
///
/// The `svault()` method sets both per-invocation, making tests parallel-safe.
pub struct TestEnv {
    pub data_dir: TempDir,
    pub config_dir: TempDir,
}

impl TestEnv {
    /// Create a new test environment with isolated directories.
    pub fn new() -> Self {
        Self {
            data_dir: TempDir::new().unwrap(),
            config_dir: TempDir::new().unwrap(),
        }
    }

    /// Get a Command for the svault binary with isolated directories.
    pub fn svault(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_svault"));
        cmd.env("SVAULT_DIR", self.data_dir.path());
        cmd.env("SVAULT_CONFIG_DIR", self.config_dir.path());
        cmd.env_remove("SVAULT_FORMAT");
        cmd.env_remove("SVAULT_CACHE");
        cmd.env_remove("SVAULT_KEY");
        cmd.env_remove("SVAULT_LOG");
        cmd
    }

    /// Get the path to the settings directory.
    pub fn data_path(&self) -> &std::path::Path {
        self.data_dir.path()
    }

    /// Write a stored settings file directly.
    pub fn write_settings(&self, file_name: &str, contents: &str) {
        std::fs::write(self.data_dir.path().join(file_name), contents).unwrap();
    }

    /// Read a stored settings file directly.
    pub fn read_settings(&self, file_name: &str) -> String {
        std::fs::read_to_string(self.data_dir.path().join(file_name)).unwrap()
    }

    /// Write config.toml.
    pub fn write_config(&self, contents: &str) {
        std::fs::write(self.config_dir.path().join("config.toml"), contents).unwrap();
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse JSON stdout from a successful command.
pub fn parse_json(output: &[u8]) -> serde_json::Value {
    serde_json::from_slice(output).unwrap()
}
