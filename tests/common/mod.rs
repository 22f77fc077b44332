//! Common test utilities for ontology integration tests.
//!
//! Provides `TestEnv` for isolated test environments that don't read the
//! user's `~/.config/ontology-toolkit/` or any real API keys.

#![allow(dead_code)]

use assert_cmd::Command;
use std::path::{Path, PathBuf};
pub use tempfile::TempDir;

/// A test environment with an isolated project and config directory.
///
/// - `project_dir`: working directory; the ontology lives in `.ontology/`
/// - `config_dir`: system config directory (via `ONTOLOGY_CONFIG_DIR`)
///
/// The `ontology()` method returns a `Command` with both set per invocation,
/// making tests parallel-safe.
pub struct TestEnv {
    pub project_dir: TempDir,
    pub config_dir: TempDir,
}

impl TestEnv {
    /// Create a new test environment with empty directories.
    pub fn new() -> Self {
        Self {
            project_dir: TempDir::new().unwrap(),
            config_dir: TempDir::new().unwrap(),
        }
    }

    /// Create a new test environment and run `ontology init`.
    pub fn init() -> Self {
        let env = Self::new();
        env.ontology().args(["init", "--project", "Test"]).assert().success();
        env
    }

    /// Get a Command for the ontology binary inside this environment.
    pub fn ontology(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_ontology"));
        cmd.current_dir(self.project_dir.path());
        cmd.env("ONTOLOGY_CONFIG_DIR", self.config_dir.path());
        cmd.env_remove("ONTOLOGY_PATH");
        cmd.env_remove("ONTOLOGY_LOG");
        cmd.env_remove("ONTOLOGY_AI_PROVIDER");
        cmd.env_remove("ONTOLOGY_AI_MODEL");
        cmd.env_remove("ONTOLOGY_AI_TEMPERATURE");
        cmd.env_remove("ANTHROPIC_API_KEY");
        cmd.env_remove("OPENAI_API_KEY");
        cmd
    }

    /// Get the path to the project directory.
    pub fn path(&self) -> &Path {
        self.project_dir.path()
    }

    /// Path of the ontology root.
    pub fn root(&self) -> PathBuf {
        self.project_dir.path().join(".ontology")
    }

    /// Add an entity and return its ID from the JSON output.
    pub fn add(&self, name: &str, kind: &str) -> String {
        let output = self
            .ontology()
            .args(["add", name, "--type", kind])
            .output()
            .expect("Failed to run command");
        assert!(output.status.success(), "add failed: {:?}", output);
        let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        json["id"].as_str().unwrap().to_string()
    }

    /// Run a command and parse its JSON stdout.
    pub fn json(&self, args: &[&str]) -> serde_json::Value {
        let output = self
            .ontology()
            .args(args)
            .output()
            .expect("Failed to run command");
        serde_json::from_slice(&output.stdout).unwrap_or_else(|e| {
            panic!(
                "invalid JSON from {:?}: {}\nstdout: {}\nstderr: {}",
                args,
                e,
                String::from_utf8_lossy(&output.stdout),
                String::from_utf8_lossy(&output.stderr)
            )
        })
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}
