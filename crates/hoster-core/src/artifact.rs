// ABOUTME: Resolves worker names to artifacts in the configured worker directory.
// ABOUTME: Also lists available workers and builds the command that launches one.

use crate::config::Config;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::process::Command;

/// The directory of runnable worker artifacts and how to launch them.
#[derive(Debug, Clone)]
pub struct WorkerDirectory {
    root: PathBuf,
    extension: Option<String>,
    interpreter: Option<String>,
}

impl WorkerDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            extension: None,
            interpreter: None,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.worker_directory_expanded())
            .with_extension(&config.extension)
            .with_interpreter(&config.interpreter)
    }

    /// Artifacts are named `<worker>.<extension>`. Empty means no extension.
    pub fn with_extension(mut self, extension: &str) -> Self {
        let extension = extension.trim_start_matches('.');
        self.extension = (!extension.is_empty()).then(|| extension.to_string());
        self
    }

    /// Run artifacts through `interpreter`. Empty means execute them directly.
    pub fn with_interpreter(mut self, interpreter: &str) -> Self {
        self.interpreter = (!interpreter.is_empty()).then(|| interpreter.to_string());
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn interpreter(&self) -> Option<&str> {
        self.interpreter.as_deref()
    }

    pub fn extension(&self) -> Option<&str> {
        self.extension.as_deref()
    }

    /// Path of the artifact for `name`, if it exists. Names that could escape the
    /// directory never resolve.
    pub fn resolve(&self, name: &str) -> Option<PathBuf> {
        if !is_valid_name(name) {
            return None;
        }
        let file_name = match &self.extension {
            Some(ext) => format!("{name}.{ext}"),
            None => name.to_string(),
        };
        let path = self.root.join(file_name);
        path.is_file().then_some(path)
    }

    /// Command that launches the artifact at `path`
    pub fn command_for(&self, path: &Path) -> Command {
        let mut cmd = match &self.interpreter {
            Some(interpreter) => {
                let mut cmd = Command::new(interpreter);
                cmd.arg(path);
                cmd
            }
            None => Command::new(path),
        };
        cmd.current_dir(&self.root);
        cmd
    }

    /// Names of every worker artifact in the directory, sorted
    pub fn list(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();

        let entries = std::fs::read_dir(&self.root)
            .with_context(|| format!("Failed to read worker directory {}", self.root.display()))?;
        for entry in entries {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }

            let name = match &self.extension {
                Some(ext) => {
                    if path.extension().and_then(|e| e.to_str()) != Some(ext.as_str()) {
                        continue;
                    }
                    path.file_stem().and_then(|n| n.to_str())
                }
                None => path.file_name().and_then(|n| n.to_str()),
            };

            if let Some(name) = name.filter(|n| is_valid_name(n)) {
                names.push(name.to_string());
            }
        }

        names.sort();
        Ok(names)
    }
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && !name.contains(['/', '\\'])
        && name != ".."
}
