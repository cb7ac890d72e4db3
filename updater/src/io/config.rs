//! Updater configuration stored under `.updater/config.toml`.
//!
//! The file is the settings store: it is read once per command into an
//! immutable [`Settings`] snapshot, so flags cannot change between the build
//! confirmation and the build itself.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::types::OrchestratorFlags;
use crate::io::build::{BuildRequest, Toolchain};
use crate::io::git::VcsOptions;

pub const DEFAULT_CONFIG_PATH: &str = ".updater/config.toml";

/// Updater configuration (TOML).
///
/// Missing fields fall back to defaults, so an empty file is valid.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct UpdaterConfig {
    pub repository: RepositoryConfig,
    pub flags: OrchestratorFlags,
    pub logs: LogConfig,
    pub build: BuildConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RepositoryConfig {
    /// Working copy of the project being updated.
    pub path: PathBuf,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("."),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LogConfig {
    /// Overwritten after every build when `flags.write_build_log` is set.
    pub build: PathBuf,
    /// Appended per git command when `flags.write_vcs_log` is set.
    pub vcs: PathBuf,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            build: PathBuf::from(".updater/build.log"),
            vcs: PathBuf::from(".updater/git.log"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BuildConfig {
    pub program: String,
    pub args: Vec<String>,
    /// Project to build, relative to the repository.
    pub project: PathBuf,
}

impl Default for BuildConfig {
    fn default() -> Self {
        let toolchain = Toolchain::default();
        Self {
            program: toolchain.program,
            args: toolchain.args,
            project: PathBuf::from("Ryujinx"),
        }
    }
}

impl UpdaterConfig {
    pub fn validate(&self) -> Result<()> {
        if self.repository.path.as_os_str().is_empty() {
            return Err(anyhow!("repository.path must not be empty"));
        }
        if self.logs.build.as_os_str().is_empty() || self.logs.vcs.as_os_str().is_empty() {
            return Err(anyhow!("logs.build and logs.vcs must not be empty"));
        }
        if self.build.program.trim().is_empty() {
            return Err(anyhow!("build.program must not be empty"));
        }
        if self.build.project.is_absolute() {
            return Err(anyhow!("build.project must be relative to the repository"));
        }
        // Allowed, but the console and the log compete for the same output.
        if self.flags.show_vcs_console && self.flags.write_vcs_log {
            warn!("show_vcs_console and write_vcs_log are both enabled; output is echoed to stderr");
        }
        if self.flags.show_build_console && self.flags.write_build_log {
            warn!("show_build_console and write_build_log are both enabled; output is echoed to stderr");
        }
        Ok(())
    }

    /// Resolve relative paths against `base` and freeze the result.
    pub fn snapshot(&self, base: &Path) -> Settings {
        Settings {
            repository: base.join(&self.repository.path),
            flags: self.flags,
            build_log_path: base.join(&self.logs.build),
            vcs_log_path: base.join(&self.logs.vcs),
            toolchain: Toolchain {
                program: self.build.program.clone(),
                args: self.build.args.clone(),
            },
            project: self.build.project.clone(),
        }
    }
}

/// Immutable settings for one command invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub repository: PathBuf,
    pub flags: OrchestratorFlags,
    pub build_log_path: PathBuf,
    pub vcs_log_path: PathBuf,
    pub toolchain: Toolchain,
    pub project: PathBuf,
}

impl Settings {
    /// Confirm the repository path exists before any git command touches it.
    pub fn ensure_repository(&self) -> Result<()> {
        if !self.repository.is_dir() {
            return Err(anyhow!(
                "repository {} does not exist or is not a directory",
                self.repository.display()
            ));
        }
        Ok(())
    }

    pub fn vcs_options(&self) -> VcsOptions {
        VcsOptions {
            show_console: self.flags.show_vcs_console,
            log_path: self
                .flags
                .write_vcs_log
                .then(|| self.vcs_log_path.clone()),
        }
    }

    pub fn build_request(&self) -> BuildRequest {
        BuildRequest {
            repository: self.repository.clone(),
            project: self.project.clone(),
            show_console: self.flags.show_build_console,
            log_path: self
                .flags
                .write_build_log
                .then(|| self.build_log_path.clone()),
        }
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `UpdaterConfig::default()`.
pub fn load_config(path: &Path) -> Result<UpdaterConfig> {
    if !path.exists() {
        debug!(path = %path.display(), "config missing, using defaults");
        let cfg = UpdaterConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: UpdaterConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &UpdaterConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    if !parent.as_os_str().is_empty() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}
