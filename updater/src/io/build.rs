//! Build toolchain adapter (`dotnet build -c Release <project>` by default).

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument, warn};

use crate::core::types::{BuildReport, CommandSpec, LogStatus, StdioMode};
use crate::error::{BuildError, LogWriteError};
use crate::io::process::ProcessRunner;

/// Parameters for one build invocation, taken from the settings snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRequest {
    /// Working copy root.
    pub repository: PathBuf,
    /// Project to build, relative to `repository`.
    pub project: PathBuf,
    pub show_console: bool,
    /// Capture output and persist it here when set.
    pub log_path: Option<PathBuf>,
}

impl BuildRequest {
    pub fn project_path(&self) -> PathBuf {
        self.repository.join(&self.project)
    }
}

/// Runs the build step and reports how it went.
pub trait Builder {
    /// Errors only when the toolchain could not be run to completion; a
    /// non-zero exit is reported through [`BuildReport::success`].
    fn build(&self, request: &BuildRequest) -> Result<BuildReport, BuildError>;
}

/// The external build command (program plus leading arguments).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolchain {
    pub program: String,
    pub args: Vec<String>,
}

impl Default for Toolchain {
    fn default() -> Self {
        Self {
            program: "dotnet".to_string(),
            args: vec!["build".to_string(), "-c".to_string(), "Release".to_string()],
        }
    }
}

/// [`Builder`] that shells out to a [`Toolchain`].
#[derive(Debug, Clone)]
pub struct ToolchainBuilder<R> {
    toolchain: Toolchain,
    runner: R,
}

impl<R: ProcessRunner> ToolchainBuilder<R> {
    pub fn new(toolchain: Toolchain, runner: R) -> Self {
        Self { toolchain, runner }
    }

    fn command(&self, request: &BuildRequest) -> CommandSpec {
        CommandSpec::new(self.toolchain.program.as_str())
            .args(self.toolchain.args.iter().map(OsString::from))
            .arg(request.project_path())
            .current_dir(&request.repository)
            .stdio(StdioMode {
                show_console: request.show_console,
                capture: request.log_path.is_some(),
            })
    }
}

impl<R: ProcessRunner> Builder for ToolchainBuilder<R> {
    #[instrument(skip_all, fields(program = %self.toolchain.program, project = %request.project.display()))]
    fn build(&self, request: &BuildRequest) -> Result<BuildReport, BuildError> {
        info!("starting build");
        let outcome = self.runner.run(&self.command(request))?;
        let elapsed = outcome.elapsed;
        let combined_log = outcome.combined.clone();

        let log = match (&request.log_path, &combined_log) {
            (Some(path), Some(contents)) => match write_build_log(path, contents) {
                Ok(()) => LogStatus::Written(path.clone()),
                Err(err) => {
                    warn!(err = %err, "build log not written");
                    LogStatus::Failed(err)
                }
            },
            _ => LogStatus::Disabled,
        };

        if outcome.success() {
            info!(elapsed_ms = elapsed.as_millis() as u64, "build succeeded");
        } else {
            warn!(exit_code = outcome.exit_code, "build failed");
        }
        Ok(BuildReport {
            outcome,
            elapsed,
            combined_log,
            log,
        })
    }
}

/// Overwrite the build log with the full captured output.
fn write_build_log(path: &Path, contents: &str) -> Result<(), LogWriteError> {
    let wrap = |source| LogWriteError {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(wrap)?;
    }
    fs::write(path, contents).map_err(wrap)?;
    debug!(path = %path.display(), bytes = contents.len(), "build log written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ScriptedRunner, launch_error, outcome, outcome_with_output};

    fn request(temp: &Path, log: bool) -> BuildRequest {
        BuildRequest {
            repository: temp.join("repo"),
            project: PathBuf::from("Ryujinx"),
            show_console: false,
            log_path: log.then(|| temp.join("logs").join("build.log")),
        }
    }

    #[test]
    fn invokes_release_build_of_project_path() {
        let temp = tempfile::tempdir().expect("tempdir");
        let runner = ScriptedRunner::new(vec![Ok(outcome(0))]);
        let builder = ToolchainBuilder::new(Toolchain::default(), &runner);
        let req = request(temp.path(), false);

        let report = builder.build(&req).expect("build");
        assert!(report.success());
        assert!(matches!(report.log, LogStatus::Disabled));

        let calls = runner.calls();
        assert_eq!(calls[0].program, "dotnet");
        let project = req.project_path().to_string_lossy().into_owned();
        assert_eq!(calls[0].args_lossy(), vec!["build", "-c", "Release", project.as_str()]);
        assert!(!calls[0].stdio.capture);
    }

    #[test]
    fn log_is_written_even_when_build_fails() {
        let temp = tempfile::tempdir().expect("tempdir");
        let runner = ScriptedRunner::new(vec![Ok(outcome_with_output(
            1,
            "Build FAILED.\n",
            "error CS1002\n",
        ))]);
        let builder = ToolchainBuilder::new(Toolchain::default(), &runner);
        let req = request(temp.path(), true);

        let report = builder.build(&req).expect("report");
        assert!(!report.success());
        assert_eq!(report.exit_code(), 1);
        let path = req.log_path.as_ref().expect("log path");
        assert!(matches!(&report.log, LogStatus::Written(p) if p == path));
        assert_eq!(
            fs::read_to_string(path).expect("read log"),
            "Build FAILED.\nerror CS1002\n"
        );
    }

    #[test]
    fn log_overwrites_previous_run() {
        let temp = tempfile::tempdir().expect("tempdir");
        let req = request(temp.path(), true);
        let path = req.log_path.clone().expect("log path");
        fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        fs::write(&path, "stale output from a previous build\n").expect("seed");

        let runner = ScriptedRunner::new(vec![Ok(outcome_with_output(0, "ok\n", ""))]);
        ToolchainBuilder::new(Toolchain::default(), &runner)
            .build(&req)
            .expect("build");
        assert_eq!(fs::read_to_string(&path).expect("read"), "ok\n");
    }

    #[test]
    fn log_write_failure_does_not_mask_success() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut req = request(temp.path(), true);
        // Writing a file over an existing directory fails.
        req.log_path = Some(temp.path().to_path_buf());

        let runner = ScriptedRunner::new(vec![Ok(outcome_with_output(0, "ok\n", ""))]);
        let report = ToolchainBuilder::new(Toolchain::default(), &runner)
            .build(&req)
            .expect("report");
        assert!(report.success());
        assert!(matches!(report.log, LogStatus::Failed(_)));
    }

    #[test]
    fn missing_toolchain_is_reported_distinctly() {
        let temp = tempfile::tempdir().expect("tempdir");
        let runner = ScriptedRunner::new(vec![Err(launch_error("dotnet"))]);
        let err = ToolchainBuilder::new(Toolchain::default(), &runner)
            .build(&request(temp.path(), true))
            .unwrap_err();
        assert!(matches!(err, BuildError::ToolchainMissing { .. }));
        assert!(!temp.path().join("logs").exists());
    }
}
