//! Blocking child-process execution with optional line capture.
//!
//! The calling thread waits for the child to exit. When capture is enabled two
//! reader threads drain stdout and stderr concurrently (avoiding pipe
//! deadlocks) and append each line to a shared combined buffer. That buffer is
//! only read after both readers have been joined.

use std::io::{self, BufRead, BufReader, Read, Write};
use std::process::{Child, Command, Stdio};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Instant;

use tracing::{debug, error, instrument, warn};

use crate::core::types::{CommandOutcome, CommandSpec, NO_EXIT_CODE, StdioMode};
use crate::error::ProcessError;

/// Something that can run a [`CommandSpec`] to completion.
///
/// The system implementation spawns real processes; tests substitute scripted
/// runners that return canned outcomes.
pub trait ProcessRunner {
    fn run(&self, command: &CommandSpec) -> Result<CommandOutcome, ProcessError>;
}

impl<R: ProcessRunner + ?Sized> ProcessRunner for &R {
    fn run(&self, command: &CommandSpec) -> Result<CommandOutcome, ProcessError> {
        (**self).run(command)
    }
}

/// Runner that spawns OS processes via [`std::process::Command`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl ProcessRunner for SystemRunner {
    #[instrument(skip_all, fields(program = %command.program, capture = command.stdio.capture, show_console = command.stdio.show_console))]
    fn run(&self, command: &CommandSpec) -> Result<CommandOutcome, ProcessError> {
        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args).stdin(Stdio::null());
        if let Some(dir) = &command.workdir {
            cmd.current_dir(dir);
        }
        configure_stdio(&mut cmd, command.stdio);

        debug!(command = %command, "spawning child process");
        let mut child = match cmd.spawn() {
            Ok(c) => c,
            Err(e) => {
                error!(err = %e, "failed to spawn command");
                return Err(ProcessError::Launch {
                    program: command.program.clone(),
                    source: e,
                });
            }
        };
        let started = Instant::now();
        let wait_err = |source| ProcessError::Wait {
            program: command.program.clone(),
            source,
        };

        let readers = if command.stdio.capture {
            match OutputReaders::spawn(&mut child, command.stdio.show_console) {
                Ok(readers) => Some(readers),
                Err(e) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(wait_err(e));
                }
            }
        } else {
            None
        };

        let status = match child.wait() {
            Ok(status) => status,
            Err(e) => {
                warn!(err = %e, "wait for command failed, killing");
                let _ = child.kill();
                return Err(wait_err(e));
            }
        };
        let elapsed = started.elapsed();

        let captured = match readers {
            Some(readers) => Some(readers.join().map_err(wait_err)?),
            None => None,
        };

        let exit_code = status.code().unwrap_or(NO_EXIT_CODE);
        debug!(exit_code, elapsed_ms = elapsed.as_millis() as u64, "command finished");

        let (stdout, stderr, combined) = match captured {
            Some(c) => (Some(c.stdout), Some(c.stderr), Some(c.combined)),
            None => (None, None, None),
        };
        Ok(CommandOutcome {
            exit_code,
            stdout,
            stderr,
            combined,
            elapsed,
        })
    }
}

fn configure_stdio(cmd: &mut Command, stdio: StdioMode) {
    if stdio.capture {
        cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
    } else if stdio.show_console {
        cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit());
    } else {
        cmd.stdout(Stdio::null()).stderr(Stdio::null());
    }
    hide_console_window(cmd, stdio.show_console);
}

#[cfg(windows)]
fn hide_console_window(cmd: &mut Command, show_console: bool) {
    use std::os::windows::process::CommandExt;

    const CREATE_NO_WINDOW: u32 = 0x0800_0000;
    if !show_console {
        cmd.creation_flags(CREATE_NO_WINDOW);
    }
}

#[cfg(not(windows))]
fn hide_console_window(_cmd: &mut Command, _show_console: bool) {}

struct Captured {
    stdout: String,
    stderr: String,
    combined: String,
}

struct OutputReaders {
    stdout: thread::JoinHandle<io::Result<String>>,
    stderr: thread::JoinHandle<io::Result<String>>,
    combined: Arc<Mutex<String>>,
}

impl OutputReaders {
    fn spawn(child: &mut Child, echo: bool) -> io::Result<Self> {
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| io::Error::other("stdout was not piped"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| io::Error::other("stderr was not piped"))?;

        let combined = Arc::new(Mutex::new(String::new()));
        let stdout_combined = Arc::clone(&combined);
        let stderr_combined = Arc::clone(&combined);
        Ok(Self {
            stdout: thread::spawn(move || read_lines(stdout, &stdout_combined, echo)),
            stderr: thread::spawn(move || read_lines(stderr, &stderr_combined, echo)),
            combined,
        })
    }

    fn join(self) -> io::Result<Captured> {
        let stdout = join_reader(self.stdout)?;
        let stderr = join_reader(self.stderr)?;
        let combined = std::mem::take(
            &mut *self
                .combined
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        Ok(Captured {
            stdout,
            stderr,
            combined,
        })
    }
}

fn join_reader(handle: thread::JoinHandle<io::Result<String>>) -> io::Result<String> {
    match handle.join() {
        Ok(result) => result,
        Err(_) => Err(io::Error::other("output reader thread panicked")),
    }
}

/// Drain `reader` line by line. Every stored line ends with `\n`, including a
/// final unterminated one.
fn read_lines<R: Read>(reader: R, combined: &Mutex<String>, echo: bool) -> io::Result<String> {
    let mut reader = BufReader::new(reader);
    let mut own = String::new();
    let mut raw = Vec::new();

    loop {
        raw.clear();
        if reader.read_until(b'\n', &mut raw)? == 0 {
            break;
        }
        let mut line = String::from_utf8_lossy(&raw).into_owned();
        if !line.ends_with('\n') {
            line.push('\n');
        }
        if echo {
            // Echo failures must not abort capture.
            let _ = io::stderr().lock().write_all(line.as_bytes());
        }
        own.push_str(&line);
        combined
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_str(&line);
    }

    Ok(own)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str, capture: bool) -> CommandSpec {
        CommandSpec::new("sh").arg("-c").arg(script).stdio(StdioMode {
            show_console: false,
            capture,
        })
    }

    #[test]
    fn captures_both_streams_and_combined() {
        let outcome = SystemRunner
            .run(&sh("echo out1; echo err1 1>&2; echo out2", true))
            .expect("run");
        assert!(outcome.success());
        assert_eq!(outcome.stdout.as_deref(), Some("out1\nout2\n"));
        assert_eq!(outcome.stderr.as_deref(), Some("err1\n"));

        let combined = outcome.combined.expect("combined");
        let mut lines: Vec<&str> = combined.lines().collect();
        lines.sort_unstable();
        assert_eq!(lines, vec!["err1", "out1", "out2"]);
    }

    #[test]
    fn nonzero_exit_is_an_outcome_not_an_error() {
        let outcome = SystemRunner.run(&sh("exit 3", false)).expect("run");
        assert_eq!(outcome.exit_code, 3);
        assert!(!outcome.success());
        assert!(outcome.stdout.is_none());
        assert!(outcome.combined.is_none());
    }

    #[test]
    fn missing_program_is_a_launch_error() {
        let err = SystemRunner
            .run(&CommandSpec::new("definitely-not-a-real-program-4821"))
            .unwrap_err();
        assert!(err.is_launch(), "unexpected error: {err}");
    }

    #[test]
    fn unterminated_last_line_gets_a_newline() {
        let outcome = SystemRunner.run(&sh("printf partial", true)).expect("run");
        assert_eq!(outcome.stdout.as_deref(), Some("partial\n"));
    }

    #[test]
    fn signal_termination_reports_no_exit_code() {
        let outcome = SystemRunner.run(&sh("kill -9 $$", false)).expect("run");
        assert_eq!(outcome.exit_code, NO_EXIT_CODE);
    }

    #[test]
    fn runs_in_requested_directory() {
        let temp = tempfile::tempdir().expect("tempdir");
        std::fs::write(temp.path().join("marker.txt"), "x").expect("write marker");
        let outcome = SystemRunner
            .run(&sh("ls", true).current_dir(temp.path()))
            .expect("run");
        assert_eq!(outcome.stdout.as_deref(), Some("marker.txt\n"));
    }

    #[test]
    fn elapsed_covers_child_runtime() {
        let outcome = SystemRunner.run(&sh("sleep 0.2", false)).expect("run");
        assert!(outcome.elapsed >= std::time::Duration::from_millis(150));
    }
}
