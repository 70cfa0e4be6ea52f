use crate::command::{ExitCode, Stage};
use crate::error::{ShellError, ShellResult};
use crate::state::ShellState;
use std::borrow::Cow;
use std::ffi::OsStr;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, ExitStatus, Stdio};

/// Where a stage's standard output goes.
pub enum Output {
    /// Captured so it can be linked to the next stage.
    Piped,
    /// Bound to the shell's own output sink.
    Sink(Stdio),
}

enum Lifecycle {
    Created { stdin: Stdio, stdout: Stdio },
    Started(Child),
    Completed(ExitStatus),
    StartFailed,
}

/// An external program bound to one pipeline stage.
///
/// Moves through `created -> started -> completed`, or `created -> start
/// failed`. Standard error is always the shell's own.
pub struct ExternalProcess {
    argv: Vec<String>,
    cwd: PathBuf,
    lifecycle: Lifecycle,
}

impl ExternalProcess {
    /// Bind `stage` to a new process description without starting it.
    ///
    /// The process runs in the state's working directory as of this call,
    /// and reads the null device until a link replaces its stdin.
    pub fn new(stage: &Stage, state: &ShellState, output: Output) -> Self {
        let stdout = match output {
            Output::Piped => Stdio::piped(),
            Output::Sink(stdio) => stdio,
        };
        Self {
            argv: stage.argv().to_vec(),
            cwd: state.current_dir().to_path_buf(),
            lifecycle: Lifecycle::Created {
                stdin: Stdio::null(),
                stdout,
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.argv[0]
    }

    /// OS process id, once started.
    pub fn id(&self) -> Option<u32> {
        match &self.lifecycle {
            Lifecycle::Started(child) => Some(child.id()),
            _ => None,
        }
    }

    /// Replace standard input; only meaningful before [`start`](Self::start).
    pub fn set_stdin(&mut self, new_stdin: impl Into<Stdio>) {
        if let Lifecycle::Created { stdin, .. } = &mut self.lifecycle {
            *stdin = new_stdin.into();
        }
    }

    /// Take the captured standard output of a started process.
    pub fn take_stdout(&mut self) -> Option<ChildStdout> {
        match &mut self.lifecycle {
            Lifecycle::Started(child) => child.stdout.take(),
            _ => None,
        }
    }

    /// Spawn the OS process.
    ///
    /// The program is looked up in `PATH`; names containing a path separator
    /// are resolved against the shell's working directory.
    pub fn start(&mut self) -> ShellResult<u32> {
        let Lifecycle::Created { stdin, stdout } =
            std::mem::replace(&mut self.lifecycle, Lifecycle::StartFailed)
        else {
            return Err(ShellError::process(
                self.name(),
                io::Error::other("process was already started"),
            ));
        };

        let search_paths = std::env::var_os("PATH").unwrap_or_default();
        let program = find_command_path(&search_paths, &self.cwd, Path::new(self.name()))
            .ok_or_else(|| {
                ShellError::process(
                    self.name(),
                    io::Error::new(io::ErrorKind::NotFound, "command not found"),
                )
            })?
            .into_owned();

        let child = Command::new(&program)
            .args(&self.argv[1..])
            .current_dir(&self.cwd)
            .stdin(stdin)
            .stdout(stdout)
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| ShellError::process(self.name(), e))?;
        let pid = child.id();
        tracing::debug!(command = %self.name(), program = %program.display(), pid, "started");
        self.lifecycle = Lifecycle::Started(child);
        Ok(pid)
    }

    /// Wait for the process to finish.
    ///
    /// A non-zero exit or death by signal is a [`ShellError::Wait`].
    pub fn wait(&mut self) -> ShellResult<ExitCode> {
        let status = match &mut self.lifecycle {
            Lifecycle::Started(child) => child
                .wait()
                .map_err(|e| ShellError::process(&self.argv[0], e))?,
            Lifecycle::Completed(status) => *status,
            Lifecycle::Created { .. } | Lifecycle::StartFailed => {
                return Err(ShellError::process(
                    &self.argv[0],
                    io::Error::other("process was never started"),
                ));
            }
        };
        self.lifecycle = Lifecycle::Completed(status);
        tracing::debug!(command = %self.name(), %status, "completed");

        if status.success() {
            Ok(0)
        } else {
            Err(ShellError::Wait {
                command: self.name().to_string(),
                status,
            })
        }
    }

    /// Give up on a started process without blocking the caller.
    ///
    /// Its captured stdout is closed and a background thread reaps it, so no
    /// zombie is left behind.
    pub fn abandon(mut self) {
        drop(self.take_stdout());
        if let Lifecycle::Started(mut child) = self.lifecycle {
            let name = self.argv.swap_remove(0);
            let reaper = std::thread::Builder::new()
                .name(format!("reap-{name}"))
                .spawn(move || match child.wait() {
                    Ok(status) => tracing::debug!(command = %name, %status, "reaped abandoned stage"),
                    Err(e) => tracing::warn!(command = %name, "failed to reap abandoned stage: {e}"),
                });
            if let Err(e) = reaper {
                tracing::warn!("failed to spawn reaper thread: {e}");
            }
        }
    }
}

/// Map an exit status to a shell exit code.
pub fn exit_code(status: ExitStatus) -> ExitCode {
    match status.code() {
        Some(x) => x,
        None => terminated_by_signal(status),
    }
}

#[cfg(unix)]
fn terminated_by_signal(exit_status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    if let Some(signal) = ExitStatusExt::signal(&exit_status) {
        128 + signal
    } else if ExitStatusExt::core_dumped(&exit_status) {
        255
    } else {
        -1
    }
}

#[cfg(not(unix))]
fn terminated_by_signal(_exit_status: ExitStatus) -> i32 {
    -1
}

/// Resolve a command path the way a typical shell would.
///
/// Behavior:
/// - Absolute path: returns it if it exists.
/// - `./foo` or a relative path with several components (e.g. `bin/sh`):
///   resolved against `cwd`, returned if it exists.
/// - Single path component (no separators): search each directory in
///   `search_paths` (PATH) and return the first existing match.
/// - Empty path: returns `None`.
pub fn find_command_path<'a>(
    search_paths: &OsStr,
    cwd: &Path,
    path: &'a Path,
) -> Option<Cow<'a, Path>> {
    if path.is_absolute() {
        return find_by_path(path).map(Cow::Borrowed);
    }

    let mut components = path.components();
    let first = components.next();
    let second = components.next();
    match (first, second) {
        // Empty path -> not found
        (None, _) => None,
        (Some(std::path::Component::Normal(x)), None) => {
            find_in_path(search_paths, x).map(Cow::Owned)
        }
        // `./foo`, `../foo`, `bin/sh` -> relative to the shell's directory
        _ => {
            let candidate = cwd.join(path);
            find_by_path(&candidate).map(|p| Cow::Owned(p.to_path_buf()))
        }
    }
}

fn find_in_path(search_paths: &OsStr, cmd: &OsStr) -> Option<PathBuf> {
    for dir in std::env::split_paths(search_paths) {
        let path = dir.join(cmd);
        if let Some(path) = find_by_path(&path) {
            return Some(path.to_owned());
        }
    }
    None
}

fn find_by_path(path: &Path) -> Option<&Path> {
    if path.is_file() { Some(path) } else { None }
}
