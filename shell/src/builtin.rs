use crate::error::{ShellError, ShellResult};
use crate::state::ShellState;
use argh::{EarlyExit, FromArgs};
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use std::io::{self, Write};
use std::process::{Command, Stdio};

/// Commands the shell runs in-process.
///
/// The set is closed: anything else on a stage is an external program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Cd,
    Pwd,
    Echo,
    Kill,
    Ps,
}

type Handler = fn(&[String], &mut dyn Write, &mut ShellState) -> ShellResult<()>;

impl Builtin {
    pub const ALL: [Builtin; 5] = [
        Builtin::Cd,
        Builtin::Pwd,
        Builtin::Echo,
        Builtin::Kill,
        Builtin::Ps,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Builtin::Cd => Cd::NAME,
            Builtin::Pwd => Pwd::NAME,
            Builtin::Echo => Echo::NAME,
            Builtin::Kill => Kill::NAME,
            Builtin::Ps => Ps::NAME,
        }
    }

    /// Look up a builtin by its command name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|b| b.name() == name)
    }

    fn handler(self) -> Handler {
        match self {
            Builtin::Cd => run::<Cd>,
            Builtin::Pwd => run::<Pwd>,
            Builtin::Echo => run::<Echo>,
            Builtin::Kill => run::<Kill>,
            Builtin::Ps => run::<Ps>,
        }
    }

    /// Execute the builtin with the arguments that follow its name.
    pub fn execute(
        self,
        args: &[String],
        stdout: &mut dyn Write,
        state: &mut ShellState,
    ) -> ShellResult<()> {
        (self.handler())(args, stdout, state)?;
        stdout
            .flush()
            .map_err(|e| ShellError::process(self.name(), e))
    }
}

/// Run `argv` in-process if it names a builtin.
///
/// Returns `Ok(false)` without side effects when `argv[0]` is not a builtin.
/// This is a thin wrapper over [`Builtin::from_name`] and
/// [`Builtin::execute`] for callers holding a whole argument vector. The
/// pipeline executor uses those two directly, since it has to abandon the
/// stages already started before the builtin runs.
pub fn dispatch(
    argv: &[String],
    stdout: &mut dyn Write,
    state: &mut ShellState,
) -> ShellResult<bool> {
    let Some((name, args)) = argv.split_first() else {
        return Ok(false);
    };
    match Builtin::from_name(name) {
        Some(builtin) => builtin.execute(args, stdout, state).map(|()| true),
        None => Ok(false),
    }
}

/// A builtin whose arguments are parsed with [`argh`].
pub(crate) trait BuiltinCommand: Sized + FromArgs {
    /// Canonical name of the command, e.g. "echo" or "cd".
    const NAME: &'static str;

    fn execute(self, stdout: &mut dyn Write, state: &mut ShellState) -> ShellResult<()>;
}

fn run<T: BuiltinCommand>(
    args: &[String],
    stdout: &mut dyn Write,
    state: &mut ShellState,
) -> ShellResult<()> {
    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    match T::from_args(&[T::NAME], &args) {
        Ok(cmd) => cmd.execute(stdout, state),
        // `--help` and friends
        Err(EarlyExit {
            output,
            status: Ok(()),
        }) => writeln!(stdout, "{}", output.trim_end()).map_err(|e| ShellError::process(T::NAME, e)),
        Err(EarlyExit { output, .. }) => Err(ShellError::InvalidArgument {
            command: T::NAME,
            detail: output.trim_end().to_string(),
        }),
    }
}

fn write_line(command: &'static str, stdout: &mut dyn Write, line: &str) -> ShellResult<()> {
    writeln!(stdout, "{line}").map_err(|e| ShellError::process(command, e))
}

#[derive(FromArgs)]
/// Change the shell's working directory.
pub struct Cd {
    #[argh(positional)]
    /// directory to switch to; absolute or relative to the current directory.
    pub dir: Option<String>,
}

impl BuiltinCommand for Cd {
    const NAME: &'static str = "cd";

    fn execute(self, _stdout: &mut dyn Write, state: &mut ShellState) -> ShellResult<()> {
        let dir = self
            .dir
            .ok_or(ShellError::MissingArgument { command: Self::NAME })?;
        let new_dir = state.change_dir(&dir)?;
        tracing::debug!(dir = %new_dir.display(), "changed directory");
        Ok(())
    }
}

#[derive(FromArgs)]
/// Print the current working directory to standard output.
pub struct Pwd {}

impl BuiltinCommand for Pwd {
    const NAME: &'static str = "pwd";

    fn execute(self, stdout: &mut dyn Write, state: &mut ShellState) -> ShellResult<()> {
        let dir = state.query_dir()?;
        write_line(Self::NAME, stdout, &dir.to_string_lossy())
    }
}

/// Write the arguments to standard output, separated by spaces and followed
/// by a newline.
///
/// Arguments are never interpreted as options, so echo cannot fail on bad
/// input; that is why it implements [`FromArgs`] by hand.
pub struct Echo {
    pub args: Vec<String>,
}

impl FromArgs for Echo {
    fn from_args(_command_name: &[&str], args: &[&str]) -> Result<Self, EarlyExit> {
        Ok(Echo {
            args: args.iter().map(|s| s.to_string()).collect(),
        })
    }
}

impl BuiltinCommand for Echo {
    const NAME: &'static str = "echo";

    fn execute(self, stdout: &mut dyn Write, _state: &mut ShellState) -> ShellResult<()> {
        write_line(Self::NAME, stdout, &self.args.join(" "))
    }
}

/// Forcefully terminate a process (SIGKILL).
///
/// A negative PID names a process group, so a lone integer argument is taken
/// as is instead of going through [`argh`], which would read it as a flag.
pub struct Kill {
    pub pid: Option<String>,
}

#[derive(FromArgs)]
/// Forcefully terminate a process (SIGKILL).
struct KillArgs {
    #[argh(positional)]
    /// id of the process to kill; negative ids name a process group.
    pid: Option<String>,
}

impl FromArgs for Kill {
    fn from_args(command_name: &[&str], args: &[&str]) -> Result<Self, EarlyExit> {
        if let [pid] = args {
            if pid.parse::<i32>().is_ok() {
                return Ok(Kill {
                    pid: Some(pid.to_string()),
                });
            }
        }
        KillArgs::from_args(command_name, args).map(|parsed| Kill { pid: parsed.pid })
    }
}

impl BuiltinCommand for Kill {
    const NAME: &'static str = "kill";

    fn execute(self, _stdout: &mut dyn Write, _state: &mut ShellState) -> ShellResult<()> {
        let raw = self
            .pid
            .ok_or(ShellError::MissingArgument { command: Self::NAME })?;
        let pid: i32 = raw.parse().map_err(|_| ShellError::InvalidArgument {
            command: Self::NAME,
            detail: format!("invalid PID: {raw}"),
        })?;

        signal::kill(Pid::from_raw(pid), Signal::SIGKILL)
            .map_err(|errno| ShellError::process(format!("kill {pid}"), errno))?;
        tracing::debug!(pid, "sent SIGKILL");
        Ok(())
    }
}

#[derive(FromArgs)]
/// List processes using the system `ps`.
pub struct Ps {}

impl BuiltinCommand for Ps {
    const NAME: &'static str = "ps";

    fn execute(self, stdout: &mut dyn Write, state: &mut ShellState) -> ShellResult<()> {
        let mut child = Command::new(Self::NAME)
            .current_dir(state.current_dir())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| ShellError::process(Self::NAME, e))?;

        let copied = match child.stdout.take() {
            Some(mut listing) => io::copy(&mut listing, stdout).map(drop),
            None => Ok(()),
        };
        let status = child.wait().map_err(|e| ShellError::process(Self::NAME, e))?;
        copied.map_err(|e| ShellError::process(Self::NAME, e))?;

        if status.success() {
            Ok(())
        } else {
            Err(ShellError::process(
                Self::NAME,
                io::Error::other(format!("listing failed: {status}")),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::process::ExitStatusExt;

    fn argv(s: &str) -> Vec<String> {
        s.split_whitespace().map(String::from).collect()
    }

    fn run_line(line: &str, state: &mut ShellState) -> (ShellResult<bool>, String) {
        let mut out = Vec::new();
        let res = dispatch(&argv(line), &mut out, state);
        (res, String::from_utf8(out).unwrap())
    }

    fn scratch_state() -> (tempfile::TempDir, ShellState) {
        let dir = tempfile::tempdir().unwrap();
        let state = ShellState::new(fs::canonicalize(dir.path()).unwrap());
        (dir, state)
    }

    #[test]
    fn every_builtin_resolves_by_name() {
        for builtin in Builtin::ALL {
            assert_eq!(Builtin::from_name(builtin.name()), Some(builtin));
        }
        assert_eq!(Builtin::from_name("ls"), None);
        assert_eq!(Builtin::from_name("CD"), None);
    }

    #[test]
    fn external_names_are_not_handled() {
        let (_dir, mut state) = scratch_state();
        let (res, out) = run_line("ls -l", &mut state);
        assert!(!res.unwrap());
        assert!(out.is_empty());
    }

    #[test]
    fn echo_joins_arguments_with_single_spaces() {
        let (_dir, mut state) = scratch_state();
        let (res, out) = run_line("echo a b c", &mut state);
        assert!(res.unwrap());
        assert_eq!(out, "a b c\n");
    }

    #[test]
    fn echo_without_arguments_prints_newline() {
        let (_dir, mut state) = scratch_state();
        let (_, out) = run_line("echo", &mut state);
        assert_eq!(out, "\n");
    }

    #[test]
    fn echo_treats_flags_as_text() {
        let (_dir, mut state) = scratch_state();
        let (res, out) = run_line("echo -n --help x", &mut state);
        assert!(res.unwrap());
        assert_eq!(out, "-n --help x\n");
    }

    #[test]
    fn pwd_after_cd_reports_new_directory() {
        let (dir, mut state) = scratch_state();
        fs::create_dir(dir.path().join("sub")).unwrap();
        let expected = fs::canonicalize(dir.path().join("sub")).unwrap();

        let (res, _) = run_line(&format!("cd {}", expected.display()), &mut state);
        assert!(res.unwrap());
        let (_, out) = run_line("pwd", &mut state);
        assert_eq!(out, format!("{}\n", expected.display()));
    }

    #[test]
    fn pwd_fails_when_directory_vanished() {
        let (dir, _) = scratch_state();
        let gone = dir.path().join("gone");
        fs::create_dir(&gone).unwrap();
        let mut state = ShellState::new(&gone);
        fs::remove_dir(&gone).unwrap();

        let (res, out) = run_line("pwd", &mut state);
        assert!(matches!(res, Err(ShellError::Directory { .. })));
        assert!(out.is_empty());
    }

    #[test]
    fn cd_without_argument_is_missing_argument() {
        let (_dir, mut state) = scratch_state();
        let before = state.clone();
        let (res, _) = run_line("cd", &mut state);
        assert!(matches!(res, Err(ShellError::MissingArgument { command: "cd" })));
        assert_eq!(state, before);
    }

    #[test]
    fn cd_to_missing_directory_is_directory_error() {
        let (_dir, mut state) = scratch_state();
        let (res, _) = run_line("cd no_such_dir", &mut state);
        assert!(matches!(res, Err(ShellError::Directory { .. })));
    }

    #[test]
    fn cd_help_prints_usage() {
        let (_dir, mut state) = scratch_state();
        let (res, out) = run_line("cd --help", &mut state);
        assert!(res.unwrap());
        assert!(out.contains("Usage: cd"), "unexpected help: {out:?}");
    }

    #[test]
    fn pwd_rejects_extra_arguments() {
        let (_dir, mut state) = scratch_state();
        let (res, _) = run_line("pwd extra", &mut state);
        assert!(matches!(res, Err(ShellError::InvalidArgument { command: "pwd", .. })));
    }

    #[test]
    fn kill_without_pid_is_missing_argument() {
        let (_dir, mut state) = scratch_state();
        let (res, _) = run_line("kill", &mut state);
        assert!(matches!(res, Err(ShellError::MissingArgument { command: "kill" })));
    }

    #[test]
    fn kill_with_non_numeric_pid_is_invalid_argument() {
        let (_dir, mut state) = scratch_state();
        let (res, _) = run_line("kill abc", &mut state);
        assert!(matches!(res, Err(ShellError::InvalidArgument { command: "kill", .. })));
    }

    #[test]
    fn kill_of_unknown_process_is_process_error() {
        let (_dir, mut state) = scratch_state();
        // Beyond the default pid_max, so no process can have it.
        let (res, _) = run_line("kill 2147483646", &mut state);
        assert!(matches!(res, Err(ShellError::Process { .. })));
    }

    #[test]
    fn kill_accepts_negative_pid_as_process_group() {
        let (_dir, mut state) = scratch_state();
        // No process group has this id, so the signal itself fails.
        let (res, _) = run_line("kill -99999999", &mut state);
        match res {
            Err(ShellError::Process { command, .. }) => assert_eq!(command, "kill -99999999"),
            other => panic!("expected process error, got {other:?}"),
        }
    }

    #[test]
    fn kill_help_and_bad_flags_still_parse_as_options() {
        let (_dir, mut state) = scratch_state();
        let (res, out) = run_line("kill --help", &mut state);
        assert!(res.unwrap());
        assert!(out.contains("Usage: kill"), "unexpected help: {out:?}");

        let (res, _) = run_line("kill -x", &mut state);
        assert!(matches!(res, Err(ShellError::InvalidArgument { command: "kill", .. })));
    }

    #[test]
    fn kill_terminates_sleeping_process_by_signal() {
        let (_dir, mut state) = scratch_state();
        let mut child = Command::new("sleep").arg("10").spawn().unwrap();

        let (res, _) = run_line(&format!("kill {}", child.id()), &mut state);
        assert!(res.unwrap());

        let status = child.wait().unwrap();
        assert!(!status.success());
        assert_eq!(status.signal(), Some(Signal::SIGKILL as i32));
    }

    #[test]
    fn ps_lists_processes_with_pid_header() {
        let (_dir, mut state) = scratch_state();
        let (res, out) = run_line("ps", &mut state);
        assert!(res.unwrap());
        assert!(out.contains("PID"), "unexpected ps output: {out:?}");
    }
}
