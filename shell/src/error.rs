use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;
use thiserror::Error;

/// Result alias used across the shell library.
pub type ShellResult<T> = Result<T, ShellError>;

/// Everything that can go wrong while running one input line.
///
/// None of these end the read-eval loop: they are printed and the shell
/// reads the next line.
#[derive(Debug, Error)]
pub enum ShellError {
    /// A builtin was invoked without its required argument.
    #[error("{command}: missing argument")]
    MissingArgument { command: &'static str },

    /// An argument was present but malformed.
    #[error("{command}: {detail}")]
    InvalidArgument {
        command: &'static str,
        detail: String,
    },

    /// The OS rejected a working-directory change or query.
    #[error("{}: {source}", .path.display())]
    Directory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Spawning, signalling or listing processes failed.
    #[error("{command}: {source}")]
    Process {
        command: String,
        #[source]
        source: io::Error,
    },

    /// The byte channel between two stages could not be set up or broke.
    #[error("pipe {upstream} -> {downstream}: {source}")]
    Pipe {
        upstream: String,
        downstream: String,
        #[source]
        source: io::Error,
    },

    /// A started process ended abnormally.
    #[error("{command}: {status}")]
    Wait { command: String, status: ExitStatus },
}

impl ShellError {
    pub(crate) fn process(command: impl Into<String>, source: impl Into<io::Error>) -> Self {
        ShellError::Process {
            command: command.into(),
            source: source.into(),
        }
    }

    pub(crate) fn directory(path: impl Into<PathBuf>, source: io::Error) -> Self {
        ShellError::Directory {
            path: path.into(),
            source,
        }
    }
}
