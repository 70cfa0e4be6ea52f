use crate::error::{ShellError, ShellResult};
use std::env as stdenv;
use std::fs;
use std::path::{Path, PathBuf};

/// Long-lived state of one shell session.
///
/// The working directory lives here rather than in the OS process so that
/// `cd` never touches process-global state. Every external process receives
/// a copy of it when it is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellState {
    current_dir: PathBuf,
}

impl ShellState {
    /// Start a session in the given directory.
    pub fn new(current_dir: impl Into<PathBuf>) -> Self {
        Self {
            current_dir: current_dir.into(),
        }
    }

    /// Capture the working directory of the running process.
    pub fn from_process() -> ShellResult<Self> {
        let current_dir = stdenv::current_dir().map_err(|e| ShellError::directory(".", e))?;
        Ok(Self::new(current_dir))
    }

    pub fn current_dir(&self) -> &Path {
        &self.current_dir
    }

    /// Ask the OS whether the working directory is still there.
    ///
    /// Returns the directory on success so `pwd` can print it.
    pub fn query_dir(&self) -> ShellResult<&Path> {
        let meta = fs::metadata(&self.current_dir)
            .map_err(|e| ShellError::directory(&self.current_dir, e))?;
        if !meta.is_dir() {
            return Err(ShellError::directory(
                &self.current_dir,
                std::io::Error::from(std::io::ErrorKind::NotADirectory),
            ));
        }
        Ok(&self.current_dir)
    }

    /// Change the working directory.
    ///
    /// Relative targets are resolved against the current directory; the
    /// result is canonicalized. The state is left untouched on failure.
    pub fn change_dir(&mut self, target: impl AsRef<Path>) -> ShellResult<&Path> {
        let target = target.as_ref();
        let joined = if target.is_absolute() {
            target.to_path_buf()
        } else {
            self.current_dir.join(target)
        };

        let canonical = fs::canonicalize(&joined).map_err(|e| ShellError::directory(&joined, e))?;
        if !canonical.is_dir() {
            return Err(ShellError::directory(
                joined,
                std::io::Error::from(std::io::ErrorKind::NotADirectory),
            ));
        }
        self.current_dir = canonical;
        Ok(&self.current_dir)
    }
}
