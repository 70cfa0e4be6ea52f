use std::io::{self, Write};
use std::process::Stdio;

/// Conventional process exit code type used by this crate.
///
/// A value of 0 indicates success; any non-zero value indicates failure.
/// Processes killed by a signal map to `128 + signal`, as POSIX shells do.
pub type ExitCode = i32;

/// One command of a pipeline: the program name followed by its arguments.
///
/// A stage is never empty; the parser drops empty ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stage {
    argv: Vec<String>,
}

impl Stage {
    /// Build a stage from an argument vector, or `None` if it is empty.
    pub fn new(argv: Vec<String>) -> Option<Self> {
        if argv.is_empty() {
            None
        } else {
            Some(Self { argv })
        }
    }

    pub fn name(&self) -> &str {
        &self.argv[0]
    }

    pub fn args(&self) -> &[String] {
        &self.argv[1..]
    }

    pub fn argv(&self) -> &[String] {
        &self.argv
    }
}

/// The ordered stages of one input line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    pub fn new(stages: Vec<Stage>) -> Self {
        Self { stages }
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// An empty pipeline is executed as a no-op.
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

/// Output sink of the shell.
///
/// Builtins write into it directly; the last external stage of a pipeline
/// receives it as its standard output through [`Stdout::stdio`]. The sink
/// is reused across pipelines, so `stdio` hands out a fresh handle each time.
pub trait Stdout: Write {
    /// Produce a handle to this stream suitable for `std::process::Command`.
    fn stdio(&self) -> io::Result<Stdio>;
}
