use crate::command::Stdout;
use std::fs::File;
use std::io::{self, Result as IoResult};
use std::process::Stdio;

/// The shell's own standard output; children inherit the descriptor.
impl Stdout for io::Stdout {
    fn stdio(&self) -> IoResult<Stdio> {
        Ok(Stdio::inherit())
    }
}

impl Stdout for io::Stderr {
    fn stdio(&self) -> IoResult<Stdio> {
        Ok(Stdio::inherit())
    }
}

/// File-backed sink, used to capture pipeline output.
///
/// Each child gets its own duplicate of the descriptor so the file stays
/// usable after the child's handle is closed.
impl Stdout for File {
    fn stdio(&self) -> IoResult<Stdio> {
        Ok(self.try_clone()?.into())
    }
}

/// In-memory sink for builtins.
///
/// A child process cannot write into it, so external stages fail to start.
impl Stdout for Vec<u8> {
    fn stdio(&self) -> IoResult<Stdio> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "output buffer cannot be shared with a child process",
        ))
    }
}
