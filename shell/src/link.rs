use crate::error::{ShellError, ShellResult};
use crate::external::ExternalProcess;
use std::io::{self, ErrorKind};
use std::thread::{self, JoinHandle};

/// Byte transport between two adjacent external stages.
///
/// Owns the copy thread that drains the upstream stdout into the pipe
/// feeding the downstream stdin. The write end of the pipe lives only inside
/// that thread, so the downstream sees end-of-input exactly when the copy
/// finishes.
pub struct StageLink {
    upstream: String,
    downstream: String,
    copier: JoinHandle<io::Result<u64>>,
}

/// Connect a started `upstream` to a not-yet-started `downstream`.
///
/// The upstream must have been created with captured stdout.
pub fn link(
    upstream: &mut ExternalProcess,
    downstream: &mut ExternalProcess,
) -> ShellResult<StageLink> {
    let names = (upstream.name().to_string(), downstream.name().to_string());
    let pipe_error = |source: io::Error| ShellError::Pipe {
        upstream: names.0.clone(),
        downstream: names.1.clone(),
        source,
    };

    let mut source = upstream
        .take_stdout()
        .ok_or_else(|| pipe_error(io::Error::other("upstream stdout is not captured")))?;
    let (reader, mut writer) = io::pipe().map_err(pipe_error)?;

    let copier = thread::Builder::new()
        .name(format!("link-{}-{}", names.0, names.1))
        .spawn(move || {
            let copied = match io::copy(&mut source, &mut writer) {
                // The consumer stopped reading; that's how `head` and
                // friends end a pipeline.
                Err(e) if e.kind() == ErrorKind::BrokenPipe => Ok(0),
                other => other,
            };
            drop(writer);
            copied
        })
        .map_err(pipe_error)?;

    downstream.set_stdin(reader);
    tracing::debug!(upstream = %names.0, downstream = %names.1, "linked stages");

    let (upstream, downstream) = names;
    Ok(StageLink {
        upstream,
        downstream,
        copier,
    })
}

impl StageLink {
    /// Wait for the copy thread and report what it moved.
    pub fn join(self) -> ShellResult<u64> {
        let pipe_error = |source: io::Error| ShellError::Pipe {
            upstream: self.upstream.clone(),
            downstream: self.downstream.clone(),
            source,
        };
        match self.copier.join() {
            Ok(result) => result.map_err(pipe_error),
            Err(_) => Err(pipe_error(io::Error::other("copy thread panicked"))),
        }
    }
}
