use crate::builtin::Builtin;
use crate::command::{ExitCode, Pipeline, Stdout};
use crate::error::{ShellError, ShellResult};
use crate::external::{self, ExternalProcess, Output};
use crate::link::{self, StageLink};
use crate::state::ShellState;

/// Outcome of a pipeline that ran to the end.
#[derive(Debug, Default)]
pub struct Report {
    /// Exit code of the last stage.
    pub status: ExitCode,
    /// Stage and link failures observed while waiting, in stage order.
    pub failures: Vec<ShellError>,
}

impl Report {
    pub fn success(&self) -> bool {
        self.status == 0 && self.failures.is_empty()
    }
}

/// Runs parsed pipelines against one [`ShellState`].
pub struct PipelineExecutor {
    state: ShellState,
}

impl PipelineExecutor {
    pub fn new(state: ShellState) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &ShellState {
        &self.state
    }

    /// Execute every stage of `pipeline`, writing final output to `stdout`.
    ///
    /// Every external stage is started, left to right, before any of them is
    /// waited for, so each copy thread keeps draining while its stages run.
    /// Waits then happen in stage order. The first builtin met at any
    /// position runs and ends the pipeline: later stages, and any output of
    /// earlier ones, are discarded.
    ///
    /// Returns `Err` when the pipeline had to be aborted (a builtin failed,
    /// a stage could not start, or a pipe could not be created). Stages
    /// already started are then abandoned. Failures of stages that ran are
    /// collected in the [`Report`].
    #[tracing::instrument(level = "debug", skip_all, fields(stages = pipeline.len()))]
    pub fn execute(&mut self, pipeline: &Pipeline, stdout: &mut dyn Stdout) -> ShellResult<Report> {
        let stages = pipeline.stages();
        let mut started: Vec<ExternalProcess> = Vec::with_capacity(stages.len());
        let mut links: Vec<StageLink> = Vec::new();

        for (index, stage) in stages.iter().enumerate() {
            if let Some(builtin) = Builtin::from_name(stage.name()) {
                abandon_all(started);
                tracing::debug!(builtin = builtin.name(), index, "builtin ends pipeline");
                builtin.execute(stage.args(), stdout, &mut self.state)?;
                return Ok(Report::default());
            }

            let output = if index + 1 == stages.len() {
                match stdout.stdio() {
                    Ok(sink) => Output::Sink(sink),
                    Err(e) => {
                        abandon_all(started);
                        return Err(ShellError::process(stage.name(), e));
                    }
                }
            } else {
                Output::Piped
            };
            let mut current = ExternalProcess::new(stage, &self.state, output);

            if let Some(upstream) = started.last_mut() {
                match link::link(upstream, &mut current) {
                    Ok(link) => links.push(link),
                    Err(e) => {
                        abandon_all(started);
                        return Err(e);
                    }
                }
            }

            if let Err(e) = current.start() {
                tracing::warn!(command = stage.name(), "failed to start: {e}");
                abandon_all(started);
                return Err(e);
            }
            started.push(current);
        }

        let mut status = 0;
        let mut failures = Vec::new();
        let count = started.len();
        for (index, mut process) in started.into_iter().enumerate() {
            let is_last = index + 1 == count;
            match process.wait() {
                Ok(code) if is_last => status = code,
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!("{e}");
                    if let ShellError::Wait { status: exit, .. } = &e {
                        if is_last {
                            status = external::exit_code(*exit);
                        }
                    }
                    failures.push(e);
                }
            }
        }

        for link in links {
            match link.join() {
                Ok(bytes) => tracing::trace!(bytes, "link drained"),
                Err(e) => {
                    tracing::warn!("{e}");
                    failures.push(e);
                }
            }
        }

        Ok(Report { status, failures })
    }
}

fn abandon_all(started: Vec<ExternalProcess>) {
    started.into_iter().for_each(ExternalProcess::abandon);
}
