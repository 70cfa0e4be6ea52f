use crate::command::Stdout;
use crate::error::ShellResult;
use crate::parser;
use crate::pipeline::{PipelineExecutor, Report};
use crate::shutdown::ShutdownHandle;
use crate::state::ShellState;
use anyhow::Context;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::io::Write;
use std::path::PathBuf;

/// Prompt shown before every line.
pub const DEFAULT_PROMPT: &str = "shell> ";

/// Lines that end the read-eval loop instead of being executed.
const EXIT_WORDS: [&str; 2] = ["exit", "quit"];

/// What the loop should do after a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// Why the read-eval loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ended {
    /// `exit`, `quit` or end of input.
    Normally,
    /// Ctrl-C at the prompt; a shutdown was requested.
    Interrupted,
}

/// The interactive shell: reads lines and hands them to the executor.
///
/// Example
/// ```
/// use pipesh::{Flow, Interpreter, ShellState};
/// let mut sh = Interpreter::new(ShellState::new("/"));
/// let mut out: Vec<u8> = Vec::new();
/// assert_eq!(sh.eval_into("echo hello world", &mut out), Flow::Continue);
/// assert_eq!(out, b"hello world\n");
/// assert_eq!(sh.eval_into("exit", &mut out), Flow::Exit);
/// ```
pub struct Interpreter {
    executor: PipelineExecutor,
    prompt: String,
    history: Option<PathBuf>,
    shutdown: Option<ShutdownHandle>,
}

impl Interpreter {
    pub fn new(state: ShellState) -> Self {
        Self {
            executor: PipelineExecutor::new(state),
            prompt: DEFAULT_PROMPT.to_string(),
            history: None,
            shutdown: None,
        }
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    /// Load history from `path` on start and save it there on exit.
    pub fn with_history(mut self, path: impl Into<PathBuf>) -> Self {
        self.history = Some(path.into());
        self
    }

    /// Where Ctrl-C at the prompt is reported.
    pub fn with_shutdown(mut self, handle: ShutdownHandle) -> Self {
        self.shutdown = Some(handle);
        self
    }

    pub fn state(&self) -> &ShellState {
        self.executor.state()
    }

    /// Run one line and return the executor's verdict.
    ///
    /// `Ok(None)` means the line asked the loop to end.
    pub fn execute_line(
        &mut self,
        line: &str,
        stdout: &mut dyn Stdout,
    ) -> ShellResult<Option<Report>> {
        if EXIT_WORDS.contains(&line.trim()) {
            return Ok(None);
        }
        let pipeline = parser::parse_pipeline(line);
        if pipeline.is_empty() {
            return Ok(Some(Report::default()));
        }
        self.executor.execute(&pipeline, stdout).map(Some)
    }

    /// Run one line, printing any failure to standard error.
    pub fn eval(&mut self, line: &str) -> Flow {
        self.eval_into(line, &mut std::io::stdout())
    }

    /// Like [`eval`](Self::eval) but with an explicit output sink.
    pub fn eval_into(&mut self, line: &str, stdout: &mut dyn Stdout) -> Flow {
        match self.execute_line(line, stdout) {
            Ok(None) => Flow::Exit,
            Ok(Some(report)) => {
                for failure in &report.failures {
                    eprintln!("{failure}");
                }
                Flow::Continue
            }
            Err(e) => {
                eprintln!("{e}");
                Flow::Continue
            }
        }
    }

    /// Read-Eval-Print Loop on the terminal.
    pub fn repl(&mut self) -> anyhow::Result<Ended> {
        let mut rl = DefaultEditor::new().context("failed to initialize line editor")?;
        if let Some(path) = &self.history {
            if let Err(e) = rl.load_history(path) {
                tracing::warn!("Failed to load history from {}: {e}", path.display());
            }
        }

        let ended = loop {
            match rl.readline(&self.prompt) {
                Ok(line) => {
                    if !line.trim().is_empty() {
                        if let Err(e) = rl.add_history_entry(line.as_str()) {
                            tracing::warn!("Failed to add history entry: {e}");
                        }
                    }
                    if self.eval(&line) == Flow::Exit {
                        break Ended::Normally;
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    if let Some(shutdown) = &self.shutdown {
                        shutdown.request();
                    }
                    break Ended::Interrupted;
                }
                Err(ReadlineError::Eof) => break Ended::Normally,
                Err(err) => {
                    return Err(err).context("failed to read line");
                }
            }
        };

        if let Some(path) = &self.history {
            if let Err(e) = rl.save_history(path) {
                tracing::warn!("Failed to save history to {}: {e}", path.display());
            }
        }
        std::io::stdout().flush().context("failed to flush stdout")?;
        Ok(ended)
    }
}
