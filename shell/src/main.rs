use anyhow::{Context, Result};
use argh::FromArgs;
use pipesh::shutdown::{self, ShutdownController};
use pipesh::{DEFAULT_PROMPT, Ended, Interpreter, ShellState};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(FromArgs)]
/// A minimal shell: pipelines of external commands plus cd, pwd, echo,
/// kill and ps.
struct Args {
    #[argh(option, short = 'c')]
    /// run a single line and exit.
    command: Option<String>,

    #[argh(option, default = "DEFAULT_PROMPT.to_string()")]
    /// prompt shown before each line.
    prompt: String,

    #[argh(option)]
    /// file to load history from and save it to.
    history: Option<PathBuf>,

    #[argh(switch, short = 'v')]
    /// log debug events to standard error.
    verbose: bool,
}

fn main() -> ExitCode {
    let args: Args = argh::from_env();
    init_tracing(args.verbose);

    match run(args) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:?}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    };
    let filter = EnvFilter::builder()
        .with_default_directive(default.into())
        .from_env_lossy();
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn run(args: Args) -> Result<ExitCode> {
    let controller = ShutdownController::install(shutdown::exit_process())
        .context("failed to install interrupt handler")?;
    let state = ShellState::from_process().context("failed to read working directory")?;

    let mut interp = Interpreter::new(state)
        .with_prompt(args.prompt)
        .with_shutdown(controller.handle());
    if let Some(path) = args.history {
        interp = interp.with_history(path);
    }

    if let Some(line) = args.command {
        let mut stdout = std::io::stdout();
        return Ok(match interp.execute_line(&line, &mut stdout) {
            Ok(Some(report)) if report.success() => ExitCode::SUCCESS,
            Ok(Some(report)) => {
                for failure in &report.failures {
                    eprintln!("{failure}");
                }
                ExitCode::FAILURE
            }
            Ok(None) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("{e}");
                ExitCode::FAILURE
            }
        });
    }

    match interp.repl()? {
        Ended::Normally => Ok(ExitCode::SUCCESS),
        Ended::Interrupted => {
            controller.join();
            Ok(ExitCode::SUCCESS)
        }
    }
}
