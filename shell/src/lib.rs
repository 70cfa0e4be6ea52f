//! A minimal interactive shell built around a pipeline executor.
//!
//! A line is split on `|` into stages ([`parser`]). Stages naming one of the
//! builtins `cd`, `pwd`, `echo`, `kill` or `ps` run in-process ([`builtin`]);
//! everything else becomes an OS process ([`external`]). Adjacent external
//! stages are joined by an OS pipe fed from a copy thread ([`link`]), and
//! [`pipeline`] decides in which order stages are started and awaited.
//! [`shutdown`] turns SIGINT into a hard stop of the whole process.
//!
//! The main entry point is [`Interpreter`], which owns the read-eval loop.

pub mod builtin;
pub mod command;
pub mod error;
pub mod external;
mod interpreter;
mod io_adapters;
pub mod link;
pub mod parser;
pub mod pipeline;
pub mod shutdown;
pub mod state;

pub use error::{ShellError, ShellResult};
pub use interpreter::{DEFAULT_PROMPT, Ended, Flow, Interpreter};
pub use state::ShellState;
