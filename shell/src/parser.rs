//! Splitting an input line into pipeline stages.
//!
//! The grammar is deliberately tiny: stages are separated by `|` and words
//! by whitespace. There is no quoting or escaping, so a `|` can never be
//! part of an argument.

use crate::command::{Pipeline, Stage};

/// Pipe operator separating stages.
pub const PIPE_OP: char = '|';

/// Parse one input line into a [`Pipeline`].
///
/// Stages that contain no words (e.g. the gaps in `ls || wc` or a trailing
/// `|`) are dropped silently. A blank line yields an empty pipeline.
pub fn parse_pipeline(line: &str) -> Pipeline {
    let stages = line
        .split(PIPE_OP)
        .map(str::trim)
        .filter_map(parse_stage)
        .collect();
    Pipeline::new(stages)
}

fn parse_stage(text: &str) -> Option<Stage> {
    Stage::new(text.split_whitespace().map(String::from).collect())
}
