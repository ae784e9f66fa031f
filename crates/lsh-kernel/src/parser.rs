//! Pipeline parsing and pre-launch validation.
//!
//! A line is a sequence of stages separated by `|`. Malformed lines are
//! rejected here, before any pipe or process exists.

use std::fmt;

use thiserror::Error;

use crate::lexer::{split_words, Words};

/// The stage separator.
pub const SEPARATOR: char = '|';

/// Why a line is not a runnable pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SyntaxError {
    /// Nothing but whitespace.
    #[error("empty command line")]
    EmptyLine,
    /// `|cmd`
    #[error("should not have | as the first character")]
    LeadingSeparator,
    /// `cmd|`
    #[error("should not have | as the last character")]
    TrailingSeparator,
    /// `a||b` or `a | | b`
    #[error("should not have two consecutive | without in-between command")]
    EmptyStage,
}

/// One command within a pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stage {
    command: String,
    words: Words,
}

impl Stage {
    /// Build a stage from its (already trimmed) command string.
    ///
    /// Returns `None` for a blank command.
    pub fn new(command: impl Into<String>) -> Option<Self> {
        let command = command.into();
        let words = split_words(&command)?;
        Some(Self { command, words })
    }

    /// The stage's command string as it appeared on the line.
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Program and arguments.
    pub fn words(&self) -> &Words {
        &self.words
    }

    /// The program name.
    pub fn program(&self) -> &str {
        &self.words.program
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.command)
    }
}

/// An ordered, non-empty sequence of stages connected output-to-input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    /// Parse and validate a command line.
    ///
    /// Checks run in a fixed order so each malformation gets its own
    /// diagnostic: leading separator, trailing separator, empty stage.
    pub fn parse(line: &str) -> Result<Self, SyntaxError> {
        let line = line.trim();
        if line.is_empty() {
            return Err(SyntaxError::EmptyLine);
        }
        if line.starts_with(SEPARATOR) {
            return Err(SyntaxError::LeadingSeparator);
        }
        if line.ends_with(SEPARATOR) {
            return Err(SyntaxError::TrailingSeparator);
        }

        let stages = line
            .split(SEPARATOR)
            .map(|segment| Stage::new(segment.trim()).ok_or(SyntaxError::EmptyStage))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { stages })
    }

    /// The stages in order.
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Number of stages (always at least one).
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Number of pipes needed to connect the stages.
    pub fn boundaries(&self) -> usize {
        self.stages.len() - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_stage() {
        let p = Pipeline::parse("ls -la").unwrap();
        assert_eq!(p.len(), 1);
        assert_eq!(p.boundaries(), 0);
        assert_eq!(p.stages()[0].program(), "ls");
    }

    #[test]
    fn three_stages_keep_order() {
        let p = Pipeline::parse("cat /etc/passwd | grep root |wc -l").unwrap();
        let programs: Vec<_> = p.stages().iter().map(Stage::program).collect();
        assert_eq!(programs, vec!["cat", "grep", "wc"]);
        assert_eq!(p.stages()[1].command(), "grep root");
        assert_eq!(p.boundaries(), 2);
    }

    #[test]
    fn surrounding_whitespace_is_ignored() {
        let p = Pipeline::parse("   echo hi |  tr a-z A-Z   ").unwrap();
        assert_eq!(p.len(), 2);
        assert_eq!(p.stages()[1].words().args, vec!["a-z", "A-Z"]);
    }

    #[test]
    fn leading_checked_before_trailing() {
        assert_eq!(Pipeline::parse("| ls |"), Err(SyntaxError::LeadingSeparator));
    }

    #[test]
    fn lone_separator_is_leading() {
        assert_eq!(Pipeline::parse("|"), Err(SyntaxError::LeadingSeparator));
    }

    #[test]
    fn stage_display_is_command() {
        let stage = Stage::new("sort -r").unwrap();
        assert_eq!(stage.to_string(), "sort -r");
    }
}
