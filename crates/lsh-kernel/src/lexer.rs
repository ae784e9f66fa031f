//! Word splitting for a single pipeline stage.
//!
//! The shell has no quoting, escaping or expansion: a stage is a program name
//! followed by arguments, separated by runs of whitespace.

/// A stage's command string split into program and arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Words {
    /// The program to execute (looked up in `PATH` at exec time).
    pub program: String,
    /// Arguments after the program name.
    pub args: Vec<String>,
}

impl Words {
    /// The full argument vector as exec sees it: program first.
    pub fn argv(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.program.as_str()).chain(self.args.iter().map(String::as_str))
    }
}

/// Split a command string into program and arguments.
///
/// Leading, trailing and repeated whitespace is collapsed. Returns `None`
/// when the command contains no words at all.
pub fn split_words(command: &str) -> Option<Words> {
    let mut words = command.split_whitespace().map(str::to_string);
    let program = words.next()?;
    Some(Words {
        program,
        args: words.collect(),
    })
}
