use std::fmt::Display;

/// Stderr reporter honouring `--verbose` and `--quiet`.
#[derive(Clone, Copy, Debug)]
pub struct Logger {
    verbose: u8,
    quiet: bool,
}

impl Logger {
    pub fn new(verbose: u8, quiet: bool) -> Self {
        Self {
            verbose: if quiet { 0 } else { verbose },
            quiet,
        }
    }

    pub fn info(&self, message: impl Display) {
        if !self.quiet {
            eprintln!("{message}");
        }
    }

    pub fn warn(&self, message: impl Display) {
        if !self.quiet {
            eprintln!("Warning: {message}");
        }
    }

    pub fn verbose(&self, level: u8, message: impl Display) {
        if self.enabled(level) {
            eprintln!("{message}");
        }
    }

    /// Whether messages at `level` would be printed.
    pub fn enabled(&self, level: u8) -> bool {
        !self.quiet && self.verbose >= level
    }

    pub fn quiet(&self) -> bool {
        self.quiet
    }

    pub fn level(&self) -> u8 {
        self.verbose
    }
}

/// `"file"` or `"files"` depending on `count`.
pub fn files(count: usize) -> &'static str {
    if count == 1 { "file" } else { "files" }
}
