//! Leveled, coloured stderr output passed explicitly to each component.

use colored::*;
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Error,
    Warning,
    Info,
    Debug,
}

impl Level {
    /// Map the `--verbose` / `--debug` flags onto a level. `--debug` wins.
    pub fn from_flags(verbose: bool, debug: bool) -> Self {
        if debug {
            Level::Debug
        } else if verbose {
            Level::Info
        } else {
            Level::Warning
        }
    }
}

pub struct Logger {
    level: Level,
    captured: Option<Mutex<Vec<String>>>,
}

impl Logger {
    pub fn new(level: Level) -> Self {
        Self {
            level,
            captured: None,
        }
    }

    /// A logger that records plain (uncoloured) lines instead of printing.
    pub fn capturing(level: Level) -> Self {
        Self {
            level,
            captured: Some(Mutex::new(Vec::new())),
        }
    }

    pub fn enabled(&self, level: Level) -> bool {
        level <= self.level
    }

    pub fn error(&self, message: &str) {
        self.emit(Level::Error, "[ERROR]", message);
    }

    pub fn warning(&self, message: &str) {
        self.emit(Level::Warning, "[WARNING]", message);
    }

    pub fn info(&self, message: &str) {
        self.emit(Level::Info, "[INFO]", message);
    }

    pub fn success(&self, message: &str) {
        self.emit(Level::Info, "[SUCCESS]", message);
    }

    pub fn debug(&self, message: &str) {
        self.emit(Level::Debug, "[DEBUG]", message);
    }

    /// Lines recorded by a capturing logger.
    pub fn lines(&self) -> Vec<String> {
        match &self.captured {
            Some(lines) => lines.lock().map(|l| l.clone()).unwrap_or_default(),
            None => Vec::new(),
        }
    }

    fn emit(&self, level: Level, tag: &str, message: &str) {
        if !self.enabled(level) {
            return;
        }

        if let Some(lines) = &self.captured {
            if let Ok(mut lines) = lines.lock() {
                lines.push(format!("{} {}", tag, message));
            }
            return;
        }

        let tag = match level {
            Level::Error => tag.red().bold(),
            Level::Warning => tag.yellow().bold(),
            Level::Info if tag == "[SUCCESS]" => tag.green().bold(),
            Level::Info => tag.blue().bold(),
            Level::Debug => tag.cyan().bold(),
        };
        eprintln!("{} {}", tag, message);
    }
}
