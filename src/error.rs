//! Centralised error hierarchy for **lhox**.
//!
//! Every stage (scanner, parser, resolver, interpreter, code generator) turns
//! its failure modes into one of the variants defined here, so the whole
//! crate can share a single `Result<T>` alias and interoperate with `anyhow`
//! at the binary boundary.
//!
//! Scanning and parsing accumulate errors; the pipeline reports a whole pass
//! at once through [`LhoxError::Batch`].
//!
//! The module **does not** print diagnostics itself.

use std::fmt;
use std::io;
use thiserror::Error;

use log::{error, info};

/// Pipeline stage that produced a [`LhoxError::Batch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Scan,
    Parse,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Scan => write!(f, "scan"),
            Phase::Parse => write!(f, "parse"),
        }
    }
}

/// Canonical error type used throughout the crate.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LhoxError {
    /// Lexical (scanner) error.
    #[error("[line {line}] Error at {location}: {message}")]
    Scan {
        /// Human‑readable description.
        message: String,

        /// 1‑based line where the error occurred.
        line: usize,

        /// The offending text, or `end of input`.
        location: String,
    },

    /// Syntactic (parser) error, reported against the offending token.
    #[error("[line {line}] Error at '{lexeme}': {message}")]
    Parse {
        message: String,
        lexeme: String,
        line: usize,
    },

    /// Static resolution failure (redeclaration, illegal `return`, ...).
    #[error("[line {line}] Error: {message}")]
    Resolve { message: String, line: usize },

    /// Runtime evaluation error raised by the interpreter.
    #[error("Runtime error: {0}")]
    Runtime(String),

    /// Bytecode generation failure.
    #[error("Compile error: {0}")]
    Compile(String),

    /// Every error collected by an error‑accumulating pass.
    #[error("{} {phase} error(s):\n{}", .errors.len(), join_lines(.errors))]
    Batch {
        phase: Phase,
        errors: Vec<LhoxError>,
    },

    /// Wrapper around `std::io::Error` (transparent).  Enables `?` on I/O ops.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// UTF‑8 decoding failure when ingesting external text.
    #[error(transparent)]
    Utf8(#[from] std::str::Utf8Error),

    /// Token dump serialisation failure.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

fn join_lines(errors: &[LhoxError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

impl LhoxError {
    /// Helper constructor for the **scanner**.
    pub fn scan<S: Into<String>, L: Into<String>>(line: usize, location: L, msg: S) -> Self {
        let message: String = msg.into();
        let location: String = location.into();

        error!(
            "Scan error: line={}, at={}, msg={}",
            line, location, message
        );

        LhoxError::Scan {
            message,
            line,
            location,
        }
    }

    /// Helper constructor for the **parser**.
    pub fn parse<S: Into<String>>(line: usize, lexeme: &str, msg: S) -> Self {
        let message: String = msg.into();

        error!(
            "Parse error: line={}, token='{}', msg={}",
            line, lexeme, message
        );

        LhoxError::Parse {
            message,
            lexeme: lexeme.to_string(),
            line,
        }
    }

    /// Helper constructor for the **resolver**.
    pub fn resolve<S: Into<String>>(line: usize, msg: S) -> Self {
        let message: String = msg.into();

        error!("Resolve error: line={}, msg={}", line, message);

        LhoxError::Resolve { message, line }
    }

    /// Helper constructor for the **interpreter**.
    pub fn runtime<S: Into<String>>(msg: S) -> Self {
        let message: String = msg.into();

        error!("Runtime error: {}", message);

        LhoxError::Runtime(message)
    }

    /// Helper constructor for the **code generator**.
    pub fn compile<S: Into<String>>(msg: S) -> Self {
        let message: String = msg.into();

        error!("Compile error: {}", message);

        LhoxError::Compile(message)
    }

    /// Wrap an accumulated error list; a single error is returned unwrapped.
    pub fn batch(phase: Phase, mut errors: Vec<LhoxError>) -> Self {
        info!("Collected {} {} error(s)", errors.len(), phase);

        if errors.len() == 1 {
            if let Some(only) = errors.pop() {
                return only;
            }
        }

        LhoxError::Batch { phase, errors }
    }

    /// `true` for errors that stop a program before it runs (exit code 65).
    pub fn is_static(&self) -> bool {
        matches!(
            self,
            LhoxError::Scan { .. }
                | LhoxError::Parse { .. }
                | LhoxError::Resolve { .. }
                | LhoxError::Compile(_)
                | LhoxError::Batch { .. }
        )
    }
}

/// Crate‑wide `Result` alias.
pub type Result<T> = std::result::Result<T, LhoxError>;
