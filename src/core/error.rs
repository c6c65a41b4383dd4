//! Purpose: Single tagged error type for every failure the binding can surface.
//! Exports: `Error`, `ErrorKind`, `check_status`, `to_exit_code`.
//! Role: The only place where a native status code becomes a Rust error.
//! Invariants: A nonzero status is never dropped; `code` carries it verbatim.
//! Invariants: Exit-code mapping is stable once published.
use std::error::Error as StdError;
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    Internal,
    Usage,
    LibraryNotFound,
    EntryPointMissing,
    NativeCallFailed,
    InvalidAlgorithm,
    Io,
}

#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    message: Option<String>,
    hint: Option<String>,
    path: Option<PathBuf>,
    entry_point: Option<&'static str>,
    code: Option<u32>,
    algorithm: Option<String>,
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl Error {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            hint: None,
            path: None,
            entry_point: None,
            code: None,
            algorithm: None,
            source: None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn hint(&self) -> Option<&str> {
        self.hint.as_deref()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Native symbol that produced or lacked the failure, if any.
    pub fn entry_point(&self) -> Option<&'static str> {
        self.entry_point
    }

    /// Raw provider status for `NativeCallFailed`.
    pub fn code(&self) -> Option<u32> {
        self.code
    }

    pub fn algorithm(&self) -> Option<&str> {
        self.algorithm.as_deref()
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_entry_point(mut self, entry_point: &'static str) -> Self {
        self.entry_point = Some(entry_point);
        self
    }

    pub fn with_code(mut self, code: u32) -> Self {
        self.code = Some(code);
        self
    }

    pub fn with_algorithm(mut self, algorithm: impl Into<String>) -> Self {
        self.algorithm = Some(algorithm.into());
        self
    }

    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.kind)?;
        if let Some(message) = &self.message {
            write!(f, ": {message}")?;
        }
        if let Some(entry_point) = self.entry_point {
            write!(f, " (entry point: {entry_point})")?;
        }
        if let Some(code) = self.code {
            write!(f, " (status: {code})")?;
        }
        if let Some(algorithm) = &self.algorithm {
            write!(f, " (algorithm: {algorithm})")?;
        }
        if let Some(path) = &self.path {
            write!(f, " (path: {})", path.display())?;
        }
        Ok(())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|source| source.as_ref() as &(dyn StdError + 'static))
    }
}

/// Maps a native status to `Ok` (zero) or `NativeCallFailed` carrying the code.
pub fn check_status(entry_point: &'static str, status: u32) -> Result<(), Error> {
    if status == 0 {
        return Ok(());
    }
    tracing::debug!(entry_point, status, "native call failed");
    Err(Error::new(ErrorKind::NativeCallFailed)
        .with_message(format!("{entry_point} returned status {status}"))
        .with_entry_point(entry_point)
        .with_code(status))
}

pub fn to_exit_code(kind: ErrorKind) -> i32 {
    match kind {
        ErrorKind::Internal => 1,
        ErrorKind::Usage => 2,
        ErrorKind::LibraryNotFound => 3,
        ErrorKind::EntryPointMissing => 4,
        ErrorKind::NativeCallFailed => 5,
        ErrorKind::InvalidAlgorithm => 6,
        ErrorKind::Io => 7,
    }
}
