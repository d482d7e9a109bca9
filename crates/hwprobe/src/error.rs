use core::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub type Result<T> = std::result::Result<T, Error>;

/// An error raised while reading a pseudo-file or listing a sysfs directory.
///
/// The attached path is always the logical path (eg: `/proc/cpuinfo`), never
/// the path after it was resolved against the accessor's root, so that the
/// rendered message names the resource a probe actually asked for.
#[derive(Debug)]
pub struct Error {
    path: Option<PathBuf>,
    source: ErrorSource,
    kind: ErrorKind,
}

impl Error {
    pub(crate) fn new(kind: ErrorKind, source: ErrorSource, path: Option<PathBuf>) -> Self {
        Self { kind, source, path }
    }

    pub(crate) fn with_path(
        kind: ErrorKind,
        source: impl Into<ErrorSource>,
        path: impl Into<PathBuf>,
    ) -> Self {
        Self::new(kind, source.into(), Some(path.into()))
    }

    /// Classifies an I/O error for `path`, separating a missing resource from
    /// every other failure.
    pub(crate) fn unreadable(error: io::Error, path: impl AsRef<Path>) -> Self {
        let kind = if error.kind() == io::ErrorKind::NotFound {
            ErrorKind::NotFound
        } else {
            ErrorKind::Io
        };

        Self::with_path(kind, error, path.as_ref())
    }

    pub(crate) fn timed_out(timeout: Duration, path: impl AsRef<Path>) -> Self {
        Self::with_path(ErrorKind::Timeout, timeout, path.as_ref())
    }

    pub(crate) fn other(message: impl Into<String>, path: impl AsRef<Path>) -> Self {
        Self::with_path(ErrorKind::Io, message.into(), path.as_ref())
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == ErrorKind::NotFound
    }
}

#[derive(Debug)]
pub(crate) enum ErrorSource {
    Io(io::Error),
    Timeout(Duration),
    Message(String),
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    /// The pseudo-file or directory does not exist.
    NotFound,
    /// The read did not complete within the accessor's timeout.
    Timeout,
    /// Any other I/O failure.
    Io,
}

impl From<io::Error> for ErrorSource {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<Duration> for ErrorSource {
    fn from(value: Duration) -> Self {
        Self::Timeout(value)
    }
}

impl From<String> for ErrorSource {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}

impl fmt::Display for ErrorSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => e.fmt(f),
            Self::Timeout(d) => write!(f, "timed out after {d:?}"),
            Self::Message(m) => f.write_str(m),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = self
            .path
            .as_deref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<unknown>".to_owned());

        match self.kind {
            ErrorKind::NotFound => write!(f, "{path} not found"),
            ErrorKind::Timeout => write!(f, "{path}: {}", self.source),
            ErrorKind::Io => write!(f, "io error reading {path}: {}", self.source),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.source {
            ErrorSource::Io(e) => Some(e),
            _ => None,
        }
    }
}
