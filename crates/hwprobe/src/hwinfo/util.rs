use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use walkdir::{DirEntry, WalkDir};

use crate::{Error, Result};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// The I/O boundary every probe goes through. Implementations do no parsing.
#[async_trait]
pub trait Accessor: Send + Sync {
    /// Read a pseudo-file to a string. A missing file is reported with
    /// [`ErrorKind::NotFound`](crate::ErrorKind::NotFound).
    async fn read_text(&self, path: &Path) -> Result<String>;

    /// List the (sub-directory) entries of a sysfs class directory, sorted by
    /// name.
    async fn list_dir(&self, path: &Path) -> Result<Vec<String>>;

    /// Run an external program without arguments and return its stdout.
    /// Returns `None` if the program can't be started, exits unsuccessfully,
    /// or does not finish in time.
    async fn run_command(&self, program: &str) -> Option<String>;
}

/// Accessor for the running host.
#[derive(Clone, Debug)]
pub struct System {
    root: PathBuf,
    timeout: Duration,
}

impl Default for System {
    fn default() -> Self {
        Self::new()
    }
}

impl System {
    pub fn new() -> Self {
        Self::with_root("/")
    }

    /// Resolve every pseudo-file path under `root` instead of `/`.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Bound each read, listing and command by `timeout`.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        self.root.join(path.strip_prefix("/").unwrap_or(path))
    }
}

#[async_trait]
impl Accessor for System {
    async fn read_text(&self, path: &Path) -> Result<String> {
        let resolved = self.resolve(path);

        match tokio::time::timeout(self.timeout, tokio::fs::read_to_string(&resolved)).await {
            Ok(Ok(content)) => Ok(content),
            Ok(Err(e)) => Err(Error::unreadable(e, path)),
            Err(_) => Err(Error::timed_out(self.timeout, path)),
        }
    }

    async fn list_dir(&self, path: &Path) -> Result<Vec<String>> {
        let resolved = self.resolve(path);
        let logical = path.to_path_buf();

        let task = tokio::task::spawn_blocking(move || list_entries(&resolved, &logical));

        match tokio::time::timeout(self.timeout, task).await {
            Ok(Ok(entries)) => entries,
            Ok(Err(e)) => Err(Error::other(e.to_string(), path)),
            Err(_) => Err(Error::timed_out(self.timeout, path)),
        }
    }

    async fn run_command(&self, program: &str) -> Option<String> {
        let output = Command::new(program)
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .output();

        match tokio::time::timeout(self.timeout, output).await {
            Ok(Ok(output)) if output.status.success() => {
                Some(String::from_utf8_lossy(&output.stdout).into_owned())
            }
            Ok(Ok(output)) => {
                debug!("{program} exited with {}", output.status);
                None
            }
            Ok(Err(e)) => {
                debug!("failed to run {program}: {e}");
                None
            }
            Err(_) => {
                debug!("{program} did not finish within {:?}", self.timeout);
                None
            }
        }
    }
}

fn list_entries(resolved: &Path, logical: &Path) -> Result<Vec<String>> {
    std::fs::metadata(resolved).map_err(|e| Error::unreadable(e, logical))?;

    let mut ret = Vec::new();
    let walker = WalkDir::new(resolved)
        .follow_links(true)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter();
    for entry in walker.filter_entry(|e| !is_hidden(e)) {
        let Ok(entry) = entry else {
            continue;
        };
        if entry.file_type().is_dir() {
            if let Some(name) = entry.file_name().to_str() {
                ret.push(name.to_owned());
            }
        }
    }

    Ok(ret)
}

pub(crate) fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|s| s.starts_with('.'))
        .unwrap_or(false)
}

/// Read a single-value sysfs attribute, trimmed.
pub(crate) async fn read_string(accessor: &dyn Accessor, path: impl AsRef<Path>) -> Result<String> {
    let raw = accessor.read_text(path.as_ref()).await?;
    Ok(raw.trim().to_string())
}

/// Parse a token made only of ASCII digits. Signs, whitespace and anything
/// else leave the caller's default in place.
pub(crate) fn parse_digits(value: &str) -> Option<u64> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    value.parse().ok()
}

/// Render `value / divisor` as gigabytes with two decimals. The division is
/// exact and rounds half to even.
pub(crate) fn format_gigabytes(value: u128, divisor: u128) -> String {
    let scaled = value * 100;
    let mut hundredths = scaled / divisor;
    let remainder = scaled % divisor;

    match (remainder * 2).cmp(&divisor) {
        Ordering::Greater => hundredths += 1,
        Ordering::Equal if hundredths % 2 == 1 => hundredths += 1,
        _ => (),
    }

    format!("{}.{:02} GB", hundredths / 100, hundredths % 100)
}
