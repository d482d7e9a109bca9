use super::*;

use std::time::Duration;

fn report_name() -> String {
    hwprobe::DEFAULT_REPORT_NAME.into()
}

fn root() -> PathBuf {
    "/".into()
}

fn timeout() -> String {
    "5s".into()
}

fn workers() -> usize {
    hwprobe::hwinfo::DEFAULT_WORKERS
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
pub struct General {
    #[serde(default = "report_name")]
    report_name: String,

    // pseudo-file paths such as /proc/cpuinfo are resolved under this root,
    // which allows probing a captured procfs/sysfs tree
    #[serde(default = "root")]
    root: PathBuf,

    // bound on every file read and external command
    #[serde(default = "timeout")]
    timeout: String,

    #[serde(default = "workers")]
    workers: usize,
}

impl Default for General {
    fn default() -> Self {
        Self {
            report_name: report_name(),
            root: root(),
            timeout: timeout(),
            workers: workers(),
        }
    }
}

impl General {
    pub fn check(&self) -> Result<(), ConfigError> {
        self.timeout.parse::<humantime::Duration>()?;

        if self.workers == 0 {
            return Err(ConfigError::Workers);
        }

        Ok(())
    }

    pub fn report_name(&self) -> &str {
        &self.report_name
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
            .parse::<humantime::Duration>()
            .map(Into::into)
            .unwrap_or(hwprobe::hwinfo::DEFAULT_TIMEOUT)
    }

    pub fn workers(&self) -> usize {
        self.workers
    }
}
