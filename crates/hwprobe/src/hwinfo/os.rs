use std::path::Path;

use async_trait::async_trait;

use super::util::*;
use super::{Domain, Finding, Probe, UNKNOWN};
use crate::ProbeResult;

const PROC_VERSION: &str = "/proc/version";

const OS_RELEASE: &str = "/etc/os-release";

#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OsRecord {
    pub version: String,
    pub build_date: String,
    pub smp_support: bool,
    pub distro: String,
}

impl Default for OsRecord {
    fn default() -> Self {
        Self {
            version: UNKNOWN.to_owned(),
            build_date: UNKNOWN.to_owned(),
            smp_support: false,
            distro: UNKNOWN.to_owned(),
        }
    }
}

pub struct OsProbe;

#[async_trait]
impl Probe for OsProbe {
    fn domain(&self) -> Domain {
        Domain::Os
    }

    async fn collect(&self, accessor: &dyn Accessor) -> Finding {
        Finding::Os(get_os(accessor).await)
    }
}

pub async fn get_os(accessor: &dyn Accessor) -> ProbeResult<OsRecord> {
    let mut os = match accessor.read_text(Path::new(PROC_VERSION)).await {
        Ok(content) => parse_kernel(&content),
        Err(e) if e.is_not_found() => return ProbeResult::failure(e.to_string()),
        Err(e) => return ProbeResult::failure(format!("kernel parse error: {e}")),
    };

    // the distro name is best effort and never fails the probe
    match accessor.read_text(Path::new(OS_RELEASE)).await {
        Ok(content) => {
            if let Some(distro) = parse_pretty_name(&content) {
                os.distro = distro;
            }
        }
        Err(e) => debug!("{e}"),
    }

    ProbeResult::Success(os)
}

/// Parse `/proc/version`, eg:
///
/// `Linux version 6.5.0-14-generic (buildd@lcy02-amd64-110) (gcc ...) #14-Ubuntu SMP PREEMPT_DYNAMIC Tue Nov 14 14:59:49 UTC 2023`
pub(crate) fn parse_kernel(content: &str) -> OsRecord {
    let mut os = OsRecord {
        smp_support: content.contains("SMP"),
        ..Default::default()
    };

    if let Some(version) = content.split_whitespace().nth(2) {
        os.version = version.to_owned();
    }

    if let Some((_, build)) = content.split_once('#') {
        os.build_date = build
            .split_whitespace()
            .skip(3)
            .collect::<Vec<_>>()
            .join(" ");
    }

    os
}

pub(crate) fn parse_pretty_name(content: &str) -> Option<String> {
    content
        .lines()
        .find_map(|line| line.strip_prefix("PRETTY_NAME="))
        .map(|value| value.replace('"', "").trim().to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hwinfo::util::fixture::Fixture;

    const VERSION: &str = "Linux version 6.5.0-14-generic (buildd@lcy02-amd64-110) (x86_64-linux-gnu-gcc-12 (Ubuntu 12.3.0-1ubuntu1~23.04) 12.3.0, GNU ld (GNU Binutils for Ubuntu) 2.40) #14-Ubuntu SMP PREEMPT_DYNAMIC Tue Nov 14 14:59:49 UTC 2023\n";

    const OS_RELEASE_UBUNTU: &str = "NAME=\"Ubuntu\"
VERSION_ID=\"23.10\"
PRETTY_NAME=\"Ubuntu 23.10\"
PRETTY_NAME=\"Shadowed\"
";

    #[test]
    fn kernel() {
        let os = parse_kernel(VERSION);

        assert_eq!(os.version, "6.5.0-14-generic");
        assert_eq!(os.build_date, "Tue Nov 14 14:59:49 UTC 2023");
        assert!(os.smp_support);
    }

    #[test]
    fn short_version_string() {
        let os = parse_kernel("Linux version");
        assert_eq!(os, OsRecord::default());
    }

    #[tokio::test]
    async fn distro_is_best_effort() {
        let host = Fixture::new().file(PROC_VERSION, VERSION);
        let os = get_os(&host).await;
        assert_eq!(os.success().map(|o| o.distro.as_str()), Some("Unknown"));
        assert_eq!(
            os.success().map(|o| o.version.as_str()),
            Some("6.5.0-14-generic")
        );

        let host = host.file(OS_RELEASE, "NAME=Custom\n");
        let os = get_os(&host).await;
        assert_eq!(os.success().map(|o| o.distro.as_str()), Some("Unknown"));

        let host = host.file(OS_RELEASE, OS_RELEASE_UBUNTU);
        let os = get_os(&host).await;
        assert_eq!(
            os.success().map(|o| o.distro.as_str()),
            Some("Ubuntu 23.10")
        );
    }

    #[tokio::test]
    async fn missing_proc_version() {
        let host = Fixture::new().file(OS_RELEASE, OS_RELEASE_UBUNTU);
        assert_eq!(
            get_os(&host).await,
            ProbeResult::failure("/proc/version not found")
        );
    }
}
