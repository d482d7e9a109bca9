use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use tokio::task::JoinHandle;

use crate::{health, ProbeResult, Report};

mod cpu;
mod gpu;
mod memory;
mod net;
mod os;
mod storage;
mod usb;
mod util;

pub use self::cpu::{CpuProbe, CpuRecord, Topology};
pub use self::gpu::{GpuProbe, GpuRecord};
pub use self::memory::{MemoryProbe, MemoryRecord};
pub use self::net::{InterfaceRecord, NetworkProbe};
pub use self::os::{OsProbe, OsRecord};
pub use self::storage::{DiskProbe, DiskRecord, DiskType};
pub use self::usb::{get_hotplug_events, HotplugInfo, HotplugStatus, UsbProbe};
pub use self::util::{Accessor, System, DEFAULT_TIMEOUT};

pub(crate) const UNKNOWN: &str = "Unknown";

pub const DEFAULT_WORKERS: usize = 4;

/// A hardware or OS area covered by one probe.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Domain {
    Cpu,
    Memory,
    Disk,
    Network,
    Usb,
    Gpu,
    Os,
}

impl Domain {
    pub const ALL: [Domain; 7] = [
        Domain::Cpu,
        Domain::Memory,
        Domain::Disk,
        Domain::Network,
        Domain::Usb,
        Domain::Gpu,
        Domain::Os,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Cpu => "cpu",
            Self::Memory => "memory",
            Self::Disk => "disk",
            Self::Network => "network",
            Self::Usb => "usb",
            Self::Gpu => "gpu",
            Self::Os => "os",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Domain {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|d| d.name() == s)
            .ok_or_else(|| format!("unknown check type: {s}"))
    }
}

/// Which probes a run covers. Health checks only run for [`Selection::All`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Selection {
    #[default]
    All,
    Only(Domain),
}

impl FromStr for Selection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(Self::All),
            other => other.parse().map(Self::Only),
        }
    }
}

/// A probe's result, tagged with the domain it belongs to.
#[derive(Clone, Debug, PartialEq)]
pub enum Finding {
    Cpu(ProbeResult<CpuRecord>),
    Memory(ProbeResult<MemoryRecord>),
    Disk(ProbeResult<std::collections::BTreeMap<String, DiskRecord>>),
    Network(ProbeResult<std::collections::BTreeMap<String, InterfaceRecord>>),
    Usb(ProbeResult<Vec<String>>),
    Gpu(ProbeResult<Vec<GpuRecord>>),
    Os(ProbeResult<OsRecord>),
}

impl Finding {
    pub fn failure(domain: Domain, message: impl Into<String>) -> Self {
        let message = message.into();
        match domain {
            Domain::Cpu => Self::Cpu(ProbeResult::Failure(message)),
            Domain::Memory => Self::Memory(ProbeResult::Failure(message)),
            Domain::Disk => Self::Disk(ProbeResult::Failure(message)),
            Domain::Network => Self::Network(ProbeResult::Failure(message)),
            Domain::Usb => Self::Usb(ProbeResult::Failure(message)),
            Domain::Gpu => Self::Gpu(ProbeResult::Failure(message)),
            Domain::Os => Self::Os(ProbeResult::Failure(message)),
        }
    }

    pub fn domain(&self) -> Domain {
        match self {
            Self::Cpu(_) => Domain::Cpu,
            Self::Memory(_) => Domain::Memory,
            Self::Disk(_) => Domain::Disk,
            Self::Network(_) => Domain::Network,
            Self::Usb(_) => Domain::Usb,
            Self::Gpu(_) => Domain::Gpu,
            Self::Os(_) => Domain::Os,
        }
    }

    fn error(&self) -> Option<&str> {
        match self {
            Self::Cpu(r) => r.error(),
            Self::Memory(r) => r.error(),
            Self::Disk(r) => r.error(),
            Self::Network(r) => r.error(),
            Self::Usb(r) => r.error(),
            Self::Gpu(r) => r.error(),
            Self::Os(r) => r.error(),
        }
    }
}

/// Extracts one domain's facts from the host.
///
/// Implementations are failure boundaries: anything that goes wrong is
/// returned as a [`ProbeResult::Failure`] inside the finding.
#[async_trait]
pub trait Probe: Send + Sync {
    fn domain(&self) -> Domain;

    async fn collect(&self, accessor: &dyn Accessor) -> Finding;
}

pub fn probe(domain: Domain) -> Box<dyn Probe> {
    match domain {
        Domain::Cpu => Box::new(CpuProbe),
        Domain::Memory => Box::new(MemoryProbe),
        Domain::Disk => Box::new(DiskProbe),
        Domain::Network => Box::new(NetworkProbe),
        Domain::Usb => Box::new(UsbProbe),
        Domain::Gpu => Box::new(GpuProbe),
        Domain::Os => Box::new(OsProbe),
    }
}

/// Settings for a single collection run.
#[derive(Clone, Debug)]
pub struct Options {
    pub report_name: String,
    /// Upper bound on probes running at the same time.
    pub workers: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            report_name: crate::DEFAULT_REPORT_NAME.to_owned(),
            workers: DEFAULT_WORKERS,
        }
    }
}

/// Run the selected probes and fold their findings into a [`Report`].
///
/// A full run also scans for hotplug activity and attaches the health check
/// verdicts. Dropping the returned future aborts outstanding probes, which
/// in turn kills any external command they are waiting on.
pub async fn collect(
    accessor: Arc<dyn Accessor>,
    selection: Selection,
    options: &Options,
) -> Report {
    let probes: Vec<Box<dyn Probe>> = match selection {
        Selection::All => {
            info!("running all checks");
            Domain::ALL.into_iter().map(probe).collect()
        }
        Selection::Only(domain) => {
            info!("running {domain} check");
            vec![probe(domain)]
        }
    };

    let findings = run_probes(accessor.clone(), probes, options.workers).await;

    let builder = findings
        .into_iter()
        .fold(Report::builder(options.report_name.clone()), |builder, finding| {
            builder.finding(finding)
        });

    if selection != Selection::All {
        return builder.build();
    }

    info!("performing health analysis");

    let hotplug = get_hotplug_events(accessor.as_ref()).await;
    let report = builder.hotplug(hotplug).build();
    let verdicts = health::analyze(&report);

    report.with_test_results(verdicts)
}

pub(crate) async fn run_probes(
    accessor: Arc<dyn Accessor>,
    probes: Vec<Box<dyn Probe>>,
    workers: usize,
) -> Vec<Finding> {
    stream::iter(probes)
        .map(|probe| {
            let accessor = accessor.clone();
            let domain = probe.domain();

            async move {
                debug!("{domain} probe starting");

                let mut task = AbortOnDrop(tokio::spawn(async move {
                    probe.collect(accessor.as_ref()).await
                }));

                let finding = match (&mut task.0).await {
                    Ok(finding) => finding,
                    Err(e) if e.is_panic() => {
                        error!("{domain} probe panicked");
                        Finding::failure(domain, format!("{domain} probe panicked"))
                    }
                    Err(e) => Finding::failure(domain, format!("{domain} probe error: {e}")),
                };

                match finding.error() {
                    Some(e) => warn!("{domain} probe failed: {e}"),
                    None => debug!("{domain} probe finished"),
                }

                finding
            }
        })
        .buffer_unordered(workers.max(1))
        .collect()
        .await
}

struct AbortOnDrop<T>(JoinHandle<T>);

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}
