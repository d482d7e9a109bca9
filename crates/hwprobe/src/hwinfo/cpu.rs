use std::path::Path;

use async_trait::async_trait;

use super::util::*;
use super::{Domain, Finding, Probe, UNKNOWN};
use crate::ProbeResult;

const CPUINFO: &str = "/proc/cpuinfo";

#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpuRecord {
    pub vendor: String,
    pub model_name: String,
    pub topology: Topology,
    pub virtualization_support: bool,
    #[serde(with = "unknown_or")]
    pub cpu_family: Option<u64>,
    #[serde(with = "unknown_or")]
    pub cpu_model: Option<u64>,
    pub cache: String,
}

#[non_exhaustive]
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topology {
    pub physical_cores: u64,
    pub logical_threads: u64,
}

impl Default for CpuRecord {
    fn default() -> Self {
        Self {
            vendor: UNKNOWN.to_owned(),
            model_name: UNKNOWN.to_owned(),
            topology: Topology::default(),
            virtualization_support: false,
            cpu_family: None,
            cpu_model: None,
            cache: UNKNOWN.to_owned(),
        }
    }
}

pub struct CpuProbe;

#[async_trait]
impl Probe for CpuProbe {
    fn domain(&self) -> Domain {
        Domain::Cpu
    }

    async fn collect(&self, accessor: &dyn Accessor) -> Finding {
        Finding::Cpu(get_cpu(accessor).await)
    }
}

pub async fn get_cpu(accessor: &dyn Accessor) -> ProbeResult<CpuRecord> {
    match accessor.read_text(Path::new(CPUINFO)).await {
        Ok(content) if content.trim().is_empty() => ProbeResult::failure("cpuinfo is empty"),
        Ok(content) => ProbeResult::Success(parse_cpuinfo(&content)),
        Err(e) if e.is_not_found() => ProbeResult::failure(e.to_string()),
        Err(e) => ProbeResult::failure(format!("cpu probe error: {e}")),
    }
}

/// Parse the first processor block of `/proc/cpuinfo`.
///
/// Topology fields repeat identically in every block on symmetric hardware,
/// so later blocks are ignored.
pub(crate) fn parse_cpuinfo(content: &str) -> CpuRecord {
    let mut cpu = CpuRecord::default();

    let block = content
        .lines()
        .skip_while(|line| line.trim().is_empty())
        .take_while(|line| !line.trim().is_empty());

    for line in block {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim();
        let value = value.trim();

        if key.contains("vendor_id") {
            cpu.vendor = value.to_owned();
        } else if key.contains("model name") {
            cpu.model_name = value.to_owned();
        } else if key == "model" {
            if let Some(model) = parse_digits(value) {
                cpu.cpu_model = Some(model);
            }
        } else if key.contains("siblings") {
            if let Some(threads) = parse_digits(value) {
                cpu.topology.logical_threads = threads;
            }
        } else if key.contains("cpu cores") {
            if let Some(cores) = parse_digits(value) {
                cpu.topology.physical_cores = cores;
            }
        } else if key.contains("cache size") {
            cpu.cache = value.to_owned();
        } else if key.contains("cpu family") {
            if let Some(family) = parse_digits(value) {
                cpu.cpu_family = Some(family);
            }
        } else if key.contains("flags") && (value.contains("svm") || value.contains("vmx")) {
            cpu.virtualization_support = true;
        }
    }

    cpu
}

/// Serializes a missing number as the string `"Unknown"`.
mod unknown_or {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::UNKNOWN;

    pub fn serialize<S: Serializer>(
        value: &Option<u64>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(v) => serializer.serialize_u64(*v),
            None => serializer.serialize_str(UNKNOWN),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<u64>, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Value(u64),
            #[allow(dead_code)]
            Label(String),
        }

        Ok(match Repr::deserialize(deserializer)? {
            Repr::Value(v) => Some(v),
            Repr::Label(_) => None,
        })
    }
}
