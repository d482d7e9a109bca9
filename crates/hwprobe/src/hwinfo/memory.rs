use std::path::Path;

use async_trait::async_trait;

use super::util::*;
use super::{Domain, Finding, Probe};
use crate::ProbeResult;

const MEMINFO: &str = "/proc/meminfo";

const KB_PER_GB: u128 = 1024 * 1024;

#[non_exhaustive]
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mem_total: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mem_available: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub swap_total: Option<String>,
}

pub struct MemoryProbe;

#[async_trait]
impl Probe for MemoryProbe {
    fn domain(&self) -> Domain {
        Domain::Memory
    }

    async fn collect(&self, accessor: &dyn Accessor) -> Finding {
        Finding::Memory(get_memory(accessor).await)
    }
}

pub async fn get_memory(accessor: &dyn Accessor) -> ProbeResult<MemoryRecord> {
    match accessor.read_text(Path::new(MEMINFO)).await {
        Ok(content) if content.trim().is_empty() => ProbeResult::failure("meminfo is empty"),
        Ok(content) => ProbeResult::Success(parse_meminfo(&content)),
        Err(e) if e.is_not_found() => ProbeResult::failure(e.to_string()),
        Err(e) => ProbeResult::failure(format!("memory probe error: {e}")),
    }
}

pub(crate) fn parse_meminfo(content: &str) -> MemoryRecord {
    let mut memory = MemoryRecord::default();

    for line in content.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };

        let slot = match key.trim() {
            "MemTotal" => &mut memory.mem_total,
            "MemAvailable" => &mut memory.mem_available,
            "SwapTotal" => &mut memory.swap_total,
            _ => continue,
        };

        let value = value.trim();
        let value = value.strip_suffix("kB").unwrap_or(value).trim();

        match parse_digits(value) {
            Some(kilobytes) => *slot = Some(format_gigabytes(kilobytes.into(), KB_PER_GB)),
            None => debug!(
                "{MEMINFO}: ignoring malformed {} value: {value:?}",
                key.trim()
            ),
        }
    }

    memory
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hwinfo::util::fixture::Fixture;

    #[test]
    fn converts_to_gigabytes() {
        let memory = parse_meminfo(
            "MemTotal:        1048576 kB
MemFree:          123456 kB
MemAvailable:    2097152 kB
Buffers:          100000 kB
SwapTotal:       16318412 kB
",
        );

        assert_eq!(memory.mem_total.as_deref(), Some("1.00 GB"));
        assert_eq!(memory.mem_available.as_deref(), Some("2.00 GB"));
        assert_eq!(memory.swap_total.as_deref(), Some("15.56 GB"));
    }

    #[test]
    fn missing_and_malformed_lines_stay_absent() {
        let memory = parse_meminfo("MemTotal: lots kB\nSwapTotal: 0 kB\nnot a line\n");

        assert_eq!(memory.mem_total, None);
        assert_eq!(memory.mem_available, None);
        assert_eq!(memory.swap_total.as_deref(), Some("0.00 GB"));
    }

    #[tokio::test]
    async fn failures() {
        assert_eq!(
            get_memory(&Fixture::new()).await,
            ProbeResult::failure("/proc/meminfo not found")
        );
        assert_eq!(
            get_memory(&Fixture::new().file(MEMINFO, "\n")).await,
            ProbeResult::failure("meminfo is empty")
        );
    }
}
