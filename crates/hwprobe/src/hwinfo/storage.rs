use std::collections::BTreeMap;
use std::path::Path;

use async_trait::async_trait;

use super::util::*;
use super::{Domain, Finding, Probe, UNKNOWN};
use crate::ProbeResult;

const SYS_BLOCK: &str = "/sys/block";

const LOGIC_SECTOR_SIZE: u128 = 512;

const BYTES_PER_GB: u128 = 1024 * 1024 * 1024;

// loop devices, ram disks and optical drives
const SKIPPED_PREFIXES: [&str; 3] = ["loop", "ram", "sr"];

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiskType {
    #[serde(rename = "SSD")]
    Ssd,
    #[serde(rename = "HDD")]
    Hdd,
    #[default]
    Unknown,
}

#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiskRecord {
    pub model: String,
    pub r#type: DiskType,
    // "<n> GB" from /sys/block/NAME/size * 512
    pub size: String,
}

impl Default for DiskRecord {
    fn default() -> Self {
        Self {
            model: UNKNOWN.to_owned(),
            r#type: DiskType::Unknown,
            size: UNKNOWN.to_owned(),
        }
    }
}

pub struct DiskProbe;

#[async_trait]
impl Probe for DiskProbe {
    fn domain(&self) -> Domain {
        Domain::Disk
    }

    async fn collect(&self, accessor: &dyn Accessor) -> Finding {
        Finding::Disk(get_blocks(accessor).await)
    }
}

pub async fn get_blocks(accessor: &dyn Accessor) -> ProbeResult<BTreeMap<String, DiskRecord>> {
    let names = match accessor.list_dir(Path::new(SYS_BLOCK)).await {
        Ok(names) => names,
        Err(e) if e.is_not_found() => return ProbeResult::failure(e.to_string()),
        Err(e) => return ProbeResult::failure(format!("disk probe error: {e}")),
    };

    let mut ret = BTreeMap::new();

    for name in names {
        if SKIPPED_PREFIXES.iter().any(|p| name.starts_with(p)) {
            continue;
        }

        let block = get_block(accessor, &name).await;
        ret.insert(name, block);
    }

    ProbeResult::Success(ret)
}

// Every attribute is read on its own; one that can't be read stays Unknown.
async fn get_block(accessor: &dyn Accessor, name: &str) -> DiskRecord {
    let mut block = DiskRecord::default();

    match read_string(accessor, format!("{SYS_BLOCK}/{name}/device/model")).await {
        Ok(model) if !model.is_empty() => block.model = model,
        Ok(_) => (),
        Err(e) => debug!("{name}: {e}"),
    }

    match read_string(accessor, format!("{SYS_BLOCK}/{name}/queue/rotational")).await {
        Ok(rotational) => block.r#type = disk_type(&rotational),
        Err(e) => debug!("{name}: {e}"),
    }

    match read_string(accessor, format!("{SYS_BLOCK}/{name}/size")).await {
        Ok(sectors) => {
            if let Some(size) = disk_size(&sectors) {
                block.size = size;
            }
        }
        Err(e) => debug!("{name}: {e}"),
    }

    block
}

fn disk_type(rotational: &str) -> DiskType {
    match rotational {
        "" => DiskType::Unknown,
        "0" => DiskType::Ssd,
        _ => DiskType::Hdd,
    }
}

fn disk_size(sectors: &str) -> Option<String> {
    let sectors = parse_digits(sectors)?;
    Some(format_gigabytes(
        u128::from(sectors) * LOGIC_SECTOR_SIZE,
        BYTES_PER_GB,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hwinfo::util::fixture::Fixture;

    #[tokio::test]
    async fn virtual_devices_are_skipped() {
        let host = Fixture::new()
            .file("/sys/block/sda/device/model", "Samsung SSD 860 EVO 500GB\n")
            .file("/sys/block/sda/queue/rotational", "0\n")
            .file("/sys/block/sda/size", "976773168\n")
            .file("/sys/block/sr0/size", "2097151\n")
            .file("/sys/block/ram0/size", "8192\n")
            .file("/sys/block/loop0/size", "0\n");

        let disks = get_blocks(&host).await;
        let disks = disks.success().unwrap();

        assert_eq!(disks.keys().collect::<Vec<_>>(), vec!["sda"]);
        assert_eq!(
            disks["sda"],
            DiskRecord {
                model: "Samsung SSD 860 EVO 500GB".into(),
                r#type: DiskType::Ssd,
                size: "465.76 GB".into(),
            }
        );
    }

    #[tokio::test]
    async fn attributes_fail_independently() {
        let host = Fixture::new()
            .file("/sys/block/sdb/queue/rotational", "1\n")
            .file("/sys/block/sdb/size", "garbage\n")
            .dir("/sys/block/nvme0n1");

        let disks = get_blocks(&host).await;
        let disks = disks.success().unwrap();

        assert_eq!(
            disks["sdb"],
            DiskRecord {
                model: "Unknown".into(),
                r#type: DiskType::Hdd,
                size: "Unknown".into(),
            }
        );
        assert_eq!(disks["nvme0n1"], DiskRecord::default());
    }

    #[tokio::test]
    async fn missing_sys_block() {
        assert_eq!(
            get_blocks(&Fixture::new()).await,
            ProbeResult::failure("/sys/block not found")
        );
    }

    #[test]
    fn rotational() {
        assert_eq!(disk_type("0"), DiskType::Ssd);
        assert_eq!(disk_type("1"), DiskType::Hdd);
        assert_eq!(disk_type(""), DiskType::Unknown);
    }
}
