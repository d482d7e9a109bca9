use async_trait::async_trait;

use super::util::*;
use super::{Domain, Finding, Probe};
use crate::ProbeResult;

#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GpuRecord {
    pub model: String,
    pub vendor: String,
}

pub struct GpuProbe;

#[async_trait]
impl Probe for GpuProbe {
    fn domain(&self) -> Domain {
        Domain::Gpu
    }

    async fn collect(&self, accessor: &dyn Accessor) -> Finding {
        Finding::Gpu(get_gpus(accessor).await)
    }
}

pub async fn get_gpus(accessor: &dyn Accessor) -> ProbeResult<Vec<GpuRecord>> {
    match accessor.run_command("lspci").await {
        Some(output) if !output.is_empty() => ProbeResult::Success(parse_lspci(&output)),
        _ => ProbeResult::failure("lspci failed"),
    }
}

pub(crate) fn parse_lspci(output: &str) -> Vec<GpuRecord> {
    let mut ret = Vec::new();

    for line in output.lines() {
        if !line.contains("VGA") && !line.contains("3D Controller") {
            continue;
        }

        // slot, class, description
        let mut parts = line.splitn(3, ':');
        let Some(model) = parts.nth(2).map(str::trim) else {
            continue;
        };
        let Some(vendor) = model.split_whitespace().next() else {
            continue;
        };

        // "Advanced Micro Devices, Inc. [AMD/ATI]"
        let vendor = if vendor == "Advanced" { "AMD" } else { vendor };

        ret.push(GpuRecord {
            model: model.to_owned(),
            vendor: vendor.to_owned(),
        });
    }

    ret
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hwinfo::util::fixture::Fixture;

    const LSPCI: &str = "00:00.0 Host bridge: Advanced Micro Devices, Inc. [AMD] Device 14b5 (rev 01)
01:00.0 VGA compatible controller: NVIDIA Corporation GA107M [GeForce RTX 3050 Mobile] (rev a1)
05:00.0 VGA compatible controller: Advanced Micro Devices, Inc. [AMD/ATI] Rembrandt [Radeon 680M] (rev c8)
05:00.1 Audio device: Advanced Micro Devices, Inc. [AMD/ATI] Rembrandt Radeon High Definition Audio Controller
06:00.0 3D Controller: Intel Corporation Device 56a5
07:00.0 VGA compatible controller:
";

    #[test]
    fn vga_and_3d_controllers() {
        let gpus = parse_lspci(LSPCI);

        assert_eq!(gpus.len(), 3);
        assert_eq!(
            gpus[0],
            GpuRecord {
                model: "NVIDIA Corporation GA107M [GeForce RTX 3050 Mobile] (rev a1)".into(),
                vendor: "NVIDIA".into(),
            }
        );
        assert_eq!(gpus[1].vendor, "AMD");
        assert_eq!(
            gpus[1].model,
            "Advanced Micro Devices, Inc. [AMD/ATI] Rembrandt [Radeon 680M] (rev c8)"
        );
        assert_eq!(gpus[2].vendor, "Intel");
    }

    #[test]
    fn other_devices_are_ignored() {
        assert!(parse_lspci("00:1f.3 Audio device: Intel Corporation Device 51c8\n").is_empty());
    }

    #[tokio::test]
    async fn lspci_missing() {
        assert_eq!(
            get_gpus(&Fixture::new()).await,
            ProbeResult::failure("lspci failed")
        );

        assert_eq!(
            get_gpus(&Fixture::new().command("lspci", "")).await,
            ProbeResult::failure("lspci failed")
        );

        let host = Fixture::new().command("lspci", LSPCI);
        assert_eq!(get_gpus(&host).await.success().map(Vec::len), Some(3));
    }
}
