//! PASS/FAIL verdicts derived from an already-collected [`Report`].
//!
//! Nothing here touches the host; every check reads the report only.

use crate::hwinfo::{DiskType, HotplugStatus};
use crate::{ProbeResult, Report};

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    #[serde(rename = "PASS")]
    Pass,
    #[default]
    #[serde(rename = "FAIL")]
    Fail,
}

impl From<bool> for Verdict {
    fn from(pass: bool) -> Self {
        if pass {
            Self::Pass
        } else {
            Self::Fail
        }
    }
}

#[non_exhaustive]
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCheckResult {
    pub usb_subsystem_active: Verdict,
    pub gpu_detected: Verdict,
    pub network_connectivity: Verdict,
    pub ssd_present: Verdict,
}

/// Run every health check against `report`.
///
/// A probe that failed never passes its check. Devices are recognized by the
/// result variant, so a device whose description happens to contain "error"
/// still counts.
pub fn analyze(report: &Report) -> HealthCheckResult {
    let info = &report.device_info;

    let usb_devices = match &info.usb {
        Some(ProbeResult::Success(devices)) => !devices.is_empty(),
        _ => false,
    };
    let hotplug_active = report
        .hotplug_analysis
        .as_ref()
        .map(|h| h.status == HotplugStatus::Active)
        .unwrap_or(false);

    let gpu_detected = match &info.gpu {
        Some(ProbeResult::Success(gpus)) => !gpus.is_empty(),
        _ => false,
    };

    let network_connectivity = match &info.network {
        Some(ProbeResult::Success(interfaces)) => interfaces.values().any(|i| i.state == "up"),
        _ => false,
    };

    let ssd_present = match &info.disk {
        Some(ProbeResult::Success(disks)) => disks.values().any(|d| d.r#type == DiskType::Ssd),
        _ => false,
    };

    HealthCheckResult {
        usb_subsystem_active: (usb_devices || hotplug_active).into(),
        gpu_detected: gpu_detected.into(),
        network_connectivity: network_connectivity.into(),
        ssd_present: ssd_present.into(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::hwinfo::{DiskRecord, Finding, GpuRecord, HotplugInfo, InterfaceRecord};

    fn disk(r#type: DiskType) -> DiskRecord {
        DiskRecord {
            model: "Unknown".into(),
            r#type,
            size: "Unknown".into(),
        }
    }

    fn interface(state: &str) -> InterfaceRecord {
        InterfaceRecord {
            mac: "00:11:22:33:44:55".into(),
            state: state.into(),
        }
    }

    #[test]
    fn everything_fails_on_an_empty_report() {
        let report = Report::builder("empty").build();
        assert_eq!(analyze(&report), HealthCheckResult::default());
        assert_eq!(analyze(&report).ssd_present, Verdict::Fail);
    }

    #[test]
    fn ssd_present_needs_an_ssd() {
        let hdds = BTreeMap::from([
            ("sda".to_string(), disk(DiskType::Hdd)),
            ("sdb".to_string(), disk(DiskType::Unknown)),
        ]);
        let report = Report::builder("hdd")
            .finding(Finding::Disk(ProbeResult::Success(hdds.clone())))
            .build();
        assert_eq!(analyze(&report).ssd_present, Verdict::Fail);

        let report = Report::builder("none")
            .finding(Finding::Disk(ProbeResult::Success(BTreeMap::new())))
            .build();
        assert_eq!(analyze(&report).ssd_present, Verdict::Fail);

        let mut mixed = hdds;
        mixed.insert("nvme0n1".into(), disk(DiskType::Ssd));
        let report = Report::builder("ssd")
            .finding(Finding::Disk(ProbeResult::Success(mixed)))
            .build();
        assert_eq!(analyze(&report).ssd_present, Verdict::Pass);
    }

    #[test]
    fn network_needs_an_interface_up() {
        let down = BTreeMap::from([("eth0".to_string(), interface("down"))]);
        let report = Report::builder("down")
            .finding(Finding::Network(ProbeResult::Success(down)))
            .build();
        assert_eq!(analyze(&report).network_connectivity, Verdict::Fail);

        let up = BTreeMap::from([
            ("eth0".to_string(), interface("down")),
            ("wlan0".to_string(), interface("up")),
        ]);
        let report = Report::builder("up")
            .finding(Finding::Network(ProbeResult::Success(up)))
            .build();
        assert_eq!(analyze(&report).network_connectivity, Verdict::Pass);
    }

    #[test]
    fn usb_passes_on_devices_or_hotplug_activity() {
        let report = Report::builder("failed")
            .finding(Finding::Usb(ProbeResult::failure(
                "lsusb command failed or returned empty",
            )))
            .build();
        assert_eq!(analyze(&report).usb_subsystem_active, Verdict::Fail);

        let report = Report::builder("hotplug")
            .finding(Finding::Usb(ProbeResult::failure(
                "lsusb command failed or returned empty",
            )))
            .hotplug(HotplugInfo {
                status: HotplugStatus::Active,
                recent_events: vec!["usb 1-1: USB disconnect, device number 2".into()],
            })
            .build();
        assert_eq!(analyze(&report).usb_subsystem_active, Verdict::Pass);

        // a device description mentioning "error" is still a device
        let report = Report::builder("devices")
            .finding(Finding::Usb(ProbeResult::Success(vec![
                "Error Labs Debug Probe".into(),
            ])))
            .build();
        assert_eq!(analyze(&report).usb_subsystem_active, Verdict::Pass);
    }

    #[test]
    fn gpu_detected() {
        let report = Report::builder("failed")
            .finding(Finding::Gpu(ProbeResult::failure("lspci failed")))
            .build();
        assert_eq!(analyze(&report).gpu_detected, Verdict::Fail);

        let report = Report::builder("none")
            .finding(Finding::Gpu(ProbeResult::Success(Vec::new())))
            .build();
        assert_eq!(analyze(&report).gpu_detected, Verdict::Fail);

        let report = Report::builder("one")
            .finding(Finding::Gpu(ProbeResult::Success(vec![GpuRecord {
                model: "NVIDIA Corporation GA107M [GeForce RTX 3050 Mobile]".into(),
                vendor: "NVIDIA".into(),
            }])))
            .build();
        assert_eq!(analyze(&report).gpu_detected, Verdict::Pass);
    }
}
