use async_trait::async_trait;

use super::util::*;
use super::{Domain, Finding, Probe};
use crate::ProbeResult;

// `XXXX:XXXX ` vendor:product id and the separator after it
const ID_WIDTH: usize = 10;

// the scan stops once it holds more than this many events
const HOTPLUG_EVENT_LIMIT: usize = 10;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum HotplugStatus {
    Active,
    #[default]
    Inactive,
    #[serde(rename = "Permission Denied / Empty")]
    Unavailable,
}

/// Recent USB attach/detach activity from the kernel log.
#[non_exhaustive]
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HotplugInfo {
    pub status: HotplugStatus,
    /// Newest first.
    pub recent_events: Vec<String>,
}

pub struct UsbProbe;

#[async_trait]
impl Probe for UsbProbe {
    fn domain(&self) -> Domain {
        Domain::Usb
    }

    async fn collect(&self, accessor: &dyn Accessor) -> Finding {
        Finding::Usb(get_usb_devices(accessor).await)
    }
}

pub async fn get_usb_devices(accessor: &dyn Accessor) -> ProbeResult<Vec<String>> {
    match accessor.run_command("lsusb").await {
        Some(output) if !output.is_empty() => ProbeResult::Success(parse_lsusb(&output)),
        _ => ProbeResult::failure("lsusb command failed or returned empty"),
    }
}

pub(crate) fn parse_lsusb(output: &str) -> Vec<String> {
    let mut ret = Vec::new();

    for line in output.lines() {
        let Some((_, rest)) = line.split_once("ID") else {
            continue;
        };

        let raw = rest.trim();
        let description = raw
            .char_indices()
            .nth(ID_WIDTH)
            .map(|(i, _)| raw[i..].trim())
            .unwrap_or("");

        if description.is_empty() {
            ret.push(raw.to_owned());
        } else {
            ret.push(description.to_owned());
        }
    }

    ret
}

/// Scan `dmesg` for recent USB hotplug activity.
pub async fn get_hotplug_events(accessor: &dyn Accessor) -> HotplugInfo {
    match accessor.run_command("dmesg").await {
        Some(output) if !output.is_empty() => parse_dmesg(&output),
        _ => HotplugInfo {
            status: HotplugStatus::Unavailable,
            recent_events: Vec::new(),
        },
    }
}

/// Walks the log from the newest line backwards. The limit is checked before
/// each line, so up to `HOTPLUG_EVENT_LIMIT + 1` events are kept.
pub(crate) fn parse_dmesg(output: &str) -> HotplugInfo {
    let mut events = Vec::new();

    for line in output.lines().rev() {
        if events.len() > HOTPLUG_EVENT_LIMIT {
            break;
        }

        if line.contains("usb") && (line.contains("new") || line.contains("disconnect")) {
            events.push(line.trim().to_owned());
        }
    }

    let status = if events.is_empty() {
        HotplugStatus::Inactive
    } else {
        HotplugStatus::Active
    };

    HotplugInfo {
        status,
        recent_events: events,
    }
}
