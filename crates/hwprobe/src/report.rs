use serde::de::{self, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::health::HealthCheckResult;
use crate::hwinfo::{
    CpuRecord, DiskRecord, Finding, GpuRecord, HotplugInfo, InterfaceRecord, MemoryRecord, OsRecord,
};

use std::collections::BTreeMap;
use std::fmt;

pub const DEFAULT_REPORT_NAME: &str = "syscheck Hardware Report";

/// Outcome of a single probe: the domain record, or the reason it could not
/// be produced.
///
/// Serialized as the record itself on success and as `{"error": "..."}` on
/// failure. Deserialization tries the error shape first, so a result is
/// never read back as a mix of both.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProbeResult<T> {
    Success(T),
    Failure(String),
}

impl<T> ProbeResult<T> {
    pub fn failure(message: impl Into<String>) -> Self {
        Self::Failure(message.into())
    }

    pub fn success(&self) -> Option<&T> {
        match self {
            Self::Success(record) => Some(record),
            Self::Failure(_) => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Success(_) => None,
            Self::Failure(message) => Some(message),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

#[derive(Serialize)]
struct ErrorRef<'a> {
    error: &'a str,
}

/// The failure shape. Only a map with a single string-valued `error` key
/// qualifies, so a one-element list or a device map with a member named
/// "error" is never mistaken for it.
struct ErrorRecord {
    error: String,
}

impl<'de> Deserialize<'de> for ErrorRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ErrorVisitor;

        impl<'de> Visitor<'de> for ErrorVisitor {
            type Value = ErrorRecord;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map with a single `error` string")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut error = None;

                while let Some(key) = map.next_key::<String>()? {
                    if key != "error" {
                        return Err(de::Error::unknown_field(&key, &["error"]));
                    }
                    if error.is_some() {
                        return Err(de::Error::duplicate_field("error"));
                    }
                    error = Some(map.next_value::<String>()?);
                }

                error
                    .map(|error| ErrorRecord { error })
                    .ok_or_else(|| de::Error::missing_field("error"))
            }
        }

        deserializer.deserialize_map(ErrorVisitor)
    }
}

impl<T: Serialize> Serialize for ProbeResult<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Success(record) => record.serialize(serializer),
            Self::Failure(error) => ErrorRef { error }.serialize(serializer),
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for ProbeResult<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr<T> {
            Failure(ErrorRecord),
            Success(T),
        }

        Ok(match Repr::<T>::deserialize(deserializer)? {
            Repr::Failure(e) => Self::Failure(e.error),
            Repr::Success(record) => Self::Success(record),
        })
    }
}

/// Per-domain results, keyed by domain name in the serialized form. Only the
/// domains that were probed are present.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu: Option<ProbeResult<CpuRecord>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<ProbeResult<MemoryRecord>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disk: Option<ProbeResult<BTreeMap<String, DiskRecord>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<ProbeResult<BTreeMap<String, InterfaceRecord>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usb: Option<ProbeResult<Vec<String>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gpu: Option<ProbeResult<Vec<GpuRecord>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os: Option<ProbeResult<OsRecord>>,
}

impl DeviceInfo {
    fn record(&mut self, finding: Finding) {
        match finding {
            Finding::Cpu(r) => self.cpu = Some(r),
            Finding::Memory(r) => self.memory = Some(r),
            Finding::Disk(r) => self.disk = Some(r),
            Finding::Network(r) => self.network = Some(r),
            Finding::Usb(r) => self.usb = Some(r),
            Finding::Gpu(r) => self.gpu = Some(r),
            Finding::Os(r) => self.os = Some(r),
        }
    }

    /// Names of the domains that hold a result, in report order.
    pub fn domains(&self) -> Vec<&'static str> {
        let mut ret = Vec::new();
        if self.cpu.is_some() {
            ret.push("cpu");
        }
        if self.memory.is_some() {
            ret.push("memory");
        }
        if self.disk.is_some() {
            ret.push("disk");
        }
        if self.network.is_some() {
            ret.push("network");
        }
        if self.usb.is_some() {
            ret.push("usb");
        }
        if self.gpu.is_some() {
            ret.push("gpu");
        }
        if self.os.is_some() {
            ret.push("os");
        }
        ret
    }
}

#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub timestamp: String,
    pub report_name: String,
    pub device_info: DeviceInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hotplug_analysis: Option<HotplugInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_results: Option<HealthCheckResult>,
}

impl Report {
    pub fn builder(report_name: impl Into<String>) -> ReportBuilder {
        ReportBuilder::new(report_name)
    }

    /// Returns a copy of this report carrying the given verdicts.
    pub fn with_test_results(self, test_results: HealthCheckResult) -> Self {
        Self {
            test_results: Some(test_results),
            ..self
        }
    }
}

/// Folds probe findings into a [`Report`].
pub struct ReportBuilder {
    timestamp: String,
    report_name: String,
    device_info: DeviceInfo,
    hotplug_analysis: Option<HotplugInfo>,
}

impl ReportBuilder {
    pub fn new(report_name: impl Into<String>) -> Self {
        Self {
            timestamp: timestamp(),
            report_name: report_name.into(),
            device_info: DeviceInfo::default(),
            hotplug_analysis: None,
        }
    }

    pub fn timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = timestamp.into();
        self
    }

    pub fn finding(mut self, finding: Finding) -> Self {
        self.device_info.record(finding);
        self
    }

    pub fn hotplug(mut self, hotplug: HotplugInfo) -> Self {
        self.hotplug_analysis = Some(hotplug);
        self
    }

    pub fn build(self) -> Report {
        Report {
            timestamp: self.timestamp,
            report_name: self.report_name,
            device_info: self.device_info,
            hotplug_analysis: self.hotplug_analysis,
            test_results: None,
        }
    }
}

fn timestamp() -> String {
    chrono::Local::now()
        .format("%Y-%m-%dT%H:%M:%S%.6f")
        .to_string()
}
