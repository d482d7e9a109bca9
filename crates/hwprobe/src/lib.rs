//! Probe a Linux host's hardware through procfs, sysfs and a few diagnostic
//! tools, and derive PASS/FAIL health checks from what was found.
//!

#[macro_use]
extern crate log;

#[macro_use]
extern crate serde;

mod error;
pub mod health;
pub mod hwinfo;
mod report;

pub use crate::error::{Error, ErrorKind, Result};
pub use crate::health::{HealthCheckResult, Verdict};
pub use crate::hwinfo::{collect, Accessor, Domain, Options, Selection, System};
pub use crate::report::{DeviceInfo, ProbeResult, Report, ReportBuilder, DEFAULT_REPORT_NAME};
