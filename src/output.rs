use anyhow::Context;
use hwprobe::Report;
use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};

use std::path::Path;

/// Render the report as JSON indented by four spaces.
pub fn render(report: &Report) -> anyhow::Result<String> {
    let mut buf = Vec::new();
    let mut serializer =
        Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));

    report
        .serialize(&mut serializer)
        .context("failed to serialize report")?;

    String::from_utf8(buf).context("report is not valid utf-8")
}

pub fn save(report: &Report, path: &Path) -> anyhow::Result<()> {
    let json = render(report)?;

    std::fs::write(path, json).with_context(|| format!("error saving report to {}", path.display()))
}

pub fn print(report: &Report) -> anyhow::Result<()> {
    println!("{}", render(report)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hwprobe::hwinfo::{Finding, OsRecord};
    use hwprobe::ProbeResult;

    fn report() -> Report {
        Report::builder("output test")
            .timestamp("2024-05-01T10:00:00.000000")
            .finding(Finding::Os(ProbeResult::Success(OsRecord::default())))
            .finding(Finding::Gpu(ProbeResult::failure("lspci failed")))
            .build()
    }

    #[test]
    fn four_space_indent() {
        let json = render(&report()).unwrap();

        assert!(json.starts_with("{\n    \"timestamp\": \"2024-05-01T10:00:00.000000\""));
        assert!(json.contains("\n        \"gpu\": {\n            \"error\": \"lspci failed\""));
    }

    #[test]
    fn saved_report_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");

        save(&report(), &path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let decoded: Report = serde_json::from_str(&content).unwrap();
        assert_eq!(decoded, report());
    }

    #[test]
    fn unwritable_destination() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("report.json");

        let e = save(&report(), &path).unwrap_err();
        assert!(e.to_string().starts_with("error saving report to"));
    }
}
