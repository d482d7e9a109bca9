use anyhow::Context;
use clap::{value_parser, ArgMatches, Command};
use hwprobe::{Accessor, Options, Selection, System};
use tracing::{error, info, warn};
use tracing_log::AsTrace;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

mod config;
mod output;

use config::Config;

const CHECK_TYPES: [&str; 8] = [
    "all", "cpu", "memory", "disk", "network", "usb", "gpu", "os",
];

fn command() -> Command {
    Command::new(env!("CARGO_BIN_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .long_about("syscheck probes Linux hardware through procfs, sysfs, lsusb, lspci and dmesg and reports PASS/FAIL health checks.")
        .arg(
            clap::Arg::new("CHECK")
                .long("check")
                .short('c')
                .help("Specific hardware to check")
                .action(clap::ArgAction::Set)
                .value_parser(CHECK_TYPES)
                .default_value("all"),
        )
        .arg(
            clap::Arg::new("OUTPUT")
                .long("output")
                .short('o')
                .help("Report filename (default: report_<timestamp>.json)")
                .action(clap::ArgAction::Set)
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            clap::Arg::new("NO_FILE")
                .long("no-file")
                .help("Don't save to file, print to console only")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            clap::Arg::new("VERBOSE")
                .long("verbose")
                .short('v')
                .help("Print the report to the console even when saving it to a file")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            clap::Arg::new("CONFIG")
                .long("config")
                .help("Configuration file")
                .action(clap::ArgAction::Set)
                .value_parser(value_parser!(PathBuf)),
        )
}

pub struct Args {
    check: Selection,
    output: PathBuf,
    no_file: bool,
    verbose: bool,
    config: Option<PathBuf>,
}

impl TryFrom<ArgMatches> for Args {
    type Error = String;

    fn try_from(
        args: ArgMatches,
    ) -> Result<Self, <Self as std::convert::TryFrom<clap::ArgMatches>>::Error> {
        let check: Selection = args
            .get_one::<String>("CHECK")
            .map(|c| c.parse())
            .transpose()?
            .unwrap_or_default();

        let output = args
            .get_one::<PathBuf>("OUTPUT")
            .cloned()
            .unwrap_or_else(|| {
                let now = chrono::Local::now();
                PathBuf::from(format!("report_{}.json", now.format("%Y%m%d_%H%M%S")))
            });

        Ok(Args {
            check,
            output,
            no_file: args.get_flag("NO_FILE"),
            verbose: args.get_flag("VERBOSE"),
            config: args.get_one::<PathBuf>("CONFIG").cloned(),
        })
    }
}

fn main() {
    let args = match Args::try_from(command().get_matches()) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    // load config from file
    let config = match &args.config {
        Some(file) => match Config::load(file) {
            Ok(c) => c,
            Err(error) => {
                eprintln!("error loading config file: {file:?}\n{error}");
                std::process::exit(1);
            }
        },
        None => Config::default(),
    };

    // configure debug log
    let level = config.log().level();

    let subscriber = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level.as_trace())
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("failed to initialize debug log: {e}");
    }

    // forward records from the probe library
    if let Err(e) = tracing_log::LogTracer::init_with_filter(level.to_level_filter()) {
        eprintln!("failed to initialize log bridge: {e}");
    }

    if let Err(e) = run(args, config) {
        error!("{e:#}");
        std::process::exit(1);
    }
}

fn run(args: Args, config: Config) -> anyhow::Result<()> {
    let general = config.general();

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .worker_threads(general.workers())
        .thread_name("syscheck")
        .build()
        .context("failed to launch async runtime")?;

    let accessor: Arc<dyn Accessor> =
        Arc::new(System::with_root(general.root()).timeout(general.timeout()));

    let options = Options {
        report_name: general.report_name().to_owned(),
        workers: general.workers(),
    };

    let report = rt.block_on(async {
        tokio::select! {
            report = hwprobe::collect(accessor, args.check, &options) => Some(report),
            _ = tokio::signal::ctrl_c() => None,
        }
    });

    let Some(report) = report else {
        warn!("interrupted, no report written");
        // let aborted probes drop their children so kill_on_drop reaps them
        rt.shutdown_timeout(Duration::from_secs(1));
        std::process::exit(2);
    };

    if args.no_file {
        output::print(&report)?;
    } else {
        output::save(&report, &args.output)?;
        info!("report saved successfully: {}", args.output.display());

        if args.verbose {
            output::print(&report)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hwprobe::Domain;

    fn parse(argv: &[&str]) -> Result<Args, String> {
        let matches = command()
            .try_get_matches_from(argv.iter().copied())
            .map_err(|e| e.to_string())?;
        Args::try_from(matches)
    }

    #[test]
    fn defaults() {
        let args = parse(&["syscheck"]).unwrap();

        assert_eq!(args.check, Selection::All);
        assert!(!args.no_file);
        assert!(!args.verbose);
        assert!(args.config.is_none());

        let output = args.output.to_string_lossy().into_owned();
        assert!(output.starts_with("report_"));
        assert!(output.ends_with(".json"));
    }

    #[test]
    fn flags() {
        let args = parse(&[
            "syscheck",
            "-c",
            "gpu",
            "-o",
            "gpu.json",
            "--no-file",
            "-v",
            "--config",
            "/etc/syscheck/syscheck.toml",
        ])
        .unwrap();

        assert_eq!(args.check, Selection::Only(Domain::Gpu));
        assert_eq!(args.output, PathBuf::from("gpu.json"));
        assert!(args.no_file);
        assert!(args.verbose);
        assert_eq!(
            args.config,
            Some(PathBuf::from("/etc/syscheck/syscheck.toml"))
        );
    }

    #[test]
    fn unknown_check_type() {
        assert!(parse(&["syscheck", "--check", "fan"]).is_err());
    }

    #[test]
    fn cli_is_well_formed() {
        command().debug_assert();
    }
}
