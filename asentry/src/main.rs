/*!
asentry: report new or increased asteroid impact threats from the JPL Sentry table

Meant to be run from cron or a similar scheduler. Exit code 0 means nothing
changed, 1 means new or increased threats were reported, 2 means the check
failed.
*/

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Arg, ArgAction, ArgMatches, Command, value_parser};
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod monitor;

use monitor::{
    config::{OutputConfig, OutputPlugin, TerminalFormat, TrackerConfig},
    error::AsentryError,
    fetcher::{SampleSource, SentryClient, ThreatSource},
    tracker::{ERROR_EXIT_CODE, RunOutcome, ThreatTracker},
};

fn cli() -> Command {
    Command::new("asentry")
        .version(clap::crate_version!())
        .about("Reports new or increased asteroid impact threats from NASA/JPL Sentry")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .help("Configuration file (TOML)")
                .value_name("PATH")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("state")
                .short('s')
                .long("state")
                .help("Snapshot file [default: ~/.asentry]")
                .value_name("PATH")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("sound")
                .long("sound")
                .help("Sound to play on new threats [default: alert.mp3 beside the executable]")
                .value_name("PATH")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("no-sound")
                .long("no-sound")
                .help("Never play the alert sound")
                .action(ArgAction::SetTrue)
                .conflicts_with("sound"),
        )
        .arg(
            Arg::new("format")
                .short('f')
                .long("format")
                .help("Terminal output format")
                .value_name("FORMAT")
                .value_parser(["plain", "colored", "json"]),
        )
        .arg(
            Arg::new("ps-min")
                .long("ps-min")
                .help("Only consider objects above this cumulative Palermo Scale [default: -3]")
                .value_name("SCALE")
                .allow_hyphen_values(true)
                .value_parser(value_parser!(f64)),
        )
        .arg(
            Arg::new("sample")
                .long("sample")
                .help("Use a built-in sample dataset instead of the Sentry API")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Log more detail to stderr (repeat for debug)")
                .action(ArgAction::Count),
        )
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Apply command-line overrides on top of the loaded configuration.
fn apply_overrides(config: &mut TrackerConfig, matches: &ArgMatches) {
    if let Some(path) = matches.get_one::<PathBuf>("state") {
        config.state.snapshot_path = Some(path.clone());
    }
    if let Some(path) = matches.get_one::<PathBuf>("sound") {
        config.alert.enabled = true;
        config.alert.sound_file = Some(path.clone());
    }
    if matches.get_flag("no-sound") {
        config.alert.enabled = false;
    }
    if let Some(ps_min) = matches.get_one::<f64>("ps-min") {
        config.source.ps_min = *ps_min;
    }
    if let Some(format) = matches.get_one::<String>("format") {
        let format = match format.as_str() {
            "colored" => TerminalFormat::Colored,
            "json" => TerminalFormat::Json,
            _ => TerminalFormat::Plain,
        };
        set_terminal_format(&mut config.outputs, format);
    }
}

fn set_terminal_format(outputs: &mut Vec<OutputConfig>, format: TerminalFormat) {
    let mut found = false;
    for output in outputs.iter_mut() {
        if let OutputPlugin::Terminal { format: current } = &mut output.plugin {
            *current = format;
            output.enabled = true;
            found = true;
        }
    }
    if !found {
        outputs.push(OutputConfig {
            plugin: OutputPlugin::Terminal { format },
            enabled: true,
        });
    }
}

async fn run(matches: &ArgMatches) -> Result<RunOutcome, AsentryError> {
    let mut config = TrackerConfig::load(matches.get_one::<PathBuf>("config").map(PathBuf::as_path))?;
    apply_overrides(&mut config, matches);
    if !config.source.ps_min.is_finite() {
        return Err(AsentryError::Config("--ps-min must be a finite number".into()));
    }

    let source: Box<dyn ThreatSource> = if matches.get_flag("sample") {
        Box::new(SampleSource)
    } else {
        Box::new(SentryClient::new(config.source.clone())?)
    };

    let mut tracker = ThreatTracker::new(&config, source)?;
    tracker.run().await
}

/// Process exit code for the result of a run.
fn exit_code(result: &Result<RunOutcome, AsentryError>) -> u8 {
    match result {
        Ok(outcome) => outcome.exit_code(),
        Err(_) => ERROR_EXIT_CODE,
    }
}

/// `<cmd>: Error: <message>` followed by one `caused by:` line per cause.
fn error_report(command: &str, err: &AsentryError) -> String {
    let mut report = format!("{}: Error: {}", command, err);
    for cause in err.causes() {
        report.push_str("\n  caused by: ");
        report.push_str(&cause);
    }
    report
}

/// Name the program was invoked as, for error messages.
fn command_name() -> String {
    std::env::args_os()
        .next()
        .as_deref()
        .and_then(|arg| Path::new(arg).file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "asentry".to_string())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let matches = cli().get_matches();
    init_logging(matches.get_count("verbose"));

    let result = run(&matches).await;
    if let Err(err) = &result {
        debug!(kind = err.kind(), "Run failed");
        eprintln!("{}", error_report(&command_name(), err));
    }
    ExitCode::from(exit_code(&result))
}
