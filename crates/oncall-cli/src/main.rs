//! `oncall-copilot` command-line front end

use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgGroup, ArgMatches, Command};
use oncall_contract::{validate, BuiltinContracts};
use oncall_core::{CopilotConfig, IncidentCopilot, IncidentEnvelope, ResponseStatus};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

const EXIT_OK: u8 = 0;
const EXIT_ERROR: u8 = 1;
const EXIT_DEGRADED: u8 = 2;

fn cli() -> Command {
    Command::new("oncall-copilot")
        .version(oncall_core::VERSION)
        .about("Structured incident analysis from concurrent specialists")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("log-format")
                .long("log-format")
                .global(true)
                .default_value("text")
                .value_parser(["text", "json"])
                .help("Log output format (logs go to stderr)"),
        )
        .subcommand(
            Command::new("analyze")
                .about("Analyse one incident envelope")
                .arg(
                    Arg::new("file")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Incident envelope JSON file"),
                )
                .arg(
                    Arg::new("mock")
                        .long("mock")
                        .action(ArgAction::SetTrue)
                        .help("Serve canned fixtures instead of calling specialists"),
                )
                .arg(
                    Arg::new("fixtures")
                        .long("fixtures")
                        .value_parser(value_parser!(PathBuf))
                        .help("Fixture directory for mock mode"),
                )
                .arg(
                    Arg::new("config")
                        .long("config")
                        .value_parser(value_parser!(PathBuf))
                        .help("TOML configuration file"),
                )
                .arg(
                    Arg::new("timeout")
                        .long("timeout")
                        .value_parser(value_parser!(u64))
                        .help("Per-specialist timeout in seconds"),
                )
                .arg(
                    Arg::new("pretty")
                        .long("pretty")
                        .action(ArgAction::SetTrue)
                        .help("Pretty-print the response body"),
                ),
        )
        .subcommand(
            Command::new("validate")
                .about("Check a file against the incident or output contract")
                .arg(
                    Arg::new("file")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("JSON file to check"),
                )
                .arg(
                    Arg::new("output")
                        .long("output")
                        .action(ArgAction::SetTrue)
                        .help("Check against the output contract"),
                ),
        )
        .subcommand(
            Command::new("schema")
                .about("Print a contract as JSON Schema")
                .arg(Arg::new("input").long("input").action(ArgAction::SetTrue).help("Incident contract"))
                .arg(Arg::new("output").long("output").action(ArgAction::SetTrue).help("Output contract (default)"))
                .group(ArgGroup::new("contract").args(["input", "output"])),
        )
}

fn init_tracing(format: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let matches = cli().get_matches();
    let format = matches
        .get_one::<String>("log-format")
        .map_or("text", String::as_str);
    init_tracing(format);

    match run(&matches).await {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(EXIT_ERROR)
        }
    }
}

async fn run(matches: &ArgMatches) -> Result<u8> {
    match matches.subcommand() {
        Some(("analyze", args)) => analyze(args).await,
        Some(("validate", args)) => validate_file(args),
        Some(("schema", args)) => print_schema(args),
        _ => Ok(EXIT_ERROR),
    }
}

fn exit_code(status: ResponseStatus) -> u8 {
    match status {
        ResponseStatus::Complete => EXIT_OK,
        ResponseStatus::Degraded => EXIT_DEGRADED,
    }
}

fn read_json(path: &Path) -> Result<Value> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {} as JSON", path.display()))
}

/// Configuration file and environment, then command-line overrides
fn config_from(args: &ArgMatches) -> Result<CopilotConfig> {
    let path = args.get_one::<PathBuf>("config");
    let mut config = CopilotConfig::load(path.map(PathBuf::as_path)).context("loading configuration")?;

    if args.get_flag("mock") {
        config = config.with_mock_mode(true);
    }
    if let Some(dir) = args.get_one::<PathBuf>("fixtures") {
        config = config.with_fixtures_dir(dir.clone());
    }
    if let Some(secs) = args.get_one::<u64>("timeout") {
        config = config.with_timeout_secs(*secs);
    }
    config.validated().context("invalid command-line settings")
}

async fn analyze(args: &ArgMatches) -> Result<u8> {
    let config = config_from(args)?;
    let Some(path) = args.get_one::<PathBuf>("file") else {
        return Ok(EXIT_ERROR);
    };
    let payload = read_json(path)?;
    let copilot = IncidentCopilot::from_config(config).context("starting copilot")?;

    let response = match copilot.analyze(&payload).await {
        Ok(response) => response,
        Err(err) => {
            for violation in err.violations() {
                eprintln!("  {violation}");
            }
            return Err(err).context("analysis failed");
        }
    };

    let body = if args.get_flag("pretty") {
        serde_json::to_string_pretty(&response.body)?
    } else {
        serde_json::to_string(&response.body)?
    };
    println!("{body}");

    let (name, value) = response.header();
    eprintln!("{name}: {value}");
    for violation in &response.violations {
        eprintln!("  {violation}");
    }
    for role in &response.missing_roles {
        eprintln!("  no contribution from role {role}");
    }
    Ok(exit_code(response.status))
}

fn validate_file(args: &ArgMatches) -> Result<u8> {
    let Some(path) = args.get_one::<PathBuf>("file") else {
        return Ok(EXIT_ERROR);
    };
    let value = read_json(path)?;
    let contracts = BuiltinContracts::load()?;

    let outcome = if args.get_flag("output") {
        validate(&value, &contracts.analysis)
    } else {
        validate(IncidentEnvelope::unwrap_payload(&value), &contracts.incident)
    };

    if outcome.is_valid() {
        println!("{}: valid", path.display());
        return Ok(EXIT_OK);
    }
    println!("{}: {} violation(s)", path.display(), outcome.violations().len());
    for violation in outcome.violations() {
        println!("  {violation}");
    }
    Ok(EXIT_ERROR)
}

fn print_schema(args: &ArgMatches) -> Result<u8> {
    let contracts = BuiltinContracts::load()?;
    let contract = if args.get_flag("input") {
        &contracts.incident
    } else {
        &contracts.analysis
    };
    println!("{}", serde_json::to_string_pretty(&contract.to_json_schema())?);
    Ok(EXIT_OK)
}
