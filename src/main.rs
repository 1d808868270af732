mod debug_report;

use attrsel::{Options, ServiceDetails, Session};
use serde_json::json;
use std::io::{self, IsTerminal, Read};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const LOG_ENV: &str = "ATTRSEL_LOG";

fn main() {
    let config = match parse_args() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(2);
        }
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| "warn".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let details = match read_source(&config.source).and_then(|text| {
        ServiceDetails::from_json(&text).map_err(|err| format!("error: {}: {err}", config.source))
    }) {
        Ok(details) => details,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    };

    let mut session = Session::load_with(details, config.options);
    let mut outcomes = Vec::with_capacity(config.selections.len());
    for (attribute, option_id) in &config.selections {
        let transition = session.select(attribute, option_id);
        if transition.is_none() {
            tracing::warn!(attribute = %attribute, option_id = %option_id, "selection rejected");
        }
        outcomes.push((attribute.as_str(), option_id.as_str(), transition));
    }

    if config.json {
        let report = json!({
            "filters": session.filters(),
            "validation": session.validation(),
            "ready": session.is_ready(),
            "segment_query": session.segment_query(),
            "booking": session.booking_request(),
            "diagnostics": session.diagnostics().collect::<Vec<_>>(),
        });
        match serde_json::to_string_pretty(&report) {
            Ok(text) => println!("{text}"),
            Err(err) => {
                eprintln!("error: failed to encode report: {err}");
                std::process::exit(1);
            }
        }
    } else {
        debug_report::print_session(&config.source, &session, &outcomes, config.color);
    }
}

struct CliConfig {
    source: String,
    selections: Vec<(String, String)>,
    options: Options,
    json: bool,
    color: bool,
}

fn parse_args() -> Result<CliConfig, String> {
    let mut source: Option<String> = None;
    let mut selections = Vec::new();
    let mut options = Options::default();
    let mut json = false;
    let mut color = io::stdout().is_terminal();
    let mut args = std::env::args().skip(1);

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "-V" | "--version" => {
                println!("attrsel {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--color" => color = true,
            "--no-color" => color = false,
            "--json" => json = true,
            "--auto-select" => options.auto_select = true,
            "--require-segment" => options.require_segment = true,
            "--select" | "-s" => {
                let value = args.next().ok_or_else(|| "error: --select expects NAME=ID".to_string())?;
                selections.push(parse_selection(&value)?);
            }
            "--canonical" => {
                let value = args.next().ok_or_else(|| "error: --canonical expects a value".to_string())?;
                options.canonical_tokens.push(value);
            }
            _ if arg.starts_with("--select=") => {
                selections.push(parse_selection(arg.trim_start_matches("--select="))?);
            }
            _ if arg.starts_with("--canonical=") => {
                options.canonical_tokens.push(arg.trim_start_matches("--canonical=").to_string());
            }
            "-" => set_source(&mut source, arg)?,
            _ if arg.starts_with('-') => {
                return Err(format!("error: unknown option '{arg}'"));
            }
            _ => set_source(&mut source, arg)?,
        }
    }

    // Without a path, read stdin.
    let source = source.unwrap_or_else(|| "-".to_string());

    Ok(CliConfig { source, selections, options, json, color })
}

fn set_source(source: &mut Option<String>, value: String) -> Result<(), String> {
    if source.is_some() {
        return Err("error: input provided multiple times".to_string());
    }
    *source = Some(value);
    Ok(())
}

/// `NAME=ID`; the name may itself contain `=`, so split on the last one. An
/// empty id clears.
fn parse_selection(value: &str) -> Result<(String, String), String> {
    let (name, id) =
        value.rsplit_once('=').ok_or_else(|| format!("error: invalid --select '{value}' (expected NAME=ID)"))?;
    if name.trim().is_empty() {
        return Err(format!("error: invalid --select '{value}' (empty attribute name)"));
    }
    Ok((name.to_string(), id.to_string()))
}

fn read_source(source: &str) -> Result<String, String> {
    if source == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer).map_err(|err| format!("error: failed to read stdin: {err}"))?;
        return Ok(buffer);
    }
    std::fs::read_to_string(source).map_err(|err| format!("error: failed to read {source}: {err}"))
}

fn print_help() {
    println!("{}", help_text());
}

fn help_text() -> String {
    format!(
        "attrsel {version}

Service attribute selection engine CLI.

Reads a service-details JSON document (an object with an `attributes` map),
applies the given selections in order and prints the resulting state.

Usage:
  attrsel [OPTIONS] [<details.json> | -]

Options:
  -s, --select <NAME=ID>     Choose ID for an attribute, a revealed level or
                             serviceSegments. Repeatable; an empty ID clears.
  --auto-select              Pick defaults for everything left unselected.
  --canonical <token>        Preferred name fragment for --auto-select.
                             Repeatable; tried before the built-in tokens.
  --require-segment          Treat a missing segment as not ready.
  --json                     Print filters, validation and payloads as JSON.
  --color                    Force ANSI color output.
  --no-color                 Disable ANSI color output.
  -h, --help                 Show this help message.
  -V, --version              Print version information.

Environment:
  {log_env}                Log filter (tracing directives). Default: warn

Exit codes:
  0  Success.
  1  Input could not be read or decoded.
  2  Invalid arguments.
",
        version = env!("CARGO_PKG_VERSION"),
        log_env = LOG_ENV,
    )
}
