//! Command-line parsing and validation.

use crate::config::{
    CONFIG_ENV, FetchMode, OutputFormat, Pacing, Parameters, load_config_file,
};
use crate::error::CliError;
use crate::location::LocationQuery;
use crate::timezone::resolve_timezone;
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

type CliResult<T> = Result<T, CliError>;

type ApplyFn = fn(&str, &mut Parameters) -> CliResult<()>;

enum OptKind {
    Value(ApplyFn),
    Flag(ApplyFn),
}

struct OptionSpec {
    name: &'static str,
    kind: OptKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Fetch(LocationQuery),
    Interactive,
    Clock,
    Presets,
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Command::Fetch(LocationQuery::Device) => "here",
            Command::Fetch(LocationQuery::Selection(_)) => "select",
            Command::Fetch(LocationQuery::Search(_)) => "search",
            Command::Interactive => "interactive",
            Command::Clock => "clock",
            Command::Presets => "presets",
        }
    }
}

const OPTION_SPECS: &[OptionSpec] = &[
    OptionSpec {
        name: "mode",
        kind: OptKind::Value(|value, params| {
            params.mode = value.parse::<FetchMode>().map_err(CliError::from)?;
            Ok(())
        }),
    },
    OptionSpec {
        name: "pacing",
        kind: OptKind::Value(|value, params| {
            params.pacing = value.parse::<Pacing>().map_err(CliError::from)?;
            Ok(())
        }),
    },
    OptionSpec {
        name: "delay",
        kind: OptKind::Value(|value, params| {
            params.delay = Duration::from_millis(parse_u64("delay", value)?);
            Ok(())
        }),
    },
    OptionSpec {
        name: "timeout",
        kind: OptKind::Value(|value, params| {
            let secs = parse_u64("timeout", value)?;
            if secs == 0 {
                return Err("Timeout must be positive".into());
            }
            params.timeout = Duration::from_secs(secs);
            Ok(())
        }),
    },
    OptionSpec {
        name: "format",
        kind: OptKind::Value(|value, params| {
            params.format = value.parse::<OutputFormat>().map_err(CliError::from)?;
            Ok(())
        }),
    },
    OptionSpec {
        name: "timezone",
        kind: OptKind::Value(|value, params| {
            resolve_timezone(Some(value)).map_err(CliError::from)?;
            params.timezone = Some(value.to_string());
            Ok(())
        }),
    },
    OptionSpec {
        name: "daylight-url",
        kind: OptKind::Value(|value, params| {
            params.endpoints.daylight = value.to_string();
            Ok(())
        }),
    },
    OptionSpec {
        name: "geocode-url",
        kind: OptKind::Value(|value, params| {
            params.endpoints.geocode = value.to_string();
            Ok(())
        }),
    },
    OptionSpec {
        name: "geocode-key",
        kind: OptKind::Value(|value, params| {
            params.endpoints.geocode_key = (!value.is_empty()).then(|| value.to_string());
            Ok(())
        }),
    },
    OptionSpec {
        name: "locate-url",
        kind: OptKind::Value(|value, params| {
            params.endpoints.locate = value.to_string();
            Ok(())
        }),
    },
    OptionSpec {
        name: "log",
        kind: OptKind::Value(|value, params| {
            params.log_filter = Some(value.to_string());
            Ok(())
        }),
    },
    OptionSpec {
        name: "count",
        kind: OptKind::Value(|value, params| {
            params.clock_count = parse_u64("count", value)?;
            Ok(())
        }),
    },
    // Loaded before every other option; listed so it validates like the rest.
    OptionSpec {
        name: "config",
        kind: OptKind::Value(|_, _| Ok(())),
    },
    OptionSpec {
        name: "chart",
        kind: OptKind::Flag(|_, params| {
            params.chart = true;
            Ok(())
        }),
    },
    OptionSpec {
        name: "no-chart",
        kind: OptKind::Flag(|_, params| {
            params.chart = false;
            Ok(())
        }),
    },
    OptionSpec {
        name: "headers",
        kind: OptKind::Flag(|_, params| {
            params.headers = true;
            Ok(())
        }),
    },
    OptionSpec {
        name: "no-headers",
        kind: OptKind::Flag(|_, params| {
            params.headers = false;
            Ok(())
        }),
    },
    OptionSpec {
        name: "icons",
        kind: OptKind::Flag(|_, params| {
            params.icons = true;
            Ok(())
        }),
    },
    OptionSpec {
        name: "no-icons",
        kind: OptKind::Flag(|_, params| {
            params.icons = false;
            Ok(())
        }),
    },
    OptionSpec {
        name: "help",
        kind: OptKind::Flag(|_, _| Err(CliError::Exit(get_help_text()))),
    },
    OptionSpec {
        name: "version",
        kind: OptKind::Flag(|_, _| Err(CliError::Exit(get_version_text()))),
    },
];

pub fn parse_cli(args: Vec<String>) -> CliResult<(Command, Parameters)> {
    parse_cli_with_config(args, std::env::var(CONFIG_ENV).ok())
}

/// Parses `args`, loading `--config` (or `env_config` when absent) before
/// applying the remaining options on top of it.
pub fn parse_cli_with_config(
    args: Vec<String>,
    env_config: Option<String>,
) -> CliResult<(Command, Parameters)> {
    if args.len() < 2 {
        return Err(CliError::Exit(usage_text()));
    }

    let mut options = Vec::new();
    let mut positional = Vec::new();
    for arg in args.into_iter().skip(1) {
        if let Some(stripped) = arg.strip_prefix("--") {
            let (name, value) = stripped
                .split_once('=')
                .map(|(n, v)| (n.to_string(), Some(v.to_string())))
                .unwrap_or((stripped.to_string(), None));
            options.push((name, value));
        } else {
            positional.push(arg);
        }
    }

    let mut params = Parameters::default();
    let config_path = options
        .iter()
        .rev()
        .find(|(name, _)| name == "config")
        .and_then(|(_, value)| value.clone())
        .or(env_config.filter(|path| !path.is_empty()));
    if let Some(path) = config_path {
        let file = load_config_file(Path::new(&path))?;
        params.apply_file(file)?;
    }

    let mut applied: HashSet<&'static str> = HashSet::new();
    for (name, value) in &options {
        apply_option(name, value.as_deref(), &mut params, &mut applied)?;
    }

    if let Some(first) = positional.first()
        && first == "help"
    {
        let message = positional
            .get(1)
            .map(|command| get_command_help(command))
            .unwrap_or_else(get_help_text);
        return Err(CliError::Exit(message));
    }

    let command = parse_positional_args(&positional)?;
    validate_command_options(&command, &applied)?;

    Ok((command, params))
}

fn parse_u64(label: &str, value: &str) -> CliResult<u64> {
    value
        .parse::<u64>()
        .map_err(|_| CliError::from(format!("Invalid {} value: {}", label, value)))
}

fn apply_option(
    name: &str,
    value: Option<&str>,
    params: &mut Parameters,
    applied: &mut HashSet<&'static str>,
) -> CliResult<()> {
    let Some(spec) = OPTION_SPECS.iter().find(|s| s.name == name) else {
        return Err(format!("Unknown option: --{}", name).into());
    };

    match spec.kind {
        OptKind::Value(handler) => {
            let val = required_value(spec.name, value)?;
            handler(val, params)?;
        }
        OptKind::Flag(handler) => {
            if value.is_some() {
                return Err(format!("Option --{} does not take a value", spec.name).into());
            }
            handler("", params)?;
        }
    }

    applied.insert(spec.name);
    Ok(())
}

fn required_value<'a>(flag: &'static str, value: Option<&'a str>) -> CliResult<&'a str> {
    value.ok_or_else(|| CliError::from(format!("Option --{} requires a value", flag)))
}

fn parse_positional_args(positional: &[String]) -> CliResult<Command> {
    let Some((command, rest)) = positional.split_first() else {
        return Err(CliError::Exit(usage_text()));
    };
    // Place names and preset names may contain spaces.
    let joined = rest.join(" ");

    let takes_no_arguments = |command: Command| -> CliResult<Command> {
        if rest.is_empty() {
            Ok(command)
        } else {
            Err(format!("Unexpected argument for {}: {}", command.name(), joined).into())
        }
    };

    match command.as_str() {
        "here" => takes_no_arguments(Command::Fetch(LocationQuery::Device)),
        "select" => Ok(Command::Fetch(LocationQuery::Selection(joined))),
        "search" => Ok(Command::Fetch(LocationQuery::Search(joined))),
        "interactive" => takes_no_arguments(Command::Interactive),
        "clock" => takes_no_arguments(Command::Clock),
        "presets" => takes_no_arguments(Command::Presets),
        other => Err(format!("Unknown command: {}", other).into()),
    }
}

fn validate_command_options(command: &Command, applied: &HashSet<&'static str>) -> CliResult<()> {
    if *command != Command::Clock && applied.contains("count") {
        return Err(format!("Option --count not valid for {} command", command.name()).into());
    }
    Ok(())
}

fn usage_text() -> String {
    "Usage: sunfetch [OPTIONS] <here|select|search|interactive|clock|presets> [ARGS]".to_string()
}

fn get_version_text() -> String {
    format!(
        "sunfetch {}\n Build: {} ({})\n Built: {}",
        env!("CARGO_PKG_VERSION"),
        env!("BUILD_PROFILE"),
        env!("BUILD_TARGET"),
        env!("BUILD_DATE"),
    )
}

fn get_help_text() -> String {
    let defaults = Parameters::default();
    format!(
        r#"sunfetch {}
Shows sunrise, sunset, dawn, dusk, day length and solar noon for a location.

Usage:
  sunfetch [OPTIONS] here
  sunfetch [OPTIONS] select <lat,lon|preset>
  sunfetch [OPTIONS] search <place name>
  sunfetch [OPTIONS] interactive
  sunfetch [OPTIONS] clock
  sunfetch presets

Examples:
  sunfetch select 52.52,13.405
  sunfetch select Berlin --mode=pair
  sunfetch search Lisbon --chart
  sunfetch here --mode=today --format=json

Options:
  --mode=<mode>         Days to fetch: {}. Default: {}
  --pacing=<pacing>     Week request pacing: {}. Default: {}
  --delay=<ms>          Delay between week requests in milliseconds. Default: {}
  --[no-]chart          Add a daylight chart. Default: {}
  --format=<format>     Output format: {}. Default: {}
  --[no-]headers        Include headers in CSV output. Default: {}
  --[no-]icons          Show icons next to labels in text output. Default: {}
  --timezone=<tz>       Timezone offset (+01:00) or IANA name (Europe/Berlin)
                        deciding which day is today. Default: system timezone
  --timeout=<seconds>   HTTP request timeout. Default: {}
  --daylight-url=<url>  Daylight service endpoint.
  --geocode-url=<url>   Geocoding service endpoint.
  --geocode-key=<key>   API key for the geocoding service.
  --locate-url=<url>    Device position endpoint; empty disables 'here'.
  --config=<file>       TOML configuration file (also ${}).
  --log=<filter>        Log filter for stderr diagnostics (also $SUNFETCH_LOG).
  --help                Show this help message and exit.
  --version             Print version information and exit.

Commands:
  here                  Data for the current device position.
  select                Data for coordinates or a predefined location.
  search                Data for the first match of a place search.
  interactive           Read commands from stdin; each query replaces the last.
  clock                 Show a self-refreshing date and time.
  presets               List predefined locations.

Run 'sunfetch help <command>' for command-specific details.
"#,
        env!("CARGO_PKG_VERSION"),
        FetchMode::all().join(", "),
        defaults.mode,
        Pacing::all().join(", "),
        defaults.pacing,
        defaults.delay.as_millis(),
        defaults.chart,
        OutputFormat::all().join(", "),
        defaults.format,
        defaults.headers,
        defaults.icons,
        defaults.timeout.as_secs(),
        CONFIG_ENV,
    )
}

fn get_command_help(command: &str) -> String {
    match command {
        "here" => r#"Usage:
  sunfetch [OPTIONS] here

Looks up the current position through the locate endpoint and fetches
daylight data for it. Prints "Geolocation is not available." when the
position cannot be determined.
"#
        .to_string(),
        "select" => r#"Usage:
  sunfetch [OPTIONS] select <lat,lon|preset>

Fetches daylight data for a "lat,lon" pair or a preset name
(case-insensitive). An empty selection does nothing.

Examples:
  sunfetch select 40.7128,-74.0060
  sunfetch select "Cape Town"
"#
        .to_string(),
        "search" => r#"Usage:
  sunfetch [OPTIONS] search <place name>

Geocodes the place name and fetches daylight data for the first match.
Prints "Location not found." when nothing matches.
"#
        .to_string(),
        "interactive" => r#"Usage:
  sunfetch [OPTIONS] interactive

Prompt commands:
  here | select <lat,lon|preset> | search <place> | time | presets | help | quit

A new query abandons the previous one; results are printed once complete.
"#
        .to_string(),
        "clock" => format!(
            r#"Usage:
  sunfetch [OPTIONS] clock

Options:
  --count=<n>           Stop after n refreshes. Default: {} (run until interrupted)
"#,
            Parameters::default().clock_count
        ),
        "presets" => r#"Usage:
  sunfetch [OPTIONS] presets

Lists predefined locations, including those added by the config file.
"#
        .to_string(),
        _ => format!(
            "Unknown command: {}\n\nRun 'sunfetch --help' for usage.",
            command
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        std::iter::once("sunfetch")
            .chain(list.iter().copied())
            .map(String::from)
            .collect()
    }

    fn parse(list: &[&str]) -> CliResult<(Command, Parameters)> {
        parse_cli_with_config(args(list), None)
    }

    fn message(result: CliResult<(Command, Parameters)>) -> String {
        match result {
            Err(CliError::Message(m)) => m,
            Err(CliError::Exit(m)) => panic!("unexpected exit: {}", m),
            Ok(_) => panic!("expected an error"),
        }
    }

    #[test]
    fn test_commands() {
        let (command, _) = parse(&["select", "Cape", "Town"]).unwrap();
        assert_eq!(
            command,
            Command::Fetch(LocationQuery::Selection("Cape Town".into()))
        );
        let (command, _) = parse(&["select"]).unwrap();
        assert_eq!(command, Command::Fetch(LocationQuery::Selection(String::new())));
        let (command, _) = parse(&["--mode=pair", "here"]).unwrap();
        assert_eq!(command, Command::Fetch(LocationQuery::Device));
        assert!(matches!(parse(&["presets"]), Ok((Command::Presets, _))));
    }

    #[test]
    fn test_options_apply() {
        let (_, params) = parse(&[
            "search",
            "Oslo",
            "--mode=today",
            "--pacing=sequential",
            "--delay=0",
            "--chart",
            "--format=csv",
            "--no-headers",
            "--no-icons",
            "--timeout=3",
            "--locate-url=",
            "--timezone=+02:00",
        ])
        .unwrap();
        assert_eq!(params.mode, FetchMode::Today);
        assert_eq!(params.pacing, Pacing::Sequential);
        assert_eq!(params.delay, Duration::ZERO);
        assert!(params.chart);
        assert_eq!(params.format, OutputFormat::Csv);
        assert!(!params.headers);
        assert!(!params.icons);
        assert_eq!(params.timeout, Duration::from_secs(3));
        assert_eq!(params.endpoints.locate, "");
        assert_eq!(params.timezone.as_deref(), Some("+02:00"));
    }

    #[test]
    fn test_option_errors() {
        assert_eq!(message(parse(&["here", "--bogus"])), "Unknown option: --bogus");
        assert_eq!(
            message(parse(&["here", "--mode"])),
            "Option --mode requires a value"
        );
        assert_eq!(
            message(parse(&["here", "--chart=yes"])),
            "Option --chart does not take a value"
        );
        assert_eq!(
            message(parse(&["here", "--delay=soon"])),
            "Invalid delay value: soon"
        );
        assert_eq!(
            message(parse(&["here", "--count=3"])),
            "Option --count not valid for here command"
        );
        assert_eq!(message(parse(&["dance"])), "Unknown command: dance");
        assert!(message(parse(&["here", "now"])).starts_with("Unexpected argument"));
    }

    #[test]
    fn test_help_and_usage_exit() {
        assert!(matches!(parse(&[]), Err(CliError::Exit(m)) if m.starts_with("Usage: ")));
        assert!(matches!(
            parse(&["--help"]),
            Err(CliError::Exit(m)) if m.starts_with("sunfetch ")
        ));
        assert!(matches!(
            parse(&["help", "select"]),
            Err(CliError::Exit(m)) if m.contains("preset name")
        ));
    }

    #[test]
    fn test_config_file_then_options() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sunfetch.toml");
        std::fs::write(&path, "mode = \"pair\"\ndelay_ms = 50\nchart = true\n").unwrap();

        let config = format!("--config={}", path.display());
        let (_, params) = parse(&[config.as_str(), "--delay=10", "here"]).unwrap();
        assert_eq!(params.mode, FetchMode::Pair);
        assert_eq!(params.delay, Duration::from_millis(10));
        assert!(params.chart);

        let (_, params) =
            parse_cli_with_config(args(&["here"]), Some(path.display().to_string())).unwrap();
        assert_eq!(params.mode, FetchMode::Pair);

        let missing = dir.path().join("missing.toml");
        let config = format!("--config={}", missing.display());
        assert!(message(parse(&[config.as_str(), "here"])).starts_with("Cannot read config file"));
    }
}
