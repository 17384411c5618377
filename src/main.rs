//! Daylight viewer CLI - entry point and exit status handling.

use std::io::Write;
use sunfetch::cli::{self, Command};
use sunfetch::clock::run_clock;
use sunfetch::config::Parameters;
use sunfetch::error::CliError;
use sunfetch::location::LocationQuery;
use sunfetch::logging;
use sunfetch::output::write_display;
use sunfetch::session::{Services, Session, Submitted, run_interactive, write_presets};
use sunfetch::timezone::resolve_timezone;
use tracing::debug;

fn main() {
    let args: Vec<String> = std::env::args().collect();

    let (command, params) = match cli::parse_cli(args) {
        Ok(parsed) => parsed,
        Err(CliError::Exit(message)) => {
            println!("{}", message);
            std::process::exit(0);
        }
        Err(CliError::Message(message)) => {
            eprintln!("Error: {}", message);
            std::process::exit(1);
        }
    };

    if let Err(err) = logging::init(params.log_filter.as_deref()) {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("Error: Cannot start runtime: {}", err);
            std::process::exit(1);
        }
    };

    let code = match runtime.block_on(run(command, &params)) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {}", err);
            1
        }
    };
    std::process::exit(code);
}

async fn run(command: Command, params: &Parameters) -> Result<i32, String> {
    let timezone = resolve_timezone(params.timezone.as_deref())?;
    let mut stdout = std::io::stdout().lock();

    match command {
        Command::Presets => {
            write_presets(&params.presets, &mut stdout).map_err(|e| e.to_string())?;
            Ok(0)
        }
        Command::Clock => {
            run_clock(timezone, params.clock_count, &mut stdout)
                .await
                .map_err(|e| e.to_string())?;
            Ok(0)
        }
        Command::Interactive => {
            let services = Services::from_params(params)?;
            let mut session = Session::new(services, params, timezone);
            let input = tokio::io::BufReader::new(tokio::io::stdin());
            run_interactive(&mut session, params, input, &mut stdout)
                .await
                .map_err(|e| e.to_string())?;
            Ok(0)
        }
        Command::Fetch(query) => {
            let services = Services::from_params(params)?;
            let mut session = Session::new(services, params, timezone);
            run_fetch(&mut session, params, &query, &mut stdout).await
        }
    }
}

/// Results go to stdout; a failure prints only its message to stderr.
async fn run_fetch<W: Write>(
    session: &mut Session,
    params: &Parameters,
    query: &LocationQuery,
    stdout: &mut W,
) -> Result<i32, String> {
    let submitted = session.run_query(query).await;
    debug!(?submitted, "query finished");

    if submitted == Submitted::Ignored {
        return Ok(0);
    }
    if let Some(message) = session.display().message() {
        eprintln!("{}", message);
        return Ok(1);
    }

    write_display(session.display(), params, stdout).map_err(|e| e.to_string())?;
    stdout.flush().map_err(|e| e.to_string())?;
    Ok(0)
}
