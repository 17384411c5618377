//! Wires location resolution, fetch scheduling and rendering together.

use crate::api::{
    DaylightApi, GeocodeClient, Geocoder, IpLocator, PositionProvider, SunriseSunsetClient,
    build_http_client,
};
use crate::config::{Parameters, Preset};
use crate::display::DataDisplay;
use crate::error::FetchError;
use crate::location::{LocationQuery, LocationResolver};
use crate::output::write_display;
use crate::render::{Applied, RenderMode, ResultRenderer};
use crate::scheduler::{Cycle, FetchEvent, FetchScheduler};
use crate::timezone::TimezoneSpec;
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tracing::debug;
use unicode_width::UnicodeWidthStr;

pub struct Services {
    pub daylight: Arc<dyn DaylightApi>,
    pub geocoder: Arc<dyn Geocoder>,
    pub locator: Option<Arc<dyn PositionProvider>>,
}

impl Services {
    /// HTTP-backed services for the configured endpoints.
    pub fn from_params(params: &Parameters) -> Result<Self, String> {
        let client = build_http_client(params.timeout)?;
        let endpoints = &params.endpoints;

        let locator: Option<Arc<dyn PositionProvider>> = if endpoints.locate.trim().is_empty() {
            None
        } else {
            Some(Arc::new(IpLocator::new(client.clone(), &endpoints.locate)))
        };

        Ok(Self {
            daylight: Arc::new(SunriseSunsetClient::new(client.clone(), &endpoints.daylight)),
            geocoder: Arc::new(GeocodeClient::new(
                client,
                &endpoints.geocode,
                endpoints.geocode_key.clone(),
            )),
            locator,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Submitted {
    Started(Cycle),
    /// The lookup failed and its message is on the display.
    Failed(FetchError),
    /// Nothing to do (empty selection).
    Ignored,
}

pub struct Session {
    resolver: LocationResolver,
    scheduler: FetchScheduler,
    events: mpsc::UnboundedReceiver<FetchEvent>,
    renderer: ResultRenderer,
    timezone: TimezoneSpec,
}

impl Session {
    pub fn new(services: Services, params: &Parameters, timezone: TimezoneSpec) -> Self {
        let (scheduler, events) = FetchScheduler::new(
            services.daylight,
            params.mode,
            params.pacing,
            params.delay,
        );
        Self {
            resolver: LocationResolver::new(
                services.geocoder,
                services.locator,
                params.presets.clone(),
            ),
            scheduler,
            events,
            renderer: ResultRenderer::new(RenderMode::from(params.mode), params.chart),
            timezone,
        }
    }

    pub fn display(&self) -> &DataDisplay {
        self.renderer.display()
    }

    pub fn resolver(&self) -> &LocationResolver {
        &self.resolver
    }

    pub fn is_settled(&self) -> bool {
        self.renderer.is_settled()
    }

    /// Resolves `query` and, on success, replaces the running cycle with a new one.
    pub async fn submit(&mut self, query: &LocationQuery) -> Submitted {
        match self.resolver.resolve(query).await {
            Ok(coordinates) => {
                let cycle = self
                    .scheduler
                    .start_cycle(coordinates, self.timezone.today());
                self.renderer.begin_cycle(cycle);
                Submitted::Started(cycle)
            }
            Err(error) => {
                if self.renderer.present_error(&error) {
                    self.scheduler.abandon();
                    Submitted::Failed(error)
                } else {
                    Submitted::Ignored
                }
            }
        }
    }

    pub async fn next_event(&mut self) -> Option<FetchEvent> {
        self.events.recv().await
    }

    pub fn apply(&mut self, event: FetchEvent) -> Applied {
        self.renderer.apply(event)
    }

    /// Renders events until the current cycle has nothing more to show.
    pub async fn settle(&mut self) {
        while !self.renderer.is_settled() {
            match self.events.recv().await {
                Some(event) => {
                    self.renderer.apply(event);
                }
                None => break,
            }
        }
    }

    pub async fn run_query(&mut self, query: &LocationQuery) -> Submitted {
        let submitted = self.submit(query).await;
        self.settle().await;
        submitted
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PromptCommand {
    Query(LocationQuery),
    Time,
    Presets,
    Help,
    Quit,
    Unknown(String),
}

pub fn parse_prompt_line(line: &str) -> Option<PromptCommand> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let (word, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim().to_string();

    let command = match word.to_ascii_lowercase().as_str() {
        "here" => PromptCommand::Query(LocationQuery::Device),
        "select" => PromptCommand::Query(LocationQuery::Selection(rest)),
        "search" => PromptCommand::Query(LocationQuery::Search(rest)),
        "time" => PromptCommand::Time,
        "presets" => PromptCommand::Presets,
        "help" => PromptCommand::Help,
        "quit" | "exit" => PromptCommand::Quit,
        _ => PromptCommand::Unknown(word.to_string()),
    };
    Some(command)
}

const PROMPT_HELP: &str =
    "Commands: here | select <lat,lon|preset> | search <place> | time | presets | quit";

pub fn write_presets<W: Write>(presets: &[Preset], writer: &mut W) -> std::io::Result<()> {
    let width = presets
        .iter()
        .map(|p| UnicodeWidthStr::width(p.name.as_str()))
        .max()
        .unwrap_or(0);
    for preset in presets {
        writeln!(writer, "{:width$}  {}", preset.name, preset.value, width = width)?;
    }
    Ok(())
}

/// Line-driven session: every query supersedes the previous one, and each
/// settled cycle is printed once.
pub async fn run_interactive<R, W>(
    session: &mut Session,
    params: &Parameters,
    input: R,
    output: &mut W,
) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = input.lines();
    let mut printed = true;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let Some(command) = parse_prompt_line(&line) else { continue };
                match command {
                    PromptCommand::Query(query) => {
                        match session.submit(&query).await {
                            Submitted::Ignored => {}
                            Submitted::Failed(_) | Submitted::Started(_) => printed = false,
                        }
                    }
                    PromptCommand::Time => {
                        let now = session.timezone.now();
                        writeln!(output, "{}", crate::clock::format_clock(&now))?;
                    }
                    PromptCommand::Presets => write_presets(session.resolver().presets(), output)?,
                    PromptCommand::Help => writeln!(output, "{}", PROMPT_HELP)?,
                    PromptCommand::Quit => break,
                    PromptCommand::Unknown(word) => {
                        writeln!(output, "Unknown command: {}. {}", word, PROMPT_HELP)?;
                    }
                }
            }
            Some(event) = session.next_event(), if !session.is_settled() => {
                let applied = session.apply(event);
                debug!(?applied, "interactive event");
            }
        }

        if !printed && session.is_settled() {
            write_display(session.display(), params, output)?;
            output.flush()?;
            printed = true;
        }
    }

    if !printed {
        session.settle().await;
        write_display(session.display(), params, output)?;
    }
    output.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::GeocodeCandidate;
    use crate::config::{FetchMode, Pacing};
    use crate::types::{Coordinates, DayResult, FetchRequest};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;

    struct FakeDaylight {
        failing_index: Option<usize>,
        requests: Mutex<Vec<FetchRequest>>,
    }

    #[async_trait]
    impl DaylightApi for FakeDaylight {
        async fn fetch_day(&self, request: &FetchRequest) -> Result<DayResult, FetchError> {
            self.requests.lock().unwrap().push(request.clone());
            // Later days answer first.
            tokio::time::sleep(Duration::from_millis(100 * (7 - request.index as u64))).await;
            if self.failing_index == Some(request.index) {
                return Err(FetchError::ApiError("INVALID_REQUEST".into()));
            }
            Ok(DayResult {
                date: request.iso_date().unwrap_or_default(),
                sunrise: format!("{}:00:00 AM", request.index + 1),
                sunset: "8:00:00 PM".into(),
                timezone: "UTC".into(),
                ..Default::default()
            })
        }
    }

    struct FakeGeocoder;

    #[async_trait]
    impl Geocoder for FakeGeocoder {
        async fn search(&self, query: &str) -> Result<Vec<GeocodeCandidate>, FetchError> {
            if query == "Nowhere" {
                return Ok(Vec::new());
            }
            Ok(vec![GeocodeCandidate {
                lat: 1.0,
                lon: 2.0,
                display_name: Some(query.to_string()),
            }])
        }
    }

    fn session(mode: FetchMode, failing_index: Option<usize>) -> (Session, Arc<FakeDaylight>) {
        let daylight = Arc::new(FakeDaylight {
            failing_index,
            requests: Mutex::new(Vec::new()),
        });
        let params = Parameters {
            mode,
            pacing: Pacing::Offset,
            delay: Duration::from_millis(500),
            ..Default::default()
        };
        let services = Services {
            daylight: daylight.clone(),
            geocoder: Arc::new(FakeGeocoder),
            locator: None,
        };
        let tz = TimezoneSpec::Named(chrono_tz::UTC);
        (Session::new(services, &params, tz), daylight)
    }

    #[tokio::test(start_paused = true)]
    async fn test_week_query_renders_seven_ordered_days() {
        let (mut session, daylight) = session(FetchMode::Week, None);
        let submitted = session
            .run_query(&LocationQuery::Search("Paris".into()))
            .await;
        assert!(matches!(submitted, Submitted::Started(Cycle { expected: 7, .. })));

        let requests = daylight.requests.lock().unwrap().clone();
        assert_eq!(requests.len(), 7);
        assert!(requests.iter().all(|r| r.coordinates == Coordinates::new(1.0, 2.0)));

        let sunrises: Vec<String> = session
            .display()
            .blocks()
            .map(|b| b.result.sunrise.clone())
            .collect();
        assert_eq!(sunrises[0], "1:00:00 AM");
        assert_eq!(sunrises[6], "7:00:00 AM");
    }

    #[tokio::test(start_paused = true)]
    async fn test_api_failure_shows_only_error() {
        let (mut session, _) = session(FetchMode::Week, Some(3));
        session
            .run_query(&LocationQuery::Selection("52.0,13.4".into()))
            .await;
        let display = session.display();
        assert_eq!(display.message(), Some("Error fetching data."));
        assert_eq!(display.blocks().count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_found_and_empty_selection() {
        let (mut session, daylight) = session(FetchMode::Today, None);

        let submitted = session
            .run_query(&LocationQuery::Search("Nowhere".into()))
            .await;
        assert!(matches!(submitted, Submitted::Failed(FetchError::LocationNotFound(_))));
        assert_eq!(session.display().message(), Some("Location not found."));

        let (mut fresh, _) = self::session(FetchMode::Today, None);
        let submitted = fresh.run_query(&LocationQuery::Selection(String::new())).await;
        assert_eq!(submitted, Submitted::Ignored);
        assert!(fresh.display().is_empty());
        assert!(daylight.requests.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_device_without_locator() {
        let (mut session, _) = session(FetchMode::Today, None);
        session.run_query(&LocationQuery::Device).await;
        assert_eq!(
            session.display().message(),
            Some("Geolocation is not available.")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_pair_query_twice_is_idempotent() {
        let (mut session, daylight) = session(FetchMode::Pair, None);
        let query = LocationQuery::Selection("Berlin".into());

        session.run_query(&query).await;
        let first = session.display().clone();
        session.run_query(&query).await;

        assert_eq!(session.display(), &first);
        assert_eq!(first.fields().len(), 12);
        assert_eq!(first.timezone(), Some("UTC"));
        assert_eq!(daylight.requests.lock().unwrap().len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_superseded_cycle_does_not_leak_into_display() {
        let (mut session, _) = session(FetchMode::Week, None);
        session
            .submit(&LocationQuery::Selection("10,10".into()))
            .await;
        tokio::time::sleep(Duration::from_millis(900)).await;
        session.run_query(&LocationQuery::Search("Paris".into())).await;

        // Let every late response of the first cycle arrive.
        tokio::time::sleep(Duration::from_secs(5)).await;
        while let Ok(event) = session.events.try_recv() {
            assert_eq!(session.apply(event), Applied::Dropped);
        }
        assert_eq!(session.display().blocks().count(), 7);
    }

    #[test]
    fn test_parse_prompt_line() {
        assert_eq!(parse_prompt_line("   "), None);
        assert_eq!(
            parse_prompt_line("search  New York "),
            Some(PromptCommand::Query(LocationQuery::Search("New York".into())))
        );
        assert_eq!(
            parse_prompt_line("select"),
            Some(PromptCommand::Query(LocationQuery::Selection(String::new())))
        );
        assert_eq!(
            parse_prompt_line("HERE"),
            Some(PromptCommand::Query(LocationQuery::Device))
        );
        assert_eq!(parse_prompt_line("exit"), Some(PromptCommand::Quit));
        assert_eq!(
            parse_prompt_line("dance now"),
            Some(PromptCommand::Unknown("dance".into()))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_interactive_prints_each_settled_query() {
        let (mut session, _) = session(FetchMode::Today, None);
        let params = Parameters {
            mode: FetchMode::Today,
            icons: false,
            ..Default::default()
        };
        let input: &[u8] = b"bogus\nsearch Nowhere\nselect\nselect 1,2\n";
        let mut output = Vec::new();

        run_interactive(&mut session, &params, input, &mut output)
            .await
            .unwrap();

        let text = String::from_utf8(output).unwrap();
        let unknown = text.find("Unknown command: bogus").unwrap();
        let not_found = text.find("Location not found.").unwrap();
        let today = text.find("Today:").unwrap();
        assert!(unknown < not_found && not_found < today);
        assert!(text.contains("1:00:00 AM"));
    }
}
