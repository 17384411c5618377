#![allow(dead_code)]

use assert_cmd::Command;
use axum::Router;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, response::IntoResponse};
use predicates::prelude::*;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Test helper for running sunfetch commands with less boilerplate
pub struct SunfetchTest {
    cmd: Command,
}

pub fn sunfetch_command() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("sunfetch"));
    cmd.env_remove("SUNFETCH_CONFIG")
        .env_remove("SUNFETCH_LOG")
        .env("TZ", "UTC");
    cmd
}

impl SunfetchTest {
    pub fn new() -> Self {
        Self {
            cmd: sunfetch_command(),
        }
    }

    /// Command pointed at `server` for every endpoint, without request pacing.
    pub fn against(server: &MockServer) -> Self {
        Self::new().args([
            format!("--daylight-url={}", server.url("/json")),
            format!("--geocode-url={}", server.url("/search")),
            format!("--locate-url={}", server.url("/locate")),
            "--delay=0".to_string(),
            "--no-icons".to_string(),
        ])
    }

    /// Add arguments to the command
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<std::ffi::OsStr>,
    {
        self.cmd.args(args);
        self
    }

    /// Add a single argument to the command
    pub fn arg<S: AsRef<std::ffi::OsStr>>(mut self, arg: S) -> Self {
        self.cmd.arg(arg);
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.cmd.env(key, value);
        self
    }

    pub fn stdin(mut self, input: &str) -> Self {
        self.cmd.write_stdin(input.to_string());
        self
    }

    /// Assert the command succeeds
    pub fn assert_success(mut self) -> assert_cmd::assert::Assert {
        self.cmd.assert().success()
    }

    /// Assert the command succeeds and contains text in stdout
    pub fn assert_success_contains(mut self, text: &str) -> assert_cmd::assert::Assert {
        self.cmd
            .assert()
            .success()
            .stdout(predicate::str::contains(text))
    }

    /// Assert the command succeeds and contains all texts in stdout
    pub fn assert_success_contains_all(mut self, texts: &[&str]) -> assert_cmd::assert::Assert {
        let mut assertion = self.cmd.assert().success();
        for text in texts {
            assertion = assertion.stdout(predicate::str::contains(*text));
        }
        assertion
    }

    /// Assert the command fails with exactly `message` on stderr and nothing on stdout
    pub fn assert_user_error(mut self, message: &str) -> assert_cmd::assert::Assert {
        self.cmd
            .assert()
            .failure()
            .code(1)
            .stdout(predicate::str::is_empty())
            .stderr(predicate::str::diff(format!("{}\n", message)))
    }

    /// Assert the command fails
    pub fn assert_failure(mut self) -> assert_cmd::assert::Assert {
        self.cmd.assert().failure()
    }

    /// Get command output for inspection
    pub fn get_output(mut self) -> std::process::Output {
        self.cmd.output().unwrap()
    }

    pub fn stdout_json(self) -> Value {
        let output = self.get_output();
        assert!(output.status.success(), "command failed: {:?}", output);
        serde_json::from_slice(&output.stdout).unwrap()
    }
}

/// Requests seen by the mock services.
#[derive(Clone, Default)]
pub struct Recorded {
    pub daylight: Arc<Mutex<Vec<HashMap<String, String>>>>,
    pub geocode: Arc<Mutex<Vec<HashMap<String, String>>>>,
    pub locate: Arc<Mutex<usize>>,
}

/// Local stand-in for the daylight, geocoding and IP-location services.
///
/// - `/json`: latitude `-1` answers `INVALID_REQUEST`, `-2` answers non-JSON,
///   anything else succeeds and echoes the requested date.
/// - `/search`: `Nowhere` has no candidates, `Broken` fails with HTTP 500.
/// - `/locate`: Berlin.
pub struct MockServer {
    base: String,
    pub recorded: Recorded,
}

impl MockServer {
    pub fn start() -> Self {
        let recorded = Recorded::default();
        let app = Router::new()
            .route("/json", get(daylight))
            .route("/search", get(search))
            .route("/locate", get(locate))
            .route("/unlocatable", get(unlocatable))
            .with_state(recorded.clone());

        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.set_nonblocking(true).unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());

        std::thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .worker_threads(1)
                .enable_all()
                .build()
                .unwrap();
            runtime.block_on(async move {
                let listener = tokio::net::TcpListener::from_std(listener).unwrap();
                axum::serve(listener, app).await.unwrap();
            });
        });

        Self { base, recorded }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    pub fn daylight_requests(&self) -> Vec<HashMap<String, String>> {
        self.recorded.daylight.lock().unwrap().clone()
    }

    pub fn geocode_requests(&self) -> Vec<HashMap<String, String>> {
        self.recorded.geocode.lock().unwrap().clone()
    }

    pub fn locate_requests(&self) -> usize {
        *self.recorded.locate.lock().unwrap()
    }
}

pub const MOCK_SUNRISE: &str = "5:43:18 AM";
pub const MOCK_SUNSET: &str = "9:33:21 PM";
pub const MOCK_TIMEZONE: &str = "Europe/Berlin";

async fn daylight(
    State(recorded): State<Recorded>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    recorded.daylight.lock().unwrap().push(params.clone());

    match params.get("lat").map(String::as_str) {
        Some("-1") => (
            StatusCode::BAD_REQUEST,
            Json(json!({"results": "", "status": "INVALID_REQUEST"})),
        )
            .into_response(),
        Some("-2") => (StatusCode::BAD_GATEWAY, "upstream down").into_response(),
        _ => {
            let date = params
                .get("date")
                .cloned()
                .unwrap_or_else(|| "2024-06-21".to_string());
            Json(json!({
                "results": {
                    "date": date,
                    "sunrise": MOCK_SUNRISE,
                    "sunset": MOCK_SUNSET,
                    "first_light": null,
                    "last_light": null,
                    "dawn": "4:58:52 AM",
                    "dusk": "10:17:47 PM",
                    "solar_noon": "1:38:20 PM",
                    "golden_hour": "8:46:11 PM",
                    "day_length": "15:50:03",
                    "timezone": MOCK_TIMEZONE,
                    "utc_offset": 120
                },
                "status": "OK"
            }))
            .into_response()
        }
    }
}

async fn search(
    State(recorded): State<Recorded>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    recorded.geocode.lock().unwrap().push(params.clone());

    match params.get("q").map(String::as_str) {
        Some("Nowhere") => Json(json!([])).into_response(),
        Some("Broken") => (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response(),
        _ => Json(json!([
            {"lat": "52.5170365", "lon": "13.3888599", "display_name": "Berlin, Deutschland"},
            {"lat": 40.0, "lon": -3.0, "display_name": "Somewhere else"}
        ]))
        .into_response(),
    }
}

async fn locate(State(recorded): State<Recorded>) -> Json<Value> {
    *recorded.locate.lock().unwrap() += 1;
    Json(json!({"ip": "192.0.2.1", "latitude": 52.52, "longitude": 13.405}))
}

async fn unlocatable() -> Json<Value> {
    Json(json!({"error": true, "reason": "Reserved IP Address"}))
}

/// Today's date in UTC, matching the `TZ=UTC` every test command runs with.
pub fn today() -> chrono::NaiveDate {
    chrono::Utc::now().date_naive()
}
