//! Issues the dated requests of a fetch cycle and forwards each outcome.
//!
//! Every cycle takes the next value of a shared generation counter. Dispatches
//! of an abandoned cycle are skipped, and the receiving side drops events whose
//! cycle is no longer current, so a new location query fully supersedes the
//! previous one even though already-issued requests still complete.

use crate::api::DaylightApi;
use crate::config::{FetchMode, Pacing};
use crate::error::FetchError;
use crate::types::{Coordinates, DayResult, FetchRequest};
use chrono::{Days, NaiveDate};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, sleep, sleep_until};
use tracing::{debug, info};

pub const WEEK_DAYS: u64 = 7;

#[derive(Debug)]
pub struct FetchEvent {
    pub cycle: u64,
    pub request: FetchRequest,
    pub outcome: Result<DayResult, FetchError>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cycle {
    pub id: u64,
    /// Number of events a fully completed cycle delivers.
    pub expected: usize,
}

#[derive(Clone)]
struct CycleToken {
    generation: Arc<AtomicU64>,
    id: u64,
}

impl CycleToken {
    fn is_current(&self) -> bool {
        self.generation.load(Ordering::SeqCst) == self.id
    }
}

#[derive(Clone)]
struct Dispatcher {
    api: Arc<dyn DaylightApi>,
    events: mpsc::UnboundedSender<FetchEvent>,
    token: CycleToken,
}

impl Dispatcher {
    async fn fetch(&self, request: FetchRequest) {
        if !self.token.is_current() {
            debug!(
                cycle = self.token.id,
                index = request.index,
                "cycle abandoned, skipping dispatch"
            );
            return;
        }

        debug!(
            cycle = self.token.id,
            index = request.index,
            label = %request.label,
            "dispatching"
        );
        let outcome = self.api.fetch_day(&request).await;
        debug!(
            cycle = self.token.id,
            index = request.index,
            ok = outcome.is_ok(),
            "request finished"
        );

        let event = FetchEvent {
            cycle: self.token.id,
            request,
            outcome,
        };
        if self.events.send(event).is_err() {
            debug!(cycle = self.token.id, "event receiver gone");
        }
    }
}

pub struct FetchScheduler {
    api: Arc<dyn DaylightApi>,
    mode: FetchMode,
    pacing: Pacing,
    delay: Duration,
    generation: Arc<AtomicU64>,
    events: mpsc::UnboundedSender<FetchEvent>,
}

impl FetchScheduler {
    pub fn new(
        api: Arc<dyn DaylightApi>,
        mode: FetchMode,
        pacing: Pacing,
        delay: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<FetchEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let scheduler = Self {
            api,
            mode,
            pacing,
            delay,
            generation: Arc::new(AtomicU64::new(0)),
            events,
        };
        (scheduler, receiver)
    }

    pub fn current_cycle(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub fn is_current(&self, cycle: u64) -> bool {
        self.current_cycle() == cycle
    }

    /// Stops dispatching the running cycle without starting a new one.
    pub fn abandon(&self) {
        let id = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(generation = id, "fetch cycle abandoned");
    }

    /// Requests of one cycle, in day order.
    pub fn plan(&self, coordinates: Coordinates, today: NaiveDate) -> Vec<FetchRequest> {
        let dated = |index: usize, offset: u64, label: String| FetchRequest {
            coordinates,
            date: today.checked_add_days(Days::new(offset)),
            index,
            label,
        };

        match self.mode {
            FetchMode::Week => (0..WEEK_DAYS)
                .map(|offset| {
                    let index = offset as usize;
                    let label = match today.checked_add_days(Days::new(offset)) {
                        Some(date) => {
                            format!("Day {} ({})", index + 1, date.format("%Y-%m-%d"))
                        }
                        None => format!("Day {}", index + 1),
                    };
                    dated(index, offset, label)
                })
                .collect(),
            FetchMode::Pair => vec![
                dated(0, 0, "Today".to_string()),
                dated(1, 1, "Tomorrow".to_string()),
            ],
            FetchMode::Today => vec![FetchRequest {
                coordinates,
                date: None,
                index: 0,
                label: "Today".to_string(),
            }],
        }
    }

    /// Supersedes any running cycle and starts dispatching a new one.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start_cycle(&self, coordinates: Coordinates, today: NaiveDate) -> Cycle {
        let id = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let requests = self.plan(coordinates, today);
        let cycle = Cycle {
            id,
            expected: requests.len(),
        };

        info!(
            cycle = id,
            mode = %self.mode,
            pacing = %self.pacing,
            requests = requests.len(),
            %coordinates,
            "starting fetch cycle"
        );

        let dispatcher = Dispatcher {
            api: Arc::clone(&self.api),
            events: self.events.clone(),
            token: CycleToken {
                generation: Arc::clone(&self.generation),
                id,
            },
        };

        match self.mode {
            FetchMode::Week => self.dispatch_paced(dispatcher, requests),
            FetchMode::Pair | FetchMode::Today => {
                for request in requests {
                    let dispatcher = dispatcher.clone();
                    tokio::spawn(async move { dispatcher.fetch(request).await });
                }
            }
        }

        cycle
    }

    fn dispatch_paced(&self, dispatcher: Dispatcher, requests: Vec<FetchRequest>) {
        let delay = self.delay;
        let start = Instant::now();

        match self.pacing {
            Pacing::Offset => {
                for (i, request) in requests.into_iter().enumerate() {
                    let dispatcher = dispatcher.clone();
                    let fire_at = start + delay * i as u32;
                    tokio::spawn(async move {
                        sleep_until(fire_at).await;
                        dispatcher.fetch(request).await;
                    });
                }
            }
            Pacing::Interval => {
                tokio::spawn(async move {
                    let mut last_dispatch: Option<Instant> = None;
                    for request in requests {
                        if let Some(last) = last_dispatch {
                            sleep_until(last + delay).await;
                        }
                        if !dispatcher.token.is_current() {
                            break;
                        }
                        last_dispatch = Some(Instant::now());
                        let dispatcher = dispatcher.clone();
                        tokio::spawn(async move { dispatcher.fetch(request).await });
                    }
                });
            }
            Pacing::Sequential => {
                tokio::spawn(async move {
                    for (i, request) in requests.into_iter().enumerate() {
                        if i > 0 {
                            sleep(delay).await;
                        }
                        if !dispatcher.token.is_current() {
                            break;
                        }
                        dispatcher.fetch(request).await;
                    }
                });
            }
        }
    }
}
