pub mod api;
pub mod chart;
pub mod cli;
pub mod clock;
pub mod config;
pub mod display;
pub mod error;
pub mod location;
pub mod logging;
pub mod output;
pub mod render;
pub mod scheduler;
pub mod session;
pub mod time_format;
pub mod timezone;
pub mod types;
