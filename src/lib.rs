#![allow(clippy::uninlined_format_args)]

pub mod app;
pub mod board;
pub mod browser;
pub mod config;
pub mod crawler;
pub mod extract;
pub mod fetch;
pub mod logging;
pub mod results;
pub mod scan;
pub mod ui;
pub mod viewer;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use app::run;
