#![allow(clippy::uninlined_format_args)]

pub mod actions;
pub mod app;
pub mod comments;
pub mod config;
pub mod data;
pub mod error;
pub mod logging;
pub mod persist;
pub mod state;
pub mod storage;
pub mod ui;
pub mod youtube;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use app::{import, run, RunOptions};
