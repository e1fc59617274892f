//! Core application infrastructure

pub(crate) mod banner;
pub mod cli;
pub mod config;
pub mod constants;
pub mod shutdown;

pub use crate::app::ChatApp;
pub use cli::{CliConfig, Commands};
pub use config::AppConfig;
pub use shutdown::ShutdownService;
