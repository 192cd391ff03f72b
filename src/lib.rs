pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::cli::Cli;
pub use config::SapperConfig;

pub use core::{BrickApi, ServiceApi, ServiceTarget, VersionUpgradeSpec};
pub use utils::error::{Result, SapperError};
