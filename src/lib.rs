pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use crate::adapters::github::GithubContentStore;
pub use crate::config::{CliConfig, Settings};
pub use crate::core::relay::RelayService;
pub use crate::utils::error::{RelayError, Result};
