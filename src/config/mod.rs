pub mod file;

use crate::utils::error::Result;
use crate::utils::validation::{
    validate_non_empty_string, validate_range, validate_url, Validate,
};
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "datanet-relay")]
#[command(about = "HTTP relay that persists messages and proxied responses to a GitHub repo")]
pub struct CliConfig {
    #[arg(long, default_value = "0.0.0.0:3000")]
    pub bind: String,

    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub github_token: String,

    #[arg(long, env = "RELAY_OWNER", default_value = "IMF777")]
    pub owner: String,

    #[arg(long, env = "RELAY_REPO", default_value = "applab-datanet")]
    pub repo: String,

    #[arg(long, env = "RELAY_BASE_PATH", default_value = "datasets/inbox/")]
    pub base_path: String,

    #[arg(long, default_value = "https://api.github.com")]
    pub api_base: String,

    #[arg(long, default_value_t = 2000, help = "Per-id write debounce in ms, 0 disables")]
    pub write_interval_ms: u64,

    #[arg(long, default_value_t = 3, help = "Retries after a write conflict")]
    pub retry_limit: u32,

    #[arg(long, help = "Timeout for proxied outbound calls in seconds")]
    pub outbound_timeout_secs: Option<u64>,

    #[arg(long, help = "TOML settings file; fields it omits fall back to flag/env values")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Emit JSON logs")]
    pub log_json: bool,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,
}

/// Resolved runtime settings: CLI/env values, with a TOML file layered on
/// top when `--config` is given.
#[derive(Debug, Clone)]
pub struct Settings {
    pub bind: String,
    pub api_base: String,
    pub owner: String,
    pub repo: String,
    pub base_path: String,
    pub github_token: String,
    pub write_interval_ms: u64,
    pub retry_limit: u32,
    pub outbound_timeout_secs: Option<u64>,
    pub log_json: bool,
    pub verbose: bool,
}

impl Settings {
    pub fn load(cli: CliConfig) -> Result<Self> {
        let mut settings = match &cli.config {
            Some(path) => file::TomlConfig::from_file(path)?.into_settings(&cli),
            None => Self::from_cli(&cli),
        };
        if !settings.base_path.is_empty() && !settings.base_path.ends_with('/') {
            settings.base_path.push('/');
        }
        Ok(settings)
    }

    fn from_cli(cli: &CliConfig) -> Self {
        Self {
            bind: cli.bind.clone(),
            api_base: cli.api_base.clone(),
            owner: cli.owner.clone(),
            repo: cli.repo.clone(),
            base_path: cli.base_path.clone(),
            github_token: cli.github_token.clone(),
            write_interval_ms: cli.write_interval_ms,
            retry_limit: cli.retry_limit,
            outbound_timeout_secs: cli.outbound_timeout_secs,
            log_json: cli.log_json,
            verbose: cli.verbose,
        }
    }
}

impl Validate for Settings {
    fn validate(&self) -> Result<()> {
        validate_url("api_base", &self.api_base)?;
        validate_non_empty_string("owner", &self.owner)?;
        validate_non_empty_string("repo", &self.repo)?;
        validate_non_empty_string("github_token", &self.github_token)?;
        validate_range("retry_limit", self.retry_limit, 0, 10)?;
        validate_range("write_interval_ms", self.write_interval_ms, 0, 60_000)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(args: &[&str]) -> CliConfig {
        let mut full = vec!["datanet-relay", "--github-token", "t0ken"];
        full.extend_from_slice(args);
        CliConfig::parse_from(full)
    }

    #[test]
    fn test_defaults_match_original_deployment() {
        let settings = Settings::load(cli(&[])).unwrap();

        assert_eq!(settings.owner, "IMF777");
        assert_eq!(settings.repo, "applab-datanet");
        assert_eq!(settings.base_path, "datasets/inbox/");
        assert_eq!(settings.api_base, "https://api.github.com");
        assert_eq!(settings.write_interval_ms, 2000);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_base_path_is_normalized() {
        let settings = Settings::load(cli(&["--base-path", "inbox"])).unwrap();
        assert_eq!(settings.base_path, "inbox/");
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let settings = Settings::load(cli(&["--api-base", "not-a-url"])).unwrap();
        assert!(settings.validate().is_err());

        let settings = Settings::load(cli(&["--owner", ""])).unwrap();
        assert!(settings.validate().is_err());

        let settings = Settings::load(cli(&["--retry-limit", "99"])).unwrap();
        assert!(settings.validate().is_err());
    }
}
