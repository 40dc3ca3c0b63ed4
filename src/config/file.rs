use crate::config::{CliConfig, Settings};
use crate::utils::error::{RelayError, Result};
use serde::Deserialize;
use std::path::Path;

/// TOML settings file. Every field is optional; anything omitted falls back
/// to the flag/env value.
///
/// ```toml
/// [server]
/// bind = "0.0.0.0:3000"
///
/// [store]
/// owner = "IMF777"
/// repo = "applab-datanet"
/// token = "${GITHUB_TOKEN}"
///
/// [relay]
/// write_interval_ms = 2000
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    pub server: Option<ServerSection>,
    pub store: Option<StoreSection>,
    pub relay: Option<RelaySection>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerSection {
    pub bind: Option<String>,
    pub log_json: Option<bool>,
    pub verbose: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoreSection {
    pub api_base: Option<String>,
    pub owner: Option<String>,
    pub repo: Option<String>,
    pub base_path: Option<String>,
    pub token: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RelaySection {
    pub write_interval_ms: Option<u64>,
    pub retry_limit: Option<u32>,
    pub outbound_timeout_secs: Option<u64>,
}

impl TomlConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed = substitute_env_vars(content);
        toml::from_str(&processed).map_err(|e| RelayError::Config {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    pub fn into_settings(self, cli: &CliConfig) -> Settings {
        let server = self.server.unwrap_or_default();
        let store = self.store.unwrap_or_default();
        let relay = self.relay.unwrap_or_default();

        Settings {
            bind: server.bind.unwrap_or_else(|| cli.bind.clone()),
            api_base: store.api_base.unwrap_or_else(|| cli.api_base.clone()),
            owner: store.owner.unwrap_or_else(|| cli.owner.clone()),
            repo: store.repo.unwrap_or_else(|| cli.repo.clone()),
            base_path: store.base_path.unwrap_or_else(|| cli.base_path.clone()),
            github_token: store.token.unwrap_or_else(|| cli.github_token.clone()),
            write_interval_ms: relay.write_interval_ms.unwrap_or(cli.write_interval_ms),
            retry_limit: relay.retry_limit.unwrap_or(cli.retry_limit),
            outbound_timeout_secs: relay.outbound_timeout_secs.or(cli.outbound_timeout_secs),
            log_json: server.log_json.unwrap_or(cli.log_json),
            verbose: server.verbose.unwrap_or(cli.verbose),
        }
    }
}

/// Replaces `${VAR_NAME}` with the environment value; unknown variables are
/// left as-is so validation reports them against the right field.
fn substitute_env_vars(content: &str) -> String {
    use regex::Regex;
    let re = Regex::new(r"\$\{([^}]+)\}").unwrap();

    re.replace_all(content, |caps: &regex::Captures| {
        let var_name = &caps[1];
        std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
    })
    .to_string()
}
