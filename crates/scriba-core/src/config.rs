use serde::Deserialize;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use scriba_client::ClientConfig;

use crate::state::ReducerOptions;

const TOKEN_ENV_VAR: &str = "SCRIBA_API_TOKEN";

#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub chat: ChatConfig,
    pub log: LogConfig,
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Base URL of the research-assistant API.
    pub base_url: String,
    /// Command to run to get the API token (e.g., "pass show scriba").
    /// The command is run via `sh -c`.
    pub api_token_cmd: Option<String>,
    pub connect_timeout_secs: u64,
    /// Upper bound for a whole request, streaming included.
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            api_token_cmd: None,
            connect_timeout_secs: 10,
            request_timeout_secs: 300,
        }
    }
}

impl ServerConfig {
    /// Resolve the API token from api_token_cmd or the SCRIBA_API_TOKEN env var.
    ///
    /// A server without authentication is allowed, so a missing token is
    /// `Ok(None)`.
    pub fn resolve_api_token(&self) -> io::Result<Option<String>> {
        if let Some(cmd) = &self.api_token_cmd {
            let output = Command::new("sh").arg("-c").arg(cmd).output()?;

            if output.status.success() {
                let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if !token.is_empty() {
                    return Ok(Some(token));
                }
            }
            tracing::warn!("api_token_cmd produced no token, falling back to {TOKEN_ENV_VAR}");
        }

        Ok(std::env::var(TOKEN_ENV_VAR)
            .ok()
            .filter(|token| !token.trim().is_empty()))
    }

    pub fn client_config(&self) -> io::Result<ClientConfig> {
        let mut config = ClientConfig::new(self.base_url.clone());
        config.api_token = self.resolve_api_token()?;
        config.connect_timeout = Duration::from_secs(self.connect_timeout_secs);
        config.request_timeout = Duration::from_secs(self.request_timeout_secs);
        Ok(config)
    }
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct ChatConfig {
    /// Status text the server sends while it writes the answer.
    pub generating_phrase: String,
    /// Status shown when a submission fails.
    pub failure_message: String,
    /// Yield to the scheduler after every applied frame.
    pub yield_per_frame: bool,
}

impl Default for ChatConfig {
    fn default() -> Self {
        let reducer = ReducerOptions::default();
        Self {
            generating_phrase: reducer.generating_phrase,
            failure_message: reducer.failure_message,
            yield_per_frame: true,
        }
    }
}

impl ChatConfig {
    pub fn reducer_options(&self) -> ReducerOptions {
        ReducerOptions {
            generating_phrase: self.generating_phrase.clone(),
            failure_message: self.failure_message.clone(),
        }
    }
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct LogConfig {
    /// Maximum level written to stderr: error, warn, info, debug or trace.
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

impl Config {
    pub fn load_or_default() -> Self {
        Self::load_from(&config_path())
    }

    /// Load from `path`; a missing or unparsable file yields the defaults.
    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents).unwrap_or_else(|e| {
                eprintln!("warning: failed to parse {}: {e}", path.display());
                Config::default()
            }),
            Err(_) => Config::default(),
        }
    }
}

pub fn config_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("scriba").join("config.toml")
}
