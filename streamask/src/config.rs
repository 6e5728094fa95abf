//! Runtime configuration.
//!
//! Every setting is a CLI flag with an environment fallback, since the
//! launcher hands us configuration through workflow environment variables.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;

use crate::gemini::GenerationConfig;

pub const DEFAULT_MODEL: &str = "gemini-1.5-flash-latest";
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com";

/// Environment variable names, shared with the launcher that forwards them
/// to the transfer worker.
pub mod env {
    pub const API_KEY: &str = "GEMINI_API_KEY_ALFRED";
    pub const MODEL: &str = "GEMINI_MODEL_ALFRED";
    pub const ENDPOINT: &str = "GEMINI_API_ENDPOINT_ALFRED";
    pub const PROXY: &str = "CLASH_PROXY_URL";
    pub const CACHE_DIR: &str = "alfred_workflow_cache";
    pub const BUNDLE_ID: &str = "alfred_workflow_bundleid";
    pub const MAX_OUTPUT_TOKENS: &str = "STREAMASK_MAX_OUTPUT_TOKENS";
    pub const TEMPERATURE: &str = "STREAMASK_TEMPERATURE";
    pub const RERUN_INTERVAL: &str = "STREAMASK_RERUN_INTERVAL";
    pub const TRANSFER_TIMEOUT: &str = "STREAMASK_TRANSFER_TIMEOUT";
}

#[derive(Args, Debug, Clone)]
pub struct Config {
    /// Gemini API key
    #[arg(long, global = true, env = env::API_KEY, hide_env_values = true)]
    pub api_key: Option<String>,

    /// Model to stream from
    #[arg(long, global = true, env = env::MODEL, default_value = DEFAULT_MODEL)]
    pub model: String,

    /// API base URL
    #[arg(long, global = true, env = env::ENDPOINT, default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,

    /// HTTP(S) proxy for the outbound request
    #[arg(long, global = true, env = env::PROXY)]
    pub proxy: Option<String>,

    /// Directory holding session state (defaults to the workflow cache)
    #[arg(long, global = true, env = env::CACHE_DIR)]
    pub cache_dir: Option<PathBuf>,

    /// Workflow bundle id, used to derive the default cache directory
    #[arg(long, global = true, env = env::BUNDLE_ID, default_value = "default.bundle.id")]
    pub bundle_id: String,

    /// Maximum output tokens requested from the model
    #[arg(long, global = true, env = env::MAX_OUTPUT_TOKENS, default_value_t = 2048)]
    pub max_output_tokens: u32,

    /// Sampling temperature
    #[arg(long, global = true, env = env::TEMPERATURE, default_value_t = 0.7)]
    pub temperature: f32,

    /// Seconds the launcher waits before re-invoking while streaming
    #[arg(long, global = true, env = env::RERUN_INTERVAL, default_value_t = 0.2)]
    pub rerun_interval: f64,

    /// Seconds after which the transfer worker gives up
    #[arg(long, global = true, env = env::TRANSFER_TIMEOUT, default_value_t = 300)]
    pub transfer_timeout: u64,
}

impl Config {
    /// The API key, if one is set and non-blank.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }

    /// Resolve the session state directory, creating it if needed.
    pub fn state_dir(&self) -> Result<PathBuf> {
        let dir = match self.cache_dir.as_ref().filter(|d| !d.as_os_str().is_empty()) {
            Some(dir) => dir.clone(),
            None => dirs::cache_dir()
                .context("Could not find cache directory")?
                .join("com.runningwithcrayons.Alfred")
                .join("Workflow Data")
                .join(&self.bundle_id),
        };
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
        Ok(dir)
    }

    pub const fn generation(&self) -> GenerationConfig {
        GenerationConfig {
            max_output_tokens: self.max_output_tokens,
            temperature: self.temperature,
        }
    }

    pub const fn transfer_timeout(&self) -> Duration {
        Duration::from_secs(self.transfer_timeout)
    }

    /// Environment the transfer worker needs to reproduce this configuration.
    pub fn worker_env(&self, state_dir: &std::path::Path) -> Vec<(&'static str, String)> {
        let mut vars = vec![
            (env::MODEL, self.model.clone()),
            (env::ENDPOINT, self.endpoint.clone()),
            (env::CACHE_DIR, state_dir.to_string_lossy().to_string()),
            (env::TRANSFER_TIMEOUT, self.transfer_timeout.to_string()),
        ];
        if let Some(key) = self.api_key() {
            vars.push((env::API_KEY, key.to_string()));
        }
        if let Some(proxy) = &self.proxy {
            vars.push((env::PROXY, proxy.clone()));
        }
        vars
    }
}

#[cfg(test)]
impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: Some("test-key".to_string()),
            model: DEFAULT_MODEL.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            proxy: None,
            cache_dir: None,
            bundle_id: "default.bundle.id".to_string(),
            max_output_tokens: 2048,
            temperature: 0.7,
            rerun_interval: 0.2,
            transfer_timeout: 300,
        }
    }
}
