use anyhow::{Context, Result};
use fs_err as fs;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::api::DEFAULT_BASE_URL;
use crate::classify::ClassifierProfile;
use crate::errors::P2pError;
use crate::simulate::Pace;

pub const API_URL_ENV: &str = "P2P_API_URL";
/// Name the web frontend used for the same setting.
pub const LEGACY_API_URL_ENV: &str = "NEXT_PUBLIC_API_URL";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub schema_version: String,
    pub root: String,
    pub api_base_url: String,
    pub timeout_secs: u64,
    pub profile: ClassifierProfile,
    pub pace: Pace,
    pub tick_ms: u64,
    pub settle_ms: u64,
    pub submit_delay_ms: u64,
    pub session_path: String,
    pub save_transcript: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            schema_version: "2025-10-01".into(),
            root: ".".into(),
            api_base_url: DEFAULT_BASE_URL.into(),
            timeout_secs: 120,
            profile: ClassifierProfile::General,
            pace: Pace::Standard,
            tick_ms: 800,
            settle_ms: 1000,
            submit_delay_ms: 300,
            session_path: ".p2p/session.json".into(),
            save_transcript: false,
        }
    }
}

impl Config {
    /// Defaults, then the TOML file if given, then the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut cfg = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        cfg.apply_env(|k| std::env::var(k).ok());
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        toml::from_str(&text).with_context(|| format!("invalid config file {}", path.display()))
    }

    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let url = lookup(API_URL_ENV).or_else(|| lookup(LEGACY_API_URL_ENV));
        if let Some(url) = url.filter(|u| !u.trim().is_empty()) {
            self.api_base_url = url;
        }
    }

    pub fn validate(&self) -> Result<(), P2pError> {
        if self.tick_ms == 0 {
            return Err(P2pError::Config("tick_ms must be greater than zero".into()));
        }
        if !self.api_base_url.starts_with("http://") && !self.api_base_url.starts_with("https://") {
            return Err(P2pError::Config(format!("api_base_url is not an http url: {}", self.api_base_url)));
        }
        Ok(())
    }
}
