use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;

use crate::cli::BackendKind;
use crate::config::Config;
use crate::draft::{ActiveProject, ProjectDraft};

pub mod http;
pub mod mock;

/// Where project and run identifiers come from when a draft is submitted.
#[async_trait]
pub trait ProjectBackend: Send + Sync {
    async fn register(&self, draft: &ProjectDraft) -> Result<ActiveProject>;

    /// Pause before the submission is acknowledged to the user.
    fn ack_delay(&self) -> Duration {
        Duration::ZERO
    }
}

pub type DynBackend = Box<dyn ProjectBackend + Send + Sync>;

pub fn make_backend(kind: BackendKind, cfg: &Config) -> Result<DynBackend> {
    match kind {
        BackendKind::Mock => Ok(Box::new(mock::MockBackend::new(Duration::from_millis(
            cfg.submit_delay_ms,
        )))),
        BackendKind::Http => Ok(Box::new(http::HttpBackend::new(
            crate::api::ApiClient::new(&cfg.api_base_url, cfg.timeout_secs)?,
        ))),
    }
}
