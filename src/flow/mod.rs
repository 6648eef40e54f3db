use anyhow::Result;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

use crate::change::ChangeChannel;
use crate::config::Config;
use crate::draft::{ActiveProject, DraftStore, ProjectDraft};
use crate::errors::P2pError;
use crate::session::SessionStore;
use crate::simulate::ticker::{self, TickerHandle};
use crate::simulate::{GenerationRun, Pace};

/// Wizard steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Describe,
    Generating,
    Summary,
}

/// Session-backed state shared by every step.
#[derive(Clone)]
pub struct Flow {
    pub drafts: DraftStore,
    pub changes: ChangeChannel,
    period: Duration,
    settle: Duration,
}

impl Flow {
    pub fn new(session: Arc<dyn SessionStore>, cfg: &Config) -> Self {
        Self {
            drafts: DraftStore::new(session.clone()),
            changes: ChangeChannel::new(session),
            period: Duration::from_millis(cfg.tick_ms),
            settle: Duration::from_millis(cfg.settle_ms),
        }
    }

    /// Where the user actually lands when asking for `wanted`. Every step past
    /// the description needs a submitted draft.
    pub fn guard(&self, wanted: Route) -> Route {
        if wanted == Route::Describe {
            return wanted;
        }
        match self.drafts.require_active() {
            Ok(_) => wanted,
            Err(_) => {
                tracing::info!(?wanted, "no active project; redirecting to describe");
                Route::Describe
            }
        }
    }

    /// Begin a run for the stored draft, consuming any pending change request.
    pub fn start_generation(&self, pace: Pace) -> Result<TickerHandle, P2pError> {
        let (_, active) = self.drafts.require_active()?;
        let change = self
            .changes
            .take()
            .map_err(|e| P2pError::Session(e.to_string()))?;
        if let Some(c) = &change {
            tracing::info!(run_id = active.run_id, change = %c, "regenerating with change request");
        }
        let run = GenerationRun::new(active.run_id, pace);
        Ok(ticker::spawn(run, change, self.period, self.settle))
    }

    /// Record a change request; the next step is generation again.
    pub fn request_change(&self, text: &str) -> Result<Route> {
        if self.guard(Route::Summary) == Route::Describe {
            return Ok(Route::Describe);
        }
        self.changes.request(text)?;
        Ok(Route::Generating)
    }
}

/// Archive name the download action announces.
pub fn download_file_name(active: ActiveProject, now: DateTime<Utc>) -> String {
    format!("project-{}-{}.zip", active.project_id, now.timestamp_millis())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewTarget {
    pub run_id: u32,
    pub url: String,
}

/// Where the generated app for a run would be served.
pub fn preview_target(active: ActiveProject) -> PreviewTarget {
    let port = 8000 + active.run_id;
    PreviewTarget { run_id: active.run_id, url: format!("http://127.0.0.1:{port}") }
}

/// Draft plus identifiers, if the session has a submitted project.
pub fn active_draft(flow: &Flow) -> Option<(ProjectDraft, ActiveProject)> {
    flow.drafts.require_active().ok()
}
