use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::backend::DynBackend;
use crate::classify::{classify, AppType, ClassifierProfile, Language};
use crate::errors::P2pError;
use crate::session::{self, SessionStore, PROJECT_INFO};

/// The user's project description plus the identifiers handed out on submit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDraft {
    pub description: String,
    #[serde(default)]
    pub language: Language,
    #[serde(default)]
    pub app_type: AppType,
    #[serde(default)]
    pub additional_instructions: String,
    #[serde(default = "default_auto_detect")]
    pub auto_detect: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<u32>,
}

fn default_auto_detect() -> bool {
    true
}

/// Identifiers of a submitted draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveProject {
    pub project_id: u32,
    pub run_id: u32,
}

impl ProjectDraft {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            language: Language::default(),
            app_type: AppType::default(),
            additional_instructions: String::new(),
            auto_detect: true,
            project_id: None,
            run_id: None,
        }
    }

    pub fn is_submittable(&self) -> bool {
        !self.description.trim().is_empty()
    }

    /// Recompute language and app type when auto-detect is on. Empty
    /// descriptions leave the current labels alone.
    pub fn refresh_detection(&mut self, profile: ClassifierProfile) {
        if !self.auto_detect || !self.is_submittable() {
            return;
        }
        let d = classify(&self.description, profile);
        self.language = d.language;
        self.app_type = d.app_type;
    }

    pub fn set_description(&mut self, text: impl Into<String>, profile: ClassifierProfile) {
        self.description = text.into();
        self.refresh_detection(profile);
    }

    pub fn set_auto_detect(&mut self, on: bool, profile: ClassifierProfile) {
        self.auto_detect = on;
        self.refresh_detection(profile);
    }

    /// Manual picks are ignored while auto-detect owns the labels; returns
    /// false when that happened.
    pub fn choose(&mut self, language: Option<Language>, app_type: Option<AppType>) -> bool {
        if self.auto_detect {
            return false;
        }
        if let Some(l) = language {
            self.language = l;
        }
        if let Some(t) = app_type {
            self.app_type = t;
        }
        true
    }

    pub fn active(&self) -> Option<ActiveProject> {
        match (self.project_id, self.run_id) {
            (Some(project_id), Some(run_id)) if project_id > 0 && run_id > 0 => {
                Some(ActiveProject { project_id, run_id })
            }
            _ => None,
        }
    }
}

/// Typed view over the `projectInfo` session slot.
#[derive(Clone)]
pub struct DraftStore {
    session: Arc<dyn SessionStore>,
}

impl DraftStore {
    pub fn new(session: Arc<dyn SessionStore>) -> Self {
        Self { session }
    }

    pub fn get(&self) -> Option<ProjectDraft> {
        session::get_json(self.session.as_ref(), PROJECT_INFO)
    }

    pub fn set(&self, draft: &ProjectDraft) -> Result<()> {
        session::put_json(self.session.as_ref(), PROJECT_INFO, draft)
    }

    pub fn clear(&self) -> Result<()> {
        self.session.remove(PROJECT_INFO)
    }

    /// The stored draft, provided it has been submitted. Anything else means
    /// the caller has to send the user back to the describe step.
    pub fn require_active(&self) -> Result<(ProjectDraft, ActiveProject), P2pError> {
        let draft = self.get().ok_or(P2pError::MissingProject)?;
        let active = draft.active().ok_or(P2pError::MissingProject)?;
        Ok((draft, active))
    }
}

/// Validate, classify, register and persist a draft.
///
/// Blank descriptions are rejected before anything is written or generated.
pub async fn submit(
    mut draft: ProjectDraft,
    profile: ClassifierProfile,
    backend: &DynBackend,
    store: &DraftStore,
) -> Result<ProjectDraft> {
    if !draft.is_submittable() {
        return Err(P2pError::EmptyInput.into());
    }
    // classify again here: the last keystroke may not have been detected yet
    draft.refresh_detection(profile);

    let ids = backend.register(&draft).await?;
    draft.project_id = Some(ids.project_id);
    draft.run_id = Some(ids.run_id);
    store.set(&draft)?;
    tracing::info!(
        project_id = ids.project_id,
        run_id = ids.run_id,
        language = %draft.language,
        app_type = %draft.app_type,
        "draft submitted"
    );

    let delay = backend.ack_delay();
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
    Ok(draft)
}
