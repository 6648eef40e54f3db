use anyhow::{Context, Result};
use async_trait::async_trait;

use super::ProjectBackend;
use crate::api::{ApiClient, DEFAULT_ENTRYPOINT};
use crate::draft::{ActiveProject, ProjectDraft};

const NAME_CHARS: usize = 60;

/// Registers the draft with a running backend: one project, one run.
pub struct HttpBackend {
    client: ApiClient,
}

impl HttpBackend {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

/// Project name derived from the first line of the description.
pub fn project_name(description: &str) -> String {
    let first = description.trim().lines().next().unwrap_or_default();
    first.chars().take(NAME_CHARS).collect()
}

/// Prompt sent to the backend: description, then any extra instructions.
pub fn run_prompt(draft: &ProjectDraft) -> String {
    let mut prompt = format!(
        "{}\n\nLanguage: {}\nApp type: {}",
        draft.description.trim(),
        draft.language,
        draft.app_type
    );
    let extra = draft.additional_instructions.trim();
    if !extra.is_empty() {
        prompt.push_str("\n\nAdditional instructions:\n");
        prompt.push_str(extra);
    }
    prompt
}

#[async_trait]
impl ProjectBackend for HttpBackend {
    async fn register(&self, draft: &ProjectDraft) -> Result<ActiveProject> {
        let project = self
            .client
            .create_project(&project_name(&draft.description))
            .await
            .context("creating project")?;
        let run = self
            .client
            .start_run(project.id, &run_prompt(draft), DEFAULT_ENTRYPOINT)
            .await
            .context("starting run")?;
        Ok(ActiveProject { project_id: project.id, run_id: run.run_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{AppType, Language};

    #[test]
    fn name_is_first_line_capped() {
        assert_eq!(project_name("  Todo app\nwith tags"), "Todo app");
        assert_eq!(project_name(&"x".repeat(100)).len(), NAME_CHARS);
    }

    #[test]
    fn prompt_mentions_labels_and_extras() {
        let mut d = ProjectDraft::new("quiz app");
        d.language = Language::TypeScript;
        d.app_type = AppType::WebApp;
        assert!(!run_prompt(&d).contains("Additional instructions"));

        d.additional_instructions = "use sqlite".into();
        let p = run_prompt(&d);
        assert!(p.starts_with("quiz app"));
        assert!(p.contains("Language: TypeScript"));
        assert!(p.contains("App type: Web App"));
        assert!(p.ends_with("use sqlite"));
    }
}
