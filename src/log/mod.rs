use crate::draft::ProjectDraft;
use crate::simulate::GenerationRun;
use chrono::{DateTime, Utc};
use fs_err as fs;
use serde::Serialize;
use serde_json::to_string_pretty;
use std::path::{Path, PathBuf};
use uuid::Uuid;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Transcript<'a> {
    session_id: Uuid,
    saved_at: DateTime<Utc>,
    project: &'a ProjectDraft,
    progress: u32,
    run: &'a GenerationRun,
}

pub fn run_dir(root: &Path, run_id: u32) -> PathBuf {
    root.join(".p2p").join("runs").join(run_id.to_string())
}

/// Write the draft and finished run to `<root>/.p2p/runs/<runId>/generation.json`.
pub fn save_transcript(
    root: &Path,
    session_id: Uuid,
    draft: &ProjectDraft,
    run: &GenerationRun,
) -> anyhow::Result<PathBuf> {
    let dir = run_dir(root, run.run_id);
    fs::create_dir_all(&dir)?;
    let body = Transcript {
        session_id,
        saved_at: Utc::now(),
        project: draft,
        progress: run.progress(),
        run,
    };
    let p = dir.join("generation.json");
    fs::write(&p, to_string_pretty(&body)?)?;
    Ok(p)
}
