use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

// ========================================
// Backend request/response records
// ========================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProjectRequest {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRunRequest {
    pub prompt: String,
    pub entrypoint: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: u32,
    pub name: String,
    #[serde(default, deserialize_with = "lenient_time")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Queued,
    Running,
    Success,
    Failed,
}

impl RunStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Success | RunStatus::Failed)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    pub id: u32,
    pub project_id: u32,
    pub status: RunStatus,
    #[serde(default)]
    pub entrypoint: String,
    #[serde(default)]
    pub attempts: u32,
    #[serde(default, deserialize_with = "lenient_time")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunStatusResponse {
    pub run_id: u32,
    pub status: RunStatus,
    pub attempts: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Info,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEvent {
    pub id: u32,
    pub run_id: u32,
    pub stage: String,
    pub level: LogLevel,
    pub message: String,
    #[serde(default, deserialize_with = "lenient_time")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Error body returned on non-2xx responses.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub detail: Option<String>,
}

/// The backend writes naive UTC timestamps (no offset); accept both forms.
fn lenient_time<'de, D>(de: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(de)?;
    let Some(raw) = raw else { return Ok(None) };
    if let Ok(t) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(Some(t.with_timezone(&Utc)));
    }
    NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|n| Some(n.and_utc()))
        .map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_record_from_backend() {
        let run: Run = serde_json::from_str(
            r#"{"id":3,"project_id":1,"status":"running","entrypoint":"app.main:app","attempts":1,"created_at":"2024-05-01T10:20:30.123456"}"#,
        )
        .unwrap();
        assert_eq!(run.status, RunStatus::Running);
        assert!(!run.status.is_terminal());
        assert_eq!(run.created_at.unwrap().to_rfc3339(), "2024-05-01T10:20:30.123456+00:00");
    }

    #[test]
    fn log_levels_are_uppercase() {
        let ev: LogEvent = serde_json::from_str(
            r#"{"id":1,"run_id":3,"stage":"spec","level":"ERROR","message":"boom","created_at":null}"#,
        )
        .unwrap();
        assert_eq!(ev.level, LogLevel::Error);
        assert!(ev.created_at.is_none());
    }
}
