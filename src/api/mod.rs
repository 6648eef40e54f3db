use anyhow::{Context, Result};
use futures::StreamExt;
use fs_err as fs;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::NamedTempFile;

use crate::errors::P2pError;
use crate::wire::{
    CreateProjectRequest, CreateRunRequest, ErrorBody, LogEvent, Project, Run, RunStatusResponse,
};

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_ENTRYPOINT: &str = "app.main:app";

/// Client for the project/run backend. Nothing in the mock flow calls it
/// unless the http backend is selected.
pub struct ApiClient {
    base: String,
    client: Client,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("building http client")?;
        Ok(Self { base: normalize_base(base_url), client })
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base, endpoint)
    }

    fn request(&self, method: Method, endpoint: &str) -> RequestBuilder {
        let url = self.url(endpoint);
        tracing::debug!(%method, %url, "api request");
        self.client
            .request(method, url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
    }

    async fn send_json<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T> {
        let resp = req.send().await.context("api request failed")?;
        let resp = check(resp).await?;
        let text = resp.text().await.context("api read body failed")?;
        serde_json::from_str(&text).with_context(|| format!("unexpected api response: {text}"))
    }

    async fn post<B: Serialize, T: DeserializeOwned>(&self, endpoint: &str, body: &B) -> Result<T> {
        self.send_json(self.request(Method::POST, endpoint).json(body)).await
    }

    async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T> {
        self.send_json(self.request(Method::GET, endpoint)).await
    }

    pub async fn create_project(&self, name: &str) -> Result<Project> {
        self.post("/projects", &CreateProjectRequest { name: name.to_string() }).await
    }

    pub async fn list_projects(&self) -> Result<Vec<Project>> {
        self.get("/projects").await
    }

    pub async fn start_run(&self, project_id: u32, prompt: &str, entrypoint: &str) -> Result<RunStatusResponse> {
        let body = CreateRunRequest { prompt: prompt.to_string(), entrypoint: entrypoint.to_string() };
        self.post(&format!("/projects/{project_id}/runs"), &body).await
    }

    pub async fn get_run(&self, run_id: u32) -> Result<Run> {
        self.get(&format!("/runs/{run_id}")).await
    }

    pub async fn run_logs(&self, run_id: u32) -> Result<Vec<LogEvent>> {
        self.get(&format!("/runs/{run_id}/logs")).await
    }

    pub fn download_url(&self, project_id: u32, run_id: u32) -> String {
        self.url(&download_path(project_id, run_id))
    }

    /// Stream the run's archive into `dest`. Returns the number of bytes written.
    /// `dest` only appears once the whole body has arrived.
    pub async fn download(&self, project_id: u32, run_id: u32, dest: &Path) -> Result<u64> {
        let resp = self
            .client
            .get(self.download_url(project_id, run_id))
            .send()
            .await
            .context("download request failed")?;
        let resp = check(resp).await?;

        let dir = match dest.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;
        let mut tmp = NamedTempFile::new_in(&dir)?;
        let mut written = 0u64;
        let mut stream = resp.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk: bytes::Bytes = chunk.context("download interrupted")?;
            tmp.write_all(&chunk)?;
            written += chunk.len() as u64;
        }
        tmp.flush()?;
        tmp.persist(dest)
            .with_context(|| format!("failed to write {}", dest.display()))?;
        Ok(written)
    }
}

pub fn normalize_base(base: &str) -> String {
    let trimmed = base.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        DEFAULT_BASE_URL.to_string()
    } else {
        trimmed.to_string()
    }
}

pub fn download_path(project_id: u32, run_id: u32) -> String {
    format!("/projects/{project_id}/runs/{run_id}/download")
}

/// Turn a non-2xx response into `P2pError::Api`, pulling `detail` from the body.
async fn check(resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(error_from_body(status, &body).into())
}

pub fn error_from_body(status: StatusCode, body: &str) -> P2pError {
    let detail = match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody { detail: Some(d) }) if !d.trim().is_empty() => d,
        Ok(_) => format!("API error: {}", status.as_u16()),
        Err(_) => "Unknown error".to_string(),
    };
    P2pError::Api { status: status.as_u16(), detail }
}
