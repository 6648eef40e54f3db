use anyhow::Result;
use async_trait::async_trait;
use rand::Rng;
use std::time::Duration;

use super::ProjectBackend;
use crate::draft::{ActiveProject, ProjectDraft};

pub const MAX_PROJECT_ID: u32 = 1000;
pub const MAX_RUN_ID: u32 = 10_000;

/// Hands out random identifiers locally; nothing leaves the process.
pub struct MockBackend {
    delay: Duration,
}

impl MockBackend {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl ProjectBackend for MockBackend {
    async fn register(&self, _draft: &ProjectDraft) -> Result<ActiveProject> {
        let mut rng = rand::thread_rng();
        Ok(ActiveProject {
            project_id: rng.gen_range(1..=MAX_PROJECT_ID),
            run_id: rng.gen_range(1..=MAX_RUN_ID),
        })
    }

    fn ack_delay(&self) -> Duration {
        self.delay
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ids_stay_in_range() {
        let b = MockBackend::new(Duration::ZERO);
        let d = ProjectDraft::new("x");
        for _ in 0..500 {
            let ids = b.register(&d).await.unwrap();
            assert!((1..=MAX_PROJECT_ID).contains(&ids.project_id));
            assert!((1..=MAX_RUN_ID).contains(&ids.run_id));
        }
    }
}
