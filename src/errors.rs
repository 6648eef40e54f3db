use thiserror::Error;

#[derive(Error, Debug)]
pub enum P2pError {
    #[error("input is empty")] EmptyInput,
    #[error("no active project")] MissingProject,
    #[error("session error: {0}")] Session(String),
    #[error("{detail} (status {status})")] Api { status: u16, detail: String },
    #[error("config error: {0}")] Config(String),
}

impl P2pError {
    /// Errors that the flow recovers from by routing back to the describe step.
    pub fn is_redirect(&self) -> bool {
        matches!(self, P2pError::MissingProject)
    }
}
