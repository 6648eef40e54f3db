use anyhow::Result;
use std::sync::Arc;

use crate::errors::P2pError;
use crate::session::{self, SessionStore, CHANGE_REQUEST};

/// Single pending modification request, kept in the session next to the draft.
#[derive(Clone)]
pub struct ChangeChannel {
    session: Arc<dyn SessionStore>,
}

impl ChangeChannel {
    pub fn new(session: Arc<dyn SessionStore>) -> Self {
        Self { session }
    }

    /// Store `text` as the pending request, replacing any earlier one.
    pub fn request(&self, text: &str) -> Result<()> {
        if text.trim().is_empty() {
            return Err(P2pError::EmptyInput.into());
        }
        session::put_json(self.session.as_ref(), CHANGE_REQUEST, &text.to_string())?;
        tracing::info!(chars = text.len(), "change request stored");
        Ok(())
    }

    pub fn pending(&self) -> Option<String> {
        session::get_json(self.session.as_ref(), CHANGE_REQUEST)
    }

    /// Hand the pending request to a new run and empty the slot.
    pub fn take(&self) -> Result<Option<String>> {
        let pending = self.pending();
        if self.session.get(CHANGE_REQUEST).is_some() {
            self.session.remove(CHANGE_REQUEST)?;
        }
        Ok(pending)
    }
}
