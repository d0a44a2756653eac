//! Document mutations: attachments and expiration dates.

use crate::error::{Result, RollSafeError};
use crate::models::{Attachment, Document, VaultState};
use chrono::{DateTime, NaiveDate, Utc};
use tracing::debug;

/// Default attachment ceiling (2 MiB).
pub const DEFAULT_MAX_ATTACHMENT_BYTES: u64 = 2 * 1024 * 1024;

/// Limits applied to attached files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttachmentPolicy {
    pub max_bytes: u64,
}

impl Default for AttachmentPolicy {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_ATTACHMENT_BYTES,
        }
    }
}

impl AttachmentPolicy {
    /// Reject sizes above the ceiling.
    pub fn check(&self, size: u64) -> Result<()> {
        if size > self.max_bytes {
            return Err(RollSafeError::OversizedAttachment {
                size,
                limit: self.max_bytes,
            });
        }
        Ok(())
    }
}

fn document_mut<'a>(state: &'a mut VaultState, id: &str) -> Result<&'a mut Document> {
    state
        .find_document_mut(id)
        .ok_or_else(|| RollSafeError::DocumentNotFound(id.to_string()))
}

/// Guess a MIME type from the file name.
pub fn guess_mime_type(file_name: &str) -> String {
    mime_guess::from_path(file_name)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

/// Attach `data` to document `id`, replacing any previous attachment.
///
/// The size check happens before anything is touched.
pub fn attach(
    state: &mut VaultState,
    id: &str,
    file_name: &str,
    data: Vec<u8>,
    policy: &AttachmentPolicy,
    now: DateTime<Utc>,
) -> Result<()> {
    let size = data.len() as u64;
    policy.check(size)?;

    let doc = document_mut(state, id)?;
    doc.attachment = Some(Attachment {
        file_name: file_name.to_string(),
        mime_type: guess_mime_type(file_name),
        size,
        attached_at: now,
        data,
    });
    debug!(id, file_name, size, "attachment stored");
    Ok(())
}

/// Remove the attachment from document `id`, returning it if there was one.
pub fn detach(state: &mut VaultState, id: &str) -> Result<Option<Attachment>> {
    let doc = document_mut(state, id)?;
    Ok(doc.attachment.take())
}

/// Set or clear the expiration date of document `id`.
pub fn set_expiration(state: &mut VaultState, id: &str, date: Option<NaiveDate>) -> Result<()> {
    let doc = document_mut(state, id)?;
    doc.expires_on = date;
    Ok(())
}
