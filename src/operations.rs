//! Shared operations between CLI and interactive modes.

use crate::config::Config;
use crate::error::{Result, RollSafeError};
use crate::gate::{self, GateState, InspectionView};
use crate::models::{Attachment, Document, VaultState};
use crate::pin::PinHasher;
use crate::search;
use crate::service::{self, AttachmentPolicy};
use crate::status::{self, ComplianceSummary, ExpirationStatus};
use crate::store::{FileStorage, VaultStore};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// Attachment metadata without the payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttachmentInfo {
    pub file_name: String,
    pub mime_type: String,
    pub size: u64,
    pub attached_at: DateTime<Utc>,
}

impl From<&Attachment> for AttachmentInfo {
    fn from(a: &Attachment) -> Self {
        Self {
            file_name: a.file_name.clone(),
            mime_type: a.mime_type.clone(),
            size: a.size,
            attached_at: a.attached_at,
        }
    }
}

/// A document as presented to a view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentInfo {
    pub id: String,
    pub title: String,
    pub category: String,
    pub tags: Vec<String>,
    pub status: ExpirationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_on: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days_remaining: Option<i64>,
    pub allowlisted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment: Option<AttachmentInfo>,
}

impl DocumentInfo {
    fn new(doc: &Document, state: &VaultState, today: NaiveDate) -> Self {
        Self {
            id: doc.id.clone(),
            title: doc.title.clone(),
            category: doc.category.clone(),
            tags: doc.tags.clone(),
            status: status::document_status(doc, today),
            expires_on: doc.expires_on,
            days_remaining: doc.expires_on.map(|d| status::days_remaining(d, today)),
            allowlisted: state.is_allowlisted(&doc.id),
            attachment: doc.attachment.as_ref().map(AttachmentInfo::from),
        }
    }
}

/// What the inspection view shows right now.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InspectionReport {
    pub state: GateState,
    pub documents: Vec<DocumentInfo>,
}

/// Vault operations backed by a [`VaultStore`].
pub struct VaultOperations {
    store: VaultStore,
    hasher: PinHasher,
    policy: AttachmentPolicy,
}

impl VaultOperations {
    pub fn new(store: VaultStore, hasher: PinHasher, policy: AttachmentPolicy) -> Self {
        Self {
            store,
            hasher,
            policy,
        }
    }

    /// Open the vault in the configured data directory.
    ///
    /// If the directory cannot be used the vault runs detached: defaults are
    /// shown and nothing is saved.
    pub fn open(config: &Config) -> Self {
        let data_dir = config.data_dir();
        let store = match FileStorage::open(&data_dir) {
            Ok(storage) => {
                info!(dir = %data_dir.display(), "opened vault storage");
                VaultStore::open(Box::new(storage))
            }
            Err(e) => {
                warn!(error = %e, "running without persistence");
                VaultStore::detached()
            }
        };
        Self::new(store, PinHasher::new(), config.attachment_policy())
    }

    pub fn state(&self) -> &VaultState {
        self.store.state()
    }

    pub fn is_persistent(&self) -> bool {
        self.store.is_persistent()
    }

    pub fn gate_state(&self) -> GateState {
        GateState::of(self.state())
    }

    /// Compliance summary for the dashboard.
    pub fn dashboard(&self, today: NaiveDate) -> ComplianceSummary {
        ComplianceSummary::from_documents(&self.state().documents, today)
    }

    /// Documents matching `query` (all of them for an empty query).
    pub fn list(&self, query: &str, today: NaiveDate) -> Vec<DocumentInfo> {
        let state = self.state();
        search::filter_documents(&state.documents, query)
            .into_iter()
            .map(|doc| DocumentInfo::new(doc, state, today))
            .collect()
    }

    pub fn show(&self, id: &str, today: NaiveDate) -> Result<DocumentInfo> {
        let state = self.state();
        state
            .find_document(id)
            .map(|doc| DocumentInfo::new(doc, state, today))
            .ok_or_else(|| RollSafeError::DocumentNotFound(id.to_string()))
    }

    /// Attach a file from disk. Oversized files are rejected before reading.
    pub fn attach_file(&mut self, id: &str, path: &Path) -> Result<AttachmentInfo> {
        if self.state().find_document(id).is_none() {
            return Err(RollSafeError::DocumentNotFound(id.to_string()));
        }

        let size = fs::metadata(path)?.len();
        self.policy.check(size)?;

        let data = fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| RollSafeError::Other(format!("Invalid file name: {}", path.display())))?;

        self.attach_bytes(id, &file_name, data)
    }

    pub fn attach_bytes(&mut self, id: &str, file_name: &str, data: Vec<u8>) -> Result<AttachmentInfo> {
        let policy = self.policy;
        self.store
            .try_mutate(|s| service::attach(s, id, file_name, data, &policy, Utc::now()))?;
        info!(id, file_name, "attached file");
        self.attachment_info(id)
    }

    fn attachment_info(&self, id: &str) -> Result<AttachmentInfo> {
        self.state()
            .find_document(id)
            .and_then(|d| d.attachment.as_ref())
            .map(AttachmentInfo::from)
            .ok_or_else(|| RollSafeError::NoAttachment(id.to_string()))
    }

    /// Remove a document's attachment.
    pub fn detach(&mut self, id: &str) -> Result<AttachmentInfo> {
        let removed = self.store.try_mutate(|s| {
            service::detach(s, id)?.ok_or_else(|| RollSafeError::NoAttachment(id.to_string()))
        })?;
        info!(id, "removed attachment");
        Ok(AttachmentInfo::from(&removed))
    }

    /// Write a document's attachment to `out`. Existing files are not replaced.
    pub fn export_attachment(&self, id: &str, out: &Path) -> Result<AttachmentInfo> {
        let doc = self
            .state()
            .find_document(id)
            .ok_or_else(|| RollSafeError::DocumentNotFound(id.to_string()))?;
        let attachment = doc
            .attachment
            .as_ref()
            .ok_or_else(|| RollSafeError::NoAttachment(id.to_string()))?;

        if out.exists() {
            return Err(RollSafeError::Other(format!(
                "{} already exists",
                out.display()
            )));
        }
        fs::write(out, &attachment.data)?;
        Ok(AttachmentInfo::from(attachment))
    }

    pub fn set_expiration(&mut self, id: &str, date: Option<NaiveDate>) -> Result<()> {
        self.store
            .try_mutate(|s| service::set_expiration(s, id, date))
    }

    /// Flip a document's allowlist membership. Allowed in every gate state.
    pub fn toggle_allowlist(&mut self, id: &str) -> Result<bool> {
        self.store.try_mutate(|s| gate::toggle_allowlist(s, id))
    }

    /// Set a new PIN; the gate ends up locked.
    pub fn set_pin(&mut self, pin: &str) -> Result<GateState> {
        let hasher = &self.hasher;
        self.store.try_mutate(|s| gate::set_pin(s, pin, hasher))
    }

    /// Submit a PIN, toggling the gate on a match.
    pub fn submit_pin(&mut self, pin: &str) -> Result<GateState> {
        let hasher = &self.hasher;
        self.store.try_mutate(|s| gate::submit_pin(s, pin, hasher))
    }

    /// Unlock unless already unlocked. The PIN is checked either way.
    pub fn enter_inspection(&mut self, pin: &str) -> Result<GateState> {
        match self.gate_state() {
            GateState::Unlocked => self.confirm_pin(pin),
            _ => self.submit_pin(pin),
        }
    }

    /// Lock unless already locked. The PIN is checked either way.
    pub fn exit_inspection(&mut self, pin: &str) -> Result<GateState> {
        match self.gate_state() {
            GateState::Locked => self.confirm_pin(pin),
            _ => self.submit_pin(pin),
        }
    }

    fn confirm_pin(&mut self, pin: &str) -> Result<GateState> {
        let hasher = &self.hasher;
        self.store.try_mutate(|s| {
            gate::verify_pin(s, pin, hasher)?;
            Ok(GateState::of(s))
        })
    }

    /// The inspection view; documents are listed only while unlocked.
    pub fn inspection(&self, today: NaiveDate) -> InspectionReport {
        let state = self.state();
        match gate::inspection_view(state) {
            InspectionView::NoPinSet => InspectionReport {
                state: GateState::NoPinSet,
                documents: Vec::new(),
            },
            InspectionView::Locked => InspectionReport {
                state: GateState::Locked,
                documents: Vec::new(),
            },
            InspectionView::Unlocked(docs) => InspectionReport {
                state: GateState::Unlocked,
                documents: docs
                    .into_iter()
                    .map(|doc| DocumentInfo::new(doc, state, today))
                    .collect(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStorage, VAULT_KEY};
    use tempfile::TempDir;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 5).unwrap()
    }

    fn ops(storage: &MemoryStorage) -> VaultOperations {
        VaultOperations::new(
            VaultStore::open(Box::new(storage.clone())),
            PinHasher::with_cost(1024, 1),
            AttachmentPolicy { max_bytes: 16 },
        )
    }

    #[test]
    fn test_list_and_show() {
        let ops = ops(&MemoryStorage::new());
        let all = ops.list("", today());
        assert_eq!(all.len(), 4);
        assert_eq!(all[0].status, ExpirationStatus::ExpiringSoon);
        assert_eq!(all[0].days_remaining, Some(7));
        assert!(all[0].allowlisted);

        assert_eq!(ops.list("medical", today()).len(), 1);
        assert!(matches!(
            ops.show("nope", today()),
            Err(RollSafeError::DocumentNotFound(_))
        ));
    }

    #[test]
    fn test_attach_file_checks_size_first() {
        let dir = TempDir::new().unwrap();
        let big = dir.path().join("big.pdf");
        fs::write(&big, vec![0u8; 17]).unwrap();
        let small = dir.path().join("card.png");
        fs::write(&small, b"png-bytes").unwrap();

        let storage = MemoryStorage::new();
        let mut ops = ops(&storage);

        assert!(matches!(
            ops.attach_file("cdl", &big),
            Err(RollSafeError::OversizedAttachment { size: 17, limit: 16 })
        ));
        assert!(storage.get(VAULT_KEY).is_none());

        let info = ops.attach_file("cdl", &small).unwrap();
        assert_eq!(info.file_name, "card.png");
        assert_eq!(info.mime_type, "image/png");
        assert!(storage.get(VAULT_KEY).is_some());

        let out = dir.path().join("exported.png");
        ops.export_attachment("cdl", &out).unwrap();
        assert_eq!(fs::read(&out).unwrap(), b"png-bytes");
        assert!(ops.export_attachment("cdl", &out).is_err());

        ops.detach("cdl").unwrap();
        assert!(matches!(ops.detach("cdl"), Err(RollSafeError::NoAttachment(_))));
    }

    #[test]
    fn test_inspection_flow() {
        let storage = MemoryStorage::new();
        let mut ops = ops(&storage);

        assert_eq!(ops.inspection(today()).state, GateState::NoPinSet);
        ops.toggle_allowlist("insurance").unwrap();
        ops.set_pin("1234").unwrap();

        let report = ops.inspection(today());
        assert_eq!(report.state, GateState::Locked);
        assert!(report.documents.is_empty());

        assert!(matches!(ops.enter_inspection("4321"), Err(RollSafeError::WrongPin)));
        assert_eq!(ops.enter_inspection("1234").unwrap(), GateState::Unlocked);
        // Entering again is a no-op rather than a toggle
        assert_eq!(ops.enter_inspection("1234").unwrap(), GateState::Unlocked);

        let ids: Vec<String> = ops
            .inspection(today())
            .documents
            .into_iter()
            .map(|d| d.id)
            .collect();
        assert_eq!(ids, vec!["cdl", "medical", "registration"]);

        // Reloading sees the unlocked flag
        let reopened = VaultStore::load(&storage);
        assert!(reopened.inspection_unlocked);

        assert_eq!(ops.exit_inspection("1234").unwrap(), GateState::Locked);
        assert_eq!(ops.exit_inspection("1234").unwrap(), GateState::Locked);
    }

    #[test]
    fn test_no_op_enter_and_exit_still_check_pin() {
        let storage = MemoryStorage::new();
        let mut ops = ops(&storage);
        ops.set_pin("1234").unwrap();

        ops.enter_inspection("1234").unwrap();
        assert!(matches!(ops.enter_inspection("9999"), Err(RollSafeError::WrongPin)));
        assert_eq!(ops.gate_state(), GateState::Unlocked);

        ops.exit_inspection("1234").unwrap();
        assert!(matches!(ops.exit_inspection("9999"), Err(RollSafeError::WrongPin)));
        assert_eq!(ops.gate_state(), GateState::Locked);
        assert!(!VaultStore::load(&storage).inspection_unlocked);
    }

    #[test]
    fn test_set_expiration_persists() {
        let storage = MemoryStorage::new();
        let mut ops = ops(&storage);
        ops.set_expiration("insurance", NaiveDate::from_ymd_opt(2027, 6, 30))
            .unwrap();
        let reloaded = VaultStore::load(&storage);
        assert_eq!(
            reloaded.find_document("insurance").unwrap().expires_on,
            NaiveDate::from_ymd_opt(2027, 6, 30)
        );
    }
}
