//! Inspection mode gate and allowlist administration.
//!
//! The lock only controls what the inspection view shows. Listing documents,
//! managing attachments and editing the allowlist stay available in every
//! state.

use crate::error::{Result, RollSafeError};
use crate::models::{Document, VaultState};
use crate::pin::{validate_pin, PinHasher};
use serde::Serialize;
use tracing::{debug, info, warn};

/// Access mode derived from the vault state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GateState {
    NoPinSet,
    Locked,
    Unlocked,
}

impl GateState {
    pub fn of(state: &VaultState) -> Self {
        match (&state.pin, state.inspection_unlocked) {
            (None, _) => Self::NoPinSet,
            (Some(_), false) => Self::Locked,
            (Some(_), true) => Self::Unlocked,
        }
    }
}

/// What the inspection view is allowed to show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InspectionView<'a> {
    NoPinSet,
    Locked,
    Unlocked(Vec<&'a Document>),
}

/// Store a new PIN. Always leaves the gate locked.
pub fn set_pin(state: &mut VaultState, pin: &str, hasher: &PinHasher) -> Result<GateState> {
    validate_pin(pin).map_err(RollSafeError::InvalidPin)?;

    let credential = hasher.hash(pin)?;
    let was_unlocked = state.inspection_unlocked;
    state.pin = Some(credential);
    state.inspection_unlocked = false;

    if was_unlocked {
        info!("inspection PIN changed while unlocked, re-locking");
    } else {
        info!("inspection PIN set");
    }
    Ok(GateState::Locked)
}

/// Check `pin` against the stored credential without changing the gate.
///
/// A matching legacy credential is replaced by a hashed one.
pub fn verify_pin(state: &mut VaultState, pin: &str, hasher: &PinHasher) -> Result<()> {
    let Some(credential) = state.pin.as_ref() else {
        return Err(RollSafeError::NoPinSet);
    };

    if !hasher.verify(pin, credential)? {
        warn!("rejected inspection PIN");
        return Err(RollSafeError::WrongPin);
    }

    if credential.is_legacy() {
        debug!("upgrading legacy PIN credential");
        state.pin = Some(hasher.hash(pin)?);
    }
    Ok(())
}

/// Submit a PIN. A match toggles between locked and unlocked.
///
/// On any error the state is left untouched.
pub fn submit_pin(state: &mut VaultState, pin: &str, hasher: &PinHasher) -> Result<GateState> {
    verify_pin(state, pin, hasher)?;

    state.inspection_unlocked = !state.inspection_unlocked;
    let next = GateState::of(state);
    info!(state = ?next, "inspection gate toggled");
    Ok(next)
}

/// Documents that are on the allowlist, in vault order.
pub fn allowlisted_documents(state: &VaultState) -> Vec<&Document> {
    state
        .documents
        .iter()
        .filter(|doc| state.allowlist.contains(&doc.id))
        .collect()
}

/// The inspection view for the current gate state.
pub fn inspection_view(state: &VaultState) -> InspectionView<'_> {
    match GateState::of(state) {
        GateState::NoPinSet => InspectionView::NoPinSet,
        GateState::Locked => InspectionView::Locked,
        GateState::Unlocked => InspectionView::Unlocked(allowlisted_documents(state)),
    }
}

/// Add `id` to the allowlist, or remove it if present.
///
/// Returns whether the document is allowlisted afterwards. Works in any
/// gate state.
pub fn toggle_allowlist(state: &mut VaultState, id: &str) -> Result<bool> {
    if state.find_document(id).is_none() {
        return Err(RollSafeError::DocumentNotFound(id.to_string()));
    }

    let allowed = if state.allowlist.remove(id) {
        false
    } else {
        state.allowlist.insert(id.to_string());
        true
    };
    debug!(id, allowed, "allowlist toggled");
    Ok(allowed)
}
