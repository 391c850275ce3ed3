use std::collections::HashMap;
use std::sync::Mutex;

use rescue_core::{current_unix_timestamp_ms, new_correlation_id, ItemKind};
use tokio::sync::watch;

use crate::ActionError;

#[derive(Debug, Clone, PartialEq, Eq)]
/// An outbound place-item request awaiting acknowledgement.
pub struct PendingAction {
    pub request_id: String,
    pub kind: ItemKind,
    pub quantity: u32,
    pub created_unix_ms: u64,
}

impl PendingAction {
    pub fn new(kind: ItemKind, quantity: u32) -> Self {
        Self {
            request_id: new_correlation_id("place"),
            kind,
            quantity,
            created_unix_ms: current_unix_timestamp_ms(),
        }
    }
}

/// Validates a place-item command before anything is sent.
pub fn validate_place_item(kind: &str, quantity: u32) -> Result<ItemKind, ActionError> {
    if quantity == 0 {
        return Err(ActionError::InvalidQuantity);
    }
    kind.parse::<ItemKind>()
        .map_err(|_| ActionError::UnknownItem(kind.trim().to_string()))
}

#[derive(Debug, Default)]
pub(crate) struct PendingActions {
    inner: Mutex<HashMap<String, PendingAction>>,
}

impl PendingActions {
    pub(crate) fn insert(&self, action: PendingAction) {
        if let Ok(mut pending) = self.inner.lock() {
            pending.insert(action.request_id.clone(), action);
        }
    }

    pub(crate) fn resolve(&self, request_id: &str) -> Option<PendingAction> {
        self.inner.lock().ok()?.remove(request_id)
    }

    pub(crate) fn drain(&self) -> Vec<PendingAction> {
        match self.inner.lock() {
            Ok(mut pending) => pending.drain().map(|(_, action)| action).collect(),
            Err(_) => Vec::new(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.inner.lock().map(|pending| pending.len()).unwrap_or(0)
    }
}

/// Single-slot holder for the most recent unacknowledged [`ActionError`].
///
/// A newer error always replaces the stored one. Observers are only notified
/// when the slot was empty or held a different kind, so a burst of identical
/// failures is surfaced once until [`ErrorSlot::clear`] is called.
#[derive(Debug)]
pub struct ErrorSlot {
    tx: watch::Sender<Option<ActionError>>,
}

impl Default for ErrorSlot {
    fn default() -> Self {
        Self {
            tx: watch::Sender::new(None),
        }
    }
}

impl ErrorSlot {
    pub fn report(&self, error: ActionError) {
        tracing::warn!(kind = error.kind(), error = %error, "place-item action failed");
        self.tx.send_if_modified(|slot| {
            let notify = !matches!(slot, Some(existing) if existing.kind() == error.kind());
            *slot = Some(error);
            notify
        });
    }

    pub fn clear(&self) {
        self.tx.send_if_modified(|slot| slot.take().is_some());
    }

    pub fn current(&self) -> Option<ActionError> {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<ActionError>> {
        self.tx.subscribe()
    }
}
