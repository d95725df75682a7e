//! Per-item status state machine.

use serde::{Deserialize, Serialize};

use crate::DomainError;

/// The status of a single product line within an order.
///
/// State transitions:
/// ```text
/// PENDING ──► PROCESSED ──► SHIPPED ──► FINISHED
///    │
///    └──► CANCELLED
/// ```
///
/// The buyer-side order item and its seller-side mirror each carry one of
/// these; both must converge to the same value once a transition completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum ItemStatus {
    /// Placed, awaiting payment.
    #[default]
    Pending,

    /// Payment confirmed, seller may ship.
    Processed,

    /// Seller handed the item to the carrier.
    Shipped,

    /// Buyer confirmed receipt (terminal state).
    Finished,

    /// Withdrawn before payment (terminal state).
    Cancelled,
}

/// An action that moves an item from one status to the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemAction {
    Process,
    Ship,
    Finish,
    Cancel,
}

impl ItemAction {
    /// The status an item must be in for this action to apply.
    pub fn required_status(&self) -> ItemStatus {
        match self {
            ItemAction::Process => ItemStatus::Pending,
            ItemAction::Ship => ItemStatus::Processed,
            ItemAction::Finish => ItemStatus::Shipped,
            ItemAction::Cancel => ItemStatus::Pending,
        }
    }

    /// The status an item ends up in after this action.
    pub fn target_status(&self) -> ItemStatus {
        match self {
            ItemAction::Process => ItemStatus::Processed,
            ItemAction::Ship => ItemStatus::Shipped,
            ItemAction::Finish => ItemStatus::Finished,
            ItemAction::Cancel => ItemStatus::Cancelled,
        }
    }

    /// Returns the action name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemAction::Process => "process",
            ItemAction::Ship => "ship",
            ItemAction::Finish => "finish",
            ItemAction::Cancel => "cancel",
        }
    }
}

impl std::fmt::Display for ItemAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl ItemStatus {
    /// Applies an action, returning the resulting status.
    pub fn transition(self, action: ItemAction) -> Result<ItemStatus, DomainError> {
        match (self, action) {
            (ItemStatus::Pending, ItemAction::Process) => Ok(ItemStatus::Processed),
            (ItemStatus::Processed, ItemAction::Ship) => Ok(ItemStatus::Shipped),
            (ItemStatus::Shipped, ItemAction::Finish) => Ok(ItemStatus::Finished),
            (ItemStatus::Pending, ItemAction::Cancel) => Ok(ItemStatus::Cancelled),
            (
                ItemStatus::Pending
                | ItemStatus::Processed
                | ItemStatus::Shipped
                | ItemStatus::Finished
                | ItemStatus::Cancelled,
                _,
            ) => Err(DomainError::InvalidTransition {
                action,
                expected: action.required_status(),
                actual: self,
            }),
        }
    }

    /// Position along the forward path, used to decide which mirror is ahead.
    ///
    /// `Cancelled` is off the forward path and has no rank.
    pub fn progress(&self) -> Option<u8> {
        match self {
            ItemStatus::Pending => Some(0),
            ItemStatus::Processed => Some(1),
            ItemStatus::Shipped => Some(2),
            ItemStatus::Finished => Some(3),
            ItemStatus::Cancelled => None,
        }
    }

    /// Returns true if this status is strictly further along than `other`.
    pub fn is_ahead_of(&self, other: ItemStatus) -> bool {
        match (self.progress(), other.progress()) {
            (Some(a), Some(b)) => a > b,
            _ => false,
        }
    }

    /// Returns true if the item can still be withdrawn.
    pub fn can_cancel(&self) -> bool {
        matches!(self, ItemStatus::Pending)
    }

    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ItemStatus::Finished | ItemStatus::Cancelled)
    }

    /// Returns the wire name of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Pending => "PENDING",
            ItemStatus::Processed => "PROCESSED",
            ItemStatus::Shipped => "SHIPPED",
            ItemStatus::Finished => "FINISHED",
            ItemStatus::Cancelled => "CANCELLED",
        }
    }
}

impl std::fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_status_is_pending() {
        assert_eq!(ItemStatus::default(), ItemStatus::Pending);
    }

    #[test]
    fn test_forward_path() {
        let s = ItemStatus::Pending;
        let s = s.transition(ItemAction::Process).unwrap();
        assert_eq!(s, ItemStatus::Processed);
        let s = s.transition(ItemAction::Ship).unwrap();
        assert_eq!(s, ItemStatus::Shipped);
        let s = s.transition(ItemAction::Finish).unwrap();
        assert_eq!(s, ItemStatus::Finished);
    }

    #[test]
    fn test_finish_requires_shipped() {
        assert!(ItemStatus::Pending.transition(ItemAction::Finish).is_err());
        assert!(ItemStatus::Processed.transition(ItemAction::Finish).is_err());
        assert!(ItemStatus::Finished.transition(ItemAction::Finish).is_err());

        let err = ItemStatus::Pending
            .transition(ItemAction::Finish)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "cannot finish item: expected SHIPPED, found PENDING"
        );
    }

    #[test]
    fn test_cancel_only_from_pending() {
        assert_eq!(
            ItemStatus::Pending.transition(ItemAction::Cancel).unwrap(),
            ItemStatus::Cancelled
        );
        assert!(ItemStatus::Processed.transition(ItemAction::Cancel).is_err());
        assert!(ItemStatus::Shipped.transition(ItemAction::Cancel).is_err());
        assert!(ItemStatus::Cancelled.transition(ItemAction::Cancel).is_err());
    }

    #[test]
    fn test_required_and_target_agree_with_transition() {
        for action in [
            ItemAction::Process,
            ItemAction::Ship,
            ItemAction::Finish,
            ItemAction::Cancel,
        ] {
            assert_eq!(
                action.required_status().transition(action).unwrap(),
                action.target_status()
            );
        }
    }

    #[test]
    fn test_progress_ordering() {
        assert!(ItemStatus::Shipped.is_ahead_of(ItemStatus::Processed));
        assert!(!ItemStatus::Pending.is_ahead_of(ItemStatus::Pending));
        assert!(!ItemStatus::Cancelled.is_ahead_of(ItemStatus::Pending));
        assert!(!ItemStatus::Finished.is_ahead_of(ItemStatus::Cancelled));
    }

    #[test]
    fn test_serialized_uppercase() {
        let json = serde_json::to_string(&ItemStatus::Processed).unwrap();
        assert_eq!(json, "\"PROCESSED\"");
        let parsed: ItemStatus = serde_json::from_str("\"SHIPPED\"").unwrap();
        assert_eq!(parsed, ItemStatus::Shipped);
    }

    #[test]
    fn test_display_matches_wire_name() {
        assert_eq!(ItemStatus::Finished.to_string(), "FINISHED");
        assert_eq!(ItemAction::Finish.to_string(), "finish");
    }
}
