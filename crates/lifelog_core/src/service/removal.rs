//! Two-phase removal confirmation.
//!
//! # Invariants
//! - A deletion is only applied after `request` followed by `confirm`.
//! - `Applied` and `Cancelled` end a flow; a new `request` starts another.
//! - A `request` while pending retargets the pending removal.

use crate::model::achievement::AchievementId;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Removal flow state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RemovalState {
    #[default]
    Idle,
    PendingConfirmation(AchievementId),
    Applied(AchievementId),
    Cancelled(AchievementId),
}

/// Invalid transition in the removal flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemovalError {
    /// `confirm` or `cancel` without a pending request.
    NothingPending,
}

impl Display for RemovalError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NothingPending => write!(f, "no removal is awaiting confirmation"),
        }
    }
}

impl Error for RemovalError {}

/// State machine guarding destructive removal.
#[derive(Debug, Default)]
pub struct RemovalFlow {
    state: RemovalState,
}

impl RemovalFlow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &RemovalState {
        &self.state
    }

    /// Id awaiting confirmation, if any.
    pub fn pending(&self) -> Option<&AchievementId> {
        match &self.state {
            RemovalState::PendingConfirmation(id) => Some(id),
            _ => None,
        }
    }

    /// Enters `PendingConfirmation` for `id`.
    ///
    /// Returns the previously pending id when this request replaced one.
    pub fn request(&mut self, id: AchievementId) -> Option<AchievementId> {
        let previous = match std::mem::take(&mut self.state) {
            RemovalState::PendingConfirmation(previous) => Some(previous),
            _ => None,
        };
        self.state = RemovalState::PendingConfirmation(id);
        previous
    }

    /// Approves the pending removal and returns the id to delete.
    pub fn confirm(&mut self) -> Result<AchievementId, RemovalError> {
        let id = self.take_pending()?;
        self.state = RemovalState::Applied(id.clone());
        Ok(id)
    }

    /// Abandons the pending removal.
    pub fn cancel(&mut self) -> Result<AchievementId, RemovalError> {
        let id = self.take_pending()?;
        self.state = RemovalState::Cancelled(id.clone());
        Ok(id)
    }

    fn take_pending(&mut self) -> Result<AchievementId, RemovalError> {
        match std::mem::take(&mut self.state) {
            RemovalState::PendingConfirmation(id) => Ok(id),
            other => {
                self.state = other;
                Err(RemovalError::NothingPending)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{RemovalError, RemovalFlow, RemovalState};
    use crate::model::achievement::AchievementId;

    fn id(value: &str) -> AchievementId {
        AchievementId::from_raw(value)
    }

    #[test]
    fn request_then_confirm_applies() {
        let mut flow = RemovalFlow::new();
        assert_eq!(flow.request(id("a")), None);
        assert_eq!(flow.pending(), Some(&id("a")));
        assert_eq!(flow.confirm(), Ok(id("a")));
        assert_eq!(flow.state(), &RemovalState::Applied(id("a")));
    }

    #[test]
    fn request_then_cancel_is_terminal() {
        let mut flow = RemovalFlow::new();
        flow.request(id("a"));
        assert_eq!(flow.cancel(), Ok(id("a")));
        assert_eq!(flow.state(), &RemovalState::Cancelled(id("a")));
        assert_eq!(flow.confirm(), Err(RemovalError::NothingPending));
        assert_eq!(flow.state(), &RemovalState::Cancelled(id("a")));
    }

    #[test]
    fn confirm_without_request_fails_from_idle() {
        let mut flow = RemovalFlow::new();
        assert_eq!(flow.confirm(), Err(RemovalError::NothingPending));
        assert_eq!(flow.cancel(), Err(RemovalError::NothingPending));
        assert_eq!(flow.state(), &RemovalState::Idle);
    }

    #[test]
    fn second_request_retargets_pending_removal() {
        let mut flow = RemovalFlow::new();
        flow.request(id("a"));
        assert_eq!(flow.request(id("b")), Some(id("a")));
        assert_eq!(flow.confirm(), Ok(id("b")));
    }
}
