//! The conflict decision: may a server copy overwrite the local one?

use crate::models::SyncState;

/// Whether an incoming server copy may overwrite the local record in the
/// given state.
///
/// A Pending or InFlight copy carries a local edit the server has not
/// acknowledged; overwriting it would silently discard the user's work.
/// Done and Invalid copies carry no unacknowledged mutation, and a missing
/// local copy has nothing to lose.
pub fn can_be_overridden_by_server_copy(local_state: Option<SyncState>) -> bool {
    match local_state {
        None => true,
        Some(SyncState::Pending) => false,
        Some(SyncState::InFlight) => false,
        Some(SyncState::Done) => true,
        Some(SyncState::Invalid) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_table_is_exhaustive() {
        assert!(can_be_overridden_by_server_copy(None));
        assert!(!can_be_overridden_by_server_copy(Some(SyncState::Pending)));
        assert!(!can_be_overridden_by_server_copy(Some(SyncState::InFlight)));
        assert!(can_be_overridden_by_server_copy(Some(SyncState::Done)));
        assert!(can_be_overridden_by_server_copy(Some(SyncState::Invalid)));
    }
}
