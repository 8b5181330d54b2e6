use basis_integration::{error::SocketError, subscription::SubscriptionId};
use thiserror::Error;

/// All errors generated in `basis-data`.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum DataError {
    #[error("failed to initialise reconnecting market stream due to empty subscriptions")]
    SubscriptionsEmpty,

    #[error("initial snapshot missing for: {0}")]
    InitialSnapshotMissing(SubscriptionId),

    #[error("initial snapshot invalid: {0}")]
    InitialSnapshotInvalid(String),

    #[error("SocketError: {0}")]
    Socket(String),

    #[error(
        "InvalidSequence: first_update_id {first_update_id} does not follow on from the \
         prev_last_update_id {prev_last_update_id}"
    )]
    InvalidSequence {
        prev_last_update_id: u64,
        first_update_id: u64,
    },
}

impl DataError {
    /// Determine if an error requires the market stream to re-initialise.
    ///
    /// An invalid order book sequence means the local book has diverged from the venue and can
    /// only be repaired with a fresh snapshot.
    pub fn is_terminal(&self) -> bool {
        matches!(self, DataError::InvalidSequence { .. })
    }
}

impl From<SocketError> for DataError {
    fn from(value: SocketError) -> Self {
        Self::Socket(value.to_string())
    }
}
