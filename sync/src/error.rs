//! Errors surfaced by the engine handle itself.

use frontdesk_core::ErrorKind;

/// Failure talking to the engine's own background task.
///
/// Backend and validation failures travel through [`CommandError`] and
/// the notice feed instead; these errors only cover the handle finding
/// its reconciler gone.
///
/// [`CommandError`]: crate::commands::CommandError
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// The reconciler task has shut down and can take no more requests.
    #[error("synchronization engine is stopped")]
    EngineStopped,
}

impl SyncError {
    /// Stable classification for callers that branch on failure class.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::EngineStopped => ErrorKind::ChannelDisconnected,
        }
    }
}
