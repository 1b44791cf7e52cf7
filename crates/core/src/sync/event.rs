use tokio::{sync::mpsc, task::JoinHandle};
use tracing::warn;

use crate::{config::SyncConfig, resource::SkipReason};

/// The five resources the coordinator manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// Login session; login and logout both report under this kind.
    Account,
    /// Subjects of the selected school year.
    SubjectSchedule,
    /// Fee lines of the selected school year.
    SubjectFee,
    /// Student profile.
    AccountInformation,
    /// Training score and graduation status.
    TrainingStatus,
}

impl ResourceKind {
    /// Stable numeric code observers key their refresh logic on.
    pub fn code(self) -> u8 {
        match self {
            Self::Account => 1,
            Self::SubjectSchedule => 2,
            Self::SubjectFee => 3,
            Self::AccountInformation => 4,
            Self::TrainingStatus => 5,
        }
    }

    /// Short name used in logs.
    pub fn name(self) -> &'static str {
        match self {
            Self::Account => "account",
            Self::SubjectSchedule => "subject_schedule",
            Self::SubjectFee => "subject_fee",
            Self::AccountInformation => "account_information",
            Self::TrainingStatus => "training_status",
        }
    }
}

/// Sent once every time an operation completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncEvent {
    /// Resource the operation worked on.
    pub kind: ResourceKind,
    /// Whether it succeeded.
    pub success: bool,
}

impl SyncEvent {
    /// Numeric code of the resource kind (`1..=5`).
    pub fn code(&self) -> u8 {
        self.kind.code()
    }
}

/// Build an event channel sized from configuration.
pub fn event_channel(config: &SyncConfig) -> (mpsc::Sender<SyncEvent>, mpsc::Receiver<SyncEvent>) {
    mpsc::channel(config.event_buffer)
}

/// Handle returned by every coordinator operation.
#[derive(Debug)]
pub enum Dispatch {
    /// The operation is running on a background task that resolves to its
    /// success flag.
    Started(JoinHandle<bool>),
    /// The operation did not start.
    Skipped(SkipReason),
}

impl Dispatch {
    /// Whether a background task was spawned.
    pub fn is_started(&self) -> bool {
        matches!(self, Self::Started(_))
    }

    /// Reason the operation was skipped, if it was.
    pub fn skip_reason(&self) -> Option<SkipReason> {
        match self {
            Self::Started(_) => None,
            Self::Skipped(reason) => Some(*reason),
        }
    }

    /// Wait for completion. `None` when skipped; a task that panicked
    /// counts as a failure.
    pub async fn outcome(self) -> Option<bool> {
        match self {
            Self::Started(handle) => Some(handle.await.unwrap_or_else(|err| {
                warn!("sync task ended abnormally: {err}");
                false
            })),
            Self::Skipped(_) => None,
        }
    }
}
