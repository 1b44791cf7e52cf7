//! Login lifecycle and coordinated refresh of account resources.

/// Remote service abstraction.
pub mod client;
/// Session and fetch orchestration.
pub mod coordinator;
/// Completion events and operation handles.
pub mod event;

pub use client::RemoteDataClient;
pub use coordinator::{SyncCoordinator, SyncCoordinatorBuilder};
pub use event::{event_channel, Dispatch, ResourceKind, SyncEvent};
