#![warn(clippy::all, missing_docs)]

//! Core of the DUT student companion app.
//!
//! This crate hosts the account session state machine, the cached
//! remote resources it keeps in sync, and the configuration shared by
//! every frontend. Rendering, persistence and the concrete network
//! client live outside this crate.

pub mod clock;
pub mod config;
pub mod error;
pub mod models;
pub mod resource;
pub mod session;
pub mod sync;

pub use config::SyncConfig;
pub use error::{SyncError, SyncResult};
pub use models::{
    AccountInformation, AccountTrainingStatus, SchoolYear, SubjectFeeItem, SubjectScheduleItem,
};
pub use resource::{ProcessStatus, ResourceSnapshot, SkipReason, TimedResource};
pub use session::{AccountCredentials, AccountSession, SessionGrant};
pub use sync::{Dispatch, RemoteDataClient, ResourceKind, SyncCoordinator, SyncEvent};
