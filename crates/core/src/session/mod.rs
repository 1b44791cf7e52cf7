//! Account credentials and login session state.

mod models;

pub use models::{AccountCredentials, AccountSession, SessionGrant};
