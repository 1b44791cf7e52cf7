use async_trait::async_trait;

use crate::{
    error::SyncResult,
    models::{
        AccountInformation, AccountTrainingStatus, SchoolYear, SubjectFeeItem,
        SubjectScheduleItem,
    },
    session::{AccountSession, SessionGrant},
};

/// Network access to the university account portal.
///
/// Implementations perform the actual requests; the coordinator only
/// sequences the calls and interprets the results.
#[async_trait]
pub trait RemoteDataClient: Send + Sync {
    /// Log in, or reuse the server session unless `force_login` is set.
    async fn authenticate(
        &self,
        session: &AccountSession,
        force_login: bool,
    ) -> SyncResult<SessionGrant>;

    /// Subjects enrolled in for the school year.
    async fn fetch_schedule(
        &self,
        session: &AccountSession,
        school_year: SchoolYear,
    ) -> SyncResult<Vec<SubjectScheduleItem>>;

    /// Fee lines for the school year.
    async fn fetch_fee(
        &self,
        session: &AccountSession,
        school_year: SchoolYear,
    ) -> SyncResult<Vec<SubjectFeeItem>>;

    /// Student profile.
    async fn fetch_account_info(&self, session: &AccountSession)
        -> SyncResult<AccountInformation>;

    /// Training score summary and graduation checklist.
    async fn fetch_training_status(
        &self,
        session: &AccountSession,
    ) -> SyncResult<AccountTrainingStatus>;

    /// Drop the session server-side. Failures are logged and ignored.
    async fn invalidate(&self, _session: &AccountSession) -> SyncResult<()> {
        Ok(())
    }
}
