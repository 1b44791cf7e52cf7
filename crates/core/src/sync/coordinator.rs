use std::{future::Future, sync::Arc};

use parking_lot::RwLock;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info, warn};

use crate::{
    clock::{Clock, SystemClock},
    config::SyncConfig,
    error::{SyncError, SyncResult},
    models::{
        AccountInformation, AccountTrainingStatus, SchoolYear, SubjectFeeItem,
        SubjectScheduleItem,
    },
    resource::{ProcessStatus, ResourceSnapshot, SkipReason, TimedResource},
    session::{AccountCredentials, AccountSession},
    sync::{
        client::RemoteDataClient,
        event::{Dispatch, ResourceKind, SyncEvent},
    },
};

/// Drives login, logout and the four account fetches.
///
/// Every operation checks its guards synchronously, then runs on a spawned
/// tokio task and must therefore be called from inside a runtime. At most
/// one operation per resource is in flight; a second call while one runs
/// is dropped, never queued. Clones share all state.
#[derive(Clone)]
pub struct SyncCoordinator {
    inner: Arc<Inner>,
}

struct Inner {
    client: Arc<dyn RemoteDataClient>,
    clock: Arc<dyn Clock>,
    ttl_ms: i64,
    events: Option<mpsc::Sender<SyncEvent>>,
    // Bumped by logout; fetches started under an older value drop their result.
    generation: RwLock<u64>,
    school_year: RwLock<Option<SchoolYear>>,
    session: TimedResource<AccountSession>,
    subject_schedule: TimedResource<Vec<SubjectScheduleItem>>,
    subject_fee: TimedResource<Vec<SubjectFeeItem>>,
    account_information: TimedResource<AccountInformation>,
    training_status: TimedResource<AccountTrainingStatus>,
}

/// Builder for [`SyncCoordinator`].
pub struct SyncCoordinatorBuilder {
    client: Arc<dyn RemoteDataClient>,
    config: SyncConfig,
    clock: Arc<dyn Clock>,
    events: Option<mpsc::Sender<SyncEvent>>,
}

impl SyncCoordinatorBuilder {
    /// Use a custom time source.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Deliver completion events to this channel.
    pub fn events(mut self, sender: mpsc::Sender<SyncEvent>) -> Self {
        self.events = Some(sender);
        self
    }

    /// Finish building.
    pub fn build(self) -> SyncCoordinator {
        SyncCoordinator {
            inner: Arc::new(Inner {
                client: self.client,
                clock: self.clock,
                ttl_ms: self.config.ttl_millis(),
                events: self.events,
                generation: RwLock::new(0),
                school_year: RwLock::new(None),
                session: TimedResource::new(),
                subject_schedule: TimedResource::new(),
                subject_fee: TimedResource::new(),
                account_information: TimedResource::new(),
                training_status: TimedResource::new(),
            }),
        }
    }
}

impl SyncCoordinator {
    /// Coordinator with the system clock and no event channel.
    pub fn new(client: Arc<dyn RemoteDataClient>, config: SyncConfig) -> Self {
        Self::builder(client, config).build()
    }

    /// Start configuring a coordinator.
    pub fn builder(client: Arc<dyn RemoteDataClient>, config: SyncConfig) -> SyncCoordinatorBuilder {
        SyncCoordinatorBuilder {
            client,
            config,
            clock: Arc::new(SystemClock),
            events: None,
        }
    }

    fn now(&self) -> i64 {
        self.inner.clock.now_millis()
    }

    // Never waits on the receiver; a full channel drops the event.
    fn emit(&self, kind: ResourceKind, success: bool) {
        let Some(sender) = &self.inner.events else {
            return;
        };
        match sender.try_send(SyncEvent { kind, success }) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!(resource = kind.name(), "event channel full, dropping event");
            }
            Err(TrySendError::Closed(_)) => {
                debug!(resource = kind.name(), "event receiver dropped");
            }
        }
    }

    // Caller must have cleared the session token first: no fetch may read a
    // token after the bump.
    fn forget_dependents(&self) {
        let inner = &self.inner;
        *inner.generation.write() += 1;
        inner.subject_schedule.reset();
        inner.subject_fee.reset();
        inner.account_information.reset();
        inner.training_status.reset();
    }

    /// Log in with new credentials, or re-authenticate the stored ones when
    /// `credentials` is `None`.
    ///
    /// A failed attempt leaves the session `Failed` when the stored
    /// credentials are well formed (wrong password, network trouble) and
    /// `NotStarted` when there is nothing sensible to retry with.
    ///
    /// Switching to a different username drops everything cached for the
    /// previous account, including results still in flight.
    pub fn login(&self, credentials: Option<AccountCredentials>, force: bool) -> Dispatch {
        let cell = &self.inner.session;
        if !cell.begin_if_idle() {
            debug!("login already in flight");
            return Dispatch::Skipped(SkipReason::InFlight);
        }

        let new_account = credentials.is_some();
        if let Some(credentials) = credentials {
            let switching = cell.with_value(|stored| {
                stored.map_or(false, |stored| {
                    stored.credentials().username().trim() != credentials.username().trim()
                })
            });
            cell.replace_running(Some(AccountSession::new(credentials)));
            if switching {
                info!("account changed, dropping cached resources");
                self.forget_dependents();
            }
        }

        let this = self.clone();
        Dispatch::Started(tokio::spawn(async move {
            let guard = this.inner.session.running_guard();
            let success = this.run_login(new_account, force).await;
            guard.disarm();
            this.emit(ResourceKind::Account, success);
            success
        }))
    }

    async fn run_login(&self, new_account: bool, force: bool) -> bool {
        let cell = &self.inner.session;
        let result = match cell.value() {
            Some(current) if new_account => self.authenticate(current, false).await,
            Some(current) if current.is_valid() => self.authenticate(current, force).await,
            Some(_) => Err(SyncError::Authentication(
                "stored credentials are malformed".to_string(),
            )),
            None => Err(SyncError::Authentication(
                "no account credentials to log in with".to_string(),
            )),
        };

        match result {
            Ok(session) => {
                info!(username = session.credentials().username(), "logged in");
                cell.complete(Ok(session), self.now())
            }
            Err(err) => {
                let retryable = cell.with_value(|session| session.map_or(false, AccountSession::is_valid));
                warn!(retryable, "login failed: {err}");
                if retryable {
                    cell.complete(Err(err), self.now());
                } else {
                    cell.finish(ProcessStatus::NotStarted);
                }
                false
            }
        }
    }

    async fn authenticate(&self, session: AccountSession, force_login: bool) -> SyncResult<AccountSession> {
        let grant = self.inner.client.authenticate(&session, force_login).await?;
        if grant.token.trim().is_empty() || grant.issued_at_ms <= 0 {
            return Err(SyncError::NoDataReturned);
        }
        Ok(session.with_grant(grant))
    }

    /// Re-authenticate the stored account, then refresh account information
    /// and the subject schedule in the background.
    ///
    /// The returned handle resolves with the login result only; the two
    /// follow-up fetches report through events.
    pub fn re_login(&self, force: bool) -> Dispatch {
        let handle = match self.login(None, force) {
            Dispatch::Started(handle) => handle,
            skipped => return skipped,
        };

        let this = self.clone();
        Dispatch::Started(tokio::spawn(async move {
            let success = Dispatch::Started(handle).outcome().await.unwrap_or(false);
            if success && this.inner.session.status() == ProcessStatus::Succeeded {
                this.fetch_account_information(false);
                this.fetch_subject_schedule(false);
            }
            success
        }))
    }

    /// Forget the session and every cached resource.
    pub fn logout(&self) -> Dispatch {
        let cell = &self.inner.session;
        if !cell.begin_if_idle() {
            debug!("logout skipped, session operation in flight");
            return Dispatch::Skipped(SkipReason::InFlight);
        }

        let this = self.clone();
        Dispatch::Started(tokio::spawn(async move {
            let inner = &this.inner;
            if let Some(current) = inner.session.value().filter(AccountSession::has_token) {
                if let Err(err) = inner.client.invalidate(&current).await {
                    warn!("remote logout failed, clearing local session anyway: {err}");
                }
            }

            inner.session.replace_running(None);
            this.forget_dependents();
            inner.session.finish_cleared();

            info!("logged out");
            this.emit(ResourceKind::Account, true);
            true
        }))
    }

    /// Refresh the subject schedule for the selected school year.
    pub fn fetch_subject_schedule(&self, force: bool) -> Dispatch {
        self.dispatch_fetch(
            ResourceKind::SubjectSchedule,
            self.inner.subject_schedule.clone(),
            force,
            true,
            |client, session, school_year| async move {
                match school_year {
                    Some(school_year) => client.fetch_schedule(&session, school_year).await,
                    None => Err(SyncError::PreconditionUnmet("school year")),
                }
            },
        )
    }

    /// Refresh the fee list for the selected school year.
    pub fn fetch_subject_fee(&self, force: bool) -> Dispatch {
        self.dispatch_fetch(
            ResourceKind::SubjectFee,
            self.inner.subject_fee.clone(),
            force,
            true,
            |client, session, school_year| async move {
                match school_year {
                    Some(school_year) => client.fetch_fee(&session, school_year).await,
                    None => Err(SyncError::PreconditionUnmet("school year")),
                }
            },
        )
    }

    /// Refresh the student's account information.
    pub fn fetch_account_information(&self, force: bool) -> Dispatch {
        self.dispatch_fetch(
            ResourceKind::AccountInformation,
            self.inner.account_information.clone(),
            force,
            false,
            |client, session, _| async move { client.fetch_account_info(&session).await },
        )
    }

    /// Refresh the training score and graduation status.
    pub fn fetch_account_training_status(&self, force: bool) -> Dispatch {
        self.dispatch_fetch(
            ResourceKind::TrainingStatus,
            self.inner.training_status.clone(),
            force,
            false,
            |client, session, _| async move { client.fetch_training_status(&session).await },
        )
    }

    fn dispatch_fetch<T, F, Fut>(
        &self,
        kind: ResourceKind,
        resource: TimedResource<T>,
        force: bool,
        needs_school_year: bool,
        fetch: F,
    ) -> Dispatch
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce(Arc<dyn RemoteDataClient>, AccountSession, Option<SchoolYear>) -> Fut,
        Fut: Future<Output = SyncResult<T>> + Send + 'static,
    {
        let now = self.now();
        if !force && !resource.is_refresh_needed(now, self.inner.ttl_ms) {
            debug!(resource = kind.name(), "cache still fresh");
            return Dispatch::Skipped(SkipReason::Fresh);
        }

        // Read before the session so a concurrent logout is always noticed.
        let generation = *self.inner.generation.read();
        let Some(session) = self.inner.session.value().filter(AccountSession::has_token) else {
            debug!(resource = kind.name(), "no session token");
            return Dispatch::Skipped(SkipReason::PreconditionUnmet("session token"));
        };
        let school_year = *self.inner.school_year.read();
        if needs_school_year && school_year.is_none() {
            debug!(resource = kind.name(), "no school year selected");
            return Dispatch::Skipped(SkipReason::PreconditionUnmet("school year"));
        }

        if let Err(reason) = resource.begin_refresh(force, now, self.inner.ttl_ms) {
            debug!(resource = kind.name(), ?reason, "fetch not started");
            return Dispatch::Skipped(reason);
        }

        let request = fetch(Arc::clone(&self.inner.client), session, school_year);
        let this = self.clone();
        Dispatch::Started(tokio::spawn(async move {
            let guard = resource.running_guard();
            let result = request.await;
            guard.disarm();
            let success = this.settle_fetch(kind, &resource, generation, result);
            this.emit(kind, success);
            success
        }))
    }

    fn settle_fetch<T>(
        &self,
        kind: ResourceKind,
        resource: &TimedResource<T>,
        generation: u64,
        result: SyncResult<T>,
    ) -> bool {
        let current = self.inner.generation.read();
        if *current != generation {
            info!(resource = kind.name(), "discarding result fetched for a previous session");
            resource.finish_cleared();
            return false;
        }
        if let Err(err) = &result {
            warn!(resource = kind.name(), "fetch failed: {err}");
        }
        resource.complete(result, self.now())
    }

    /// Select the school year used by schedule and fee fetches.
    pub fn set_school_year(&self, school_year: SchoolYear) {
        *self.inner.school_year.write() = Some(school_year);
    }

    /// Currently selected school year.
    pub fn school_year(&self) -> Option<SchoolYear> {
        *self.inner.school_year.read()
    }

    /// Copy of the stored session, if any.
    pub fn account_session(&self) -> Option<AccountSession> {
        self.inner.session.value()
    }

    /// Put back a session loaded from persistent storage. Ignored while a
    /// login or logout is running.
    pub fn restore_session(&self, session: AccountSession) -> bool {
        self.inner.session.replace_idle(Some(session))
    }

    /// Whether the stored session holds a token that has not outlived the TTL.
    pub fn is_authenticated(&self) -> bool {
        let now = self.now();
        self.inner
            .session
            .with_value(|session| session.map_or(false, |s| s.is_authenticated(now, self.inner.ttl_ms)))
    }

    /// Whether the last login succeeded.
    pub fn is_logged_in(&self) -> bool {
        self.inner.session.status() == ProcessStatus::Succeeded
    }

    /// Whether a login or schedule refresh is in flight.
    pub fn is_loading(&self) -> bool {
        self.inner.session.status() == ProcessStatus::Running
            || self.inner.subject_schedule.status() == ProcessStatus::Running
    }

    /// Cached schedule, empty when nothing was fetched.
    pub fn subject_schedule_cache(&self) -> Vec<SubjectScheduleItem> {
        self.inner.subject_schedule.value().unwrap_or_default()
    }

    /// Status of one resource.
    pub fn status(&self, kind: ResourceKind) -> ProcessStatus {
        match kind {
            ResourceKind::Account => self.inner.session.status(),
            ResourceKind::SubjectSchedule => self.inner.subject_schedule.status(),
            ResourceKind::SubjectFee => self.inner.subject_fee.status(),
            ResourceKind::AccountInformation => self.inner.account_information.status(),
            ResourceKind::TrainingStatus => self.inner.training_status.status(),
        }
    }

    /// Snapshot of the session cell.
    pub fn session_state(&self) -> ResourceSnapshot<AccountSession> {
        self.inner.session.snapshot()
    }

    /// Snapshot of the subject schedule cell.
    pub fn subject_schedule_state(&self) -> ResourceSnapshot<Vec<SubjectScheduleItem>> {
        self.inner.subject_schedule.snapshot()
    }

    /// Snapshot of the subject fee cell.
    pub fn subject_fee_state(&self) -> ResourceSnapshot<Vec<SubjectFeeItem>> {
        self.inner.subject_fee.snapshot()
    }

    /// Snapshot of the account information cell.
    pub fn account_information_state(&self) -> ResourceSnapshot<AccountInformation> {
        self.inner.account_information.snapshot()
    }

    /// Snapshot of the training status cell.
    pub fn training_status_state(&self) -> ResourceSnapshot<AccountTrainingStatus> {
        self.inner.training_status.snapshot()
    }
}
