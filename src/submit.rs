use std::sync::Arc;
use std::time::Instant;

use chrono::TimeZone;
use futures::future::join_all;
use tracing::{info, warn};
use ulid::Ulid;

use crate::api::BookingApi;
use crate::engine::EngineError;
use crate::model::*;
use crate::notify::NotifyHub;
use crate::reserved::plan_requests;
use crate::session::{Authenticated, SessionContext, SessionError};

/// One submitted range and where it stands with the API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedRange {
    pub id: Ulid,
    pub day: DayKey,
    pub range: HourRange,
    pub request: ReservationRequest,
    pub status: SubmissionStatus,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubmissionSummary {
    pub pending: usize,
    pub confirmed: usize,
    pub failed: usize,
}

impl std::fmt::Display for SubmissionSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} confirmed, {} failed, {} pending",
            self.confirmed, self.failed, self.pending
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitError {
    Engine(EngineError),
    Session(SessionError),
    NothingToRetry,
}

impl From<EngineError> for SubmitError {
    fn from(e: EngineError) -> Self {
        SubmitError::Engine(e)
    }
}

impl From<SessionError> for SubmitError {
    fn from(e: SessionError) -> Self {
        SubmitError::Session(e)
    }
}

impl std::fmt::Display for SubmitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubmitError::Engine(e) => write!(f, "{e}"),
            SubmitError::Session(e) => write!(f, "{e}"),
            SubmitError::NothingToRetry => write!(f, "no failed reservations to retry"),
        }
    }
}

impl std::error::Error for SubmitError {}

/// Tracks every range handed to the reservation API during one booking flow.
///
/// Each range is `Pending` from the moment it is queued until its own API call
/// returns; the outcome is never inferred from whether a batch is in flight.
pub struct SubmissionTracker {
    entries: Vec<TrackedRange>,
    notify: Arc<NotifyHub>,
}

impl SubmissionTracker {
    pub fn new(notify: Arc<NotifyHub>) -> Self {
        Self {
            entries: Vec::new(),
            notify,
        }
    }

    pub fn entries(&self) -> &[TrackedRange] {
        &self.entries
    }

    pub fn summary(&self) -> SubmissionSummary {
        let mut summary = SubmissionSummary::default();
        for entry in &self.entries {
            match entry.status {
                SubmissionStatus::Pending => summary.pending += 1,
                SubmissionStatus::Confirmed { .. } => summary.confirmed += 1,
                SubmissionStatus::Failed { .. } => summary.failed += 1,
            }
        }
        summary
    }

    /// Queue one pending entry per contiguous range. Fails on an empty selection.
    pub fn enqueue<Tz: TimeZone>(
        &mut self,
        tz: &Tz,
        selection: &SelectionSet,
        rate: u32,
        court_id: u64,
    ) -> Result<Vec<Ulid>, EngineError> {
        let planned = plan_requests(tz, selection, rate, court_id)?;
        let mut ids = Vec::with_capacity(planned.len());
        for (day, range, request) in planned {
            let id = Ulid::new();
            self.entries.push(TrackedRange {
                id,
                day,
                range,
                request,
                status: SubmissionStatus::Pending,
            });
            self.publish(self.entries.len() - 1);
            ids.push(id);
        }
        Ok(ids)
    }

    /// Submit a selection: one create call per contiguous range, all at once.
    ///
    /// The selection is taken by value; after this call the tracker is the
    /// only record of those ranges.
    pub async fn submit<Tz: TimeZone>(
        &mut self,
        api: &dyn BookingApi,
        session: &SessionContext,
        tz: &Tz,
        selection: SelectionSet,
        rate: u32,
        court_id: u64,
    ) -> Result<SubmissionSummary, SubmitError> {
        let auth = session.authenticated()?;
        let ids = self.enqueue(tz, &selection, rate, court_id)?;
        info!(ranges = ids.len(), user = %auth.user().email, "submitting reservations");
        Ok(self.send_pending(api, auth).await)
    }

    /// Move every failed entry back to pending and send them again.
    pub async fn retry_failed(
        &mut self,
        api: &dyn BookingApi,
        session: &SessionContext,
    ) -> Result<SubmissionSummary, SubmitError> {
        let auth = session.authenticated()?;
        let failed: Vec<usize> = (0..self.entries.len())
            .filter(|&i| self.entries[i].status.is_failed())
            .collect();
        if failed.is_empty() {
            return Err(SubmitError::NothingToRetry);
        }
        for i in failed {
            self.entries[i].status = SubmissionStatus::Pending;
            self.publish(i);
        }
        info!(ranges = self.summary().pending, "retrying failed reservations");
        Ok(self.send_pending(api, auth).await)
    }

    async fn send_pending(&mut self, api: &dyn BookingApi, auth: Authenticated<'_>) -> SubmissionSummary {
        let started = Instant::now();
        let pending: Vec<usize> = (0..self.entries.len())
            .filter(|&i| self.entries[i].status.is_pending())
            .collect();

        let results = join_all(
            pending
                .iter()
                .map(|&i| api.create_reservation(auth, &self.entries[i].request)),
        )
        .await;

        for (i, result) in pending.into_iter().zip(results) {
            let entry = &mut self.entries[i];
            entry.status = match result {
                Ok(created) => {
                    info!(day = %entry.day, range = %entry.range, reservation_id = created.id, "reservation confirmed");
                    metrics::counter!(crate::observability::RESERVATIONS_SUBMITTED_TOTAL, "status" => "confirmed")
                        .increment(1);
                    SubmissionStatus::Confirmed {
                        reservation_id: created.id,
                    }
                }
                Err(e) => {
                    warn!(day = %entry.day, range = %entry.range, "reservation failed: {e}");
                    metrics::counter!(crate::observability::RESERVATIONS_SUBMITTED_TOTAL, "status" => "failed")
                        .increment(1);
                    SubmissionStatus::Failed {
                        reason: e.to_string(),
                    }
                }
            };
            self.publish(i);
        }

        metrics::histogram!(crate::observability::SUBMISSION_DURATION_SECONDS)
            .record(started.elapsed().as_secs_f64());
        self.summary()
    }

    fn publish(&self, index: usize) {
        let entry = &self.entries[index];
        self.notify.send(StatusEvent {
            id: entry.id,
            day: entry.day,
            range: entry.range,
            status: entry.status.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiError;
    use crate::session::{Role, UserProfile};
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use std::sync::Mutex;

    /// Accepts every request except those starting at a listed hour.
    struct FakeApi {
        reject_hours: Vec<u32>,
        seen: Mutex<Vec<ReservationRequest>>,
    }

    impl FakeApi {
        fn new(reject_hours: Vec<u32>) -> Self {
            Self {
                reject_hours,
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl BookingApi for FakeApi {
        async fn court(&self, _court_id: u64) -> Result<Court, ApiError> {
            Err(ApiError::Status(404, "not used".into()))
        }

        async fn reserved_spans(&self, _day_start: DateTime<Utc>) -> Result<Vec<ReservedSpan>, ApiError> {
            Ok(Vec::new())
        }

        async fn create_reservation(
            &self,
            _auth: Authenticated<'_>,
            request: &ReservationRequest,
        ) -> Result<CreatedReservation, ApiError> {
            use chrono::Timelike;
            let mut seen = self.seen.lock().unwrap();
            seen.push(request.clone());
            if self.reject_hours.contains(&request.start_date_time.hour()) {
                return Err(ApiError::Status(400, "Reservation already exists".into()));
            }
            Ok(CreatedReservation { id: seen.len() as u64 })
        }
    }

    fn day(d: u32) -> DayKey {
        DayKey::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn r(start: u8, end: u8) -> HourRange {
        HourRange::new(start, end).unwrap()
    }

    fn selection(entries: &[(DayKey, &[HourRange])]) -> SelectionSet {
        let mut set = SelectionSet::new();
        for (d, ranges) in entries {
            set.insert(*d, DaySelection::from_merged(ranges.to_vec()));
        }
        set
    }

    fn signed_in() -> SessionContext {
        SessionContext::signed_in(
            UserProfile {
                email: "player@example.com".into(),
                role: Role::Customer,
            },
            Some("token".into()),
        )
    }

    #[tokio::test]
    async fn submit_confirms_each_range() {
        let api = FakeApi::new(vec![]);
        let hub = Arc::new(NotifyHub::new());
        let mut tracker = SubmissionTracker::new(hub);
        let sel = selection(&[(day(16), &[r(2, 4), r(9, 9)]), (day(17), &[r(20, 21)])]);

        let summary = tracker
            .submit(&api, &signed_in(), &Utc, sel, 1000, 1)
            .await
            .unwrap();
        assert_eq!(summary, SubmissionSummary { pending: 0, confirmed: 3, failed: 0 });
        assert_eq!(api.seen.lock().unwrap().len(), 3);
        assert!(tracker
            .entries()
            .iter()
            .all(|e| matches!(e.status, SubmissionStatus::Confirmed { .. })));
    }

    #[tokio::test]
    async fn submit_empty_selection_is_blocking_error() {
        let api = FakeApi::new(vec![]);
        let mut tracker = SubmissionTracker::new(Arc::new(NotifyHub::new()));
        let err = tracker
            .submit(&api, &signed_in(), &Utc, SelectionSet::new(), 1000, 1)
            .await
            .unwrap_err();
        assert_eq!(err, SubmitError::Engine(EngineError::EmptySelection));
        assert!(api.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn submit_requires_sign_in() {
        let api = FakeApi::new(vec![]);
        let mut tracker = SubmissionTracker::new(Arc::new(NotifyHub::new()));
        let sel = selection(&[(day(16), &[r(2, 4)])]);
        let err = tracker
            .submit(&api, &SessionContext::anonymous(), &Utc, sel, 1000, 1)
            .await
            .unwrap_err();
        assert_eq!(err, SubmitError::Session(SessionError::NotSignedIn));
        assert!(tracker.entries().is_empty());
    }

    #[tokio::test]
    async fn partial_failure_then_retry() {
        let api = FakeApi::new(vec![9]);
        let mut tracker = SubmissionTracker::new(Arc::new(NotifyHub::new()));
        let sel = selection(&[(day(16), &[r(2, 4), r(9, 9)])]);

        let summary = tracker
            .submit(&api, &signed_in(), &Utc, sel, 1000, 1)
            .await
            .unwrap();
        assert_eq!(summary, SubmissionSummary { pending: 0, confirmed: 1, failed: 1 });
        let failed = tracker.entries().iter().find(|e| e.status.is_failed()).unwrap();
        assert_eq!(failed.range, r(9, 9));
        assert_eq!(
            failed.status,
            SubmissionStatus::Failed { reason: "HTTP 400: Reservation already exists".into() }
        );

        // still rejected: stays failed, confirmed entry untouched
        let summary = tracker.retry_failed(&api, &signed_in()).await.unwrap();
        assert_eq!(summary, SubmissionSummary { pending: 0, confirmed: 1, failed: 1 });
        assert_eq!(api.seen.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn retry_with_nothing_failed() {
        let api = FakeApi::new(vec![]);
        let mut tracker = SubmissionTracker::new(Arc::new(NotifyHub::new()));
        let err = tracker.retry_failed(&api, &signed_in()).await.unwrap_err();
        assert_eq!(err, SubmitError::NothingToRetry);
    }

    #[tokio::test]
    async fn status_events_pending_then_settled() {
        let api = FakeApi::new(vec![2]);
        let hub = Arc::new(NotifyHub::new());
        let mut rx = hub.subscribe();
        let mut tracker = SubmissionTracker::new(hub);
        let sel = selection(&[(day(16), &[r(2, 4)])]);

        tracker.submit(&api, &signed_in(), &Utc, sel, 1000, 1).await.unwrap();

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(first.status, SubmissionStatus::Pending);
        assert!(second.status.is_failed());
    }
}
