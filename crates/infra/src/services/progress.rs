//! ProgressTracker: records per-lecture watch events and detects completion.
//!
//! The tracker resolves catalog facts (lecture duration, owning course,
//! current lecture count) before dispatching, so the Enrollment aggregate
//! stays pure. Optimistic concurrency losses are retried here: the retry
//! reloads the stream, which is what makes completion detection "set if
//! currently null" under racing watch events.

use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::{debug, info, warn};

use coursemart_catalog::Catalog;
use coursemart_core::{CourseId, LectureId, UserId};
use coursemart_enrollment::{Enrollment, EnrollmentCommand, EnrollmentId, RecordWatch};
use coursemart_events::{EventBus, EventEnvelope};

use crate::command_dispatcher::{CommandDispatcher, DispatchError};
use crate::event_store::EventStore;
use crate::services::MAX_DISPATCH_RETRIES;
use crate::services::enrollment::ENROLLMENT_AGGREGATE;

/// Per-lecture completion policy.
///
/// A lecture counts as completed when the recorded offset reaches this share
/// of the lecture duration, in basis points. 9_500 = "watched ≥95%".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressPolicy {
    pub completion_threshold_bp: u32,
}

impl Default for ProgressPolicy {
    fn default() -> Self {
        Self {
            completion_threshold_bp: 9_500,
        }
    }
}

impl ProgressPolicy {
    /// Whether an offset (already clamped to the duration) completes the
    /// lecture. Zero-duration lectures complete on first watch.
    fn completes(&self, watched_seconds: u32, duration_seconds: u32) -> bool {
        if duration_seconds == 0 {
            return true;
        }
        u64::from(watched_seconds) * 10_000
            >= u64::from(duration_seconds) * u64::from(self.completion_threshold_bp)
    }
}

/// Snapshot returned by `record_watch`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchOutcome {
    pub last_watched_second: u32,
    pub lecture_completed: bool,
    pub progress_bp: u32,
    pub course_completed: bool,
    /// True only for the call whose update crossed the completion boundary.
    pub course_completed_now: bool,
}

#[derive(Debug, Error)]
pub enum ProgressError {
    /// The enrollment does not exist, or the lecture belongs to a different
    /// course than the caller's context.
    #[error("no enrollment covers this lecture")]
    NotEnrolled,

    #[error("watched offset must not be negative")]
    InvalidOffset,

    #[error("lecture does not exist in the catalog")]
    UnknownLecture,

    #[error("catalog lookup failed: {0}")]
    Catalog(String),

    #[error("storage failure: {0}")]
    Storage(String),
}

/// Progress-tracking service.
pub struct ProgressTracker<S, B> {
    dispatcher: CommandDispatcher<S, B>,
    catalog: std::sync::Arc<dyn Catalog>,
    policy: ProgressPolicy,
}

impl<S, B> ProgressTracker<S, B>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    pub fn new(store: S, bus: B, catalog: std::sync::Arc<dyn Catalog>, policy: ProgressPolicy) -> Self {
        Self {
            dispatcher: CommandDispatcher::new(store, bus),
            catalog,
            policy,
        }
    }

    /// Record a watch event against the caller's enrollment.
    ///
    /// Upserts the lecture record with `max(existing, watched_seconds)`
    /// (clamped to the lecture duration), flags per-lecture completion per
    /// policy, recomputes the aggregate percentage against the catalog's
    /// current lecture count, and — exactly once — stamps course completion.
    pub fn record_watch(
        &self,
        user_id: UserId,
        course_id: CourseId,
        lecture_id: LectureId,
        watched_seconds: i64,
    ) -> Result<WatchOutcome, ProgressError> {
        if watched_seconds < 0 {
            return Err(ProgressError::InvalidOffset);
        }

        let lecture = self
            .catalog
            .lecture(lecture_id)
            .map_err(|e| ProgressError::Catalog(e.to_string()))?
            .ok_or(ProgressError::UnknownLecture)?;
        if lecture.course_id != course_id {
            return Err(ProgressError::NotEnrolled);
        }

        let enrollment_id = EnrollmentId::for_learner(user_id, course_id);

        // Clamp to the lecture duration; a player reporting past the end is
        // recorded as having reached the end.
        let clamped = u32::try_from(watched_seconds)
            .unwrap_or(u32::MAX)
            .min(lecture.duration_seconds);
        let lecture_completed = self.policy.completes(clamped, lecture.duration_seconds);

        let mut attempts = 0;
        let committed = loop {
            // Denominator read at recompute time, not cached from enrollment
            // creation.
            let course = self
                .catalog
                .course(course_id)
                .map_err(|e| ProgressError::Catalog(e.to_string()))?
                .ok_or_else(|| ProgressError::Catalog("course missing from catalog".to_string()))?;

            let result = self.dispatcher.dispatch(
                enrollment_id.0,
                ENROLLMENT_AGGREGATE,
                EnrollmentCommand::RecordWatch(RecordWatch {
                    enrollment_id,
                    lecture_id,
                    watched_seconds: clamped,
                    lecture_completed,
                    total_lectures: course.lecture_count,
                    occurred_at: chrono::Utc::now(),
                }),
                |id| Enrollment::empty(EnrollmentId::new(id)),
            );

            match result {
                Ok(committed) => break committed,
                Err(DispatchError::Concurrency(msg)) if attempts < MAX_DISPATCH_RETRIES => {
                    attempts += 1;
                    debug!(%enrollment_id, attempt = attempts, %msg, "watch lost optimistic race, retrying");
                }
                Err(DispatchError::NotFound) => return Err(ProgressError::NotEnrolled),
                Err(DispatchError::Publish(msg)) => {
                    // The events are durable; downstream consumers catch up
                    // on republish or direct retry of issue_if_absent.
                    warn!(%enrollment_id, %msg, "watch events stored but publication failed");
                    break vec![];
                }
                Err(other) => return Err(ProgressError::Storage(format!("{other:?}"))),
            }
        };

        let course_completed_now = committed
            .iter()
            .any(|e| e.event_type == "enrollment.course_completed");
        if course_completed_now {
            info!(%user_id, %course_id, "course completed");
        }

        // Snapshot the post-update state for the caller.
        let enrollment = self
            .dispatcher
            .load(enrollment_id.0, |id| Enrollment::empty(EnrollmentId::new(id)))
            .map_err(|e| ProgressError::Storage(format!("{e:?}")))?;
        let record = enrollment.lecture(lecture_id).copied().unwrap_or_default();

        Ok(WatchOutcome {
            last_watched_second: record.last_watched_second,
            lecture_completed: record.completed,
            progress_bp: enrollment.progress_bp(),
            course_completed: enrollment.is_completed(),
            course_completed_now,
        })
    }

    pub fn policy(&self) -> ProgressPolicy {
        self.policy
    }
}
