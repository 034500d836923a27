//! EnrollmentService: owns the Enrollment lifecycle.
//!
//! Exposes create + reads only. Progress and completion are mutated
//! exclusively through the ProgressTracker / CertificateIssuer, never here.

use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::info;

use coursemart_core::{CourseId, Money, UserId};
use coursemart_enrollment::{
    CreateEnrollment, Enrollment, EnrollmentCommand, EnrollmentId, LectureProgress,
};
use coursemart_events::{EventBus, EventEnvelope};

use crate::command_dispatcher::{CommandDispatcher, DispatchError};
use crate::event_store::EventStore;
use crate::projections::{EnrollmentReadModel, EnrollmentsProjection};
use crate::read_model::ScopedStore;

pub(crate) const ENROLLMENT_AGGREGATE: &str = "enrollment";

#[derive(Debug, Error)]
pub enum EnrollmentError {
    /// At most one enrollment per (user, course), for the lifetime of the
    /// system.
    #[error("learner already holds an enrollment for this course")]
    DuplicateEnrollment,

    #[error("no enrollment exists for this learner and course")]
    NotEnrolled,

    #[error("storage failure: {0}")]
    Storage(String),
}

impl From<DispatchError> for EnrollmentError {
    fn from(err: DispatchError) -> Self {
        match err {
            // Both the deterministic "already created" conflict and a lost
            // version-0 race mean the same thing to the caller.
            DispatchError::Conflict(_) | DispatchError::Concurrency(_) => {
                EnrollmentError::DuplicateEnrollment
            }
            DispatchError::NotFound => EnrollmentError::NotEnrolled,
            other => EnrollmentError::Storage(format!("{other:?}")),
        }
    }
}

/// Aggregate-root service for enrollments.
pub struct EnrollmentService<S, B, RS> {
    dispatcher: CommandDispatcher<S, B>,
    directory: std::sync::Arc<EnrollmentsProjection<RS>>,
}

impl<S, B, RS> EnrollmentService<S, B, RS>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
    RS: ScopedStore<UserId, CourseId, EnrollmentReadModel>,
{
    pub fn new(store: S, bus: B, directory: std::sync::Arc<EnrollmentsProjection<RS>>) -> Self {
        Self {
            dispatcher: CommandDispatcher::new(store, bus),
            directory,
        }
    }

    /// Create an enrollment with the given price snapshot.
    ///
    /// The uniqueness invariant is enforced by the store: the enrollment
    /// stream key is derived from `(user, course)` and the append expects
    /// version 0, so a concurrent double-submission commits exactly one row.
    pub fn enroll(
        &self,
        user_id: UserId,
        course_id: CourseId,
        price_paid: Money,
    ) -> Result<EnrollmentId, EnrollmentError> {
        let enrollment_id = EnrollmentId::for_learner(user_id, course_id);

        self.dispatcher.dispatch(
            enrollment_id.0,
            ENROLLMENT_AGGREGATE,
            EnrollmentCommand::CreateEnrollment(CreateEnrollment {
                enrollment_id,
                user_id,
                course_id,
                price_paid,
                occurred_at: chrono::Utc::now(),
            }),
            |id| Enrollment::empty(EnrollmentId::new(id)),
        )?;

        info!(%user_id, %course_id, %enrollment_id, "enrollment created");
        Ok(enrollment_id)
    }

    /// Read a single enrollment (strongly consistent: rehydrated from the
    /// stream).
    pub fn get_enrollment(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<Option<Enrollment>, EnrollmentError> {
        let enrollment_id = EnrollmentId::for_learner(user_id, course_id);
        let enrollment = self
            .dispatcher
            .load(enrollment_id.0, |id| Enrollment::empty(EnrollmentId::new(id)))
            .map_err(|e| EnrollmentError::Storage(format!("{e:?}")))?;

        Ok(enrollment.is_created().then_some(enrollment))
    }

    /// List a user's enrollments from the read model (eventually consistent).
    pub fn list_enrollments(&self, user_id: UserId) -> Vec<EnrollmentReadModel> {
        self.directory.list(user_id)
    }

    /// Per-lecture watch records for one enrollment.
    pub fn lecture_progress(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<Vec<(coursemart_core::LectureId, LectureProgress)>, EnrollmentError> {
        let enrollment = self
            .get_enrollment(user_id, course_id)?
            .ok_or(EnrollmentError::NotEnrolled)?;

        Ok(enrollment
            .lectures()
            .iter()
            .map(|(lecture_id, progress)| (*lecture_id, *progress))
            .collect())
    }

    /// The projection backing `list_enrollments`, for bus wiring.
    pub fn directory(&self) -> &EnrollmentsProjection<RS> {
        &self.directory
    }
}
