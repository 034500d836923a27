//! ReviewGate: one review per enrollment.
//!
//! Eligibility gate: an enrollment must exist; completion percentage is
//! deliberately not a precondition. Creation is one-time; edits are a
//! distinct operation.

use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::info;

use coursemart_core::{CourseId, UserId};
use coursemart_enrollment::{
    EditReview, Enrollment, EnrollmentId, Review, ReviewCommand, ReviewId, SubmitReview,
};
use coursemart_events::{EventBus, EventEnvelope};

use crate::command_dispatcher::{CommandDispatcher, DispatchError};
use crate::event_store::EventStore;
use crate::services::MAX_DISPATCH_RETRIES;

pub(crate) const REVIEW_AGGREGATE: &str = "review";

#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("rating must be between 1 and 5")]
    InvalidRating,

    #[error("a review already exists for this enrollment")]
    ReviewExists,

    #[error("no review exists for this enrollment")]
    ReviewNotFound,

    #[error("no enrollment exists for this learner and course")]
    NotEnrolled,

    #[error("storage failure: {0}")]
    Storage(String),
}

/// Review service.
pub struct ReviewGate<S, B> {
    dispatcher: CommandDispatcher<S, B>,
}

impl<S, B> ReviewGate<S, B>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    pub fn new(store: S, bus: B) -> Self {
        Self {
            dispatcher: CommandDispatcher::new(store, bus),
        }
    }

    /// Submit the one-time review for the caller's enrollment.
    pub fn submit_review(
        &self,
        user_id: UserId,
        course_id: CourseId,
        rating: u8,
        comment: Option<String>,
    ) -> Result<(), ReviewError> {
        let enrollment_id = self.enrolled(user_id, course_id)?;
        let review_id = ReviewId::for_enrollment(enrollment_id);

        let result = self.dispatcher.dispatch(
            review_id.0,
            REVIEW_AGGREGATE,
            ReviewCommand::SubmitReview(SubmitReview {
                review_id,
                enrollment_id,
                user_id,
                course_id,
                rating,
                comment,
                occurred_at: chrono::Utc::now(),
            }),
            |id| Review::empty(ReviewId::new(id)),
        );

        match result {
            Ok(_) => {
                info!(%user_id, %course_id, rating, "review submitted");
                Ok(())
            }
            Err(DispatchError::Validation(_)) => Err(ReviewError::InvalidRating),
            // A review stream that already exists — whether observed or hit
            // as a lost version-0 race — means the one-shot creation is gone.
            Err(DispatchError::Conflict(_)) | Err(DispatchError::Concurrency(_)) => {
                Err(ReviewError::ReviewExists)
            }
            Err(other) => Err(ReviewError::Storage(format!("{other:?}"))),
        }
    }

    /// Update rating/comment on an existing review; bumps the updated
    /// timestamp.
    pub fn edit_review(
        &self,
        user_id: UserId,
        course_id: CourseId,
        rating: u8,
        comment: Option<String>,
    ) -> Result<(), ReviewError> {
        let enrollment_id = self.enrolled(user_id, course_id)?;
        let review_id = ReviewId::for_enrollment(enrollment_id);

        let mut attempts = 0;
        loop {
            let result = self.dispatcher.dispatch(
                review_id.0,
                REVIEW_AGGREGATE,
                ReviewCommand::EditReview(EditReview {
                    review_id,
                    enrollment_id,
                    user_id,
                    course_id,
                    rating,
                    comment: comment.clone(),
                    occurred_at: chrono::Utc::now(),
                }),
                |id| Review::empty(ReviewId::new(id)),
            );

            match result {
                Ok(_) => return Ok(()),
                Err(DispatchError::Validation(_)) => return Err(ReviewError::InvalidRating),
                Err(DispatchError::NotFound) => return Err(ReviewError::ReviewNotFound),
                Err(DispatchError::Concurrency(_)) if attempts < MAX_DISPATCH_RETRIES => {
                    attempts += 1;
                }
                Err(other) => return Err(ReviewError::Storage(format!("{other:?}"))),
            }
        }
    }

    /// Read the review for the caller's enrollment, if any.
    pub fn review(&self, user_id: UserId, course_id: CourseId) -> Result<Option<Review>, ReviewError> {
        let enrollment_id = self.enrolled(user_id, course_id)?;
        let review_id = ReviewId::for_enrollment(enrollment_id);

        let review = self
            .dispatcher
            .load(review_id.0, |id| Review::empty(ReviewId::new(id)))
            .map_err(|e| ReviewError::Storage(format!("{e:?}")))?;
        Ok(review.is_created().then_some(review))
    }

    fn enrolled(&self, user_id: UserId, course_id: CourseId) -> Result<EnrollmentId, ReviewError> {
        let enrollment_id = EnrollmentId::for_learner(user_id, course_id);
        let enrollment = self
            .dispatcher
            .load(enrollment_id.0, |id| Enrollment::empty(EnrollmentId::new(id)))
            .map_err(|e| ReviewError::Storage(format!("{e:?}")))?;

        if !enrollment.is_created() {
            return Err(ReviewError::NotEnrolled);
        }
        Ok(enrollment_id)
    }
}
