use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use coursemart_core::{Aggregate, AggregateId, AggregateRoot, CourseId, DomainError, UserId};
use coursemart_events::Event;

use crate::enrollment::EnrollmentId;

pub const RATING_MIN: u8 = 1;
pub const RATING_MAX: u8 = 5;

/// Review identifier, derived from the enrollment (one review per
/// enrollment, enforced by the store's version-0 append).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReviewId(pub AggregateId);

impl ReviewId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }

    pub fn for_enrollment(enrollment_id: EnrollmentId) -> Self {
        Self(AggregateId::derive("review", &[enrollment_id.0.as_uuid()]))
    }
}

impl core::fmt::Display for ReviewId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

fn validate_rating(rating: u8) -> Result<(), DomainError> {
    if !(RATING_MIN..=RATING_MAX).contains(&rating) {
        return Err(DomainError::validation(format!(
            "rating must be between {RATING_MIN} and {RATING_MAX}"
        )));
    }
    Ok(())
}

/// Aggregate root: Review.
///
/// Created once per enrollment; edits are a distinct operation that bumps
/// the updated timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Review {
    id: ReviewId,
    enrollment_id: Option<EnrollmentId>,
    rating: u8,
    comment: Option<String>,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
    version: u64,
    created: bool,
}

impl Review {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: ReviewId) -> Self {
        Self {
            id,
            enrollment_id: None,
            rating: 0,
            comment: None,
            created_at: None,
            updated_at: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> ReviewId {
        self.id
    }

    pub fn is_created(&self) -> bool {
        self.created
    }

    pub fn enrollment_id(&self) -> Option<EnrollmentId> {
        self.enrollment_id
    }

    pub fn rating(&self) -> u8 {
        self.rating
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }
}

impl AggregateRoot for Review {
    type Id = ReviewId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: SubmitReview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitReview {
    pub review_id: ReviewId,
    pub enrollment_id: EnrollmentId,
    pub user_id: UserId,
    pub course_id: CourseId,
    pub rating: u8,
    pub comment: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: EditReview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditReview {
    pub review_id: ReviewId,
    pub enrollment_id: EnrollmentId,
    pub user_id: UserId,
    pub course_id: CourseId,
    pub rating: u8,
    pub comment: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReviewCommand {
    SubmitReview(SubmitReview),
    EditReview(EditReview),
}

/// Event: ReviewSubmitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewSubmitted {
    pub enrollment_id: EnrollmentId,
    pub user_id: UserId,
    pub course_id: CourseId,
    pub rating: u8,
    pub comment: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ReviewEdited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewEdited {
    pub enrollment_id: EnrollmentId,
    pub user_id: UserId,
    pub course_id: CourseId,
    pub rating: u8,
    pub comment: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReviewEvent {
    ReviewSubmitted(ReviewSubmitted),
    ReviewEdited(ReviewEdited),
}

impl Event for ReviewEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ReviewEvent::ReviewSubmitted(_) => "review.submitted",
            ReviewEvent::ReviewEdited(_) => "review.edited",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            ReviewEvent::ReviewSubmitted(e) => e.occurred_at,
            ReviewEvent::ReviewEdited(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Review {
    type Command = ReviewCommand;
    type Event = ReviewEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            ReviewEvent::ReviewSubmitted(e) => {
                self.enrollment_id = Some(e.enrollment_id);
                self.rating = e.rating;
                self.comment = e.comment.clone();
                self.created_at = Some(e.occurred_at);
                self.updated_at = Some(e.occurred_at);
                self.created = true;
            }
            ReviewEvent::ReviewEdited(e) => {
                self.rating = e.rating;
                self.comment = e.comment.clone();
                self.updated_at = Some(e.occurred_at);
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            ReviewCommand::SubmitReview(cmd) => self.handle_submit(cmd),
            ReviewCommand::EditReview(cmd) => self.handle_edit(cmd),
        }
    }
}

impl Review {
    fn ensure_review_id(&self, review_id: ReviewId) -> Result<(), DomainError> {
        if self.id != review_id {
            return Err(DomainError::invariant("review_id mismatch"));
        }
        Ok(())
    }

    fn handle_submit(&self, cmd: &SubmitReview) -> Result<Vec<ReviewEvent>, DomainError> {
        self.ensure_review_id(cmd.review_id)?;
        validate_rating(cmd.rating)?;

        if self.created {
            return Err(DomainError::conflict("review already exists"));
        }

        Ok(vec![ReviewEvent::ReviewSubmitted(ReviewSubmitted {
            enrollment_id: cmd.enrollment_id,
            user_id: cmd.user_id,
            course_id: cmd.course_id,
            rating: cmd.rating,
            comment: cmd.comment.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_edit(&self, cmd: &EditReview) -> Result<Vec<ReviewEvent>, DomainError> {
        self.ensure_review_id(cmd.review_id)?;
        validate_rating(cmd.rating)?;

        if !self.created {
            return Err(DomainError::not_found());
        }

        Ok(vec![ReviewEvent::ReviewEdited(ReviewEdited {
            enrollment_id: cmd.enrollment_id,
            user_id: cmd.user_id,
            course_id: cmd.course_id,
            rating: cmd.rating,
            comment: cmd.comment.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_context() -> (EnrollmentId, UserId, CourseId) {
        let user_id = UserId::new();
        let course_id = CourseId::new();
        (EnrollmentId::for_learner(user_id, course_id), user_id, course_id)
    }

    fn submit_cmd(review: &Review, rating: u8, comment: Option<&str>) -> ReviewCommand {
        let (enrollment_id, user_id, course_id) = test_context();
        ReviewCommand::SubmitReview(SubmitReview {
            review_id: review.id_typed(),
            enrollment_id,
            user_id,
            course_id,
            rating,
            comment: comment.map(str::to_string),
            occurred_at: Utc::now(),
        })
    }

    fn edit_cmd(review: &Review, rating: u8, comment: Option<&str>) -> ReviewCommand {
        let (enrollment_id, user_id, course_id) = test_context();
        ReviewCommand::EditReview(EditReview {
            review_id: review.id_typed(),
            enrollment_id,
            user_id,
            course_id,
            rating,
            comment: comment.map(str::to_string),
            occurred_at: Utc::now(),
        })
    }

    fn fresh_review() -> Review {
        let (enrollment_id, _, _) = test_context();
        Review::empty(ReviewId::for_enrollment(enrollment_id))
    }

    #[test]
    fn submit_emits_review_submitted() {
        let review = fresh_review();
        let events = review.handle(&submit_cmd(&review, 4, Some("solid course"))).unwrap();
        assert_eq!(events.len(), 1);
        match &events[0] {
            ReviewEvent::ReviewSubmitted(e) => {
                assert_eq!(e.rating, 4);
                assert_eq!(e.comment.as_deref(), Some("solid course"));
            }
            _ => panic!("Expected ReviewSubmitted event"),
        }
    }

    #[test]
    fn rating_outside_range_fails_validation() {
        let review = fresh_review();
        for rating in [0u8, 6, 200] {
            let err = review.handle(&submit_cmd(&review, rating, None)).unwrap_err();
            assert!(matches!(err, DomainError::Validation(_)));
        }
    }

    #[test]
    fn second_submit_conflicts_regardless_of_rating() {
        let mut review = fresh_review();
        let events = review.handle(&submit_cmd(&review, 5, None)).unwrap();
        review.apply(&events[0]);

        let err = review.handle(&submit_cmd(&review, 2, None)).unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[test]
    fn edit_without_review_is_not_found() {
        let review = fresh_review();
        let err = review.handle(&edit_cmd(&review, 3, None)).unwrap_err();
        assert_eq!(err, DomainError::NotFound);
    }

    #[test]
    fn edit_updates_rating_and_bumps_updated_at() {
        let mut review = fresh_review();
        let events = review.handle(&submit_cmd(&review, 3, Some("ok"))).unwrap();
        review.apply(&events[0]);
        let created_at = review.created_at();

        let events = review.handle(&edit_cmd(&review, 5, Some("grew on me"))).unwrap();
        review.apply(&events[0]);

        assert_eq!(review.rating(), 5);
        assert_eq!(review.comment(), Some("grew on me"));
        assert_eq!(review.created_at(), created_at);
        assert!(review.updated_at() >= created_at);
    }
}
