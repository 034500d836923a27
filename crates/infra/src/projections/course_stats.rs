//! Per-course marketplace stats.
//!
//! Enrollment/completion counts and the review rating aggregate that course
//! pages display. Counter-based, so this projection keeps its own event-id
//! guard to stay idempotent under at-least-once delivery.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use coursemart_core::CourseId;
use coursemart_enrollment::{EnrollmentEvent, EnrollmentId, ReviewEvent};
use coursemart_events::EventEnvelope;

/// Aggregated per-course numbers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CourseStats {
    pub enrollments: u64,
    pub completions: u64,
    pub rating_count: u64,
    pub rating_sum: u64,
}

impl CourseStats {
    pub fn mean_rating(&self) -> Option<f64> {
        if self.rating_count == 0 {
            return None;
        }
        Some(self.rating_sum as f64 / self.rating_count as f64)
    }
}

#[derive(Debug, Default)]
struct StatsState {
    stats: HashMap<CourseId, CourseStats>,
    /// Last rating per enrollment, so edits adjust the sum instead of
    /// double-counting.
    ratings: HashMap<EnrollmentId, (CourseId, u8)>,
    seen: HashSet<Uuid>,
}

/// Projection that maintains per-course stats.
#[derive(Debug, Default)]
pub struct CourseStatsProjection {
    inner: RwLock<StatsState>,
}

impl CourseStatsProjection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply_envelope(
        &self,
        envelope: &EventEnvelope<serde_json::Value>,
    ) -> Result<(), anyhow::Error> {
        let mut state = self
            .inner
            .write()
            .map_err(|_| anyhow::anyhow!("course stats lock poisoned"))?;

        // Idempotency guard: counters are not naturally idempotent, so each
        // event id is applied at most once.
        if !state.seen.insert(envelope.event_id()) {
            return Ok(());
        }

        match envelope.aggregate_type() {
            "enrollment" => {
                let event: EnrollmentEvent = serde_json::from_value(envelope.payload().clone())?;
                match event {
                    EnrollmentEvent::EnrollmentCreated(e) => {
                        state.stats.entry(e.course_id).or_default().enrollments += 1;
                    }
                    EnrollmentEvent::CourseCompleted(e) => {
                        state.stats.entry(e.course_id).or_default().completions += 1;
                    }
                    _ => {}
                }
            }
            "review" => {
                let event: ReviewEvent = serde_json::from_value(envelope.payload().clone())?;
                let (enrollment_id, course_id, rating) = match event {
                    ReviewEvent::ReviewSubmitted(e) => (e.enrollment_id, e.course_id, e.rating),
                    ReviewEvent::ReviewEdited(e) => (e.enrollment_id, e.course_id, e.rating),
                };

                let previous = state.ratings.insert(enrollment_id, (course_id, rating));
                let entry = state.stats.entry(course_id).or_default();
                match previous {
                    Some((_, old_rating)) => {
                        entry.rating_sum = entry.rating_sum - u64::from(old_rating) + u64::from(rating);
                    }
                    None => {
                        entry.rating_count += 1;
                        entry.rating_sum += u64::from(rating);
                    }
                }
            }
            _ => {}
        }

        Ok(())
    }

    pub fn get(&self, course_id: CourseId) -> Option<CourseStats> {
        let state = self.inner.read().ok()?;
        state.stats.get(&course_id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    use coursemart_core::{Money, UserId};
    use coursemart_enrollment::{EnrollmentCreated, ReviewEdited, ReviewSubmitted};

    fn envelope(
        event_id: Uuid,
        aggregate_type: &str,
        payload: serde_json::Value,
    ) -> EventEnvelope<serde_json::Value> {
        EventEnvelope::new(event_id, coursemart_core::AggregateId::new(), aggregate_type, 1, payload)
    }

    #[test]
    fn duplicate_delivery_does_not_double_count() {
        let projection = CourseStatsProjection::new();
        let user_id = UserId::new();
        let course_id = CourseId::new();

        let created = EnrollmentEvent::EnrollmentCreated(EnrollmentCreated {
            enrollment_id: EnrollmentId::for_learner(user_id, course_id),
            user_id,
            course_id,
            price_paid: Money::ZERO,
            occurred_at: Utc::now(),
        });
        let env = envelope(Uuid::now_v7(), "enrollment", serde_json::to_value(&created).unwrap());

        projection.apply_envelope(&env).unwrap();
        projection.apply_envelope(&env).unwrap();

        assert_eq!(projection.get(course_id).unwrap().enrollments, 1);
    }

    #[test]
    fn review_edits_adjust_the_mean_instead_of_adding() {
        let projection = CourseStatsProjection::new();
        let user_id = UserId::new();
        let course_id = CourseId::new();
        let enrollment_id = EnrollmentId::for_learner(user_id, course_id);

        let submitted = ReviewEvent::ReviewSubmitted(ReviewSubmitted {
            enrollment_id,
            user_id,
            course_id,
            rating: 2,
            comment: None,
            occurred_at: Utc::now(),
        });
        projection
            .apply_envelope(&envelope(Uuid::now_v7(), "review", serde_json::to_value(&submitted).unwrap()))
            .unwrap();

        let edited = ReviewEvent::ReviewEdited(ReviewEdited {
            enrollment_id,
            user_id,
            course_id,
            rating: 5,
            comment: None,
            occurred_at: Utc::now(),
        });
        projection
            .apply_envelope(&envelope(Uuid::now_v7(), "review", serde_json::to_value(&edited).unwrap()))
            .unwrap();

        let stats = projection.get(course_id).unwrap();
        assert_eq!(stats.rating_count, 1);
        assert_eq!(stats.rating_sum, 5);
        assert_eq!(stats.mean_rating(), Some(5.0));
    }
}
