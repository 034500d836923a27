//! Per-learner enrollment directory.
//!
//! Backs `list_enrollments`: one row per (user, course) with the price
//! snapshot, progress and completion/certification state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use coursemart_core::{CourseId, Money, UserId};
use coursemart_enrollment::{CertificateEvent, EnrollmentEvent, EnrollmentId};
use coursemart_events::EventEnvelope;

use crate::read_model::ScopedStore;

/// Enrollment read model for queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrollmentReadModel {
    pub enrollment_id: EnrollmentId,
    pub user_id: UserId,
    pub course_id: CourseId,
    pub price_paid: Money,
    pub enrolled_at: DateTime<Utc>,
    pub completed_lectures: u32,
    pub total_lectures: u32,
    pub progress_bp: u32,
    pub completed_at: Option<DateTime<Utc>>,
    pub certificate_url: Option<String>,
}

/// Projection that maintains the enrollment directory per user.
pub struct EnrollmentsProjection<S> {
    store: S,
}

impl<S> EnrollmentsProjection<S>
where
    S: ScopedStore<UserId, CourseId, EnrollmentReadModel>,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn apply_envelope(
        &self,
        envelope: &EventEnvelope<serde_json::Value>,
    ) -> Result<(), anyhow::Error> {
        match envelope.aggregate_type() {
            "enrollment" => {
                let event: EnrollmentEvent = serde_json::from_value(envelope.payload().clone())?;
                self.apply_enrollment(event);
            }
            "certificate" => {
                let event: CertificateEvent = serde_json::from_value(envelope.payload().clone())?;
                self.apply_certificate(event);
            }
            _ => {}
        }
        Ok(())
    }

    fn apply_enrollment(&self, event: EnrollmentEvent) {
        match event {
            EnrollmentEvent::EnrollmentCreated(e) => {
                let model = EnrollmentReadModel {
                    enrollment_id: e.enrollment_id,
                    user_id: e.user_id,
                    course_id: e.course_id,
                    price_paid: e.price_paid,
                    enrolled_at: e.occurred_at,
                    completed_lectures: 0,
                    total_lectures: 0,
                    progress_bp: 0,
                    completed_at: None,
                    certificate_url: None,
                };
                self.store.upsert(e.user_id, e.course_id, model);
            }
            EnrollmentEvent::ProgressRecomputed(e) => {
                if let Some(mut model) = self.store.get(e.user_id, &e.course_id) {
                    model.completed_lectures = e.completed_lectures;
                    model.total_lectures = e.total_lectures;
                    model.progress_bp = e.progress_bp;
                    self.store.upsert(e.user_id, e.course_id, model);
                }
            }
            EnrollmentEvent::CourseCompleted(e) => {
                if let Some(mut model) = self.store.get(e.user_id, &e.course_id) {
                    model.completed_at = Some(e.occurred_at);
                    self.store.upsert(e.user_id, e.course_id, model);
                }
            }
            // Per-lecture offsets are served from the aggregate, not this
            // directory.
            EnrollmentEvent::WatchRecorded(_) | EnrollmentEvent::LectureCompleted(_) => {}
        }
    }

    fn apply_certificate(&self, event: CertificateEvent) {
        match event {
            CertificateEvent::CertificateIssued(e) => {
                if let Some(mut model) = self.store.get(e.user_id, &e.course_id) {
                    model.certificate_url = Some(e.url);
                    self.store.upsert(e.user_id, e.course_id, model);
                }
            }
        }
    }

    /// Get a single enrollment row.
    pub fn get(&self, user_id: UserId, course_id: &CourseId) -> Option<EnrollmentReadModel> {
        self.store.get(user_id, course_id)
    }

    /// List all enrollments for a user.
    pub fn list(&self, user_id: UserId) -> Vec<EnrollmentReadModel> {
        self.store.list(user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::read_model::InMemoryScopedStore;
    use std::sync::Arc;
    use uuid::Uuid;

    use coursemart_enrollment::{CourseCompleted, EnrollmentCreated, ProgressRecomputed};

    fn envelope(aggregate_type: &str, payload: serde_json::Value) -> EventEnvelope<serde_json::Value> {
        EventEnvelope::new(
            Uuid::now_v7(),
            coursemart_core::AggregateId::new(),
            aggregate_type,
            1,
            payload,
        )
    }

    #[test]
    fn created_then_recomputed_updates_the_row() {
        let store = Arc::new(InMemoryScopedStore::new());
        let projection = EnrollmentsProjection::new(store);

        let user_id = UserId::new();
        let course_id = CourseId::new();
        let enrollment_id = EnrollmentId::for_learner(user_id, course_id);
        let now = Utc::now();

        let created = EnrollmentEvent::EnrollmentCreated(EnrollmentCreated {
            enrollment_id,
            user_id,
            course_id,
            price_paid: Money::from_cents(1299),
            occurred_at: now,
        });
        projection
            .apply_envelope(&envelope("enrollment", serde_json::to_value(&created).unwrap()))
            .unwrap();

        let recomputed = EnrollmentEvent::ProgressRecomputed(ProgressRecomputed {
            enrollment_id,
            user_id,
            course_id,
            completed_lectures: 3,
            total_lectures: 4,
            progress_bp: 7_500,
            occurred_at: now,
        });
        projection
            .apply_envelope(&envelope("enrollment", serde_json::to_value(&recomputed).unwrap()))
            .unwrap();

        let row = projection.get(user_id, &course_id).unwrap();
        assert_eq!(row.price_paid, Money::from_cents(1299));
        assert_eq!(row.progress_bp, 7_500);
        assert!(row.completed_at.is_none());

        let completed = EnrollmentEvent::CourseCompleted(CourseCompleted {
            enrollment_id,
            user_id,
            course_id,
            occurred_at: now,
        });
        projection
            .apply_envelope(&envelope("enrollment", serde_json::to_value(&completed).unwrap()))
            .unwrap();

        let row = projection.get(user_id, &course_id).unwrap();
        assert!(row.completed_at.is_some());
    }

    #[test]
    fn listing_is_scoped_to_the_user() {
        let store = Arc::new(InMemoryScopedStore::new());
        let projection = EnrollmentsProjection::new(store);

        let user_a = UserId::new();
        let user_b = UserId::new();
        let course_id = CourseId::new();
        let now = Utc::now();

        let created = EnrollmentEvent::EnrollmentCreated(EnrollmentCreated {
            enrollment_id: EnrollmentId::for_learner(user_a, course_id),
            user_id: user_a,
            course_id,
            price_paid: Money::ZERO,
            occurred_at: now,
        });
        projection
            .apply_envelope(&envelope("enrollment", serde_json::to_value(&created).unwrap()))
            .unwrap();

        assert_eq!(projection.list(user_a).len(), 1);
        assert!(projection.list(user_b).is_empty());
    }
}
