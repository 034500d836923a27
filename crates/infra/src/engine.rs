//! Engine composition root.
//!
//! Wires the in-memory store, bus, services, projections and workers into
//! the surface the (excluded) request layer consumes. Production deployments
//! would assemble the same pieces over persistent backends.

use std::sync::Arc;

use serde_json::Value as JsonValue;

use coursemart_catalog::Catalog;
use coursemart_core::{CourseId, UserId};
use coursemart_events::{EventEnvelope, InMemoryEventBus};

use crate::event_store::InMemoryEventStore;
use crate::projections::{CourseStatsProjection, EnrollmentReadModel, EnrollmentsProjection};
use crate::read_model::InMemoryScopedStore;
use crate::services::{
    CartService, CertificateIssuer, CertificateRenderer, EnrollmentService, ProgressPolicy,
    ProgressTracker, ReviewGate,
};
use crate::workers::{EventWorker, WorkerHandle};

pub type SharedStore = Arc<InMemoryEventStore>;
pub type SharedBus = Arc<InMemoryEventBus<EventEnvelope<JsonValue>>>;
pub type DirectoryStore = Arc<InMemoryScopedStore<UserId, CourseId, EnrollmentReadModel>>;

/// The assembled enrollment & progress-tracking engine.
pub struct Engine {
    pub cart: CartService<SharedStore, SharedBus>,
    pub enrollments: EnrollmentService<SharedStore, SharedBus, DirectoryStore>,
    pub progress: ProgressTracker<SharedStore, SharedBus>,
    pub certificates: Arc<CertificateIssuer<SharedStore, SharedBus>>,
    pub reviews: ReviewGate<SharedStore, SharedBus>,
    pub course_stats: Arc<CourseStatsProjection>,
    bus: SharedBus,
    workers: Vec<WorkerHandle>,
}

impl Engine {
    /// Assemble the engine over in-memory infrastructure.
    pub fn in_memory(
        catalog: Arc<dyn Catalog>,
        renderer: Arc<dyn CertificateRenderer>,
        policy: ProgressPolicy,
    ) -> Self {
        let store: SharedStore = Arc::new(InMemoryEventStore::new());
        let bus: SharedBus = Arc::new(InMemoryEventBus::new());

        let directory_store: DirectoryStore = Arc::new(InMemoryScopedStore::new());
        let directory = Arc::new(EnrollmentsProjection::new(directory_store));
        let course_stats = Arc::new(CourseStatsProjection::new());

        let certificates = Arc::new(CertificateIssuer::new(
            store.clone(),
            bus.clone(),
            renderer,
        ));

        // Workers subscribe before any command runs, so no event is missed.
        let mut workers = Vec::new();

        let directory_feed = directory.clone();
        workers.push(EventWorker::spawn(
            "enrollment-directory",
            bus.clone(),
            move |envelope: EventEnvelope<JsonValue>| directory_feed.apply_envelope(&envelope),
        ));

        let stats_feed = course_stats.clone();
        workers.push(EventWorker::spawn(
            "course-stats",
            bus.clone(),
            move |envelope: EventEnvelope<JsonValue>| stats_feed.apply_envelope(&envelope),
        ));

        workers.push(CertificateIssuer::spawn_worker(
            certificates.clone(),
            bus.clone(),
        ));

        Self {
            cart: CartService::new(store.clone(), bus.clone(), catalog.clone()),
            enrollments: EnrollmentService::new(store.clone(), bus.clone(), directory),
            progress: ProgressTracker::new(store.clone(), bus.clone(), catalog, policy),
            certificates,
            reviews: ReviewGate::new(store, bus.clone()),
            course_stats,
            bus,
            workers,
        }
    }

    /// The bus carrying every committed event, for additional consumers.
    pub fn bus(&self) -> &SharedBus {
        &self.bus
    }

    /// Stop all background workers and wait for them to drain.
    pub fn shutdown(self) {
        for worker in self.workers {
            worker.shutdown();
        }
    }
}
