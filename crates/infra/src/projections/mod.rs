//! Projection implementations (read model builders).
//!
//! Projections consume domain events off the bus and build query-optimized
//! read models. All projections are:
//! - **Rebuildable**: can be reconstructed from the event streams
//! - **Idempotent**: safe for at-least-once delivery

pub mod course_stats;
pub mod enrollments;

pub use course_stats::{CourseStats, CourseStatsProjection};
pub use enrollments::{EnrollmentReadModel, EnrollmentsProjection};
