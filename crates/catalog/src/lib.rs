//! Catalog collaborator boundary (read-only course/lecture metadata).
//!
//! The engine never mutates the catalog; it only reads the two facts it
//! depends on: a course's current price + lecture count (price snapshotting,
//! progress denominator) and a lecture's duration + owning course.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use coursemart_core::{CourseId, LectureId, Money};

/// What the engine knows about a course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseSummary {
    pub course_id: CourseId,
    /// Current list price; the engine copies this into the enrollment at
    /// checkout time and never re-reads it afterwards.
    pub price: Money,
    /// Lecture count as of this read. The progress denominator is always the
    /// value read at recompute time, never a cached copy.
    pub lecture_count: u32,
}

/// What the engine knows about a lecture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LectureSummary {
    pub lecture_id: LectureId,
    pub course_id: CourseId,
    pub duration_seconds: u32,
}

/// Catalog lookup failure (transport-level; the catalog itself is external).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("catalog unavailable: {0}")]
    Unavailable(String),
}

/// Read-only view over the external catalog.
pub trait Catalog: Send + Sync {
    fn course(&self, id: CourseId) -> Result<Option<CourseSummary>, CatalogError>;

    fn lecture(&self, id: LectureId) -> Result<Option<LectureSummary>, CatalogError>;
}

impl<C> Catalog for Arc<C>
where
    C: Catalog + ?Sized,
{
    fn course(&self, id: CourseId) -> Result<Option<CourseSummary>, CatalogError> {
        (**self).course(id)
    }

    fn lecture(&self, id: LectureId) -> Result<Option<LectureSummary>, CatalogError> {
        (**self).lecture(id)
    }
}

/// In-memory catalog for tests/dev.
///
/// Mutable from the outside (courses gain lectures, prices change) precisely
/// because the engine must stay correct when the catalog moves underneath it.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    inner: RwLock<CatalogData>,
}

#[derive(Debug, Default)]
struct CatalogData {
    prices: HashMap<CourseId, Money>,
    lectures: HashMap<LectureId, (CourseId, u32)>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a course with the given list price.
    pub fn upsert_course(&self, course_id: CourseId, price: Money) {
        if let Ok(mut data) = self.inner.write() {
            data.prices.insert(course_id, price);
        }
    }

    /// Add or replace a lecture belonging to a course.
    pub fn upsert_lecture(&self, lecture_id: LectureId, course_id: CourseId, duration_seconds: u32) {
        if let Ok(mut data) = self.inner.write() {
            data.lectures.insert(lecture_id, (course_id, duration_seconds));
        }
    }
}

impl Catalog for InMemoryCatalog {
    fn course(&self, id: CourseId) -> Result<Option<CourseSummary>, CatalogError> {
        let data = self
            .inner
            .read()
            .map_err(|_| CatalogError::Unavailable("lock poisoned".to_string()))?;

        let Some(price) = data.prices.get(&id).copied() else {
            return Ok(None);
        };

        let lecture_count = data
            .lectures
            .values()
            .filter(|(course, _)| *course == id)
            .count() as u32;

        Ok(Some(CourseSummary {
            course_id: id,
            price,
            lecture_count,
        }))
    }

    fn lecture(&self, id: LectureId) -> Result<Option<LectureSummary>, CatalogError> {
        let data = self
            .inner
            .read()
            .map_err(|_| CatalogError::Unavailable("lock poisoned".to_string()))?;

        Ok(data.lectures.get(&id).map(|(course_id, duration)| LectureSummary {
            lecture_id: id,
            course_id: *course_id,
            duration_seconds: *duration,
        }))
    }
}
