//! Strongly-typed identifiers used across the domain.

use core::str::FromStr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// Identifier of a learner (actor identity, minted by the external Identity
/// collaborator).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(Uuid);

/// Identifier of a course (minted by the external Catalog collaborator).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CourseId(Uuid);

/// Identifier of a lecture within a course (Catalog-owned).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LectureId(Uuid);

/// Identifier of an aggregate root (stream key in the event store).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AggregateId(Uuid);

macro_rules! impl_uuid_newtype {
    ($t:ty, $name:literal) => {
        impl $t {
            /// Create a new identifier.
            ///
            /// Uses UUIDv7 (time-ordered). Prefer passing IDs explicitly in tests
            /// for determinism.
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<Uuid> for $t {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }

        impl From<$t> for Uuid {
            fn from(value: $t) -> Self {
                value.0
            }
        }

        impl FromStr for $t {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let uuid = Uuid::from_str(s)
                    .map_err(|e| DomainError::invalid_id(format!("{}: {}", $name, e)))?;
                Ok(Self(uuid))
            }
        }
    };
}

impl_uuid_newtype!(UserId, "UserId");
impl_uuid_newtype!(CourseId, "CourseId");
impl_uuid_newtype!(LectureId, "LectureId");
impl_uuid_newtype!(AggregateId, "AggregateId");

impl AggregateId {
    /// Deterministic stream key derived from a natural key.
    ///
    /// Streams addressed by a natural key (e.g. one enrollment per
    /// `(user, course)` pair) derive their id with UUIDv5 so that every
    /// writer computes the same stream and the store's version-0 append is
    /// the uniqueness check.
    pub fn derive(kind: &str, parts: &[&Uuid]) -> Self {
        let mut name = Vec::with_capacity(kind.len() + parts.len() * 17);
        name.extend_from_slice(kind.as_bytes());
        for part in parts {
            name.push(b':');
            name.extend_from_slice(part.as_bytes());
        }
        Self(Uuid::new_v5(&Uuid::NAMESPACE_OID, &name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_is_deterministic() {
        let user = UserId::new();
        let course = CourseId::new();

        let a = AggregateId::derive("enrollment", &[user.as_uuid(), course.as_uuid()]);
        let b = AggregateId::derive("enrollment", &[user.as_uuid(), course.as_uuid()]);
        assert_eq!(a, b);
    }

    #[test]
    fn derive_separates_kinds_and_keys() {
        let user = UserId::new();
        let course = CourseId::new();

        let enrollment = AggregateId::derive("enrollment", &[user.as_uuid(), course.as_uuid()]);
        let cart = AggregateId::derive("cart", &[user.as_uuid(), course.as_uuid()]);
        assert_ne!(enrollment, cart);

        let other_course = CourseId::new();
        let other = AggregateId::derive("enrollment", &[user.as_uuid(), other_course.as_uuid()]);
        assert_ne!(enrollment, other);
    }
}
