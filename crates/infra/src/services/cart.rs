//! CartService: pre-purchase selection and checkout.
//!
//! Checkout converts cart lines into enrollments one course at a time. Each
//! course is one independent step: the enrollment create is the atomic
//! check-and-insert, the cart line removal follows it, and a failure on one
//! course never rolls back another. The per-course outcome is reported to
//! the caller.

use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::{debug, info, warn};

use coursemart_cart::{AddItem, Cart, CartCommand, CartId, CartItem, RemoveItem};
use coursemart_catalog::Catalog;
use coursemart_core::{CourseId, UserId};
use coursemart_enrollment::{CreateEnrollment, Enrollment, EnrollmentCommand, EnrollmentId};
use coursemart_events::{EventBus, EventEnvelope};

use crate::command_dispatcher::{CommandDispatcher, DispatchError};
use crate::event_store::EventStore;
use crate::services::MAX_DISPATCH_RETRIES;
use crate::services::enrollment::ENROLLMENT_AGGREGATE;

pub(crate) const CART_AGGREGATE: &str = "cart";

#[derive(Debug, Error)]
pub enum CartError {
    #[error("course is already in the cart")]
    DuplicateCartItem,

    #[error("learner is already enrolled in this course")]
    AlreadyEnrolled,

    #[error("course does not exist in the catalog")]
    UnknownCourse,

    #[error("catalog lookup failed: {0}")]
    Catalog(String),

    #[error("storage failure: {0}")]
    Storage(String),
}

/// Per-course checkout outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutStatus {
    /// Enrollment created, cart line consumed.
    Enrolled,
    /// An enrollment already existed; no duplicate was created. The stale
    /// cart line is removed anyway.
    AlreadyEnrolled,
    /// No cart line existed for the course.
    NotInCart,
    /// The catalog has no (reachable) record of the course, so no price
    /// snapshot could be taken.
    CourseUnavailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CourseCheckout {
    pub course_id: CourseId,
    pub status: CheckoutStatus,
}

/// Cart service.
pub struct CartService<S, B> {
    dispatcher: CommandDispatcher<S, B>,
    catalog: std::sync::Arc<dyn Catalog>,
}

impl<S, B> CartService<S, B>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    pub fn new(store: S, bus: B, catalog: std::sync::Arc<dyn Catalog>) -> Self {
        Self {
            dispatcher: CommandDispatcher::new(store, bus),
            catalog,
        }
    }

    /// Put a course into the user's cart.
    pub fn add_to_cart(&self, user_id: UserId, course_id: CourseId) -> Result<(), CartError> {
        self.catalog
            .course(course_id)
            .map_err(|e| CartError::Catalog(e.to_string()))?
            .ok_or(CartError::UnknownCourse)?;

        // An enrolled course can never be re-added. The enrollment stream is
        // the source of truth, not the cart.
        if self.is_enrolled(user_id, course_id)? {
            return Err(CartError::AlreadyEnrolled);
        }

        let cart_id = CartId::for_user(user_id);
        let mut attempts = 0;
        loop {
            let result = self.dispatcher.dispatch(
                cart_id.0,
                CART_AGGREGATE,
                CartCommand::AddItem(AddItem {
                    cart_id,
                    user_id,
                    course_id,
                    occurred_at: chrono::Utc::now(),
                }),
                |id| Cart::empty(CartId::new(id)),
            );

            match result {
                Ok(_) => {
                    debug!(%user_id, %course_id, "course added to cart");
                    return Ok(());
                }
                Err(DispatchError::Conflict(_)) => return Err(CartError::DuplicateCartItem),
                Err(DispatchError::Concurrency(_)) if attempts < MAX_DISPATCH_RETRIES => {
                    attempts += 1;
                }
                Err(other) => return Err(CartError::Storage(format!("{other:?}"))),
            }
        }
    }

    /// Take a course out of the user's cart. Idempotent: absent lines are a
    /// no-op, not an error.
    pub fn remove_from_cart(&self, user_id: UserId, course_id: CourseId) -> Result<(), CartError> {
        let cart_id = CartId::for_user(user_id);
        let mut attempts = 0;
        loop {
            let result = self.dispatcher.dispatch(
                cart_id.0,
                CART_AGGREGATE,
                CartCommand::RemoveItem(RemoveItem {
                    cart_id,
                    user_id,
                    course_id,
                    occurred_at: chrono::Utc::now(),
                }),
                |id| Cart::empty(CartId::new(id)),
            );

            match result {
                Ok(_) => return Ok(()),
                Err(DispatchError::Concurrency(_)) if attempts < MAX_DISPATCH_RETRIES => {
                    attempts += 1;
                }
                Err(other) => return Err(CartError::Storage(format!("{other:?}"))),
            }
        }
    }

    /// Current cart contents.
    pub fn items(&self, user_id: UserId) -> Result<Vec<CartItem>, CartError> {
        let cart = self.load_cart(user_id)?;
        Ok(cart.items().to_vec())
    }

    /// Convert the requested cart lines into enrollments.
    ///
    /// Courses are processed independently; the result reports a per-course
    /// outcome and earlier successes survive later failures.
    pub fn checkout(
        &self,
        user_id: UserId,
        course_ids: &[CourseId],
    ) -> Result<Vec<CourseCheckout>, CartError> {
        let mut outcomes = Vec::with_capacity(course_ids.len());

        for &course_id in course_ids {
            let status = self.checkout_course(user_id, course_id)?;
            outcomes.push(CourseCheckout { course_id, status });
        }

        Ok(outcomes)
    }

    fn checkout_course(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<CheckoutStatus, CartError> {
        // (a) a cart line must exist for the course.
        let cart = self.load_cart(user_id)?;
        if !cart.contains(course_id) {
            return Ok(CheckoutStatus::NotInCart);
        }

        // Price snapshot from the catalog's current price. A missing or
        // unreachable course fails only this course, not the whole checkout.
        let course = match self.catalog.course(course_id) {
            Ok(Some(course)) => course,
            Ok(None) => return Ok(CheckoutStatus::CourseUnavailable),
            Err(err) => {
                warn!(%user_id, %course_id, error = %err, "catalog unavailable during checkout");
                return Ok(CheckoutStatus::CourseUnavailable);
            }
        };

        // (b)+(c) verify no enrollment exists and create it, as one atomic
        // version-0 append on the derived enrollment stream.
        let enrollment_id = EnrollmentId::for_learner(user_id, course_id);
        let created = self.dispatcher.dispatch(
            enrollment_id.0,
            ENROLLMENT_AGGREGATE,
            EnrollmentCommand::CreateEnrollment(CreateEnrollment {
                enrollment_id,
                user_id,
                course_id,
                price_paid: course.price,
                occurred_at: chrono::Utc::now(),
            }),
            |id| Enrollment::empty(EnrollmentId::new(id)),
        );

        let status = match created {
            Ok(_) => CheckoutStatus::Enrolled,
            // Already enrolled (or lost a racing create): no duplicate row
            // exists either way.
            Err(DispatchError::Conflict(_)) | Err(DispatchError::Concurrency(_)) => {
                CheckoutStatus::AlreadyEnrolled
            }
            Err(other) => return Err(CartError::Storage(format!("{other:?}"))),
        };

        // (d) consume the cart line. Also runs on AlreadyEnrolled so a
        // course never stays both "in cart" and "enrolled".
        self.remove_from_cart(user_id, course_id)?;

        if status == CheckoutStatus::Enrolled {
            info!(%user_id, %course_id, price_cents = course.price.cents(), "checkout enrolled course");
        }

        Ok(status)
    }

    fn is_enrolled(&self, user_id: UserId, course_id: CourseId) -> Result<bool, CartError> {
        let enrollment_id = EnrollmentId::for_learner(user_id, course_id);
        let enrollment = self
            .dispatcher
            .load(enrollment_id.0, |id| Enrollment::empty(EnrollmentId::new(id)))
            .map_err(|e| CartError::Storage(format!("{e:?}")))?;
        Ok(enrollment.is_created())
    }

    fn load_cart(&self, user_id: UserId) -> Result<Cart, CartError> {
        let cart_id = CartId::for_user(user_id);
        self.dispatcher
            .load(cart_id.0, |id| Cart::empty(CartId::new(id)))
            .map_err(|e| CartError::Storage(format!("{e:?}")))
    }
}
