//! Application services: the engine's public operation surface.
//!
//! Each service wraps the command dispatcher for its aggregate, resolves
//! catalog facts, and translates dispatcher/store failures into its public
//! error kinds. The request layer (out of scope here) maps those onto a
//! transport contract.

pub mod cart;
pub mod certificate;
pub mod enrollment;
pub mod progress;
pub mod review;

pub use cart::{CartError, CartService, CheckoutStatus, CourseCheckout};
pub use certificate::{
    CertificateError, CertificateIssuer, CertificateRenderer, RenderError, UrlTemplateRenderer,
};
pub use enrollment::{EnrollmentError, EnrollmentService};
pub use progress::{ProgressError, ProgressPolicy, ProgressTracker, WatchOutcome};
pub use review::{ReviewError, ReviewGate};

/// How many times a service re-dispatches a command after losing an
/// optimistic concurrency race before giving up. Contention is per-learner,
/// so in practice one retry resolves it.
pub(crate) const MAX_DISPATCH_RETRIES: usize = 5;
