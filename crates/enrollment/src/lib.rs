//! Enrollment domain module (event-sourced).
//!
//! The learner/course relationship from purchase through consumption to
//! certification: the Enrollment aggregate (progress tracking, completion
//! detection), the Certificate aggregate (exactly-once issuance) and the
//! Review aggregate (one review per enrollment). Deterministic domain logic
//! only — no IO, no HTTP, no storage.

pub mod certificate;
pub mod enrollment;
pub mod review;

pub use certificate::{
    Certificate, CertificateCommand, CertificateEvent, CertificateId, CertificateIssued,
    IssueCertificate,
};
pub use enrollment::{
    CourseCompleted, CreateEnrollment, Enrollment, EnrollmentCommand, EnrollmentCreated,
    EnrollmentEvent, EnrollmentId, LectureCompleted, LectureProgress, ProgressRecomputed,
    RecordWatch, WatchRecorded, progress_basis_points,
};
pub use review::{
    EditReview, RATING_MAX, RATING_MIN, Review, ReviewCommand, ReviewEdited, ReviewEvent,
    ReviewId, ReviewSubmitted, SubmitReview,
};
