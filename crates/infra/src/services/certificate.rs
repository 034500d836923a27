//! CertificateIssuer: exactly-once certificate issuance.
//!
//! Reacts to `CourseCompleted` events off the bus (or is invoked directly as
//! a retry path). Document rendering is delegated to an external
//! collaborator; a rendering failure leaves completion state untouched and
//! `issue_if_absent` safely retriable.

use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::info;

use coursemart_enrollment::{
    Certificate, CertificateCommand, CertificateId, Enrollment, EnrollmentEvent, EnrollmentId,
    IssueCertificate,
};
use coursemart_events::{EventBus, EventEnvelope};

use crate::command_dispatcher::{CommandDispatcher, DispatchError};
use crate::event_store::EventStore;
use crate::services::enrollment::ENROLLMENT_AGGREGATE;
use crate::workers::{EventWorker, WorkerHandle};

pub(crate) const CERTIFICATE_AGGREGATE: &str = "certificate";

/// Rendering failure from the external collaborator.
#[derive(Debug, Error)]
#[error("certificate rendering failed: {0}")]
pub struct RenderError(pub String);

/// External collaborator that turns a completed enrollment into a document
/// reference. The engine only enforces issuance invariants and timing.
pub trait CertificateRenderer: Send + Sync {
    fn render(&self, enrollment: &Enrollment) -> Result<String, RenderError>;
}

/// Renderer that derives a stable document URL from a base location.
#[derive(Debug, Clone)]
pub struct UrlTemplateRenderer {
    base_url: String,
}

impl UrlTemplateRenderer {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }
}

impl CertificateRenderer for UrlTemplateRenderer {
    fn render(&self, enrollment: &Enrollment) -> Result<String, RenderError> {
        Ok(format!(
            "{}/{}.pdf",
            self.base_url.trim_end_matches('/'),
            enrollment.id_typed()
        ))
    }
}

#[derive(Debug, Error)]
pub enum CertificateError {
    #[error("enrollment does not exist")]
    UnknownEnrollment,

    /// Certificates are never issued before the completion timestamp is set.
    #[error("course is not completed yet")]
    NotCompleted,

    #[error(transparent)]
    Renderer(#[from] RenderError),

    #[error("storage failure: {0}")]
    Storage(String),
}

/// Certificate issuance service.
pub struct CertificateIssuer<S, B> {
    dispatcher: CommandDispatcher<S, B>,
    renderer: std::sync::Arc<dyn CertificateRenderer>,
}

impl<S, B> CertificateIssuer<S, B>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    pub fn new(store: S, bus: B, renderer: std::sync::Arc<dyn CertificateRenderer>) -> Self {
        Self {
            dispatcher: CommandDispatcher::new(store, bus),
            renderer,
        }
    }

    /// Issue the certificate for a completed enrollment, exactly once.
    ///
    /// Idempotent: a certificate that already exists makes this a silent
    /// no-op, so duplicate completion signals and manual retries are safe.
    pub fn issue_if_absent(&self, enrollment_id: EnrollmentId) -> Result<(), CertificateError> {
        let enrollment = self
            .dispatcher
            .load(enrollment_id.0, |id| Enrollment::empty(EnrollmentId::new(id)))
            .map_err(|e| CertificateError::Storage(format!("{e:?}")))?;

        if !enrollment.is_created() {
            return Err(CertificateError::UnknownEnrollment);
        }
        let Some((user_id, course_id)) = enrollment.user_id().zip(enrollment.course_id()) else {
            return Err(CertificateError::UnknownEnrollment);
        };
        if !enrollment.is_completed() {
            return Err(CertificateError::NotCompleted);
        }

        let certificate_id = CertificateId::for_enrollment(enrollment_id);

        // Cheap existence probe before rendering; the append below remains
        // the authoritative exactly-once gate.
        let existing = self
            .dispatcher
            .load(certificate_id.0, |id| Certificate::empty(CertificateId::new(id)))
            .map_err(|e| CertificateError::Storage(format!("{e:?}")))?;
        if existing.is_issued() {
            return Ok(());
        }

        let url = self.renderer.render(&enrollment)?;

        let result = self.dispatcher.dispatch(
            certificate_id.0,
            CERTIFICATE_AGGREGATE,
            CertificateCommand::IssueCertificate(IssueCertificate {
                certificate_id,
                enrollment_id,
                user_id,
                course_id,
                url,
                occurred_at: chrono::Utc::now(),
            }),
            |id| Certificate::empty(CertificateId::new(id)),
        );

        match result {
            Ok(committed) => {
                if !committed.is_empty() {
                    info!(%enrollment_id, "certificate issued");
                }
                Ok(())
            }
            // Losing the version-0 race means another issuer won; the
            // invariant (exactly one certificate) holds either way.
            Err(DispatchError::Concurrency(_)) | Err(DispatchError::Conflict(_)) => Ok(()),
            Err(other) => Err(CertificateError::Storage(format!("{other:?}"))),
        }
    }

    /// Read the certificate for an enrollment, if issued.
    pub fn certificate(
        &self,
        enrollment_id: EnrollmentId,
    ) -> Result<Option<Certificate>, CertificateError> {
        let certificate_id = CertificateId::for_enrollment(enrollment_id);
        let certificate = self
            .dispatcher
            .load(certificate_id.0, |id| Certificate::empty(CertificateId::new(id)))
            .map_err(|e| CertificateError::Storage(format!("{e:?}")))?;
        Ok(certificate.is_issued().then_some(certificate))
    }

    /// Spawn the worker that reacts to completion events on the bus.
    pub fn spawn_worker<WB>(issuer: std::sync::Arc<Self>, bus: WB) -> WorkerHandle
    where
        WB: EventBus<EventEnvelope<JsonValue>> + Send + Sync + 'static,
        S: 'static,
        B: 'static,
    {
        EventWorker::spawn("certificate-issuer", bus, move |envelope: EventEnvelope<JsonValue>| {
            if envelope.aggregate_type() != ENROLLMENT_AGGREGATE {
                return Ok(());
            }

            let event: EnrollmentEvent = serde_json::from_value(envelope.payload().clone())
                .map_err(anyhow::Error::from)?;

            if let EnrollmentEvent::CourseCompleted(e) = event {
                issuer
                    .issue_if_absent(e.enrollment_id)
                    .map_err(anyhow::Error::from)?;
            }

            Ok::<(), anyhow::Error>(())
        })
    }
}
