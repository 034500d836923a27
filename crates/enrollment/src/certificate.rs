use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use coursemart_core::{Aggregate, AggregateId, AggregateRoot, CourseId, DomainError, UserId};
use coursemart_events::Event;

use crate::enrollment::EnrollmentId;

/// Certificate identifier, derived from the enrollment so the store's
/// version-0 append enforces the 1:1 relation.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CertificateId(pub AggregateId);

impl CertificateId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }

    pub fn for_enrollment(enrollment_id: EnrollmentId) -> Self {
        Self(AggregateId::derive("certificate", &[enrollment_id.0.as_uuid()]))
    }
}

impl core::fmt::Display for CertificateId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Aggregate root: Certificate.
///
/// Immutable once issued; re-delivery of the completion signal is a no-op.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Certificate {
    id: CertificateId,
    enrollment_id: Option<EnrollmentId>,
    url: String,
    issued_at: Option<DateTime<Utc>>,
    version: u64,
    issued: bool,
}

impl Certificate {
    /// Create an empty, not-yet-issued aggregate instance for rehydration.
    pub fn empty(id: CertificateId) -> Self {
        Self {
            id,
            enrollment_id: None,
            url: String::new(),
            issued_at: None,
            version: 0,
            issued: false,
        }
    }

    pub fn id_typed(&self) -> CertificateId {
        self.id
    }

    pub fn is_issued(&self) -> bool {
        self.issued
    }

    pub fn enrollment_id(&self) -> Option<EnrollmentId> {
        self.enrollment_id
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        self.issued_at
    }
}

impl AggregateRoot for Certificate {
    type Id = CertificateId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: IssueCertificate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueCertificate {
    pub certificate_id: CertificateId,
    pub enrollment_id: EnrollmentId,
    pub user_id: UserId,
    pub course_id: CourseId,
    /// Rendered document reference from the external renderer.
    pub url: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CertificateCommand {
    IssueCertificate(IssueCertificate),
}

/// Event: CertificateIssued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateIssued {
    pub enrollment_id: EnrollmentId,
    pub user_id: UserId,
    pub course_id: CourseId,
    pub url: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CertificateEvent {
    CertificateIssued(CertificateIssued),
}

impl Event for CertificateEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CertificateEvent::CertificateIssued(_) => "certificate.issued",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            CertificateEvent::CertificateIssued(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Certificate {
    type Command = CertificateCommand;
    type Event = CertificateEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            CertificateEvent::CertificateIssued(e) => {
                self.enrollment_id = Some(e.enrollment_id);
                self.url = e.url.clone();
                self.issued_at = Some(e.occurred_at);
                self.issued = true;
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            CertificateCommand::IssueCertificate(cmd) => {
                if self.id != cmd.certificate_id {
                    return Err(DomainError::invariant("certificate_id mismatch"));
                }

                // Idempotent: a duplicate completion signal issues nothing.
                if self.issued {
                    return Ok(vec![]);
                }

                Ok(vec![CertificateEvent::CertificateIssued(CertificateIssued {
                    enrollment_id: cmd.enrollment_id,
                    user_id: cmd.user_id,
                    course_id: cmd.course_id,
                    url: cmd.url.clone(),
                    occurred_at: cmd.occurred_at,
                })])
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issue_cmd(certificate: &Certificate, enrollment_id: EnrollmentId) -> CertificateCommand {
        CertificateCommand::IssueCertificate(IssueCertificate {
            certificate_id: certificate.id_typed(),
            enrollment_id,
            user_id: UserId::new(),
            course_id: CourseId::new(),
            url: "https://certificates.example/abc.pdf".to_string(),
            occurred_at: Utc::now(),
        })
    }

    #[test]
    fn issue_emits_certificate_issued() {
        let enrollment_id = EnrollmentId::for_learner(UserId::new(), CourseId::new());
        let certificate = Certificate::empty(CertificateId::for_enrollment(enrollment_id));

        let events = certificate.handle(&issue_cmd(&certificate, enrollment_id)).unwrap();
        assert_eq!(events.len(), 1);
        match &events[0] {
            CertificateEvent::CertificateIssued(e) => {
                assert_eq!(e.enrollment_id, enrollment_id);
                assert!(!e.url.is_empty());
            }
        }
    }

    #[test]
    fn second_issue_is_a_silent_no_op() {
        let enrollment_id = EnrollmentId::for_learner(UserId::new(), CourseId::new());
        let mut certificate = Certificate::empty(CertificateId::for_enrollment(enrollment_id));

        let events = certificate.handle(&issue_cmd(&certificate, enrollment_id)).unwrap();
        certificate.apply(&events[0]);
        let first_issued_at = certificate.issued_at();

        let events = certificate.handle(&issue_cmd(&certificate, enrollment_id)).unwrap();
        assert!(events.is_empty());
        assert_eq!(certificate.issued_at(), first_issued_at);
        assert_eq!(certificate.version(), 1);
    }
}
