use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use coursemart_core::{
    Aggregate, AggregateId, AggregateRoot, CourseId, DomainError, LectureId, Money, UserId,
};
use coursemart_events::Event;

/// Enrollment identifier.
///
/// Derived deterministically from the `(user, course)` pair so that the
/// event store's version-0 append doubles as the "at most one enrollment per
/// pair" check.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnrollmentId(pub AggregateId);

impl EnrollmentId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }

    /// Deterministic enrollment stream key for a learner/course pair.
    pub fn for_learner(user_id: UserId, course_id: CourseId) -> Self {
        Self(AggregateId::derive(
            "enrollment",
            &[user_id.as_uuid(), course_id.as_uuid()],
        ))
    }
}

impl core::fmt::Display for EnrollmentId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Per-lecture consumption record.
///
/// Created lazily on the first watch event for the lecture, never deleted.
/// `last_watched_second` only ever moves forward; the completion flag and
/// timestamp are set once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct LectureProgress {
    pub last_watched_second: u32,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Exact aggregate percentage in basis points (0..=10_000).
///
/// Integer arithmetic keeps `100 * k / n` exact where it divides evenly and
/// avoids float drift everywhere else; completion detection never compares
/// against 10_000 but against `completed == total`.
pub fn progress_basis_points(completed_lectures: u32, total_lectures: u32) -> u32 {
    if total_lectures == 0 {
        return 0;
    }
    ((completed_lectures as u64 * 10_000) / total_lectures as u64) as u32
}

/// Aggregate root: Enrollment.
///
/// Owns the learner's relationship to one course: the price snapshot, the
/// per-lecture watch records and the derived completion state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enrollment {
    id: EnrollmentId,
    user_id: Option<UserId>,
    course_id: Option<CourseId>,
    price_paid: Money,
    enrolled_at: Option<DateTime<Utc>>,
    lectures: BTreeMap<LectureId, LectureProgress>,
    total_lectures: u32,
    progress_bp: u32,
    completed_at: Option<DateTime<Utc>>,
    version: u64,
    created: bool,
}

impl Enrollment {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: EnrollmentId) -> Self {
        Self {
            id,
            user_id: None,
            course_id: None,
            price_paid: Money::ZERO,
            enrolled_at: None,
            lectures: BTreeMap::new(),
            total_lectures: 0,
            progress_bp: 0,
            completed_at: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> EnrollmentId {
        self.id
    }

    pub fn is_created(&self) -> bool {
        self.created
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.user_id
    }

    pub fn course_id(&self) -> Option<CourseId> {
        self.course_id
    }

    /// Price snapshot taken at enrollment time; never re-read afterwards.
    pub fn price_paid(&self) -> Money {
        self.price_paid
    }

    pub fn enrolled_at(&self) -> Option<DateTime<Utc>> {
        self.enrolled_at
    }

    pub fn lecture(&self, lecture_id: LectureId) -> Option<&LectureProgress> {
        self.lectures.get(&lecture_id)
    }

    pub fn lectures(&self) -> &BTreeMap<LectureId, LectureProgress> {
        &self.lectures
    }

    pub fn completed_lectures(&self) -> u32 {
        self.lectures.values().filter(|p| p.completed).count() as u32
    }

    /// Denominator as last observed from the catalog.
    pub fn total_lectures(&self) -> u32 {
        self.total_lectures
    }

    /// Aggregate percentage in basis points (7500 = 75%).
    pub fn progress_bp(&self) -> u32 {
        self.progress_bp
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }
}

impl AggregateRoot for Enrollment {
    type Id = EnrollmentId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateEnrollment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateEnrollment {
    pub enrollment_id: EnrollmentId,
    pub user_id: UserId,
    pub course_id: CourseId,
    /// Snapshot of the catalog price at checkout time.
    pub price_paid: Money,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RecordWatch.
///
/// The tracker service resolves catalog facts before building this command:
/// `watched_seconds` is already validated non-negative and clamped to the
/// lecture duration, `lecture_completed` is the policy decision (threshold
/// against duration) and `total_lectures` is the denominator read from the
/// catalog at call time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordWatch {
    pub enrollment_id: EnrollmentId,
    pub lecture_id: LectureId,
    pub watched_seconds: u32,
    pub lecture_completed: bool,
    pub total_lectures: u32,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnrollmentCommand {
    CreateEnrollment(CreateEnrollment),
    RecordWatch(RecordWatch),
}

/// Event: EnrollmentCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrollmentCreated {
    pub enrollment_id: EnrollmentId,
    pub user_id: UserId,
    pub course_id: CourseId,
    pub price_paid: Money,
    pub occurred_at: DateTime<Utc>,
}

/// Event: WatchRecorded. Emitted when the recorded offset actually advances
/// (or the lecture record is first created).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchRecorded {
    pub enrollment_id: EnrollmentId,
    pub user_id: UserId,
    pub course_id: CourseId,
    pub lecture_id: LectureId,
    pub last_watched_second: u32,
    pub occurred_at: DateTime<Utc>,
}

/// Event: LectureCompleted (set-once per lecture).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LectureCompleted {
    pub enrollment_id: EnrollmentId,
    pub user_id: UserId,
    pub course_id: CourseId,
    pub lecture_id: LectureId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ProgressRecomputed.
///
/// Carries numerator, denominator and the resulting basis points so that
/// replay stays deterministic even though the denominator comes from the
/// catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressRecomputed {
    pub enrollment_id: EnrollmentId,
    pub user_id: UserId,
    pub course_id: CourseId,
    pub completed_lectures: u32,
    pub total_lectures: u32,
    pub progress_bp: u32,
    pub occurred_at: DateTime<Utc>,
}

/// Event: CourseCompleted (set-once per enrollment).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseCompleted {
    pub enrollment_id: EnrollmentId,
    pub user_id: UserId,
    pub course_id: CourseId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnrollmentEvent {
    EnrollmentCreated(EnrollmentCreated),
    WatchRecorded(WatchRecorded),
    LectureCompleted(LectureCompleted),
    ProgressRecomputed(ProgressRecomputed),
    CourseCompleted(CourseCompleted),
}

impl Event for EnrollmentEvent {
    fn event_type(&self) -> &'static str {
        match self {
            EnrollmentEvent::EnrollmentCreated(_) => "enrollment.created",
            EnrollmentEvent::WatchRecorded(_) => "enrollment.watch_recorded",
            EnrollmentEvent::LectureCompleted(_) => "enrollment.lecture_completed",
            EnrollmentEvent::ProgressRecomputed(_) => "enrollment.progress_recomputed",
            EnrollmentEvent::CourseCompleted(_) => "enrollment.course_completed",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            EnrollmentEvent::EnrollmentCreated(e) => e.occurred_at,
            EnrollmentEvent::WatchRecorded(e) => e.occurred_at,
            EnrollmentEvent::LectureCompleted(e) => e.occurred_at,
            EnrollmentEvent::ProgressRecomputed(e) => e.occurred_at,
            EnrollmentEvent::CourseCompleted(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Enrollment {
    type Command = EnrollmentCommand;
    type Event = EnrollmentEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            EnrollmentEvent::EnrollmentCreated(e) => {
                self.id = e.enrollment_id;
                self.user_id = Some(e.user_id);
                self.course_id = Some(e.course_id);
                self.price_paid = e.price_paid;
                self.enrolled_at = Some(e.occurred_at);
                self.lectures.clear();
                self.total_lectures = 0;
                self.progress_bp = 0;
                self.completed_at = None;
                self.created = true;
            }
            EnrollmentEvent::WatchRecorded(e) => {
                let record = self.lectures.entry(e.lecture_id).or_default();
                record.last_watched_second = e.last_watched_second;
            }
            EnrollmentEvent::LectureCompleted(e) => {
                let record = self.lectures.entry(e.lecture_id).or_default();
                record.completed = true;
                record.completed_at = Some(e.occurred_at);
            }
            EnrollmentEvent::ProgressRecomputed(e) => {
                self.total_lectures = e.total_lectures;
                self.progress_bp = e.progress_bp;
            }
            EnrollmentEvent::CourseCompleted(e) => {
                self.completed_at = Some(e.occurred_at);
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            EnrollmentCommand::CreateEnrollment(cmd) => self.handle_create(cmd),
            EnrollmentCommand::RecordWatch(cmd) => self.handle_record_watch(cmd),
        }
    }
}

impl Enrollment {
    fn ensure_enrollment_id(&self, enrollment_id: EnrollmentId) -> Result<(), DomainError> {
        if self.id != enrollment_id {
            return Err(DomainError::invariant("enrollment_id mismatch"));
        }
        Ok(())
    }

    fn learner(&self) -> Result<(UserId, CourseId), DomainError> {
        match (self.user_id, self.course_id) {
            (Some(user), Some(course)) => Ok((user, course)),
            _ => Err(DomainError::invariant("enrollment has no learner context")),
        }
    }

    fn handle_create(&self, cmd: &CreateEnrollment) -> Result<Vec<EnrollmentEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("enrollment already exists"));
        }

        Ok(vec![EnrollmentEvent::EnrollmentCreated(EnrollmentCreated {
            enrollment_id: cmd.enrollment_id,
            user_id: cmd.user_id,
            course_id: cmd.course_id,
            price_paid: cmd.price_paid,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_record_watch(&self, cmd: &RecordWatch) -> Result<Vec<EnrollmentEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_enrollment_id(cmd.enrollment_id)?;
        let (user_id, course_id) = self.learner()?;

        let mut events = Vec::new();

        let existing = self.lectures.get(&cmd.lecture_id);

        // Monotonic offset merge: a rewind never erases recorded progress.
        // The record is created lazily on the first watch event even if the
        // offset is 0.
        let previous_offset = existing.map(|p| p.last_watched_second);
        let merged_offset = previous_offset.map_or(cmd.watched_seconds, |prev| {
            prev.max(cmd.watched_seconds)
        });
        if previous_offset != Some(merged_offset) {
            events.push(EnrollmentEvent::WatchRecorded(WatchRecorded {
                enrollment_id: self.id,
                user_id,
                course_id,
                lecture_id: cmd.lecture_id,
                last_watched_second: merged_offset,
                occurred_at: cmd.occurred_at,
            }));
        }

        // Per-lecture completion is set once.
        let newly_completed = cmd.lecture_completed && !existing.is_some_and(|p| p.completed);
        if newly_completed {
            events.push(EnrollmentEvent::LectureCompleted(LectureCompleted {
                enrollment_id: self.id,
                user_id,
                course_id,
                lecture_id: cmd.lecture_id,
                occurred_at: cmd.occurred_at,
            }));
        }

        // Recompute against the denominator the caller just read from the
        // catalog. Once the enrollment is completed it is terminal and the
        // percentage stays pinned at 100.
        let completed_after = self.completed_lectures() + u32::from(newly_completed);
        let progress_after = if self.completed_at.is_some() {
            10_000
        } else {
            progress_basis_points(completed_after, cmd.total_lectures)
        };
        if progress_after != self.progress_bp || cmd.total_lectures != self.total_lectures {
            events.push(EnrollmentEvent::ProgressRecomputed(ProgressRecomputed {
                enrollment_id: self.id,
                user_id,
                course_id,
                completed_lectures: completed_after,
                total_lectures: cmd.total_lectures,
                progress_bp: progress_after,
                occurred_at: cmd.occurred_at,
            }));
        }

        // Completion detection: only the update that observes a null
        // completion timestamp may set it. The optimistic append on this
        // stream makes that observation race-safe.
        if self.completed_at.is_none()
            && cmd.total_lectures > 0
            && completed_after >= cmd.total_lectures
        {
            events.push(EnrollmentEvent::CourseCompleted(CourseCompleted {
                enrollment_id: self.id,
                user_id,
                course_id,
                occurred_at: cmd.occurred_at,
            }));
        }

        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_pair() -> (UserId, CourseId) {
        (UserId::new(), CourseId::new())
    }

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn created_enrollment(user_id: UserId, course_id: CourseId) -> Enrollment {
        let id = EnrollmentId::for_learner(user_id, course_id);
        let mut enrollment = Enrollment::empty(id);
        let events = enrollment
            .handle(&EnrollmentCommand::CreateEnrollment(CreateEnrollment {
                enrollment_id: id,
                user_id,
                course_id,
                price_paid: Money::from_cents(4999),
                occurred_at: test_time(),
            }))
            .unwrap();
        enrollment.apply(&events[0]);
        enrollment
    }

    fn watch_cmd(
        enrollment: &Enrollment,
        lecture_id: LectureId,
        watched_seconds: u32,
        lecture_completed: bool,
        total_lectures: u32,
    ) -> EnrollmentCommand {
        EnrollmentCommand::RecordWatch(RecordWatch {
            enrollment_id: enrollment.id_typed(),
            lecture_id,
            watched_seconds,
            lecture_completed,
            total_lectures,
            occurred_at: test_time(),
        })
    }

    fn apply_all(enrollment: &mut Enrollment, events: &[EnrollmentEvent]) {
        for ev in events {
            enrollment.apply(ev);
        }
    }

    #[test]
    fn create_emits_enrollment_created_with_price_snapshot() {
        let (user_id, course_id) = test_pair();
        let id = EnrollmentId::for_learner(user_id, course_id);
        let enrollment = Enrollment::empty(id);

        let events = enrollment
            .handle(&EnrollmentCommand::CreateEnrollment(CreateEnrollment {
                enrollment_id: id,
                user_id,
                course_id,
                price_paid: Money::from_cents(1999),
                occurred_at: test_time(),
            }))
            .unwrap();
        assert_eq!(events.len(), 1);

        match &events[0] {
            EnrollmentEvent::EnrollmentCreated(e) => {
                assert_eq!(e.user_id, user_id);
                assert_eq!(e.course_id, course_id);
                assert_eq!(e.price_paid, Money::from_cents(1999));
            }
            _ => panic!("Expected EnrollmentCreated event"),
        }
    }

    #[test]
    fn duplicate_create_is_a_conflict() {
        let (user_id, course_id) = test_pair();
        let enrollment = created_enrollment(user_id, course_id);

        let err = enrollment
            .handle(&EnrollmentCommand::CreateEnrollment(CreateEnrollment {
                enrollment_id: enrollment.id_typed(),
                user_id,
                course_id,
                price_paid: Money::from_cents(2999),
                occurred_at: test_time(),
            }))
            .unwrap_err();
        match err {
            DomainError::Conflict(msg) if msg.contains("already exists") => {}
            _ => panic!("Expected Conflict for duplicate create"),
        }
    }

    #[test]
    fn first_watch_creates_record_even_at_offset_zero() {
        let (user_id, course_id) = test_pair();
        let mut enrollment = created_enrollment(user_id, course_id);
        let lecture = LectureId::new();

        let events = enrollment
            .handle(&watch_cmd(&enrollment, lecture, 0, false, 4))
            .unwrap();
        apply_all(&mut enrollment, &events);

        let record = enrollment.lecture(lecture).unwrap();
        assert_eq!(record.last_watched_second, 0);
        assert!(!record.completed);
    }

    #[test]
    fn rewind_does_not_regress_recorded_offset() {
        let (user_id, course_id) = test_pair();
        let mut enrollment = created_enrollment(user_id, course_id);
        let lecture = LectureId::new();

        let events = enrollment
            .handle(&watch_cmd(&enrollment, lecture, 300, false, 4))
            .unwrap();
        apply_all(&mut enrollment, &events);

        // Rewinding to 100 emits nothing and leaves the offset at 300.
        let events = enrollment
            .handle(&watch_cmd(&enrollment, lecture, 100, false, 4))
            .unwrap();
        assert!(events.is_empty());
        assert_eq!(enrollment.lecture(lecture).unwrap().last_watched_second, 300);
    }

    #[test]
    fn lecture_completion_is_set_once() {
        let (user_id, course_id) = test_pair();
        let mut enrollment = created_enrollment(user_id, course_id);
        let lecture = LectureId::new();

        let events = enrollment
            .handle(&watch_cmd(&enrollment, lecture, 600, true, 4))
            .unwrap();
        apply_all(&mut enrollment, &events);
        let first_completed_at = enrollment.lecture(lecture).unwrap().completed_at;
        assert!(first_completed_at.is_some());

        // Re-watching the lecture does not emit another LectureCompleted.
        let events = enrollment
            .handle(&watch_cmd(&enrollment, lecture, 600, true, 4))
            .unwrap();
        assert!(
            !events
                .iter()
                .any(|e| matches!(e, EnrollmentEvent::LectureCompleted(_)))
        );
        assert_eq!(enrollment.lecture(lecture).unwrap().completed_at, first_completed_at);
    }

    #[test]
    fn progress_is_exact_at_three_of_four() {
        let (user_id, course_id) = test_pair();
        let mut enrollment = created_enrollment(user_id, course_id);

        for _ in 0..3 {
            let events = enrollment
                .handle(&watch_cmd(&enrollment, LectureId::new(), 600, true, 4))
                .unwrap();
            apply_all(&mut enrollment, &events);
        }

        assert_eq!(enrollment.progress_bp(), 7_500);
        assert_eq!(enrollment.completed_lectures(), 3);
        assert!(enrollment.completed_at().is_none());
    }

    #[test]
    fn completing_all_lectures_completes_the_course_once() {
        let (user_id, course_id) = test_pair();
        let mut enrollment = created_enrollment(user_id, course_id);
        let lectures: Vec<LectureId> = (0..4).map(|_| LectureId::new()).collect();

        for lecture in &lectures[..3] {
            let events = enrollment
                .handle(&watch_cmd(&enrollment, *lecture, 600, true, 4))
                .unwrap();
            apply_all(&mut enrollment, &events);
        }
        assert!(enrollment.completed_at().is_none());

        let events = enrollment
            .handle(&watch_cmd(&enrollment, lectures[3], 600, true, 4))
            .unwrap();
        assert!(
            events
                .iter()
                .any(|e| matches!(e, EnrollmentEvent::CourseCompleted(_)))
        );
        apply_all(&mut enrollment, &events);

        assert_eq!(enrollment.progress_bp(), 10_000);
        assert!(enrollment.completed_at().is_some());

        // Re-triggering completion logic after completion is a no-op.
        let events = enrollment
            .handle(&watch_cmd(&enrollment, lectures[3], 600, true, 4))
            .unwrap();
        assert!(
            !events
                .iter()
                .any(|e| matches!(e, EnrollmentEvent::CourseCompleted(_)))
        );
    }

    #[test]
    fn denominator_growth_lowers_incomplete_progress() {
        let (user_id, course_id) = test_pair();
        let mut enrollment = created_enrollment(user_id, course_id);
        let first = LectureId::new();

        let events = enrollment
            .handle(&watch_cmd(&enrollment, first, 600, true, 2))
            .unwrap();
        apply_all(&mut enrollment, &events);
        assert_eq!(enrollment.progress_bp(), 5_000);

        // Two lectures were added to the course; the next recompute reads the
        // fresh denominator.
        let events = enrollment
            .handle(&watch_cmd(&enrollment, LectureId::new(), 10, false, 4))
            .unwrap();
        apply_all(&mut enrollment, &events);
        assert_eq!(enrollment.progress_bp(), 2_500);
        assert_eq!(enrollment.total_lectures(), 4);
    }

    #[test]
    fn zero_lecture_course_never_completes() {
        let (user_id, course_id) = test_pair();
        let mut enrollment = created_enrollment(user_id, course_id);

        let events = enrollment
            .handle(&watch_cmd(&enrollment, LectureId::new(), 60, true, 0))
            .unwrap();
        apply_all(&mut enrollment, &events);

        assert_eq!(enrollment.progress_bp(), 0);
        assert!(enrollment.completed_at().is_none());
    }

    #[test]
    fn watch_before_create_is_not_found() {
        let (user_id, course_id) = test_pair();
        let enrollment = Enrollment::empty(EnrollmentId::for_learner(user_id, course_id));

        let err = enrollment
            .handle(&watch_cmd(&enrollment, LectureId::new(), 10, false, 4))
            .unwrap_err();
        assert_eq!(err, DomainError::NotFound);
    }

    #[test]
    fn handle_does_not_mutate_state() {
        let (user_id, course_id) = test_pair();
        let enrollment = created_enrollment(user_id, course_id);
        let cmd = watch_cmd(&enrollment, LectureId::new(), 120, false, 4);

        let before = enrollment.clone();
        let events1 = enrollment.handle(&cmd).unwrap();
        let events2 = enrollment.handle(&cmd).unwrap();

        assert_eq!(enrollment, before);
        assert_eq!(events1, events2);
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: the recorded offset equals the maximum offset ever
            /// submitted for the lecture, regardless of submission order.
            #[test]
            fn offset_is_max_of_submissions(offsets in proptest::collection::vec(0u32..20_000, 1..30)) {
                let (user_id, course_id) = (UserId::new(), CourseId::new());
                let mut enrollment = created_enrollment(user_id, course_id);
                let lecture = LectureId::new();

                for offset in &offsets {
                    let events = enrollment
                        .handle(&watch_cmd(&enrollment, lecture, *offset, false, 4))
                        .unwrap();
                    for ev in &events {
                        enrollment.apply(ev);
                    }
                }

                let max = offsets.iter().copied().max().unwrap();
                prop_assert_eq!(enrollment.lecture(lecture).unwrap().last_watched_second, max);
            }

            /// Property: basis points stay in 0..=10_000 and are exact for
            /// even divisions.
            #[test]
            fn basis_points_bounds(completed in 0u32..500, total in 0u32..500) {
                let completed = completed.min(total);
                let bp = progress_basis_points(completed, total);
                prop_assert!(bp <= 10_000);
                if total > 0 && total % 4 == 0 && completed == total * 3 / 4 {
                    prop_assert_eq!(bp, 7_500);
                }
                if total > 0 && completed == total {
                    prop_assert_eq!(bp, 10_000);
                }
            }
        }
    }
}
