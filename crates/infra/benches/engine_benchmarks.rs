//! Benchmarks for the hot engine paths: enrollment creation and watch
//! recording (rehydrate + decide + append).

use std::sync::Arc;

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use coursemart_catalog::InMemoryCatalog;
use coursemart_core::{CourseId, LectureId, Money, UserId};
use coursemart_infra::Engine;
use coursemart_infra::services::{ProgressPolicy, UrlTemplateRenderer};

fn setup() -> (Engine, Arc<InMemoryCatalog>, CourseId, Vec<LectureId>) {
    let catalog = Arc::new(InMemoryCatalog::new());
    let renderer = Arc::new(UrlTemplateRenderer::new("https://certs.coursemart.test"));
    let engine = Engine::in_memory(catalog.clone(), renderer, ProgressPolicy::default());

    let course_id = CourseId::new();
    catalog.upsert_course(course_id, Money::from_cents(4999));
    let lectures: Vec<LectureId> = (0..10)
        .map(|_| {
            let lecture_id = LectureId::new();
            catalog.upsert_lecture(lecture_id, course_id, 600);
            lecture_id
        })
        .collect();

    (engine, catalog, course_id, lectures)
}

fn bench_enroll(c: &mut Criterion) {
    let (engine, _catalog, course_id, _lectures) = setup();

    c.bench_function("enroll_unique_pair", |b| {
        b.iter(|| {
            let user_id = UserId::new();
            black_box(
                engine
                    .enrollments
                    .enroll(user_id, course_id, Money::from_cents(4999))
                    .unwrap(),
            );
        })
    });
}

fn bench_record_watch(c: &mut Criterion) {
    let (engine, _catalog, course_id, lectures) = setup();
    let user_id = UserId::new();
    engine
        .enrollments
        .enroll(user_id, course_id, Money::from_cents(4999))
        .unwrap();
    engine
        .progress
        .record_watch(user_id, course_id, lectures[0], 300)
        .unwrap();

    // Replaying the same offset exercises the full rehydrate/decide path
    // without growing the stream.
    c.bench_function("record_watch_steady_offset", |b| {
        b.iter(|| {
            black_box(
                engine
                    .progress
                    .record_watch(user_id, course_id, lectures[0], 300)
                    .unwrap(),
            );
        })
    });
}

criterion_group!(benches, bench_enroll, bench_record_watch);
criterion_main!(benches);
