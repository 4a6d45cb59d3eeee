use attendance_ledger::ledger::LedgerSnapshot;
use attendance_ledger::{Identity, LedgerLimits, LedgerState};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

const OWNER: Identity = Identity::new([0x01; 32]);

fn roster(size: usize) -> Vec<Identity> {
    (0..size)
        .map(|i| {
            let mut bytes = [0u8; 32];
            bytes[..8].copy_from_slice(&(i as u64).to_be_bytes());
            Identity::new(bytes)
        })
        .collect()
}

fn ledger_with_course() -> LedgerState {
    let mut state = LedgerState::new(OWNER, LedgerLimits::default());
    match state.create_course(&OWNER, "Bench", &[], 1) {
        Ok(_) => state,
        Err(e) => panic!("Failed to create course: {:?}", e),
    }
}

fn bench_bulk_mark_attendance(c: &mut Criterion) {
    let students = roster(256);
    let presence: Vec<bool> = (0..students.len()).map(|i| i % 3 != 0).collect();
    let base = ledger_with_course();

    c.bench_function("bulk_mark_attendance_256", |b| {
        b.iter(|| {
            let mut state = base.clone();
            state
                .bulk_mark_attendance(
                    &OWNER,
                    0,
                    black_box(7),
                    black_box(&students),
                    black_box(&presence),
                    2,
                )
                .unwrap();
        })
    });
}

fn bench_attendance_count(c: &mut Criterion) {
    let students = roster(64);
    let presence = vec![true; students.len()];
    let mut state = ledger_with_course();
    for session in 0..100 {
        state
            .bulk_mark_attendance(&OWNER, 0, session, &students, &presence, 2 + session)
            .unwrap();
    }
    let student = students[17];

    c.bench_function("get_student_attendance_count_100_sessions", |b| {
        b.iter(|| {
            let count = state
                .get_student_attendance_count(0, black_box(&student), 100)
                .unwrap();
            black_box(count);
        })
    });
}

fn bench_snapshot_round_trip(c: &mut Criterion) {
    let students = roster(64);
    let presence = vec![true; students.len()];
    let mut state = ledger_with_course();
    for session in 0..20 {
        state
            .bulk_mark_attendance(&OWNER, 0, session, &students, &presence, 2 + session)
            .unwrap();
    }
    let bytes = state.snapshot().to_bytes();

    c.bench_function("snapshot_decode_1280_records", |b| {
        b.iter(|| {
            let snapshot = LedgerSnapshot::from_bytes(black_box(&bytes)).unwrap();
            black_box(snapshot);
        })
    });
}

criterion_group!(
    benches,
    bench_bulk_mark_attendance,
    bench_attendance_count,
    bench_snapshot_round_trip
);
criterion_main!(benches);
