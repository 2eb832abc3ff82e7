use common::{ActorId, ProfileId};
use criterion::{Criterion, criterion_group, criterion_main};
use event_store::{EventEnvelope, EventStore, InMemoryEventStore, ProfileEvent, ProfileField, Version};
use profile::{EventRecorder, Profile, ProfileService, ReplayService, SnapshotPolicy};

fn renamed(profile_id: ProfileId, version: i64) -> EventEnvelope {
    EventEnvelope::new(
        profile_id,
        Version::new(version),
        ActorId::system(),
        ProfileEvent::FieldUpdated {
            field_name: ProfileField::DisplayName,
            old_value: None,
            new_value: Some(format!("User {version}")),
        },
    )
}

/// Seeds `events` versions with no snapshot at all.
fn seed_log(rt: &tokio::runtime::Runtime, store: &InMemoryEventStore, events: i64) -> ProfileId {
    let profile_id = ProfileId::new();
    rt.block_on(async {
        store
            .append_event(EventEnvelope::new(
                profile_id,
                Version::first(),
                ActorId::system(),
                ProfileEvent::Created {
                    display_name: "User 1".to_string(),
                    birthday: None,
                },
            ))
            .await
            .unwrap();
        for v in 2..=events {
            store.append_event(renamed(profile_id, v)).await.unwrap();
        }
    });
    profile_id
}

fn bench_record_field_update(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let recorder = EventRecorder::new(InMemoryEventStore::new());
    let profile = Profile::new("Bench User");
    rt.block_on(async { recorder.record_created(&profile, ActorId::new()).await.unwrap() });

    c.bench_function("profile/record_field_update", |b| {
        b.iter(|| {
            rt.block_on(async {
                recorder
                    .record_field_update(
                        profile.id(),
                        ActorId::new(),
                        ProfileField::DisplayName,
                        None,
                        Some("Renamed".to_string()),
                    )
                    .await
                    .unwrap();
            });
        });
    });
}

fn bench_replay_full_log(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = InMemoryEventStore::new();
    let profile_id = seed_log(&rt, &store, 500);
    let service = ReplayService::new(store);

    c.bench_function("profile/replay_500_events_no_snapshot", |b| {
        b.iter(|| {
            rt.block_on(async {
                service.replay_events(profile_id).await.unwrap();
            });
        });
    });
}

fn bench_replay_from_snapshot(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = InMemoryEventStore::new();
    let profile_id = seed_log(&rt, &store, 490);
    let service = ReplayService::with_policy(store.clone(), SnapshotPolicy::every(100));

    // Snapshot at 491, then a short tail up to 500.
    rt.block_on(async {
        assert!(
            service
                .create_snapshot_if_needed(profile_id, ActorId::system())
                .await
                .unwrap()
        );
        for v in 492..=500 {
            store.append_event(renamed(profile_id, v)).await.unwrap();
        }
    });

    c.bench_function("profile/replay_500_events_from_snapshot", |b| {
        b.iter(|| {
            rt.block_on(async {
                service.replay_events(profile_id).await.unwrap();
            });
        });
    });
}

fn bench_point_in_time(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = InMemoryEventStore::new();
    let profile_id = seed_log(&rt, &store, 500);
    let service = ProfileService::new(store);
    let as_of = chrono::Utc::now();

    c.bench_function("profile/replay_500_events_at_time", |b| {
        b.iter(|| {
            rt.block_on(async {
                service.get_profile_at(profile_id, as_of).await.unwrap();
            });
        });
    });
}

criterion_group!(
    benches,
    bench_record_field_update,
    bench_replay_full_log,
    bench_replay_from_snapshot,
    bench_point_in_time,
);
criterion_main!(benches);
