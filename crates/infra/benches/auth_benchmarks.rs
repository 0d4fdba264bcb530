use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use quill_auth::{authorize_named, is_authorized, ProfileUpdate, Role};
use quill_infra::{
    ActionResult, AuthActions, InMemoryIdentityProvider, InMemoryProfileStore, LoggingInvalidator,
};

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

fn setup() -> AuthActions {
    AuthActions::new(
        Arc::new(InMemoryIdentityProvider::new()),
        Arc::new(InMemoryProfileStore::new()),
        Arc::new(LoggingInvalidator),
        "http://localhost:3000",
    )
}

fn bench_role_policy(c: &mut Criterion) {
    let mut group = c.benchmark_group("role_policy");
    group.throughput(Throughput::Elements(9));

    group.bench_function("typed_all_pairs", |b| {
        b.iter(|| {
            for subject in Role::ALL {
                for required in Role::ALL {
                    black_box(is_authorized(black_box(subject), black_box(required)));
                }
            }
        });
    });

    group.bench_function("named_all_pairs", |b| {
        b.iter(|| {
            for subject in ["ADMIN", "editor", "Author"] {
                for required in ["AUTHOR", "EDITOR", "ADMIN"] {
                    let _ = black_box(authorize_named(black_box(subject), black_box(required)));
                }
            }
        });
    });

    group.finish();
}

fn bench_coordinator_latency(c: &mut Criterion) {
    let mut group = c.benchmark_group("coordinator_latency");
    let rt = runtime();

    group.bench_function("register_fresh", |b| {
        let actions = setup();
        let counter = AtomicU64::new(0);
        b.iter(|| {
            let n = counter.fetch_add(1, Ordering::Relaxed);
            let email = format!("user{n}@example.com");
            let result = rt.block_on(actions.register(&email, "hunter22", None));
            assert_eq!(result, ActionResult::Success);
        });
    });

    group.bench_function("login", |b| {
        let actions = setup();
        rt.block_on(actions.register("ada@example.com", "hunter22", None));
        b.iter(|| {
            black_box(rt.block_on(actions.login("ada@example.com", "hunter22")));
        });
    });

    group.bench_function("current_user", |b| {
        let actions = setup();
        rt.block_on(actions.register("ada@example.com", "hunter22", None));
        let token = match rt.block_on(actions.login("ada@example.com", "hunter22")) {
            ActionResult::Redirect {
                session: Some(session),
                ..
            } => session.access_token,
            other => panic!("login failed: {other:?}"),
        };
        b.iter(|| {
            black_box(rt.block_on(actions.current_user(Some(&token))).unwrap());
        });
    });

    group.finish();
}

fn bench_profile_updates(c: &mut Criterion) {
    let mut group = c.benchmark_group("profile_update");
    let rt = runtime();

    for (label, update) in [
        ("name_only", ProfileUpdate::default().name("Grace")),
        ("empty", ProfileUpdate::default()),
    ] {
        group.bench_with_input(BenchmarkId::new("update", label), &update, |b, update| {
            let actions = setup();
            let registration = actions.register_detailed("bob@example.com", "hunter22", None);
            let id = match rt.block_on(registration) {
                quill_infra::RegistrationOutcome::Complete(profile) => profile.id,
                other => panic!("registration failed: {other:?}"),
            };
            b.iter(|| {
                black_box(rt.block_on(actions.update_profile(&id, update.clone())).unwrap());
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_role_policy,
    bench_coordinator_latency,
    bench_profile_updates
);
criterion_main!(benches);
