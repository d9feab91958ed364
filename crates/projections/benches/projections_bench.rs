use common::{ShipmentId, UserId};
use criterion::{Criterion, criterion_group, criterion_main};
use domain::{ShippingEvent, SystemEvent, User, UnitOfWork, UserEvent};
use event_store::{Commit, EventStore, InMemoryEventStore};
use projections::{Projection, ShipmentLedger, UserIndex, stage_projections};

fn bench_project_shipping_created(c: &mut Criterion) {
    let ledger = ShipmentLedger::new(InMemoryEventStore::new());
    let event = SystemEvent::Shipping(ShippingEvent::created(
        ShipmentId::new(),
        UserId::new(),
        UserId::new(),
    ));

    c.bench_function("projections/project_shipping_created", |b| {
        b.iter(|| ledger.project(&event));
    });
}

fn bench_stage_user_created(c: &mut Criterion) {
    let store = InMemoryEventStore::new();
    let index = UserIndex::new(store.clone());
    let ledger = ShipmentLedger::new(store);

    c.bench_function("projections/stage_user_created", |b| {
        b.iter(|| {
            let mut unit = UnitOfWork::new();
            let mut user = User::default();
            unit.record(
                &mut user,
                vec![UserEvent::created(UserId::new(), "Julian", "a@b.c")],
            )
            .unwrap();
            stage_projections(&[&index as &dyn Projection, &ledger], &mut unit).unwrap();
            unit
        });
    });
}

fn bench_sent_by_over_1000_shipments(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = InMemoryEventStore::new();
    let ledger = ShipmentLedger::new(store.clone());
    let user = UserId::new();

    rt.block_on(async {
        let records = (0..1000)
            .flat_map(|i| {
                let sender = if i % 100 == 0 { user } else { UserId::new() };
                ledger.project(&SystemEvent::Shipping(ShippingEvent::created(
                    ShipmentId::new(),
                    sender,
                    UserId::new(),
                )))
            })
            .collect();
        store
            .commit(Commit {
                records,
                ..Commit::default()
            })
            .await
            .unwrap();
    });

    c.bench_function("projections/sent_by_1000_shipments", |b| {
        b.iter(|| {
            rt.block_on(async {
                let sent = ledger.sent_by(user).await.unwrap();
                assert_eq!(sent.len(), 10);
            });
        });
    });
}

criterion_group!(
    benches,
    bench_project_shipping_created,
    bench_stage_user_created,
    bench_sent_by_over_1000_shipments,
);
criterion_main!(benches);
