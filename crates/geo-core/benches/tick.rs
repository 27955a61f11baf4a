use criterion::{Criterion, black_box, criterion_group, criterion_main};

use geo_core::sim::{Outcome, SimulatedDevice, SimulatedResolver};
use geo_core::{
    LocalizationStateMachine, MemoryStore, NullObserver, PlacementIntent, ResolverStatus,
    SessionConfig, TickInput,
};

fn bench_tick(c: &mut Criterion) {
    c.bench_function("tick_localized_idle", |b| {
        let mut machine =
            LocalizationStateMachine::new(SessionConfig::default(), MemoryStore::new());
        let mut device = SimulatedDevice::localized();
        let mut resolver = SimulatedResolver::default();
        let mut observer = NullObserver;
        let input = TickInput {
            dt: 1.0 / 60.0,
            now_unix_secs: 1_771_632_000,
            intent: None,
        };
        b.iter(|| {
            machine.tick(black_box(&input), &mut device, &mut resolver, &mut observer);
        });
    });

    c.bench_function("tick_with_pending_anchors", |b| {
        let mut machine =
            LocalizationStateMachine::new(SessionConfig::default(), MemoryStore::new());
        let mut device = SimulatedDevice::localized();
        let mut resolver =
            SimulatedResolver::with_outcome(Outcome::after(u32::MAX, ResolverStatus::Success));
        let mut observer = NullObserver;
        for _ in 0..5 {
            let input = TickInput {
                dt: 0.1,
                now_unix_secs: 1_771_632_000,
                intent: Some(PlacementIntent::AtCamera),
            };
            machine.tick(&input, &mut device, &mut resolver, &mut observer);
        }
        let input = TickInput {
            dt: 0.1,
            now_unix_secs: 1_771_632_000,
            intent: None,
        };
        b.iter(|| {
            machine.tick(black_box(&input), &mut device, &mut resolver, &mut observer);
        });
    });
}

criterion_group!(benches, bench_tick);
criterion_main!(benches);
