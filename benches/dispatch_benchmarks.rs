//! Benchmarks for event hub dispatch
//!
//! Measures registration, dispatch fan-out and parent propagation overhead.

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;

use eventable::prelude::*;

fn quiet_hub() -> EventHub {
    EventHub::builder().enable_logging(false).build()
}

fn bench_registration(c: &mut Criterion) {
    let mut group = c.benchmark_group("registration");

    group.bench_function("on_single_type", |b| {
        let handler = Handler::new(|_, _| {});
        b.iter(|| {
            let hub = quiet_hub();
            hub.on("click", &handler);
            black_box(hub)
        })
    });

    group.bench_function("on_five_types", |b| {
        let handler = Handler::new(|_, _| {});
        b.iter(|| {
            let hub = quiet_hub();
            hub.on("click dblclick mousedown mouseup move", &handler);
            black_box(hub)
        })
    });

    group.finish();
}

fn bench_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch");

    for listeners in [1usize, 10, 100] {
        let hub = quiet_hub();
        for _ in 0..listeners {
            hub.on("tick", &Handler::new(|_, event| {
                black_box(event.event_type());
            }));
        }

        group.throughput(Throughput::Elements(listeners as u64));
        group.bench_with_input(BenchmarkId::new("listeners", listeners), &hub, |b, hub| {
            b.iter(|| {
                hub.dispatch(black_box("tick"));
            })
        });
    }

    let hub = quiet_hub();
    group.bench_function("no_listeners", |b| {
        b.iter(|| {
            hub.dispatch(black_box("tick"));
        })
    });

    let hub = quiet_hub();
    hub.on("move", &Handler::new(|_, event| {
        black_box(event.get("x"));
    }));
    group.bench_function("with_payload", |b| {
        b.iter(|| {
            hub.dispatch_with("move", EventInit::new().field("x", 10).field("y", 20));
        })
    });

    group.finish();
}

fn bench_propagation(c: &mut Criterion) {
    let mut group = c.benchmark_group("propagation");

    for depth in [1usize, 4, 16] {
        let hubs: Vec<EventHub> = (0..=depth).map(|_| quiet_hub()).collect();
        for pair in hubs.windows(2) {
            pair[0].add_event_parent(&pair[1]);
        }
        hubs[depth].on("click", &Handler::new(|_, _| {}));

        group.bench_with_input(BenchmarkId::new("depth", depth), &hubs, |b, hubs| {
            b.iter(|| {
                hubs[0].dispatch(black_box("click"));
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_registration, bench_dispatch, bench_propagation);
criterion_main!(benches);
