//! Hot-path microbenchmarks: one buffer checkout/release and one
//! registry delivery happen per request, so both sit on the per-request
//! critical path.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use evpoll_core::ConnId;
use evpoll_reactor::{BufferPool, PendingWriteRegistry};

fn bench_buffer_pool(c: &mut Criterion) {
    let plain = BufferPool::new(8192, false);
    c.bench_function("pool_checkout_release", |b| {
        b.iter(|| {
            let buf = plain.checkout();
            plain.release(black_box(buf));
        })
    });

    let secure = BufferPool::new(8192, true);
    c.bench_function("pool_checkout_release_secure", |b| {
        b.iter(|| {
            let buf = secure.checkout();
            secure.release(black_box(buf));
        })
    });
}

fn bench_registry(c: &mut Criterion) {
    let registry = PendingWriteRegistry::new();
    let id = ConnId::new(42);
    let payload = vec![0u8; 512];

    c.bench_function("registry_add_submit", |b| {
        b.iter(|| {
            registry.add(id, payload.clone());
            black_box(registry.submit(id));
            registry.take_armed();
        })
    });
}

criterion_group!(benches, bench_buffer_pool, bench_registry);
criterion_main!(benches);
