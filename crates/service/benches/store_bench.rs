use criterion::{criterion_group, criterion_main, Criterion};

use service::StoreRegistry;

fn bench_set_get(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let registry = rt.block_on(async { StoreRegistry::<u64, u64>::new() });
    let store = registry.default_store().unwrap();

    c.bench_function("store_set_then_get", |b| {
        let mut i = 0u64;
        b.to_async(&rt).iter(|| {
            i += 1;
            let store = store.clone();
            let key = i % 1024;
            async move {
                store.set(key, key);
                store.get(key).await.unwrap()
            }
        });
    });

    c.bench_function("store_get_hit", |b| {
        b.to_async(&rt).iter(|| {
            let store = store.clone();
            async move { store.get(7).await.unwrap() }
        });
    });
}

criterion_group!(benches, bench_set_get);
criterion_main!(benches);
