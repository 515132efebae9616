use beanwire::*;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::{Arc, Mutex, Weak};

// ===== Micro Benchmarks =====

fn bench_singleton_hit(c: &mut Criterion) {
    let mut unit = BuildUnit::new();
    unit.add_singleton_fn("answer", vec![], |_| Ok(42u64)).unwrap();
    let ctx = unit.build().bean_context();

    // Prime the singleton
    let _ = ctx.get("answer").unwrap();

    c.bench_function("singleton_hit_u64", |b| {
        b.iter(|| {
            let v = ctx.get_as::<u64>("answer").unwrap();
            black_box(v);
        })
    });
}

fn bench_singleton_cold(c: &mut Criterion) {
    struct ExpensiveToCreate {
        data: Vec<u64>,
    }

    c.bench_function("singleton_cold_expensive", |b| {
        b.iter_batched(
            || {
                let mut unit = BuildUnit::new();
                unit.add_singleton_fn("expensive", vec![], |_| {
                    Ok(ExpensiveToCreate {
                        data: (0..1000).collect(),
                    })
                })
                .unwrap();
                unit.build()
            },
            |result| {
                let v = result.bean_context().get_as::<ExpensiveToCreate>("expensive").unwrap();
                black_box(v.data.len());
            },
            criterion::BatchSize::SmallInput,
        )
    });
}

fn bench_singleton_vs_factory(c: &mut Criterion) {
    struct Payload {
        data: [u8; 64],
    }

    let mut group = c.benchmark_group("singleton_vs_factory");

    let mut unit = BuildUnit::new();
    unit.add_singleton_fn("shared", vec![], |_| Ok(Payload { data: [0; 64] }))
        .unwrap();
    unit.add_factory_fn("fresh", vec![], |_| Ok(Payload { data: [0; 64] }))
        .unwrap();
    let ctx = unit.build().bean_context();
    let _ = ctx.get("shared").unwrap();

    group.bench_function("singleton", |b| {
        b.iter(|| {
            let v = ctx.get_as::<Payload>("shared").unwrap();
            black_box(&v.data);
        })
    });

    group.bench_function("factory", |b| {
        b.iter(|| {
            let v = ctx.get_as::<Payload>("fresh").unwrap();
            black_box(&v.data);
        })
    });

    group.finish();
}

fn bench_name_vs_type_lookup(c: &mut Criterion) {
    struct Service(u64);

    let mut group = c.benchmark_group("lookup");
    let mut unit = BuildUnit::new();
    unit.add_singleton_fn("service", vec![], |_| Ok(Service(1))).unwrap();
    let ctx = unit.build().bean_context();
    let _ = ctx.get("service").unwrap();

    group.bench_function("by_name", |b| {
        b.iter(|| black_box(ctx.get_as::<Service>("service").unwrap().0))
    });
    group.bench_function("by_type", |b| {
        b.iter(|| black_box(ctx.get_by_type::<Service>().unwrap().0))
    });

    group.finish();
}

fn bench_list_literal_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("list_literal");

    for &count in &[1usize, 8, 64] {
        let mut unit = BuildUnit::new();
        let elements = (0..count).map(|i| Dependency::value(i as u32)).collect();
        unit.add_recipe(None, "list", Recipe::list(elements).scope(Scope::Factory).build())
            .unwrap();
        let ctx = unit.build().bean_context();

        group.bench_with_input(BenchmarkId::new("factory_list", count), &count, |b, _| {
            b.iter(|| {
                let list = ctx.get_as::<Vec<Bean>>("list").unwrap();
                black_box(list.len());
            })
        });
    }

    group.finish();
}

fn bench_chain_depth(c: &mut Criterion) {
    let mut group = c.benchmark_group("chain_depth");

    for &depth in &[8usize, 64] {
        let mut unit = BuildUnit::new();
        unit.add_singleton("n0", 0u64).unwrap();
        for i in 1..depth {
            unit.add_recipe(
                None,
                format!("n{}", i),
                Recipe::from_fn(vec![Dependency::name(format!("n{}", i - 1))], |args| {
                    Ok(args.value::<u64>(0)? + 1)
                })
                .scope(Scope::Factory)
                .build(),
            )
            .unwrap();
        }
        let ctx = unit.build().bean_context();
        let top = format!("n{}", depth - 1);

        group.bench_with_input(BenchmarkId::new("factory_chain", depth), &depth, |b, _| {
            b.iter(|| black_box(*ctx.get_as::<u64>(&top).unwrap()))
        });
    }

    group.finish();
}

#[derive(Default)]
struct Node {
    peer: Mutex<Weak<Node>>,
}

fn bench_cyclic_pair(c: &mut Criterion) {
    let registry = Arc::new(TypeRegistry::new());
    registry.register(
        BeanClass::builder::<Node>("Node")
            .constructor(&[], |_| Ok(Node::default()))
            .property::<Node, _>("peer", |this, peer| {
                *this.peer.lock().unwrap() = Arc::downgrade(&peer);
                Ok(())
            })
            .build(),
    );

    c.bench_function("cyclic_singleton_pair_cold", |b| {
        b.iter_batched(
            || {
                let mut unit = BuildUnit::new();
                unit.with_type_loader(registry.clone());
                for (name, peer) in [("left", "right"), ("right", "left")] {
                    unit.add_recipe(
                        None,
                        name,
                        Recipe::constructor("Node", vec![])
                            .set_property("peer", Dependency::name(peer))
                            .build(),
                    )
                    .unwrap();
                }
                unit.build()
            },
            |result| {
                let left = result.bean_context().get_as::<Node>("left").unwrap();
                black_box(left.peer.lock().unwrap().upgrade().is_some());
            },
            criterion::BatchSize::SmallInput,
        )
    });
}

fn bench_contention(c: &mut Criterion) {
    let mut group = c.benchmark_group("contention");

    let mut unit = BuildUnit::new();
    unit.add_singleton_fn("answer", vec![], |_| Ok(42u64)).unwrap();
    let ctx = unit.build().bean_context();
    let _ = ctx.get("answer").unwrap();

    for &thread_count in &[1, 2, 4, 8] {
        group.bench_with_input(
            BenchmarkId::new("singleton_threads", thread_count),
            &thread_count,
            |b, &threads| {
                b.iter_custom(|iters| {
                    let start = std::time::Instant::now();
                    crossbeam_utils::thread::scope(|s| {
                        for _ in 0..threads {
                            let ctx = &ctx;
                            s.spawn(move |_| {
                                for _ in 0..iters / threads as u64 {
                                    let v = ctx.get_as::<u64>("answer").unwrap();
                                    black_box(v);
                                }
                            });
                        }
                    })
                    .unwrap();
                    start.elapsed()
                })
            },
        );
    }

    group.finish();
}

// ===== Macro Benchmarks =====

fn bench_release(c: &mut Criterion) {
    let mut group = c.benchmark_group("release");

    for &count in &[10usize, 100] {
        group.bench_with_input(BenchmarkId::new("shutdown_sweep", count), &count, |b, &count| {
            b.iter_batched(
                || {
                    let mut unit = BuildUnit::new();
                    for i in 0..count {
                        unit.add_recipe(
                            None,
                            format!("s{}", i),
                            Recipe::from_fn(vec![], move |_| Ok(i))
                                .shutdown(Shutdown::handler(|_| Ok(())))
                                .build(),
                        )
                        .unwrap();
                    }
                    let result = unit.build();
                    let ctx = result.bean_context();
                    for i in 0..count {
                        ctx.get(&format!("s{}", i)).unwrap();
                    }
                    result
                },
                |result| black_box(result.release().is_ok()),
                criterion::BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

criterion_group!(
    micro_benches,
    bench_singleton_hit,
    bench_singleton_cold,
    bench_singleton_vs_factory,
    bench_name_vs_type_lookup,
    bench_list_literal_scaling,
    bench_chain_depth,
    bench_cyclic_pair,
    bench_contention
);

criterion_group!(macro_benches, bench_release);

criterion_main!(micro_benches, macro_benches);
