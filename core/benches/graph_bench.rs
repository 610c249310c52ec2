use criterion::{criterion_group, criterion_main, Criterion};
use recommender::{CooccurrenceGraph, Ownership};

fn synthetic_ownership(users: usize, items_per_user: usize, catalog: usize) -> Ownership {
    let mut own = Ownership::new();
    for u in 0..users {
        for k in 0..items_per_user {
            own.add(format!("user{u}"), format!("{}", (u * 31 + k * 17) % catalog));
        }
    }
    own
}

fn bench_build_graph(c: &mut Criterion) {
    let own = synthetic_ownership(2_000, 25, 5_000);
    c.bench_function("build_cooccurrence_graph", |b| b.iter(|| CooccurrenceGraph::build(&own)));
}

criterion_group!(benches, bench_build_graph);
criterion_main!(benches);
