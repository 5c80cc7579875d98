use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use relay_core::geom::point;
use relay_core::test_utils::node_chain;
use relay_core::Circuit;

/// Alternating inverter/node run: `gates` stages of combinational depth.
fn inverter_chain(gates: i32) -> Circuit {
    let mut circ = Circuit::new("bench");
    for k in 0..gates {
        circ.place_inverter(point(2 * k, 0)).unwrap();
        circ.place_node(point(2 * k + 1, 0)).unwrap();
    }
    circ
}

fn bench_settle(c: &mut Criterion) {
    let mut group = c.benchmark_group("settle");
    for gates in [16, 128, 1024] {
        group.bench_function(format!("inverter_chain_{gates}"), |b| {
            b.iter_batched(
                || inverter_chain(gates),
                |mut circ| {
                    circ.settle(4096).expect("chain failed to settle");
                    circ
                },
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

fn bench_steady_tic(c: &mut Criterion) {
    let mut circ = inverter_chain(256);
    circ.settle(4096).expect("chain failed to settle");
    let head = circ
        .find_at(point(1, 0), relay_core::TypeMask::NODE)
        .expect("head node missing");

    c.bench_function("tic_after_single_dirty", |b| {
        b.iter(|| {
            circ.mark_dirty(head);
            circ.run_tic();
        });
    });
}

fn bench_batch_flood(c: &mut Criterion) {
    let mut circ = Circuit::new("bench");
    let nodes = node_chain(&mut circ, point(0, 0), 512, 2);
    circ.settle(64).expect("batch failed to settle");
    let head = nodes[0];

    c.bench_function("flood_512_node_batch", |b| {
        b.iter(|| {
            circ.mark_dirty(head);
            circ.run_tic();
        });
    });
}

criterion_group!(benches, bench_settle, bench_steady_tic, bench_batch_flood);
criterion_main!(benches);
