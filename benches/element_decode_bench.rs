use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

use mesh_partio::io::assemble::{PartitionPayload, assemble};
use mesh_partio::io::element_record::decode_elements;
use mesh_partio::io::{NodeRecord, PartitionHeader};
use mesh_partio::topology::DefaultElementTypes;

const TETRAHEDRON: i64 = 5;

/// A strip of `n` tetrahedra over `n + 3` nodes.
fn tet_strip(n: usize) -> (Vec<NodeRecord>, Vec<i64>) {
    let nodes = (0..n + 3)
        .map(|i| NodeRecord::new(i as u64, [i as f64, (i % 2) as f64, (i % 3) as f64]))
        .collect();
    let ints = (0..n as i64)
        .flat_map(|e| [1, TETRAHEDRON, e, e + 1, e + 2, e + 3])
        .collect();
    (nodes, ints)
}

fn bench_element_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("element_decode");

    for &n in &[1_000usize, 100_000] {
        let (nodes, ints) = tet_strip(n);
        group.bench_with_input(BenchmarkId::new("decode", n), &n, |b, &n| {
            b.iter(|| decode_elements(black_box(&ints), n, &DefaultElementTypes).unwrap())
        });

        let count = nodes.len() as i64;
        let payload = PartitionPayload {
            header: PartitionHeader {
                nodes: count,
                base_nodes: count,
                regular_elements: n as i64,
                ghost_elements: 0,
                active_base_nodes: count,
                active_nodes: count,
                global_base_nodes: count,
                global_nodes: count,
                offset: [0; 5],
                extra_flag: -1,
            },
            nodes,
            regular_elements: ints,
            ghost_elements: Vec::new(),
        };
        group.bench_with_input(BenchmarkId::new("assemble", n), &n, |b, _| {
            b.iter(|| assemble("strip", black_box(payload.clone()), &DefaultElementTypes).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_element_decode);
criterion_main!(benches);
