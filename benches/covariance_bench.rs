use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use numkernel::covariance::{self, CovarianceInput};
use numkernel::moments::{self, MomentsInput};
use numkernel::prelude::*;
use rand::prelude::*;
use rand_distr::Normal;

/// Generate a normal `rows x cols` table
fn generate_table(rows: usize, cols: usize, seed: u64) -> DenseTable<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let normal = Normal::new(100.0, 15.0).unwrap();
    let data = (0..rows * cols).map(|_| normal.sample(&mut rng)).collect();
    DenseTable::from_vec(rows, cols, data).unwrap()
}

fn bench_covariance_levels(c: &mut Criterion) {
    let mut group = c.benchmark_group("covariance_dense");
    let builder = numkernel::registry_builder();
    let baseline = builder.build(CpuType::Baseline);
    let best = numkernel::dispatcher();

    for &(rows, cols) in &[(1_000, 8), (10_000, 16), (50_000, 32)] {
        let table = generate_table(rows, cols, 42);
        group.throughput(Throughput::Elements((rows * cols) as u64));

        for (label, registry) in [("baseline", &baseline), (best.cpu().name(), best)] {
            let mut batch = registry
                .batch::<f64>(covariance::ALGORITHM, covariance::method::DENSE)
                .unwrap();
            batch.set_input(CovarianceInput::Data, table.clone());
            group.bench_with_input(
                BenchmarkId::new(label, format!("{rows}x{cols}")),
                &(),
                |b, _| b.iter(|| black_box(batch.compute()).unwrap()),
            );
        }
    }

    group.finish();
}

fn bench_online_increments(c: &mut Criterion) {
    let mut group = c.benchmark_group("moments_online");
    let table = generate_table(20_000, 16, 7);

    for &blocks in &[1usize, 10, 100] {
        let block_rows = table.rows() / blocks;
        let parts: Vec<DenseTable<f64>> = table
            .as_slice()
            .chunks(block_rows * table.cols())
            .map(|chunk| DenseTable::from_vec(chunk.len() / table.cols(), table.cols(), chunk.to_vec()).unwrap())
            .collect();

        group.bench_with_input(BenchmarkId::new("blocks", blocks), &parts, |b, parts| {
            b.iter(|| {
                let mut online = numkernel::dispatcher()
                    .online::<f64>(moments::ALGORITHM, moments::method::DENSE)
                    .unwrap();
                for part in parts {
                    online.set_input(MomentsInput::Data, part.clone());
                    online.compute().unwrap();
                }
                online.finalize_compute().unwrap();
                black_box(online.result().is_valid())
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_covariance_levels, bench_online_increments);
criterion_main!(benches);
