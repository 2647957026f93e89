use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use raftscope::align::{align, AlignOptions, AxisBasis, Normalization};
use raftscope::axis::build_axis;
use raftscope::demo::{demo_program, synthetic_samples};
use raftscope::render::decimate;
use raftscope::{ChannelTrace, SourceId, TraceMetadata};
use raftscope::container::{ContainerFormat, ReadoutMode};

fn trace(name: &str, samples: Vec<f64>) -> ChannelTrace {
    ChannelTrace {
        source: SourceId::new(format!("{}.fits", name), 0),
        samples,
        channel: 0,
        ccd: None,
        metadata: TraceMetadata {
            format: ContainerFormat::Fits,
            readout_mode: ReadoutMode::Scan,
            sample_period_ns: Some(10.0),
            sequence_name: None,
            date_obs: None,
        },
    }
}

/// Benchmark reconstructing the time axis of one trace
fn bench_build_axis(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_axis");
    let program = demo_program(300).unwrap();

    for cycles in [100usize, 1_000, 10_000] {
        let len = cycles * program.total_ticks() as usize;
        group.throughput(Throughput::Elements(len as u64));
        group.bench_with_input(BenchmarkId::from_parameter(format!("{}cycles", cycles)), &len, |b, &len| {
            b.iter(|| black_box(build_axis(&program, len)))
        });
    }

    group.finish();
}

/// Benchmark aligning two acquisitions taken with different sequences
fn bench_align_pair(c: &mut Criterion) {
    let mut group = c.benchmark_group("align_pair");
    let short = Arc::new(demo_program(300).unwrap());
    let long = Arc::new(demo_program(500).unwrap());

    for cycles in [100usize, 1_000, 5_000] {
        let a: Vec<f64> = synthetic_samples(&short, cycles * short.total_ticks() as usize, 0, 1)
            .into_iter()
            .map(f64::from)
            .collect();
        let b: Vec<f64> = synthetic_samples(&long, (cycles - 10) * long.total_ticks() as usize, 0, 2)
            .into_iter()
            .map(f64::from)
            .collect();
        group.throughput(Throughput::Elements((a.len() + b.len()) as u64));

        let options = AlignOptions::with_normalization(Normalization::Standardize);
        group.bench_with_input(BenchmarkId::from_parameter(format!("{}cycles", cycles)), &cycles, |bench, _| {
            bench.iter(|| {
                let set = align(
                    vec![trace("a", a.clone()), trace("b", b.clone())],
                    AxisBasis::PerTraceSequence(vec![Arc::clone(&short), Arc::clone(&long)]),
                    &options,
                )
                .unwrap();
                black_box(set)
            })
        });
    }

    group.finish();
}

/// Benchmark min/max decimation of a long series
fn bench_decimate(c: &mut Criterion) {
    let mut group = c.benchmark_group("decimate");

    for len in [100_000usize, 1_000_000] {
        let points: Vec<(f64, f64)> = (0..len).map(|i| (i as f64, ((i * 31) % 977) as f64)).collect();
        group.throughput(Throughput::Elements(len as u64));
        group.bench_with_input(BenchmarkId::from_parameter(len), &points, |b, points| {
            b.iter(|| black_box(decimate(points, 20_000)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_build_axis, bench_align_pair, bench_decimate);
criterion_main!(benches);
