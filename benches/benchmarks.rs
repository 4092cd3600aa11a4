//! Benchmarks for the HDC reference model.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use hdc_golden::{
    Accumulator, Ca90, Ca90Mode, Domain, Hypervector, ImMode, ItemMemoryBuilder, NgramEncoder, Overflow,
    Primitives, QuantScheme, Quantizer, Similarity,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

const DIM: usize = 4096;

fn random_pair() -> (Hypervector, Hypervector) {
    let im = ItemMemoryBuilder::new(DIM)
        .build_orthogonal_im(2, ImMode::Random, &[1], 2)
        .unwrap();
    (im.get(0).unwrap().clone(), im.get(1).unwrap().clone())
}

fn benchmark_ca90(c: &mut Criterion) {
    let seed = Hypervector::from_seed(0x9E37_79B9, 32).unwrap();

    c.bench_function("ca90_hierarchical_expand", |b| {
        b.iter(|| Ca90::hierarchical_expand(black_box(&seed), DIM, 1))
    });
    c.bench_function("ca90_iterative_expand", |b| {
        b.iter(|| Ca90::iterative_expand(black_box(&seed), DIM))
    });
}

fn benchmark_seed_search(c: &mut Criterion) {
    c.bench_function("seed_search_1024", |b| {
        b.iter(|| {
            let mut rng = ChaCha8Rng::seed_from_u64(7);
            Ca90::seed_search(32, 1, 1024, Ca90Mode::Hierarchical, 1_000_000, &mut rng)
        })
    });
}

fn benchmark_bind(c: &mut Criterion) {
    let (a, b) = random_pair();
    c.bench_function("bind", |bench| {
        bench.iter(|| Primitives::bind(black_box(&a), black_box(&b), Domain::Binary))
    });
}

fn benchmark_permute(c: &mut Criterion) {
    let (a, _) = random_pair();
    c.bench_function("permute", |b| b.iter(|| Primitives::permute(black_box(&a), 17)));
}

fn benchmark_similarity(c: &mut Criterion) {
    let (a, b) = random_pair();
    let (ba, bb) = (a.to_bipolar(), b.to_bipolar());

    c.bench_function("hamming", |bench| {
        bench.iter(|| Similarity::hamming(black_box(&a), black_box(&b)))
    });
    c.bench_function("cosine", |bench| {
        bench.iter(|| Similarity::cosine(black_box(&ba), black_box(&bb)))
    });
}

fn benchmark_accumulator(c: &mut Criterion) {
    let im = ItemMemoryBuilder::new(DIM)
        .build_orthogonal_im(100, ImMode::Random, &[3], 100)
        .unwrap();

    c.bench_function("accumulate_100", |b| {
        b.iter(|| {
            let mut acc = Accumulator::new(DIM);
            for v in im.iter() {
                acc.add(v).unwrap();
            }
            acc.binarize(Domain::Binary)
        })
    });
}

fn benchmark_quantize(c: &mut Criterion) {
    let sums: Vec<f64> = (0..DIM).map(|i| (i % 201) as f64).collect();
    let int8 = Quantizer::new(QuantScheme::Int8, Overflow::Sat);
    let fp8 = Quantizer::new(QuantScheme::Fp8E4M3, Overflow::Sat);

    c.bench_function("quantize_int8", |b| {
        b.iter(|| int8.quantize(black_box(&sums), 100.0, Domain::Binary, false))
    });
    c.bench_function("quantize_fp8_e4m3", |b| {
        b.iter(|| fp8.quantize(black_box(&sums), 100.0, Domain::Binary, false))
    });
}

fn benchmark_ngram_encode(c: &mut Criterion) {
    use hdc_golden::EncodingPipeline;

    let im = ItemMemoryBuilder::new(DIM)
        .build_orthogonal_im(27, ImMode::Random, &[5], 27)
        .unwrap();
    let encoder = NgramEncoder::new(3, NgramEncoder::latin_alphabet());
    let pipeline = EncodingPipeline::default();
    let line = "the quick brown fox jumps over the lazy dog";

    c.bench_function("ngram_encode", |b| {
        b.iter(|| pipeline.encode(&encoder, black_box(line), &im, None))
    });
}

criterion_group!(
    benches,
    benchmark_ca90,
    benchmark_seed_search,
    benchmark_bind,
    benchmark_permute,
    benchmark_similarity,
    benchmark_accumulator,
    benchmark_quantize,
    benchmark_ngram_encode,
);
criterion_main!(benches);
