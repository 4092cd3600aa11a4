//! End-to-end golden-model scenarios.

use hdc_golden::persist::{fingerprint, load_am, save_am};
use hdc_golden::{
    Accumulator, AssociativeMemory, Ca90, ContinuousItemMemory, Domain, Encoded, EncodingPipeline, Hdc, HdcConfig,
    Hypervector, ImMode, ItemMemory, ItemMemoryBuilder, NgramEncoder, Overflow, PermuteOrder, QuantScheme, Quantizer,
    Result, Similarity,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

#[test]
fn test_hierarchical_expansion_256() {
    let seed = Hypervector::from_seed(0b1100_0011_0101_1010_1111_0000_1001_0110, 32).unwrap();

    let a = Ca90::hierarchical_expand(&seed, 256, 1).unwrap();
    let b = Ca90::hierarchical_expand(&seed, 256, 1).unwrap();

    assert_eq!(a.dimensions(), 256);
    assert!(a.data().iter().all(|&x| x == 0 || x == 1));
    assert_eq!(a, b, "Expansion must be deterministic");
}

#[test]
fn test_square_cim_256() {
    let cim = ItemMemoryBuilder::new(256).build_square_cim(0x8BAD_F00D).unwrap();
    assert_eq!(cim.num_levels(), 128);

    for i in 1..128 {
        let d = Similarity::hamming_distance(cim.get(i - 1).unwrap(), cim.get(i).unwrap()).unwrap();
        assert_eq!(d, 1, "Levels {} and {} differ in {} positions", i - 1, i, d);
    }

    let ends = Similarity::hamming_distance(cim.get(0).unwrap(), cim.get(127).unwrap()).unwrap();
    assert_eq!(ends, 127);

    // Similarity to level 0 never increases with level
    let base = cim.get(0).unwrap();
    let sims: Vec<f64> = cim
        .levels()
        .iter()
        .map(|l| Similarity::hamming(base, l).unwrap())
        .collect();
    assert!(sims.windows(2).all(|w| w[1] <= w[0]));
}

#[test]
fn test_disjoint_classes_perfect_accuracy() {
    init_tracing();
    let im = ItemMemoryBuilder::new(256)
        .build_orthogonal_im(2, ImMode::Random, &[11], 2)
        .unwrap();

    // Each sample is exactly one item memory vector
    let encoder = |s: &usize, im: &ItemMemory, _: Option<&ContinuousItemMemory>, _: Domain, acc: &mut Accumulator| -> Result<()> {
        acc.add(im.get(*s)?)
    };
    let data = vec![vec![0usize, 0, 0], vec![1usize, 1]];

    let mut am = AssociativeMemory::new(EncodingPipeline::default());
    am.train(&data, &encoder, &im, None).unwrap();

    let eval = am.evaluate(&data, &encoder, &im, None).unwrap();
    assert_eq!(eval.correct, vec![3, 2]);
    assert_eq!(eval.accuracy(), 1.0);
}

#[test]
fn test_bipolar_disjoint_classes() {
    let im = ItemMemoryBuilder::new(256)
        .with_domain(Domain::Bipolar)
        .build_orthogonal_im(2, ImMode::Random, &[11], 2)
        .unwrap();
    let encoder = |s: &usize, im: &ItemMemory, _: Option<&ContinuousItemMemory>, _: Domain, acc: &mut Accumulator| -> Result<()> {
        acc.add(im.get(*s)?)
    };
    let data = vec![vec![0usize, 0, 0], vec![1usize, 1]];

    let mut am = AssociativeMemory::new(EncodingPipeline::new(Domain::Bipolar, Quantizer::default()));
    am.train(&data, &encoder, &im, None).unwrap();

    let vectors = am.class_vectors().unwrap();
    assert_eq!(vectors[0], im.get(0).unwrap());
    assert_eq!(vectors[1], im.get(1).unwrap());
    assert_eq!(am.evaluate(&data, &encoder, &im, None).unwrap().accuracy(), 1.0);

    // Cosine scores: the own class is exactly 1
    let scores = am.scores(&Encoded::Hyper(im.get(1).unwrap().clone())).unwrap();
    assert!((scores[1] - 1.0).abs() < 1e-12);
    assert!(scores[0] < 0.5, "Random vectors should be near orthogonal, got {}", scores[0]);

    // Quantized bipolar samples use the term count (2 × threshold) as bound
    let quantized = EncodingPipeline::new(Domain::Bipolar, Quantizer::new(QuantScheme::Int8, Overflow::Sat));
    match quantized.encode(&encoder, &0usize, &im, None).unwrap() {
        Encoded::Quantized(q) => {
            assert!((q.max_q_val() - 1.0).abs() < 1e-12);
            for (&v, &e) in q.values().iter().zip(im.get(0).unwrap().data()) {
                assert!((v - e as f64).abs() < 1e-12, "Expected {}, got {}", e, v);
            }
        }
        other => panic!("Expected quantized output, got {:?}", other),
    }

    let mut am = AssociativeMemory::new(quantized);
    am.train(&data, &encoder, &im, None).unwrap();
    assert_eq!(am.evaluate(&data, &encoder, &im, None).unwrap().accuracy(), 1.0);
}

#[test]
fn test_int8_zero_accumulator() {
    let quantizer = Quantizer::from_tag("INT8", Overflow::Sat).unwrap();
    let out = quantizer.quantize(&vec![0.0; 256], 0.0, Domain::Binary, false);

    assert_eq!(out.dimensions(), 256);
    assert!(out.values().iter().all(|&v| v == 0.0));
}

#[test]
fn test_random_im_exact_density() {
    let im = ItemMemoryBuilder::new(256)
        .build_orthogonal_im(64, ImMode::Random, &[2024], 64)
        .unwrap();

    assert_eq!(im.len(), 64);
    for v in im.iter() {
        assert_eq!(v.count_ones(), 128);
    }
}

#[test]
fn test_ca90_im_seeds_reproduce_memory() {
    let builder = ItemMemoryBuilder::new(512);
    let set = builder
        .build_ca90_im_set(64, 32, hdc_golden::Ca90Mode::Hierarchical, &[], 5)
        .unwrap();

    assert_eq!(set.seeds.len(), 2);
    // Rebuilding from the reported seeds gives the same memory
    let rebuilt = builder
        .build_orthogonal_im(64, ImMode::Ca90Hierarchical, &set.seeds, 32)
        .unwrap();
    assert_eq!(rebuilt, set.memory);
}

fn language_data() -> Vec<Vec<String>> {
    let english = [
        "the cat sat on the mat and the dog ran after it",
        "there is nothing in the house that the child wants",
        "when the weather is nice we walk to the park together",
    ];
    let dutch = [
        "de kat zat op de mat en de hond rende erachteraan",
        "er is niets in het huis dat het kind wil hebben",
        "als het weer mooi is lopen we samen naar het park",
    ];
    vec![
        english.iter().map(|s| s.to_string()).collect(),
        dutch.iter().map(|s| s.to_string()).collect(),
    ]
}

#[test]
fn test_language_model_end_to_end() {
    init_tracing();
    let config = HdcConfig {
        hv_dim: 1024,
        num_total_im: 27,
        num_per_im_bank: 27,
        im_mode: ImMode::Random,
        random_seed: 3,
        cim_levels: Some(2),
        cim_seed: 0xCAFE,
        ..Default::default()
    };
    let mut hdc = Hdc::new(config).unwrap();
    let encoder = NgramEncoder::new(3, NgramEncoder::latin_alphabet()).with_permutation(4, PermuteOrder::Reverse);
    let data = language_data();

    hdc.train(&data, &encoder).unwrap();
    hdc.retrain(&data, &encoder).unwrap();

    let eval = hdc.evaluate(&data, &encoder).unwrap();
    assert_eq!(eval.accuracy(), 1.0, "Training sentences misclassified: {:?}", eval);

    assert_eq!(hdc.classify("the cat sat on the mat and the dog", &encoder).unwrap(), 0);
    assert_eq!(hdc.classify("de kat zat op de mat en de hond", &encoder).unwrap(), 1);

    // Persisted memory scores identically
    let path = std::env::temp_dir().join(format!("hdc_golden_lang_{}.txt", std::process::id()));
    save_am(hdc.memory(), &path).unwrap();
    let loaded = load_am(&path, Domain::Binary).unwrap();
    std::fs::remove_file(&path).ok();

    let original = hdc.memory().class_vectors().unwrap();
    let restored = loaded.class_vectors().unwrap();
    assert_eq!(fingerprint(original), fingerprint(restored));

    let query = hdc.encode(&encoder, "het kind zat in de tuin").unwrap();
    assert_eq!(loaded.predict(&query).unwrap(), hdc.predict(&query).unwrap());
}

#[test]
fn test_quantized_model_end_to_end() {
    let config = HdcConfig {
        hv_dim: 1024,
        num_total_im: 27,
        num_per_im_bank: 27,
        im_mode: ImMode::Random,
        random_seed: 9,
        cim_levels: Some(2),
        quantization: "FP8_E4M3".into(),
        ..Default::default()
    };
    let mut hdc = Hdc::new(config).unwrap();
    let encoder = NgramEncoder::new(3, NgramEncoder::latin_alphabet());
    let data = language_data();

    hdc.train(&data, &encoder).unwrap();
    assert!(matches!(hdc.memory().representatives()[0], Encoded::Quantized(_)));
    assert_eq!(hdc.evaluate(&data, &encoder).unwrap().accuracy(), 1.0);

    // Quantized memories have no text form
    let path = std::env::temp_dir().join("hdc_golden_never_written.txt");
    assert!(save_am(hdc.memory(), &path).is_err());
}

#[test]
fn test_scheme_tags_parse_at_setup() {
    for tag in ["None", "INT8", "INT4_alt", "FP6_E3M2", "FP4_E2M1_alt"] {
        let scheme: QuantScheme = tag.parse().unwrap();
        assert_eq!(scheme.to_string(), tag);
    }
    let config = HdcConfig {
        quantization: "BF16".into(),
        ..Default::default()
    };
    assert!(config.validate().is_err());
}
