//! Associative memory: the class prototypes a query is scored against.
//!
//! Training bundles the encoded samples of each class into that class's
//! accumulator and reduces it to a representative. Prediction returns the
//! class whose representative is most similar to the query. Retraining
//! is a perceptron pass: every misclassified sample is subtracted from the
//! class it was mistaken for and added to its true class.
//!
//! # Lifecycle
//!
//! ```text
//! Empty --train--> Bound --retrain--> Bound'
//! ```
//!
//! Training and scoring run per class in parallel. Retraining is strictly
//! sequential in dataset order; its result depends on that order.

use crate::accumulator::{Accumulator, QuantAccumulator};
use crate::encoder::{Encoded, EncodingPipeline, SampleEncoder};
use crate::error::{HdcError, Result};
use crate::item_memory::{ContinuousItemMemory, ItemMemory};
use crate::primitives::Primitives;
use crate::vector::{Domain, Hypervector};
use rayon::prelude::*;
use std::borrow::Borrow;
use tracing::{debug, info};

/// Index-addressable training data, grouped by class.
pub trait Dataset<S: ?Sized>: Sync {
    fn num_classes(&self) -> usize;

    /// Number of samples in `class`.
    fn class_len(&self, class: usize) -> usize;

    fn sample(&self, class: usize, index: usize) -> &S;

    fn total_len(&self) -> usize {
        (0..self.num_classes()).map(|c| self.class_len(c)).sum()
    }
}

impl<T, S> Dataset<S> for [Vec<T>]
where
    T: Borrow<S> + Sync,
    S: ?Sized,
{
    fn num_classes(&self) -> usize {
        self.len()
    }

    fn class_len(&self, class: usize) -> usize {
        self[class].len()
    }

    fn sample(&self, class: usize, index: usize) -> &S {
        self[class][index].borrow()
    }
}

impl<T, S> Dataset<S> for Vec<Vec<T>>
where
    T: Borrow<S> + Sync,
    S: ?Sized,
{
    fn num_classes(&self) -> usize {
        self.len()
    }

    fn class_len(&self, class: usize) -> usize {
        self[class].len()
    }

    fn sample(&self, class: usize, index: usize) -> &S {
        self[class][index].borrow()
    }
}

/// Per-class accumulator, integer for binarized models and real-valued
/// for quantized ones.
#[derive(Clone, Debug, PartialEq)]
enum ClassAccumulator {
    Plain(Accumulator),
    Quantized(QuantAccumulator),
}

impl ClassAccumulator {
    fn new(dim: usize, quantized: bool) -> Self {
        if quantized {
            ClassAccumulator::Quantized(QuantAccumulator::new(dim))
        } else {
            ClassAccumulator::Plain(Accumulator::new(dim))
        }
    }

    fn count(&self) -> i64 {
        match self {
            ClassAccumulator::Plain(acc) => acc.count(),
            ClassAccumulator::Quantized(acc) => acc.count(),
        }
    }

    fn add(&mut self, sample: &Encoded) -> Result<()> {
        match (self, sample) {
            (ClassAccumulator::Plain(acc), Encoded::Hyper(hv)) => acc.add(hv),
            (ClassAccumulator::Quantized(acc), Encoded::Quantized(q)) => acc.add(q),
            _ => Err(HdcError::InvalidConfig(
                "sample encoding does not match the class memory".into(),
            )),
        }
    }

    fn subtract(&mut self, sample: &Encoded) -> Result<()> {
        match (self, sample) {
            (ClassAccumulator::Plain(acc), Encoded::Hyper(hv)) => acc.subtract(hv),
            (ClassAccumulator::Quantized(acc), Encoded::Quantized(q)) => acc.subtract(q),
            _ => Err(HdcError::InvalidConfig(
                "sample encoding does not match the class memory".into(),
            )),
        }
    }
}

/// Per-class and overall accuracy of a model on a dataset.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Evaluation {
    /// Samples per class.
    pub totals: Vec<usize>,
    /// Correct predictions per class.
    pub correct: Vec<usize>,
}

impl Evaluation {
    pub fn accuracy(&self) -> f64 {
        let total: usize = self.totals.iter().sum();
        if total == 0 {
            return 0.0;
        }
        self.correct.iter().sum::<usize>() as f64 / total as f64
    }

    pub fn class_accuracy(&self, class: usize) -> f64 {
        match self.totals.get(class) {
            Some(&t) if t > 0 => self.correct[class] as f64 / t as f64,
            _ => 0.0,
        }
    }
}

/// Trained class prototypes.
#[derive(Clone, Debug)]
pub struct AssociativeMemory {
    pipeline: EncodingPipeline,
    accumulators: Vec<ClassAccumulator>,
    representatives: Vec<Encoded>,
}

impl AssociativeMemory {
    /// An empty (untrained) memory that encodes through `pipeline`.
    pub fn new(pipeline: EncodingPipeline) -> Self {
        Self {
            pipeline,
            accumulators: Vec::new(),
            representatives: Vec::new(),
        }
    }

    /// A bound memory from stored class vectors.
    ///
    /// Each class starts with its vector as a single accumulated term, so
    /// the memory can still be retrained.
    pub fn from_class_vectors(vectors: Vec<Hypervector>, domain: Domain) -> Result<Self> {
        let pipeline = EncodingPipeline::new(domain, Default::default());
        let mut memory = Self::new(pipeline);
        if let Some(first) = vectors.first() {
            let dim = first.dimensions();
            for v in &vectors {
                Primitives::check_dims(dim, v.dimensions())?;
                let mut acc = Accumulator::new(dim);
                acc.add(v)?;
                memory.accumulators.push(ClassAccumulator::Plain(acc));
            }
        }
        memory.representatives = vectors.into_iter().map(Encoded::Hyper).collect();
        Ok(memory)
    }

    pub fn pipeline(&self) -> &EncodingPipeline {
        &self.pipeline
    }

    pub fn domain(&self) -> Domain {
        self.pipeline.domain()
    }

    pub fn num_classes(&self) -> usize {
        self.representatives.len()
    }

    pub fn is_trained(&self) -> bool {
        !self.representatives.is_empty()
    }

    pub fn dimensions(&self) -> usize {
        self.representatives.first().map_or(0, Encoded::dimensions)
    }

    /// Class representatives in class order.
    pub fn representatives(&self) -> &[Encoded] {
        &self.representatives
    }

    /// Binarized class vectors, or `None` for a quantized model.
    pub fn class_vectors(&self) -> Option<Vec<&Hypervector>> {
        self.representatives.iter().map(Encoded::as_hypervector).collect()
    }

    /// Net number of samples bundled into each class.
    pub fn class_counts(&self) -> Vec<i64> {
        self.accumulators.iter().map(ClassAccumulator::count).collect()
    }

    fn reduce(&self, acc: &ClassAccumulator) -> Encoded {
        match acc {
            ClassAccumulator::Plain(acc) => Encoded::Hyper(acc.binarize(self.domain())),
            ClassAccumulator::Quantized(acc) => Encoded::Quantized(self.pipeline.quantizer().quantize(
                acc.sums(),
                acc.bound(),
                self.domain(),
                true,
            )),
        }
    }

    fn rebind(&mut self) {
        self.representatives = self.accumulators.iter().map(|acc| self.reduce(acc)).collect();
    }

    /// Train from scratch: bundle every class's encoded samples and reduce.
    ///
    /// A class with no samples binarizes at threshold 0, so every
    /// non-negative element becomes 1.
    pub fn train<S, D, E>(
        &mut self,
        dataset: &D,
        encoder: &E,
        im: &ItemMemory,
        cim: Option<&ContinuousItemMemory>,
    ) -> Result<()>
    where
        S: ?Sized,
        D: Dataset<S> + ?Sized,
        E: SampleEncoder<S> + ?Sized,
    {
        let dim = im.dimensions();
        let quantized = self.pipeline.is_quantized();
        let pipeline = &self.pipeline;

        let accumulators = (0..dataset.num_classes())
            .into_par_iter()
            .map(|class| {
                let mut acc = ClassAccumulator::new(dim, quantized);
                for i in 0..dataset.class_len(class) {
                    let encoded = pipeline.encode(encoder, dataset.sample(class, i), im, cim)?;
                    acc.add(&encoded)?;
                }
                debug!(class, samples = acc.count(), "Trained class");
                Ok(acc)
            })
            .collect::<Result<Vec<_>>>()?;

        self.accumulators = accumulators;
        self.rebind();
        info!(classes = self.num_classes(), samples = dataset.total_len(), "Training complete");
        Ok(())
    }

    /// Similarity of `query` to every class, in class order.
    pub fn scores(&self, query: &Encoded) -> Result<Vec<f64>> {
        let domain = self.domain();
        self.representatives
            .par_iter()
            .map(|rep| query.similarity(rep, domain))
            .collect()
    }

    /// Index of the most similar class; ties go to the lowest index.
    pub fn predict(&self, query: &Encoded) -> Result<usize> {
        if !self.is_trained() {
            return Err(HdcError::EmptyInput("associative memory has no classes".into()));
        }
        let scores = self.scores(query)?;
        let mut best = 0;
        for (i, &score) in scores.iter().enumerate().skip(1) {
            if score > scores[best] {
                best = i;
            }
        }
        Ok(best)
    }

    /// Encode a sample and predict its class.
    pub fn classify<S, E>(
        &self,
        sample: &S,
        encoder: &E,
        im: &ItemMemory,
        cim: Option<&ContinuousItemMemory>,
    ) -> Result<usize>
    where
        S: ?Sized,
        E: SampleEncoder<S> + ?Sized,
    {
        let query = self.pipeline.encode(encoder, sample, im, cim)?;
        self.predict(&query)
    }

    /// One perceptron correction pass over the dataset; returns the number
    /// of corrections.
    ///
    /// Predictions use the representatives from before the pass. Each
    /// mistake moves the sample from the predicted class to the true class
    /// (count -1 / +1) in dataset order; representatives are rebuilt from
    /// the updated accumulators once the pass ends.
    pub fn retrain<S, D, E>(
        &mut self,
        dataset: &D,
        encoder: &E,
        im: &ItemMemory,
        cim: Option<&ContinuousItemMemory>,
    ) -> Result<usize>
    where
        S: ?Sized,
        D: Dataset<S> + ?Sized,
        E: SampleEncoder<S> + ?Sized,
    {
        if dataset.num_classes() != self.num_classes() {
            return Err(HdcError::InvalidConfig(format!(
                "dataset has {} classes, memory has {}",
                dataset.num_classes(),
                self.num_classes()
            )));
        }

        let mut corrections = 0;
        for class in 0..dataset.num_classes() {
            for i in 0..dataset.class_len(class) {
                let encoded = self.pipeline.encode(encoder, dataset.sample(class, i), im, cim)?;
                let predicted = self.predict(&encoded)?;
                if predicted != class {
                    self.accumulators[predicted].subtract(&encoded)?;
                    self.accumulators[class].add(&encoded)?;
                    corrections += 1;
                }
            }
        }

        self.rebind();
        info!(corrections, samples = dataset.total_len(), "Retraining pass complete");
        Ok(corrections)
    }

    /// Accuracy of the current memory on `dataset`.
    pub fn evaluate<S, D, E>(
        &self,
        dataset: &D,
        encoder: &E,
        im: &ItemMemory,
        cim: Option<&ContinuousItemMemory>,
    ) -> Result<Evaluation>
    where
        S: ?Sized,
        D: Dataset<S> + ?Sized,
        E: SampleEncoder<S> + ?Sized,
    {
        let per_class = (0..dataset.num_classes())
            .into_par_iter()
            .map(|class| {
                let total = dataset.class_len(class);
                let mut correct = 0;
                for i in 0..total {
                    if self.classify(dataset.sample(class, i), encoder, im, cim)? == class {
                        correct += 1;
                    }
                }
                Ok((total, correct))
            })
            .collect::<Result<Vec<_>>>()?;

        let (totals, correct) = per_class.into_iter().unzip();
        Ok(Evaluation { totals, correct })
    }
}
