pub mod label_powerset;
pub mod rakel;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{RecommendError, Result};
use crate::recommender::dataset::{Dataset, Instance};
use crate::recommender::feature_space::FeatureSpace;
use crate::utils::datastruct::bit_vec::BitVec;

/// Multi-label learning algorithm.
///
/// By implementing this trait, other learners can be plugged into
/// `ClassifierPipeline<L>` in place of the default `Rakel` ensemble.
pub trait MultiLabelLearner: Send + Sync {
    type Model: MultiLabelModel;

    /// Train on every instance of `dataset`
    fn build(&self, dataset: &Dataset) -> Result<Self::Model>;
}

/// Trained multi-label model
pub trait MultiLabelModel: Send + Sync {
    fn make_prediction(&self, instance: &Instance) -> Result<MultiLabelOutput>;
}

/// Predicted membership, one bit per label in feature space order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bipartition {
    bits: BitVec,
}

impl Bipartition {
    pub fn all_false(num_labels: usize) -> Self {
        Self {
            bits: BitVec::zeros(num_labels),
        }
    }

    pub fn from_bits(bits: BitVec) -> Self {
        Self { bits }
    }

    pub fn from_bools<I>(bools: I) -> Self
    where
        I: IntoIterator<Item = bool>,
    {
        Self::from_bits(BitVec::from_bools(bools))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bits.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    #[inline]
    pub fn get(&self, label: usize) -> bool {
        self.bits.get(label)
    }

    /// Positions of predicted labels, ascending
    pub fn selected(&self) -> impl Iterator<Item = usize> + '_ {
        self.bits.iter_ones()
    }

    pub fn to_vec(&self) -> Vec<bool> {
        self.bits.iter().collect()
    }
}

/// What a model says about one instance
#[derive(Debug, Clone, PartialEq)]
pub struct MultiLabelOutput {
    bipartition: Option<Bipartition>,
    confidences: Option<Vec<f64>>,
}

impl MultiLabelOutput {
    pub fn new(bipartition: Option<Bipartition>, confidences: Option<Vec<f64>>) -> Self {
        Self {
            bipartition,
            confidences,
        }
    }

    pub fn has_bipartition(&self) -> bool {
        self.bipartition.is_some()
    }

    pub fn bipartition(&self) -> Option<&Bipartition> {
        self.bipartition.as_ref()
    }

    pub fn confidences(&self) -> Option<&[f64]> {
        self.confidences.as_deref()
    }

    pub fn into_bipartition(self) -> Option<Bipartition> {
        self.bipartition
    }
}

/// Trains a learner on the corpus dataset and predicts the target's labels.
///
/// A model is trained from scratch for every request and is only valid for
/// datasets encoded against the feature space it was trained on.
#[derive(Debug, Clone)]
pub struct ClassifierPipeline<L> {
    learner: L,
    min_distinct_labels: usize,
}

/// Model bound to the feature space it was trained on
#[derive(Debug, Clone)]
pub struct TrainedClassifier<M> {
    model: M,
    feature_space: Arc<FeatureSpace>,
}

impl<L> ClassifierPipeline<L>
where
    L: MultiLabelLearner,
{
    pub fn new(learner: L, min_distinct_labels: usize) -> Self {
        Self {
            learner,
            min_distinct_labels,
        }
    }

    /// Whether a corpus with `num_labels` distinct labels can be trained on.
    /// Callers skip the classifier entirely when this is false.
    #[inline]
    pub fn accepts(&self, num_labels: usize) -> bool {
        num_labels >= self.min_distinct_labels
    }

    pub fn train(&self, corpus: &Dataset) -> Result<TrainedClassifier<L::Model>> {
        if !self.accepts(corpus.num_labels()) {
            return Err(RecommendError::Classifier(format!(
                "{} distinct labels, at least {} required",
                corpus.num_labels(),
                self.min_distinct_labels
            )));
        }
        debug!(
            instances = corpus.num_instances(),
            attributes = corpus.num_attributes(),
            labels = corpus.num_labels(),
            "training classifier"
        );
        let model = self.learner.build(corpus)?;
        Ok(TrainedClassifier {
            model,
            feature_space: Arc::clone(corpus.feature_space()),
        })
    }
}

impl<M> TrainedClassifier<M>
where
    M: MultiLabelModel,
{
    pub fn feature_space(&self) -> &Arc<FeatureSpace> {
        &self.feature_space
    }

    /// Bipartition for the single instance of `input`.
    ///
    /// `input` must be encoded against the training feature space and hold
    /// exactly one instance. A model output without a bipartition yields an
    /// all-false bipartition.
    pub fn predict(&self, input: &Dataset) -> Result<Bipartition> {
        input.ensure_compatible(&self.feature_space)?;
        let [instance] = input.instances() else {
            return Err(RecommendError::InstanceCount(input.num_instances()));
        };
        let num_labels = self.feature_space.num_labels();
        let output = self.model.make_prediction(instance)?;
        match output.into_bipartition() {
            Some(bipartition) if bipartition.len() == num_labels => Ok(bipartition),
            Some(bipartition) => Err(RecommendError::Classifier(format!(
                "model returned {} labels, expected {num_labels}",
                bipartition.len()
            ))),
            None => Ok(Bipartition::all_false(num_labels)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recommender::corpus::CorpusMap;
    use crate::recommender::dataset::DatasetEncoder;

    /// learner whose model never decides
    #[derive(Debug)]
    struct Undecided;
    #[derive(Debug)]
    struct UndecidedModel;

    impl MultiLabelLearner for Undecided {
        type Model = UndecidedModel;
        fn build(&self, _dataset: &Dataset) -> Result<UndecidedModel> {
            Ok(UndecidedModel)
        }
    }

    impl MultiLabelModel for UndecidedModel {
        fn make_prediction(&self, _instance: &Instance) -> Result<MultiLabelOutput> {
            Ok(MultiLabelOutput::new(None, None))
        }
    }

    fn encoder() -> (DatasetEncoder, CorpusMap) {
        let corpus: CorpusMap = vec![
            ("cpu load", vec!["Performance", "Capacity"]),
            ("login error", vec!["Reliability"]),
        ]
        .into_iter()
        .collect();
        let enc = DatasetEncoder::new(Arc::new(FeatureSpace::build("cpu", &corpus)));
        (enc, corpus)
    }

    #[test]
    fn missing_bipartition_means_all_false() {
        let (enc, corpus) = encoder();
        let pipeline = ClassifierPipeline::new(Undecided, 3);
        let trained = pipeline.train(&enc.encode_corpus(&corpus).unwrap()).unwrap();
        let bip = trained.predict(&enc.encode_input("cpu").unwrap()).unwrap();
        assert_eq!(bip.to_vec(), vec![false, false, false]);
    }

    #[test]
    fn training_below_label_minimum_is_refused() {
        let (enc, corpus) = encoder();
        let pipeline = ClassifierPipeline::new(Undecided, 4);
        assert!(!pipeline.accepts(3));
        assert!(pipeline.train(&enc.encode_corpus(&corpus).unwrap()).is_err());
    }

    #[test]
    fn more_than_one_input_instance_is_fatal() {
        let (enc, corpus) = encoder();
        let pipeline = ClassifierPipeline::new(Undecided, 3);
        let data = enc.encode_corpus(&corpus).unwrap();
        let trained = pipeline.train(&data).unwrap();
        // corpus dataset has two instances
        assert!(matches!(trained.predict(&data), Err(RecommendError::InstanceCount(2))));
    }

    #[test]
    fn input_from_another_feature_space_is_fatal() {
        let (enc, corpus) = encoder();
        let pipeline = ClassifierPipeline::new(Undecided, 3);
        let trained = pipeline.train(&enc.encode_corpus(&corpus).unwrap()).unwrap();
        let other = DatasetEncoder::new(Arc::new(FeatureSpace::build("memory usage", &corpus)));
        assert!(matches!(
            trained.predict(&other.encode_input("memory usage").unwrap()),
            Err(RecommendError::DatasetMismatch { .. })
        ));
    }

    #[test]
    fn bipartition_selection_is_ascending() {
        let bip = Bipartition::from_bools([false, true, false, true]);
        assert_eq!(bip.selected().collect::<Vec<_>>(), vec![1, 3]);
        assert_eq!(Bipartition::all_false(2).selected().count(), 0);
    }
}
