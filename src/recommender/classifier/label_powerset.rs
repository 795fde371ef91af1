use aprender::primitives::Matrix;
use aprender::tree::DecisionTreeClassifier;
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::config::TreeConfig;
use crate::error::{RecommendError, Result};
use crate::recommender::classifier::{Bipartition, MultiLabelLearner, MultiLabelModel, MultiLabelOutput};
use crate::recommender::dataset::{Dataset, Instance};
use crate::utils::datastruct::bit_vec::BitVec;

/// Label powerset transformation.
///
/// Each distinct combination of the selected labels seen in training becomes
/// one class of a single-label problem. The token columns are handed to
/// aprender's CART decision tree as a 0/1 matrix and the combination ids as
/// its class labels.
#[derive(Debug, Clone, Default)]
pub struct LabelPowerset {
    tree: TreeConfig,
}

/// Fitted powerset over a subset of the labels
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelPowersetModel {
    /// Label positions (0-based within the label segment) this model covers
    labels: Vec<usize>,
    /// class id -> label combination over `labels`
    combinations: Vec<BitVec>,
    /// token attributes, i.e. matrix columns
    num_tokens: usize,
    tree: DecisionTreeClassifier,
}

/// Token segment of `rows` as a row-major 0/1 matrix
fn token_matrix(rows: &[&Instance], num_tokens: usize) -> Result<Matrix<f32>> {
    let data: Vec<f32> = rows
        .iter()
        .flat_map(|row| (0..num_tokens).map(move |idx| if row.get(idx) { 1.0 } else { 0.0 }))
        .collect();
    Matrix::from_vec(rows.len(), num_tokens, data)
        .map_err(|e| RecommendError::Classifier(format!("cannot build token matrix: {e}")))
}

impl LabelPowerset {
    pub fn new(tree: TreeConfig) -> Self {
        Self { tree }
    }

    fn base(&self) -> DecisionTreeClassifier {
        let tree = DecisionTreeClassifier::new();
        match self.tree.max_depth {
            Some(depth) => tree.with_max_depth(depth),
            None => tree,
        }
    }

    /// Fit on the given label positions only
    pub fn fit_subset(&self, dataset: &Dataset, labels: &[usize]) -> Result<LabelPowersetModel> {
        let space = dataset.feature_space();
        if let Some(&bad) = labels.iter().find(|&&l| l >= space.num_labels()) {
            return Err(RecommendError::Classifier(format!(
                "label position {bad} out of range for {} labels",
                space.num_labels()
            )));
        }
        let num_tokens = space.num_tokens();
        let rows: Vec<&Instance> = dataset.instances().iter().collect();

        // 組み合わせ -> class id
        let mut combinations: IndexSet<BitVec> = IndexSet::new();
        let classes: Vec<usize> = rows
            .iter()
            .map(|row| {
                let combination = BitVec::from_bools(labels.iter().map(|&l| row.get(num_tokens + l)));
                combinations.insert_full(combination).0
            })
            .collect();

        let x = token_matrix(&rows, num_tokens)?;
        let mut tree = self.base();
        tree.fit(&x, &classes)
            .map_err(|e| RecommendError::Classifier(format!("decision tree training failed: {e}")))?;
        Ok(LabelPowersetModel {
            labels: labels.to_vec(),
            combinations: combinations.into_iter().collect(),
            num_tokens,
            tree,
        })
    }
}

impl LabelPowersetModel {
    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    pub fn num_classes(&self) -> usize {
        self.combinations.len()
    }

    /// Predicted combination: one bit per covered label
    pub fn predict_combination(&self, instance: &Instance) -> Result<&BitVec> {
        self.check_instance(instance)?;
        let x = token_matrix(&[instance], self.num_tokens)?;
        let class = self.tree.predict(&x).first().copied();
        class
            .and_then(|class| self.combinations.get(class))
            .ok_or_else(|| RecommendError::Classifier(format!("decision tree predicted unknown class {class:?}")))
    }

    fn check_instance(&self, instance: &Instance) -> Result<()> {
        if instance.len() < self.num_tokens {
            return Err(RecommendError::DatasetMismatch {
                expected: self.num_tokens,
                found: instance.len(),
            });
        }
        Ok(())
    }
}

impl MultiLabelLearner for LabelPowerset {
    type Model = LabelPowersetModel;

    /// Powerset over every label
    fn build(&self, dataset: &Dataset) -> Result<Self::Model> {
        let all: Vec<usize> = (0..dataset.num_labels()).collect();
        self.fit_subset(dataset, &all)
    }
}

impl MultiLabelModel for LabelPowersetModel {
    fn make_prediction(&self, instance: &Instance) -> Result<MultiLabelOutput> {
        let bipartition = Bipartition::from_bits(self.predict_combination(instance)?.clone());
        Ok(MultiLabelOutput::new(Some(bipartition), None))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::recommender::corpus::CorpusMap;
    use crate::recommender::dataset::DatasetEncoder;
    use crate::recommender::feature_space::FeatureSpace;

    fn encoded(target: &str, corpus: &CorpusMap) -> (DatasetEncoder, Dataset) {
        let enc = DatasetEncoder::new(Arc::new(FeatureSpace::build(target, corpus)));
        let ds = enc.encode_corpus(corpus).unwrap();
        (enc, ds)
    }

    fn corpus() -> CorpusMap {
        vec![
            ("latency high", vec!["Performance"]),
            ("latency spike", vec!["Performance"]),
            ("password leak", vec!["Security"]),
            ("password reset", vec!["Security"]),
            ("button confusing", vec!["Usability", "Security"]),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn each_distinct_combination_is_a_class() {
        let corpus = corpus();
        let (_, ds) = encoded("latency", &corpus);
        let model = LabelPowerset::default().build(&ds).unwrap();
        // {Perf}, {Sec}, {Usab, Sec}
        assert_eq!(model.num_classes(), 3);
        assert_eq!(model.labels(), &[0, 1, 2]);
    }

    #[test]
    fn predicts_combination_of_similar_rows() {
        let corpus = corpus();
        let (enc, ds) = encoded("latency", &corpus);
        let model = LabelPowerset::default().build(&ds).unwrap();
        let input = enc.encode_input("latency").unwrap();
        let out = model.make_prediction(&input.instances()[0]).unwrap();
        // labels: Performance, Security, Usability
        assert_eq!(out.bipartition().unwrap().to_vec(), vec![true, false, false]);
        assert!(out.confidences().is_none());
    }

    #[test]
    fn subset_model_covers_only_its_labels() {
        let corpus = corpus();
        let (enc, ds) = encoded("password", &corpus);
        let model = LabelPowerset::default().fit_subset(&ds, &[1, 2]).unwrap();
        let input = enc.encode_input("password").unwrap();
        let combination = model.predict_combination(&input.instances()[0]).unwrap();
        assert_eq!(combination.len(), 2);
        assert_eq!(combination.iter().collect::<Vec<_>>(), vec![true, false]);
    }

    #[test]
    fn depth_limit_is_passed_to_the_tree() {
        let corpus = corpus();
        let (enc, ds) = encoded("latency", &corpus);
        // a stump still separates latency rows from the rest
        let model = LabelPowerset::new(TreeConfig { max_depth: Some(1) }).build(&ds).unwrap();
        let input = enc.encode_input("latency").unwrap();
        let combination = model.predict_combination(&input.instances()[0]).unwrap();
        assert_eq!(combination.iter().collect::<Vec<_>>(), vec![true, false, false]);
    }

    #[test]
    fn out_of_range_label_is_rejected() {
        let corpus = corpus();
        let (_, ds) = encoded("x", &corpus);
        assert!(matches!(
            LabelPowerset::default().fit_subset(&ds, &[0, 3]),
            Err(RecommendError::Classifier(_))
        ));
    }
}
