use std::fmt::Write as _;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{RecommendError, Result};
use crate::recommender::corpus::CorpusMap;
use crate::recommender::feature_space::{sanitize_attribute_name, FeatureSpace};
use crate::utils::datastruct::bit_vec::BitVec;

/// Relation title of the training dataset
pub const DATASET_RELATION: &str = "InfoFromTheDataset";
/// Relation title of the prediction input
pub const INPUT_RELATION: &str = "InfoFromTheInput";

/// One encoded record: a bit per attribute of the feature space
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Instance {
    bits: BitVec,
}

impl Instance {
    pub fn from_bits(bits: BitVec) -> Self {
        Self { bits }
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
    pub fn get(&self, attr_idx: usize) -> bool {
        self.bits.get(attr_idx)
    }

    pub fn bits(&self) -> &BitVec {
        &self.bits
    }

    /// Label segment only
    pub fn label_bits(&self, space: &FeatureSpace) -> BitVec {
        let range = space.label_indices();
        self.bits.slice(range.start, range.end)
    }
}

/// Instances encoded against one feature space.
/// The label attributes are the last `num_labels()` positions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    feature_space: Arc<FeatureSpace>,
    instances: Vec<Instance>,
}

impl Dataset {
    pub fn feature_space(&self) -> &Arc<FeatureSpace> {
        &self.feature_space
    }

    pub fn instances(&self) -> &[Instance] {
        &self.instances
    }

    #[inline]
    pub fn num_instances(&self) -> usize {
        self.instances.len()
    }

    #[inline]
    pub fn num_attributes(&self) -> usize {
        self.feature_space.len()
    }

    #[inline]
    pub fn num_labels(&self) -> usize {
        self.feature_space.num_labels()
    }

    /// Errors unless this dataset was encoded against `space`
    pub fn ensure_compatible(&self, space: &FeatureSpace) -> Result<()> {
        if std::ptr::eq(Arc::as_ptr(&self.feature_space), space) || *self.feature_space == *space {
            return Ok(());
        }
        Err(RecommendError::DatasetMismatch {
            expected: space.len(),
            found: self.feature_space.len(),
        })
    }

    /// ARFF rendering with sanitized attribute names
    pub fn to_arff(&self, relation: &str) -> String {
        let mut out = String::new();
        let _ = write!(out, "@relation {relation}\n\n");
        for attribute in self.feature_space.attributes() {
            let _ = writeln!(out, "@attribute {} {{0, 1}}", sanitize_attribute_name(attribute));
        }
        out.push_str("\n@data\n");
        for instance in &self.instances {
            let row = instance
                .bits
                .iter()
                .map(|bit| if bit { "1" } else { "0" })
                .collect::<Vec<_>>()
                .join(",");
            out.push_str(&row);
            out.push('\n');
        }
        out
    }

    /// CBOR snapshot of the feature space and instances
    pub fn to_cbor(&self) -> Result<Vec<u8>> {
        Ok(serde_cbor::to_vec(self)?)
    }

    pub fn from_cbor(bytes: &[u8]) -> Result<Self> {
        let dataset: Self = serde_cbor::from_slice(bytes)?;
        let expected = dataset.feature_space.len();
        if let Some(bad) = dataset.instances.iter().find(|i| i.len() != expected) {
            return Err(RecommendError::DatasetMismatch {
                expected,
                found: bad.len(),
            });
        }
        Ok(dataset)
    }
}

/// Encodes normalized texts and label sets as binary instances.
///
/// Every dataset produced by one encoder shares its feature space, which is
/// what makes a trained model applicable to the encoded input.
#[derive(Debug, Clone)]
pub struct DatasetEncoder {
    feature_space: Arc<FeatureSpace>,
}

impl DatasetEncoder {
    pub fn new(feature_space: Arc<FeatureSpace>) -> Self {
        Self { feature_space }
    }

    pub fn feature_space(&self) -> &Arc<FeatureSpace> {
        &self.feature_space
    }

    /// One instance per corpus entry, in corpus order.
    /// A bit is set when its token occurs in the entry's text or its label is
    /// among the entry's labels.
    pub fn encode_corpus(&self, corpus: &CorpusMap) -> Result<Dataset> {
        self.feature_space.ensure_not_empty()?;
        let instances = corpus
            .iter()
            .map(|(text, labels)| self.encode_row(text, labels.iter().map(String::as_str)))
            .collect();
        Ok(self.dataset(instances))
    }

    /// Single instance for the target text; label bits stay 0
    pub fn encode_input(&self, target: &str) -> Result<Dataset> {
        self.feature_space.ensure_not_empty()?;
        let instance = self.encode_row(target, std::iter::empty());
        Ok(self.dataset(vec![instance]))
    }

    fn encode_row<'a, L>(&self, text: &str, labels: L) -> Instance
    where
        L: IntoIterator<Item = &'a str>,
    {
        let mut bits = BitVec::zeros(self.feature_space.len());
        // 未知の token / label は無視
        for idx in text.split_whitespace().filter_map(|t| self.feature_space.token_index(t)) {
            bits.set(idx, true);
        }
        for idx in labels.into_iter().filter_map(|l| self.feature_space.label_index(l)) {
            bits.set(idx, true);
        }
        Instance::from_bits(bits)
    }

    fn dataset(&self, instances: Vec<Instance>) -> Dataset {
        Dataset {
            feature_space: Arc::clone(&self.feature_space),
            instances,
        }
    }
}
