//! Pipeline configuration
//!
//! All values default to the recommender policy constants
//! (three distinct labels minimum, labelsets of size two, unlimited tree
//! depth), so an empty TOML file is a valid configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{RecommendError, Result};

/// Minimum number of distinct labels the ensemble can work with
pub const MIN_DISTINCT_LABELS: usize = 3;
/// Labelset size of each ensemble member
pub const DEFAULT_SUBSET_SIZE: usize = 2;
/// Vote threshold for a label to be predicted
pub const DEFAULT_THRESHOLD: f64 = 0.5;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RecommenderConfig {
    /// Below this many distinct labels the pipeline returns nothing
    pub min_distinct_labels: usize,
    pub classifier: ClassifierConfig,
    pub normalizer: NormalizerConfig,
}

impl Default for RecommenderConfig {
    fn default() -> Self {
        Self {
            min_distinct_labels: MIN_DISTINCT_LABELS,
            classifier: ClassifierConfig::default(),
            normalizer: NormalizerConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClassifierConfig {
    /// k of random k-labelsets
    pub subset_size: usize,
    /// Ensemble size. `None` means `min(2 * labels, C(labels, k))`
    pub num_models: Option<usize>,
    pub threshold: f64,
    pub seed: u64,
    pub tree: TreeConfig,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            subset_size: DEFAULT_SUBSET_SIZE,
            num_models: None,
            threshold: DEFAULT_THRESHOLD,
            seed: 0,
            tree: TreeConfig::default(),
        }
    }
}

/// Decision tree grown by each label powerset member
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct TreeConfig {
    /// Unlimited when unset
    pub max_depth: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct NormalizerConfig {
    /// Stopword list, one word per line. Embedded English list when unset
    pub stopwords_path: Option<PathBuf>,
    pub lemmatizer: LemmatizerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LemmatizerConfig {
    /// Built-in English lemmatizer over the Porter stemmer
    #[default]
    Porter,
    /// External program: reads text on stdin, prints lemmas on stdout
    Command { program: String, #[serde(default)] args: Vec<String> },
}

impl RecommenderConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let s = std::fs::read_to_string(path)?;
        Self::from_toml_str(&s)
    }

    pub fn validate(&self) -> Result<()> {
        self.classifier.validate()
    }
}

impl ClassifierConfig {
    pub fn validate(&self) -> Result<()> {
        if self.subset_size == 0 {
            return Err(RecommendError::InvalidConfig("subset_size must be at least 1".into()));
        }
        if self.num_models == Some(0) {
            return Err(RecommendError::InvalidConfig("num_models must be at least 1".into()));
        }
        if !(self.threshold > 0.0 && self.threshold <= 1.0) {
            return Err(RecommendError::InvalidConfig(format!(
                "threshold must be in (0, 1], got {}",
                self.threshold
            )));
        }
        if self.tree.max_depth == Some(0) {
            return Err(RecommendError::InvalidConfig("max_depth must be at least 1".into()));
        }
        Ok(())
    }
}
