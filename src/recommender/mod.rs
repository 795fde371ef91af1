pub mod classifier;
pub mod corpus;
pub mod dataset;
pub mod feature_space;
pub mod lemmatizer;
pub mod normalizer;
pub mod resolver;

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::RecommenderConfig;
use crate::error::{RecommendError, Result};
use crate::recommender::classifier::rakel::Rakel;
use crate::recommender::classifier::ClassifierPipeline;
use crate::recommender::corpus::{
    distinct_label_names, CorpusMap, MetricId, MetricRepository, QuestionId, QuestionRecord,
    QuestionRepository,
};
use crate::recommender::dataset::{Dataset, DatasetEncoder, DATASET_RELATION, INPUT_RELATION};
use crate::recommender::feature_space::FeatureSpace;
use crate::recommender::normalizer::TextNormalizer;
use crate::recommender::resolver::MetricResolver;

/// File names used by [`PreparedRequest::write_artifacts`]
pub const DATASET_FILE: &str = "dataset.arff";
pub const INPUT_FILE: &str = "input.arff";
pub const LABELS_FILE: &str = "labels.xml";

/// Metric recommendation pipeline.
///
/// normalize -> feature space -> encode -> train -> predict -> resolve.
/// Nothing is cached between calls except the injected normalizer; the
/// classifier is trained from scratch on every request.
#[derive(Debug)]
pub struct MetricRecommender<R> {
    normalizer: Arc<TextNormalizer>,
    config: RecommenderConfig,
    resolver: MetricResolver<R>,
}

/// Encoded request, ready for training and prediction
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    feature_space: Arc<FeatureSpace>,
    corpus: Dataset,
    input: Dataset,
}

impl PreparedRequest {
    pub fn feature_space(&self) -> &Arc<FeatureSpace> {
        &self.feature_space
    }

    pub fn corpus(&self) -> &Dataset {
        &self.corpus
    }

    pub fn input(&self) -> &Dataset {
        &self.input
    }

    /// Write both datasets as ARFF and the label descriptor into `dir`.
    /// The directory must belong to this request alone.
    pub fn write_artifacts(&self, dir: &Path) -> Result<()> {
        std::fs::create_dir_all(dir)?;
        std::fs::write(dir.join(DATASET_FILE), self.corpus.to_arff(DATASET_RELATION))?;
        std::fs::write(dir.join(INPUT_FILE), self.input.to_arff(INPUT_RELATION))?;
        std::fs::write(dir.join(LABELS_FILE), self.feature_space.labels_xml())?;
        debug!(dir = %dir.display(), "wrote dataset artifacts");
        Ok(())
    }
}

impl<R> MetricRecommender<R>
where
    R: MetricRepository,
{
    pub fn new(normalizer: Arc<TextNormalizer>, config: RecommenderConfig, metrics: R) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            normalizer,
            config,
            resolver: MetricResolver::new(metrics),
        })
    }

    /// Build the normalizer described by `config.normalizer`
    pub fn from_config(config: RecommenderConfig, metrics: R) -> Result<Self> {
        let normalizer = Arc::new(TextNormalizer::from_config(&config.normalizer)?);
        Self::new(normalizer, config, metrics)
    }

    /// Recommend metric ids for `target` given the labelled `corpus`.
    ///
    /// # Arguments
    /// * `target` - raw text of the question
    /// * `corpus` - every other question with its metric names
    ///
    /// # Returns
    /// * metric ids in label order; empty when the corpus has too few distinct
    ///   labels or nothing is predicted
    pub fn recommend_metrics(&self, target: &str, corpus: &[QuestionRecord]) -> Result<Vec<MetricId>> {
        match self.prepare(target, corpus)? {
            Some(request) => self.recommend_prepared(&request),
            None => Ok(Vec::new()),
        }
    }

    /// Recommend for a stored question, training on all the others
    pub fn recommend_for_question<Q>(&self, id: QuestionId, questions: &Q) -> Result<Vec<MetricId>>
    where
        Q: QuestionRepository + ?Sized,
    {
        let target = questions
            .find_question(id)?
            .ok_or_else(|| RecommendError::Repository(format!("question {id} not found")))?;
        let corpus = questions.list_other_questions(id)?;
        self.recommend_metrics(&target.content, &corpus)
    }

    /// Normalize and encode a request.
    ///
    /// `None` when the corpus is empty or has fewer distinct labels than
    /// `min_distinct_labels`; the lemmatizer is not called in that case.
    pub fn prepare(&self, target: &str, corpus: &[QuestionRecord]) -> Result<Option<PreparedRequest>> {
        let labels = distinct_label_names(corpus);
        if corpus.is_empty() || labels.len() < self.config.min_distinct_labels {
            info!(
                questions = corpus.len(),
                labels = labels.len(),
                required = self.config.min_distinct_labels,
                "not enough labelled questions, nothing to recommend"
            );
            return Ok(None);
        }

        let target = self.normalizer.normalize(target)?;
        let corpus_map = CorpusMap::build(&self.normalizer, corpus)?;
        // 統合前のレコード順でラベルを並べる
        let feature_space = FeatureSpace::build_with_labels(&target, &corpus_map, labels);
        for collision in feature_space.sanitized_collisions() {
            warn!(
                sanitized = %collision.sanitized,
                first = %collision.first,
                second = %collision.second,
                "attribute names collide once whitespace is removed"
            );
        }
        info!(
            entries = corpus_map.len(),
            tokens = feature_space.num_tokens(),
            labels = feature_space.num_labels(),
            "feature space built"
        );

        let encoder = DatasetEncoder::new(Arc::new(feature_space));
        let corpus = encoder.encode_corpus(&corpus_map)?;
        let input = encoder.encode_input(&target)?;
        Ok(Some(PreparedRequest {
            feature_space: Arc::clone(encoder.feature_space()),
            corpus,
            input,
        }))
    }

    /// Train on the prepared corpus and resolve the input's prediction
    pub fn recommend_prepared(&self, request: &PreparedRequest) -> Result<Vec<MetricId>> {
        let pipeline = ClassifierPipeline::new(
            Rakel::from_config(&self.config.classifier),
            self.config.min_distinct_labels,
        );
        let trained = pipeline.train(&request.corpus)?;
        let bipartition = trained.predict(&request.input)?;
        let ids = self
            .resolver
            .resolve(&bipartition, &request.feature_space.label_names())?;
        info!(metrics = ?ids, "recommended metrics");
        Ok(ids)
    }
}
