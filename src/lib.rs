/// This crate recommends metric labels for a question from previously labelled questions.
pub mod config;
pub mod error;
pub mod recommender;
pub mod utils;

/// Metric Recommender
/// The top-level struct of this crate, running the whole recommendation pipeline.
///
/// For every request it:
/// - normalizes the target text and every corpus text
/// - builds the attribute space (tokens, then label names)
/// - encodes the corpus and the target as binary instances
/// - trains a RAkEL ensemble of label powerset decision trees
/// - maps the predicted labels back to metric ids
///
/// `MetricRecommender<R>` is generic over the metric lookup `R`
/// (any `MetricRepository`, e.g. `&InMemoryStore`).
///
/// The normalizer is passed in as `Arc<TextNormalizer>` and can be shared
/// among multiple recommenders. Nothing else survives a request.
pub use recommender::MetricRecommender;

/// Text Normalizer
/// Lowercases, strips non-letters, removes stopwords and lemmatizes.
/// `TextNormalizer::global()` returns a process-wide default instance.
pub use recommender::normalizer::TextNormalizer;

/// Lemmatizer
/// Lemmatization service used by the normalizer.
/// `PorterLemmatizer` is built in; `CommandLemmatizer` pipes text through an
/// external program.
pub use recommender::lemmatizer::{CommandLemmatizer, Lemmatizer, PorterLemmatizer};

/// Feature Space
/// Ordered attribute list shared by the corpus dataset and the input dataset.
pub use recommender::feature_space::FeatureSpace;

/// Dataset Encoder
/// Encodes normalized texts and label sets as bit vectors over a `FeatureSpace`.
///
/// # Serialization
/// `Dataset` can be rendered as ARFF and snapshotted as CBOR.
pub use recommender::dataset::{Dataset, DatasetEncoder, Instance};

/// Classifier
/// `ClassifierPipeline` trains any `MultiLabelLearner`; `Rakel` is the default.
pub use recommender::classifier::{
    Bipartition, ClassifierPipeline, MultiLabelLearner, MultiLabelModel, MultiLabelOutput,
};
pub use recommender::classifier::rakel::Rakel;

/// Metric Resolver
/// Maps a bipartition back to metric ids through a `MetricRepository`.
pub use recommender::resolver::MetricResolver;

/// Corpus records and storage collaborators
pub use recommender::corpus::{
    CorpusMap, InMemoryStore, MetricId, MetricRecord, MetricRepository, QuestionId, QuestionRecord,
    QuestionRepository,
};

pub use config::RecommenderConfig;
pub use error::{RecommendError, Result};
