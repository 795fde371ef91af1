use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use rayon::prelude::*;
use tracing::{debug, info};

use crate::config::{LemmatizerConfig, NormalizerConfig};
use crate::error::{RecommendError, Result};
use crate::recommender::lemmatizer::{CommandLemmatizer, Lemmatizer, PorterLemmatizer};

const ENGLISH_STOPWORDS: &str = include_str!("../../resources/english_stopwords.txt");

static GLOBAL_NORMALIZER: OnceCell<Arc<TextNormalizer>> = OnceCell::new();

/// Words dropped before feature extraction
#[derive(Debug, Clone, Default)]
pub struct Stopwords {
    words: HashSet<String>,
}

impl Stopwords {
    /// One word per line, blank lines ignored
    pub fn parse(contents: &str) -> Self {
        let words = contents
            .lines()
            .map(str::trim)
            .filter(|w| !w.is_empty())
            .map(str::to_string)
            .collect();
        Self { words }
    }

    /// Embedded English list
    pub fn english() -> Self {
        Self::parse(ENGLISH_STOPWORDS)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|source| RecommendError::StopwordsLoad {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::parse(&contents))
    }

    #[inline]
    pub fn contains(&self, word: &str) -> bool {
        self.words.contains(word)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

/// Turns raw question text into the canonical token sequence used as features.
///
/// Normalization is two passes:
/// 1. clean: lowercase, split on whitespace, keep only `a-z` in each word,
///    drop stopwords
/// 2. lemmatize the surviving words, keeping their order
///
/// The result is a single-space separated string. For a fixed stopword set and
/// lemmatizer it is a pure function of the input.
#[derive(Debug, Clone)]
pub struct TextNormalizer {
    stopwords: Arc<Stopwords>,
    lemmatizer: Arc<dyn Lemmatizer>,
}

impl TextNormalizer {
    pub fn new(stopwords: Stopwords, lemmatizer: Arc<dyn Lemmatizer>) -> Self {
        Self {
            stopwords: Arc::new(stopwords),
            lemmatizer,
        }
    }

    /// Load the stopword list and set up the lemmatizer named in `config`
    pub fn from_config(config: &NormalizerConfig) -> Result<Self> {
        let stopwords = match &config.stopwords_path {
            Some(path) => Stopwords::from_path(path)?,
            None => Stopwords::english(),
        };
        let lemmatizer: Arc<dyn Lemmatizer> = match &config.lemmatizer {
            LemmatizerConfig::Porter => Arc::new(PorterLemmatizer::new()),
            LemmatizerConfig::Command { program, args } => Arc::new(CommandLemmatizer::new(program.clone(), args.clone())),
        };
        info!(stopwords = stopwords.len(), lemmatizer = ?lemmatizer, "text normalizer ready");
        Ok(Self::new(stopwords, lemmatizer))
    }

    /// Process-wide default normalizer, built on first call.
    /// Concurrent first calls build it once; a failed build is not cached.
    pub fn global() -> Result<Arc<TextNormalizer>> {
        GLOBAL_NORMALIZER
            .get_or_try_init(|| Self::from_config(&NormalizerConfig::default()).map(Arc::new))
            .cloned()
    }

    pub fn stopwords(&self) -> &Stopwords {
        &self.stopwords
    }

    /// First pass: lowercase, letters only, no stopwords
    pub fn clean(&self, text: &str) -> String {
        text.to_lowercase()
            .split_whitespace()
            .map(|word| word.chars().filter(|c| c.is_ascii_lowercase()).collect::<String>())
            // 空になった単語は lemmatizer 側の分割で消えるのでここで落とす
            .filter(|word| !word.is_empty() && !self.stopwords.contains(word))
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn normalize(&self, text: &str) -> Result<String> {
        let cleaned = self.clean(text);
        let lemmas = self.lemmatizer.lemmatize(&cleaned)?;
        Ok(lemmas.split_whitespace().collect::<Vec<_>>().join(" "))
    }

    /// Normalize many texts in parallel, results in input order
    pub fn normalize_all<T>(&self, texts: &[T]) -> Result<Vec<String>>
    where
        T: AsRef<str> + Sync,
    {
        let normalized = texts
            .par_iter()
            .map(|text| self.normalize(text.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        debug!(count = normalized.len(), "normalized texts");
        Ok(normalized)
    }
}
