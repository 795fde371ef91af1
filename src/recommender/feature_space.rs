use std::collections::HashMap;

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::error::{RecommendError, Result};
use crate::recommender::corpus::CorpusMap;

/// Ordered attribute space shared by every instance of one request.
///
/// Attributes are the distinct tokens followed by the distinct label names.
/// Both segments keep first-seen order: tokens are scanned over the target
/// text and then each corpus text, labels over the corpus label sets. The
/// order is never sorted.
///
/// The two segments are kept apart, so a token and a label with the same
/// spelling are two different attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSpace {
    tokens: IndexSet<String>,
    labels: IndexSet<String>,
}

/// Two raw attribute names that become the same identifier once whitespace
/// is removed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizedCollision {
    pub sanitized: String,
    pub first: String,
    pub second: String,
}

/// Attribute name as written in serialized datasets: whitespace removed
pub fn sanitize_attribute_name(name: &str) -> String {
    name.chars().filter(|c| !c.is_whitespace()).collect()
}

impl FeatureSpace {
    /// Build the attribute list for a target text and its corpus.
    ///
    /// # Arguments
    /// * `target` - normalized text of the question to recommend for
    /// * `corpus` - normalized corpus texts with their labels
    pub fn build(target: &str, corpus: &CorpusMap) -> Self {
        let labels = corpus.iter().flat_map(|(_, labels)| labels.iter().cloned());
        Self::build_with_labels(target, corpus, labels)
    }

    /// Same token segment as [`FeatureSpace::build`], label segment taken from
    /// `labels` in the order given.
    ///
    /// Used when the label order must follow the raw records rather than the
    /// merged corpus entries.
    pub fn build_with_labels<L>(target: &str, corpus: &CorpusMap, labels: L) -> Self
    where
        L: IntoIterator<Item = String>,
    {
        let tokens = std::iter::once(target)
            .chain(corpus.texts())
            .flat_map(str::split_whitespace)
            .map(str::to_string)
            .collect();
        Self {
            tokens,
            labels: labels.into_iter().collect(),
        }
    }

    /// Number of attributes (tokens + labels)
    #[inline]
    pub fn len(&self) -> usize {
        self.tokens.len() + self.labels.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Errors on a feature space without attributes
    pub fn ensure_not_empty(&self) -> Result<()> {
        if self.is_empty() {
            return Err(RecommendError::EmptyFeatureSpace);
        }
        Ok(())
    }

    #[inline]
    pub fn num_tokens(&self) -> usize {
        self.tokens.len()
    }

    #[inline]
    pub fn num_labels(&self) -> usize {
        self.labels.len()
    }

    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().map(String::as_str)
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }

    pub fn label_names(&self) -> Vec<String> {
        self.labels.iter().cloned().collect()
    }

    /// All attributes, token segment first
    pub fn attributes(&self) -> impl Iterator<Item = &str> {
        self.tokens().chain(self.labels())
    }

    /// Attribute index of a token
    #[inline]
    pub fn token_index(&self, token: &str) -> Option<usize> {
        self.tokens.get_index_of(token)
    }

    /// Attribute index of a label (offset past the token segment)
    #[inline]
    pub fn label_index(&self, label: &str) -> Option<usize> {
        self.labels.get_index_of(label).map(|idx| self.tokens.len() + idx)
    }

    /// Attribute indices of the label segment
    pub fn label_indices(&self) -> std::ops::Range<usize> {
        self.tokens.len()..self.len()
    }

    /// Sanitized names that more than one raw attribute maps to.
    /// Serialized datasets would contain duplicate identifiers for these.
    pub fn sanitized_collisions(&self) -> Vec<SanitizedCollision> {
        let mut seen: HashMap<String, &str> = HashMap::new();
        let mut collisions = Vec::new();
        for name in self.attributes() {
            let sanitized = sanitize_attribute_name(name);
            match seen.get(&sanitized) {
                Some(first) => collisions.push(SanitizedCollision {
                    sanitized,
                    first: first.to_string(),
                    second: name.to_string(),
                }),
                None => {
                    seen.insert(sanitized, name);
                }
            }
        }
        collisions
    }

    /// Label descriptor document naming the label attributes
    pub fn labels_xml(&self) -> String {
        let mut xml = String::from(
            "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<labels xmlns=\"http://mulan.sourceforge.net/labels\">\n",
        );
        for label in self.labels() {
            xml.push_str("<label name=\"");
            xml.push_str(&sanitize_attribute_name(label));
            xml.push_str("\"></label>\n");
        }
        xml.push_str("</labels>");
        xml
    }
}
