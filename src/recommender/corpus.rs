use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::recommender::normalizer::TextNormalizer;

pub type MetricId = u64;
pub type QuestionId = u64;

/// A previously recorded question together with the names of its metrics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionRecord {
    pub content: String,
    #[serde(default)]
    pub metrics: Vec<String>,
}

impl QuestionRecord {
    pub fn new<S>(content: impl Into<String>, metrics: impl IntoIterator<Item = S>) -> Self
    where
        S: Into<String>,
    {
        Self {
            content: content.into(),
            metrics: metrics.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricRecord {
    pub id: MetricId,
    pub name: String,
}

/// Supplies the training corpus
pub trait QuestionRepository {
    fn find_question(&self, id: QuestionId) -> Result<Option<QuestionRecord>>;
    /// Every stored question except `excluding`, in storage order
    fn list_other_questions(&self, excluding: QuestionId) -> Result<Vec<QuestionRecord>>;
}

/// Exact-name metric lookup
pub trait MetricRepository {
    /// Metrics whose name is one of `names`. Unknown names are simply absent
    fn find_metrics_by_name(&self, names: &[String]) -> Result<Vec<MetricRecord>>;
}

impl<R> MetricRepository for &R
where
    R: MetricRepository + ?Sized,
{
    fn find_metrics_by_name(&self, names: &[String]) -> Result<Vec<MetricRecord>> {
        (**self).find_metrics_by_name(names)
    }
}

impl<R> MetricRepository for std::sync::Arc<R>
where
    R: MetricRepository + ?Sized,
{
    fn find_metrics_by_name(&self, names: &[String]) -> Result<Vec<MetricRecord>> {
        (**self).find_metrics_by_name(names)
    }
}

/// Question with its storage id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredQuestion {
    pub id: QuestionId,
    #[serde(flatten)]
    pub record: QuestionRecord,
}

/// In-memory question and metric storage
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InMemoryStore {
    #[serde(default)]
    pub metrics: Vec<MetricRecord>,
    #[serde(default)]
    pub questions: Vec<StoredQuestion>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_metric(&mut self, id: MetricId, name: impl Into<String>) -> &mut Self {
        self.metrics.push(MetricRecord { id, name: name.into() });
        self
    }

    /// Replaces an existing question with the same id
    pub fn add_question(&mut self, id: QuestionId, record: QuestionRecord) -> &mut Self {
        match self.questions.iter_mut().find(|q| q.id == id) {
            Some(stored) => stored.record = record,
            None => self.questions.push(StoredQuestion { id, record }),
        }
        self
    }
}

impl QuestionRepository for InMemoryStore {
    fn find_question(&self, id: QuestionId) -> Result<Option<QuestionRecord>> {
        Ok(self.questions.iter().find(|q| q.id == id).map(|q| q.record.clone()))
    }

    fn list_other_questions(&self, excluding: QuestionId) -> Result<Vec<QuestionRecord>> {
        Ok(self
            .questions
            .iter()
            .filter(|q| q.id != excluding)
            .map(|q| q.record.clone())
            .collect())
    }
}

impl MetricRepository for InMemoryStore {
    fn find_metrics_by_name(&self, names: &[String]) -> Result<Vec<MetricRecord>> {
        Ok(self
            .metrics
            .iter()
            .filter(|m| names.contains(&m.name))
            .cloned()
            .collect())
    }
}

/// Distinct metric names over the raw records, first-seen order
pub fn distinct_label_names(records: &[QuestionRecord]) -> IndexSet<String> {
    records
        .iter()
        .flat_map(|q| q.metrics.iter().cloned())
        .collect()
}

/// Normalized question text -> label set.
///
/// Keys keep the order in which the corpus was supplied. Records whose text
/// normalizes to the same string share one entry holding the union of their
/// labels.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CorpusMap {
    entries: IndexMap<String, IndexSet<String>>,
}

impl CorpusMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalize every record and merge duplicates
    pub fn build(normalizer: &TextNormalizer, records: &[QuestionRecord]) -> Result<Self> {
        let contents: Vec<&str> = records.iter().map(|q| q.content.as_str()).collect();
        let normalized = normalizer.normalize_all(&contents)?;
        let mut map = Self::new();
        for (text, record) in normalized.into_iter().zip(records) {
            map.insert(text, record.metrics.iter().cloned());
        }
        Ok(map)
    }

    pub fn insert<I>(&mut self, normalized_text: String, labels: I)
    where
        I: IntoIterator<Item = String>,
    {
        self.entries.entry(normalized_text).or_default().extend(labels);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &IndexSet<String>)> {
        self.entries.iter().map(|(text, labels)| (text.as_str(), labels))
    }

    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<S, I> FromIterator<(S, I)> for CorpusMap
where
    S: Into<String>,
    I: IntoIterator,
    I::Item: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (S, I)>>(iter: T) -> Self {
        let mut map = Self::new();
        for (text, labels) in iter {
            map.insert(text.into(), labels.into_iter().map(Into::into));
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::recommender::lemmatizer::PorterLemmatizer;
    use crate::recommender::normalizer::Stopwords;

    #[test]
    fn distinct_labels_keep_first_seen_order() {
        let records = vec![
            QuestionRecord::new("q1", ["Usability", "Security"]),
            QuestionRecord::new("q2", ["Performance", "Usability"]),
            QuestionRecord::new("q3", Vec::<String>::new()),
        ];
        let labels: Vec<_> = distinct_label_names(&records).into_iter().collect();
        assert_eq!(labels, vec!["Usability", "Security", "Performance"]);
    }

    #[test]
    fn build_merges_texts_that_normalize_alike() {
        let normalizer = TextNormalizer::new(Stopwords::english(), Arc::new(PorterLemmatizer::new()));
        let records = vec![
            QuestionRecord::new("How many users?", ["Usage"]),
            QuestionRecord::new("Disk errors", ["Reliability"]),
            QuestionRecord::new("how many USERS", ["Growth", "Usage"]),
        ];
        let map = CorpusMap::build(&normalizer, &records).unwrap();
        assert_eq!(map.len(), 2);
        let entries: Vec<_> = map
            .iter()
            .map(|(t, l)| (t.to_string(), l.iter().cloned().collect::<Vec<_>>()))
            .collect();
        assert_eq!(
            entries,
            vec![
                (normalizer.normalize("many users").unwrap(), vec!["Usage".to_string(), "Growth".to_string()]),
                (normalizer.normalize("disk errors").unwrap(), vec!["Reliability".to_string()]),
            ]
        );
    }

    #[test]
    fn store_excludes_requested_question() {
        let mut store = InMemoryStore::new();
        store
            .add_question(1, QuestionRecord::new("a", ["X"]))
            .add_question(2, QuestionRecord::new("b", ["Y"]))
            .add_question(3, QuestionRecord::new("c", ["Z"]));
        let others = store.list_other_questions(2).unwrap();
        assert_eq!(others.iter().map(|q| q.content.as_str()).collect::<Vec<_>>(), vec!["a", "c"]);
        assert_eq!(store.find_question(3).unwrap().unwrap().content, "c");
        assert!(store.find_question(9).unwrap().is_none());
    }

    #[test]
    fn store_json_shape() {
        let json = r#"{
            "metrics": [{"id": 7, "name": "Security"}],
            "questions": [{"id": 1, "content": "Any breaches?", "metrics": ["Security"]}]
        }"#;
        let store: InMemoryStore = serde_json::from_str(json).unwrap();
        assert_eq!(store.metrics[0].id, 7);
        assert_eq!(store.find_question(1).unwrap().unwrap().metrics, vec!["Security"]);
        let found = store.find_metrics_by_name(&["Security".into(), "Nope".into()]).unwrap();
        assert_eq!(found.len(), 1);
    }
}
