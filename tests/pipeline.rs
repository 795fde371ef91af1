use std::sync::Arc;

use indexmap::IndexSet;
use metric_recommender::recommender::normalizer::Stopwords;
use metric_recommender::{
    CorpusMap, DatasetEncoder, FeatureSpace, InMemoryStore, MetricRecommender, QuestionRecord,
    PorterLemmatizer, RecommenderConfig, TextNormalizer,
};
use proptest::prelude::*;

fn normalizer() -> Arc<TextNormalizer> {
    Arc::new(TextNormalizer::new(Stopwords::english(), Arc::new(PorterLemmatizer::new())))
}

fn metrics() -> InMemoryStore {
    let mut store = InMemoryStore::new();
    store
        .add_metric(101, "Performance")
        .add_metric(102, "Usability")
        .add_metric(103, "Security");
    store
}

fn corpus() -> Vec<QuestionRecord> {
    vec![
        QuestionRecord::new(
            "How long does the checkout page take to load under heavy traffic?",
            ["Performance", "Usability"],
        ),
        QuestionRecord::new(
            "What is the response time of the payment service under heavy load?",
            ["Performance", "Security"],
        ),
        QuestionRecord::new(
            "Can new customers complete the signup form without help?",
            ["Usability", "Security"],
        ),
        QuestionRecord::new(
            "Are customer passwords hashed before they are stored?",
            ["Security", "Usability"],
        ),
    ]
}

#[test]
fn recommends_only_known_metrics() {
    let store = metrics();
    let rec = MetricRecommender::new(normalizer(), RecommenderConfig::default(), &store).unwrap();
    let ids = rec
        .recommend_metrics("Does the checkout page load slowly under heavy traffic?", &corpus())
        .unwrap();
    assert!(ids.iter().all(|id| [101, 102, 103].contains(id)), "{ids:?}");
    let unique: IndexSet<_> = ids.iter().collect();
    assert_eq!(unique.len(), ids.len(), "{ids:?}");
}

#[test]
fn recommendation_is_deterministic() {
    let store = metrics();
    let rec = MetricRecommender::new(normalizer(), RecommenderConfig::default(), &store).unwrap();
    let target = "What is the response time of checkout under load?";
    assert_eq!(
        rec.recommend_metrics(target, &corpus()).unwrap(),
        rec.recommend_metrics(target, &corpus()).unwrap()
    );
}

#[test]
fn fewer_than_three_labels_gives_nothing() {
    let store = metrics();
    let rec = MetricRecommender::new(normalizer(), RecommenderConfig::default(), &store).unwrap();
    let corpus: Vec<QuestionRecord> = (0..20)
        .map(|i| {
            let label = if i % 2 == 0 { "Performance" } else { "Usability" };
            QuestionRecord::new(format!("question number {i} about load"), [label])
        })
        .collect();
    assert!(rec.recommend_metrics("load", &corpus).unwrap().is_empty());
}

#[test]
fn empty_corpus_gives_nothing() {
    let store = metrics();
    let rec = MetricRecommender::new(normalizer(), RecommenderConfig::default(), &store).unwrap();
    assert!(rec.recommend_metrics("anything at all", &[]).unwrap().is_empty());
}

#[test]
fn stored_question_is_excluded_from_its_own_corpus() {
    let mut store = metrics();
    for (id, record) in (1..).zip(corpus()) {
        store.add_question(id, record);
    }
    let rec = MetricRecommender::new(normalizer(), RecommenderConfig::default(), &store).unwrap();
    let ids = rec.recommend_for_question(1, &store).unwrap();
    assert!(ids.iter().all(|id| [101, 102, 103].contains(id)));
}

#[test]
fn token_segment_example() {
    let corpus: CorpusMap = vec![("a b", vec!["X"]), ("b c", vec!["Y"])].into_iter().collect();
    let space = FeatureSpace::build("a c", &corpus);
    assert_eq!(space.tokens().collect::<Vec<_>>(), vec!["a", "c", "b"]);
    assert_eq!(space.attributes().collect::<Vec<_>>(), vec!["a", "c", "b", "X", "Y"]);
}

fn word() -> impl Strategy<Value = String> {
    "[a-f]{1,2}"
}

fn entries() -> impl Strategy<Value = Vec<(Vec<String>, Vec<String>)>> {
    prop::collection::vec(
        (
            prop::collection::vec(word(), 0..5),
            prop::collection::vec("[A-D]", 0..3),
        ),
        0..6,
    )
}

fn first_seen<'a>(items: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for item in items {
        if !out.iter().any(|seen| seen == item) {
            out.push(item.to_string());
        }
    }
    out
}

proptest! {
    #[test]
    fn feature_space_is_first_seen_ordered(target in prop::collection::vec(word(), 0..5), entries in entries()) {
        let target = target.join(" ");
        let corpus: CorpusMap = entries
            .iter()
            .map(|(words, labels)| (words.join(" "), labels.clone()))
            .collect();
        let space = FeatureSpace::build(&target, &corpus);

        let expected_tokens = first_seen(
            std::iter::once(target.as_str())
                .chain(entries.iter().flat_map(|(words, _)| words.iter().map(String::as_str)))
                .flat_map(str::split_whitespace),
        );
        let expected_labels = first_seen(entries.iter().flat_map(|(_, labels)| labels.iter().map(String::as_str)));
        prop_assert_eq!(space.tokens().collect::<Vec<_>>(), expected_tokens.clone());
        prop_assert_eq!(space.label_names(), expected_labels.clone());
        prop_assert_eq!(space.len(), expected_tokens.len() + expected_labels.len());
    }

    #[test]
    fn encoding_matches_membership(target in prop::collection::vec(word(), 1..5), entries in entries()) {
        let target = target.join(" ");
        let corpus: CorpusMap = entries
            .iter()
            .map(|(words, labels)| (words.join(" "), labels.clone()))
            .collect();
        let encoder = DatasetEncoder::new(Arc::new(FeatureSpace::build(&target, &corpus)));
        let space = Arc::clone(encoder.feature_space());
        let data = encoder.encode_corpus(&corpus).unwrap();
        prop_assert_eq!(data.num_instances(), corpus.len());
        prop_assert_eq!(&data, &encoder.encode_corpus(&corpus).unwrap());

        for ((text, labels), instance) in corpus.iter().zip(data.instances()) {
            let tokens: Vec<&str> = text.split_whitespace().collect();
            for (idx, attribute) in space.attributes().enumerate() {
                let expected = if idx < space.num_tokens() {
                    tokens.contains(&attribute)
                } else {
                    labels.contains(attribute)
                };
                prop_assert_eq!(instance.get(idx), expected);
            }
        }

        let input = encoder.encode_input(&target).unwrap();
        prop_assert_eq!(input.num_instances(), 1);
        prop_assert_eq!(input.instances()[0].label_bits(&space).count_ones(), 0);
    }
}
