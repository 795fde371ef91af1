//! RAndom k-labELsets ensemble.
//!
//! Each member is a label powerset trained on a random subset of `k` labels.
//! At prediction time every member votes on the labels it covers and a label
//! is predicted when the share of positive votes reaches the threshold.

use indexmap::IndexSet;
use num::integer::binomial;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{ClassifierConfig, DEFAULT_SUBSET_SIZE, DEFAULT_THRESHOLD};
use crate::error::{RecommendError, Result};
use crate::recommender::classifier::label_powerset::{LabelPowerset, LabelPowersetModel};
use crate::recommender::classifier::{Bipartition, MultiLabelLearner, MultiLabelModel, MultiLabelOutput};
use crate::recommender::dataset::{Dataset, Instance};

#[derive(Debug, Clone)]
pub struct Rakel {
    base: LabelPowerset,
    subset_size: usize,
    num_models: Option<usize>,
    threshold: f64,
    seed: u64,
}

impl Default for Rakel {
    fn default() -> Self {
        Self {
            base: LabelPowerset::default(),
            subset_size: DEFAULT_SUBSET_SIZE,
            num_models: None,
            threshold: DEFAULT_THRESHOLD,
            seed: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RakelModel {
    num_labels: usize,
    threshold: f64,
    members: Vec<LabelPowersetModel>,
}

impl Rakel {
    pub fn new(base: LabelPowerset, subset_size: usize, threshold: f64, seed: u64) -> Self {
        Self {
            base,
            subset_size,
            num_models: None,
            threshold,
            seed,
        }
    }

    pub fn from_config(config: &ClassifierConfig) -> Self {
        Self {
            base: LabelPowerset::new(config.tree.clone()),
            subset_size: config.subset_size,
            num_models: config.num_models,
            threshold: config.threshold,
            seed: config.seed,
        }
    }

    pub fn with_num_models(mut self, num_models: usize) -> Self {
        self.num_models = Some(num_models);
        self
    }

    /// Labelsets the ensemble would train on for `num_labels` labels
    pub fn labelsets(&self, num_labels: usize) -> Result<Vec<Vec<usize>>> {
        let models = ensemble_size(num_labels, self.subset_size, self.num_models)?;
        Ok(draw_labelsets(num_labels, self.subset_size, models, self.seed))
    }
}

/// Number of ensemble members.
///
/// # Arguments
/// * `num_labels` - labels in the dataset
/// * `k` - labelset size
/// * `requested` - explicit size, `None` for `2 * num_labels`
///
/// # Returns
/// * the size capped at the number of distinct k-labelsets
pub fn ensemble_size(num_labels: usize, k: usize, requested: Option<usize>) -> Result<usize> {
    if k == 0 || k > num_labels {
        return Err(RecommendError::InvalidConfig(format!(
            "labelset size {k} needs between 1 and {num_labels} labels"
        )));
    }
    let distinct = binomial(num_labels as u128, k as u128);
    let wanted = requested.unwrap_or(2 * num_labels) as u128;
    Ok(wanted.min(distinct) as usize)
}

/// `count` distinct sorted k-labelsets, reproducible for a given seed.
/// Callers keep `count` within `ensemble_size`.
pub fn draw_labelsets(num_labels: usize, k: usize, count: usize, seed: u64) -> Vec<Vec<usize>> {
    if count as u128 >= binomial(num_labels as u128, k as u128) {
        return all_labelsets(num_labels, k);
    }
    let mut rng = StdRng::seed_from_u64(seed);
    let mut drawn: IndexSet<Vec<usize>> = IndexSet::with_capacity(count);
    while drawn.len() < count {
        let mut subset = rand::seq::index::sample(&mut rng, num_labels, k).into_vec();
        subset.sort_unstable();
        drawn.insert(subset);
    }
    drawn.into_iter().collect()
}

/// Every k-labelset in lexicographic order
fn all_labelsets(num_labels: usize, k: usize) -> Vec<Vec<usize>> {
    let mut out = Vec::new();
    if k > num_labels {
        return out;
    }
    let mut current: Vec<usize> = (0..k).collect();
    loop {
        out.push(current.clone());
        // 右端から増やせる位置を探す
        let Some(pos) = (0..k).rev().find(|&i| current[i] < num_labels - k + i) else {
            return out;
        };
        current[pos] += 1;
        for i in pos + 1..k {
            current[i] = current[i - 1] + 1;
        }
    }
}

impl MultiLabelLearner for Rakel {
    type Model = RakelModel;

    fn build(&self, dataset: &Dataset) -> Result<RakelModel> {
        let num_labels = dataset.num_labels();
        let labelsets = self.labelsets(num_labels)?;
        debug!(
            labels = num_labels,
            k = self.subset_size,
            models = labelsets.len(),
            "training RAkEL ensemble"
        );
        let members = labelsets
            .par_iter()
            .map(|labels| self.base.fit_subset(dataset, labels))
            .collect::<Result<Vec<_>>>()?;
        Ok(RakelModel {
            num_labels,
            threshold: self.threshold,
            members,
        })
    }
}

impl RakelModel {
    pub fn members(&self) -> &[LabelPowersetModel] {
        &self.members
    }
}

impl MultiLabelModel for RakelModel {
    /// Confidence of a label is the share of covering members voting for it
    fn make_prediction(&self, instance: &Instance) -> Result<MultiLabelOutput> {
        let mut sum_votes = vec![0usize; self.num_labels];
        let mut length_votes = vec![0usize; self.num_labels];

        for member in &self.members {
            let combination = member.predict_combination(instance)?;
            for (pos, &label) in member.labels().iter().enumerate() {
                if combination.get(pos) {
                    sum_votes[label] += 1;
                }
                length_votes[label] += 1;
            }
        }

        let confidences: Vec<f64> = sum_votes
            .iter()
            .zip(&length_votes)
            .map(|(&votes, &length)| if length == 0 { 0.0 } else { votes as f64 / length as f64 })
            .collect();
        let bits = confidences
            .iter()
            .zip(&length_votes)
            .map(|(&share, &length)| length > 0 && share >= self.threshold);
        Ok(MultiLabelOutput::new(
            Some(Bipartition::from_bools(bits)),
            Some(confidences),
        ))
    }
}
