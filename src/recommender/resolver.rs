use tracing::{debug, warn};

use crate::error::{RecommendError, Result};
use crate::recommender::classifier::Bipartition;
use crate::recommender::corpus::{MetricId, MetricRepository};

/// Maps a predicted bipartition back to metric ids
#[derive(Debug, Clone)]
pub struct MetricResolver<R> {
    repository: R,
}

impl<R> MetricResolver<R>
where
    R: MetricRepository,
{
    pub fn new(repository: R) -> Self {
        Self { repository }
    }

    /// Names of the labels whose bit is set, in label order
    pub fn selected_names(bipartition: &Bipartition, label_names: &[String]) -> Result<Vec<String>> {
        if bipartition.len() != label_names.len() {
            return Err(RecommendError::Classifier(format!(
                "bipartition has {} labels, expected {}",
                bipartition.len(),
                label_names.len()
            )));
        }
        Ok(bipartition
            .selected()
            .map(|idx| label_names[idx].clone())
            .collect())
    }

    /// Ids of the predicted metrics, ordered like the selected label names.
    ///
    /// Names without a stored metric are dropped. A name stored under several
    /// ids yields all of them.
    pub fn resolve(&self, bipartition: &Bipartition, label_names: &[String]) -> Result<Vec<MetricId>> {
        let selected = Self::selected_names(bipartition, label_names)?;
        if selected.is_empty() {
            return Ok(Vec::new());
        }
        debug!(labels = ?selected, "predicted labels");

        let records = self.repository.find_metrics_by_name(&selected)?;
        let mut ids = Vec::with_capacity(selected.len());
        for name in &selected {
            let before = ids.len();
            ids.extend(records.iter().filter(|m| &m.name == name).map(|m| m.id));
            if ids.len() == before {
                warn!(metric = %name, "predicted label has no stored metric, dropped");
            }
        }
        Ok(ids)
    }
}
