use super::Classifier;
use crate::data::Value;

/// Wraps a classifier and picks the class with the minimum expected cost.
///
/// `cost_matrix[actual][predicted]` is the cost of predicting `predicted`
/// when the truth is `actual`.
#[derive(Debug)]
pub struct CostSensitive {
    pub cost_matrix: Vec<Vec<f64>>,
    pub inner: Box<dyn Classifier>,
}

impl CostSensitive {
    /// Expected cost of each possible prediction under `dist`.
    pub fn expected_costs(&self, dist: &[f64]) -> Vec<f64> {
        (0..self.cost_matrix.len())
            .map(|predicted| {
                dist.iter()
                    .zip(&self.cost_matrix)
                    .map(|(p, row)| p * row[predicted])
                    .sum::<f64>()
            })
            .collect()
    }
}

impl Classifier for CostSensitive {
    fn distribution(&self, values: &[Value]) -> Vec<f64> {
        let costs = self.expected_costs(&self.inner.distribution(values));
        if costs.iter().any(|c| !c.is_finite()) {
            return vec![f64::NAN; costs.len()];
        }
        let mut out = vec![0.0; costs.len()];
        let mut best = 0;
        for (i, c) in costs.iter().enumerate().skip(1) {
            if *c < costs[best] {
                best = i;
            }
        }
        if let Some(slot) = out.get_mut(best) {
            *slot = 1.0;
        }
        out
    }

    fn name(&self) -> &'static str {
        "cost_sensitive"
    }
}
