use super::tree::TreeNode;
use super::{argmax, mean, Classifier};
use crate::data::Value;

/// Bagged trees; the distribution is the mean over all trees.
#[derive(Debug, Clone)]
pub struct RandomForest {
    pub trees: Vec<TreeNode>,
    pub num_classes: usize,
}

impl Classifier for RandomForest {
    fn distribution(&self, values: &[Value]) -> Vec<f64> {
        mean(
            self.trees
                .iter()
                .map(|t| t.distribution(values, self.num_classes)),
            self.num_classes,
        )
    }

    fn name(&self) -> &'static str {
        "random_forest"
    }
}

/// Boosted committee. Every member votes for its most probable class with
/// its weight; vote totals are turned into probabilities with a softmax.
#[derive(Debug)]
pub struct AdaBoost {
    pub members: Vec<(f64, Box<dyn Classifier>)>,
    pub num_classes: usize,
}

impl Classifier for AdaBoost {
    fn distribution(&self, values: &[Value]) -> Vec<f64> {
        if let [(_, only)] = self.members.as_slice() {
            return only.distribution(values);
        }
        let mut votes = vec![0.0; self.num_classes];
        for (weight, member) in &self.members {
            if let Some(class) = argmax(&member.distribution(values)) {
                votes[class] += weight;
            }
        }
        softmax(&votes)
    }

    fn name(&self) -> &'static str {
        "ada_boost"
    }
}

fn softmax(logits: &[f64]) -> Vec<f64> {
    let max = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exp: Vec<f64> = logits.iter().map(|l| (l - max).exp()).collect();
    let sum: f64 = exp.iter().sum();
    exp.into_iter().map(|e| e / sum).collect()
}
