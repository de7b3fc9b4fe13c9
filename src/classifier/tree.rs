use std::collections::BTreeMap;

use super::{mean, Classifier};
use crate::data::Value;

/// Compiled decision tree node. Attributes are resolved to header indices.
#[derive(Debug, Clone)]
pub enum TreeNode {
    /// Normalised class distribution.
    Leaf(Vec<f64>),
    /// `value <= threshold` goes to `le`.
    Numeric {
        attribute: usize,
        threshold: f64,
        le: Box<TreeNode>,
        gt: Box<TreeNode>,
    },
    Nominal {
        attribute: usize,
        branches: BTreeMap<String, TreeNode>,
    },
}

impl TreeNode {
    /// Walk the tree for one record.
    ///
    /// A missing value, or a label with no branch, yields the mean of the
    /// child distributions.
    pub fn distribution(&self, values: &[Value], k: usize) -> Vec<f64> {
        match self {
            TreeNode::Leaf(dist) => dist.clone(),
            TreeNode::Numeric {
                attribute,
                threshold,
                le,
                gt,
            } => match values.get(*attribute).and_then(Value::as_f64) {
                Some(v) if v <= *threshold => le.distribution(values, k),
                Some(_) => gt.distribution(values, k),
                None => mean([le.distribution(values, k), gt.distribution(values, k)], k),
            },
            TreeNode::Nominal {
                attribute,
                branches,
            } => {
                let child = values
                    .get(*attribute)
                    .and_then(Value::as_label)
                    .and_then(|label| branches.get(label));
                match child {
                    Some(node) => node.distribution(values, k),
                    None => mean(branches.values().map(|n| n.distribution(values, k)), k),
                }
            }
        }
    }

    /// Number of leaves below this node.
    pub fn leaves(&self) -> usize {
        match self {
            TreeNode::Leaf(_) => 1,
            TreeNode::Numeric { le, gt, .. } => le.leaves() + gt.leaves(),
            TreeNode::Nominal { branches, .. } => branches.values().map(TreeNode::leaves).sum(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DecisionTree {
    pub root: TreeNode,
    pub num_classes: usize,
}

impl Classifier for DecisionTree {
    fn distribution(&self, values: &[Value]) -> Vec<f64> {
        self.root.distribution(values, self.num_classes)
    }

    fn name(&self) -> &'static str {
        "decision_tree"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// size <= 2.0 ? benign : (side == left ? malignant : 50/50)
    fn tree() -> DecisionTree {
        let mut branches = BTreeMap::new();
        branches.insert("left".to_string(), TreeNode::Leaf(vec![0.0, 1.0]));
        branches.insert("right".to_string(), TreeNode::Leaf(vec![0.5, 0.5]));
        DecisionTree {
            root: TreeNode::Numeric {
                attribute: 0,
                threshold: 2.0,
                le: Box::new(TreeNode::Leaf(vec![1.0, 0.0])),
                gt: Box::new(TreeNode::Nominal {
                    attribute: 1,
                    branches,
                }),
            },
            num_classes: 2,
        }
    }

    fn values(size: Value, side: Value) -> Vec<Value> {
        vec![size, side, Value::Missing]
    }

    #[test]
    fn follows_numeric_and_nominal_splits() {
        let t = tree();
        assert_eq!(
            t.distribution(&values(Value::Numeric(2.0), Value::Nominal("left".into()))),
            vec![1.0, 0.0]
        );
        assert_eq!(
            t.distribution(&values(Value::Numeric(3.5), Value::Nominal("left".into()))),
            vec![0.0, 1.0]
        );
        assert_eq!(
            t.distribution(&values(Value::Numeric(3.5), Value::Nominal("right".into()))),
            vec![0.5, 0.5]
        );
    }

    #[test]
    fn missing_values_average_the_children() {
        let t = tree();
        // nominal side missing: mean of [0,1] and [.5,.5]
        assert_eq!(
            t.distribution(&values(Value::Numeric(9.0), Value::Missing)),
            vec![0.25, 0.75]
        );
        // numeric size missing: mean of [1,0] and [.25,.75]
        assert_eq!(
            t.distribution(&values(Value::Missing, Value::Missing)),
            vec![0.625, 0.375]
        );
    }

    #[test]
    fn counts_leaves() {
        assert_eq!(tree().root.leaves(), 3);
    }
}
