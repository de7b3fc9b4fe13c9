use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::cost::CostSensitive;
use super::ensemble::{AdaBoost, RandomForest};
use super::tree::{DecisionTree, TreeNode};
use super::{Classifier, LoadError, Model, ZeroR};
use crate::data::{Attribute, AttributeKind};

// ---------------------------------------------------------------------------
// On-disk layout
// ---------------------------------------------------------------------------

/// A trained model as stored on disk.
///
/// ```json
/// {
///   "relation": "breast-cancer",
///   "attributes": [
///     { "name": "deg-malig", "type": "numeric" },
///     { "name": "Class", "type": "nominal", "labels": ["no", "yes"] }
///   ],
///   "classifier": {
///     "kind": "decision_tree",
///     "root": { "node": "numeric", "attribute": "deg-malig", "threshold": 2,
///               "le": { "node": "leaf", "distribution": [30, 5] },
///               "gt": { "node": "leaf", "distribution": [10, 20] } }
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelFile {
    #[serde(default)]
    pub relation: String,
    pub attributes: Vec<Attribute>,
    /// Class attribute name; the last attribute when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    pub classifier: ClassifierDef,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClassifierDef {
    ZeroR {
        distribution: Vec<f64>,
    },
    DecisionTree {
        root: NodeDef,
    },
    RandomForest {
        trees: Vec<NodeDef>,
    },
    AdaBoost {
        members: Vec<MemberDef>,
    },
    CostSensitive {
        cost_matrix: Vec<Vec<f64>>,
        classifier: Box<ClassifierDef>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberDef {
    pub weight: f64,
    pub classifier: ClassifierDef,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum NodeDef {
    Leaf {
        distribution: Vec<f64>,
    },
    Numeric {
        attribute: String,
        threshold: f64,
        le: Box<NodeDef>,
        gt: Box<NodeDef>,
    },
    Nominal {
        attribute: String,
        branches: BTreeMap<String, NodeDef>,
    },
}

// ---------------------------------------------------------------------------
// Validation and compilation
// ---------------------------------------------------------------------------

fn invalid(message: impl Into<String>) -> LoadError {
    LoadError::Invalid(message.into())
}

/// Training header the classifier definitions are checked against.
struct Header<'a> {
    attributes: &'a [Attribute],
    class_index: usize,
    num_classes: usize,
}

impl Header<'_> {
    fn resolve(&self, name: &str) -> Result<(usize, &Attribute), LoadError> {
        let index = self
            .attributes
            .iter()
            .position(|a| a.name == name)
            .ok_or_else(|| invalid(format!("split on unknown attribute '{name}'")))?;
        if index == self.class_index {
            return Err(invalid(format!("split on class attribute '{name}'")));
        }
        Ok((index, &self.attributes[index]))
    }

    /// Check arity and sign, then normalise. All zeros become uniform.
    fn distribution(&self, raw: Vec<f64>) -> Result<Vec<f64>, LoadError> {
        if raw.len() != self.num_classes {
            return Err(invalid(format!(
                "distribution has {} entries, expected {}",
                raw.len(),
                self.num_classes
            )));
        }
        if raw.iter().any(|p| !p.is_finite() || *p < 0.0) {
            return Err(invalid("distribution entries must be finite and non-negative"));
        }
        let sum: f64 = raw.iter().sum();
        if sum == 0.0 {
            return Ok(vec![1.0 / self.num_classes as f64; self.num_classes]);
        }
        Ok(raw.into_iter().map(|p| p / sum).collect())
    }

    fn node(&self, def: NodeDef) -> Result<TreeNode, LoadError> {
        match def {
            NodeDef::Leaf { distribution } => Ok(TreeNode::Leaf(self.distribution(distribution)?)),
            NodeDef::Numeric {
                attribute,
                threshold,
                le,
                gt,
            } => {
                let (index, attr) = self.resolve(&attribute)?;
                if attr.kind != AttributeKind::Numeric {
                    return Err(invalid(format!(
                        "numeric split on non-numeric attribute '{attribute}'"
                    )));
                }
                if !threshold.is_finite() {
                    return Err(invalid(format!("non-finite threshold on '{attribute}'")));
                }
                Ok(TreeNode::Numeric {
                    attribute: index,
                    threshold,
                    le: Box::new(self.node(*le)?),
                    gt: Box::new(self.node(*gt)?),
                })
            }
            NodeDef::Nominal {
                attribute,
                branches,
            } => {
                let (index, attr) = self.resolve(&attribute)?;
                if !matches!(attr.kind, AttributeKind::Nominal { .. }) {
                    return Err(invalid(format!(
                        "nominal split on non-nominal attribute '{attribute}'"
                    )));
                }
                if branches.is_empty() {
                    return Err(invalid(format!("nominal split on '{attribute}' has no branches")));
                }
                let mut compiled = BTreeMap::new();
                for (label, child) in branches {
                    if attr.label_index(&label).is_none() {
                        return Err(invalid(format!(
                            "branch '{label}' is not a label of '{attribute}'"
                        )));
                    }
                    compiled.insert(label, self.node(child)?);
                }
                Ok(TreeNode::Nominal {
                    attribute: index,
                    branches: compiled,
                })
            }
        }
    }

    fn classifier(&self, def: ClassifierDef) -> Result<Box<dyn Classifier>, LoadError> {
        let k = self.num_classes;
        let classifier: Box<dyn Classifier> = match def {
            ClassifierDef::ZeroR { distribution } => Box::new(ZeroR {
                distribution: self.distribution(distribution)?,
            }),
            ClassifierDef::DecisionTree { root } => {
                let root = self.node(root)?;
                log::debug!("decision tree with {} leaves", root.leaves());
                Box::new(DecisionTree {
                    root,
                    num_classes: k,
                })
            }
            ClassifierDef::RandomForest { trees } => {
                if trees.is_empty() {
                    return Err(invalid("random forest has no trees"));
                }
                let trees = trees
                    .into_iter()
                    .map(|t| self.node(t))
                    .collect::<Result<Vec<_>, _>>()?;
                log::debug!("random forest with {} trees", trees.len());
                Box::new(RandomForest {
                    trees,
                    num_classes: k,
                })
            }
            ClassifierDef::AdaBoost { members } => {
                if members.is_empty() {
                    return Err(invalid("boosted ensemble has no members"));
                }
                let mut compiled = Vec::with_capacity(members.len());
                for member in members {
                    if !member.weight.is_finite() || member.weight < 0.0 {
                        return Err(invalid(format!("invalid member weight {}", member.weight)));
                    }
                    compiled.push((member.weight, self.classifier(member.classifier)?));
                }
                Box::new(AdaBoost {
                    members: compiled,
                    num_classes: k,
                })
            }
            ClassifierDef::CostSensitive {
                cost_matrix,
                classifier,
            } => {
                if cost_matrix.len() != k || cost_matrix.iter().any(|row| row.len() != k) {
                    return Err(invalid(format!("cost matrix must be {k}x{k}")));
                }
                if cost_matrix.iter().flatten().any(|c| !c.is_finite()) {
                    return Err(invalid("cost matrix entries must be finite"));
                }
                Box::new(CostSensitive {
                    cost_matrix,
                    inner: self.classifier(*classifier)?,
                })
            }
        };
        Ok(classifier)
    }
}

impl ModelFile {
    /// Validate the header and classifier and build the runtime [`Model`].
    pub fn compile(self) -> Result<Model, LoadError> {
        if self.attributes.is_empty() {
            return Err(invalid("model declares no attributes"));
        }
        let class_index = match &self.class {
            Some(name) => self
                .attributes
                .iter()
                .position(|a| &a.name == name)
                .ok_or_else(|| invalid(format!("unknown class attribute '{name}'")))?,
            None => self.attributes.len() - 1,
        };
        let class_attr = &self.attributes[class_index];
        let num_classes = match &class_attr.kind {
            AttributeKind::Nominal { labels } if !labels.is_empty() => labels.len(),
            _ => {
                return Err(invalid(format!(
                    "class attribute '{}' must be nominal with at least one label",
                    class_attr.name
                )));
            }
        };

        let header = Header {
            attributes: &self.attributes,
            class_index,
            num_classes,
        };
        let classifier = header.classifier(self.classifier)?;

        Ok(Model::new(self.relation, self.attributes, class_index, classifier))
    }
}
