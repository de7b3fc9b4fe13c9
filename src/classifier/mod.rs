/// Classifier layer: persisted model format and inference.
///
/// ```text
///   model.json
///        │
///        ▼
///   ┌──────────┐
///   │ persist   │  ModelFile → validated, compiled Model
///   └──────────┘
///        │
///        ▼
///   ┌──────────────────────────────┐
///   │ tree / ensemble / cost        │  Classifier::distribution(values)
///   └──────────────────────────────┘
/// ```
pub mod cost;
pub mod ensemble;
pub mod persist;
pub mod tree;

use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::data::{Attribute, Record, Value};

pub use persist::{ClassifierDef, MemberDef, ModelFile, NodeDef};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot read {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("not a valid model file: {0}")]
    Format(#[from] serde_json::Error),
    #[error("inconsistent model: {0}")]
    Invalid(String),
}

// ---------------------------------------------------------------------------
// Classifier – the inference capability
// ---------------------------------------------------------------------------

/// A trained classifier over a fixed header.
pub trait Classifier: fmt::Debug {
    /// Class membership probabilities for one record, indexed like the
    /// class attribute's labels.
    fn distribution(&self, values: &[Value]) -> Vec<f64>;

    /// Short name for logs.
    fn name(&self) -> &'static str;
}

/// Index of the largest entry; ties go to the lowest index.
///
/// `None` for an empty or non-finite distribution.
pub fn argmax(dist: &[f64]) -> Option<usize> {
    if dist.is_empty() || dist.iter().any(|p| !p.is_finite()) {
        return None;
    }
    let mut best = 0;
    for (i, p) in dist.iter().enumerate().skip(1) {
        if *p > dist[best] {
            best = i;
        }
    }
    Some(best)
}

/// Element-wise mean of several distributions of length `k`.
pub(crate) fn mean<I>(dists: I, k: usize) -> Vec<f64>
where
    I: IntoIterator<Item = Vec<f64>>,
{
    let mut sum = vec![0.0; k];
    let mut n = 0usize;
    for dist in dists {
        for (s, p) in sum.iter_mut().zip(dist) {
            *s += p;
        }
        n += 1;
    }
    if n > 0 {
        sum.iter_mut().for_each(|s| *s /= n as f64);
    }
    sum
}

/// Predicts the training prior regardless of the record.
#[derive(Debug, Clone)]
pub struct ZeroR {
    pub distribution: Vec<f64>,
}

impl Classifier for ZeroR {
    fn distribution(&self, _values: &[Value]) -> Vec<f64> {
        self.distribution.clone()
    }

    fn name(&self) -> &'static str {
        "zero_r"
    }
}

// ---------------------------------------------------------------------------
// Model – classifier plus the header it was trained on
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct Model {
    relation: String,
    attributes: Vec<Attribute>,
    class_index: usize,
    classifier: Box<dyn Classifier>,
}

impl Model {
    pub(crate) fn new(
        relation: String,
        attributes: Vec<Attribute>,
        class_index: usize,
        classifier: Box<dyn Classifier>,
    ) -> Self {
        Model {
            relation,
            attributes,
            class_index,
            classifier,
        }
    }

    /// Read and validate a model file.
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let text = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let model = Self::from_json(&text)?;
        log::info!(
            "loaded {} model for relation '{}' from {} ({} classes)",
            model.kind(),
            model.relation,
            path.display(),
            model.class_attribute().labels().len()
        );
        Ok(model)
    }

    pub fn from_json(text: &str) -> Result<Self, LoadError> {
        let file: ModelFile = serde_json::from_str(text)?;
        file.compile()
    }

    pub fn relation(&self) -> &str {
        &self.relation
    }

    /// Attributes of the training header, class included.
    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn class_index(&self) -> usize {
        self.class_index
    }

    pub fn class_attribute(&self) -> &Attribute {
        &self.attributes[self.class_index]
    }

    pub fn kind(&self) -> &'static str {
        self.classifier.name()
    }

    pub fn distribution(&self, record: &Record) -> Vec<f64> {
        self.classifier.distribution(&record.values)
    }

    /// Most probable class label, `None` when the distribution is unusable.
    pub fn predict(&self, record: &Record) -> Option<&str> {
        let dist = self.distribution(record);
        argmax(&dist).and_then(|i| self.class_attribute().labels().get(i).map(String::as_str))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argmax_prefers_lowest_index_on_ties() {
        assert_eq!(argmax(&[0.4, 0.4, 0.2]), Some(0));
        assert_eq!(argmax(&[0.1, 0.2, 0.7]), Some(2));
        assert_eq!(argmax(&[]), None);
        assert_eq!(argmax(&[0.5, f64::NAN]), None);
    }

    #[test]
    fn mean_of_distributions() {
        let m = mean(vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![0.5, 0.5]], 2);
        assert_eq!(m, vec![0.5, 0.5]);
        assert_eq!(mean(Vec::<Vec<f64>>::new(), 2), vec![0.0, 0.0]);
    }

    #[test]
    fn zero_r_predicts_prior() {
        let model = Model::from_json(
            r#"{
                "relation": "r",
                "attributes": [
                    {"name": "x", "type": "numeric"},
                    {"name": "c", "type": "nominal", "labels": ["a", "b"]}
                ],
                "classifier": {"kind": "zero_r", "distribution": [1, 3]}
            }"#,
        )
        .unwrap();
        let record = Record {
            values: vec![Value::Numeric(1.0), Value::Missing],
        };
        assert_eq!(model.kind(), "zero_r");
        assert_eq!(model.distribution(&record), vec![0.25, 0.75]);
        assert_eq!(model.predict(&record), Some("b"));
    }

    #[test]
    fn missing_model_file_is_an_io_error() {
        let err = Model::load(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }

    #[test]
    fn garbage_is_a_format_error() {
        assert!(matches!(
            Model::from_json("\u{0}\u{1}not json").unwrap_err(),
            LoadError::Format(_)
        ));
    }
}
