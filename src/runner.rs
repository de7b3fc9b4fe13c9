use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::classifier::{LoadError, Model};
use crate::data::loader::{self, Header};
use crate::data::{Dataset, ParseError, Value};
use crate::report;

#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("dataset does not match the model header: {0}")]
    SchemaMismatch(String),
    #[error("record {row}: classifier produced no usable prediction")]
    Prediction { row: usize },
}

/// A failed run, tagged with the stage that failed.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("loading model {} failed", .path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: LoadError,
    },
    #[error("reading dataset {} failed", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },
    #[error("classification failed")]
    Classify(#[from] ClassifyError),
    #[error("writing the report failed")]
    Output(#[source] std::io::Error),
}

impl RunError {
    /// Process exit status for this failure. 2 is left to clap usage errors.
    pub fn exit_code(&self) -> u8 {
        match self {
            RunError::Load { .. } => 3,
            RunError::Parse { .. } => 4,
            RunError::Classify(_) => 5,
            RunError::Output(_) => 6,
        }
    }
}

// ---------------------------------------------------------------------------
// Classification step
// ---------------------------------------------------------------------------

/// Check that `dataset` has the header `model` was trained on.
pub fn check_compatible(model: &Model, dataset: &Dataset) -> Result<(), ClassifyError> {
    let expected = model.attributes();
    if expected.len() != dataset.attributes.len() {
        return Err(ClassifyError::SchemaMismatch(format!(
            "model has {} attributes, dataset has {}",
            expected.len(),
            dataset.attributes.len()
        )));
    }
    for (i, (want, got)) in expected.iter().zip(&dataset.attributes).enumerate() {
        if want.name != got.name {
            return Err(ClassifyError::SchemaMismatch(format!(
                "attribute {i} is '{}' in the model but '{}' in the dataset",
                want.name, got.name
            )));
        }
        if !want.kind.same_type(&got.kind) {
            return Err(ClassifyError::SchemaMismatch(format!(
                "attribute '{}' has a different type in the dataset",
                want.name
            )));
        }
    }
    if model.class_index() != dataset.class_index {
        return Err(ClassifyError::SchemaMismatch(format!(
            "class attribute is '{}' in the model but '{}' in the dataset",
            model.class_attribute().name,
            dataset.class_attribute().name
        )));
    }
    if model.class_attribute().labels() != dataset.class_attribute().labels() {
        return Err(ClassifyError::SchemaMismatch(format!(
            "class labels of '{}' differ",
            dataset.class_attribute().name
        )));
    }
    Ok(())
}

/// Label every record of `dataset` with `model`, returning a labeled copy.
///
/// Records keep their order and their non-class values.
pub fn classify_dataset(model: &Model, dataset: &Dataset) -> Result<Dataset, ClassifyError> {
    check_compatible(model, dataset)?;

    let mut labeled = dataset.clone();
    for (row, record) in dataset.records.iter().enumerate() {
        let label = model
            .predict(record)
            .ok_or(ClassifyError::Prediction { row })?;
        log::debug!("record {row}: {label}");
        labeled.set_class_value(row, Value::Nominal(label.to_string()));
    }
    Ok(labeled)
}

// ---------------------------------------------------------------------------
// Runner
// ---------------------------------------------------------------------------

/// Loads a model once and labels data files with it.
#[derive(Debug, Clone)]
pub struct Runner {
    model_path: PathBuf,
}

impl Runner {
    pub fn new(model_path: impl Into<PathBuf>) -> Self {
        Runner {
            model_path: model_path.into(),
        }
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    /// Load the model, then the dataset, then classify.
    ///
    /// A model that cannot be loaded aborts before the data file is touched.
    /// CSV data is read against the model's header.
    pub fn label(&self, data_path: &Path) -> Result<Dataset, RunError> {
        let model = Model::load(&self.model_path).map_err(|source| RunError::Load {
            path: self.model_path.clone(),
            source,
        })?;
        let header = Header {
            attributes: model.attributes(),
            class_index: model.class_index(),
        };
        let dataset = loader::load_file_with_header(data_path, Some(header)).map_err(|source| {
            RunError::Parse {
                path: data_path.to_path_buf(),
                source,
            }
        })?;
        let labeled = classify_dataset(&model, &dataset)?;
        log::info!("labeled {} records", labeled.len());
        Ok(labeled)
    }

    /// Label `data_path` and print the report to `out`.
    ///
    /// Nothing is written unless every stage succeeded.
    pub fn run<W: Write>(&self, data_path: &Path, out: &mut W) -> Result<(), RunError> {
        let labeled = self.label(data_path)?;
        report::write_report(out, &labeled).map_err(RunError::Output)
    }
}
