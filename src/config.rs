use std::path::PathBuf;

use clap::Parser;

/// Model used when neither `--model` nor `ARFF_LABELER_MODEL` is given.
pub const DEFAULT_MODEL_PATH: &str = "./models/breast-cancer-demo.json";

/// Label the records of a data file with a previously trained classifier.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Data file with the records to label (.arff, .json or .csv)
    pub data: PathBuf,

    /// Serialized classifier to apply
    #[arg(long, env = "ARFF_LABELER_MODEL", default_value = DEFAULT_MODEL_PATH)]
    pub model: PathBuf,
}
