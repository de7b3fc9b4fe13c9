//! Apply a previously trained classifier to the records of an ARFF file.
//!
//! The run is a straight line: [`classifier::Model::load`], then
//! [`data::loader::load_file`], then [`runner::classify_dataset`], then
//! [`report::write_report`]. [`runner::Runner`] ties the stages together.

pub mod classifier;
pub mod config;
pub mod data;
pub mod report;
pub mod runner;
