use std::io::{self, Write};

use crate::data::Dataset;

/// Line printed before the labeled dataset.
pub const HEADER: &str = "New, labeled = ";

/// Full report text: blank line, header, the dataset as ARFF.
pub fn render(dataset: &Dataset) -> String {
    format!("\n{HEADER}\n{dataset}\n")
}

/// Write the report in one piece.
pub fn write_report<W: Write>(out: &mut W, dataset: &Dataset) -> io::Result<()> {
    out.write_all(render(dataset).as_bytes())?;
    out.flush()
}
