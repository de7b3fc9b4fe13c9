use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value as JsonValue;

use super::model::{Attribute, AttributeKind, Dataset, Record, Value};
use super::ParseError;

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Header a data file is read against when the file cannot declare one itself.
#[derive(Debug, Clone, Copy)]
pub struct Header<'a> {
    pub attributes: &'a [Attribute],
    pub class_index: usize,
}

/// Load a dataset from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.arff` – attribute-relation file; the class is the last attribute
/// * `.json` – `{ "attributes": [...], "class": "...", "data": [[...], ...] }`
/// * `.csv`  – header row of names, column types inferred from the cells
pub fn load_file(path: &Path) -> Result<Dataset, ParseError> {
    load_file_with_header(path, None)
}

/// Like [`load_file`], but CSV columns take their names, types and label
/// order from `header` instead of being inferred. ARFF and JSON files carry
/// their own header and ignore it.
pub fn load_file_with_header(
    path: &Path,
    header: Option<Header<'_>>,
) -> Result<Dataset, ParseError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    let relation = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("dataset");

    let dataset = match ext.as_str() {
        "arff" => parse_arff(&read_text(path)?, relation)?,
        "json" => parse_json(&read_text(path)?, relation)?,
        "csv" => {
            let file = std::fs::File::open(path).map_err(|source| ParseError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            match header {
                Some(header) => parse_csv_with_header(file, relation, header)?,
                None => parse_csv(file, relation)?,
            }
        }
        other => return Err(ParseError::UnsupportedExtension(other.to_string())),
    };

    log::info!(
        "loaded {} records with {} attributes from {} (class attribute '{}')",
        dataset.len(),
        dataset.attributes.len(),
        path.display(),
        dataset.class_attribute().name
    );
    Ok(dataset)
}

fn read_text(path: &Path) -> Result<String, ParseError> {
    std::fs::read_to_string(path).map_err(|source| ParseError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn syntax(line: u64, message: impl Into<String>) -> ParseError {
    ParseError::Syntax {
        line,
        message: message.into(),
    }
}

// ---------------------------------------------------------------------------
// ARFF loader
// ---------------------------------------------------------------------------

/// Parse ARFF text.
///
/// ```text
/// % comment
/// @relation weather
/// @attribute outlook {sunny, overcast, rainy}
/// @attribute temperature numeric
/// @attribute play {yes, no}
/// @data
/// sunny,85,?
/// ```
///
/// ARFF has no way to mark the class attribute, so the last one is used.
pub fn parse_arff(text: &str, default_relation: &str) -> Result<Dataset, ParseError> {
    let mut relation = None;
    let mut attributes = Vec::new();
    let mut data_start = None;
    let mut offset = 0;
    let mut line_no: u64 = 0;

    for raw in text.split_inclusive('\n') {
        line_no += 1;
        offset += raw.len();
        let line = raw.trim();
        if line.is_empty() || line.starts_with('%') {
            continue;
        }
        let (keyword, rest) = match line.split_once(char::is_whitespace) {
            Some((k, r)) => (k, r.trim_start()),
            None => (line, ""),
        };
        match keyword.to_ascii_lowercase().as_str() {
            "@relation" => relation = Some(take_token(rest, line_no)?.0),
            "@attribute" => attributes.push(parse_attribute(rest, line_no)?),
            "@data" => {
                data_start = Some((offset, line_no));
                break;
            }
            _ => return Err(syntax(line_no, format!("unexpected header line '{line}'"))),
        }
    }

    let (offset, header_lines) =
        data_start.ok_or_else(|| syntax(line_no, "missing @data section"))?;
    if attributes.is_empty() {
        return Err(ParseError::NoAttributes);
    }

    let mut records = Vec::new();
    for (i, raw) in text[offset..].lines().enumerate() {
        let line_no = header_lines + 1 + i as u64;
        let line = raw.trim();
        if line.is_empty() || line.starts_with('%') {
            continue;
        }
        if line.starts_with('{') {
            return Err(syntax(line_no, "sparse instances are not supported"));
        }
        let fields = split_fields(line, line_no)?;
        if fields.len() != attributes.len() {
            return Err(syntax(
                line_no,
                format!("expected {} values, found {}", attributes.len(), fields.len()),
            ));
        }
        let values = attributes
            .iter()
            .zip(fields)
            .map(|(attr, field)| {
                if !field.quoted && field.text == "?" {
                    Ok(Value::Missing)
                } else {
                    attr.parse_present(&field.text)
                        .map_err(|e| syntax(line_no, e.to_string()))
                }
            })
            .collect::<Result<Vec<_>, _>>()?;
        records.push(Record { values });
    }

    Dataset::new(
        relation.unwrap_or_else(|| default_relation.to_string()),
        attributes,
        None,
        records,
    )
}

/// `<name> <type>` following the `@attribute` keyword.
fn parse_attribute(rest: &str, line: u64) -> Result<Attribute, ParseError> {
    let (name, tail) = take_token(rest, line)?;
    let ty = tail.trim();

    let kind = if let Some(inner) = ty.strip_prefix('{') {
        let inner = inner
            .strip_suffix('}')
            .ok_or_else(|| syntax(line, format!("unterminated label list for '{name}'")))?;
        let labels: Vec<String> = split_fields(inner, line)?
            .into_iter()
            .map(|f| f.text)
            .collect();
        if labels.iter().all(|l| l.is_empty()) {
            return Err(syntax(line, format!("empty label list for '{name}'")));
        }
        AttributeKind::Nominal { labels }
    } else {
        let (word, rest) = match ty.split_once(char::is_whitespace) {
            Some((w, r)) => (w, r.trim()),
            None => (ty, ""),
        };
        match word.to_ascii_lowercase().as_str() {
            "numeric" | "real" | "integer" => AttributeKind::Numeric,
            "string" => AttributeKind::String,
            "date" => AttributeKind::Date {
                format: if rest.is_empty() {
                    None
                } else {
                    Some(take_token(rest, line)?.0)
                },
            },
            "relational" => {
                return Err(syntax(line, "relational attributes are not supported"));
            }
            "" => return Err(syntax(line, format!("missing type for '{name}'"))),
            other => return Err(syntax(line, format!("unknown attribute type '{other}'"))),
        }
    };

    Ok(Attribute { name, kind })
}

/// One comma-separated cell, unquoted.
struct Field {
    text: String,
    quoted: bool,
}

fn unescape(c: char) -> char {
    match c {
        'n' => '\n',
        't' => '\t',
        'r' => '\r',
        other => other,
    }
}

/// Split a row or label list on commas, honouring `'`/`"` quotes and `\` escapes.
///
/// An unquoted `%` starts a comment that runs to the end of the line.
fn split_fields(line: &str, line_no: u64) -> Result<Vec<Field>, ParseError> {
    let mut fields = Vec::new();
    let mut chars = line.chars().peekable();

    loop {
        while chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
        }
        let mut text = String::new();
        let quoted = matches!(chars.peek(), Some('\'' | '"'));

        if quoted {
            let Some(q) = chars.next() else { break };
            let mut closed = false;
            while let Some(c) = chars.next() {
                match c {
                    '\\' => {
                        if let Some(e) = chars.next() {
                            text.push(unescape(e));
                        }
                    }
                    c if c == q => {
                        closed = true;
                        break;
                    }
                    c => text.push(c),
                }
            }
            if !closed {
                return Err(syntax(line_no, "unterminated quoted value"));
            }
            while chars.peek().is_some_and(|c| c.is_whitespace()) {
                chars.next();
            }
        } else {
            while let Some(&c) = chars.peek() {
                if c == ',' || c == '%' {
                    break;
                }
                text.push(c);
                chars.next();
            }
            text.truncate(text.trim_end().len());
        }

        fields.push(Field { text, quoted });
        match chars.next() {
            None | Some('%') => break,
            Some(',') => continue,
            Some(c) => {
                return Err(syntax(line_no, format!("unexpected '{c}' after quoted value")));
            }
        }
    }

    Ok(fields)
}

/// Next (possibly quoted) name token and the remaining text.
fn take_token(s: &str, line: u64) -> Result<(String, &str), ParseError> {
    let s = s.trim_start();
    let mut chars = s.char_indices();
    match chars.next() {
        None => Err(syntax(line, "missing name")),
        Some((_, q @ ('\'' | '"'))) => {
            let mut out = String::new();
            let mut escaped = false;
            for (i, c) in chars {
                if escaped {
                    out.push(unescape(c));
                    escaped = false;
                } else if c == '\\' {
                    escaped = true;
                } else if c == q {
                    return Ok((out, &s[i + c.len_utf8()..]));
                } else {
                    out.push(c);
                }
            }
            Err(syntax(line, "unterminated quoted name"))
        }
        Some(_) => {
            let end = s
                .find(|c: char| c.is_whitespace() || c == '{')
                .unwrap_or(s.len());
            Ok((s[..end].to_string(), &s[end..]))
        }
    }
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// JSON layout, the only format that can name its class explicitly:
///
/// ```json
/// {
///   "relation": "tumours",
///   "attributes": [
///     { "name": "age", "type": "numeric" },
///     { "name": "malignant", "type": "nominal", "labels": ["no", "yes"] }
///   ],
///   "class": "malignant",
///   "data": [[41, null], [63, "?"]]
/// }
/// ```
#[derive(Debug, Deserialize)]
struct JsonDataset {
    #[serde(default)]
    relation: Option<String>,
    attributes: Vec<Attribute>,
    #[serde(default)]
    class: Option<String>,
    #[serde(default)]
    data: Vec<Vec<JsonValue>>,
}

pub fn parse_json(text: &str, default_relation: &str) -> Result<Dataset, ParseError> {
    let doc: JsonDataset = serde_json::from_str(text)?;

    let class_index = match &doc.class {
        Some(name) => Some(
            doc.attributes
                .iter()
                .position(|a| &a.name == name)
                .ok_or_else(|| ParseError::UnknownClass(name.clone()))?,
        ),
        None => None,
    };

    let mut records = Vec::with_capacity(doc.data.len());
    for (row, cells) in doc.data.iter().enumerate() {
        if cells.len() != doc.attributes.len() {
            return Err(ParseError::Arity {
                row,
                expected: doc.attributes.len(),
                found: cells.len(),
            });
        }
        let values = doc
            .attributes
            .iter()
            .zip(cells)
            .map(|(attr, cell)| json_to_value(attr, cell))
            .collect::<Result<Vec<_>, _>>()?;
        records.push(Record { values });
    }

    Dataset::new(
        doc.relation.unwrap_or_else(|| default_relation.to_string()),
        doc.attributes,
        class_index,
        records,
    )
}

fn json_to_value(attr: &Attribute, cell: &JsonValue) -> Result<Value, ParseError> {
    match cell {
        JsonValue::Null => Ok(Value::Missing),
        JsonValue::String(s) => attr.parse_value(s),
        JsonValue::Number(n) => match (&attr.kind, n.as_f64()) {
            (AttributeKind::Numeric, Some(v)) => Ok(Value::Numeric(v)),
            _ => attr.parse_present(&n.to_string()),
        },
        JsonValue::Bool(b) => attr.parse_present(&b.to_string()),
        other => Err(ParseError::InvalidValue {
            attribute: attr.name.clone(),
            value: other.to_string(),
            reason: "expected a scalar".to_string(),
        }),
    }
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: header row with column names, one record per row.
/// A column is numeric when every present cell parses as a number,
/// nominal otherwise. Empty cells and `?` are missing.
pub fn parse_csv<R: Read>(input: R, relation: &str) -> Result<Dataset, ParseError> {
    let (names, rows) = read_csv(input)?;

    let attributes: Vec<Attribute> = names
        .iter()
        .enumerate()
        .map(|(col, name)| infer_attribute(name, rows.iter().map(|r| r.get(col).unwrap_or(""))))
        .collect();

    let mut records = Vec::with_capacity(rows.len());
    for row in &rows {
        let values = attributes
            .iter()
            .zip(row.iter())
            .map(|(attr, cell)| parse_cell(attr, cell))
            .collect::<Result<Vec<_>, _>>()?;
        records.push(Record { values });
    }

    Dataset::new(relation, attributes, None, records)
}

/// Read CSV against a known header.
///
/// Columns are matched by name and may come in any order. The class column
/// may be left out entirely, in which case every class value is missing.
pub fn parse_csv_with_header<R: Read>(
    input: R,
    relation: &str,
    header: Header<'_>,
) -> Result<Dataset, ParseError> {
    let (names, rows) = read_csv(input)?;

    if let Some(extra) = names
        .iter()
        .find(|n| !header.attributes.iter().any(|a| &a.name == *n))
    {
        return Err(ParseError::UnexpectedColumn(extra.clone()));
    }
    let columns = header
        .attributes
        .iter()
        .enumerate()
        .map(|(i, attr)| match names.iter().position(|n| *n == attr.name) {
            Some(col) => Ok(Some(col)),
            None if i == header.class_index => Ok(None),
            None => Err(ParseError::MissingColumn(attr.name.clone())),
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut records = Vec::with_capacity(rows.len());
    for row in &rows {
        let values = header
            .attributes
            .iter()
            .zip(&columns)
            .map(|(attr, col)| match col {
                Some(col) => parse_cell(attr, row.get(*col).unwrap_or("")),
                None => Ok(Value::Missing),
            })
            .collect::<Result<Vec<_>, _>>()?;
        records.push(Record { values });
    }

    Dataset::new(
        relation,
        header.attributes.to_vec(),
        Some(header.class_index),
        records,
    )
}

fn read_csv<R: Read>(input: R) -> Result<(Vec<String>, Vec<csv::StringRecord>), ParseError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(input);
    let names: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.to_string())
        .collect();
    if names.is_empty() {
        return Err(ParseError::NoAttributes);
    }
    let rows = reader
        .records()
        .collect::<Result<Vec<csv::StringRecord>, _>>()?;
    Ok((names, rows))
}

fn parse_cell(attr: &Attribute, cell: &str) -> Result<Value, ParseError> {
    if is_missing_cell(cell) {
        Ok(Value::Missing)
    } else {
        attr.parse_present(cell)
    }
}

fn is_missing_cell(s: &str) -> bool {
    s.is_empty() || s == "?"
}

fn infer_attribute<'a>(name: &str, cells: impl Iterator<Item = &'a str>) -> Attribute {
    let present: Vec<&str> = cells.filter(|c| !is_missing_cell(c)).collect();
    if !present.is_empty() && present.iter().all(|c| c.parse::<f64>().is_ok()) {
        return Attribute::numeric(name);
    }
    let mut labels: Vec<&str> = Vec::new();
    for cell in present {
        if !labels.contains(&cell) {
            labels.push(cell);
        }
    }
    Attribute::nominal(name, labels)
}
