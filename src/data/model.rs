use std::fmt;

use serde::{Deserialize, Serialize};

use super::ParseError;

// ---------------------------------------------------------------------------
// Value – a single cell of a record
// ---------------------------------------------------------------------------

/// A dynamically-typed cell value mirroring the ARFF attribute types.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Numeric(f64),
    /// One of the labels declared by a nominal attribute.
    Nominal(String),
    Text(String),
    /// Date kept as text in the attribute's own format.
    Date(String),
    Missing,
}

impl Value {
    /// Try to interpret the value as an `f64` for numeric splits.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Numeric(v) => Some(*v),
            _ => None,
        }
    }

    /// Label of a nominal value.
    pub fn as_label(&self) -> Option<&str> {
        match self {
            Value::Nominal(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Numeric(v) => write!(f, "{v}"),
            Value::Nominal(s) | Value::Text(s) | Value::Date(s) => write!(f, "{}", quote(s)),
            Value::Missing => write!(f, "?"),
        }
    }
}

/// Quote an ARFF token with `'` when it would not survive re-reading bare.
pub fn quote(s: &str) -> String {
    let needs_quotes = s.is_empty()
        || s == "?"
        || s
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, ',' | '\'' | '"' | '%' | '{' | '}' | '\\'));
    if !needs_quotes {
        return s.to_string();
    }
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        if c == '\'' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('\'');
    out
}

// ---------------------------------------------------------------------------
// Attribute – one column of the schema
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AttributeKind {
    Numeric,
    Nominal { labels: Vec<String> },
    String,
    Date {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        format: Option<String>,
    },
}

impl AttributeKind {
    /// Same type family, ignoring declared labels and formats.
    pub fn same_type(&self, other: &AttributeKind) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    #[serde(flatten)]
    pub kind: AttributeKind,
}

impl Attribute {
    pub fn numeric(name: impl Into<String>) -> Self {
        Attribute {
            name: name.into(),
            kind: AttributeKind::Numeric,
        }
    }

    pub fn nominal<S: Into<String>>(name: impl Into<String>, labels: impl IntoIterator<Item = S>) -> Self {
        Attribute {
            name: name.into(),
            kind: AttributeKind::Nominal {
                labels: labels.into_iter().map(Into::into).collect(),
            },
        }
    }

    /// Declared labels, empty for non-nominal attributes.
    pub fn labels(&self) -> &[String] {
        match &self.kind {
            AttributeKind::Nominal { labels } => labels.as_slice(),
            _ => &[],
        }
    }

    pub fn label_index(&self, label: &str) -> Option<usize> {
        self.labels().iter().position(|l| l == label)
    }

    /// Validate a raw textual cell against this attribute.
    ///
    /// `?` always means missing.
    pub fn parse_value(&self, raw: &str) -> Result<Value, ParseError> {
        if raw == "?" {
            return Ok(Value::Missing);
        }
        self.parse_present(raw)
    }

    /// Like [`Attribute::parse_value`] but never treats the text as missing.
    pub fn parse_present(&self, raw: &str) -> Result<Value, ParseError> {
        match &self.kind {
            AttributeKind::Numeric => raw
                .trim()
                .parse::<f64>()
                .map(Value::Numeric)
                .map_err(|_| ParseError::InvalidValue {
                    attribute: self.name.clone(),
                    value: raw.to_string(),
                    reason: "not a number".to_string(),
                }),
            AttributeKind::Nominal { labels } => {
                if labels.iter().any(|l| l == raw) {
                    Ok(Value::Nominal(raw.to_string()))
                } else {
                    Err(ParseError::InvalidValue {
                        attribute: self.name.clone(),
                        value: raw.to_string(),
                        reason: "not a declared label".to_string(),
                    })
                }
            }
            AttributeKind::String => Ok(Value::Text(raw.to_string())),
            AttributeKind::Date { .. } => Ok(Value::Date(raw.to_string())),
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@attribute {} ", quote(&self.name))?;
        match &self.kind {
            AttributeKind::Numeric => write!(f, "numeric"),
            AttributeKind::String => write!(f, "string"),
            AttributeKind::Date { format: None } => write!(f, "date"),
            AttributeKind::Date {
                format: Some(format),
            } => write!(f, "date {}", quote(format)),
            AttributeKind::Nominal { labels } => {
                let labels: Vec<String> = labels.iter().map(|l| quote(l)).collect();
                write!(f, "{{{}}}", labels.join(","))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Record – one data row
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// One slot per attribute, in declaration order.
    pub values: Vec<Value>,
}

// ---------------------------------------------------------------------------
// Dataset – the complete loaded relation
// ---------------------------------------------------------------------------

/// A parsed relation: schema, target attribute and rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub relation: String,
    pub attributes: Vec<Attribute>,
    /// Index of the target attribute in `attributes`.
    pub class_index: usize,
    pub records: Vec<Record>,
}

impl Dataset {
    /// Assemble a dataset, checking the schema invariants.
    ///
    /// `class_index` of `None` selects the last attribute.
    pub fn new(
        relation: impl Into<String>,
        attributes: Vec<Attribute>,
        class_index: Option<usize>,
        records: Vec<Record>,
    ) -> Result<Self, ParseError> {
        if attributes.is_empty() {
            return Err(ParseError::NoAttributes);
        }
        let class_index = class_index.unwrap_or(attributes.len() - 1);
        if class_index >= attributes.len() {
            return Err(ParseError::UnknownClass(class_index.to_string()));
        }
        if let Some((row, rec)) = records
            .iter()
            .enumerate()
            .find(|(_, r)| r.values.len() != attributes.len())
        {
            return Err(ParseError::Arity {
                row,
                expected: attributes.len(),
                found: rec.values.len(),
            });
        }
        Ok(Dataset {
            relation: relation.into(),
            attributes,
            class_index,
            records,
        })
    }

    pub fn class_attribute(&self) -> &Attribute {
        &self.attributes[self.class_index]
    }

    /// Overwrite the target slot of one record.
    pub fn set_class_value(&mut self, row: usize, value: Value) {
        self.records[row].values[self.class_index] = value;
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the dataset has no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "@relation {}", quote(&self.relation))?;
        writeln!(f)?;
        for attr in &self.attributes {
            writeln!(f, "{attr}")?;
        }
        writeln!(f)?;
        write!(f, "@data")?;
        for rec in &self.records {
            let cells: Vec<String> = rec.values.iter().map(|v| v.to_string()).collect();
            write!(f, "\n{}", cells.join(","))?;
        }
        Ok(())
    }
}
