use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const SEAT_NO_FIELD: &str = "SEAT_NO";
pub const NAME_FIELD: &str = "NAME";

/// Identity columns. Shown and passed through, never diffed or mutated by the workflow.
pub const IDENTITY_FIELDS: [&str; 4] = ["NAME", "SEAT_NO", "COLL_NO", "SEX"];

/// Fields a teacher or admin may change, in presentation order:
/// theory/internal pairs, then semester grade points, then credits, then CGPA/GCGPA.
pub const EDITABLE_FIELDS: [&str; 26] = [
    "P1_T", "P1_I", "P2_T", "P2_I", "P3_T", "P3_I", "P4_T", "P4_I", "P5_T", "P5_I", "P6_T",
    "P6_I", "SGP1", "SGP2", "SGP3", "SGP4", "SGP5", "SGP6", "C1", "C2", "C3", "C4", "C5", "C6",
    "CGPA", "GCGPA",
];

/// One cell of a student row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    Text(String),
}

impl Scalar {
    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    /// Value equality: numbers compare numerically so `40` and `40.0` are the same mark.
    pub fn same_value(&self, other: &Scalar) -> bool {
        match (self, other) {
            (Scalar::Number(a), Scalar::Number(b)) => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => x == y,
                _ => a == b,
            },
            _ => self == other,
        }
    }

    pub fn from_f64(v: f64) -> Scalar {
        serde_json::Number::from_f64(v)
            .map(Scalar::Number)
            .unwrap_or(Scalar::Null)
    }

    /// Display form used for seat keys and report cells.
    pub fn display(&self) -> String {
        match self {
            Scalar::Null => String::new(),
            Scalar::Bool(b) => b.to_string(),
            Scalar::Number(n) => match n.as_f64() {
                Some(v) if n.is_f64() && v.fract() == 0.0 && v.abs() < 1e15 => {
                    format!("{}", v as i64)
                }
                _ => n.to_string(),
            },
            Scalar::Text(s) => s.clone(),
        }
    }
}

impl From<i64> for Scalar {
    fn from(v: i64) -> Self {
        Scalar::Number(v.into())
    }
}

impl From<i32> for Scalar {
    fn from(v: i32) -> Self {
        Scalar::Number(v.into())
    }
}

impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Scalar::from_f64(v)
    }
}

impl From<&str> for Scalar {
    fn from(v: &str) -> Self {
        Scalar::Text(v.to_string())
    }
}

/// Normalizes a seat number so `1001`, `1001.0` and `" 1001 "` address the same row.
pub fn seat_key(value: &Scalar) -> Option<String> {
    let key = value.display();
    let key = key.trim();
    if key.is_empty() {
        None
    } else {
        Some(key.to_string())
    }
}

/// Seat key from an IPC parameter, which may arrive as a string or a number.
pub fn seat_key_from_json(value: &serde_json::Value) -> Option<String> {
    let scalar: Scalar = serde_json::from_value(value.clone()).ok()?;
    seat_key(&scalar)
}

/// A student row: open mapping of column name to scalar.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: BTreeMap<String, Scalar>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Present, non-null value of `field`. Absent and null read the same.
    pub fn value(&self, field: &str) -> Option<&Scalar> {
        self.fields.get(field).filter(|v| !v.is_null())
    }

    pub fn number(&self, field: &str) -> Option<f64> {
        self.value(field).and_then(Scalar::as_f64)
    }

    pub fn text(&self, field: &str) -> Option<String> {
        self.value(field).map(Scalar::display)
    }

    pub fn set(&mut self, field: impl Into<String>, value: Option<Scalar>) {
        self.fields
            .insert(field.into(), value.unwrap_or(Scalar::Null));
    }

    pub fn with(mut self, field: &str, value: impl Into<Scalar>) -> Self {
        self.set(field, Some(value.into()));
        self
    }

    pub fn seat_no(&self) -> Option<String> {
        self.value(SEAT_NO_FIELD).and_then(seat_key)
    }

    pub fn student_name(&self) -> Option<String> {
        self.text(NAME_FIELD)
    }
}

impl FromIterator<(String, Scalar)> for Record {
    fn from_iter<T: IntoIterator<Item = (String, Scalar)>>(iter: T) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}
