//! Exam data model, the response schema sent to the service, and the
//! validator that turns a parsed response into typed records.
//!
//! The service is asked to follow [`response_schema`], but nothing guarantees
//! it does. [`validate`] re-checks every required field, every type and the
//! `subject` enum, and collects *all* violations with their field paths
//! instead of stopping at the first one.

use crate::error::SchemaViolation;
use schemars::generate::SchemaSettings;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// The four answer choices of a question, verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct OptionSet {
    /// Text of choice A
    #[serde(rename = "A")]
    pub a: String,
    /// Text of choice B
    #[serde(rename = "B")]
    pub b: String,
    /// Text of choice C
    #[serde(rename = "C")]
    pub c: String,
    /// Text of choice D
    #[serde(rename = "D")]
    pub d: String,
}

/// Topic category: 'process' or 'industry'.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Subject {
    // Variants stay undocumented so the schema is a plain string enum.
    Process,
    Industry,
}

impl Subject {
    pub const ALL: [Subject; 2] = [Subject::Process, Subject::Industry];

    pub fn as_str(self) -> &'static str {
        match self {
            Subject::Process => "process",
            Subject::Industry => "industry",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|v| v.as_str() == s)
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One exam question. Field order here is the field order on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ExamRecord {
    /// Exam year as printed (e.g. 111)
    pub year: i64,
    /// Exam or group identifier (e.g. '1')
    pub exam_number: String,
    /// Original file name
    pub source: String,
    /// Question number, 1 to 50
    pub number: i64,
    pub subject: Subject,
    /// Full question text
    pub question: String,
    /// The four answer choices
    pub options: OptionSet,
    /// Correct answer, one of A, B, C or D
    pub answer: String,
}

/// All questions extracted from one PDF, in service order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub struct ExamCollection {
    /// All questions in the document, normally 50
    pub problems: Vec<ExamRecord>,
}

impl ExamCollection {
    pub fn len(&self) -> usize {
        self.problems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.problems.is_empty()
    }

    /// Pretty JSON: two-space indent, non-ASCII kept literal.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// JSON Schema derived from [`ExamCollection`], sent alongside every request.
///
/// Subschemas are inlined and the `$schema` keyword is omitted, so the
/// service sees one self-contained object. `answer` is plain text; the
/// instruction asks for A to D but the schema does not enforce it.
pub fn response_schema() -> Value {
    SchemaSettings::draft2020_12()
        .with(|s| {
            s.inline_subschemas = true;
            s.meta_schema = None;
        })
        .into_generator()
        .into_root_schema_for::<ExamCollection>()
        .to_value()
}

/// Validate a parsed service response and build the typed collection.
///
/// Returns every violation found; an empty `problems` array is valid.
/// Unknown fields are ignored.
pub fn validate(value: &Value) -> Result<ExamCollection, Vec<SchemaViolation>> {
    let mut v = Validator::default();

    let Some(root) = v.object(value, "$") else {
        return Err(v.violations);
    };
    let Some(problems) = v.required(root, "$", "problems") else {
        return Err(v.violations);
    };
    let Some(items) = problems.as_array() else {
        v.push("problems", format!("expected array, got {}", type_name(problems)));
        return Err(v.violations);
    };

    let records: Vec<Option<ExamRecord>> = items
        .iter()
        .enumerate()
        .map(|(i, item)| v.record(item, &format!("problems[{i}]")))
        .collect();

    if v.violations.is_empty() {
        Ok(ExamCollection {
            problems: records.into_iter().flatten().collect(),
        })
    } else {
        Err(v.violations)
    }
}

#[derive(Default)]
struct Validator {
    violations: Vec<SchemaViolation>,
}

impl Validator {
    fn push(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.violations.push(SchemaViolation::new(path, message));
    }

    fn object<'a>(&mut self, value: &'a Value, path: &str) -> Option<&'a Map<String, Value>> {
        let obj = value.as_object();
        if obj.is_none() {
            self.push(path, format!("expected object, got {}", type_name(value)));
        }
        obj
    }

    fn required<'a>(
        &mut self,
        obj: &'a Map<String, Value>,
        parent: &str,
        field: &str,
    ) -> Option<&'a Value> {
        let found = obj.get(field);
        if found.is_none() {
            self.push(join(parent, field), "required field missing");
        }
        found
    }

    fn string(&mut self, obj: &Map<String, Value>, parent: &str, field: &str) -> Option<String> {
        let value = self.required(obj, parent, field)?;
        match value.as_str() {
            Some(s) => Some(s.to_string()),
            None => {
                self.push(
                    join(parent, field),
                    format!("expected string, got {}", type_name(value)),
                );
                None
            }
        }
    }

    fn integer(&mut self, obj: &Map<String, Value>, parent: &str, field: &str) -> Option<i64> {
        let value = self.required(obj, parent, field)?;
        let parsed = match value {
            Value::Number(n) => n.as_i64().or_else(|| {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                    .map(|f| f as i64)
            }),
            // Lax coercion: "111" and " 111 " count, "111.5" and "one" do not.
            Value::String(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        };
        if parsed.is_none() {
            self.push(
                join(parent, field),
                format!("expected integer, got {}", describe(value)),
            );
        }
        parsed
    }

    fn subject(&mut self, obj: &Map<String, Value>, parent: &str) -> Option<Subject> {
        let raw = self.string(obj, parent, "subject")?;
        let parsed = Subject::parse(&raw);
        if parsed.is_none() {
            self.push(
                join(parent, "subject"),
                format!("expected one of 'process', 'industry', got {raw:?}"),
            );
        }
        parsed
    }

    fn options(&mut self, obj: &Map<String, Value>, parent: &str) -> Option<OptionSet> {
        let path = join(parent, "options");
        let value = self.required(obj, parent, "options")?;
        let opts = self.object(value, &path)?;
        let a = self.string(opts, &path, "A");
        let b = self.string(opts, &path, "B");
        let c = self.string(opts, &path, "C");
        let d = self.string(opts, &path, "D");
        Some(OptionSet {
            a: a?,
            b: b?,
            c: c?,
            d: d?,
        })
    }

    fn record(&mut self, value: &Value, path: &str) -> Option<ExamRecord> {
        let obj = self.object(value, path)?;
        // Evaluate every field before combining so all violations are reported.
        let year = self.integer(obj, path, "year");
        let exam_number = self.string(obj, path, "exam_number");
        let source = self.string(obj, path, "source");
        let number = self.integer(obj, path, "number");
        let subject = self.subject(obj, path);
        let question = self.string(obj, path, "question");
        let options = self.options(obj, path);
        let answer = self.string(obj, path, "answer");

        Some(ExamRecord {
            year: year?,
            exam_number: exam_number?,
            source: source?,
            number: number?,
            subject: subject?,
            question: question?,
            options: options?,
            answer: answer?,
        })
    }
}

fn join(parent: &str, field: &str) -> String {
    if parent == "$" {
        field.to_string()
    } else {
        format!("{parent}.{field}")
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn describe(value: &Value) -> String {
    match value {
        Value::Number(n) => format!("number {n}"),
        other => type_name(other).to_string(),
    }
}
