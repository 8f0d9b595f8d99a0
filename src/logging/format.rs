//! Record extraction and the text/JSON formatters.

use chrono::{DateTime, Local};
use serde_json::{Map, Value};
use std::fmt::{self, Write as _};
use tracing::field::{Field, Visit};
use tracing::Event;

use super::config::LogLevel;
use super::template::{Placeholder, Segment, Template};

/// `asctime` layout for text templates.
const ASCTIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S,%3f";

/// `timestamp` layout for JSON records, microsecond precision.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// A `tracing` event flattened into the attributes formatters work with.
#[derive(Debug, Clone)]
pub struct Record {
    /// Logger name: the event target.
    pub name: String,
    pub level: LogLevel,
    pub module: Option<String>,
    pub file: Option<String>,
    pub line: Option<u32>,
    pub message: String,
    /// Structured fields other than the message, in emission order.
    pub fields: Vec<(String, Value)>,
    /// When the event was created. Rendered by `{asctime}`.
    pub created: DateTime<Local>,
}

impl Record {
    #[must_use]
    pub fn from_event(event: &Event<'_>) -> Self {
        let created = Local::now();
        let meta = event.metadata();
        let mut visitor = RecordVisitor::default();
        event.record(&mut visitor);

        Self {
            name: meta.target().to_string(),
            level: LogLevel::from(meta.level()),
            module: meta.module_path().map(str::to_string),
            file: meta.file().map(str::to_string),
            line: meta.line(),
            message: visitor.message.unwrap_or_default(),
            fields: visitor.fields,
            created,
        }
    }
}

#[derive(Default)]
struct RecordVisitor {
    message: Option<String>,
    fields: Vec<(String, Value)>,
}

impl RecordVisitor {
    fn record_value(&mut self, field: &Field, value: Value) {
        match field.name() {
            "message" => {
                self.message = Some(match value {
                    Value::String(s) => s,
                    other => other.to_string(),
                });
            }
            name => self.fields.push((name.to_string(), value)),
        }
    }
}

impl Visit for RecordVisitor {
    fn record_f64(&mut self, field: &Field, value: f64) {
        let value = serde_json::Number::from_f64(value).map_or(Value::Null, Value::Number);
        self.record_value(field, value);
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.record_value(field, Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.record_value(field, Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.record_value(field, Value::Bool(value));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.record_value(field, Value::String(value.to_string()));
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.record_value(field, Value::String(value.to_string()));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.record_value(field, Value::String(format!("{value:?}")));
    }
}

/// Renders a [`Record`] as one output line, newline included.
#[derive(Debug, Clone)]
pub enum Formatter {
    Text(Template),
    Json,
}

impl Formatter {
    #[must_use]
    pub fn format(&self, record: &Record) -> String {
        match self {
            Self::Text(template) => format_text(template, record),
            Self::Json => format_json(record),
        }
    }
}

fn format_text(template: &Template, record: &Record) -> String {
    let mut line = String::new();
    for segment in template.segments() {
        // Writing into a String cannot fail.
        let _ = match segment {
            Segment::Literal(text) => line.write_str(text),
            Segment::Field(Placeholder::Asctime) => {
                write!(line, "{}", record.created.format(ASCTIME_FORMAT))
            }
            Segment::Field(Placeholder::Name) => line.write_str(&record.name),
            Segment::Field(Placeholder::Levelname) => line.write_str(record.level.as_str()),
            Segment::Field(Placeholder::Message) => write_message(&mut line, record),
            Segment::Field(Placeholder::Module) => {
                line.write_str(record.module.as_deref().unwrap_or_default())
            }
            Segment::Field(Placeholder::Filename) => {
                line.write_str(record.file.as_deref().unwrap_or_default())
            }
            Segment::Field(Placeholder::Lineno) => match record.line {
                Some(lineno) => write!(line, "{lineno}"),
                None => Ok(()),
            },
        };
    }
    line.push('\n');
    line
}

fn write_message(line: &mut String, record: &Record) -> fmt::Result {
    line.write_str(&record.message)?;
    for (key, value) in &record.fields {
        match value {
            Value::String(s) => write!(line, " {key}={s}")?,
            other => write!(line, " {key}={other}")?,
        }
    }
    Ok(())
}

/// Builds the JSON object for `record`.
///
/// Base fields come first (`message`, event fields, source location, thread),
/// then `name`, `level` and `timestamp` are inserted on top so each appears
/// exactly once even if an event field used the same key. `timestamp` is the
/// wall clock at format time, not when the event was created.
#[must_use]
pub fn json_object(record: &Record) -> Map<String, Value> {
    let mut object = Map::new();
    object.insert("message".to_string(), Value::String(record.message.clone()));
    for (key, value) in &record.fields {
        object.insert(key.clone(), value.clone());
    }
    if let Some(module) = &record.module {
        object.insert("module".to_string(), Value::String(module.clone()));
    }
    if let Some(file) = &record.file {
        object.insert("filename".to_string(), Value::String(file.clone()));
    }
    if let Some(line) = record.line {
        object.insert("lineno".to_string(), Value::from(line));
    }
    if let Some(thread) = std::thread::current().name() {
        object.insert("thread".to_string(), Value::String(thread.to_string()));
    }

    object.insert("name".to_string(), Value::String(record.name.clone()));
    object.insert(
        "level".to_string(),
        Value::String(record.level.as_str().to_string()),
    );
    object.insert(
        "timestamp".to_string(),
        Value::String(Local::now().format(TIMESTAMP_FORMAT).to_string()),
    );
    object
}

fn format_json(record: &Record) -> String {
    let mut line = Value::Object(json_object(record)).to_string();
    line.push('\n');
    line
}

#[cfg(test)]
#[path = "format_tests.rs"]
mod format_tests;
