use serde_json::Value;

use crate::{
    engine,
    error::{Error, StreamFailure},
    normalize::{normalize, Normalized},
};

/// Consumes an engine stream to the end, passing every log line to `emit` as soon as it is
/// produced. Error records do not stop the stream; they are collected and reported as a single
/// [`StreamFailure`] once the stream is exhausted.
///
/// A record that fails to arrive, i.e. a transport error, ends the stream immediately.
pub fn process<I, F>(records: I, mut emit: F) -> Result<Vec<String>, Error>
where
    I: IntoIterator<Item = engine::Result<Value>>,
    F: FnMut(&str),
{
    let mut lines = Vec::new();
    let mut errors: Vec<String> = Vec::new();

    for record in records {
        let record = record?;
        if is_falsy(&record) {
            continue;
        }

        let Normalized {
            lines: record_lines,
            errors: record_errors,
        } = normalize(&record);

        for line in record_lines {
            emit(&line);
            lines.push(line);
        }

        for error in record_errors {
            if !errors.contains(&error) {
                errors.push(error);
            }
        }
    }

    if errors.is_empty() {
        Ok(lines)
    } else {
        Err(StreamFailure { errors }.into())
    }
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(value) => !value,
        Value::Number(value) => value.as_f64() == Some(0.0),
        Value::String(value) => value.is_empty(),
        Value::Array(value) => value.is_empty(),
        Value::Object(value) => value.is_empty(),
    }
}
