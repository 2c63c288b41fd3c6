//! Classification of the JSON records emitted by the Docker engine on its streaming endpoints
//! (`/build`, `/images/create` and `/images/{name}/push`).
//!
//! Every record carries at most one kind of progress (`status`, `stream` or `aux`) and, in
//! addition, any number of error fields (`error`, `errorDetail`).

use std::fmt;

use serde_json::{Map, Value};

const STATUS: &str = "status";
const STREAM: &str = "stream";
const AUX: &str = "aux";
const ERROR: &str = "error";
const ERROR_DETAIL: &str = "errorDetail";
const CODE: &str = "code";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Progress {
    /// Pull and push progress, e.g. `Pulling fs layer`.
    Status(String),
    /// Build output, usually terminated with a newline.
    Stream(String),
    /// Auxiliary data such as the digest of a pushed image or the ID of a built image.
    Aux {
        digest: Option<String>,
        id: Option<String>,
    },
    /// The record only reports errors.
    ErrorOnly,
    /// None of the known fields are present.
    Unrecognized,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    NotAnObject,
    UnexpectedType {
        field: &'static str,
        expected: &'static str,
    },
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::NotAnObject => f.write_str("record is not a JSON object"),
            DecodeError::UnexpectedType { field, expected } => {
                write!(f, "field `{field}` is not {expected}")
            }
        }
    }
}

impl std::error::Error for DecodeError {}

#[derive(Debug)]
pub struct Record<'a> {
    pub raw: &'a Value,
    pub progress: Result<Progress, DecodeError>,
    pub errors: Vec<String>,
}

impl<'a> Record<'a> {
    pub fn decode(raw: &'a Value) -> Self {
        match raw.as_object() {
            Some(fields) => Record {
                raw,
                progress: progress(fields),
                errors: errors(fields),
            },
            None => Record {
                raw,
                progress: Err(DecodeError::NotAnObject),
                errors: Vec::new(),
            },
        }
    }
}

fn progress(fields: &Map<String, Value>) -> Result<Progress, DecodeError> {
    if let Some(value) = fields.get(STATUS) {
        return string(STATUS, value).map(Progress::Status);
    }

    if let Some(value) = fields.get(STREAM) {
        return string(STREAM, value).map(Progress::Stream);
    }

    if let Some(value) = fields.get(AUX) {
        let aux = value.as_object().ok_or(DecodeError::UnexpectedType {
            field: AUX,
            expected: "an object",
        })?;
        return Ok(Progress::Aux {
            digest: aux.get("Digest").map(text),
            id: aux.get("ID").map(text),
        });
    }

    if fields.contains_key(ERROR) || fields.contains_key(ERROR_DETAIL) {
        Ok(Progress::ErrorOnly)
    } else {
        Ok(Progress::Unrecognized)
    }
}

/// Never fails; a malformed error field is reported as its JSON text so that it still fails the
/// stream.
fn errors(fields: &Map<String, Value>) -> Vec<String> {
    let mut errors = Vec::new();

    if let Some(value) = fields.get(ERROR).filter(|value| !value.is_null()) {
        errors.push(text(value));
    }

    if let Some(detail) = fields.get(ERROR_DETAIL) {
        let detail_fields = detail.as_object();

        errors.push(
            detail_fields
                .and_then(|detail| detail.get("message"))
                .map(text)
                .unwrap_or_else(|| text(detail)),
        );

        if let Some(top_level_code) = fields.get(CODE) {
            let code = detail_fields
                .and_then(|detail| detail.get(CODE))
                .unwrap_or(top_level_code);
            errors.push(format!("Error code: {code}", code = text(code)));
        }
    }

    errors
}

fn string(field: &'static str, value: &Value) -> Result<String, DecodeError> {
    value
        .as_str()
        .map(ToOwned::to_owned)
        .ok_or(DecodeError::UnexpectedType {
            field,
            expected: "a string",
        })
}

/// Strings are used as is, anything else is rendered as JSON.
pub fn text(value: &Value) -> String {
    match value {
        Value::String(value) => value.clone(),
        other => other.to_string(),
    }
}
