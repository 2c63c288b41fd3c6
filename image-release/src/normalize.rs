use log::debug;
use serde_json::Value;

use crate::{
    ansi::RESET,
    record::{text, Progress, Record},
};

/// The log lines and error messages produced by a single record.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Normalized {
    pub lines: Vec<String>,
    pub errors: Vec<String>,
}

pub fn normalize(raw: &Value) -> Normalized {
    let Record {
        raw,
        progress,
        errors,
    } = Record::decode(raw);

    let lines = match progress {
        Ok(Progress::Status(status)) => vec![status],
        Ok(Progress::Stream(stream)) => {
            let stream = clean_stream(&stream);
            if stream.is_empty() {
                Vec::new()
            } else {
                vec![stream]
            }
        }
        Ok(Progress::Aux { digest, id }) => digest
            .map(|digest| format!("digest: {digest}"))
            .into_iter()
            .chain(id.map(|id| format!("ID: {id}")))
            .collect(),
        Ok(Progress::ErrorOnly) => Vec::new(),
        Ok(Progress::Unrecognized) => vec![format!("not recognized (1): {raw}")],
        Err(error) => {
            debug!("unable to decode record: {error}");
            vec![format!("not recognized (2): {}", text(raw))]
        }
    };

    Normalized { lines, errors }
}

/// Removes a single leading and a single trailing newline, and moves a trailing ANSI reset onto
/// the last line of text.
fn clean_stream(stream: &str) -> String {
    let stream = stream.strip_prefix('\n').unwrap_or(stream);
    let stream = stream.strip_suffix('\n').unwrap_or(stream);
    match stream
        .strip_suffix(RESET)
        .and_then(|rest| rest.strip_suffix('\n'))
    {
        Some(rest) => format!("{rest}{RESET}"),
        None => stream.to_owned(),
    }
}
