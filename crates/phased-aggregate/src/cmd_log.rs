//! Parameters recovered from a run's `cmd.log`.
//!
//! The log holds a single invocation such as
//! `./avida -set EVENT_FILE events-u10.cfg -set SEED 1001`.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::error::{AggregateError, Result};

const INVOCATION: &str = "./avida";
const SET_FLAG: &str = "-set";
const EVENT_FILE: &str = "EVENT_FILE";
const CONSTANT_MARKER: &str = "const";
const CONSTANT_RATE: &str = "u0";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunParams {
    pub params: BTreeMap<String, String>,
    pub changing_env: bool,
    pub change_rate: String,
}

impl RunParams {
    /// Raw parameters plus the derived `change_rate` and `changing_env`
    /// columns, ready for the output table.
    pub fn into_columns(self) -> BTreeMap<String, String> {
        let mut columns = self.params;
        columns.insert("change_rate".to_string(), self.change_rate);
        columns.insert(
            "changing_env".to_string(),
            if self.changing_env { "1" } else { "0" }.to_string(),
        );
        columns
    }
}

/// Split an invocation on `-set` into key/value pairs.
///
/// Later occurrences of a key overwrite earlier ones.
pub fn parse_set_params(text: &str) -> Result<BTreeMap<String, String>> {
    let stripped = text.trim().replace(INVOCATION, "");
    let mut params = BTreeMap::new();
    for segment in stripped.split(SET_FLAG).map(str::trim) {
        if segment.is_empty() {
            continue;
        }
        let mut parts = segment.split(' ');
        let key = parts.next().unwrap_or_default();
        let value = parts
            .next()
            .ok_or_else(|| AggregateError::MalformedCommandLog {
                segment: segment.to_string(),
            })?;
        params.insert(key.to_string(), value.to_string());
    }
    Ok(params)
}

/// `events-u10.cfg` -> `u10`; anything naming a constant environment is `u0`.
pub fn change_rate_for(event_file: &str) -> (bool, String) {
    let changing = !event_file.contains(CONSTANT_MARKER);
    if !changing {
        return (false, CONSTANT_RATE.to_string());
    }
    let stem = event_file.split('.').next().unwrap_or(event_file);
    let rate = stem.rsplit('-').next().unwrap_or(stem);
    (true, rate.to_string())
}

pub fn extract_params(text: &str) -> Result<RunParams> {
    let params = parse_set_params(text)?;
    let event_file = params
        .get(EVENT_FILE)
        .ok_or_else(|| AggregateError::MissingField {
            field: EVENT_FILE.to_string(),
        })?;
    let (changing_env, change_rate) = change_rate_for(event_file);
    Ok(RunParams {
        params,
        changing_env,
        change_rate,
    })
}

pub fn read_cmd_log(path: &Path) -> Result<RunParams> {
    let text = fs::read_to_string(path)?;
    extract_params(&text)
}
