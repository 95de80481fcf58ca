//! Reading and writing JSON documents owned by Claude Code.
//!
//! Documents are handled as [`serde_json::Value`] rather than typed structs so
//! that keys we do not know about survive a rewrite untouched and in their
//! original order.

use crate::error::{CoreError, CoreResult};
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

/// Parse a JSON file.
pub fn read(path: &Path) -> CoreResult<Value> {
    let contents = fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            CoreError::MissingFile {
                path: path.to_path_buf(),
            }
        } else {
            CoreError::io("read", path, e)
        }
    })?;

    serde_json::from_str(&contents).map_err(|source| CoreError::MalformedJson {
        path: path.to_path_buf(),
        source,
    })
}

/// Parse a JSON file whose top level must be an object.
pub fn read_object(path: &Path) -> CoreResult<Map<String, Value>> {
    match read(path)? {
        Value::Object(map) => Ok(map),
        other => Err(CoreError::shape(
            path,
            format!("expected a JSON object at the top level, found {}", kind(&other)),
        )),
    }
}

/// Serialize with two-space indentation, optionally appending a newline.
pub fn write(path: &Path, value: &Value, trailing_newline: bool) -> CoreResult<()> {
    let mut text = serde_json::to_string_pretty(value).map_err(|source| CoreError::MalformedJson {
        path: path.to_path_buf(),
        source,
    })?;
    if trailing_newline {
        text.push('\n');
    }
    fs::write(path, text).map_err(|e| CoreError::io("write", path, e))
}

/// Short name of a JSON value's type, for error messages.
pub(crate) fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
