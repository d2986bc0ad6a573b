//! Object-graph loader with a reduce protocol.
//!
//! A node shaped `{"__reduce__": [callable, [args...]]}` is rebuilt by
//! running `callable args...` and taking its stdout as the node's value.
//! The reduction happens inside `Deserialize`, so decoding the bytes is
//! enough to run it.

use std::path::Path;
use std::process::Command;

use serde::Deserialize;
use serde_json::Value;

pub const REDUCE_KEY: &str = "__reduce__";

#[derive(thiserror::Error, Debug)]
pub enum LoadError {
    #[error("malformed payload: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("cannot read {path}: {source}")]
    Read { path: String, source: std::io::Error },
    #[error("'{0}' object has no attribute 'get'")]
    NoGet(&'static str),
    #[error("object of type '{0}' has no len()")]
    NoLen(&'static str),
}

/// A fully revived object graph.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "Value")]
pub struct Revived(pub Value);

impl TryFrom<Value> for Revived {
    type Error = String;

    fn try_from(raw: Value) -> Result<Self, Self::Error> {
        revive(raw).map(Revived)
    }
}

fn revive(node: Value) -> Result<Value, String> {
    match node {
        Value::Object(map) if map.len() == 1 && map.contains_key(REDUCE_KEY) => {
            let call = map.into_iter().next().map(|(_, v)| v).unwrap_or(Value::Null);
            reduce(revive(call)?)
        }
        Value::Object(map) => map
            .into_iter()
            .map(|(k, v)| revive(v).map(|v| (k, v)))
            .collect::<Result<_, _>>()
            .map(Value::Object),
        Value::Array(items) => items.into_iter().map(revive).collect::<Result<_, _>>().map(Value::Array),
        other => Ok(other),
    }
}

fn reduce(call: Value) -> Result<Value, String> {
    let (callable, args) = match call {
        Value::Array(mut parts) if !parts.is_empty() => {
            let args = if parts.len() > 1 { parts.remove(1) } else { Value::Array(vec![]) };
            (parts.remove(0), args)
        }
        other => (other, Value::Array(vec![])),
    };
    let callable = as_arg(callable);
    let args: Vec<String> = match args {
        Value::Array(items) => items.into_iter().map(as_arg).collect(),
        single => vec![as_arg(single)],
    };
    let out = Command::new(&callable)
        .args(&args)
        .output()
        .map_err(|e| format!("reduce `{callable}` failed: {e}"))?;
    Ok(Value::String(String::from_utf8_lossy(&out.stdout).into_owned()))
}

fn as_arg(v: Value) -> String {
    match v {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

fn kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "NoneType",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "int",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}

impl Revived {
    /// Key lookup; only mappings support it.
    pub fn get(&self, key: &str) -> Result<Option<&Value>, LoadError> {
        match &self.0 {
            Value::Object(map) => Ok(map.get(key)),
            other => Err(LoadError::NoGet(kind(other))),
        }
    }

    /// Element count for sequences and mappings, character count for strings.
    pub fn len(&self) -> Result<usize, LoadError> {
        match &self.0 {
            Value::Array(a) => Ok(a.len()),
            Value::Object(o) => Ok(o.len()),
            Value::String(s) => Ok(s.chars().count()),
            other => Err(LoadError::NoLen(kind(other))),
        }
    }

    pub fn is_empty(&self) -> Result<bool, LoadError> { self.len().map(|n| n == 0) }
}

/// Decode untrusted bytes.
pub fn loads(bytes: &[u8]) -> Result<Revived, LoadError> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Decode from a reader (an uploaded file, a backup on disk).
pub fn load<R: std::io::Read>(reader: R) -> Result<Revived, LoadError> {
    Ok(serde_json::from_reader(reader)?)
}

pub fn restore_backup(path: impl AsRef<Path>) -> Result<Revived, LoadError> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)
        .map_err(|source| LoadError::Read { path: path.display().to_string(), source })?;
    load(std::io::BufReader::new(file))
}
