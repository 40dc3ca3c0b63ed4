use crate::utils::error::{RelayError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const SCHEMA_VERSION: u32 = 1;

/// One persisted document per project id. Older deployments left three
/// drifted shapes behind; `from_json` migrates all of them on read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub version: u32,
    #[serde(default)]
    pub messages: Vec<Entry>,
    #[serde(default)]
    pub responses: Vec<Entry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl Entry {
    pub fn message(message: String) -> Self {
        Self {
            timestamp: Utc::now(),
            message: Some(message),
            response: None,
            token: None,
        }
    }

    pub fn response(response: Value, token: Option<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            message: None,
            response: Some(response),
            token,
        }
    }
}

/// Opaque revision marker returned by the store on read. A write carrying a
/// stale revision targets a base that no longer exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Revision(String);

impl Revision {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Record {
    fn default() -> Self {
        Self {
            version: SCHEMA_VERSION,
            messages: Vec::new(),
            responses: Vec::new(),
        }
    }
}

impl Record {
    /// Parses a stored document, migrating legacy shapes:
    /// a flat entry array, `{messages, responses}` without a version, and
    /// `{messages, response}` with a singular response (object or array).
    pub fn from_json(value: Value) -> Result<Self> {
        match value {
            Value::Array(items) => Ok(Self {
                version: SCHEMA_VERSION,
                messages: parse_entries(items)?,
                responses: Vec::new(),
            }),
            Value::Object(map) => {
                if map.contains_key("version") {
                    serde_json::from_value(Value::Object(map)).map_err(|e| {
                        RelayError::MalformedRecord {
                            reason: format!("versioned record does not parse: {}", e),
                        }
                    })
                } else {
                    let mut map = map;
                    let messages = match map.remove("messages") {
                        Some(Value::Array(items)) => parse_entries(items)?,
                        Some(other) => return Err(malformed("messages", &other)),
                        None => Vec::new(),
                    };
                    let responses = match map.remove("responses").or_else(|| map.remove("response"))
                    {
                        Some(Value::Array(items)) => parse_entries(items)?,
                        Some(obj @ Value::Object(_)) => vec![parse_entry(obj)?],
                        Some(other) => return Err(malformed("responses", &other)),
                        None => Vec::new(),
                    };
                    Ok(Self {
                        version: SCHEMA_VERSION,
                        messages,
                        responses,
                    })
                }
            }
            other => Err(RelayError::MalformedRecord {
                reason: format!("expected array or object, found {}", type_name(&other)),
            }),
        }
    }
}

fn parse_entries(items: Vec<Value>) -> Result<Vec<Entry>> {
    items.into_iter().map(parse_entry).collect()
}

fn parse_entry(value: Value) -> Result<Entry> {
    serde_json::from_value(value).map_err(|e| RelayError::MalformedRecord {
        reason: format!("entry does not parse: {}", e),
    })
}

fn malformed(field: &str, value: &Value) -> RelayError {
    RelayError::MalformedRecord {
        reason: format!("'{}' must be a list, found {}", field, type_name(value)),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
