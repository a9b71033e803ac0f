//! Per-stage trace records

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{QueryId, QueryState};

/// A typed trace attribute value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    /// Boolean flag
    Bool(bool),
    /// Integer count or duration
    Int(i64),
    /// Floating point measurement
    Float(f64),
    /// Free text
    Text(String),
}

impl From<bool> for AttributeValue {
    fn from(v: bool) -> Self {
        AttributeValue::Bool(v)
    }
}

impl From<i64> for AttributeValue {
    fn from(v: i64) -> Self {
        AttributeValue::Int(v)
    }
}

impl From<usize> for AttributeValue {
    fn from(v: usize) -> Self {
        AttributeValue::Int(i64::try_from(v).unwrap_or(i64::MAX))
    }
}

impl From<u32> for AttributeValue {
    fn from(v: u32) -> Self {
        AttributeValue::Int(i64::from(v))
    }
}

impl From<u64> for AttributeValue {
    fn from(v: u64) -> Self {
        AttributeValue::Int(i64::try_from(v).unwrap_or(i64::MAX))
    }
}

impl From<f64> for AttributeValue {
    fn from(v: f64) -> Self {
        AttributeValue::Float(v)
    }
}

impl From<f32> for AttributeValue {
    fn from(v: f32) -> Self {
        AttributeValue::Float(f64::from(v))
    }
}

impl From<&str> for AttributeValue {
    fn from(v: &str) -> Self {
        AttributeValue::Text(v.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(v: String) -> Self {
        AttributeValue::Text(v)
    }
}

/// Record of one stage a query passed through
///
/// Built once with [`TraceRecord::new`] plus attribute calls, then emitted;
/// sinks never modify records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceRecord {
    /// The query this stage belongs to
    pub query_id: QueryId,

    /// Stage name
    pub stage: QueryState,

    /// Stage entry (Unix milliseconds)
    pub started_at: u64,

    /// Stage exit (Unix milliseconds)
    pub ended_at: u64,

    /// Stage-specific attributes
    #[serde(default)]
    pub attributes: BTreeMap<String, AttributeValue>,
}

impl TraceRecord {
    /// Start a record for `stage`
    pub fn new(query_id: QueryId, stage: QueryState, started_at: u64, ended_at: u64) -> Self {
        Self {
            query_id,
            stage,
            started_at,
            ended_at: ended_at.max(started_at),
            attributes: BTreeMap::new(),
        }
    }

    /// Add an attribute
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Stage duration in milliseconds
    pub fn duration_ms(&self) -> u64 {
        self.ended_at - self.started_at
    }

    /// Look up an attribute
    pub fn attribute(&self, key: &str) -> Option<&AttributeValue> {
        self.attributes.get(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_builder() {
        let record = TraceRecord::new(QueryId::from_value(7), QueryState::Retrieving, 100, 150)
            .with_attribute("attempts", 2u32)
            .with_attribute("chunks", 4usize)
            .with_attribute("source", "sqlite");

        assert_eq!(record.duration_ms(), 50);
        assert_eq!(record.attribute("attempts"), Some(&AttributeValue::Int(2)));
        assert_eq!(
            record.attribute("source"),
            Some(&AttributeValue::Text("sqlite".to_string()))
        );
    }

    #[test]
    fn test_end_never_precedes_start() {
        let record = TraceRecord::new(QueryId::from_value(1), QueryState::Completed, 200, 100);
        assert_eq!(record.ended_at, 200);
        assert_eq!(record.duration_ms(), 0);
    }

    #[test]
    fn test_record_serializes_flat_attributes() {
        let record = TraceRecord::new(QueryId::from_value(1), QueryState::Assembling, 1, 2)
            .with_attribute("truncated", false);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["stage"], "assembling");
        assert_eq!(json["attributes"]["truncated"], false);
    }
}
