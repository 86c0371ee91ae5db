// event-reconstruct-rs/src/node.rs
// The reconstructed value tree.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Number, Value};

use crate::model::{CitationMessageEvent, CompletionEvent, RagEvent};

/// A value produced by reconstruction.
///
/// Structurally this mirrors a JSON value, except that mappings whose key
/// set matched a known record shape have been upgraded to typed records,
/// and numeric `created_at` fields have become absolute timestamps.
///
/// Mappings keep their insertion order, so an unmatched mapping serializes
/// back with the same key order it arrived with.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Node {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    /// An absolutized `created_at` value.
    Timestamp(DateTime<Utc>),
    Array(Vec<Node>),
    Object(IndexMap<String, Node>),
    Completion(CompletionEvent),
    Rag(RagEvent),
    Citation(CitationMessageEvent),
}

impl Node {
    /// Short name of this node's kind, used in diagnostics.
    pub fn kind_str(&self) -> &'static str {
        match self {
            Node::Null => "null",
            Node::Bool(_) => "boolean",
            Node::Number(_) => "number",
            Node::String(_) => "string",
            Node::Timestamp(_) => "timestamp",
            Node::Array(_) => "sequence",
            Node::Object(_) => "mapping",
            Node::Completion(_) => "CompletionEvent",
            Node::Rag(_) => "RagEvent",
            Node::Citation(_) => "CitationMessageEvent",
        }
    }

    /// True for the three typed record variants.
    pub fn is_record(&self) -> bool {
        matches!(
            self,
            Node::Completion(_) | Node::Rag(_) | Node::Citation(_)
        )
    }

    pub fn as_object(&self) -> Option<&IndexMap<String, Node>> {
        match self {
            Node::Object(fields) => Some(fields),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Node]> {
        match self {
            Node::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Node::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Node::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }

    pub fn as_completion(&self) -> Option<&CompletionEvent> {
        match self {
            Node::Completion(ev) => Some(ev),
            _ => None,
        }
    }

    pub fn as_rag(&self) -> Option<&RagEvent> {
        match self {
            Node::Rag(ev) => Some(ev),
            _ => None,
        }
    }

    pub fn as_citation(&self) -> Option<&CitationMessageEvent> {
        match self {
            Node::Citation(ev) => Some(ev),
            _ => None,
        }
    }
}

impl From<Value> for Node {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Node::Null,
            Value::Bool(b) => Node::Bool(b),
            Value::Number(n) => Node::Number(n),
            Value::String(s) => Node::String(s),
            Value::Array(items) => Node::Array(items.into_iter().map(Node::from).collect()),
            Value::Object(map) => {
                Node::Object(map.into_iter().map(|(k, v)| (k, Node::from(v))).collect())
            }
        }
    }
}
