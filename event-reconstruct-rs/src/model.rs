// event-reconstruct-rs/src/model.rs
// Typed interaction event records and the static shape registry.
//
// Each record shape declares its exact field set; a mapping is upgraded to
// a record only when its key set equals that field set exactly. The
// registry below is the single source of truth for which shapes exist and
// in which priority order they are tried.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::node::Node;

/// A single model completion captured from an interaction log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionEvent {
    pub model: String,
    pub prompt: String,
    pub response: String,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub created_at: DateTime<Utc>,
}

/// One retrieval-augmented-generation step: the query issued and the
/// documents that came back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RagEvent {
    pub query: String,
    pub documents: Vec<String>,
    pub top_k: u64,
    pub created_at: DateTime<Utc>,
}

/// An assistant message carrying source citations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CitationMessageEvent {
    pub message: String,
    pub citations: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Why a mapping that matched a shape's key set could not be built into
/// that record. This is the only failure class record construction has;
/// anything else is a bug and is allowed to surface.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShapeError {
    #[error("{shape}: field `{field}` expects {expected}, got {found}")]
    FieldMismatch {
        shape: &'static str,
        field: &'static str,
        expected: &'static str,
        found: &'static str,
    },

    #[error("{shape}: field `{field}` is missing")]
    MissingField {
        shape: &'static str,
        field: &'static str,
    },
}

impl CompletionEvent {
    pub const NAME: &'static str = "CompletionEvent";
    pub const FIELDS: &'static [&'static str] = &[
        "model",
        "prompt",
        "response",
        "prompt_tokens",
        "completion_tokens",
        "created_at",
    ];

    /// Bind a reconstructed mapping's entries to this shape's fields.
    pub fn from_fields(fields: &IndexMap<String, Node>) -> Result<Self, ShapeError> {
        Ok(Self {
            model: take_string(Self::NAME, "model", fields)?,
            prompt: take_string(Self::NAME, "prompt", fields)?,
            response: take_string(Self::NAME, "response", fields)?,
            prompt_tokens: take_u64(Self::NAME, "prompt_tokens", fields)?,
            completion_tokens: take_u64(Self::NAME, "completion_tokens", fields)?,
            created_at: take_timestamp(Self::NAME, "created_at", fields)?,
        })
    }
}

impl RagEvent {
    pub const NAME: &'static str = "RagEvent";
    pub const FIELDS: &'static [&'static str] = &["query", "documents", "top_k", "created_at"];

    pub fn from_fields(fields: &IndexMap<String, Node>) -> Result<Self, ShapeError> {
        Ok(Self {
            query: take_string(Self::NAME, "query", fields)?,
            documents: take_string_vec(Self::NAME, "documents", fields)?,
            top_k: take_u64(Self::NAME, "top_k", fields)?,
            created_at: take_timestamp(Self::NAME, "created_at", fields)?,
        })
    }
}

impl CitationMessageEvent {
    pub const NAME: &'static str = "CitationMessageEvent";
    pub const FIELDS: &'static [&'static str] = &["message", "citations", "created_at"];

    pub fn from_fields(fields: &IndexMap<String, Node>) -> Result<Self, ShapeError> {
        Ok(Self {
            message: take_string(Self::NAME, "message", fields)?,
            citations: take_string_vec(Self::NAME, "citations", fields)?,
            created_at: take_timestamp(Self::NAME, "created_at", fields)?,
        })
    }
}

/// One entry per known record shape: its name, exact field set, and a
/// constructor producing the corresponding `Node` variant.
pub struct ShapeSpec {
    pub name: &'static str,
    pub fields: &'static [&'static str],
    pub build: fn(&IndexMap<String, Node>) -> Result<Node, ShapeError>,
}

impl ShapeSpec {
    /// Exact key-set equality: same cardinality and every declared field
    /// present. Neither a subset nor a superset qualifies.
    pub fn matches(&self, fields: &IndexMap<String, Node>) -> bool {
        fields.len() == self.fields.len() && self.fields.iter().all(|f| fields.contains_key(*f))
    }
}

/// Known shapes in priority order. The first entry whose field set matches
/// a mapping exactly is the one attempted.
pub static SHAPE_REGISTRY: Lazy<Vec<ShapeSpec>> = Lazy::new(|| {
    vec![
        ShapeSpec {
            name: CompletionEvent::NAME,
            fields: CompletionEvent::FIELDS,
            build: |f| CompletionEvent::from_fields(f).map(Node::Completion),
        },
        ShapeSpec {
            name: RagEvent::NAME,
            fields: RagEvent::FIELDS,
            build: |f| RagEvent::from_fields(f).map(Node::Rag),
        },
        ShapeSpec {
            name: CitationMessageEvent::NAME,
            fields: CitationMessageEvent::FIELDS,
            build: |f| CitationMessageEvent::from_fields(f).map(Node::Citation),
        },
    ]
});

fn mismatch(
    shape: &'static str,
    field: &'static str,
    expected: &'static str,
    found: &'static str,
) -> ShapeError {
    ShapeError::FieldMismatch {
        shape,
        field,
        expected,
        found,
    }
}

fn take_string(
    shape: &'static str,
    field: &'static str,
    fields: &IndexMap<String, Node>,
) -> Result<String, ShapeError> {
    match fields.get(field) {
        Some(Node::String(s)) => Ok(s.clone()),
        Some(other) => Err(mismatch(shape, field, "a string", other.kind_str())),
        None => Err(ShapeError::MissingField { shape, field }),
    }
}

fn take_u64(
    shape: &'static str,
    field: &'static str,
    fields: &IndexMap<String, Node>,
) -> Result<u64, ShapeError> {
    match fields.get(field) {
        Some(Node::Number(n)) => n
            .as_u64()
            .ok_or_else(|| mismatch(shape, field, "a non-negative integer", "number")),
        Some(other) => Err(mismatch(
            shape,
            field,
            "a non-negative integer",
            other.kind_str(),
        )),
        None => Err(ShapeError::MissingField { shape, field }),
    }
}

fn take_string_vec(
    shape: &'static str,
    field: &'static str,
    fields: &IndexMap<String, Node>,
) -> Result<Vec<String>, ShapeError> {
    match fields.get(field) {
        Some(Node::Array(items)) => items
            .iter()
            .map(|item| match item {
                Node::String(s) => Ok(s.clone()),
                _ => Err(mismatch(shape, field, "a sequence of strings", "sequence")),
            })
            .collect(),
        Some(other) => Err(mismatch(
            shape,
            field,
            "a sequence of strings",
            other.kind_str(),
        )),
        None => Err(ShapeError::MissingField { shape, field }),
    }
}

// `created_at` normally arrives as an already-normalized timestamp node;
// logs written with absolute RFC 3339 strings are accepted as well.
fn take_timestamp(
    shape: &'static str,
    field: &'static str,
    fields: &IndexMap<String, Node>,
) -> Result<DateTime<Utc>, ShapeError> {
    match fields.get(field) {
        Some(Node::Timestamp(ts)) => Ok(*ts),
        Some(Node::String(s)) => DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|_| mismatch(shape, field, "a timestamp", "string")),
        Some(other) => Err(mismatch(shape, field, "a timestamp", other.kind_str())),
        None => Err(ShapeError::MissingField { shape, field }),
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn sample_timestamp() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 17, 12, 0, 0).unwrap()
    }

    fn completion_fields() -> IndexMap<String, Node> {
        let mut fields = IndexMap::new();
        fields.insert("model".to_string(), Node::String("gpt-x".to_string()));
        fields.insert("prompt".to_string(), Node::String("hello".to_string()));
        fields.insert("response".to_string(), Node::String("world".to_string()));
        fields.insert("prompt_tokens".to_string(), Node::Number(3.into()));
        fields.insert("completion_tokens".to_string(), Node::Number(5.into()));
        fields.insert(
            "created_at".to_string(),
            Node::Timestamp(sample_timestamp()),
        );
        fields
    }

    #[test]
    fn completion_from_fields_binds_every_field() {
        let event = CompletionEvent::from_fields(&completion_fields())
            .expect("construction should succeed");

        assert_eq!(event.model, "gpt-x");
        assert_eq!(event.prompt, "hello");
        assert_eq!(event.response, "world");
        assert_eq!(event.prompt_tokens, 3);
        assert_eq!(event.completion_tokens, 5);
        assert_eq!(event.created_at, sample_timestamp());
    }

    #[test]
    fn wrong_field_type_reports_shape_and_field() {
        let mut fields = completion_fields();
        fields.insert(
            "prompt_tokens".to_string(),
            Node::String("many".to_string()),
        );

        let err = CompletionEvent::from_fields(&fields)
            .expect_err("string token count should not bind");
        assert_eq!(
            err,
            ShapeError::FieldMismatch {
                shape: "CompletionEvent",
                field: "prompt_tokens",
                expected: "a non-negative integer",
                found: "string",
            }
        );
    }

    #[test]
    fn created_at_accepts_rfc3339_strings() {
        let mut fields = completion_fields();
        fields.insert(
            "created_at".to_string(),
            Node::String("2024-05-17T12:00:00Z".to_string()),
        );

        let event = CompletionEvent::from_fields(&fields)
            .expect("RFC 3339 created_at should bind");
        assert_eq!(event.created_at, sample_timestamp());
    }

    #[test]
    fn matches_requires_exact_key_set() {
        let spec = &SHAPE_REGISTRY[0];
        let exact = completion_fields();
        assert!(spec.matches(&exact));

        let mut superset = completion_fields();
        superset.insert("extra".to_string(), Node::Null);
        assert!(!spec.matches(&superset), "superset must not match");

        let mut subset = completion_fields();
        subset.shift_remove("model");
        assert!(!spec.matches(&subset), "subset must not match");
    }

    #[test]
    fn registry_is_in_priority_order() {
        let names: Vec<&str> = SHAPE_REGISTRY.iter().map(|s| s.name).collect();
        assert_eq!(
            names,
            vec!["CompletionEvent", "RagEvent", "CitationMessageEvent"]
        );
    }
}
