// event-reconstruct-rs/src/dump.rs
// Inverse of reconstruction: render a node tree back into the wire form
// the logger writes, with `created_at` re-encoded as elapsed seconds.

use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use crate::node::Node;
use crate::reconstruct::Clock;

/// Render `node` as wire-form JSON: records flatten back to plain mappings
/// and every timestamp becomes fractional seconds elapsed before
/// `clock.now()`. Reconstructing the result recovers the same records, up
/// to clock-sampling tolerance.
pub fn to_wire_value(node: &Node, clock: &dyn Clock) -> Value {
    wire(node, clock.now())
}

fn wire(node: &Node, now: DateTime<Utc>) -> Value {
    match node {
        Node::Null => Value::Null,
        Node::Bool(b) => Value::Bool(*b),
        Node::Number(n) => Value::Number(n.clone()),
        Node::String(s) => Value::String(s.clone()),
        Node::Timestamp(ts) => elapsed_seconds(now, *ts),
        Node::Array(items) => Value::Array(items.iter().map(|n| wire(n, now)).collect()),
        Node::Object(fields) => Value::Object(
            fields
                .iter()
                .map(|(k, v)| (k.clone(), wire(v, now)))
                .collect(),
        ),
        Node::Completion(ev) => json!({
            "model": ev.model,
            "prompt": ev.prompt,
            "response": ev.response,
            "prompt_tokens": ev.prompt_tokens,
            "completion_tokens": ev.completion_tokens,
            "created_at": elapsed_seconds(now, ev.created_at),
        }),
        Node::Rag(ev) => json!({
            "query": ev.query,
            "documents": ev.documents,
            "top_k": ev.top_k,
            "created_at": elapsed_seconds(now, ev.created_at),
        }),
        Node::Citation(ev) => json!({
            "message": ev.message,
            "citations": ev.citations,
            "created_at": elapsed_seconds(now, ev.created_at),
        }),
    }
}

fn elapsed_seconds(now: DateTime<Utc>, ts: DateTime<Utc>) -> Value {
    let delta = now.signed_duration_since(ts);
    let seconds = delta
        .num_microseconds()
        .map(|us| us as f64 / 1_000_000.0)
        .unwrap_or_else(|| delta.num_seconds() as f64);

    serde_json::Number::from_f64(seconds)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}
