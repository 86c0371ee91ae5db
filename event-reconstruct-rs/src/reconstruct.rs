// event-reconstruct-rs/src/reconstruct.rs
// Recursive walk that upgrades JSON-decoded trees into typed event records.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use indexmap::IndexMap;
use serde_json::Value;

use crate::model::SHAPE_REGISTRY;
use crate::node::Node;
use crate::ReconstructError;

const CREATED_AT: &str = "created_at";

/// Supplies the reference timestamp for `created_at` absolutization.
///
/// Sampled fresh for every mapping that carries a numeric `created_at`, so
/// two walks at different wall-clock times produce different absolute
/// timestamps for the same input.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Receives one human-readable line per failed record upgrade.
///
/// Implementations must tolerate concurrent writers.
pub trait DiagnosticSink: Send + Sync {
    fn record(&self, message: &str);
}

/// Routes diagnostics to `tracing` at WARN level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn record(&self, message: &str) {
        tracing::warn!(target: "event_reconstruct", "{message}");
    }
}

/// The recursive reconstructor.
///
/// Typical usage:
///
/// ```ignore
/// let node = Reconstructor::new().reconstruct(value);
/// ```
///
/// Tests and embedders can inject a fixed clock and a collecting sink via
/// [`Reconstructor::with_components`].
pub struct Reconstructor {
    clock: Arc<dyn Clock>,
    sink: Arc<dyn DiagnosticSink>,
}

impl Reconstructor {
    /// Construct with the default collaborators (system clock, tracing).
    pub fn new() -> Self {
        Self::with_components(Arc::new(SystemClock), Arc::new(TracingSink))
    }

    pub fn with_components(clock: Arc<dyn Clock>, sink: Arc<dyn DiagnosticSink>) -> Self {
        Self { clock, sink }
    }

    /// Reconstruct a JSON-decoded value.
    ///
    /// Total: a mapping whose values do not fit its matched shape comes
    /// back as a plain mapping (with one diagnostic through the sink)
    /// rather than failing the walk.
    pub fn reconstruct(&self, value: Value) -> Node {
        match value {
            Value::Array(items) => {
                Node::Array(items.into_iter().map(|v| self.reconstruct(v)).collect())
            }
            Value::Object(map) => {
                // Children first, then the mapping itself.
                let mut fields = IndexMap::with_capacity(map.len());
                for (key, value) in map {
                    fields.insert(key, self.reconstruct(value));
                }
                self.finish_mapping(fields)
            }
            primitive => Node::from(primitive),
        }
    }

    /// Parse a JSON document from a logged event stream, then reconstruct.
    pub fn reconstruct_str(&self, text: &str) -> Result<Node, ReconstructError> {
        let value: Value = serde_json::from_str(text)?;
        Ok(self.reconstruct(value))
    }

    /// Byte-slice variant of [`Reconstructor::reconstruct_str`].
    pub fn reconstruct_slice(&self, bytes: &[u8]) -> Result<Node, ReconstructError> {
        let value: Value = serde_json::from_slice(bytes)?;
        Ok(self.reconstruct(value))
    }

    // `created_at` is rewritten before shape matching so a matched
    // constructor always sees a timestamp, never the raw number.
    fn finish_mapping(&self, mut fields: IndexMap<String, Node>) -> Node {
        if let Some(node) = fields.get_mut(CREATED_AT) {
            if let Node::Number(n) = node {
                if let Some(seconds) = n.as_f64() {
                    *node = Node::Timestamp(absolutize(self.clock.now(), seconds));
                }
            }
        }

        for shape in SHAPE_REGISTRY.iter() {
            if !shape.matches(&fields) {
                continue;
            }
            return match (shape.build)(&fields) {
                Ok(record) => {
                    tracing::debug!(
                        target: "event_reconstruct",
                        shape = shape.name,
                        "upgraded mapping to typed record"
                    );
                    record
                }
                Err(err) => {
                    self.sink.record(&format!(
                        "unexpected mismatch while upgrading mapping: {err}; \
                         offending mapping: {}",
                        render_fields(&fields)
                    ));
                    Node::Object(fields)
                }
            };
        }

        Node::Object(fields)
    }
}

impl Default for Reconstructor {
    fn default() -> Self {
        Self::new()
    }
}

/// One-shot reconstruction with the default clock and diagnostic sink.
pub fn reconstruct(value: Value) -> Node {
    Reconstructor::new().reconstruct(value)
}

// Elapsed seconds to an absolute timestamp, keeping sub-second precision.
// Negative values are allowed and land in the future.
fn absolutize(now: DateTime<Utc>, seconds: f64) -> DateTime<Utc> {
    now - Duration::microseconds((seconds * 1_000_000.0).round() as i64)
}

fn render_fields(fields: &IndexMap<String, Node>) -> String {
    serde_json::to_string(fields).unwrap_or_else(|_| "<unserializable mapping>".to_string())
}
