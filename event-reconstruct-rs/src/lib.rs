// event-reconstruct-rs/src/lib.rs
// Typed reconstruction of logged LLM interaction events.
//
// Logged event streams arrive as generic JSON: mappings, sequences and
// primitives, with `created_at` encoded as seconds elapsed before the log
// was written. This crate walks such trees and rebuilds the typed records
// the logger flattened (completions, retrieval steps, citation messages),
// absolutizing `created_at` against the current clock along the way.
//
// Design notes:
// - This crate is a pure library crate; there is no server or standalone
//   binary entrypoint, and no async surface.
// - Reconstruction is total: a mapping whose values do not fit its matched
//   record shape degrades to a plain mapping with a diagnostic, it never
//   fails the walk.

pub mod model;
pub mod node;

mod dump;
mod reconstruct;


pub use crate::dump::to_wire_value;
pub use crate::model::{
    CitationMessageEvent, CompletionEvent, RagEvent, ShapeError, ShapeSpec, SHAPE_REGISTRY,
};
pub use crate::node::Node;
pub use crate::reconstruct::{
    reconstruct, Clock, DiagnosticSink, Reconstructor, SystemClock, TracingSink,
};

/// Result type used by this crate.
pub type Result<T> = std::result::Result<T, ReconstructError>;

/// Top-level error type for this crate.
///
/// The walk itself never fails; only the parse entry points
/// (`Reconstructor::reconstruct_str` / `reconstruct_slice`) can.
#[derive(Debug, thiserror::Error)]
pub enum ReconstructError {
    #[error("invalid JSON document: {0}")]
    Json(#[from] serde_json::Error),
}
