//! Bounded, citation-labelled retrieval context for a language model.

pub mod context;

pub use context::{render_context, ContextBuilder, CONTEXT_HEADER, NO_MATCHES_MARKER, OMITTED_MARKER};
