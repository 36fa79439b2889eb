//! Durable semantic memory for retrieval-augmented assistants.
//!
//! Mnemos keeps two independent stores on local disk and a small amount of glue
//! between them:
//!
//! | Store | File | In memory |
//! |-------|------|-----------|
//! | **Record log** | append-only `memory.log`, one record per line | id → byte offset, category → ids |
//! | **Record index sidecar** | `memory.idx`, rewritten in the background | — |
//! | **Chunk vector store** | append-only `vectors.jsonl`, one chunk per line | every chunk and its embedding |
//!
//! Record payloads are never cached: every lookup seeks to the indexed offset and
//! reads exactly one line, so steady-state memory is bounded by the index, not
//! the corpus. Chunk vectors stay resident because every query scans them.
//!
//! # Modules
//!
//! - [`config`] — Configuration loading from TOML files and environment variables
//! - [`memory`] — Record log, line codec, offset index, and sidecar persistence
//! - [`vector`] — Chunk vector store with exact cosine top-K search
//! - [`retrieval`] — Bounded, citation-labelled context blocks for a language model
//! - [`embedding`] — The text-to-vector seam and its HTTP and hash implementations
//! - [`ingest`] — Text cleansing, chunking, and batch ingestion into the vector store
//! - [`error`] — Error types shared by the stores

pub mod config;
mod durable;
pub mod embedding;
pub mod error;
pub mod ingest;
pub mod memory;
pub mod retrieval;
pub mod vector;
