//! # API Description Handling
//!
//! Loading, decoding and reporting on Swagger 2.0 / OpenAPI 3.0 JSON documents.

pub mod document;
pub mod inspect;
pub mod loader;

pub use document::{ApiDocument, Operation, ParameterLocation, ParameterSpec, PathItem};
pub use inspect::render_report;
pub use loader::{load_spec, load_spec_with_timeout, parse_document, LoadError, SpecSource};
