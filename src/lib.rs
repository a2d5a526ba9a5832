//! JSON-LD active context processing: term tables, compact/IRI
//! expansion, base resolution, and loading of referenced contexts.

mod context;
mod context_builder;
mod error;
mod iri_resolver;
mod models;
mod serializer;
mod source_loader;

pub use context::Context;
pub use context_builder::ContextBuilder;
pub use error::ContextError;
pub use models::{Container, Source, TermCriteria, TermDefinition, TermLanguage, TermOptions};
pub use source_loader::{ContextFetcher, MemoryLoader, SourceLoader};

// Re-export serde_json so callers can construct sources without naming
// the dependency themselves.
pub use serde_json;
