use std::rc::Rc;

use crate::context::Context;
use crate::error::ContextError;
use crate::models::Source;
use crate::source_loader::{ContextFetcher, SourceLoader};

/// Construction entry point for [`Context`].
///
/// Covers the seeded-base and injected-loader forms:
///
/// ```ignore
/// let ctx = ContextBuilder::new()
///     .base("http://example.org/app/data/item")
///     .source(serde_json::json!({"@base": "../"}))
///     .build()?;
/// ```
///
/// Sources are processed in order; later sources override earlier ones.
pub struct ContextBuilder {
    base: Option<String>,
    sources: Vec<Source>,
    loader: Option<Rc<dyn SourceLoader>>,
}

impl Default for ContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ContextBuilder {
    pub fn new() -> Self {
        ContextBuilder {
            base: None,
            sources: Vec::new(),
            loader: None,
        }
    }

    /// Seed the base IRI before any source is applied.
    pub fn base(mut self, base: impl Into<String>) -> Self {
        self.base = Some(base.into());
        self
    }

    /// Append a source: an inline object, a reference string, a list, or
    /// JSON null.
    pub fn source(mut self, source: impl Into<Source>) -> Self {
        self.sources.push(source.into());
        self
    }

    /// Inject the loader used for referenced sources. Defaults to
    /// [`ContextFetcher`] without a cache.
    pub fn loader(mut self, loader: Rc<dyn SourceLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    /// Process all sources in order into a fresh context. On error the
    /// partially built context is discarded; no half-populated context is
    /// ever returned.
    pub fn build(self) -> Result<Context, ContextError> {
        let loader = self
            .loader
            .unwrap_or_else(|| Rc::new(ContextFetcher::new()));
        let mut context = Context::with_loader(loader);
        context.seed_base(self.base);
        let mut active = Vec::new();
        for source in &self.sources {
            context.process_source(source, false, &mut active)?;
        }
        Ok(context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_builder_yields_empty_context() {
        let ctx = ContextBuilder::new().build().unwrap();
        assert_eq!(ctx.base(), None);
        assert_eq!(ctx.vocab(), None);
        assert_eq!(ctx.id_key(), "@id");
    }

    #[test]
    fn builder_seeds_base_before_sources() {
        let ctx = ContextBuilder::new()
            .base("http://example.org/app/data/item")
            .build()
            .unwrap();
        assert_eq!(ctx.base(), Some("http://example.org/app/data/item"));
    }

    #[test]
    fn later_sources_override_earlier() {
        let ctx = ContextBuilder::new()
            .source(json!({"term": "http://example.org/first"}))
            .source(json!({"term": "http://example.org/second", "other": "urn:x:o"}))
            .build()
            .unwrap();
        assert_eq!(ctx.term("term").unwrap().id, "http://example.org/second");
        assert_eq!(ctx.term("other").unwrap().id, "urn:x:o");
    }

    #[test]
    fn null_source_resets_to_seeded_base() {
        let ctx = ContextBuilder::new()
            .base("http://example.org/doc")
            .source(json!({"@base": "http://other.org/", "@vocab": "http://v/", "n": "urn:x:n"}))
            .source(json!(null))
            .build()
            .unwrap();
        assert_eq!(ctx.base(), Some("http://example.org/doc"));
        assert_eq!(ctx.vocab(), None);
        assert!(ctx.term("n").is_none());
    }
}
