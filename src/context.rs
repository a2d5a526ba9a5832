//! The JSON-LD active context.
//!
//! A [`Context`] holds the term table, base IRI, default vocabulary and
//! language, and the active keyword aliases, and orchestrates parsing of
//! one or more local context sources into itself. Referenced sources go
//! through the injected [`SourceLoader`]; list sources fold element by
//! element into the running context, later elements overriding earlier
//! ones.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::rc::Rc;

use serde_json::{Map, Value};
use tracing::debug;

use crate::context_builder::ContextBuilder;
use crate::error::ContextError;
use crate::iri_resolver;
use crate::models::{Container, Source, TermCriteria, TermDefinition, TermLanguage, TermOptions};
use crate::serializer;
use crate::source_loader::{ContextFetcher, SourceLoader};

#[derive(Clone)]
pub struct Context {
    base: Option<String>,
    /// Constructor-supplied base, restored when a null source resets the
    /// context.
    doc_base: Option<String>,
    vocab: Option<String>,
    language: Option<String>,
    id_key: String,
    lang_key: String,
    terms: HashMap<String, TermDefinition>,
    /// Term names in registration order; backs the deterministic
    /// tie-break in [`Context::find_term_matching`].
    order: Vec<String>,
    parent: Option<Rc<Context>>,
    loader: Rc<dyn SourceLoader>,
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("base", &self.base)
            .field("doc_base", &self.doc_base)
            .field("vocab", &self.vocab)
            .field("language", &self.language)
            .field("id_key", &self.id_key)
            .field("lang_key", &self.lang_key)
            .field("terms", &self.terms)
            .field("order", &self.order)
            .field("parent", &self.parent)
            .field("loader", &"<dyn SourceLoader>")
            .finish()
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Context {
    /// Empty context with the default fetching loader.
    pub fn new() -> Self {
        Self::with_loader(Rc::new(ContextFetcher::new()))
    }

    pub fn with_loader(loader: Rc<dyn SourceLoader>) -> Self {
        Context {
            base: None,
            doc_base: None,
            vocab: None,
            language: None,
            id_key: "@id".to_string(),
            lang_key: "@language".to_string(),
            terms: HashMap::new(),
            order: Vec::new(),
            parent: None,
            loader,
        }
    }

    /// Build a context from a single source with the default loader.
    pub fn from_source(source: impl Into<Source>) -> Result<Self, ContextError> {
        ContextBuilder::new().source(source).build()
    }

    pub fn base(&self) -> Option<&str> {
        self.base.as_deref()
    }

    pub fn vocab(&self) -> Option<&str> {
        self.vocab.as_deref()
    }

    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    /// The key currently bound to `@id`.
    pub fn id_key(&self) -> &str {
        &self.id_key
    }

    /// The key currently bound to `@language`.
    pub fn lang_key(&self) -> &str {
        &self.lang_key
    }

    /// Look up a term by name, falling back along the parent chain.
    pub fn term(&self, name: &str) -> Option<&TermDefinition> {
        match self.terms.get(name) {
            Some(term) => Some(term),
            None => self.parent.as_deref().and_then(|parent| parent.term(name)),
        }
    }

    /// Terms defined directly on this context, in registration order.
    pub fn own_terms(&self) -> impl Iterator<Item = &TermDefinition> {
        self.order.iter().filter_map(|name| self.terms.get(name))
    }

    /// Register a term. `id` and any coercion IRI are expanded against the
    /// context's vocabulary and term table before storing; container
    /// tokens are de-duplicated into the set.
    pub fn add_term(&mut self, name: impl Into<String>, id: &str, options: TermOptions) {
        let name = name.into();
        let id = self.expand(id);
        let coercion = options.coercion.map(|coercion| self.expand(&coercion));
        self.insert_term(TermDefinition {
            name,
            id,
            coercion,
            language: options.language,
            container: options.container.into_iter().collect(),
            reverse: options.reverse,
        });
    }

    /// Expand a term name, compact IRI, or IRI against the active context.
    pub fn expand(&self, expr: &str) -> String {
        iri_resolver::expand_compact(expr, self.vocab.as_deref(), &|name| {
            self.term(name).map(|term| term.id.clone())
        })
    }

    /// Resolve a reference against the context base, expanding a compact
    /// prefix form first (without applying the default vocabulary).
    pub fn resolve(&self, reference: &str) -> String {
        let expanded = iri_resolver::expand_compact(reference, None, &|name| {
            self.term(name).map(|term| term.id.clone())
        });
        self.resolve_iri(&expanded)
    }

    /// Resolve a reference against the context base. With no base the
    /// reference is returned unresolved.
    pub fn resolve_iri(&self, reference: &str) -> String {
        iri_resolver::resolve(reference, self.base.as_deref())
    }

    /// Compact an IRI to `prefix:suffix` form using the longest matching
    /// term namespace; returns the IRI unchanged when nothing matches.
    pub fn shrink_iri(&self, iri: &str) -> String {
        let terms = self.scope_terms();
        iri_resolver::shrink(
            iri,
            terms.iter().map(|term| (term.name.as_str(), term.id.as_str())),
        )
        .unwrap_or_else(|| iri.to_string())
    }

    /// Compact an IRI to its shortest symbolic form: a registered term
    /// name, a vocabulary-relative name, or a compact IRI.
    pub fn to_symbol(&self, iri: &str) -> String {
        if let Some(term) = self.find_term(iri) {
            return term.name.clone();
        }
        if let Some(vocab) = self.vocab.as_deref()
            && iri.len() > vocab.len()
            && iri.starts_with(vocab)
        {
            return iri[vocab.len()..].to_string();
        }
        self.shrink_iri(iri)
    }

    /// Look up the best non-reverse term for an expanded IRI.
    pub fn find_term(&self, iri: &str) -> Option<&TermDefinition> {
        self.find_term_matching(iri, &TermCriteria::default())
    }

    /// Look up the best term for an expanded IRI by the given criteria.
    ///
    /// Candidates are all visible terms whose id equals `iri` and whose
    /// reverse flag matches the request. Selection order, most specific
    /// first: requested coercion match, requested language match,
    /// requested container match, the plain term when neither coercion
    /// nor language was requested, then first registration in the active
    /// (child-overrides-parent) order.
    pub fn find_term_matching(
        &self,
        iri: &str,
        criteria: &TermCriteria,
    ) -> Option<&TermDefinition> {
        let mut best: Option<(&TermDefinition, u32)> = None;
        for term in self.scope_terms() {
            if term.id != iri || term.reverse != criteria.reverse {
                continue;
            }
            let score = Self::match_score(term, criteria);
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((term, score));
            }
        }
        best.map(|(term, _)| term)
    }

    fn match_score(term: &TermDefinition, criteria: &TermCriteria) -> u32 {
        let mut score = 0;
        if let Some(coercion) = &criteria.coercion
            && term.coercion.as_deref() == Some(coercion.as_str())
        {
            score += 8;
        }
        if let Some(language) = &criteria.language
            && term.language.tag() == Some(language.as_str())
        {
            score += 4;
        }
        if let Some(container) = criteria.container
            && term.container.contains(&container)
        {
            score += 2;
        }
        if criteria.coercion.is_none() && criteria.language.is_none() && term.is_plain() {
            score += 1;
        }
        score
    }

    /// Read the `@id` of a node object, honoring the active alias with
    /// fallback to the literal keyword.
    pub fn get_id<'a>(&self, node: &'a Value) -> Option<&'a str> {
        node.get(self.id_key.as_str())
            .or_else(|| node.get("@id"))
            .and_then(Value::as_str)
    }

    /// Read the `@language` of a node object, honoring the active alias
    /// with fallback to the literal keyword.
    pub fn get_language<'a>(&self, node: &'a Value) -> Option<&'a str> {
        node.get(self.lang_key.as_str())
            .or_else(|| node.get("@language"))
            .and_then(Value::as_str)
    }

    /// Serialize the term table back to its canonical `"@context"` form.
    pub fn to_dict(&self) -> Map<String, Value> {
        serializer::to_dict(self)
    }

    /// Derive a child context from a source: it inherits base,
    /// vocabulary, language, alias keys and the loader, and its term
    /// lookups fall back to this context. The parent is never mutated.
    pub fn subcontext(&self, source: impl Into<Source>) -> Result<Context, ContextError> {
        let mut child = Context {
            base: self.base.clone(),
            doc_base: self.doc_base.clone(),
            vocab: self.vocab.clone(),
            language: self.language.clone(),
            id_key: self.id_key.clone(),
            lang_key: self.lang_key.clone(),
            terms: HashMap::new(),
            order: Vec::new(),
            parent: Some(Rc::new(self.clone())),
            loader: Rc::clone(&self.loader),
        };
        let source = source.into();
        let mut active = Vec::new();
        child.process_source(&source, false, &mut active)?;
        Ok(child)
    }

    pub(crate) fn seed_base(&mut self, base: Option<String>) {
        self.base = base.clone();
        self.doc_base = base;
    }

    /// Dispatch one source into the running context. `remote` marks
    /// content reached through a reference; `active` is the in-flight
    /// identifier chain guarding against recursive inclusion.
    pub(crate) fn process_source(
        &mut self,
        source: &Source,
        remote: bool,
        active: &mut Vec<String>,
    ) -> Result<(), ContextError> {
        match source {
            Source::Null => self.reset(),
            Source::Reference(identifier) => self.load_reference(identifier, active)?,
            Source::List(items) => {
                for item in items {
                    self.process_source(item, remote, active)?;
                }
            }
            Source::Inline(object) => {
                // An object carrying "@context" is a document wrapper;
                // the entry's value is the actual source.
                if let Some(inner) = object.get("@context") {
                    let inner = Source::from(inner.clone());
                    self.process_source(&inner, remote, active)?;
                } else {
                    self.parse_object(object, remote)?;
                }
            }
        }
        Ok(())
    }

    /// Null source: back to a freshly initialized context with the
    /// constructor-supplied base.
    fn reset(&mut self) {
        self.base = self.doc_base.clone();
        self.vocab = None;
        self.language = None;
        self.id_key = "@id".to_string();
        self.lang_key = "@language".to_string();
        self.terms.clear();
        self.order.clear();
    }

    fn load_reference(
        &mut self,
        identifier: &str,
        active: &mut Vec<String>,
    ) -> Result<(), ContextError> {
        let identifier = self.resolve_iri(identifier);
        if active.iter().any(|seen| *seen == identifier) {
            return Err(ContextError::RecursiveContextInclusion { identifier });
        }
        debug!(identifier = %identifier, "resolving referenced context");
        let document = self
            .loader
            .load(&identifier)
            .map_err(|source| ContextError::Load {
                identifier: identifier.clone(),
                source,
            })?;
        let inner = document
            .as_object()
            .and_then(|object| object.get("@context"))
            .cloned()
            .ok_or_else(|| ContextError::InvalidRemoteContext {
                identifier: identifier.clone(),
            })?;
        active.push(identifier);
        let result = self.process_source(&Source::from(inner), true, active);
        active.pop();
        result
    }

    fn parse_object(&mut self, object: &Map<String, Value>, remote: bool) -> Result<(), ContextError> {
        // @base is only honored in the top-level local context; a remote
        // source must not silently change the consumer's base IRI.
        if !remote && let Some(value) = object.get("@base") {
            self.base = match value {
                Value::Null => None,
                Value::String(reference) => {
                    Some(iri_resolver::resolve(reference, self.base.as_deref()))
                }
                other => {
                    return Err(ContextError::InvalidTermDefinition {
                        term: "@base".to_string(),
                        message: format!("expected string or null, got {other}"),
                    });
                }
            };
        }
        if let Some(value) = object.get("@vocab") {
            self.vocab = match value {
                Value::Null => None,
                // The vocabulary is taken verbatim, never resolved
                // against the base.
                Value::String(vocab) => Some(vocab.clone()),
                other => {
                    return Err(ContextError::InvalidTermDefinition {
                        term: "@vocab".to_string(),
                        message: format!("expected string or null, got {other}"),
                    });
                }
            };
        }
        if let Some(value) = object.get("@language") {
            self.language = match value {
                Value::Null => None,
                Value::String(language) => Some(language.clone()),
                other => {
                    return Err(ContextError::InvalidTermDefinition {
                        term: "@language".to_string(),
                        message: format!("expected string or null, got {other}"),
                    });
                }
            };
        }
        for (key, value) in object {
            // @base/@vocab/@language were handled above; other keywords
            // (such as @version) are tolerated and skipped.
            if key.starts_with('@') {
                continue;
            }
            self.parse_term(object, key, value)?;
        }
        Ok(())
    }

    fn parse_term(
        &mut self,
        source: &Map<String, Value>,
        name: &str,
        value: &Value,
    ) -> Result<(), ContextError> {
        match value {
            Value::Null => self.remove_term(name),
            Value::String(string) => match string.as_str() {
                "@id" => self.id_key = name.to_string(),
                "@language" => self.lang_key = name.to_string(),
                other if other.starts_with('@') => {}
                id_expr => {
                    let id = self.expand_local(source, id_expr);
                    self.insert_term(TermDefinition {
                        name: name.to_string(),
                        id,
                        coercion: None,
                        language: TermLanguage::Unset,
                        container: BTreeSet::new(),
                        reverse: false,
                    });
                }
            },
            Value::Object(decl) => self.parse_term_object(source, name, decl)?,
            other => {
                return Err(ContextError::InvalidTermDefinition {
                    term: name.to_string(),
                    message: format!("expected string, object or null, got {other}"),
                });
            }
        }
        Ok(())
    }

    fn parse_term_object(
        &mut self,
        source: &Map<String, Value>,
        name: &str,
        decl: &Map<String, Value>,
    ) -> Result<(), ContextError> {
        let reverse = decl.get("@reverse");
        if reverse.is_some() && decl.contains_key("@id") {
            return Err(ContextError::InvalidTermDefinition {
                term: name.to_string(),
                message: "@reverse and @id are mutually exclusive".to_string(),
            });
        }
        // Without @id (or @reverse) the identifier comes from the term
        // name itself.
        let id_expr = match reverse.or_else(|| decl.get("@id")) {
            Some(Value::String(expr)) => expr.as_str(),
            Some(other) => {
                return Err(ContextError::InvalidTermDefinition {
                    term: name.to_string(),
                    message: format!("expected an IRI string, got {other}"),
                });
            }
            None => name,
        };
        let id = self.expand_local(source, id_expr);

        let coercion = match decl.get("@type") {
            None | Some(Value::Null) => None,
            Some(Value::String(expr)) => Some(self.expand_local(source, expr)),
            Some(other) => {
                return Err(ContextError::InvalidTermDefinition {
                    term: name.to_string(),
                    message: format!("@type must be a string, got {other}"),
                });
            }
        };

        let language = match decl.get("@language") {
            None => TermLanguage::Unset,
            Some(Value::Null) => TermLanguage::Null,
            Some(Value::String(tag)) => TermLanguage::Tag(tag.clone()),
            Some(other) => {
                return Err(ContextError::InvalidTermDefinition {
                    term: name.to_string(),
                    message: format!("@language must be a string or null, got {other}"),
                });
            }
        };

        let mut container = BTreeSet::new();
        match decl.get("@container") {
            None | Some(Value::Null) => {}
            Some(Value::String(token)) => {
                container.insert(Self::container_token(name, token)?);
            }
            Some(Value::Array(tokens)) => {
                for token in tokens {
                    let token =
                        token
                            .as_str()
                            .ok_or_else(|| ContextError::InvalidTermDefinition {
                                term: name.to_string(),
                                message: format!("@container entries must be strings, got {token}"),
                            })?;
                    container.insert(Self::container_token(name, token)?);
                }
            }
            Some(other) => {
                return Err(ContextError::InvalidTermDefinition {
                    term: name.to_string(),
                    message: format!("@container must be a token or list of tokens, got {other}"),
                });
            }
        }

        self.insert_term(TermDefinition {
            name: name.to_string(),
            id,
            coercion,
            language,
            container,
            reverse: reverse.is_some(),
        });
        Ok(())
    }

    fn container_token(term: &str, token: &str) -> Result<Container, ContextError> {
        Container::from_keyword(token).ok_or_else(|| ContextError::InvalidTermDefinition {
            term: term.to_string(),
            message: format!("unrecognized @container token {token}"),
        })
    }

    /// Expansion during parsing: declarations in the local context object
    /// take precedence over terms already in scope, so forward references
    /// within one object resolve.
    fn expand_local(&self, source: &Map<String, Value>, expr: &str) -> String {
        iri_resolver::expand_compact(expr, self.vocab.as_deref(), &|name| {
            match source.get(name) {
                Some(Value::String(id)) if !id.starts_with('@') => Some(id.clone()),
                Some(Value::Object(decl)) => {
                    decl.get("@id").and_then(Value::as_str).map(str::to_string)
                }
                _ => self.term(name).map(|term| term.id.clone()),
            }
        })
    }

    fn insert_term(&mut self, definition: TermDefinition) {
        if !self.terms.contains_key(&definition.name) {
            self.order.push(definition.name.clone());
        }
        self.terms.insert(definition.name.clone(), definition);
    }

    fn remove_term(&mut self, name: &str) {
        if self.terms.remove(name).is_some() {
            self.order.retain(|n| n != name);
        }
    }

    /// All visible terms: own table first, then ancestors, with shadowed
    /// names dropped. Order within each context is registration order.
    fn scope_terms(&self) -> Vec<&TermDefinition> {
        let mut seen = HashSet::new();
        let mut terms = Vec::new();
        let mut current = Some(self);
        while let Some(ctx) = current {
            for name in &ctx.order {
                if seen.insert(name.as_str())
                    && let Some(term) = ctx.terms.get(name)
                {
                    terms.push(term);
                }
            }
            current = ctx.parent.as_deref();
        }
        terms
    }
}
