use std::collections::BTreeSet;

use serde_json::Value;

/// Container tokens a term may declare via `@container`.
///
/// Variants are ordered by keyword so serialized token lists come out
/// sorted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Container {
    Graph,
    Id,
    Index,
    Language,
    List,
    Set,
}

impl Container {
    pub fn keyword(self) -> &'static str {
        match self {
            Container::Graph => "@graph",
            Container::Id => "@id",
            Container::Index => "@index",
            Container::Language => "@language",
            Container::List => "@list",
            Container::Set => "@set",
        }
    }

    pub fn from_keyword(keyword: &str) -> Option<Container> {
        match keyword {
            "@graph" => Some(Container::Graph),
            "@id" => Some(Container::Id),
            "@index" => Some(Container::Index),
            "@language" => Some(Container::Language),
            "@list" => Some(Container::List),
            "@set" => Some(Container::Set),
            _ => None,
        }
    }
}

/// Per-term language state.
///
/// A term that says nothing about language inherits the context default;
/// a term declaring `"@language": null` has no language at all. The two
/// must stay distinguishable.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TermLanguage {
    #[default]
    Unset,
    Null,
    Tag(String),
}

impl TermLanguage {
    pub fn tag(&self) -> Option<&str> {
        match self {
            TermLanguage::Tag(tag) => Some(tag),
            _ => None,
        }
    }

    pub fn is_unset(&self) -> bool {
        matches!(self, TermLanguage::Unset)
    }
}

/// A compact term name mapped to an expanded identifier, with its
/// optional coercion, language, container, and reverse semantics.
#[derive(Debug, Clone)]
pub struct TermDefinition {
    pub name: String,
    pub id: String,
    pub coercion: Option<String>,
    pub language: TermLanguage,
    pub container: BTreeSet<Container>,
    pub reverse: bool,
}

impl TermDefinition {
    /// True when the term carries no coercion or language qualifier.
    pub fn is_plain(&self) -> bool {
        self.coercion.is_none() && self.language.is_unset()
    }
}

/// Options for [`Context::add_term`](crate::Context::add_term) beyond the
/// name/id pair.
#[derive(Debug, Clone, Default)]
pub struct TermOptions {
    pub coercion: Option<String>,
    pub language: TermLanguage,
    pub container: Vec<Container>,
    pub reverse: bool,
}

impl TermOptions {
    pub fn new() -> TermOptions {
        TermOptions::default()
    }

    pub fn coercion(mut self, iri: impl Into<String>) -> Self {
        self.coercion = Some(iri.into());
        self
    }

    pub fn language(mut self, tag: impl Into<String>) -> Self {
        self.language = TermLanguage::Tag(tag.into());
        self
    }

    /// Declare the term as explicitly language-free (`"@language": null`).
    pub fn no_language(mut self) -> Self {
        self.language = TermLanguage::Null;
        self
    }

    pub fn container(mut self, tokens: impl IntoIterator<Item = Container>) -> Self {
        self.container.extend(tokens);
        self
    }

    pub fn reverse(mut self) -> Self {
        self.reverse = true;
        self
    }
}

/// Selection criteria for
/// [`Context::find_term_matching`](crate::Context::find_term_matching).
/// The default selects plain, non-reverse terms.
#[derive(Debug, Clone, Default)]
pub struct TermCriteria {
    pub coercion: Option<String>,
    pub language: Option<String>,
    pub container: Option<Container>,
    pub reverse: bool,
}

impl TermCriteria {
    pub fn new() -> TermCriteria {
        TermCriteria::default()
    }

    pub fn coercion(mut self, iri: impl Into<String>) -> Self {
        self.coercion = Some(iri.into());
        self
    }

    pub fn language(mut self, tag: impl Into<String>) -> Self {
        self.language = Some(tag.into());
        self
    }

    pub fn container(mut self, token: Container) -> Self {
        self.container = Some(token);
        self
    }

    pub fn reverse(mut self) -> Self {
        self.reverse = true;
        self
    }
}

/// One context source: inline data, a reference to be loaded, an ordered
/// list of further sources, or `null` (which resets the context).
#[derive(Debug, Clone)]
pub enum Source {
    Inline(serde_json::Map<String, Value>),
    Reference(String),
    List(Vec<Source>),
    Null,
}

impl From<Value> for Source {
    fn from(value: Value) -> Source {
        match value {
            Value::Object(object) => Source::Inline(object),
            Value::String(identifier) => Source::Reference(identifier),
            Value::Array(items) => Source::List(items.into_iter().map(Source::from).collect()),
            // Booleans and numbers carry no context meaning.
            _ => Source::Null,
        }
    }
}

impl From<&str> for Source {
    fn from(identifier: &str) -> Source {
        Source::Reference(identifier.to_string())
    }
}

impl From<String> for Source {
    fn from(identifier: String) -> Source {
        Source::Reference(identifier)
    }
}

impl From<Vec<Source>> for Source {
    fn from(items: Vec<Source>) -> Source {
        Source::List(items)
    }
}
