//! Rendering a context back to its canonical `"@context"` JSON form.

use serde_json::{Map, Value};

use crate::context::Context;
use crate::models::{TermDefinition, TermLanguage};

/// Emit the context's own settings and term table as a `"@context"`
/// object: `@base`/`@vocab`/`@language` when set, keyword alias
/// rebindings when non-default, then each term in minimal compact form.
pub(crate) fn to_dict(context: &Context) -> Map<String, Value> {
    let mut out = Map::new();
    if let Some(base) = context.base() {
        out.insert("@base".to_string(), Value::String(base.to_string()));
    }
    if let Some(vocab) = context.vocab() {
        out.insert("@vocab".to_string(), Value::String(vocab.to_string()));
    }
    if let Some(language) = context.language() {
        out.insert("@language".to_string(), Value::String(language.to_string()));
    }
    if context.id_key() != "@id" {
        out.insert(context.id_key().to_string(), Value::String("@id".to_string()));
    }
    if context.lang_key() != "@language" {
        out.insert(
            context.lang_key().to_string(),
            Value::String("@language".to_string()),
        );
    }
    for term in context.own_terms() {
        out.insert(term.name.clone(), term_value(term));
    }
    out
}

/// A bare IRI string for a plain term, otherwise an object carrying
/// `@id` (or `@reverse`) and whatever qualifiers are non-default.
fn term_value(term: &TermDefinition) -> Value {
    if term.is_plain() && term.container.is_empty() && !term.reverse {
        return Value::String(term.id.clone());
    }
    let mut object = Map::new();
    if term.reverse {
        object.insert("@reverse".to_string(), Value::String(term.id.clone()));
    } else {
        object.insert("@id".to_string(), Value::String(term.id.clone()));
    }
    if let Some(coercion) = &term.coercion {
        object.insert("@type".to_string(), Value::String(coercion.clone()));
    }
    match &term.language {
        TermLanguage::Unset => {}
        TermLanguage::Null => {
            object.insert("@language".to_string(), Value::Null);
        }
        TermLanguage::Tag(tag) => {
            object.insert("@language".to_string(), Value::String(tag.clone()));
        }
    }
    if !term.container.is_empty() {
        let keywords: Vec<&str> = term.container.iter().map(|c| c.keyword()).collect();
        let value = match keywords.as_slice() {
            [single] => Value::String((*single).to_string()),
            multiple => Value::Array(
                multiple
                    .iter()
                    .map(|keyword| Value::String((*keyword).to_string()))
                    .collect(),
            ),
        };
        object.insert("@container".to_string(), value);
    }
    Value::Object(object)
}
