//! Relative IRI resolution and compact IRI handling.
//!
//! Implements the RFC 3986 reference-resolution subset JSON-LD contexts
//! need, plus `prefix:suffix` expansion against declared terms and the
//! default vocabulary, and the inverse longest-prefix compaction.

/// Upper bound on recursive expansion steps. A declaration that keeps
/// producing new compact forms past this depth is returned literally.
const MAX_EXPANSION_DEPTH: usize = 8;

/// Resolve `reference` against `base` per RFC 3986 section 5.
///
/// Absolute references are returned unchanged. A relative reference with
/// no base is also returned unchanged: unresolved, but defined.
pub(crate) fn resolve(reference: &str, base: Option<&str>) -> String {
    if has_scheme(reference) {
        return reference.to_string();
    }
    let Some(base) = base else {
        return reference.to_string();
    };
    let b = split_iri(base);
    let r = split_iri(reference);

    let authority;
    let path;
    let query;
    if r.authority.is_some() {
        authority = r.authority;
        path = remove_dot_segments(r.path);
        query = r.query;
    } else if r.path.is_empty() {
        authority = b.authority;
        path = b.path.to_string();
        query = r.query.or(b.query);
    } else {
        authority = b.authority;
        path = if r.path.starts_with('/') {
            remove_dot_segments(r.path)
        } else {
            remove_dot_segments(&merge_paths(&b, r.path))
        };
        query = r.query;
    }
    recompose(b.scheme, authority, &path, query, r.fragment)
}

/// Expand a term name, compact IRI, or IRI.
///
/// `lookup` maps a term name to its (possibly still compact) identifier;
/// callers layer "declarations in the local context object being parsed"
/// over "terms already in scope" through it. Precedence: exact term match,
/// then compact-IRI prefix match (the prefix must map to an absolute IRI;
/// the remainder is concatenated verbatim), then default-vocabulary
/// concatenation for colon-free input, else the input unchanged. Keywords
/// and blank-node identifiers pass through.
pub(crate) fn expand_compact<F>(expr: &str, vocab: Option<&str>, lookup: &F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    expand_step(expr, None, vocab, lookup, MAX_EXPANSION_DEPTH)
}

fn expand_step<F>(
    expr: &str,
    prev: Option<&str>,
    vocab: Option<&str>,
    lookup: &F,
    depth: usize,
) -> String
where
    F: Fn(&str) -> Option<String>,
{
    if depth == 0 || prev == Some(expr) || expr.starts_with('@') {
        return expr.to_string();
    }
    let next = match split_compact(expr) {
        CompactForm::Compact(prefix, local) => {
            let expanded = lookup(expr).or_else(|| {
                lookup(prefix)
                    .filter(|ns| ns.contains(':'))
                    .map(|ns| format!("{ns}{local}"))
            });
            match expanded {
                Some(expanded) => expanded,
                None => return expr.to_string(),
            }
        }
        CompactForm::Bare(name) => {
            let substituted = lookup(name).unwrap_or_else(|| name.to_string());
            match vocab {
                Some(vocab) if !substituted.contains(':') => {
                    return format!("{vocab}{substituted}");
                }
                _ => substituted,
            }
        }
        CompactForm::Opaque => return expr.to_string(),
    };
    expand_step(&next, Some(expr), vocab, lookup, depth - 1)
}

/// Compact `iri` to `prefix:suffix` form using the longest candidate
/// namespace that is a proper prefix of it. Candidates shorter than one
/// character are ignored; length ties keep the first candidate.
pub(crate) fn shrink<'a, I>(iri: &str, prefixes: I) -> Option<String>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut best: Option<(&str, &str)> = None;
    for (name, ns) in prefixes {
        if !ns.is_empty()
            && iri.len() > ns.len()
            && iri.starts_with(ns)
            && best.map_or(true, |(_, b)| ns.len() > b.len())
        {
            best = Some((name, ns));
        }
    }
    best.map(|(name, ns)| format!("{name}:{}", &iri[ns.len()..]))
}

enum CompactForm<'a> {
    /// No colon: a bare term name or relative suffix.
    Bare(&'a str),
    /// `prefix:local` where the prefix may be a declared term.
    Compact(&'a str, &'a str),
    /// Scheme-qualified (`scheme://...`) or blank-node input.
    Opaque,
}

fn split_compact(expr: &str) -> CompactForm<'_> {
    match expr.split_once(':') {
        None => CompactForm::Bare(expr),
        Some((prefix, local)) => {
            if local.starts_with("//") || prefix == "_" {
                CompactForm::Opaque
            } else {
                CompactForm::Compact(prefix, local)
            }
        }
    }
}

struct IriParts<'a> {
    scheme: Option<&'a str>,
    authority: Option<&'a str>,
    path: &'a str,
    query: Option<&'a str>,
    fragment: Option<&'a str>,
}

fn split_iri(iri: &str) -> IriParts<'_> {
    let (rest, fragment) = match iri.split_once('#') {
        Some((rest, fragment)) => (rest, Some(fragment)),
        None => (iri, None),
    };
    let (rest, query) = match rest.split_once('?') {
        Some((rest, query)) => (rest, Some(query)),
        None => (rest, None),
    };
    let (scheme, rest) = match rest.find(':') {
        Some(i) if is_scheme(&rest[..i]) => (Some(&rest[..i]), &rest[i + 1..]),
        _ => (None, rest),
    };
    let (authority, path) = match rest.strip_prefix("//") {
        Some(rest) => match rest.find('/') {
            Some(i) => (Some(&rest[..i]), &rest[i..]),
            None => (Some(rest), ""),
        },
        None => (None, rest),
    };
    IriParts {
        scheme,
        authority,
        path,
        query,
        fragment,
    }
}

/// RFC 3986 section 5.3 component recomposition.
fn recompose(
    scheme: Option<&str>,
    authority: Option<&str>,
    path: &str,
    query: Option<&str>,
    fragment: Option<&str>,
) -> String {
    let mut result = String::new();
    if let Some(scheme) = scheme {
        result.push_str(scheme);
        result.push(':');
    }
    if let Some(authority) = authority {
        result.push_str("//");
        result.push_str(authority);
    }
    result.push_str(path);
    if let Some(query) = query {
        result.push('?');
        result.push_str(query);
    }
    if let Some(fragment) = fragment {
        result.push('#');
        result.push_str(fragment);
    }
    result
}

fn is_scheme(candidate: &str) -> bool {
    let mut chars = candidate.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// True when `reference` starts with a scheme, i.e. is absolute.
fn has_scheme(reference: &str) -> bool {
    match reference.find(|c| matches!(c, ':' | '/' | '?' | '#')) {
        Some(i) if reference.as_bytes()[i] == b':' => is_scheme(&reference[..i]),
        _ => false,
    }
}

/// RFC 3986 section 5.3 path merge.
fn merge_paths(base: &IriParts<'_>, reference_path: &str) -> String {
    if base.authority.is_some() && base.path.is_empty() {
        return format!("/{reference_path}");
    }
    match base.path.rfind('/') {
        Some(i) => format!("{}{}", &base.path[..=i], reference_path),
        None => reference_path.to_string(),
    }
}

/// RFC 3986 section 5.2.4. `..` segments never climb above the root.
fn remove_dot_segments(path: &str) -> String {
    let mut input = path;
    let mut output = String::new();
    while !input.is_empty() {
        if let Some(rest) = input.strip_prefix("../") {
            input = rest;
        } else if let Some(rest) = input.strip_prefix("./") {
            input = rest;
        } else if input.starts_with("/./") {
            input = &input[2..];
        } else if input == "/." {
            input = "/";
        } else if input.starts_with("/../") {
            input = &input[3..];
            pop_segment(&mut output);
        } else if input == "/.." {
            input = "/";
            pop_segment(&mut output);
        } else if input == "." || input == ".." {
            input = "";
        } else {
            let start = usize::from(input.starts_with('/'));
            let end = input[start..].find('/').map_or(input.len(), |i| i + start);
            output.push_str(&input[..end]);
            input = &input[end..];
        }
    }
    output
}

fn pop_segment(output: &mut String) {
    match output.rfind('/') {
        Some(i) => output.truncate(i),
        None => output.clear(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // === resolve ===

    #[test]
    fn resolve_absolute_reference_unchanged() {
        assert_eq!(
            resolve("http://other.org/x", Some("http://example.org/a/b")),
            "http://other.org/x"
        );
        assert_eq!(resolve("urn:x:1", Some("http://example.org/")), "urn:x:1");
    }

    #[test]
    fn resolve_without_base_is_degraded_but_defined() {
        assert_eq!(resolve("../other", None), "../other");
        assert_eq!(resolve("http://example.org/a", None), "http://example.org/a");
    }

    #[test]
    fn resolve_absolute_path_reference() {
        let base = Some("http://example.org/path/leaf");
        assert_eq!(resolve("/", base), "http://example.org/");
        assert_eq!(resolve("/trail", base), "http://example.org/trail");
    }

    #[test]
    fn resolve_relative_path_reference() {
        let base = Some("http://example.org/path/leaf");
        assert_eq!(resolve("other", base), "http://example.org/path/other");
        assert_eq!(resolve("../", base), "http://example.org/");
        assert_eq!(resolve("./here", base), "http://example.org/path/here");
    }

    #[test]
    fn resolve_clamps_at_root() {
        let base = Some("http://example.org/path/leaf");
        assert_eq!(resolve("../../", base), "http://example.org/");
        assert_eq!(resolve("../../../x", base), "http://example.org/x");
    }

    #[test]
    fn resolve_network_path_reference() {
        assert_eq!(
            resolve("//other.org/x", Some("https://example.org/a/b")),
            "https://other.org/x"
        );
    }

    #[test]
    fn resolve_query_and_fragment_references() {
        let base = Some("http://example.org/path/leaf?old");
        assert_eq!(resolve("?q=1", base), "http://example.org/path/leaf?q=1");
        assert_eq!(resolve("#frag", base), "http://example.org/path/leaf?old#frag");
        assert_eq!(resolve("", base), "http://example.org/path/leaf?old");
    }

    #[test]
    fn resolve_against_authority_only_base() {
        assert_eq!(resolve("x", Some("http://example.org")), "http://example.org/x");
    }

    // === remove_dot_segments ===

    #[test]
    fn dot_segments_removed() {
        assert_eq!(remove_dot_segments("/a/b/c/./../../g"), "/a/g");
        assert_eq!(remove_dot_segments("mid/content=5/../6"), "mid/6");
        assert_eq!(remove_dot_segments("/a/../../"), "/");
        assert_eq!(remove_dot_segments("/a/.."), "/");
    }

    // === expand_compact ===

    fn no_terms(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn expand_keyword_and_blank_node_pass_through() {
        assert_eq!(expand_compact("@id", Some("http://v/"), &no_terms), "@id");
        assert_eq!(expand_compact("_:b0", Some("http://v/"), &no_terms), "_:b0");
    }

    #[test]
    fn expand_bare_name_uses_vocab() {
        assert_eq!(
            expand_compact("term", Some("http://example.org/ns/"), &no_terms),
            "http://example.org/ns/term"
        );
        assert_eq!(expand_compact("term", None, &no_terms), "term");
    }

    #[test]
    fn expand_exact_term_match_wins() {
        let lookup = |name: &str| {
            (name == "label").then(|| "http://example.org/ns/label".to_string())
        };
        assert_eq!(
            expand_compact("label", Some("http://other.org/"), &lookup),
            "http://example.org/ns/label"
        );
    }

    #[test]
    fn expand_compact_iri_concatenates_suffix_verbatim() {
        let lookup =
            |name: &str| (name == "x").then(|| "http://example.org/ns/".to_string());
        assert_eq!(
            expand_compact("x:a/./b", None, &lookup),
            "http://example.org/ns/a/./b"
        );
    }

    #[test]
    fn expand_unresolvable_compact_form_unchanged() {
        // A colon-bearing form never falls back to the vocabulary.
        assert_eq!(expand_compact("ex:term", Some("ex:"), &no_terms), "ex:term");
        assert_eq!(expand_compact("http://example.org/a", None, &no_terms), "http://example.org/a");
    }

    #[test]
    fn expand_prefix_must_map_to_absolute_iri() {
        let lookup = |name: &str| (name == "rel").then(|| "relative/".to_string());
        assert_eq!(expand_compact("rel:x", None, &lookup), "rel:x");
    }

    #[test]
    fn expand_self_referential_declaration_terminates() {
        let lookup = |name: &str| (name == "a").then(|| "a:x".to_string());
        // Keeps growing "a:x", "a:xx", ... until the depth bound trips.
        let expanded = expand_compact("a:x", None, &lookup);
        assert!(expanded.starts_with("a:x"));
    }

    // === shrink ===

    #[test]
    fn shrink_picks_longest_prefix() {
        let prefixes = [
            ("ns", "http://example.org/ns/"),
            ("deep", "http://example.org/ns/deep/"),
        ];
        assert_eq!(
            shrink("http://example.org/ns/deep/x", prefixes),
            Some("deep:x".to_string())
        );
    }

    #[test]
    fn shrink_requires_proper_prefix() {
        let prefixes = [("ns", "http://example.org/ns/")];
        // Equal strings leave no suffix to emit.
        assert_eq!(shrink("http://example.org/ns/", prefixes), None);
        assert_eq!(shrink("http://other.org/x", prefixes), None);
    }

    #[test]
    fn shrink_length_tie_keeps_first() {
        let prefixes = [("a", "http://example.org/"), ("b", "http://example.org/")];
        assert_eq!(
            shrink("http://example.org/x", prefixes),
            Some("a:x".to_string())
        );
    }
}
