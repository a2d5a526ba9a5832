//! Loading of referenced context sources.
//!
//! A context source given as a string is an identifier to be fetched and
//! parsed. The capability doing that is injected: [`ContextFetcher`] is the
//! default (HTTP(S) plus local files, with an optional on-disk cache), and
//! [`MemoryLoader`] serves pre-registered documents for tests and
//! embedding.

use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::error::Error;
use std::fmt;
use std::fs;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

/// Injected capability resolving a reference identifier to a parsed JSON
/// document. Errors pass through to the caller untouched.
pub trait SourceLoader {
    fn load(&self, identifier: &str) -> Result<serde_json::Value, Box<dyn Error>>;
}

/// Default loader: `http(s)://` identifiers over the network, `file://`
/// identifiers and bare paths from the filesystem.
///
/// With a cache directory configured, successful fetches are written
/// through and a failed fetch falls back to the cached copy when one
/// exists.
pub struct ContextFetcher {
    cache_dir: Option<PathBuf>,
}

impl Default for ContextFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl ContextFetcher {
    pub fn new() -> Self {
        ContextFetcher { cache_dir: None }
    }

    pub fn with_cache_dir(cache_dir: impl Into<PathBuf>) -> Self {
        ContextFetcher {
            cache_dir: Some(cache_dir.into()),
        }
    }

    /// Returns the cache file path for a given URL, when caching is
    /// enabled. Uses a hash of the URL as the filename.
    fn cache_path(&self, url: &str) -> Option<PathBuf> {
        let cache_dir = self.cache_dir.as_ref()?;
        let mut hasher = DefaultHasher::new();
        url.hash(&mut hasher);
        Some(cache_dir.join(format!("{:016x}.json", hasher.finish())))
    }

    fn fetch(&self, url: &str) -> Result<String, Box<dyn Error>> {
        let cache_path = self.cache_path(url);
        match Self::fetch_from_network(url) {
            Ok(body) => {
                if let Some(path) = &cache_path
                    && let Err(e) = Self::write_cache(path, &body)
                {
                    warn!(url, error = %e, "failed to write context cache");
                }
                Ok(body)
            }
            Err(network_err) => {
                if let Some(path) = cache_path.filter(|path| path.exists()) {
                    warn!(url, "network fetch failed, using cached context");
                    Ok(fs::read_to_string(&path)?)
                } else {
                    Err(network_err)
                }
            }
        }
    }

    fn fetch_from_network(url: &str) -> Result<String, Box<dyn Error>> {
        debug!(url, "fetching remote context");
        let body = ureq::get(url)
            .header("Accept", "application/ld+json")
            .call()?
            .body_mut()
            .read_to_string()?;
        Ok(body)
    }

    fn write_cache(path: &Path, content: &str) -> Result<(), std::io::Error> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)
    }
}

impl SourceLoader for ContextFetcher {
    fn load(&self, identifier: &str) -> Result<serde_json::Value, Box<dyn Error>> {
        let body = if identifier.starts_with("http://") || identifier.starts_with("https://") {
            self.fetch(identifier)?
        } else if let Some(path) = identifier.strip_prefix("file://") {
            fs::read_to_string(path)?
        } else {
            fs::read_to_string(identifier)?
        };
        Ok(serde_json::from_str(&body)?)
    }
}

/// Map-backed loader: identifiers resolve to pre-registered documents,
/// nothing touches the network or filesystem.
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    sources: HashMap<String, serde_json::Value>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        MemoryLoader::default()
    }

    pub fn insert(
        &mut self,
        identifier: impl Into<String>,
        document: serde_json::Value,
    ) -> &mut Self {
        self.sources.insert(identifier.into(), document);
        self
    }
}

impl SourceLoader for MemoryLoader {
    fn load(&self, identifier: &str) -> Result<serde_json::Value, Box<dyn Error>> {
        match self.sources.get(identifier) {
            Some(document) => Ok(document.clone()),
            None => Err(Box::new(UnknownSource {
                identifier: identifier.to_string(),
            })),
        }
    }
}

#[derive(Debug)]
struct UnknownSource {
    identifier: String,
}

impl fmt::Display for UnknownSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "no source registered for {}", self.identifier)
    }
}

impl Error for UnknownSource {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn temp_cache_dir(suffix: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "ld_context_test_{}_{suffix}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn cleanup(dir: &Path) {
        let _ = fs::remove_dir_all(dir);
    }

    // === cache_path tests ===

    #[test]
    fn cache_path_is_deterministic() {
        let dir = temp_cache_dir("deterministic");
        let fetcher = ContextFetcher::with_cache_dir(&dir);
        let url = "https://www.w3.org/ns/activitystreams";
        assert_eq!(fetcher.cache_path(url), fetcher.cache_path(url));
        cleanup(&dir);
    }

    #[test]
    fn cache_path_differs_for_different_urls() {
        let dir = temp_cache_dir("differs");
        let fetcher = ContextFetcher::with_cache_dir(&dir);
        let path1 = fetcher.cache_path("https://www.w3.org/ns/activitystreams");
        let path2 = fetcher.cache_path("https://w3id.org/security/v1");
        assert_ne!(path1, path2);
        cleanup(&dir);
    }

    #[test]
    fn cache_path_is_inside_cache_dir() {
        let dir = temp_cache_dir("inside");
        let fetcher = ContextFetcher::with_cache_dir(&dir);
        let path = fetcher.cache_path("https://example.com").unwrap();
        assert!(path.starts_with(&dir));
        assert_eq!(path.extension().unwrap(), "json");
        cleanup(&dir);
    }

    #[test]
    fn cache_path_disabled_without_cache_dir() {
        let fetcher = ContextFetcher::new();
        assert_eq!(fetcher.cache_path("https://example.com"), None);
    }

    // === fetch with cache fallback ===

    #[test]
    fn fetch_uses_cache_on_network_failure() {
        let dir = temp_cache_dir("cache_fallback");
        let fetcher = ContextFetcher::with_cache_dir(&dir);
        let url = "https://nonexistent.invalid/context";

        let cache_path = fetcher.cache_path(url).unwrap();
        fs::create_dir_all(cache_path.parent().unwrap()).unwrap();
        fs::write(&cache_path, r#"{"@context": {"id": "@id"}}"#).unwrap();

        let document = fetcher.load(url).unwrap();
        assert_eq!(document, json!({"@context": {"id": "@id"}}));
        cleanup(&dir);
    }

    #[test]
    fn fetch_errors_when_no_cache_and_network_fails() {
        let dir = temp_cache_dir("no_cache");
        let fetcher = ContextFetcher::with_cache_dir(&dir);
        assert!(fetcher.load("https://nonexistent.invalid/context").is_err());
        cleanup(&dir);
    }

    // === file loading ===

    #[test]
    fn load_reads_file_uri() {
        let dir = temp_cache_dir("file_uri");
        let path = dir.join("context.jsonld");
        fs::write(&path, r#"{"@context": {"ex": "http://example.com/"}}"#).unwrap();

        let fetcher = ContextFetcher::new();
        let document = fetcher.load(&format!("file://{}", path.display())).unwrap();
        assert_eq!(document["@context"]["ex"], json!("http://example.com/"));
        cleanup(&dir);
    }

    #[test]
    fn load_reads_bare_path() {
        let dir = temp_cache_dir("bare_path");
        let path = dir.join("context.jsonld");
        fs::write(&path, r#"{"@context": {}}"#).unwrap();

        let fetcher = ContextFetcher::new();
        assert!(fetcher.load(&path.display().to_string()).is_ok());
        cleanup(&dir);
    }

    #[test]
    fn load_surfaces_malformed_json() {
        let dir = temp_cache_dir("bad_json");
        let path = dir.join("broken.jsonld");
        fs::write(&path, "{not json").unwrap();

        let fetcher = ContextFetcher::new();
        assert!(fetcher.load(&path.display().to_string()).is_err());
        cleanup(&dir);
    }

    // === memory loader ===

    #[test]
    fn memory_loader_serves_registered_documents() {
        let mut loader = MemoryLoader::new();
        loader.insert(
            "http://example.org/context.jsonld",
            json!({"@context": {"n": "name"}}),
        );
        let document = loader.load("http://example.org/context.jsonld").unwrap();
        assert_eq!(document["@context"]["n"], json!("name"));
    }

    #[test]
    fn memory_loader_errors_on_unknown_identifier() {
        let loader = MemoryLoader::new();
        let err = loader.load("http://example.org/missing.jsonld").unwrap_err();
        assert!(err.to_string().contains("missing.jsonld"));
    }

    // === network integration tests (require internet access) ===

    #[test]
    #[ignore]
    fn fetch_activitystreams_context() {
        let fetcher = ContextFetcher::new();
        let document = fetcher.load("https://www.w3.org/ns/activitystreams").unwrap();
        assert!(document.get("@context").is_some());
    }

    #[test]
    #[ignore]
    fn fetch_writes_cache_file_on_success() {
        let dir = temp_cache_dir("write_cache");
        let fetcher = ContextFetcher::with_cache_dir(&dir);
        let url = "https://www.w3.org/ns/activitystreams";
        let cache_path = fetcher.cache_path(url).unwrap();

        let _ = fs::remove_file(&cache_path);
        fetcher.load(url).unwrap();
        assert!(cache_path.exists());
        cleanup(&dir);
    }
}
