//! URL utilities for identifiers, query parameters and hand-off links

use crate::error::GateKeyError;
use regex::Regex;
use url::Url;

/// Hosts that answer with a messaging-app landing page instead of a key
const MESSAGING_HOSTS: &[&str] = &["t.me", "telegram.me", "telegram.dog"];

/// Extract the trailing path segment of a URL (the provider identifier / alias)
pub fn last_path_segment(url: &str) -> Result<String, GateKeyError> {
    let parsed = Url::parse(url)?;
    let segment = parsed
        .path()
        .trim_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default();

    if segment.is_empty() {
        return Err(GateKeyError::ExtractionFailure(format!(
            "no path segment in {}",
            url
        )));
    }
    Ok(segment.to_string())
}

/// Resolve a `location` header value against the URL that produced it
pub fn resolve_location(base: &str, location: &str) -> Result<String, GateKeyError> {
    Ok(Url::parse(base)?.join(location)?.to_string())
}

/// Extract `name=` from a URL using a greedy match up to the next `&`
pub fn query_param(url: &str, name: &str) -> Result<Option<String>, GateKeyError> {
    let pattern = Regex::new(&format!(r"{}=([^&]+)", regex::escape(name)))?;
    Ok(pattern
        .captures(url)
        .and_then(|captures| captures.get(1))
        .map(|value| value.as_str().to_string()))
}

/// Check if a redirect target is a messaging-app deep link
pub fn is_messaging_deep_link(url: &str) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };

    if parsed.scheme() == "tg" {
        return true;
    }

    parsed
        .host_str()
        .map(|host| {
            let host = host.trim_start_matches("www.");
            MESSAGING_HOSTS.contains(&host)
        })
        .unwrap_or(false)
}
