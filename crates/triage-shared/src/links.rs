//! Link handling: global URL resolution and nested-reference extraction.

use once_cell::sync::Lazy;
use regex::Regex;

static HREF: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r#"(?i)href\s*=\s*["']([^"']*)["']"#).ok());

/// True for links that already carry a scheme we can fetch
pub fn is_absolute(href: &str) -> bool {
    href.starts_with("http://") || href.starts_with("https://")
}

/// Turn a document-local link into a fetchable URL.
///
/// Absolute links are returned unchanged. Anything else has its leading
/// slashes stripped and is appended to `base`.
pub fn global_url(base: &str, href: &str) -> String {
    if is_absolute(href) {
        return href.to_string();
    }
    let local = href.trim_start_matches('/');
    if base.ends_with('/') || base.is_empty() {
        format!("{}{}", base, local)
    } else {
        format!("{}/{}", base, local)
    }
}

/// Outbound hyperlink targets in a log body, in order of appearance,
/// without duplicates. Fragment-only, mail and script links are skipped.
pub fn extract_references(body: &str) -> Vec<String> {
    let Some(re) = HREF.as_ref() else {
        return Vec::new();
    };

    let mut refs: Vec<String> = Vec::new();
    for cap in re.captures_iter(body) {
        let target = cap[1].trim();
        if target.is_empty()
            || target.starts_with('#')
            || target.starts_with("mailto:")
            || target.starts_with("javascript:")
        {
            continue;
        }
        if !refs.iter().any(|r| r == target) {
            refs.push(target.to_string());
        }
    }
    refs
}

/// Last path segment of a URL, for terse log lines
pub fn short_name(url: &str) -> &str {
    url.rsplit('/').next().unwrap_or(url)
}
