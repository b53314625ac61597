//! Wiki-link parser: `[[Target]]`, `[[domain::Target]]`, `[[Target|Alias]]`.

use regex::Regex;
use std::sync::LazyLock;

static WIKI_LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\[([^\[\]]+)\]\]").unwrap());

/// A textual reference extracted from free text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WikiLink {
    pub target: String,
    pub domain: Option<String>,
    pub alias: Option<String>,
}

/// Scan free text for wiki-link occurrences. Fragments are trimmed; links
/// with empty inner contents are ignored.
pub fn extract_links(text: &str) -> Vec<WikiLink> {
    let mut links = Vec::new();
    for capture in WIKI_LINK_RE.captures_iter(text) {
        let inner = capture[1].trim();
        if inner.is_empty() {
            continue;
        }

        let (domain, rest) = match inner.split_once("::") {
            Some((domain, rest)) => (non_empty(domain), rest),
            None => (None, inner),
        };
        let (target, alias) = match rest.split_once('|') {
            Some((target, alias)) => (target.trim(), non_empty(alias)),
            None => (rest.trim(), None),
        };
        if target.is_empty() {
            continue;
        }

        links.push(WikiLink {
            target: target.to_string(),
            domain,
            alias,
        });
    }
    links
}

fn non_empty(fragment: &str) -> Option<String> {
    let trimmed = fragment.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
