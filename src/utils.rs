//! Utility functions shared by the publisher crawlers.

use scraper::{ElementRef, Selector};
use url::Url;

/// Returns the trimmed text of every element under `elem` matching `selector`.
///
/// Texts of multiple matches are concatenated in document order.
pub fn child_text(elem: &ElementRef, selector: &Selector) -> String {
    elem.select(selector)
        .flat_map(|child| child.text())
        .collect::<String>()
        .trim()
        .to_string()
}

/// Returns the attribute of the first element under `elem` matching `selector`.
pub fn child_attr(elem: &ElementRef, selector: &Selector, attr: &str) -> String {
    elem.select(selector)
        .find_map(|child| child.value().attr(attr))
        .unwrap_or_default()
        .trim()
        .to_string()
}

/// Collapses runs of whitespace into single spaces and trims the ends.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Splits a comma separated author line.
///
/// Names are trimmed and empty entries dropped, so a missing author element
/// yields an empty list rather than `[""]`.
pub fn split_authors(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(collapse_whitespace)
        .filter(|name| !name.is_empty())
        .collect()
}

/// Resolves `href` against `base` for following.
///
/// Fragments are dropped so that `page#reviews` and `page` count as one page.
/// Returns `None` for empty hrefs and non-HTTP schemes such as `mailto:`.
pub fn resolve_link(base: &Url, href: &str) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let mut url = base.join(href).ok()?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return None;
    }

    url.set_fragment(None);
    Some(url)
}
