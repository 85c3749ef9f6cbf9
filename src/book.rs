//! Book records produced by the publisher crawlers.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One scraped book listing.
///
/// Built once per detail page and never modified afterwards. ISBN is not
/// checked for uniqueness here; the store reconciles duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    /// Page the record was extracted from.
    pub url: String,

    /// Cover image location, empty when the page has none.
    #[serde(default)]
    pub image_url: String,

    /// ISBN as printed on the page.
    #[serde(default)]
    pub isbn: String,

    #[serde(default)]
    pub title: String,

    /// Authors in page order.
    #[serde(default)]
    pub authors: Vec<String>,

    #[serde(default)]
    pub description: String,

    /// Publisher name, constant per site.
    #[serde(default)]
    pub publisher: String,

    /// Free-form per-site metadata such as `year`.
    #[serde(default)]
    pub details: HashMap<String, String>,
}

impl Book {
    /// Returns a one-line label for logs.
    pub fn label(&self) -> String {
        if self.isbn.is_empty() {
            format!("{} <{}>", self.title, self.url)
        } else {
            format!("{} [{}]", self.title, self.isbn)
        }
    }
}

/// A book as kept by the store, with its stable row id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredBook {
    pub id: u64,

    #[serde(flatten)]
    pub book: Book,
}
