//! Piter (piter.com) catalog.
//!
//! Crawls the "computers and internet" collection, newest first.

use super::{Catalog, PageContents, PageLink};
use crate::book::Book;
use crate::utils::{child_attr, child_text, collapse_whitespace, resolve_link, split_authors};
use scraper::{Html, Selector};
use std::collections::HashMap;
use url::Url;

const START_PAGE: &str = "https://www.piter.com/collection/kompyutery-i-internet?page_size=100&order=descending_age&q=&options%5B169105%5D%5B%5D=1717868";

/// CSS selectors used for parsing.
struct Selectors {
    /// Book links on a listing page.
    book_link: Selector,
    /// Pager links.
    pagination: Selector,
    /// Product card on a book page.
    product: Selector,
    title: Selector,
    author: Selector,
    cover: Selector,
    /// Property rows hold ISBN in row 7 and year in row 2.
    isbn: Selector,
    year: Selector,
    /// Description tab, outside the product card.
    description: Selector,
}

impl Selectors {
    fn new() -> Self {
        Self {
            book_link: Selector::parse(".products-list a").unwrap(),
            pagination: Selector::parse(".pagination a").unwrap(),
            product: Selector::parse(".product-block").unwrap(),
            title: Selector::parse(".product-info h1").unwrap(),
            author: Selector::parse(".author").unwrap(),
            cover: Selector::parse(".coverProduct").unwrap(),
            isbn: Selector::parse("li:nth-child(7) .grid-7").unwrap(),
            year: Selector::parse("li:nth-child(2) .grid-7").unwrap(),
            description: Selector::parse("#tab-1").unwrap(),
        }
    }
}

/// Catalog for piter.com.
pub struct Piter {
    start_url: String,
    selectors: Selectors,
}

impl Piter {
    pub fn new() -> Self {
        Self::with_start_url(START_PAGE)
    }

    /// Uses another listing page as the crawl entry point.
    pub fn with_start_url(start_url: &str) -> Self {
        Self {
            start_url: start_url.to_string(),
            selectors: Selectors::new(),
        }
    }

    fn extract_book(&self, doc: &Html, url: &Url) -> Option<Book> {
        let product = doc.select(&self.selectors.product).next()?;

        let description = doc
            .select(&self.selectors.description)
            .next()
            .map(|tab| tab.text().collect::<String>().trim().to_string())
            .unwrap_or_default();

        let mut details = HashMap::new();
        let year = child_text(&product, &self.selectors.year);
        if !year.is_empty() {
            details.insert("year".to_string(), year);
        }

        Some(Book {
            url: url.to_string(),
            image_url: child_attr(&product, &self.selectors.cover, "src"),
            isbn: collapse_whitespace(&child_text(&product, &self.selectors.isbn)),
            title: collapse_whitespace(&child_text(&product, &self.selectors.title)),
            authors: split_authors(&child_text(&product, &self.selectors.author)),
            description,
            publisher: self.publisher().to_string(),
            details,
        })
    }
}

impl Default for Piter {
    fn default() -> Self {
        Self::new()
    }
}

impl Catalog for Piter {
    fn name(&self) -> &'static str {
        "piter"
    }

    fn publisher(&self) -> &'static str {
        "Питер"
    }

    fn start_url(&self) -> &str {
        &self.start_url
    }

    fn parse_page(&self, url: &Url, html: &str) -> PageContents {
        let doc = Html::parse_document(html);

        let book_links = doc
            .select(&self.selectors.book_link)
            .filter_map(|a| a.value().attr("href"))
            .filter_map(|href| resolve_link(url, href))
            .collect();

        let pages = doc
            .select(&self.selectors.pagination)
            .filter_map(|a| {
                let href = a.value().attr("href")?;
                Some(PageLink {
                    url: resolve_link(url, href)?,
                    number: a.text().collect::<String>().trim().parse().ok(),
                })
            })
            .collect();

        PageContents {
            book_links,
            pages,
            book: self.extract_book(&doc, url),
        }
    }
}
