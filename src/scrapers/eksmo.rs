//! Eksmo (eksmo.ru) catalog.
//!
//! The computer literature section mixes in books from other categories, so
//! only cards tagged with the computer category are followed.

use super::{Catalog, PageContents, PageLink};
use crate::book::Book;
use crate::utils::{child_attr, child_text, collapse_whitespace, resolve_link, split_authors};
use scraper::{ElementRef, Html, Selector};
use std::collections::HashMap;
use url::Url;

const START_PAGE: &str = "https://eksmo.ru/professionalnaia-literatura/kompyuternaya-literatura/";

/// Label of the property row holding the release date.
const RELEASE_DATE_LABEL: &str = "Дата выхода:";

/// CSS selectors used for parsing.
struct Selectors {
    book_link: Selector,
    pagination: Selector,
    card: Selector,
    title: Selector,
    author: Selector,
    cover: Selector,
    isbn: Selector,
    description: Selector,
    /// Ninth property row and its label.
    release_row: Selector,
    release_label: Selector,
}

impl Selectors {
    fn new() -> Self {
        Self {
            book_link: Selector::parse(
                r#".book_fast-view[data-last-category="Компьютерная литература"] .book__link"#,
            )
            .unwrap(),
            pagination: Selector::parse(".pagenav__list a").unwrap(),
            card: Selector::parse(".book-page__card-cont").unwrap(),
            title: Selector::parse(".book-page__card-title").unwrap(),
            author: Selector::parse(".book-page__card-author a").unwrap(),
            cover: Selector::parse(".book-page__cover-link").unwrap(),
            isbn: Selector::parse(".book-page__copy-isbn .copy__val").unwrap(),
            description: Selector::parse(".spoiler__text p").unwrap(),
            release_row: Selector::parse(".book-page__card-props div:nth-child(9)").unwrap(),
            release_label: Selector::parse(".book-page__card-props div:nth-child(9) span")
                .unwrap(),
        }
    }
}

/// Catalog for eksmo.ru.
pub struct Eksmo {
    start_url: String,
    selectors: Selectors,
}

impl Eksmo {
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

    /// Year is the last word of the release row, when the row is labelled.
    fn extract_year(&self, card: &ElementRef) -> Option<String> {
        if child_text(card, &self.selectors.release_label) != RELEASE_DATE_LABEL {
            return None;
        }

        child_text(card, &self.selectors.release_row)
            .split_whitespace()
            .last()
            .map(str::to_string)
    }

    fn extract_book(&self, card: &ElementRef, url: &Url) -> Book {
        // One link per author; a link may still list several names.
        let authors = card
            .select(&self.selectors.author)
            .flat_map(|a| split_authors(&a.text().collect::<String>()))
            .collect();

        let cover = child_attr(card, &self.selectors.cover, "href");

        let mut details = HashMap::new();
        if let Some(year) = self.extract_year(card) {
            details.insert("year".to_string(), year);
        }

        Book {
            url: url.to_string(),
            image_url: resolve_link(url, &cover)
                .map(|u| u.to_string())
                .unwrap_or_default(),
            isbn: collapse_whitespace(&child_text(card, &self.selectors.isbn)),
            title: collapse_whitespace(&child_text(card, &self.selectors.title)),
            authors,
            description: child_text(card, &self.selectors.description),
            publisher: self.publisher().to_string(),
            details,
        }
    }
}

impl Default for Eksmo {
    fn default() -> Self {
        Self::new()
    }
}

impl Catalog for Eksmo {
    fn name(&self) -> &'static str {
        "eksmo"
    }

    fn publisher(&self) -> &'static str {
        "Эксмо"
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

        let book = doc
            .select(&self.selectors.card)
            .next()
            .map(|card| self.extract_book(&card, url));

        PageContents {
            book_links,
            pages,
            book,
        }
    }
}
