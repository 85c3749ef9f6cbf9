//! DMK Press (dmkpress.com) catalog.
//!
//! Book pages carry schema.org Product microdata; the ISBN is the last
//! segment of the book URL.

use super::{Catalog, PageContents, PageLink};
use crate::book::Book;
use crate::utils::{child_attr, child_text, collapse_whitespace, resolve_link, split_authors};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashMap;
use std::sync::LazyLock;
use url::Url;

const START_PAGE: &str = "https://dmkpress.com/catalog/computer/?&filter%5Bavailable%5D=on&filter%5Bprice%5D%5Bfrom%5D=1&filter%5Bprice%5D%5Bto%5D=2999&filter%5Brelease_date%5D%5Bfrom%5D=1041379200&filter%5Brelease_date%5D%5Bto%5D=1767225600&filter%5Btranslator%5D=&filter%5Bformat%5D=&filter%5Bbumaga%5D=&filter%5Boblozhka%5D=&order_filter%5Brelease_date%5D=1";

const PRODUCT_ITEMTYPE: &str = "http://schema.org/Product";

/// Author list sits between the "Автор:" label and the release date.
static AUTHOR_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)Автор:\s*(?P<authors>.*?)Дата выхода").unwrap());

/// Translator credit appended to the last author.
const TRANSLATOR_MARKER: &str = "Перевод";

/// CSS selectors used for parsing.
struct Selectors {
    book_link: Selector,
    /// Numbered pager links; filtered by text and href.
    pagination: Selector,
    /// Microdata blocks, of which the Product one is the book card.
    itemscope: Selector,
    title: Selector,
    cover: Selector,
    description: Selector,
}

impl Selectors {
    fn new() -> Self {
        Self {
            book_link: Selector::parse("#new-products .item-name a").unwrap(),
            pagination: Selector::parse(".pages.pull-right a").unwrap(),
            itemscope: Selector::parse("div[itemscope]").unwrap(),
            title: Selector::parse("span[itemprop=name]").unwrap(),
            cover: Selector::parse(".card-img").unwrap(),
            description: Selector::parse("#description").unwrap(),
        }
    }
}

/// Catalog for dmkpress.com.
pub struct Dmkpress {
    start_url: String,
    selectors: Selectors,
}

impl Dmkpress {
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

    /// Extracts authors from the card text, dropping the translator credit.
    fn extract_authors(text: &str) -> Vec<String> {
        let Some(caps) = AUTHOR_REGEX.captures(text) else {
            return Vec::new();
        };

        let raw = &caps["authors"];
        let raw = match raw.find(TRANSLATOR_MARKER) {
            Some(pos) => &raw[..pos],
            None => raw,
        };
        split_authors(raw)
    }

    /// Last non-empty path segment of the book URL.
    fn isbn_from_url(url: &Url) -> String {
        url.path_segments()
            .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
            .unwrap_or_default()
            .to_string()
    }

    fn extract_book(&self, card: &ElementRef, url: &Url) -> Book {
        let text = card.text().collect::<String>();
        let cover = child_attr(card, &self.selectors.cover, "src");

        Book {
            url: url.to_string(),
            image_url: resolve_link(url, &cover)
                .map(|u| u.to_string())
                .unwrap_or_default(),
            isbn: Self::isbn_from_url(url),
            title: collapse_whitespace(&child_text(card, &self.selectors.title)),
            authors: Self::extract_authors(&text),
            description: child_text(card, &self.selectors.description),
            publisher: self.publisher().to_string(),
            details: HashMap::new(),
        }
    }
}

impl Default for Dmkpress {
    fn default() -> Self {
        Self::new()
    }
}

impl Catalog for Dmkpress {
    fn name(&self) -> &'static str {
        "dmkpress"
    }

    fn publisher(&self) -> &'static str {
        "ДМК-Пресс"
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

        // Only numbered links keep the catalog filter; "next"/"prev" arrows
        // and unfiltered links lead into the whole catalog.
        let pages = doc
            .select(&self.selectors.pagination)
            .filter_map(|a| {
                let number: u32 = a.text().collect::<String>().trim().parse().ok()?;
                let href = a.value().attr("href")?;
                if !href.contains("filter") {
                    return None;
                }
                Some(PageLink {
                    url: resolve_link(url, href)?,
                    number: Some(number),
                })
            })
            .collect();

        let book = doc
            .select(&self.selectors.itemscope)
            .find(|card| card.value().attr("itemtype") == Some(PRODUCT_ITEMTYPE))
            .map(|card| self.extract_book(&card, url));

        PageContents {
            book_links,
            pages,
            book,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOOK_PAGE: &str = r#"
        <html><body>
          <div itemscope itemtype="http://schema.org/Organization"><span itemprop="name">ДМК</span></div>
          <div itemscope itemtype="http://schema.org/Product">
            <img class="card-img" src="/images/books/rust.jpg">
            <span itemprop="name">Rust для профессионалов</span>
            <div class="props">Автор:
              Иванов И. И., Петров П. П. Перевод с английского Сидорова С.
              Дата выхода: 2023
            </div>
            <div id="description">Книга о Rust.</div>
          </div>
        </body></html>"#;

    #[test]
    fn test_parse_book_page() {
        let dmk = Dmkpress::new();
        let url = Url::parse("https://dmkpress.com/catalog/computer/programming/978-5-93700-000-1/")
            .unwrap();
        let book = dmk.parse_page(&url, BOOK_PAGE).book.unwrap();

        assert_eq!(book.isbn, "978-5-93700-000-1");
        assert_eq!(book.title, "Rust для профессионалов");
        assert_eq!(book.authors, vec!["Иванов И. И.", "Петров П. П."]);
        assert_eq!(book.image_url, "https://dmkpress.com/images/books/rust.jpg");
        assert_eq!(book.description, "Книга о Rust.");
        assert_eq!(book.publisher, "ДМК-Пресс");
    }

    #[test]
    fn test_non_product_microdata_is_ignored() {
        let dmk = Dmkpress::new();
        let url = Url::parse("https://dmkpress.com/about/").unwrap();
        let html = r#"<div itemscope itemtype="http://schema.org/Organization">x</div>"#;
        assert!(dmk.parse_page(&url, html).book.is_none());
    }

    #[test]
    fn test_missing_author_block() {
        assert!(Dmkpress::extract_authors("Дата выхода: 2023").is_empty());
        assert_eq!(
            Dmkpress::extract_authors("Автор: Кнут Д. Дата выхода: 2020"),
            vec!["Кнут Д."]
        );
    }

    #[test]
    fn test_pagination_keeps_numbered_filtered_links() {
        let dmk = Dmkpress::new();
        let url = Url::parse("https://dmkpress.com/catalog/computer/?filter=1").unwrap();
        let html = r#"
            <div class="pages pull-right">
              <a href="/catalog/computer/?filter=1&page=2">2</a>
              <a href="/catalog/computer/?page=3">3</a>
              <a href="/catalog/computer/?filter=1&page=2">»</a>
              <a href="/catalog/computer/?filter=1&page=7">7</a>
            </div>"#;

        let pages = dmk.parse_page(&url, html).pages;
        let numbers: Vec<_> = pages.iter().map(|p| p.number).collect();
        assert_eq!(numbers, vec![Some(2), Some(7)]);
    }

    #[test]
    fn test_listing_links() {
        let dmk = Dmkpress::new();
        let url = Url::parse("https://dmkpress.com/catalog/computer/").unwrap();
        let html = r#"<div id="new-products"><div class="item-name"><a href="/catalog/computer/978-1/">Book</a></div></div>"#;

        let contents = dmk.parse_page(&url, html);
        assert_eq!(
            contents.book_links[0].as_str(),
            "https://dmkpress.com/catalog/computer/978-1/"
        );
        assert!(contents.book.is_none());
    }

    #[test]
    fn test_isbn_from_url() {
        let url = Url::parse("https://dmkpress.com/catalog/computer/978-5-97060-111-2").unwrap();
        assert_eq!(Dmkpress::isbn_from_url(&url), "978-5-97060-111-2");
    }
}
