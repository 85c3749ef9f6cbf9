//! Bounded traversal of a publisher catalog.
//!
//! The walk starts at the catalog's start page and follows detail links and
//! pagination links breadth first. Each URL is fetched at most once per walk.
//! Detail links are taken from listing pages only, and pagination stops after
//! `max_pages` listing pages, so a walk fetches at most `max_pages` listing
//! pages plus the books they link to.

use super::{BookSink, Catalog, PageLink};
use crate::error::ScraperError;
use crate::fetcher::PageFetcher;
use std::collections::{HashSet, VecDeque};
use tokio_util::sync::CancellationToken;
use url::Url;

/// Limits applied to one walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalkLimits {
    /// Listing pages to visit, start page included.
    pub max_pages: u32,
}

impl Default for WalkLimits {
    fn default() -> Self {
        Self { max_pages: 5 }
    }
}

/// Counters reported at the end of a walk.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WalkStats {
    /// Pages fetched successfully.
    pub pages: usize,
    /// Books sent to the sink.
    pub books: usize,
    /// Pages that failed to fetch and were skipped.
    pub skipped: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PageKind {
    Start,
    Listing,
    Detail,
}

impl PageKind {
    fn describe(self) -> &'static str {
        match self {
            PageKind::Start => "start",
            PageKind::Listing => "pagination",
            PageKind::Detail => "book",
        }
    }
}

struct Walker<'a> {
    site: &'static str,
    fetcher: &'a dyn PageFetcher,
    limits: WalkLimits,
    seen: HashSet<String>,
    queue: VecDeque<(Url, PageKind)>,
    listing_pages: u32,
}

impl<'a> Walker<'a> {
    /// Queues `url` unless it was queued before. Fragments are ignored.
    ///
    /// Returns whether the URL was queued.
    fn follow(&mut self, mut url: Url, kind: PageKind) -> bool {
        url.set_fragment(None);
        if !self.seen.insert(url.as_str().to_string()) {
            log::trace!("[{}] already visited {}", self.site, url);
            return false;
        }

        self.queue.push_back((url, kind));
        true
    }

    /// Queues a pagination link while the page budget allows it.
    fn follow_page(&mut self, mut link: PageLink) {
        link.url.set_fragment(None);
        if self.seen.contains(link.url.as_str()) {
            return;
        }

        let max = self.limits.max_pages;
        if self.listing_pages >= max || link.number.is_some_and(|n| n > max) {
            log::debug!("[{}] page limit reached, not following {}", self.site, link.url);
            return;
        }

        if self.follow(link.url, PageKind::Listing) {
            self.listing_pages += 1;
        }
    }

    async fn fetch(&self, url: &Url, cancel: &CancellationToken) -> Result<String, ScraperError> {
        if cancel.is_cancelled() {
            return Err(ScraperError::Cancelled);
        }

        log::info!("[{}] parsing {}", self.site, url);
        tokio::select! {
            _ = cancel.cancelled() => Err(ScraperError::Cancelled),
            result = self.fetcher.fetch(url) => result,
        }
    }
}

/// Walks `catalog` and sends every extracted book to `sink`.
///
/// Only a failed start page, cancellation, or a closed sink end the walk
/// with an error. Any other page that fails to load is logged and skipped.
pub async fn walk<C: Catalog + ?Sized>(
    catalog: &C,
    fetcher: &dyn PageFetcher,
    limits: WalkLimits,
    sink: &BookSink,
    cancel: &CancellationToken,
) -> Result<WalkStats, ScraperError> {
    let site = catalog.name();
    let start = Url::parse(catalog.start_url())?;

    let mut walker = Walker {
        site,
        fetcher,
        limits,
        seen: HashSet::new(),
        queue: VecDeque::new(),
        listing_pages: 1,
    };
    let mut stats = WalkStats::default();
    walker.follow(start, PageKind::Start);

    while let Some((url, kind)) = walker.queue.pop_front() {
        let html = match walker.fetch(&url, cancel).await {
            Ok(html) => html,
            Err(ScraperError::Cancelled) => return Err(ScraperError::Cancelled),
            Err(err) if kind == PageKind::Start => return Err(err),
            Err(err) => {
                log::warn!(
                    "[{}] cannot visit {} page {}: {}",
                    site,
                    kind.describe(),
                    url,
                    err
                );
                stats.skipped += 1;
                continue;
            }
        };
        stats.pages += 1;

        let contents = catalog.parse_page(&url, &html);

        if let Some(book) = contents.book {
            tokio::select! {
                _ = cancel.cancelled() => return Err(ScraperError::Cancelled),
                sent = sink.send(book) => sent?,
            }
            stats.books += 1;
        } else if kind == PageKind::Detail {
            log::debug!("[{}] no book found on {}", site, url);
        }

        // Detail pages are leaves: related-book blocks on them are not followed.
        if kind != PageKind::Detail {
            for link in contents.book_links {
                walker.follow(link, PageKind::Detail);
            }
        }

        for page in contents.pages {
            walker.follow_page(page);
        }
    }

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::book::Book;
    use crate::fetcher::fixtures::FixtureFetcher;
    use crate::scrapers::PageContents;
    use scraper::{Html, Selector};

    /// Minimal catalog: `a.book` links, `a.page` pagination, `h1` titles.
    struct TestCatalog {
        start: String,
    }

    impl Catalog for TestCatalog {
        fn name(&self) -> &'static str {
            "test"
        }

        fn publisher(&self) -> &'static str {
            "Test"
        }

        fn start_url(&self) -> &str {
            &self.start
        }

        fn parse_page(&self, url: &Url, html: &str) -> PageContents {
            let doc = Html::parse_document(html);
            let links = |css: &str| -> Vec<Url> {
                let sel = Selector::parse(css).unwrap();
                doc.select(&sel)
                    .filter_map(|a| a.value().attr("href"))
                    .filter_map(|href| url.join(href).ok())
                    .collect()
            };

            let title_sel = Selector::parse("h1").unwrap();
            let book = doc.select(&title_sel).next().map(|h1| Book {
                url: url.to_string(),
                title: h1.text().collect(),
                publisher: "Test".to_string(),
                ..Book::default()
            });

            PageContents {
                book_links: links("a.book"),
                pages: links("a.page")
                    .into_iter()
                    .map(|url| PageLink { url, number: None })
                    .collect(),
                book,
            }
        }
    }

    fn catalog() -> TestCatalog {
        TestCatalog {
            start: "https://shop.test/list".to_string(),
        }
    }

    async fn collect(
        fetcher: &FixtureFetcher,
        limits: WalkLimits,
    ) -> (Result<WalkStats, ScraperError>, Vec<Book>) {
        let (sink, mut rx) = BookSink::channel(64);
        let result = walk(&catalog(), fetcher, limits, &sink, &CancellationToken::new()).await;
        drop(sink);

        let mut books = Vec::new();
        while let Some(book) = rx.recv().await {
            books.push(book);
        }
        (result, books)
    }

    #[tokio::test]
    async fn test_walk_emits_in_traversal_order() {
        let fetcher = FixtureFetcher::new()
            .page(
                "https://shop.test/list",
                r#"<a class="book" href="/b/1">1</a><a class="book" href="/b/2">2</a>"#,
            )
            .page("https://shop.test/b/1", "<h1>One</h1>")
            .page("https://shop.test/b/2", "<h1>Two</h1>");

        let (result, books) = collect(&fetcher, WalkLimits::default()).await;
        let stats = result.unwrap();

        let titles: Vec<_> = books.iter().map(|b| b.title.as_str()).collect();
        assert_eq!(titles, vec!["One", "Two"]);
        assert_eq!(stats.pages, 3);
        assert_eq!(stats.books, 2);
    }

    #[tokio::test]
    async fn test_walk_fetches_each_url_once() {
        let fetcher = FixtureFetcher::new()
            .page(
                "https://shop.test/list",
                r#"<a class="book" href="/b/1">1</a><a class="book" href="/b/1#reviews">1</a>
                   <a class="page" href="/list?page=2">2</a>"#,
            )
            .page(
                "https://shop.test/list?page=2",
                r#"<a class="book" href="/b/1">1</a><a class="page" href="/list">1</a>"#,
            )
            .page("https://shop.test/b/1", "<h1>One</h1>");

        let (result, books) = collect(&fetcher, WalkLimits::default()).await;
        assert!(result.is_ok());
        assert_eq!(books.len(), 1);

        let requests = fetcher.requests();
        assert_eq!(
            requests.iter().filter(|r| *r == "https://shop.test/b/1").count(),
            1
        );
        assert_eq!(
            requests.iter().filter(|r| *r == "https://shop.test/list").count(),
            1
        );
    }

    #[tokio::test]
    async fn test_walk_stops_at_page_limit() {
        let mut fetcher = FixtureFetcher::new();
        for page in 1..=10 {
            let url = if page == 1 {
                "https://shop.test/list".to_string()
            } else {
                format!("https://shop.test/list?page={}", page)
            };
            let html = format!(r#"<a class="page" href="/list?page={}">next</a>"#, page + 1);
            fetcher = fetcher.page(&url, &html);
        }

        let (result, _) = collect(&fetcher, WalkLimits { max_pages: 3 }).await;
        assert_eq!(result.unwrap().pages, 3);
        assert_eq!(fetcher.requests().len(), 3);
    }

    #[tokio::test]
    async fn test_walk_does_not_chain_detail_pages() {
        let mut fetcher = FixtureFetcher::new().page(
            "https://shop.test/list",
            r#"<a class="book" href="/b/0">0</a>"#,
        );
        for i in 0..50 {
            let html = format!(
                r#"<h1>Book {}</h1><a class="book" href="/b/{}">related</a>"#,
                i,
                i + 1
            );
            fetcher = fetcher.page(&format!("https://shop.test/b/{}", i), &html);
        }

        let (result, books) = collect(&fetcher, WalkLimits { max_pages: 1 }).await;
        let stats = result.unwrap();

        assert_eq!(stats.pages, 2);
        assert_eq!(books.len(), 1);
        assert_eq!(books[0].title, "Book 0");
        assert_eq!(fetcher.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_walk_skips_broken_detail_pages() {
        let fetcher = FixtureFetcher::new()
            .page(
                "https://shop.test/list",
                r#"<a class="book" href="/b/missing">x</a><a class="book" href="/b/2">2</a>"#,
            )
            .page("https://shop.test/b/2", "<h1>Two</h1>");

        let (result, books) = collect(&fetcher, WalkLimits::default()).await;
        let stats = result.unwrap();
        assert_eq!(stats.skipped, 1);
        assert_eq!(books.len(), 1);
        assert_eq!(books[0].title, "Two");
    }

    #[tokio::test]
    async fn test_walk_fails_when_start_page_is_unreachable() {
        let fetcher = FixtureFetcher::new();
        let (result, books) = collect(&fetcher, WalkLimits::default()).await;
        assert!(matches!(result, Err(ScraperError::NotFound(_))));
        assert!(books.is_empty());
    }

    #[tokio::test]
    async fn test_walk_honours_cancellation() {
        let fetcher = FixtureFetcher::new().page("https://shop.test/list", "<h1>x</h1>");
        let (sink, _rx) = BookSink::channel(1);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = walk(&catalog(), &fetcher, WalkLimits::default(), &sink, &cancel).await;
        assert!(matches!(result, Err(ScraperError::Cancelled)));
        assert!(fetcher.requests().is_empty());
    }
}
