//! Site crawler contract and the registry of supported publishers.
//!
//! Every publisher is described by a [`Catalog`]: where to start, and how to
//! read one page into links and at most one [`Book`]. [`CatalogCrawler`]
//! turns a catalog into a [`SiteCrawler`] by walking its pages with a
//! [`PageFetcher`]. The orchestrator only ever sees `SiteCrawler`s.

mod dmkpress;
mod eksmo;
mod piter;
mod walker;

pub use dmkpress::Dmkpress;
pub use eksmo::Eksmo;
pub use piter::Piter;
pub use walker::{WalkLimits, WalkStats, walk};

use crate::book::Book;
use crate::config::ScrapingConfig;
use crate::error::ScraperError;
use crate::fetcher::{HttpFetcher, PageFetcher};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Write-only handle on the merged book stream.
///
/// Crawlers get it by reference and cannot clone or close it; the stream
/// closes once every handle owned by the orchestrator has been dropped.
pub struct BookSink {
    tx: mpsc::Sender<Book>,
}

impl BookSink {
    /// Creates a sink and the receiving end of its stream.
    pub(crate) fn channel(capacity: usize) -> (Self, mpsc::Receiver<Book>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    /// Creates another producer handle on the same stream.
    pub(crate) fn fork(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }

    /// Sends a book, waiting until the consumer has room for it.
    pub async fn send(&self, book: Book) -> Result<(), ScraperError> {
        self.tx
            .send(book)
            .await
            .map_err(|_| ScraperError::StreamClosed)
    }
}

/// A publisher site that emits books onto a sink.
///
/// Implementations hold no state shared with other crawlers, so any number
/// of them may run at once.
#[async_trait]
pub trait SiteCrawler: Send + Sync {
    /// Registry key, lowercase ASCII.
    fn name(&self) -> &'static str;

    /// Publisher name stamped on every emitted book.
    fn publisher(&self) -> &'static str;

    /// Crawls the site, sending every extracted book to `sink`.
    ///
    /// Returns an error only when the crawl as a whole failed, e.g. the
    /// start page could not be fetched or `cancel` fired.
    async fn scrape(&self, sink: &BookSink, cancel: &CancellationToken)
    -> Result<(), ScraperError>;
}

/// A link to another listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLink {
    pub url: Url,

    /// Page number shown on the link, when the site prints one.
    pub number: Option<u32>,
}

/// Everything one fetched page yields.
#[derive(Debug, Default)]
pub struct PageContents {
    /// Links to book detail pages, in document order.
    pub book_links: Vec<Url>,

    /// Links to further listing pages.
    pub pages: Vec<PageLink>,

    /// Book extracted from this page, if it is a detail page.
    pub book: Option<Book>,
}

/// Navigation and extraction rules of one publisher site.
///
/// `parse_page` is synchronous and returns owned data, so parsed documents
/// never live across an await point.
pub trait Catalog: Send + Sync {
    fn name(&self) -> &'static str;

    fn publisher(&self) -> &'static str;

    /// First listing page of the crawl.
    fn start_url(&self) -> &str;

    /// Reads one page. Missing elements yield empty fields, never a panic.
    fn parse_page(&self, url: &Url, html: &str) -> PageContents;
}

/// Drives a [`Catalog`] over a [`PageFetcher`].
pub struct CatalogCrawler<C> {
    catalog: C,
    fetcher: Arc<dyn PageFetcher>,
    limits: WalkLimits,
}

impl<C: Catalog> CatalogCrawler<C> {
    pub fn new(catalog: C, fetcher: Arc<dyn PageFetcher>, limits: WalkLimits) -> Self {
        Self {
            catalog,
            fetcher,
            limits,
        }
    }
}

#[async_trait]
impl<C: Catalog> SiteCrawler for CatalogCrawler<C> {
    fn name(&self) -> &'static str {
        self.catalog.name()
    }

    fn publisher(&self) -> &'static str {
        self.catalog.publisher()
    }

    async fn scrape(
        &self,
        sink: &BookSink,
        cancel: &CancellationToken,
    ) -> Result<(), ScraperError> {
        let stats = walk(
            &self.catalog,
            self.fetcher.as_ref(),
            self.limits,
            sink,
            cancel,
        )
        .await?;

        log::info!(
            "[{}] finished: {} pages, {} books, {} skipped",
            self.name(),
            stats.pages,
            stats.books,
            stats.skipped
        );
        Ok(())
    }
}

/// Requested site names split into known crawlers and unknown names.
pub struct Resolution {
    pub crawlers: Vec<Arc<dyn SiteCrawler>>,
    pub unknown: Vec<String>,
}

/// Fixed mapping from site name to crawler.
///
/// Built once at startup and read-only afterwards.
pub struct CrawlRegistry {
    crawlers: BTreeMap<&'static str, Arc<dyn SiteCrawler>>,
}

impl CrawlRegistry {
    /// Creates a registry of all publishers, each with its own HTTP client.
    pub fn new(config: &ScrapingConfig) -> Result<Self, ScraperError> {
        Self::with_fetcher(config, |_| {
            Ok(Arc::new(HttpFetcher::new(config)?) as Arc<dyn PageFetcher>)
        })
    }

    /// Creates a registry of all publishers, asking `make_fetcher` for the
    /// fetcher of each site by name.
    pub fn with_fetcher<F>(config: &ScrapingConfig, make_fetcher: F) -> Result<Self, ScraperError>
    where
        F: Fn(&'static str) -> Result<Arc<dyn PageFetcher>, ScraperError>,
    {
        fn build<C: Catalog + 'static, F>(
            catalog: C,
            config: &ScrapingConfig,
            make_fetcher: &F,
        ) -> Result<Arc<dyn SiteCrawler>, ScraperError>
        where
            F: Fn(&'static str) -> Result<Arc<dyn PageFetcher>, ScraperError>,
        {
            let limits = WalkLimits {
                max_pages: config.max_pages_for(catalog.name()),
            };
            let fetcher = make_fetcher(catalog.name())?;
            Ok(Arc::new(CatalogCrawler::new(catalog, fetcher, limits)))
        }

        Ok(Self::from_crawlers(vec![
            build(Piter::new(), config, &make_fetcher)?,
            build(Dmkpress::new(), config, &make_fetcher)?,
            build(Eksmo::new(), config, &make_fetcher)?,
        ]))
    }

    /// Creates a registry from prepared crawlers. Later duplicates win.
    pub fn from_crawlers(crawlers: Vec<Arc<dyn SiteCrawler>>) -> Self {
        Self {
            crawlers: crawlers.into_iter().map(|c| (c.name(), c)).collect(),
        }
    }

    /// Returns registered site names in sorted order.
    pub fn names(&self) -> Vec<&'static str> {
        self.crawlers.keys().copied().collect()
    }

    /// Finds a crawler by site name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn SiteCrawler>> {
        self.crawlers.get(normalize_name(name).as_str()).cloned()
    }

    /// Returns every registered crawler.
    pub fn all(&self) -> Vec<Arc<dyn SiteCrawler>> {
        self.crawlers.values().cloned().collect()
    }

    /// Resolves requested names.
    ///
    /// An empty list (blank names ignored) selects every site. Unknown names
    /// are skipped with a warning; repeated names resolve once.
    pub fn resolve<S: AsRef<str>>(&self, names: &[S]) -> Resolution {
        if names.iter().all(|n| n.as_ref().trim().is_empty()) {
            return Resolution {
                crawlers: self.all(),
                unknown: Vec::new(),
            };
        }

        let mut seen = HashSet::new();
        let mut resolution = Resolution {
            crawlers: Vec::new(),
            unknown: Vec::new(),
        };

        for name in names {
            let key = normalize_name(name.as_ref());
            if key.is_empty() || !seen.insert(key.clone()) {
                continue;
            }

            match self.crawlers.get(key.as_str()) {
                Some(crawler) => resolution.crawlers.push(Arc::clone(crawler)),
                None => {
                    log::warn!("unknown site '{}', skipping", name.as_ref());
                    resolution.unknown.push(name.as_ref().to_string());
                }
            }
        }

        resolution
    }
}

fn normalize_name(name: &str) -> String {
    name.trim().to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::fixtures::FixtureFetcher;

    fn registry() -> CrawlRegistry {
        CrawlRegistry::with_fetcher(&ScrapingConfig::default(), |_| {
            Ok(Arc::new(FixtureFetcher::new()) as Arc<dyn PageFetcher>)
        })
        .unwrap()
    }

    #[test]
    fn test_registry_names() {
        assert_eq!(registry().names(), vec!["dmkpress", "eksmo", "piter"]);
    }

    #[test]
    fn test_registry_publishers() {
        let registry = registry();
        assert_eq!(registry.get("piter").unwrap().publisher(), "Питер");
        assert_eq!(registry.get("DMKPress").unwrap().publisher(), "ДМК-Пресс");
        assert_eq!(registry.get(" eksmo ").unwrap().publisher(), "Эксмо");
        assert!(registry.get("ozon").is_none());
    }

    #[test]
    fn test_resolve_skips_unknown_names() {
        let resolution = registry().resolve(&["piter", "ozon", "eksmo"]);
        let names: Vec<_> = resolution.crawlers.iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["piter", "eksmo"]);
        assert_eq!(resolution.unknown, vec!["ozon".to_string()]);
    }

    #[test]
    fn test_resolve_deduplicates() {
        let resolution = registry().resolve(&["piter", "Piter", "piter"]);
        assert_eq!(resolution.crawlers.len(), 1);
        assert!(resolution.unknown.is_empty());
    }

    #[test]
    fn test_resolve_all_unknown_is_empty() {
        let resolution = registry().resolve(&["ozon", "labirint"]);
        assert!(resolution.crawlers.is_empty());
        assert_eq!(resolution.unknown.len(), 2);
    }

    #[test]
    fn test_resolve_empty_means_all() {
        let registry = registry();
        let empty: &[&str] = &[];

        let resolution = registry.resolve(empty);
        let names: Vec<_> = resolution.crawlers.iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["dmkpress", "eksmo", "piter"]);
        assert!(resolution.unknown.is_empty());

        assert_eq!(registry.resolve(&[" ", ""]).crawlers.len(), 3);
    }

    #[test]
    fn test_all_returns_every_site() {
        assert_eq!(registry().all().len(), 3);
    }

    #[test]
    fn test_each_site_gets_its_own_fetcher() {
        let asked = std::sync::Mutex::new(Vec::new());
        CrawlRegistry::with_fetcher(&ScrapingConfig::default(), |name| {
            asked.lock().unwrap().push(name);
            Ok(Arc::new(FixtureFetcher::new()) as Arc<dyn PageFetcher>)
        })
        .unwrap();

        assert_eq!(*asked.lock().unwrap(), vec!["piter", "dmkpress", "eksmo"]);
    }

    const EKSMO_START: &str =
        "https://eksmo.ru/professionalnaia-literatura/kompyuternaya-literatura/";

    /// Crawls eksmo over a two-page listing and returns the fetched URLs.
    async fn eksmo_requests(config: &ScrapingConfig) -> Vec<String> {
        let fetcher = Arc::new(
            FixtureFetcher::new()
                .page(
                    EKSMO_START,
                    r#"<ul class="pagenav__list"><li><a href="?page=2">2</a></li></ul>"#,
                )
                .page(&format!("{}?page=2", EKSMO_START), "<p>second</p>"),
        );

        let shared = Arc::clone(&fetcher);
        let registry = CrawlRegistry::with_fetcher(config, move |_| {
            Ok(Arc::clone(&shared) as Arc<dyn PageFetcher>)
        })
        .unwrap();

        let (sink, _rx) = BookSink::channel(1);
        registry
            .get("eksmo")
            .unwrap()
            .scrape(&sink, &CancellationToken::new())
            .await
            .unwrap();

        fetcher.requests()
    }

    #[tokio::test]
    async fn test_per_site_page_limit_applies() {
        let defaults = ScrapingConfig::default();
        assert_eq!(eksmo_requests(&defaults).await.len(), 2);

        let mut capped = ScrapingConfig::default();
        capped.max_pages_per_site.insert("eksmo".to_string(), 1);
        assert_eq!(eksmo_requests(&capped).await, vec![EKSMO_START.to_string()]);
    }

    #[tokio::test]
    async fn test_sink_send_fails_after_receiver_dropped() {
        let (sink, rx) = BookSink::channel(1);
        drop(rx);
        assert!(matches!(
            sink.send(Book::default()).await,
            Err(ScraperError::StreamClosed)
        ));
    }
}
