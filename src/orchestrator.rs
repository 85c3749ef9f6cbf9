//! Runs site crawlers concurrently and merges their books into one stream.
//!
//! Each crawler runs in its own task and owns one producer handle of the
//! merge channel. The channel closes when the last handle is dropped, which
//! happens exactly when the last crawler task has returned or panicked, so
//! consumers see the end of the stream only after every crawler finished.
//!
//! Crawler failures never reach the stream. They are logged and collected
//! into a [`ScrapeReport`] available from [`ScrapeRun::finish`].

use crate::book::Book;
use crate::error::ScraperError;
use crate::scrapers::{BookSink, SiteCrawler};
use futures::Stream;
use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio::task::{Id, JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;

/// Capacity of the merge channel.
///
/// Tokio channels need room for at least one item, so a producer may run one
/// book ahead of the consumer before its send blocks.
pub const MERGE_CAPACITY: usize = 1;

/// A crawler that ended with an error or a panic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlFailure {
    pub site: &'static str,
    pub error: String,
}

/// Outcome of every crawler in a run.
#[derive(Debug, Default, Clone)]
pub struct ScrapeReport {
    /// Sites whose crawler returned `Ok`.
    pub succeeded: Vec<&'static str>,
    /// Sites whose crawler returned an error or panicked.
    pub failed: Vec<CrawlFailure>,
}

impl ScrapeReport {
    /// Number of crawlers that took part in the run.
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }
}

/// A running scrape: the merged book stream plus its coordinator.
pub struct ScrapeRun {
    books: mpsc::Receiver<Book>,
    coordinator: JoinHandle<ScrapeReport>,
}

impl ScrapeRun {
    /// Receives the next book, or `None` once every crawler has finished.
    pub async fn recv(&mut self) -> Option<Book> {
        self.books.recv().await
    }

    /// Waits for all crawlers and returns their report.
    ///
    /// Books still in flight are discarded; crawlers still sending see a
    /// closed stream and stop.
    pub async fn finish(self) -> ScrapeReport {
        drop(self.books);
        match self.coordinator.await {
            Ok(report) => report,
            Err(err) => {
                log::error!("scrape coordinator failed: {}", err);
                ScrapeReport::default()
            }
        }
    }
}

impl Stream for ScrapeRun {
    type Item = Book;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Book>> {
        self.get_mut().books.poll_recv(cx)
    }
}

/// Starts every crawler and returns the merged stream.
///
/// Must be called from within a tokio runtime. An empty crawler list yields
/// a stream that is already closed. Cancelling `cancel` asks every crawler to
/// stop; cancelled crawlers are reported as failures like any other error.
pub fn run(crawlers: Vec<Arc<dyn SiteCrawler>>, cancel: CancellationToken) -> ScrapeRun {
    let (sink, books) = BookSink::channel(MERGE_CAPACITY);

    let mut tasks = JoinSet::new();
    let mut sites = HashMap::new();
    for crawler in crawlers {
        let sink = sink.fork();
        let cancel = cancel.clone();
        let site = crawler.name();

        log::debug!("[{}] starting crawler", site);
        let handle = tasks.spawn(async move { crawler.scrape(&sink, &cancel).await });
        sites.insert(handle.id(), site);
    }
    // Only the tasks hold producers from here on.
    drop(sink);

    let coordinator = tokio::spawn(wait_for_crawlers(tasks, sites));

    ScrapeRun { books, coordinator }
}

async fn wait_for_crawlers(
    mut tasks: JoinSet<Result<(), ScraperError>>,
    sites: HashMap<Id, &'static str>,
) -> ScrapeReport {
    let mut report = ScrapeReport::default();
    let site_of = |id: Id| sites.get(&id).copied().unwrap_or("unknown");

    while let Some(joined) = tasks.join_next_with_id().await {
        match joined {
            Ok((id, Ok(()))) => {
                log::debug!("[{}] crawler completed", site_of(id));
                report.succeeded.push(site_of(id));
            }
            Ok((id, Err(err))) => {
                log::error!("[{}] crawler failed: {}", site_of(id), err);
                report.failed.push(CrawlFailure {
                    site: site_of(id),
                    error: err.to_string(),
                });
            }
            Err(err) => {
                let reason = if err.is_panic() {
                    "crawler panicked"
                } else {
                    "crawler task cancelled"
                };
                log::error!("[{}] {}", site_of(err.id()), reason);
                report.failed.push(CrawlFailure {
                    site: site_of(err.id()),
                    error: reason.to_string(),
                });
            }
        }
    }

    report
}
