//! Consumers that drain a [`ScrapeRun`].

use crate::orchestrator::{ScrapeReport, ScrapeRun};
use crate::storage::BookStore;

/// Counts from persisting one run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IngestSummary {
    pub received: usize,
    pub saved: usize,
    pub failed: usize,
}

/// Upserts every book of the run into `store`.
///
/// A failed write is logged and the next book is processed as usual.
pub async fn persist(mut run: ScrapeRun, store: &dyn BookStore) -> (IngestSummary, ScrapeReport) {
    let mut summary = IngestSummary::default();

    while let Some(book) = run.recv().await {
        summary.received += 1;
        match store.upsert_book(&book).await {
            Ok(id) => {
                summary.saved += 1;
                log::debug!("saved #{}: {}", id, book.label());
            }
            Err(err) => {
                summary.failed += 1;
                log::warn!("cannot save {}: {}", book.label(), err);
            }
        }
    }

    (summary, run.finish().await)
}

/// Logs every book of the run without saving anything.
pub async fn log_only(mut run: ScrapeRun) -> (usize, ScrapeReport) {
    let mut count = 0;

    while let Some(book) = run.recv().await {
        count += 1;
        log::info!("scraped: {:#?}", book);
    }

    (count, run.finish().await)
}
