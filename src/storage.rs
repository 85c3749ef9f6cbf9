//! Book persistence keyed by ISBN.
//!
//! The scrape pipeline only needs [`BookStore::upsert_book`]; the lookups
//! exist for inspection and tests.

use crate::book::{Book, StoredBook};
use crate::error::StorageError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// Storage backend for scraped books.
#[async_trait]
pub trait BookStore: Send + Sync {
    /// Inserts the book, or updates the row with the same ISBN.
    ///
    /// Returns the row id, which stays stable across updates.
    async fn upsert_book(&self, book: &Book) -> Result<u64, StorageError>;

    /// Returns all books in insertion order.
    async fn find_books(&self) -> Result<Vec<StoredBook>, StorageError>;

    /// Looks a book up by ISBN.
    async fn get_by_isbn(&self, isbn: &str) -> Result<Option<StoredBook>, StorageError>;
}

#[derive(Default)]
struct State {
    next_id: u64,
    books: Vec<StoredBook>,
}

/// Book store backed by a single JSON file.
///
/// The whole file is rewritten on every upsert through a temporary file and
/// a rename, so a crash never leaves a half-written store behind.
pub struct JsonBookStore {
    path: PathBuf,
    state: Mutex<State>,
}

impl JsonBookStore {
    /// Opens the store at `path`, starting empty if the file doesn't exist.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();

        let books: Vec<StoredBook> = match tokio::fs::read_to_string(&path).await {
            Ok(content) if content.trim().is_empty() => Vec::new(),
            Ok(content) => serde_json::from_str(&content)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(err) => return Err(err.into()),
        };

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }

        let next_id = books.iter().map(|b| b.id).max().unwrap_or(0) + 1;
        log::debug!("opened book store {} ({} books)", path.display(), books.len());

        Ok(Self {
            path,
            state: Mutex::new(State { next_id, books }),
        })
    }

    /// Location of the store file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn save(&self, books: &[StoredBook]) -> Result<(), StorageError> {
        let content = serde_json::to_string_pretty(books)?;
        let tmp = self.path.with_extension("json.tmp");

        tokio::fs::write(&tmp, content).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl BookStore for JsonBookStore {
    async fn upsert_book(&self, book: &Book) -> Result<u64, StorageError> {
        let isbn = book.isbn.trim();
        if isbn.is_empty() {
            return Err(StorageError::MissingIsbn(book.url.clone()));
        }

        let mut state = self.state.lock().await;
        let mut book = book.clone();
        book.isbn = isbn.to_string();

        let existing = state.books.iter().position(|b| b.book.isbn == isbn);
        let (id, previous) = match existing {
            Some(idx) => {
                let id = state.books[idx].id;
                let previous = std::mem::replace(&mut state.books[idx].book, book);
                (id, Some((idx, previous)))
            }
            None => {
                let id = state.next_id;
                state.next_id += 1;
                state.books.push(StoredBook { id, book });
                (id, None)
            }
        };

        if let Err(err) = self.save(&state.books).await {
            // Keep memory in line with the file.
            match previous {
                Some((idx, previous)) => state.books[idx].book = previous,
                None => {
                    state.books.pop();
                    state.next_id -= 1;
                }
            }
            return Err(err);
        }

        Ok(id)
    }

    async fn find_books(&self) -> Result<Vec<StoredBook>, StorageError> {
        Ok(self.state.lock().await.books.clone())
    }

    async fn get_by_isbn(&self, isbn: &str) -> Result<Option<StoredBook>, StorageError> {
        let isbn = isbn.trim();
        Ok(self
            .state
            .lock()
            .await
            .books
            .iter()
            .find(|b| b.book.isbn == isbn)
            .cloned())
    }
}
