//! Catalog service: authors, genres, books and loan entries.
//!
//! Kept in memory; contents do not survive a restart.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::{
    error::{AppError, AppResult},
    models::{
        author::{Author, AuthorInput, AuthorQuery},
        book::{Book, BookInfo, BookQuery, BookRecord, NewBook, PatchBook, PatchBookInfo},
        entry::{Entry, EntryQuery, NewEntry, Since},
        genre::{Genre, GenreInput},
    },
    repository::UserRepository,
};

#[derive(Default)]
struct Catalog {
    next_id: i64,
    authors: BTreeMap<i64, Author>,
    genres: BTreeMap<i64, Genre>,
    books: BTreeMap<i64, BookRecord>,
    infos: BTreeMap<i64, BookInfo>,
    entries: BTreeMap<i64, Entry>,
}

impl Catalog {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn author(&self, id: i64) -> AppResult<&Author> {
        self.authors
            .get(&id)
            .ok_or_else(|| AppError::NotFound(format!("Author with id {} not found", id)))
    }

    fn genre(&self, id: i64) -> AppResult<&Genre> {
        self.genres
            .get(&id)
            .ok_or_else(|| AppError::NotFound(format!("Genre with id {} not found", id)))
    }

    fn book(&self, id: i64) -> AppResult<&BookRecord> {
        self.books
            .get(&id)
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    /// Every id must exist; duplicates are dropped, order is kept
    fn check_ids(&self, author_ids: &[i64], genre_ids: &[i64]) -> AppResult<(Vec<i64>, Vec<i64>)> {
        let mut authors = Vec::with_capacity(author_ids.len());
        for &id in author_ids {
            self.author(id)?;
            if !authors.contains(&id) {
                authors.push(id);
            }
        }

        let mut genres = Vec::with_capacity(genre_ids.len());
        for &id in genre_ids {
            self.genre(id)?;
            if !genres.contains(&id) {
                genres.push(id);
            }
        }

        Ok((authors, genres))
    }

    fn resolve(&self, record: &BookRecord) -> Book {
        Book {
            id: record.id,
            title: record.title.clone(),
            authors: record
                .author_ids
                .iter()
                .filter_map(|id| self.authors.get(id).cloned())
                .collect(),
            genres: record
                .genre_ids
                .iter()
                .filter_map(|id| self.genres.get(id).cloned())
                .collect(),
        }
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[derive(Clone)]
pub struct CatalogService {
    catalog: Arc<RwLock<Catalog>>,
    users: Arc<dyn UserRepository>,
}

impl CatalogService {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self {
            catalog: Arc::new(RwLock::new(Catalog::default())),
            users,
        }
    }

    // =========================================================================
    // Authors
    // =========================================================================

    pub async fn list_authors(&self, query: &AuthorQuery) -> Vec<Author> {
        let catalog = self.catalog.read().await;
        catalog
            .authors
            .values()
            .filter(|a| match &query.name {
                Some(name) => contains_ignore_case(&a.name, name),
                None => true,
            })
            .cloned()
            .collect()
    }

    pub async fn get_author(&self, id: i64) -> AppResult<Author> {
        self.catalog.read().await.author(id).cloned()
    }

    pub async fn create_author(&self, input: AuthorInput) -> Author {
        let mut catalog = self.catalog.write().await;
        let author = Author::new(catalog.next_id(), input);
        catalog.authors.insert(author.id, author.clone());
        author
    }

    pub async fn update_author(&self, id: i64, input: AuthorInput) -> AppResult<Author> {
        let mut catalog = self.catalog.write().await;
        catalog.author(id)?;
        let author = Author::new(id, input);
        catalog.authors.insert(id, author.clone());
        Ok(author)
    }

    /// Removing an author also drops it from every book.
    /// Returns whether an author was removed.
    pub async fn delete_author(&self, id: i64) -> bool {
        let mut catalog = self.catalog.write().await;
        if catalog.authors.remove(&id).is_none() {
            return false;
        }
        for book in catalog.books.values_mut() {
            book.author_ids.retain(|a| *a != id);
        }
        true
    }

    // =========================================================================
    // Genres
    // =========================================================================

    pub async fn list_genres(&self) -> Vec<Genre> {
        self.catalog.read().await.genres.values().cloned().collect()
    }

    pub async fn get_genre(&self, id: i64) -> AppResult<Genre> {
        self.catalog.read().await.genre(id).cloned()
    }

    pub async fn create_genre(&self, input: GenreInput) -> AppResult<Genre> {
        let mut catalog = self.catalog.write().await;
        if catalog.genres.values().any(|g| g.name.eq_ignore_ascii_case(&input.name)) {
            return Err(AppError::Conflict(format!("Genre '{}' already exists", input.name)));
        }
        let genre = Genre::new(catalog.next_id(), input);
        catalog.genres.insert(genre.id, genre.clone());
        Ok(genre)
    }

    pub async fn update_genre(&self, id: i64, input: GenreInput) -> AppResult<Genre> {
        let mut catalog = self.catalog.write().await;
        catalog.genre(id)?;
        let genre = Genre::new(id, input);
        catalog.genres.insert(id, genre.clone());
        Ok(genre)
    }

    pub async fn delete_genre(&self, id: i64) -> bool {
        let mut catalog = self.catalog.write().await;
        if catalog.genres.remove(&id).is_none() {
            return false;
        }
        for book in catalog.books.values_mut() {
            book.genre_ids.retain(|g| *g != id);
        }
        true
    }

    // =========================================================================
    // Books
    // =========================================================================

    pub async fn list_books(&self, query: &BookQuery) -> Vec<Book> {
        let catalog = self.catalog.read().await;
        catalog
            .books
            .values()
            .map(|record| catalog.resolve(record))
            .filter(|book| {
                if let Some(title) = &query.title {
                    contains_ignore_case(&book.title, title)
                } else if let Some(author) = &query.author {
                    book.authors.iter().any(|a| contains_ignore_case(&a.name, author))
                } else if let Some(genre) = &query.genre {
                    book.genres.iter().any(|g| contains_ignore_case(&g.name, genre))
                } else {
                    true
                }
            })
            .collect()
    }

    pub async fn get_book(&self, id: i64) -> AppResult<Book> {
        let catalog = self.catalog.read().await;
        let record = catalog.book(id)?;
        Ok(catalog.resolve(record))
    }

    /// Every referenced author and genre must exist
    pub async fn create_book(&self, new_book: NewBook) -> AppResult<Book> {
        let mut catalog = self.catalog.write().await;
        let (author_ids, genre_ids) = catalog.check_ids(&new_book.author_ids, &new_book.genre_ids)?;

        let record = BookRecord {
            id: catalog.next_id(),
            title: new_book.title,
            author_ids,
            genre_ids,
        };
        let book = catalog.resolve(&record);
        catalog.infos.insert(record.id, BookInfo::empty(record.id));
        catalog.books.insert(record.id, record);
        Ok(book)
    }

    pub async fn patch_book(&self, id: i64, patch: PatchBook) -> AppResult<Book> {
        let mut catalog = self.catalog.write().await;
        let mut record = catalog.book(id)?.clone();

        let (author_ids, genre_ids) = catalog.check_ids(
            patch.author_ids.as_deref().unwrap_or_default(),
            patch.genre_ids.as_deref().unwrap_or_default(),
        )?;

        if let Some(title) = patch.title {
            record.title = title;
        }
        if patch.author_ids.is_some() {
            record.author_ids = author_ids;
        }
        if patch.genre_ids.is_some() {
            record.genre_ids = genre_ids;
        }

        let book = catalog.resolve(&record);
        catalog.books.insert(id, record);
        Ok(book)
    }

    /// Returns whether a book was removed; its details go with it
    pub async fn delete_book(&self, id: i64) -> bool {
        let mut catalog = self.catalog.write().await;
        catalog.infos.remove(&id);
        catalog.books.remove(&id).is_some()
    }

    pub async fn get_book_info(&self, book_id: i64) -> AppResult<BookInfo> {
        let catalog = self.catalog.read().await;
        catalog.book(book_id)?;
        Ok(catalog
            .infos
            .get(&book_id)
            .cloned()
            .unwrap_or_else(|| BookInfo::empty(book_id)))
    }

    pub async fn patch_book_info(&self, book_id: i64, patch: PatchBookInfo) -> AppResult<BookInfo> {
        let mut catalog = self.catalog.write().await;
        catalog.book(book_id)?;
        let info = catalog
            .infos
            .entry(book_id)
            .or_insert_with(|| BookInfo::empty(book_id));
        info.apply(patch);
        Ok(info.clone())
    }

    // =========================================================================
    // Entries
    // =========================================================================

    pub async fn list_entries(&self, query: &EntryQuery) -> Vec<Entry> {
        self.list_entries_at(query, Utc::now()).await
    }

    /// Every filter that is set must match; an unknown `since` is ignored
    pub async fn list_entries_at(&self, query: &EntryQuery, now: DateTime<Utc>) -> Vec<Entry> {
        let cutoff = query
            .since
            .as_deref()
            .and_then(Since::parse)
            .map(|since| since.cutoff(now));

        let catalog = self.catalog.read().await;
        catalog
            .entries
            .values()
            .filter(|e| cutoff.map_or(true, |cutoff| e.date_started >= cutoff))
            .filter(|e| query.returned.map_or(true, |returned| e.returned == returned))
            .filter(|e| query.username.as_ref().map_or(true, |u| &e.borrower == u))
            .filter(|e| match &query.book_title {
                Some(title) => catalog
                    .books
                    .get(&e.book_id)
                    .is_some_and(|b| contains_ignore_case(&b.title, title)),
                None => true,
            })
            .cloned()
            .collect()
    }

    pub async fn get_entry(&self, id: i64) -> AppResult<Entry> {
        self.catalog
            .read()
            .await
            .entries
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Entry with id {} not found", id)))
    }

    pub async fn open_entry(&self, new_entry: NewEntry) -> AppResult<Entry> {
        self.open_entry_at(new_entry, Utc::now()).await
    }

    /// Lend a book to a registered user
    pub async fn open_entry_at(&self, new_entry: NewEntry, now: DateTime<Utc>) -> AppResult<Entry> {
        if self
            .users
            .find_by_username(&new_entry.borrower_username)
            .await?
            .is_none()
        {
            return Err(AppError::NotFound(format!(
                "User '{}' not found",
                new_entry.borrower_username
            )));
        }

        let mut catalog = self.catalog.write().await;
        catalog.book(new_entry.borrowed_book_id)?;

        let entry = Entry::open(
            catalog.next_id(),
            new_entry.borrowed_book_id,
            new_entry.borrower_username,
            now,
        );
        catalog.entries.insert(entry.id, entry.clone());
        tracing::info!(entry = entry.id, book = entry.book_id, borrower = %entry.borrower, "Book lent");
        Ok(entry)
    }

    /// Close a loan; fails with a business-rule error when it is already closed
    pub async fn return_entry(&self, id: i64, now: DateTime<Utc>) -> AppResult<Entry> {
        let mut catalog = self.catalog.write().await;
        let entry = catalog
            .entries
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Entry with id {} not found", id)))?;
        entry.close(now)?;
        Ok(entry.clone())
    }
}
