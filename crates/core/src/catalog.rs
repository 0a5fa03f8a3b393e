use std::collections::HashSet;

use anyhow::Context as _;
use serde::Deserialize;

use crate::Book;

const BUILTIN_CATALOG: &str = include_str!("../assets/catalog.json");

/// Read-only table of books, loaded once at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct Catalog {
    books: Vec<Book>,
}

#[derive(Deserialize)]
struct CatalogFile {
    books: Vec<Book>,
}

impl Catalog {
    pub fn builtin() -> anyhow::Result<Self> {
        Self::from_json(BUILTIN_CATALOG).context("parse built-in catalog")
    }

    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let file: CatalogFile = serde_json::from_str(json)?;
        Self::new(file.books)
    }

    pub fn new(books: Vec<Book>) -> anyhow::Result<Self> {
        let mut ids = HashSet::new();
        for book in &books {
            if book.pages.is_empty() {
                anyhow::bail!("book `{}` has no pages", book.id);
            }
            if !ids.insert(book.id.as_str()) {
                anyhow::bail!("duplicate book id `{}`", book.id);
            }
        }
        Ok(Self { books })
    }

    pub fn books(&self) -> &[Book] {
        &self.books
    }

    /// Books shown on the shelf, in catalog order.
    pub fn shelf(&self) -> Vec<&Book> {
        self.books.iter().filter(|b| !b.hidden).collect()
    }

    pub fn find(&self, id: &str) -> Option<&Book> {
        self.books.iter().find(|b| b.id == id)
    }
}
