pub mod json_backend;

use std::path::Path;

use crate::{domain::BillBook, errors::Result};

/// Abstraction over persistence backends capable of storing bill books.
///
/// The engine performs no I/O of its own: a caller loads a book, runs one
/// public operation against it, and saves the whole document back, which
/// makes every operation a single unit of work.
pub trait StorageBackend: Send + Sync {
    fn save(&self, book: &BillBook, name: &str) -> Result<()>;
    fn load(&self, name: &str) -> Result<BillBook>;
    fn list(&self) -> Result<Vec<String>>;
    fn delete(&self, name: &str) -> Result<()>;

    /// Optional helpers for ad-hoc file operations. Default implementations
    /// forward to the JSON codec.
    fn save_to_path(&self, book: &BillBook, path: &Path) -> Result<()> {
        json_backend::save_book_to_path(book, path)
    }

    fn load_from_path(&self, path: &Path) -> Result<BillBook> {
        json_backend::load_book_from_path(path)
    }
}

pub use json_backend::JsonStorage;
