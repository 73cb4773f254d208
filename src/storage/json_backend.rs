use std::{
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
};

use crate::{
    domain::BillBook,
    errors::{BillError, Result},
};

use super::StorageBackend;

const TMP_SUFFIX: &str = "tmp";

/// Stores each bill book as one pretty-printed JSON document under a root
/// directory, written atomically through a `.tmp` sibling.
#[derive(Clone)]
pub struct JsonStorage {
    root: PathBuf,
}

impl JsonStorage {
    pub fn new(root: PathBuf) -> Result<Self> {
        ensure_dir(&root)?;
        Ok(Self { root })
    }

    pub fn book_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{}.json", canonical_name(name)))
    }

    pub fn base_dir(&self) -> &Path {
        &self.root
    }
}

impl StorageBackend for JsonStorage {
    fn save(&self, book: &BillBook, name: &str) -> Result<()> {
        save_book_to_path(book, &self.book_path(name))
    }

    fn load(&self, name: &str) -> Result<BillBook> {
        let path = self.book_path(name);
        if !path.exists() {
            return Err(BillError::NotFound(format!("bill book `{name}`")));
        }
        load_book_from_path(&path)
    }

    fn list(&self) -> Result<Vec<String>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }
        let mut entries = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                entries.push(stem.to_string());
            }
        }
        entries.sort();
        Ok(entries)
    }

    fn delete(&self, name: &str) -> Result<()> {
        let path = self.book_path(name);
        if !path.exists() {
            return Err(BillError::NotFound(format!("bill book `{name}`")));
        }
        fs::remove_file(path)?;
        Ok(())
    }
}

pub fn save_book_to_path(book: &BillBook, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    let json = serde_json::to_string_pretty(book)?;
    let tmp = tmp_path(path);
    write_atomic(&tmp, &json)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

pub fn load_book_from_path(path: &Path) -> Result<BillBook> {
    let data = fs::read_to_string(path)?;
    let book: BillBook = serde_json::from_str(&data)?;
    Ok(book)
}

fn canonical_name(name: &str) -> String {
    let sanitized: String = name
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'a'..='z' | '0'..='9' => c,
            _ => '_',
        })
        .collect();
    if sanitized.trim_matches('_').is_empty() {
        "book".into()
    } else {
        sanitized
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.to_path_buf();
    let ext = match path.extension().and_then(|ext| ext.to_str()) {
        Some(existing) => format!("{}.{}", existing, TMP_SUFFIX),
        None => TMP_SUFFIX.to_string(),
    };
    tmp.set_extension(ext);
    tmp
}

fn write_atomic(path: &Path, data: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    let mut file = File::create(path)?;
    file.write_all(data.as_bytes())?;
    file.flush()?;
    Ok(())
}

fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn storage_with_temp_dir() -> (JsonStorage, TempDir) {
        let temp = TempDir::new().expect("temp dir");
        let storage = JsonStorage::new(temp.path().to_path_buf()).expect("json storage");
        (storage, temp)
    }

    #[test]
    fn save_and_load_roundtrip() {
        let (storage, _guard) = storage_with_temp_dir();
        let book = BillBook::new("Sample");
        storage.save(&book, "household").expect("save book");
        let loaded = storage.load("household").expect("load book");
        assert_eq!(loaded.name, "Sample");
        assert_eq!(loaded.id, book.id);
    }

    #[test]
    fn canonical_name_sanitizes_file_names() {
        assert_eq!(canonical_name("Família 2025"), "fam_lia_2025");
        assert_eq!(canonical_name("  "), "book");
    }

    #[test]
    fn missing_books_are_not_found() {
        let (storage, _guard) = storage_with_temp_dir();
        assert!(matches!(
            storage.load("nope"),
            Err(BillError::NotFound(_))
        ));
        assert!(matches!(
            storage.delete("nope"),
            Err(BillError::NotFound(_))
        ));
    }
}
