use std::{cell::Cell, fs, io, path::PathBuf, rc::Rc};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to write best score: {0}")]
    Write(#[source] io::Error),
}

/// Best-score slot the board persists through. A missing or malformed
/// stored value reads as 0 rather than an error.
pub trait ScoreStore {
    fn load(&mut self) -> u32;

    fn save(&mut self, value: u32) -> Result<(), StoreError>;
}

/// Best score as decimal text in a single file.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ScoreStore for FileStore {
    fn load(&mut self) -> u32 {
        fs::read_to_string(&self.path)
            .ok()
            .and_then(|contents| contents.trim().parse().ok())
            .unwrap_or(0)
    }

    fn save(&mut self, value: u32) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(StoreError::Write)?;
        }

        fs::write(&self.path, value.to_string()).map_err(StoreError::Write)
    }
}

/// In-memory slot. Clones share the value, so a test can hand one clone to
/// the board and observe saves through the other.
#[derive(Clone, Default)]
pub struct MemoryStore {
    value: Rc<Cell<Option<u32>>>,
}

impl MemoryStore {
    pub fn with_value(value: u32) -> Self {
        Self {
            value: Rc::new(Cell::new(Some(value))),
        }
    }

    pub fn value(&self) -> Option<u32> {
        self.value.get()
    }
}

impl ScoreStore for MemoryStore {
    fn load(&mut self) -> u32 {
        self.value.get().unwrap_or(0)
    }

    fn save(&mut self, value: u32) -> Result<(), StoreError> {
        self.value.set(Some(value));

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::{env, path::PathBuf, process};

    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        env::temp_dir().join(format!("engine-2048-{}-{name}", process::id()))
    }

    #[test]
    fn missing_file_loads_zero() {
        let mut store = FileStore::new(temp_path("missing"));

        assert_eq!(store.load(), 0);
    }

    #[test]
    fn malformed_file_loads_zero() {
        let path = temp_path("malformed");
        fs::write(&path, "not a number").unwrap();

        let mut store = FileStore::new(&path);

        assert_eq!(store.load(), 0);

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn saved_score_round_trips() {
        let path = temp_path("round-trip");

        let mut store = FileStore::new(&path);
        store.save(1234).unwrap();

        assert_eq!(store.load(), 1234);
        assert_eq!(fs::read_to_string(&path).unwrap(), "1234");

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn memory_store_shares_saves_between_clones() {
        let store = MemoryStore::default();
        let mut handle = store.clone();

        assert_eq!(handle.load(), 0);

        handle.save(42).unwrap();

        assert_eq!(store.value(), Some(42));
        assert_eq!(handle.load(), 42);
    }
}
