use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::page::PageId;
use crate::utils::error::{PaginatedError, Result};
use crate::utils::expect_msg::ExpectMsg;

/// Persistent home of pages that are not resident.
pub trait BackingStore: Send + Sync {
    /// Stored contents of a page, or `None` if it was never stored.
    fn load(&self, id: PageId) -> Result<Option<Vec<f32>>>;

    fn store(&self, id: PageId, data: &[f32]) -> Result<()>;
}

/// Keeps evicted pages in a map. Useful for tests and for bounding the
/// resident set without touching disk.
#[derive(Default)]
pub struct MemoryStore {
    pages: Mutex<HashMap<PageId, Vec<f32>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: PageId) -> bool {
        self.pages
            .lock()
            .expect_msg("Failed to acquire lock on memory store")
            .contains_key(&id)
    }
}

impl BackingStore for MemoryStore {
    fn load(&self, id: PageId) -> Result<Option<Vec<f32>>> {
        Ok(self
            .pages
            .lock()
            .expect_msg("Failed to acquire lock on memory store")
            .get(&id)
            .cloned())
    }

    fn store(&self, id: PageId, data: &[f32]) -> Result<()> {
        self.pages
            .lock()
            .expect_msg("Failed to acquire lock on memory store")
            .insert(id, data.to_vec());
        Ok(())
    }
}

/// One file per page under a directory, raw native-endian `f32` elements.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open (creating if missing) a page directory.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn page_path(&self, id: PageId) -> PathBuf {
        self.dir.join(format!("{:016x}.page", id.0))
    }
}

impl BackingStore for FileStore {
    fn load(&self, id: PageId) -> Result<Option<Vec<f32>>> {
        let bytes = match fs::read(self.page_path(id)) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        if bytes.len() % std::mem::size_of::<f32>() != 0 {
            return Err(PaginatedError::CorruptPage {
                id,
                message: format!("{} bytes is not a whole number of elements", bytes.len()),
            });
        }

        // the read buffer carries no f32 alignment guarantee, so copy out
        Ok(Some(bytemuck::pod_collect_to_vec::<u8, f32>(&bytes)))
    }

    fn store(&self, id: PageId, data: &[f32]) -> Result<()> {
        // readers only ever see whole pages
        let path = self.page_path(id);
        let tmp = path.with_extension("page.tmp");
        let written = fs::write(&tmp, bytemuck::cast_slice::<f32, u8>(data))
            .and_then(|()| fs::rename(&tmp, &path));
        if let Err(e) = written {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_memory_store_missing_page() {
        let store = MemoryStore::new();
        assert!(store.load(PageId(0)).unwrap().is_none());
        assert!(!store.contains(PageId(0)));
    }

    #[test]
    fn test_memory_store_keeps_latest_version() {
        let store = MemoryStore::new();
        store.store(PageId(1), &[1.0, 2.0]).unwrap();
        store.store(PageId(1), &[3.0, 4.0]).unwrap();
        assert_eq!(store.load(PageId(1)).unwrap(), Some(vec![3.0, 4.0]));
    }

    #[test]
    fn test_file_store_persists_across_instances() {
        let dir = tempdir().unwrap();
        {
            let store = FileStore::open(dir.path()).unwrap();
            store.store(PageId(7), &[1.5, -2.0, 3.25]).unwrap();
        }

        let store = FileStore::open(dir.path()).unwrap();
        assert_eq!(store.load(PageId(7)).unwrap(), Some(vec![1.5, -2.0, 3.25]));
        assert!(store.load(PageId(8)).unwrap().is_none());
    }

    #[test]
    fn test_file_store_rejects_truncated_page() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        fs::write(store.page_path(PageId(0)), [0u8; 6]).unwrap();

        assert!(matches!(
            store.load(PageId(0)),
            Err(PaginatedError::CorruptPage { id: PageId(0), .. })
        ));
    }

    #[test]
    fn test_failed_rename_leaves_no_temp_file() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();

        // a non-empty directory in the page's place makes the rename fail
        let blocker = store.page_path(PageId(5));
        fs::create_dir(&blocker).unwrap();
        fs::write(blocker.join("keep"), b"x").unwrap();

        assert!(matches!(
            store.store(PageId(5), &[1.0, 2.0]),
            Err(PaginatedError::Io(_))
        ));

        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![blocker.file_name().unwrap().to_owned()]);
    }
}
