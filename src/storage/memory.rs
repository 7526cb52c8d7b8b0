use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use super::blob::BlobStore;

/// In-memory store for tests. Keys are listed in insertion order, and every
/// `put` is counted.
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<Vec<(String, Vec<u8>)>>,
    puts: AtomicUsize,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a blob without counting it as a write.
    pub fn insert(&self, key: &str, bytes: impl Into<Vec<u8>>) {
        let mut blobs = self.blobs.lock().unwrap();
        let bytes = bytes.into();
        match blobs.iter_mut().find(|(k, _)| k == key) {
            Some(slot) => slot.1 = bytes,
            None => blobs.push((key.to_string(), bytes)),
        }
    }

    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.blobs.lock().unwrap().iter().any(|(k, _)| k == key)
    }
}

impl BlobStore for MemoryBlobStore {
    fn get(&self, key: &str) -> io::Result<Option<Vec<u8>>> {
        let blobs = self.blobs.lock().unwrap();
        Ok(blobs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, bytes)| bytes.clone()))
    }

    fn put(&self, key: &str, bytes: &[u8]) -> io::Result<()> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.insert(key, bytes.to_vec());
        Ok(())
    }

    fn list_keys(&self, prefix: &str) -> io::Result<Vec<String>> {
        let blobs = self.blobs.lock().unwrap();
        Ok(blobs
            .iter()
            .filter(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect())
    }
}
