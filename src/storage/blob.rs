use std::fs;
use std::io;
use std::path::PathBuf;

/// Flat key/value store holding one patient's entries, packets and analyses.
///
/// Writes replace the whole blob. There is no index: `list_keys` is a scan.
pub trait BlobStore: Send + Sync {
    /// `Ok(None)` when nothing is stored under `key`.
    fn get(&self, key: &str) -> io::Result<Option<Vec<u8>>>;

    fn put(&self, key: &str, bytes: &[u8]) -> io::Result<()>;

    /// Keys starting with `prefix`, in no particular order.
    fn list_keys(&self, prefix: &str) -> io::Result<Vec<String>>;
}

/// One directory per patient, one file per key.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, key: &str) -> io::Result<PathBuf> {
        if key.is_empty() || key.starts_with('.') || key.contains(['/', '\\']) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid blob key {key:?}"),
            ));
        }
        Ok(self.root.join(key))
    }
}

impl BlobStore for FsBlobStore {
    fn get(&self, key: &str) -> io::Result<Option<Vec<u8>>> {
        let path = self.path_for(key)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn put(&self, key: &str, bytes: &[u8]) -> io::Result<()> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.root)?;

        // Readers see either the old blob or the new one, never a partial write
        let tmp = self.root.join(format!(".{key}.tmp"));
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, &path)
    }

    fn list_keys(&self, prefix: &str) -> io::Result<Vec<String>> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let mut keys = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            if !name.starts_with('.') && name.starts_with(prefix) {
                keys.push(name);
            }
        }
        Ok(keys)
    }
}
