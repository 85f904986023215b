use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::PathBuf;

use log::{info, warn};

use crate::error::{Result, StationError};

/// Removable storage holding archived records
pub trait Storage {
    type File: Write;

    /// Opens `path` for writing, truncating anything already there
    fn create(&mut self, path: &str) -> Result<Self::File>;

    fn read(&mut self, path: &str) -> Result<Vec<u8>>;
}

/// A single persisted byte, committed durably on every write
pub trait CounterStore {
    /// Last used sequence number, 0 when nothing was ever written
    fn load(&mut self) -> Result<u8>;

    fn commit(&mut self, value: u8) -> Result<()>;
}

/// Storage rooted at a mounted directory, `/sdcard` on the board
#[derive(Clone, Debug)]
pub struct DirStorage {
    root: PathBuf,
}

impl DirStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path.trim_start_matches('/'))
    }
}

impl Storage for DirStorage {
    type File = File;

    fn create(&mut self, path: &str) -> Result<File> {
        File::create(self.resolve(path)).map_err(|e| {
            warn!("Failed to open {} for writing: {}", path, e);
            StationError::StorageOpen {
                path: path.to_string(),
            }
        })
    }

    fn read(&mut self, path: &str) -> Result<Vec<u8>> {
        fs::read(self.resolve(path)).map_err(|e| {
            warn!("Failed to read {}: {}", path, e);
            StationError::StorageRead {
                path: path.to_string(),
            }
        })
    }
}

/// Keeps the counter in a one byte file
#[derive(Clone, Debug)]
pub struct FileCounter {
    path: PathBuf,
}

impl FileCounter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CounterStore for FileCounter {
    fn load(&mut self) -> Result<u8> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(bytes.first().copied().unwrap_or(0)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(0),
            Err(e) => Err(StationError::Counter(e)),
        }
    }

    fn commit(&mut self, value: u8) -> Result<()> {
        let mut file = File::create(&self.path).map_err(StationError::Counter)?;
        file.write_all(&[value]).map_err(StationError::Counter)?;
        file.sync_all().map_err(StationError::Counter)
    }
}

/// Where a station keeps records before uploading them as files
pub trait Archive {
    /// Stores `data` under a fresh name and returns the path it was written to
    fn write_file(&mut self, data: &[u8]) -> Result<String>;

    fn read_file(&mut self, path: &str) -> Result<Vec<u8>>;
}

/// Stands in for the archive of a station that doesn't keep files
#[derive(Debug)]
pub enum NoArchive {}

impl Archive for NoArchive {
    fn write_file(&mut self, _data: &[u8]) -> Result<String> {
        match *self {}
    }

    fn read_file(&mut self, _path: &str) -> Result<Vec<u8>> {
        match *self {}
    }
}

/// Name of the file the counter value `last` hands out next
pub fn next_file_path(last: u8) -> String {
    format!("/file_{}.txt", last as u16 + 1)
}

/// Writes records to sequentially numbered files.
///
/// The counter is re-read on every write and only advanced once the file
/// opened, so a failed open doesn't burn a number. Read, increment and
/// commit are not atomic: keep a single writer.
pub struct FileArchive<St, Cn> {
    storage: St,
    counter: Cn,
}

impl<St, Cn> FileArchive<St, Cn>
where
    St: Storage,
    Cn: CounterStore,
{
    pub fn new(storage: St, counter: Cn) -> Self {
        Self { storage, counter }
    }
}

impl<St, Cn> Archive for FileArchive<St, Cn>
where
    St: Storage,
    Cn: CounterStore,
{
    /// Writes `data` to the next numbered file and returns its path
    fn write_file(&mut self, data: &[u8]) -> Result<String> {
        info!("Writing file to storage...");
        let last = self.counter.load()?;
        let path = next_file_path(last);

        let mut file = self.storage.create(&path)?;
        if let Err(e) = file.write_all(data) {
            warn!("Short write to {}: {}", path, e);
        }
        // Wraps like the one byte it lives in
        self.counter.commit(last.wrapping_add(1))?;
        Ok(path)
    }

    fn read_file(&mut self, path: &str) -> Result<Vec<u8>> {
        self.storage.read(path)
    }
}
