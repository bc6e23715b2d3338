use std::{
    fs::{File, OpenOptions},
    io::{self, Read, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

/// Byte sink and source backing a database log.
pub trait StorageDevice: Send {
    /// Reads the whole device.
    fn read_all(&mut self) -> io::Result<Vec<u8>>;

    /// Reads `len` bytes starting at `offset`.
    fn read_at(&self, offset: u64, len: usize) -> io::Result<Vec<u8>>;

    /// Appends bytes at the end of the device.
    fn append(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Shrinks the device to `len` bytes.
    fn truncate(&mut self, len: u64) -> io::Result<()>;

    /// Replaces the whole device contents.
    fn replace(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Flushes written bytes to durable storage.
    fn sync(&mut self) -> io::Result<()>;

    /// Current length in bytes.
    fn len(&mut self) -> io::Result<u64>;
}

/// Device backed by a file on disk.
#[derive(Debug)]
pub struct FileDevice {
    path: PathBuf,
    file: File,
}

impl FileDevice {
    /// Opens `path`, creating it when missing.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;
        Ok(Self { path, file })
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StorageDevice for FileDevice {
    fn read_all(&mut self) -> io::Result<Vec<u8>> {
        let mut bytes = Vec::new();
        let _ = self.file.seek(SeekFrom::Start(0))?;
        let _ = self.file.read_to_end(&mut bytes)?;
        Ok(bytes)
    }

    fn read_at(&self, offset: u64, len: usize) -> io::Result<Vec<u8>> {
        let mut file = &self.file;
        let _ = file.seek(SeekFrom::Start(offset))?;
        let mut bytes = vec![0; len];
        file.read_exact(&mut bytes)?;
        Ok(bytes)
    }

    fn append(&mut self, bytes: &[u8]) -> io::Result<()> {
        let _ = self.file.seek(SeekFrom::End(0))?;
        self.file.write_all(bytes)
    }

    fn truncate(&mut self, len: u64) -> io::Result<()> {
        self.file.set_len(len)
    }

    fn replace(&mut self, bytes: &[u8]) -> io::Result<()> {
        let staging = self.path.with_extension("compact");
        {
            let mut staged = File::create(&staging)?;
            staged.write_all(bytes)?;
            staged.sync_all()?;
        }
        std::fs::rename(&staging, &self.path)?;
        self.file = OpenOptions::new().read(true).write(true).open(&self.path)?;
        Ok(())
    }

    fn sync(&mut self) -> io::Result<()> {
        self.file.sync_data()
    }

    fn len(&mut self) -> io::Result<u64> {
        Ok(self.file.metadata()?.len())
    }
}

/// Device held in memory.
///
/// Clones share the same buffer, which lets tests close and reopen a
/// database without touching the filesystem.
#[derive(Clone, Debug, Default)]
pub struct MemoryDevice {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl MemoryDevice {
    /// Creates an empty device.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the current contents.
    #[must_use]
    pub fn contents(&self) -> Vec<u8> {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<u8>> {
        match self.bytes.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl StorageDevice for MemoryDevice {
    fn read_all(&mut self) -> io::Result<Vec<u8>> {
        Ok(self.contents())
    }

    fn read_at(&self, offset: u64, len: usize) -> io::Result<Vec<u8>> {
        let bytes = self.lock();
        let start = usize::try_from(offset).map_err(|_| io::Error::from(io::ErrorKind::InvalidInput))?;
        start
            .checked_add(len)
            .and_then(|end| bytes.get(start..end))
            .map(<[u8]>::to_vec)
            .ok_or_else(|| io::Error::from(io::ErrorKind::UnexpectedEof))
    }

    fn append(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.lock().extend_from_slice(bytes);
        Ok(())
    }

    fn truncate(&mut self, len: u64) -> io::Result<()> {
        let len = usize::try_from(len).map_err(|_| io::Error::from(io::ErrorKind::InvalidInput))?;
        self.lock().truncate(len);
        Ok(())
    }

    fn replace(&mut self, bytes: &[u8]) -> io::Result<()> {
        let mut guard = self.lock();
        guard.clear();
        guard.extend_from_slice(bytes);
        Ok(())
    }

    fn sync(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn len(&mut self) -> io::Result<u64> {
        Ok(self.lock().len() as u64)
    }
}
