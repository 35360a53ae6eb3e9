use anyhow::Context;
use parking_lot::{Mutex, RwLock};
use serde::{de::DeserializeOwned, Serialize};
use std::{
    fs::OpenOptions,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};
use tokio::{sync::Notify, task::JoinHandle, time};
use tracing::{debug, error, info};

#[derive(Clone)]
pub struct JsonDbOptions {
    /// Delay to debounce writes. Default 50ms.
    pub write_delay: Duration,
}

impl Default for JsonDbOptions {
    fn default() -> Self {
        Self {
            write_delay: Duration::from_millis(50),
        }
    }
}

/// Where a snapshot goes on disk. Shared by the background writer and
/// explicit flushes so both take the same lock.
#[derive(Clone)]
struct DbFile {
    path: PathBuf,
    tmp_path: PathBuf,
    lock_path: PathBuf,
}

impl DbFile {
    fn new(path: PathBuf) -> Self {
        let tmp_path = path.with_extension("tmp");
        // the data file itself is replaced on every write, so lock a sibling
        let lock_path = path.with_extension("lock");
        Self {
            path,
            tmp_path,
            lock_path,
        }
    }

    fn write_atomic(&self, json: &str) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }

        let lock = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.lock_path)
            .with_context(|| format!("opening lock file {}", self.lock_path.display()))?;
        fs2::FileExt::lock_exclusive(&lock).context("locking DB file")?;

        std::fs::write(&self.tmp_path, json).context("writing temp file")?;
        std::fs::rename(&self.tmp_path, &self.path).context("atomic rename")?;

        // unlock by dropping file
        drop(lock);
        Ok(())
    }
}

/// A value of `T` kept in memory and mirrored to a JSON file.
///
/// Reads never touch the disk. Updates mark the value dirty and wake a
/// background task that writes a snapshot after `write_delay`, so a burst of
/// updates costs one write.
pub struct JsonDb<T>
where
    T: Serialize + DeserializeOwned + Default + Send + Sync + 'static,
{
    file: DbFile,
    inner: Arc<RwLock<T>>,
    write_notify: Arc<Notify>,
    pending: Arc<Mutex<bool>>,
    writer_handle: Mutex<Option<JoinHandle<()>>>,
    opts: JsonDbOptions,
}

impl<T> JsonDb<T>
where
    T: Serialize + DeserializeOwned + Send + Sync + Default + 'static,
{
    /// Open database at path. If file missing, default T is used.
    pub async fn open<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        Self::open_opts(path, JsonDbOptions::default()).await
    }

    pub async fn open_opts<P: AsRef<Path>>(path: P, opts: JsonDbOptions) -> anyhow::Result<Self> {
        let path = path.as_ref().to_path_buf();

        let initial: T = match std::fs::read_to_string(&path) {
            Ok(s) if !s.trim().is_empty() => serde_json::from_str(&s)
                .with_context(|| format!("deserializing DB file {}", path.display()))?,
            Ok(_) => T::default(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("{} does not exist, starting empty", path.display());
                T::default()
            }
            Err(e) => {
                return Err(e).with_context(|| format!("reading DB file {}", path.display()))
            }
        };

        let db = Self {
            file: DbFile::new(path),
            inner: Arc::new(RwLock::new(initial)),
            write_notify: Arc::new(Notify::new()),
            pending: Arc::new(Mutex::new(false)),
            writer_handle: Mutex::new(None),
            opts,
        };

        db.start_writer();
        Ok(db)
    }

    fn start_writer(&self) {
        let notify = self.write_notify.clone();
        let inner = self.inner.clone();
        let pending = self.pending.clone();
        let file = self.file.clone();
        let write_delay = self.opts.write_delay;

        let handle = tokio::spawn(async move {
            loop {
                notify.notified().await;
                // debounce
                time::sleep(write_delay).await;

                let snapshot = {
                    let guard = inner.read();
                    // a flush may have written everything already
                    if !std::mem::take(&mut *pending.lock()) {
                        continue;
                    }
                    serde_json::to_string_pretty(&*guard)
                };
                let json = match snapshot {
                    Ok(j) => j,
                    Err(e) => {
                        error!("Serialize error when writing DB: {}", e);
                        continue;
                    }
                };

                let file = file.clone();
                match tokio::task::spawn_blocking(move || file.write_atomic(&json)).await {
                    Ok(Ok(())) => debug!("DB snapshot written"),
                    Ok(Err(e)) => error!("Writing DB failed: {:#}", e),
                    Err(e) => error!("DB writer task failed: {}", e),
                }
            }
        });

        *self.writer_handle.lock() = Some(handle);
    }

    /// Read-only access. The closure gets an `&T` and returns `R`.
    /// The closure is executed synchronously under a read lock.
    pub fn read<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&T) -> R,
    {
        let guard = self.inner.read();
        f(&*guard)
    }

    /// Mutating access. Closure gets `&mut T`. The closure runs under write lock.
    /// Changes will be scheduled to be written asynchronously.
    pub fn update<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&mut T) -> R,
    {
        let res = {
            let mut guard = self.inner.write();
            let res = f(&mut *guard);
            *self.pending.lock() = true;
            res
        };
        self.write_notify.notify_one();
        res
    }

    /// Write the current value to disk now.
    pub async fn flush(&self) -> anyhow::Result<()> {
        // clear the flag under the read lock so a concurrent update re-marks it
        let json = {
            let guard = self.inner.read();
            *self.pending.lock() = false;
            serde_json::to_string_pretty(&*guard)?
        };
        let file = self.file.clone();
        tokio::task::spawn_blocking(move || file.write_atomic(&json)).await??;
        Ok(())
    }
}

impl<T> Drop for JsonDb<T>
where
    T: Serialize + DeserializeOwned + Default + Send + Sync + 'static,
{
    fn drop(&mut self) {
        if let Some(handle) = self.writer_handle.lock().take() {
            handle.abort();
        }
        // Best-effort only.
        if !*self.pending.lock() {
            return;
        }
        match serde_json::to_string_pretty(&*self.inner.read()) {
            Ok(json) => {
                if let Err(e) = self.file.write_atomic(&json) {
                    error!("Final DB write failed: {:#}", e);
                }
            }
            Err(e) => error!("Serialize error on DB drop: {}", e),
        }
    }
}
