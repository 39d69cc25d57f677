use crate::core::cache::{CachedQuotes, QuoteCache};
use crate::core::error::CacheError;
use crate::core::quote::Quote;
use async_trait::async_trait;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tempfile::NamedTempFile;
use tokio::io::AsyncReadExt;
use tracing::debug;

/// Keeps one `<symbol>.json` file per symbol inside a directory.
///
/// The age of a snapshot is taken from the file's modification time, nothing
/// about expiry is written into the file itself.
pub struct DiskQuoteCache {
    dir: PathBuf,
}

impl DiskQuoteCache {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, symbol: &str) -> PathBuf {
        self.dir.join(format!("{symbol}.json"))
    }
}

fn age_of(modified: SystemTime) -> std::time::Duration {
    let now = SystemTime::now();
    // mtime may sit in the future on a skewed clock; the distance counts either way
    now.duration_since(modified)
        .or_else(|_| modified.duration_since(now))
        .unwrap_or_default()
}

fn write_atomically(dir: &Path, path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut file = NamedTempFile::new_in(dir)?;
    file.write_all(data)?;
    file.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[async_trait]
impl QuoteCache for DiskQuoteCache {
    async fn load(&self, symbol: &str) -> Result<Option<CachedQuotes>, CacheError> {
        let path = self.path_for(symbol);

        let mut file = match tokio::fs::File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("Cache MISS for symbol: {}", symbol);
                return Ok(None);
            }
            Err(source) => return Err(CacheError::Open { path, source }),
        };

        let modified = match file.metadata().await.and_then(|m| m.modified()) {
            Ok(modified) => modified,
            Err(source) => return Err(CacheError::Read { path, source }),
        };

        let mut data = Vec::new();
        if let Err(source) = file.read_to_end(&mut data).await {
            return Err(CacheError::Read { path, source });
        }

        let quotes: Vec<Quote> = match serde_json::from_slice(&data) {
            Ok(quotes) => quotes,
            Err(source) => return Err(CacheError::Parse { path, source }),
        };

        let age = age_of(modified);
        debug!("Cache HIT for symbol: {} (age {:?})", symbol, age);
        Ok(Some(CachedQuotes { quotes, age }))
    }

    async fn store(&self, symbol: &str, quotes: &[Quote]) -> Result<(), CacheError> {
        let data = serde_json::to_vec(quotes).map_err(CacheError::Encode)?;
        let path = self.path_for(symbol);

        let (dir, target) = (self.dir.clone(), path.clone());
        tokio::task::spawn_blocking(move || write_atomically(&dir, &target, &data))
            .await
            .map_err(std::io::Error::other)
            .and_then(|written| written)
            .map_err(|source| CacheError::Write {
                path: path.clone(),
                source,
            })?;

        debug!("Cache PUT for symbol: {} at {}", symbol, path.display());
        Ok(())
    }
}
