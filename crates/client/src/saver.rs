//! Local file-save capability used by the download pipeline.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use fileshelf_transfer::validate_save_name;
use tracing::debug;

/// Persists a downloaded file.
///
/// The download pipeline hands over the reassembled bytes and the name the
/// server announced. Implementations decide where the bytes end up.
pub trait FileSaver: Send + Sync {
    /// Saves `data` under `name` and returns where it was written.
    fn save<'a>(
        &'a self,
        name: &'a str,
        data: &'a [u8],
    ) -> Pin<Box<dyn Future<Output = std::io::Result<PathBuf>> + Send + 'a>>;
}

/// Saves downloads into a directory on disk.
///
/// Bytes are written to a hidden `.part` file first and renamed into place,
/// so a crash never leaves a truncated file under the final name.
#[derive(Debug, Clone)]
pub struct DiskSaver {
    dir: PathBuf,
}

impl DiskSaver {
    /// Creates a saver writing into `dir` (created on first save).
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Target directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl FileSaver for DiskSaver {
    fn save<'a>(
        &'a self,
        name: &'a str,
        data: &'a [u8],
    ) -> Pin<Box<dyn Future<Output = std::io::Result<PathBuf>> + Send + 'a>> {
        Box::pin(async move {
            let name = validate_save_name(name)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;

            tokio::fs::create_dir_all(&self.dir).await?;
            let target = self.dir.join(name);
            let partial = self.dir.join(format!(".{name}.part"));

            tokio::fs::write(&partial, data).await?;
            tokio::fs::rename(&partial, &target).await?;

            debug!(path = %target.display(), bytes = data.len(), "download saved");
            Ok(target)
        })
    }
}
