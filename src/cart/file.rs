//! File-backed cart store

use std::{
    fs::{self, File},
    io::{self, Write},
    path::{Path, PathBuf},
};

use tracing::{debug, warn};

use super::{CartError, CartLine, CartStore, normalize_lines};

/// Cart store persisted as a JSON array in a single file.
///
/// Writes land in a sibling temporary file which is then renamed over the
/// cart file. Separate processes sharing a file are last-write-wins.
#[derive(Debug, Clone)]
pub struct FileCartStore {
    path: PathBuf,
}

impl FileCartStore {
    /// Create a store backed by `path`. The file is created on first save.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");

        self.path.with_file_name(name)
    }
}

/// Write `contents` to a new file at `path` and flush it to disk.
fn write_synced(path: &Path, contents: &[u8]) -> io::Result<()> {
    let mut file = File::create(path)?;

    file.write_all(contents)?;
    file.sync_all()
}

impl CartStore for FileCartStore {
    fn load(&self) -> Result<Vec<CartLine>, CartError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(error) => return Err(error.into()),
        };

        if contents.trim().is_empty() {
            return Ok(Vec::new());
        }

        let lines: Vec<CartLine> = serde_json::from_str(&contents)?;

        Ok(normalize_lines(lines))
    }

    fn save(&self, lines: &[CartLine]) -> Result<(), CartError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let lines = normalize_lines(lines.iter().cloned());
        let json = serde_json::to_vec_pretty(&lines)?;
        let temp = self.temp_path();

        let written = write_synced(&temp, &json).and_then(|()| fs::rename(&temp, &self.path));

        if let Err(error) = written {
            let cleanup = fs::remove_file(&temp).or_else(|cleanup| {
                if cleanup.kind() == io::ErrorKind::NotFound {
                    Ok(())
                } else {
                    Err(cleanup)
                }
            });

            if let Err(cleanup) = cleanup {
                warn!(
                    path = %temp.display(),
                    error = %cleanup,
                    "failed to remove temp cart file"
                );
            }

            return Err(error.into());
        }

        debug!(path = %self.path.display(), lines = lines.len(), "saved cart");

        Ok(())
    }

    fn delete_item(&self, product_id: &str) -> Result<(), CartError> {
        let mut lines = self.load()?;
        let before = lines.len();

        lines.retain(|line| line.product_id != product_id);

        if lines.len() == before {
            return Ok(());
        }

        self.save(&lines)
    }
}
