//! Read-only view of the shared directory.
//!
//! Nothing is cached: every listing and lookup reads the filesystem at the
//! moment it is requested.

use std::{
    io,
    path::{Component, Path, PathBuf},
};

use crate::error::CatalogError;

/// Demo files written by [`FileCatalog::seed_samples`]
const SAMPLE_FILES: &[(&str, &str)] = &[
    (
        "example.txt",
        "This is an example file for transfer.\nIt contains several lines of text.\n",
    ),
    (
        "data.csv",
        "name,age,city\nJuan,25,Concepcion del Uruguay\nMaria,30,Buenos Aires\n",
    ),
    (
        "info.md",
        "# Markdown file\n\nThis is an example **Markdown** file.\n\n- Item 1\n- Item 2\n",
    ),
];

/// One file of the listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub name: String,
    pub size: u64,
}

/// A file that passed [`FileCatalog::resolve`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFile {
    pub name: String,
    pub path: PathBuf,
    /// Byte length observed at resolve time
    pub size: u64,
}

/// Lists and resolves regular files directly inside one directory
#[derive(Debug, Clone)]
pub struct FileCatalog {
    root: PathBuf,
}

impl FileCatalog {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the shared directory if it does not exist yet.
    pub async fn ensure_root(&self) -> io::Result<()> {
        if !tokio::fs::try_exists(&self.root).await? {
            tokio::fs::create_dir_all(&self.root).await?;
            tracing::info!("Created shared directory {}", self.root.display());
        }
        Ok(())
    }

    /// Write the demo files that are not already present.
    ///
    /// Returns the names that were written.
    pub async fn seed_samples(&self) -> io::Result<Vec<&'static str>> {
        self.ensure_root().await?;

        let mut written = Vec::new();
        for (name, contents) in SAMPLE_FILES {
            let path = self.root.join(name);
            if tokio::fs::try_exists(&path).await? {
                continue;
            }
            tokio::fs::write(&path, contents).await?;
            written.push(*name);
        }
        tracing::info!(
            "Sample files in {}: wrote {:?}",
            self.root.display(),
            written
        );
        Ok(written)
    }

    /// Regular files directly in the shared directory, sorted by name.
    ///
    /// Entries that vanish or cannot be inspected while listing are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Io`] if the directory itself cannot be read.
    pub async fn list(&self) -> Result<Vec<CatalogEntry>, CatalogError> {
        let mut dir = tokio::fs::read_dir(&self.root).await?;
        let mut entries = Vec::new();

        while let Some(entry) = dir.next_entry().await? {
            let metadata = match tokio::fs::metadata(entry.path()).await {
                Ok(metadata) => metadata,
                Err(e) => {
                    tracing::debug!("Skipping {}: {}", entry.path().display(), e);
                    continue;
                }
            };
            if !metadata.is_file() {
                continue;
            }
            entries.push(CatalogEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                size: metadata.len(),
            });
        }

        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    /// Resolve `name` to a regular file directly inside the shared directory.
    ///
    /// # Errors
    ///
    /// - [`CatalogError::InvalidName`] for names with separators, `.`/`..`,
    ///   or whose canonical path leaves the shared directory
    /// - [`CatalogError::NotFound`] when no such regular file exists
    pub async fn resolve(&self, name: &str) -> Result<ResolvedFile, CatalogError> {
        if !is_plain_file_name(name) {
            return Err(CatalogError::InvalidName(name.to_string()));
        }

        let path = self.root.join(name);
        let metadata = match tokio::fs::metadata(&path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(CatalogError::NotFound(name.to_string()));
            }
            Err(e) => return Err(CatalogError::Io(e)),
        };
        if !metadata.is_file() {
            return Err(CatalogError::NotFound(name.to_string()));
        }

        let root = tokio::fs::canonicalize(&self.root).await?;
        let canonical = tokio::fs::canonicalize(&path).await?;
        if canonical.parent() != Some(root.as_path()) {
            return Err(CatalogError::InvalidName(name.to_string()));
        }

        Ok(ResolvedFile {
            name: name.to_string(),
            path,
            size: metadata.len(),
        })
    }
}

/// Exactly one normal path component with no separator of either platform
fn is_plain_file_name(name: &str) -> bool {
    if name.is_empty() || name.contains(['/', '\\', '\0']) {
        return false;
    }
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}
