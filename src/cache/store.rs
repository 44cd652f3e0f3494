use crate::error::Result;
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// One cached artifact, keyed by the base name of the container it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheEntry {
    pub source_base_name: String,
    pub artifact_path: PathBuf,
    pub size_bytes: u64,
}

impl CacheEntry {
    pub fn file_name(&self) -> String {
        self.artifact_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Name of the container this artifact was extracted from.
    pub fn source_file_name(&self) -> String {
        format!("{}.fbx", self.source_base_name)
    }

    pub fn size_kb(&self) -> f64 {
        self.size_bytes as f64 / 1024.0
    }

    pub fn display_label(&self) -> String {
        format!("{} ({:.0} KB)", self.source_file_name(), self.size_kb())
    }
}

type Remover = fn(&Path) -> io::Result<()>;

/// Directory of cache artifacts, one file per source base name.
#[derive(Debug, Clone)]
pub struct CacheStore {
    root: PathBuf,
    extension: String,
    remove: Remover,
}

impl CacheStore {
    pub fn new<P: Into<PathBuf>, S: Into<String>>(root: P, extension: S) -> Self {
        Self {
            root: root.into(),
            extension: extension.into().trim_start_matches('.').to_string(),
            remove: remove_artifact,
        }
    }

    #[cfg(test)]
    fn with_remover(mut self, remove: Remover) -> Self {
        self.remove = remove;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.root)?;
        Ok(())
    }

    /// Pure mapping from a container file name (or path) to its artifact path.
    pub fn resolve_artifact_path(&self, source_file_name: &str) -> PathBuf {
        self.root
            .join(format!("{}.{}", base_name(source_file_name), self.extension))
    }

    /// Artifacts sorted by file name. A missing directory lists as empty.
    pub fn list_entries(&self) -> Vec<CacheEntry> {
        if !self.root.is_dir() {
            return Vec::new();
        }

        let walker = WalkDir::new(&self.root)
            .min_depth(1)
            .max_depth(1)
            .follow_links(false)
            .sort_by_file_name();

        let mut entries = Vec::new();
        for entry in walker {
            // Files may vanish underneath us; whatever is readable is listed.
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::debug!(error = %err, "Skipping unreadable cache entry");
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let file_name = entry.file_name().to_string_lossy();
            let Some(source_base_name) = self.source_name_of(&file_name) else {
                continue;
            };

            let size_bytes = match entry.metadata() {
                Ok(metadata) => metadata.len(),
                Err(_) => continue,
            };

            entries.push(CacheEntry {
                source_base_name: source_base_name.to_string(),
                artifact_path: entry.into_path(),
                size_bytes,
            });
        }

        entries
    }

    /// Find an entry by artifact file name, container file name or base name.
    /// Several matches resolve to the last one in listing order.
    pub fn find(&self, selector: &str) -> Option<CacheEntry> {
        let wanted = base_name(selector);
        self.list_entries()
            .into_iter()
            .filter(|entry| entry.file_name() == selector || entry.source_base_name == wanted)
            .last()
    }

    /// Remove one artifact. Never fails loudly: any problem yields `false`.
    pub fn delete(&self, artifact_file_name: &str) -> bool {
        if self.source_name_of(artifact_file_name).is_none()
            || Path::new(artifact_file_name).components().count() != 1
        {
            tracing::debug!(name = artifact_file_name, "Refusing to delete non-artifact name");
            return false;
        }

        let path = self.root.join(artifact_file_name);
        if !path.is_file() {
            return false;
        }

        match (self.remove)(&path) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "Could not delete cache artifact");
                false
            }
        }
    }

    /// Remove every artifact and return how many were removed.
    pub fn clear(&self) -> usize {
        let mut removed = 0;
        for entry in self.list_entries() {
            match (self.remove)(&entry.artifact_path) {
                Ok(()) => removed += 1,
                Err(err) => {
                    tracing::debug!(
                        path = %entry.artifact_path.display(),
                        error = %err,
                        "Skipping artifact that could not be removed"
                    );
                }
            }
        }
        removed
    }

    fn source_name_of<'a>(&self, artifact_file_name: &'a str) -> Option<&'a str> {
        artifact_file_name
            .strip_suffix(self.extension.as_str())
            .and_then(|stem| stem.strip_suffix('.'))
            .filter(|stem| !stem.is_empty())
    }
}

fn remove_artifact(path: &Path) -> io::Result<()> {
    fs::remove_file(path)
}

/// File name without directories and without its last extension.
fn base_name(source_file_name: &str) -> String {
    let path = Path::new(source_file_name);
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| source_file_name.to_string())
}
