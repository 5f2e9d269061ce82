use anyhow::{Context, Result};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use walkdir::WalkDir;

// @module: File and directory utilities

/// Extensions recognised as XLIFF documents
pub const XLIFF_EXTENSIONS: [&str; 2] = ["xlf", "xliff"];

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @checks: File existence
    pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().is_file()
    }

    // @checks: Directory existence
    pub fn dir_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().is_dir()
    }

    // @creates: Directory and parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> io::Result<()> {
        let path = path.as_ref();
        if !path.as_os_str().is_empty() && !path.exists() {
            fs::create_dir_all(path)?;
        }
        Ok(())
    }

    // @checks: XLIFF extension, case-insensitive
    pub fn is_xliff_file<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref()
            .extension()
            .map(|ext| {
                let ext = ext.to_string_lossy();
                XLIFF_EXTENSIONS.iter().any(|known| ext.eq_ignore_ascii_case(known))
            })
            .unwrap_or(false)
    }

    /// Find XLIFF documents under a directory, sorted by path
    pub fn find_xliff_files<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>> {
        let mut result = Vec::new();

        for entry in WalkDir::new(dir.as_ref()).follow_links(true) {
            let entry = entry.context("Failed to read directory entry")?;
            let path = entry.path();

            if path.is_file() && Self::is_xliff_file(path) {
                result.push(path.to_path_buf());
            }
        }

        result.sort();
        Ok(result)
    }

    /// Replace `path` with `contents` without ever exposing a partial file.
    ///
    /// The data goes to a temporary file in the destination directory, is
    /// flushed and synced, then renamed over the destination. An existing
    /// destination keeps its permissions.
    pub fn atomic_write<P: AsRef<Path>>(path: P, contents: &[u8]) -> io::Result<()> {
        let path = path.as_ref();
        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        Self::ensure_dir(&parent)?;

        let mut temp = NamedTempFile::new_in(&parent)?;
        temp.write_all(contents)?;
        temp.flush()?;
        if let Ok(metadata) = fs::metadata(path) {
            temp.as_file().set_permissions(metadata.permissions())?;
        }
        temp.as_file().sync_all()?;
        temp.persist(path).map_err(|e| e.error)?;

        Ok(())
    }

    /// Read a file to a string
    pub fn read_to_string<P: AsRef<Path>>(path: P) -> Result<String> {
        fs::read_to_string(&path)
            .with_context(|| format!("Failed to read file: {:?}", path.as_ref()))
    }
}
