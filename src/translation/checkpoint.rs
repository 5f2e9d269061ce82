/*!
 * Durable checkpoints of a document in progress.
 */

use log::debug;
use std::path::{Path, PathBuf};

use crate::errors::DocumentError;
use crate::file_utils::FileManager;
use crate::xliff::XliffDocument;

/// Writes a document to its output path atomically.
///
/// The output path must not be written by anything else while a run owns it.
#[derive(Debug, Clone)]
pub struct CheckpointWriter {
    path: PathBuf,
}

impl CheckpointWriter {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Serialize the document and replace the output file with it.
    ///
    /// A reader of the output path sees either the previous checkpoint or
    /// this one, never a partial write.
    pub fn write(&self, document: &XliffDocument) -> Result<(), DocumentError> {
        let bytes = document.serialize()?;
        FileManager::atomic_write(&self.path, &bytes)?;
        debug!(
            "Checkpoint written to {} ({} modified unit(s))",
            self.path.display(),
            document.modified_count()
        );
        Ok(())
    }
}
