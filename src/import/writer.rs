//! Corpus writer
//!
//! Appends batches of cleaned documents to a plaintext file. Each record is
//! the document text followed by a blank line:
//!
//! ```text
//! Title
//! Cleaned body
//!
//! ```
//!
//! The file is opened in append mode on the first non-empty batch, so earlier
//! content is preserved and archives without accepted documents leave nothing
//! behind.

use super::source::{CleanedDocument, ImportError};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

const RECORD_SEPARATOR: &str = "\n\n";

/// Output file for an archive: its name without `.bz2` and `.xml`, plus `.txt`
pub fn output_path_for(archive: &Path, output_dir: &Path) -> PathBuf {
    let name = archive
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "corpus".to_string());

    let stem = name.strip_suffix(".bz2").unwrap_or(&name);
    let stem = stem.strip_suffix(".xml").unwrap_or(stem);

    output_dir.join(format!("{}.txt", stem))
}

/// Append-only plaintext corpus file
pub struct CorpusWriter {
    path: PathBuf,
    file: Option<BufWriter<File>>,
    documents_written: usize,
}

impl CorpusWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: None,
            documents_written: 0,
        }
    }

    /// Append a batch and flush it before returning
    pub fn append_batch(&mut self, batch: &[CleanedDocument]) -> Result<(), ImportError> {
        if batch.is_empty() {
            return Ok(());
        }

        let capacity = batch
            .iter()
            .map(|doc| doc.text.len() + RECORD_SEPARATOR.len())
            .sum();
        let mut records = String::with_capacity(capacity);
        for doc in batch {
            records.push_str(&doc.text);
            records.push_str(RECORD_SEPARATOR);
        }

        let file = match self.file.take() {
            Some(file) => file,
            None => Self::open_append(&self.path)?,
        };
        let file = self.file.insert(file);
        file.write_all(records.as_bytes())?;
        file.flush()?;

        self.documents_written += batch.len();
        Ok(())
    }

    /// Flush and close, returning the number of documents written
    pub fn finish(mut self) -> Result<usize, ImportError> {
        if let Some(mut file) = self.file.take() {
            file.flush()?;
        }
        Ok(self.documents_written)
    }

    fn open_append(path: &Path) -> Result<BufWriter<File>, ImportError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(BufWriter::new(file))
    }
}
