//! Archive reader
//!
//! Opens a dump file and exposes its decompressed contents as a forward-only
//! buffered byte stream. bzip2 dumps are decoded stream by stream, so the
//! decompressed size is never needed upfront and multistream dumps (several
//! concatenated bzip2 streams) are read to the end.

use super::source::{DumpFormat, ImportError};
use bzip2::read::MultiBzDecoder;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;

const READ_BUFFER_SIZE: usize = 1024 * 1024;

/// Decompressed view over a dump file
pub enum ArchiveReader {
    /// Bzip2 compressed
    Bzip2(BufReader<MultiBzDecoder<File>>),
    /// Uncompressed XML
    Plain(BufReader<File>),
}

impl ArchiveReader {
    /// Open a dump, picking the decoder from the file name
    pub fn open(path: &Path) -> Result<Self, ImportError> {
        let format = DumpFormat::detect(path).ok_or_else(|| {
            ImportError::InvalidFormat(format!(
                "{} is neither .bz2 nor .xml",
                path.display()
            ))
        })?;
        Self::open_as(path, format)
    }

    /// Open a dump with an explicit format
    pub fn open_as(path: &Path, format: DumpFormat) -> Result<Self, ImportError> {
        let file = File::open(path)?;

        Ok(match format {
            DumpFormat::Bzip2Xml => ArchiveReader::Bzip2(BufReader::with_capacity(
                READ_BUFFER_SIZE,
                MultiBzDecoder::new(file),
            )),
            DumpFormat::PlainXml => {
                ArchiveReader::Plain(BufReader::with_capacity(READ_BUFFER_SIZE, file))
            }
        })
    }

    pub fn format(&self) -> DumpFormat {
        match self {
            ArchiveReader::Bzip2(_) => DumpFormat::Bzip2Xml,
            ArchiveReader::Plain(_) => DumpFormat::PlainXml,
        }
    }
}

impl Read for ArchiveReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            ArchiveReader::Bzip2(reader) => reader.read(buf),
            ArchiveReader::Plain(reader) => reader.read(buf),
        }
    }
}

impl BufRead for ArchiveReader {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        match self {
            ArchiveReader::Bzip2(reader) => reader.fill_buf(),
            ArchiveReader::Plain(reader) => reader.fill_buf(),
        }
    }

    fn consume(&mut self, amt: usize) {
        match self {
            ArchiveReader::Bzip2(reader) => reader.consume(amt),
            ArchiveReader::Plain(reader) => reader.consume(amt),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bzip2::write::BzEncoder;
    use bzip2::Compression;
    use std::io::Write;

    fn write_bz2(path: &Path, chunks: &[&str]) {
        // One bzip2 stream per chunk, like multistream dumps
        let mut file = File::create(path).unwrap();
        for chunk in chunks {
            let mut encoder = BzEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(chunk.as_bytes()).unwrap();
            file.write_all(&encoder.finish().unwrap()).unwrap();
        }
    }

    #[test]
    fn test_reads_multistream_bzip2() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dump.xml.bz2");
        write_bz2(&path, &["<mediawiki>", "<page/>", "</mediawiki>"]);

        let mut reader = ArchiveReader::open(&path).unwrap();
        assert_eq!(reader.format(), DumpFormat::Bzip2Xml);

        let mut out = String::new();
        reader.read_to_string(&mut out).unwrap();
        assert_eq!(out, "<mediawiki><page/></mediawiki>");
    }

    #[test]
    fn test_corrupt_bzip2_fails_with_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.xml.bz2");
        std::fs::write(&path, b"this is not a bzip2 stream at all").unwrap();

        let mut reader = ArchiveReader::open(&path).unwrap();
        let mut out = Vec::new();
        assert!(reader.read_to_end(&mut out).is_err());
    }

    #[test]
    fn test_unknown_extension_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dump.zip");
        std::fs::write(&path, b"").unwrap();

        assert!(matches!(
            ArchiveReader::open(&path),
            Err(ImportError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = ArchiveReader::open(Path::new("/nonexistent/dump.xml.bz2"));
        assert!(matches!(result, Err(ImportError::Io(_))));
    }
}
