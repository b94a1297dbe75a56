//! Archive codec: directory tree to gzip-compressed tar and back.
//!
//! Entry paths are relative to the archived directory and the directory itself
//! is not an entry, so an archive unpacks cleanly into any destination.
//! Archives are written to a temporary file owned by an [`ArchiveHandle`];
//! dropping the handle deletes the file, whichever way the caller exits.

use crate::error::ArchiveError;
use crate::outcome::ArchiveSummary;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tar::{Archive, Builder as TarBuilder};
use tempfile::NamedTempFile;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Default compression level (6 = balanced speed/ratio).
pub const DEFAULT_COMPRESSION_LEVEL: u32 = 6;

const TEMP_PREFIX: &str = "davsnap-";

/// A finished archive on local disk
///
/// The backing file lives until the handle is dropped.
#[derive(Debug)]
pub struct ArchiveHandle {
    file: NamedTempFile,
    summary: ArchiveSummary,
}

impl ArchiveHandle {
    /// Path of the archive file
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn size_bytes(&self) -> u64 {
        self.summary.size_bytes
    }

    pub fn entry_count(&self) -> usize {
        self.summary.entry_count
    }

    pub fn summary(&self) -> &ArchiveSummary {
        &self.summary
    }
}

/// Creates and extracts snapshot archives
#[derive(Debug, Clone)]
pub struct ArchiveCodec {
    compression_level: u32,
    temp_dir: Option<PathBuf>,
}

impl Default for ArchiveCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl ArchiveCodec {
    pub fn new() -> Self {
        Self {
            compression_level: DEFAULT_COMPRESSION_LEVEL,
            temp_dir: None,
        }
    }

    /// Sets the compression level.
    pub fn with_compression_level(mut self, level: u32) -> Self {
        self.compression_level = level.clamp(1, 9);
        self
    }

    /// Places temporary archives in `dir` instead of the system temp directory.
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    /// Allocates an empty temporary file for an archive.
    pub fn temp_file(&self) -> io::Result<NamedTempFile> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(TEMP_PREFIX).suffix(".tar.gz");
        match &self.temp_dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        }
    }

    /// Packs every entry below `source_dir` into a temporary `.tar.gz`.
    pub fn create(&self, source_dir: &Path) -> Result<ArchiveHandle, ArchiveError> {
        let creation = |source: io::Error| ArchiveError::creation(source_dir, source);

        let metadata = fs::metadata(source_dir).map_err(creation)?;
        if !metadata.is_dir() {
            return Err(creation(io::Error::new(
                io::ErrorKind::InvalidInput,
                "not a directory",
            )));
        }

        let temp = self.temp_file().map_err(creation)?;
        let file = temp.reopen().map_err(creation)?;

        let writer = ChecksumWriter::new(BufWriter::new(file));
        let encoder = GzEncoder::new(writer, Compression::new(self.compression_level));
        let mut tar = TarBuilder::new(encoder);
        tar.follow_symlinks(false);

        let mut entry_count = 0;
        for entry in WalkDir::new(source_dir)
            .min_depth(1)
            .follow_links(false)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| creation(e.into()))?;
            let rel_path = entry
                .path()
                .strip_prefix(source_dir)
                .map_err(|e| creation(io::Error::other(e)))?;

            let file_type = entry.file_type();
            if file_type.is_dir() {
                tar.append_dir(rel_path, entry.path()).map_err(creation)?;
            } else if file_type.is_file() || file_type.is_symlink() {
                tar.append_path_with_name(entry.path(), rel_path)
                    .map_err(creation)?;
            } else {
                debug!("Skipping special file: {}", rel_path.display());
                continue;
            }
            entry_count += 1;
        }

        let encoder = tar.into_inner().map_err(creation)?;
        let writer = encoder.finish().map_err(creation)?;
        let (checksum, size_bytes) = writer.finish().map_err(creation)?;

        debug!(
            "Archived {} entries from {} into {} ({} bytes)",
            entry_count,
            source_dir.display(),
            temp.path().display(),
            size_bytes
        );

        Ok(ArchiveHandle {
            file: temp,
            summary: ArchiveSummary {
                size_bytes,
                entry_count,
                sha256: checksum,
            },
        })
    }

    /// Materialises every entry of `archive_path` below `dest_dir`.
    ///
    /// Returns the number of entries written. Entries whose path would leave
    /// `dest_dir` are skipped. Directories are unpacked last, deepest first,
    /// so a read-only directory gets its mode only after its children exist.
    pub fn extract(&self, archive_path: &Path, dest_dir: &Path) -> Result<usize, ArchiveError> {
        let file = File::open(archive_path).map_err(|e| ArchiveError::extract(dest_dir, e))?;
        fs::create_dir_all(dest_dir).map_err(|e| ArchiveError::extract(dest_dir, e))?;

        let mut archive = Archive::new(GzDecoder::new(BufReader::new(file)));
        archive.set_preserve_permissions(true);
        archive.set_overwrite(true);

        let mut count = 0;
        let mut directories = Vec::new();
        for entry in archive.entries().map_err(ArchiveError::corrupt)? {
            let mut entry = entry.map_err(ArchiveError::corrupt)?;
            if entry.header().entry_type().is_dir() {
                directories.push(entry);
                continue;
            }
            if unpack_entry(&mut entry, dest_dir)? {
                count += 1;
            }
        }

        directories.sort_by(|a, b| b.path_bytes().cmp(&a.path_bytes()));
        for mut dir in directories {
            if unpack_entry(&mut dir, dest_dir)? {
                count += 1;
            }
        }

        Ok(count)
    }
}

fn unpack_entry<R: io::Read>(
    entry: &mut tar::Entry<'_, R>,
    dest_dir: &Path,
) -> Result<bool, ArchiveError> {
    let unpacked = entry
        .unpack_in(dest_dir)
        .map_err(|e| classify_unpack_error(e, dest_dir))?;
    if !unpacked {
        warn!(
            "Skipped archive entry outside destination: {}",
            String::from_utf8_lossy(&entry.path_bytes())
        );
    }
    Ok(unpacked)
}

/// Unpack errors caused by bad input are corruption, everything else is the
/// destination filesystem refusing a write.
fn classify_unpack_error(err: io::Error, dest_dir: &Path) -> ArchiveError {
    match err.kind() {
        io::ErrorKind::InvalidData | io::ErrorKind::InvalidInput | io::ErrorKind::UnexpectedEof => {
            ArchiveError::corrupt(err)
        }
        _ => ArchiveError::extract(dest_dir, err),
    }
}

/// Writer that calculates SHA256 checksum while writing.
struct ChecksumWriter<W: Write> {
    writer: W,
    hasher: Sha256,
    bytes_written: u64,
}

impl<W: Write> ChecksumWriter<W> {
    fn new(writer: W) -> Self {
        Self {
            writer,
            hasher: Sha256::new(),
            bytes_written: 0,
        }
    }

    /// Flushes and returns the hex digest and byte count.
    fn finish(mut self) -> io::Result<(String, u64)> {
        self.writer.flush()?;
        Ok((format!("{:x}", self.hasher.finalize()), self.bytes_written))
    }
}

impl<W: Write> Write for ChecksumWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.writer.write(buf)?;
        self.hasher.update(&buf[..n]);
        self.bytes_written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}
