//! Archive engine.
//!
//! An [`Archive`] names a ZIP file by path and runs one protocol per call:
//! [`create`](Archive::create), [`list`](Archive::list),
//! [`extract`](Archive::extract), [`remove`](Archive::remove) and
//! [`add`](Archive::add). No file handle is kept between calls.
//!
//! `remove` and `add` never touch the archive in place. They stream every
//! surviving entry into a pending rewrite next to the archive and rename it
//! over the original only after the whole source has been consumed. Any
//! failure before that point drops the pending file and leaves the archive
//! as it was.

use std::collections::HashSet;
use std::fmt;
use std::fs::{self, File};
use std::io::{self, BufWriter, Seek, Write};
use std::path::{Component, Path, PathBuf};

use tempfile::NamedTempFile;

use crate::error::{ArchiveError, Result};
use crate::io::LocalFileReader;
use crate::walk;
use crate::zip::{CompressionMethod, DosDateTime, ZipEntry, ZipReader, ZipWriter, copy_chunks};

/// Metadata of one entry, as reported by [`Archive::list`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryInfo {
    pub name: String,
    pub uncompressed_size: u64,
    pub compressed_size: u64,
    pub method: CompressionMethod,
    pub is_dir: bool,
    /// (year, month, day)
    pub mod_date: (u16, u8, u8),
    /// (hour, minute, second)
    pub mod_time: (u8, u8, u8),
}

impl EntryInfo {
    /// Percentage of space saved by compression, 0 for empty entries
    pub fn ratio(&self) -> u64 {
        if self.uncompressed_size == 0 || self.compressed_size >= self.uncompressed_size {
            return 0;
        }
        100 - (self.compressed_size * 100 / self.uncompressed_size)
    }
}

/// Per-item result of a rewrite that is informational, not a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RewriteOutcome {
    /// The named entry was dropped from the archive
    Removed(String),
    /// The file was appended as a new entry
    Added(PathBuf),
    /// An entry with the file's base name already exists; nothing was written
    AlreadyPresent(PathBuf),
}

impl fmt::Display for RewriteOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RewriteOutcome::Removed(name) => write!(f, "removed: {}", name),
            RewriteOutcome::Added(path) => write!(f, "added: {}", path.display()),
            RewriteOutcome::AlreadyPresent(path) => {
                write!(f, "already in archive: {}", path.display())
            }
        }
    }
}

/// Handle to a ZIP file on disk.
#[derive(Debug, Clone)]
pub struct Archive {
    path: PathBuf,
    method: CompressionMethod,
}

impl Archive {
    /// The path need not exist until [`create`](Self::create) is called.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            method: CompressionMethod::default(),
        }
    }

    /// Compression used for entries written by `create` and `add`.
    pub fn with_method(mut self, method: CompressionMethod) -> Self {
        self.method = method;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create (or overwrite) the archive from a file or a directory tree.
    ///
    /// A directory contributes one entry per regular file, named by its path
    /// relative to the directory. A single file contributes one entry named
    /// by its base name.
    ///
    /// # Errors
    ///
    /// [`ArchiveError::PathNotFound`] if `source` is neither a file nor a
    /// directory, or is the archive itself. This is checked before the
    /// archive path is opened, so an existing archive survives a bad source.
    pub fn create(&self, source: &Path) -> Result<()> {
        let files: Vec<(PathBuf, String)> = if source.is_dir() {
            walk::list_files(source)?
                .into_iter()
                .map(|relative| (source.join(&relative), walk::entry_name(&relative)))
                .filter(|(path, _)| !same_file(path, &self.path))
                .collect()
        } else if source.is_file() && !same_file(source, &self.path) {
            vec![(source.to_path_buf(), base_name(source)?)]
        } else {
            return Err(ArchiveError::PathNotFound {
                path: source.to_path_buf(),
            });
        };

        let parent = parent_dir(&self.path);
        if !parent.exists() {
            fs::create_dir_all(parent)?;
        }

        let file = File::create(&self.path)?;
        let mut writer = ZipWriter::new(BufWriter::new(file));
        for (path, name) in &files {
            self.append_file(&mut writer, path, name)?;
        }
        writer.finish()?.flush()?;

        log::info!(
            "created {} with {} entries",
            self.path.display(),
            files.len()
        );
        Ok(())
    }

    /// Lazily iterate over the entries in physical order.
    ///
    /// Each item is produced only after the entry's data has been decoded
    /// in full, since sizes are not trustworthy before that.
    pub fn entries(&self) -> Result<Entries> {
        self.ensure_archive()?;
        Ok(Entries {
            reader: ZipReader::open(&self.path)?,
        })
    }

    /// Describe every entry, in physical order.
    pub fn list(&self) -> Result<Vec<EntryInfo>> {
        self.entries()?.collect()
    }

    /// Extract every entry under `output_dir`, overwriting existing files.
    ///
    /// # Errors
    ///
    /// [`ArchiveError::UnsafeEntryName`] for an entry whose name would land
    /// outside `output_dir`; entries before it have already been written.
    pub fn extract(&self, output_dir: &Path) -> Result<()> {
        self.ensure_archive()?;
        let mut reader = ZipReader::open(&self.path)?;

        if !output_dir.exists() {
            fs::create_dir_all(output_dir)?;
        }

        let mut count = 0usize;
        while let Some(mut entry) = reader.next_entry()? {
            let target = resolve_entry_path(output_dir, entry.name())?;

            if entry.is_dir() {
                fs::create_dir_all(&target)?;
                copy_chunks(&mut entry, &mut io::sink())?;
                continue;
            }

            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut out = BufWriter::new(File::create(&target)?);
            copy_chunks(&mut entry, &mut out)?;
            out.flush()?;

            log::debug!("extracted {} -> {}", entry.name(), target.display());
            count += 1;
        }

        log::info!(
            "extracted {} files from {} into {}",
            count,
            self.path.display(),
            output_dir.display()
        );
        Ok(())
    }

    /// Drop every entry whose name is in `names`.
    ///
    /// Names are matched literally. Names not in the archive are ignored.
    pub fn remove<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<RewriteOutcome>> {
        let targets: HashSet<&str> = names.iter().map(AsRef::as_ref).collect();

        self.rewrite(|reader, writer| {
            let mut outcomes = Vec::new();
            for entry in reader {
                let entry = entry?;
                if targets.contains(entry.name()) {
                    log::info!("removed {} from {}", entry.name(), self.path.display());
                    outcomes.push(RewriteOutcome::Removed(entry.name().to_string()));
                    continue;
                }
                writer.copy_raw(entry.into_raw())?;
            }
            Ok(outcomes)
        })
    }

    pub fn remove_entry(&self, name: &str) -> Result<Vec<RewriteOutcome>> {
        self.remove(&[name])
    }

    /// Append each file as an entry named by its base name.
    ///
    /// A file whose base name is already taken is skipped and reported as
    /// [`RewriteOutcome::AlreadyPresent`].
    ///
    /// # Errors
    ///
    /// [`ArchiveError::PathNotFound`] if any candidate is not a regular file.
    /// The archive is then left exactly as it was, including the entries
    /// that preceded the bad candidate.
    pub fn add<P: AsRef<Path>>(&self, files: &[P]) -> Result<Vec<RewriteOutcome>> {
        self.rewrite(|reader, writer| {
            let mut present = HashSet::new();
            for entry in reader {
                let entry = entry?;
                present.insert(entry.name().to_string());
                writer.copy_raw(entry.into_raw())?;
            }

            let mut outcomes = Vec::with_capacity(files.len());
            for path in files.iter().map(AsRef::as_ref) {
                if !path.is_file() {
                    return Err(ArchiveError::PathNotFound {
                        path: path.to_path_buf(),
                    });
                }

                let name = base_name(path)?;
                if present.contains(&name) {
                    log::info!("{} is already in {}", name, self.path.display());
                    outcomes.push(RewriteOutcome::AlreadyPresent(path.to_path_buf()));
                    continue;
                }

                self.append_file(writer, path, &name)?;
                log::info!("added {} to {}", path.display(), self.path.display());
                present.insert(name);
                outcomes.push(RewriteOutcome::Added(path.to_path_buf()));
            }
            Ok(outcomes)
        })
    }

    pub fn add_file(&self, path: &Path) -> Result<Vec<RewriteOutcome>> {
        self.add(&[path])
    }

    fn ensure_archive(&self) -> Result<()> {
        if !self.path.is_file() {
            return Err(ArchiveError::NotAZipFile {
                path: self.path.clone(),
            });
        }
        Ok(())
    }

    /// Stream a file into a new entry.
    fn append_file<W: Write + Seek>(
        &self,
        writer: &mut ZipWriter<W>,
        path: &Path,
        name: &str,
    ) -> Result<()> {
        let mut file = File::open(path)?;
        let metadata = file.metadata()?;
        let modified = metadata
            .modified()
            .map(DosDateTime::from_system_time)
            .unwrap_or(DosDateTime::MIN);

        writer.start_entry(name, self.method, modified, metadata.len())?;
        copy_chunks(&mut file, writer)?;
        writer.finish_entry()
    }

    /// Copy-through rewrite shared by `remove` and `add`.
    ///
    /// `body` consumes the source reader, so the source is closed before the
    /// pending file is renamed over it.
    fn rewrite<F>(&self, body: F) -> Result<Vec<RewriteOutcome>>
    where
        F: FnOnce(ZipReader<LocalFileReader>, &mut PendingWriter) -> Result<Vec<RewriteOutcome>>,
    {
        self.ensure_archive()?;
        let reader = ZipReader::open(&self.path)?;
        let mut pending = PendingRewrite::begin(&self.path)?;
        pending.writer.set_comment(reader.comment().to_vec());

        match body(reader, &mut pending.writer) {
            Ok(outcomes) => {
                pending.promote()?;
                Ok(outcomes)
            }
            Err(e) => {
                log::warn!(
                    "abandoning rewrite of {}: {}",
                    self.path.display(),
                    e
                );
                Err(e)
            }
        }
    }
}

/// Lazy, single-pass sequence of entry descriptions.
pub struct Entries {
    reader: ZipReader<LocalFileReader>,
}

impl Iterator for Entries {
    type Item = Result<EntryInfo>;

    fn next(&mut self) -> Option<Self::Item> {
        self.reader.next_entry().transpose().map(|entry| entry.and_then(describe))
    }
}

/// Decode an entry to the end and report what was counted.
fn describe(mut entry: ZipEntry<LocalFileReader>) -> Result<EntryInfo> {
    copy_chunks(&mut entry, &mut io::sink())?;

    let (Some(uncompressed_size), Some(compressed_size)) =
        (entry.uncompressed_size(), entry.compressed_size())
    else {
        return Err(ArchiveError::invalid(format!(
            "{}: entry data ended early",
            entry.name()
        )));
    };

    let header = entry.header();
    Ok(EntryInfo {
        name: header.file_name.clone(),
        uncompressed_size,
        compressed_size,
        method: header.compression_method,
        is_dir: header.is_directory,
        mod_date: header.mod_date(),
        mod_time: header.mod_time(),
    })
}

type PendingWriter = ZipWriter<BufWriter<NamedTempFile>>;

/// Replacement archive being built next to the original.
///
/// Dropping it without [`promote`](Self::promote) deletes the file.
struct PendingRewrite {
    target: PathBuf,
    writer: PendingWriter,
}

impl PendingRewrite {
    fn begin(target: &Path) -> Result<Self> {
        // Same directory as the target so the final rename stays on one volume
        let temp = tempfile::Builder::new()
            .prefix(".rezip-")
            .suffix(".tmp")
            .tempfile_in(parent_dir(target))?;
        log::debug!("pending rewrite at {}", temp.path().display());

        Ok(Self {
            target: target.to_path_buf(),
            writer: ZipWriter::new(BufWriter::new(temp)),
        })
    }

    /// Finalize the replacement and rename it over the target.
    fn promote(self) -> Result<()> {
        let temp = self
            .writer
            .finish()?
            .into_inner()
            .map_err(|e| e.into_error())?;
        temp.as_file().sync_all()?;

        let temp_path = temp.path().to_path_buf();
        temp.persist(&self.target).map_err(|e| e.error)?;

        if temp_path.exists() {
            if let Err(e) = fs::remove_file(&temp_path) {
                log::warn!("failed to remove {}: {}", temp_path.display(), e);
            }
        }

        log::info!("replaced {}", self.target.display());
        Ok(())
    }
}

/// Resolve an entry name below `root`, rejecting names that would escape it.
pub fn resolve_entry_path(root: &Path, name: &str) -> Result<PathBuf> {
    let unsafe_name = || ArchiveError::UnsafeEntryName(name.to_string());

    if name.starts_with('/') || name.starts_with('\\') {
        return Err(unsafe_name());
    }

    let mut resolved = root.to_path_buf();
    let mut depth = 0usize;
    for part in name.split(['/', '\\']) {
        match part {
            "" | "." => {}
            ".." => return Err(unsafe_name()),
            _ => {
                // Each piece must be a single plain component on this platform
                let mut components = Path::new(part).components();
                match (components.next(), components.next()) {
                    (Some(Component::Normal(c)), None) => resolved.push(c),
                    _ => return Err(unsafe_name()),
                }
                depth += 1;
            }
        }
    }

    if depth == 0 {
        return Err(unsafe_name());
    }
    Ok(resolved)
}

fn base_name(path: &Path) -> Result<String> {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| ArchiveError::PathNotFound {
            path: path.to_path_buf(),
        })
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
