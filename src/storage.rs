//! Capture files on disk.
//!
//! A [`CaptureStore`] owns one directory of JSON capture files, each a
//! pretty-printed array of [`PacketRecord`]s. Records round-trip field for
//! field.
//!
//! The plain methods (`save_capture`, `load_capture`, `delete_capture`)
//! report success as `bool`/`Option` and log the reason on failure. The
//! `try_*` variants return the error instead.

use crate::analysis::types::PacketRecord;
use crate::error::{PktlensError, Result};
use crate::logger::{Event, SharedLogger};
use chrono::{DateTime, Local};
use serde::Serialize;
use std::fs;
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};

const CAPTURE_EXTENSION: &str = "json";

/// Listing entry for one capture file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaptureInfo {
    pub filename: String,
    pub size_bytes: u64,
    /// `None` when the file exists but does not parse.
    pub packet_count: Option<usize>,
    /// Last modification time, RFC 3339, local time zone.
    pub modified: Option<String>,
}

/// Directory-scoped store of capture files.
pub struct CaptureStore {
    dir: PathBuf,
    logger: SharedLogger,
}

impl CaptureStore {
    /// Opens (and creates if needed) the storage directory.
    pub fn new(dir: impl Into<PathBuf>, logger: SharedLogger) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir, logger })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Writes `packets` to `filename`, replacing any existing file.
    pub fn try_save(&self, packets: &[PacketRecord], filename: &str) -> Result<PathBuf> {
        if packets.is_empty() {
            return Err(PktlensError::EmptyCapture);
        }
        let path = self.resolve(filename)?;
        let writer = BufWriter::new(fs::File::create(&path)?);
        serde_json::to_writer_pretty(writer, packets)?;
        Ok(path)
    }

    /// Saves a capture, returning `false` (and logging why) on failure.
    pub fn save_capture(&self, packets: &[PacketRecord], filename: &str) -> bool {
        match self.try_save(packets, filename) {
            Ok(path) => {
                self.logger.log(&Event::CaptureSaved {
                    file: &path.display().to_string(),
                    packets: packets.len(),
                });
                true
            }
            Err(e) => {
                self.log_failure("save", filename, &e);
                false
            }
        }
    }

    /// Reads every record from `filename`.
    pub fn try_load(&self, filename: &str) -> Result<Vec<PacketRecord>> {
        let path = self.resolve(filename)?;
        let file = fs::File::open(&path).map_err(|e| not_found_or(e, filename))?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }

    /// Loads a capture, returning `None` (and logging why) on failure.
    pub fn load_capture(&self, filename: &str) -> Option<Vec<PacketRecord>> {
        match self.try_load(filename) {
            Ok(packets) => {
                self.logger.log(&Event::CaptureLoaded { file: filename, packets: packets.len() });
                Some(packets)
            }
            Err(e) => {
                self.log_failure("load", filename, &e);
                None
            }
        }
    }

    /// Removes `filename` from the store.
    pub fn try_delete(&self, filename: &str) -> Result<()> {
        let path = self.resolve(filename)?;
        fs::remove_file(&path).map_err(|e| not_found_or(e, filename))
    }

    /// Deletes a capture, returning `false` (and logging why) on failure.
    pub fn delete_capture(&self, filename: &str) -> bool {
        match self.try_delete(filename) {
            Ok(()) => {
                self.logger.log(&Event::CaptureDeleted { file: filename });
                true
            }
            Err(e) => {
                self.log_failure("delete", filename, &e);
                false
            }
        }
    }

    /// Capture files in the store, sorted by name.
    ///
    /// An unreadable directory is logged and reported as empty.
    pub fn list_captures(&self) -> Vec<CaptureInfo> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) => {
                self.log_failure("list", &self.dir.display().to_string(), &e.into());
                return Vec::new();
            }
        };

        let mut captures: Vec<CaptureInfo> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.is_file()
                    && path.extension().and_then(|e| e.to_str()) == Some(CAPTURE_EXTENSION)
            })
            .filter_map(|path| self.describe(&path))
            .collect();

        captures.sort_by(|a, b| a.filename.cmp(&b.filename));
        captures
    }

    fn describe(&self, path: &Path) -> Option<CaptureInfo> {
        let filename = path.file_name()?.to_str()?.to_string();
        let meta = fs::metadata(path).ok()?;
        let modified = meta
            .modified()
            .ok()
            .map(|t| DateTime::<Local>::from(t).to_rfc3339());
        let packet_count = fs::File::open(path)
            .ok()
            .and_then(|f| serde_json::from_reader::<_, Vec<PacketRecord>>(BufReader::new(f)).ok())
            .map(|packets| packets.len());

        Some(CaptureInfo {
            filename,
            size_bytes: meta.len(),
            packet_count,
            modified,
        })
    }

    /// Maps a bare capture name to a path inside the store.
    fn resolve(&self, filename: &str) -> Result<PathBuf> {
        let name = filename.trim();
        if name.is_empty()
            || name.contains('/')
            || name.contains('\\')
            || name.starts_with('.')
        {
            return Err(PktlensError::InvalidFileName(filename.to_string()));
        }

        let mut path = self.dir.join(name);
        if path.extension().and_then(|e| e.to_str()) != Some(CAPTURE_EXTENSION) {
            path = self.dir.join(format!("{}.{}", name, CAPTURE_EXTENSION));
        }
        Ok(path)
    }

    fn log_failure(&self, operation: &str, file: &str, err: &PktlensError) {
        self.logger.log(&Event::StorageFailure {
            operation,
            file,
            reason: &err.to_string(),
        });
    }
}

fn not_found_or(err: io::Error, filename: &str) -> PktlensError {
    if err.kind() == io::ErrorKind::NotFound {
        PktlensError::NotFound(filename.to_string())
    } else {
        err.into()
    }
}
