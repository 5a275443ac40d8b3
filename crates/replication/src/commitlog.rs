//! Durable commit log.
//!
//! Append-only text file, one accepted write per line:
//!
//! ```text
//! key@#value@#timestamp
//! ```
//!
//! The first field is the key and the last the timestamp, so a value may
//! itself contain the separator. Values may not contain a newline.

use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use corelib::{Key, NodeId};
use parking_lot::Mutex;

/// Field separator token.
pub const SEPARATOR: &str = "@#";

/// One accepted write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub key: Key,
    pub value: String,
    pub timestamp: i64,
}

impl LogEntry {
    pub fn new(key: Key, value: impl Into<String>, timestamp: i64) -> Self {
        Self {
            key,
            value: value.into(),
            timestamp,
        }
    }

    fn encode(&self) -> String {
        format!(
            "{}{sep}{}{sep}{}\n",
            self.key,
            self.value,
            self.timestamp,
            sep = SEPARATOR
        )
    }

    /// Parse one line (without its trailing newline).
    pub fn parse(line: &str) -> Option<Self> {
        let (key, rest) = line.split_once(SEPARATOR)?;
        let (value, timestamp) = rest.rsplit_once(SEPARATOR)?;
        let key = Key::try_from(key.trim().parse::<u32>().ok()?).ok()?;
        let timestamp = timestamp.trim().parse::<i64>().ok()?;
        Some(Self::new(key, value, timestamp))
    }
}

/// Append-only record sink for one node.
#[derive(Debug)]
pub struct CommitLog {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
}

impl CommitLog {
    /// Open (creating if needed) the log at `path` for appending.
    pub fn open(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    /// Log file location for `node` under `data_dir`.
    pub fn path_for(data_dir: impl AsRef<Path>, node: &NodeId) -> PathBuf {
        data_dir.as_ref().join(format!("{}.log", node))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write one record and flush it before returning.
    pub fn append(&self, key: Key, value: &str, timestamp: i64) -> io::Result<()> {
        if value.contains('\n') {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "value contains a newline",
            ));
        }
        let line = LogEntry::new(key, value, timestamp).encode();
        let mut writer = self.writer.lock();
        writer.write_all(line.as_bytes())?;
        writer.flush()
    }

    /// Every record in this node's log, in file order.
    pub fn replay(&self) -> io::Result<Vec<LogEntry>> {
        read_entries(&self.path)
    }

    /// Truncate the log file at `path`, if it exists.
    pub fn reset(path: impl AsRef<Path>) -> io::Result<()> {
        match OpenOptions::new().write(true).truncate(true).open(path.as_ref()) {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

/// Read all well-formed records from `path`. A missing file is an empty log.
pub fn read_entries(path: impl AsRef<Path>) -> io::Result<Vec<LogEntry>> {
    let path = path.as_ref();
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    let mut entries = Vec::new();
    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.is_empty() {
            continue;
        }
        match LogEntry::parse(&line) {
            Some(entry) => entries.push(entry),
            None => tracing::warn!(
                path = %path.display(),
                line = idx + 1,
                "skipping malformed commit log record"
            ),
        }
    }
    Ok(entries)
}
