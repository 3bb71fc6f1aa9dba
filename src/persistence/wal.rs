//! Commit log
//!
//! Append-only file of length-prefixed records, one per committed version.
//! Each record carries its sequence number (the version id) and a checksum
//! of the encoded commit.

use super::record::StoredCommit;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

pub const LOG_FILE_NAME: &str = "commits.log";

/// Commit log errors
#[derive(Error, Debug)]
pub enum LogError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// Index file error
    #[error("Index file error: {0}")]
    Json(#[from] serde_json::Error),

    /// Corruption detected
    #[error("Commit log corruption at offset {offset} (sequence {sequence:?})")]
    Corruption { offset: u64, sequence: Option<u64> },

    /// Invalid log entry
    #[error("Invalid log entry: {0}")]
    InvalidEntry(String),
}

pub type LogResult<T> = Result<T, LogError>;

/// Commit record with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
struct LogRecord {
    /// Sequence number, equal to the version id
    sequence: u64,
    commit: StoredCommit,
    /// First four bytes of the SHA-256 of the encoded commit
    checksum: u32,
}

impl LogRecord {
    fn new(sequence: u64, commit: StoredCommit) -> LogResult<Self> {
        let checksum = checksum(&commit)?;
        Ok(Self {
            sequence,
            commit,
            checksum,
        })
    }

    fn verify_checksum(&self) -> bool {
        matches!(checksum(&self.commit), Ok(c) if c == self.checksum)
    }
}

fn checksum(commit: &StoredCommit) -> LogResult<u32> {
    let bytes = bincode::serialize(commit)?;
    let digest = Sha256::digest(&bytes);
    Ok(u32::from_le_bytes([digest[0], digest[1], digest[2], digest[3]]))
}

/// Append-only commit log
pub struct CommitLog {
    path: PathBuf,
    /// Opened in append mode; each frame goes out in a single write
    file: File,
    /// Byte length of the valid log
    len: u64,
    last_sequence: u64,
    /// fsync after every append
    sync_mode: bool,
}

impl CommitLog {
    /// Open (or create) the log in `dir`
    ///
    /// Walks the record frames once. A torn final record is cut off; nothing
    /// is decoded until `replay`.
    pub fn open(dir: impl AsRef<Path>, sync_mode: bool) -> LogResult<Self> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        let path = dir.join(LOG_FILE_NAME);

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&path)?;
        let file_len = file.metadata()?.len();
        let (valid_len, records) = scan_frames(&path)?;

        if valid_len < file_len {
            warn!(
                "Truncating torn commit log tail at {:?}: {} of {} bytes valid",
                path, valid_len, file_len
            );
            file.set_len(valid_len)?;
            file.sync_all()?;
        }

        info!("Opened commit log at {:?}, {} records", path, records);

        Ok(Self {
            path,
            file,
            len: valid_len,
            last_sequence: records,
            sync_mode,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sequence of the last record (0 for an empty log)
    pub fn last_sequence(&self) -> u64 {
        self.last_sequence
    }

    /// Append a commit, returning the byte offset of its record
    ///
    /// The sequence must follow the last one. On a write failure the file is
    /// cut back to its previous length, so no partial frame survives.
    pub fn append(&mut self, commit: StoredCommit) -> LogResult<u64> {
        let sequence = commit.id;
        if sequence != self.last_sequence + 1 {
            return Err(LogError::InvalidEntry(format!(
                "sequence {} does not follow {}",
                sequence, self.last_sequence
            )));
        }

        let record = LogRecord::new(sequence, commit)?;
        let frame = encode_frame(&record)?;
        let offset = self.len;

        if let Err(e) = self.write_frame(&frame) {
            warn!("Commit log append failed at offset {}: {}", offset, e);
            self.discard_tail(offset)?;
            return Err(e.into());
        }

        self.len = offset + frame.len() as u64;
        self.last_sequence = sequence;
        debug!("Appended commit {} at offset {}", sequence, offset);
        Ok(offset)
    }

    fn write_frame(&mut self, frame: &[u8]) -> io::Result<()> {
        self.file.write_all(frame)?;
        if self.sync_mode {
            self.file.sync_data()?;
        }
        Ok(())
    }

    /// Cut the file back to `offset`, dropping whatever a failed append left
    fn discard_tail(&mut self, offset: u64) -> io::Result<()> {
        self.file.set_len(offset)?;
        self.file.sync_data()
    }

    /// Force the log to disk
    pub fn flush(&mut self) -> LogResult<()> {
        self.file.sync_data()?;
        Ok(())
    }

    /// Replay every record in order
    ///
    /// Checksums and sequence contiguity are verified; the callback receives
    /// the byte offset of each record and the decoded commit.
    pub fn replay<F>(&self, mut callback: F) -> LogResult<u64>
    where
        F: FnMut(u64, StoredCommit) -> LogResult<()>,
    {
        info!("Replaying commit log {:?}", self.path);

        let file = File::open(&self.path)?;
        let mut reader = BufReader::new(file);
        let mut offset = 0u64;
        let mut expected = 1u64;
        let mut buf = Vec::new();

        while offset < self.len {
            let record = read_record(&mut reader, &mut buf, offset)?;
            if record.sequence != expected {
                warn!(
                    "Commit log sequence gap at offset {}: expected {}, found {}",
                    offset, expected, record.sequence
                );
                return Err(LogError::Corruption {
                    offset,
                    sequence: Some(record.sequence),
                });
            }
            let record_len = 4 + buf.len() as u64;
            callback(offset, record.commit)?;
            offset += record_len;
            expected += 1;
        }

        let replayed = expected - 1;
        info!("Replayed {} commits", replayed);
        Ok(replayed)
    }
}

/// Length-prefixed encoding of one record
fn encode_frame(record: &LogRecord) -> LogResult<Vec<u8>> {
    let data = bincode::serialize(record)?;
    let len = u32::try_from(data.len()).map_err(|_| {
        LogError::InvalidEntry(format!("record of {} bytes is too large", data.len()))
    })?;
    let mut frame = Vec::with_capacity(4 + data.len());
    frame.extend_from_slice(&len.to_le_bytes());
    frame.extend_from_slice(&data);
    Ok(frame)
}

/// Decode and verify the record starting at the reader's position
fn read_record<R: Read>(reader: &mut R, buf: &mut Vec<u8>, offset: u64) -> LogResult<LogRecord> {
    let mut len_bytes = [0u8; 4];
    reader.read_exact(&mut len_bytes)?;
    let len = u32::from_le_bytes(len_bytes) as usize;

    buf.resize(len, 0);
    reader.read_exact(buf)?;

    let record: LogRecord = bincode::deserialize(buf).map_err(|e| {
        warn!("Undecodable commit record at offset {}: {}", offset, e);
        LogError::Corruption {
            offset,
            sequence: None,
        }
    })?;

    if !record.verify_checksum() {
        warn!("Commit log checksum mismatch at sequence {}", record.sequence);
        return Err(LogError::Corruption {
            offset,
            sequence: Some(record.sequence),
        });
    }
    Ok(record)
}

/// Walk length prefixes, returning the length of the complete prefix of the
/// file and the number of complete records in it
fn scan_frames(path: &Path) -> LogResult<(u64, u64)> {
    let file = File::open(path)?;
    let file_len = file.metadata()?.len();
    let mut reader = BufReader::new(file);
    let mut offset = 0u64;
    let mut records = 0u64;

    loop {
        let mut len_bytes = [0u8; 4];
        match reader.read_exact(&mut len_bytes) {
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(e.into()),
        }
        let len = u32::from_le_bytes(len_bytes) as u64;
        let end = offset + 4 + len;
        if end > file_len {
            break;
        }
        reader.seek_relative(len as i64)?;
        offset = end;
        records += 1;
    }

    Ok((offset, records))
}
