//! # Audit Log
//!
//! Append-only record of every violation and the submission decision.
//! This is the evidence handed to the results screen and to any
//! administrative export, so nothing is ever removed or reordered.
//!
//! ## File Format
//!
//! ```text
//! ┌────────────────────────────────────────────────────┐
//! │ Header (32 bytes)                                  │
//! ├────────────────────────────────────────────────────┤
//! │ Magic (4) │ Version (4) │ Count (4) │ Duration (4) │
//! │ Start ms (8)          │ Reserved (8)               │
//! ├────────────────────────────────────────────────────┤
//! │ Record 0 (16 bytes)                                │
//! ├────────────────────────────────────────────────────┤
//! │ ...                                                │
//! └────────────────────────────────────────────────────┘
//! ```
//!
//! All integers are little-endian.

use crate::channel::ViolationChannel;
use crate::error::{CoreError, CoreResult};
use crate::status::TerminationReason;
use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

/// Magic number for audit log files.
pub const LOG_MAGIC: u32 = 0x5647_494C; // "VGIL"

/// Current audit log format version.
pub const LOG_VERSION: u32 = 1;

const KIND_VIOLATION: u8 = 0;
const KIND_SUBMISSION: u8 = 1;

const CODE_TIME_EXPIRED: u8 = 0;
const CODE_CANDIDATE_REQUESTED: u8 = 1;
const CODE_LIMIT_BASE: u8 = 0x10;

/// What a log entry records.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntryKind {
    /// One violation on a channel.
    Violation(ViolationChannel),
    /// The `Active -> Submitting` transition.
    Submission(TerminationReason),
}

/// One audit record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    /// What happened.
    pub kind: EntryKind,
    /// Wall-clock time (Unix epoch ms), non-decreasing across the log.
    pub timestamp_ms: u64,
    /// Exam seconds left when it happened.
    pub session_time_remaining_seconds: u32,
}

impl LogEntry {
    /// Channel of a violation entry.
    #[must_use]
    pub const fn channel(&self) -> Option<ViolationChannel> {
        match self.kind {
            EntryKind::Violation(channel) => Some(channel),
            EntryKind::Submission(_) => None,
        }
    }

    fn to_record(self) -> LogRecord {
        let (kind, code) = match self.kind {
            EntryKind::Violation(channel) => (KIND_VIOLATION, channel.code()),
            EntryKind::Submission(TerminationReason::TimeExpired) => {
                (KIND_SUBMISSION, CODE_TIME_EXPIRED)
            }
            EntryKind::Submission(TerminationReason::CandidateRequested) => {
                (KIND_SUBMISSION, CODE_CANDIDATE_REQUESTED)
            }
            EntryKind::Submission(TerminationReason::ViolationLimit(channel)) => {
                (KIND_SUBMISSION, CODE_LIMIT_BASE + channel.code())
            }
        };
        LogRecord {
            timestamp_ms: self.timestamp_ms.to_le(),
            remaining_secs: self.session_time_remaining_seconds.to_le(),
            kind,
            code,
            reserved: [0; 2],
        }
    }

    fn from_record(record: &LogRecord, index: u32) -> CoreResult<Self> {
        let corrupt = || CoreError::CorruptRecord { index, kind: record.kind, code: record.code };
        if record.reserved != [0; 2] {
            return Err(corrupt());
        }
        let kind = match (record.kind, record.code) {
            (KIND_VIOLATION, code) => {
                EntryKind::Violation(ViolationChannel::from_code(code).ok_or_else(corrupt)?)
            }
            (KIND_SUBMISSION, CODE_TIME_EXPIRED) => {
                EntryKind::Submission(TerminationReason::TimeExpired)
            }
            (KIND_SUBMISSION, CODE_CANDIDATE_REQUESTED) => {
                EntryKind::Submission(TerminationReason::CandidateRequested)
            }
            (KIND_SUBMISSION, code) if code >= CODE_LIMIT_BASE => {
                let channel =
                    ViolationChannel::from_code(code - CODE_LIMIT_BASE).ok_or_else(corrupt)?;
                EntryKind::Submission(TerminationReason::ViolationLimit(channel))
            }
            _ => return Err(corrupt()),
        };
        Ok(Self {
            kind,
            timestamp_ms: u64::from_le(record.timestamp_ms),
            session_time_remaining_seconds: u32::from_le(record.remaining_secs),
        })
    }
}

/// On-disk record.
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable)]
#[repr(C)]
struct LogRecord {
    timestamp_ms: u64,
    remaining_secs: u32,
    kind: u8,
    code: u8,
    reserved: [u8; 2],
}

/// Audit log file header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LogHeader {
    /// Magic number for file identification.
    pub magic: u32,
    /// Format version.
    pub version: u32,
    /// Number of records that follow.
    pub entry_count: u32,
    /// Configured exam duration.
    pub duration_secs: u32,
    /// Session start (Unix epoch ms).
    pub start_ms: u64,
}

impl LogHeader {
    /// Size of header in bytes.
    pub const SIZE: usize = 32;

    /// Serializes the header to bytes.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        bytes[0..4].copy_from_slice(&self.magic.to_le_bytes());
        bytes[4..8].copy_from_slice(&self.version.to_le_bytes());
        bytes[8..12].copy_from_slice(&self.entry_count.to_le_bytes());
        bytes[12..16].copy_from_slice(&self.duration_secs.to_le_bytes());
        bytes[16..24].copy_from_slice(&self.start_ms.to_le_bytes());
        bytes
    }

    /// Deserializes a header from bytes.
    #[must_use]
    pub fn from_bytes(bytes: &[u8; Self::SIZE]) -> Self {
        Self {
            magic: u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            version: u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
            entry_count: u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]),
            duration_secs: u32::from_le_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]),
            start_ms: u64::from_le_bytes([
                bytes[16], bytes[17], bytes[18], bytes[19],
                bytes[20], bytes[21], bytes[22], bytes[23],
            ]),
        }
    }

    fn validate(&self) -> CoreResult<()> {
        if self.magic != LOG_MAGIC {
            return Err(CoreError::BadMagic(self.magic));
        }
        if self.version > LOG_VERSION {
            return Err(CoreError::UnsupportedVersion(self.version));
        }
        Ok(())
    }
}

/// Append-only, timestamp-ordered audit log.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EventLog {
    duration_secs: u32,
    start_ms: u64,
    entries: Vec<LogEntry>,
}

impl EventLog {
    /// Creates an empty log for a session.
    #[must_use]
    pub fn new(duration_secs: u32, start_ms: u64) -> Self {
        Self {
            duration_secs,
            start_ms,
            entries: Vec::with_capacity(64),
        }
    }

    /// Appends an entry. A timestamp older than the last entry is raised
    /// to it so the log stays ordered under out-of-order delivery.
    pub fn append(&mut self, kind: EntryKind, at_ms: u64, remaining_secs: u32) -> LogEntry {
        let timestamp_ms = self.entries.last().map_or(at_ms, |last| at_ms.max(last.timestamp_ms));
        let entry = LogEntry {
            kind,
            timestamp_ms,
            session_time_remaining_seconds: remaining_secs,
        };
        self.entries.push(entry);
        entry
    }

    /// All entries in append order.
    #[must_use]
    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing was logged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Configured exam duration.
    #[must_use]
    pub const fn duration_secs(&self) -> u32 {
        self.duration_secs
    }

    /// Session start (Unix epoch ms).
    #[must_use]
    pub const fn start_ms(&self) -> u64 {
        self.start_ms
    }

    /// Header describing this log.
    #[must_use]
    pub fn header(&self) -> LogHeader {
        LogHeader {
            magic: LOG_MAGIC,
            version: LOG_VERSION,
            entry_count: u32::try_from(self.entries.len()).unwrap_or(u32::MAX),
            duration_secs: self.duration_secs,
            start_ms: self.start_ms,
        }
    }

    /// Writes the log to a writer.
    pub fn write<W: Write>(&self, writer: &mut W) -> CoreResult<()> {
        writer.write_all(&self.header().to_bytes())?;

        let mut buffer = Vec::with_capacity(self.entries.len() * std::mem::size_of::<LogRecord>());
        for entry in &self.entries {
            buffer.extend_from_slice(bytemuck::bytes_of(&entry.to_record()));
        }
        writer.write_all(&buffer)?;
        Ok(())
    }

    /// Loads a log from a reader.
    pub fn read<R: Read>(reader: &mut R) -> CoreResult<Self> {
        let mut header_bytes = [0u8; LogHeader::SIZE];
        reader.read_exact(&mut header_bytes)?;
        let header = LogHeader::from_bytes(&header_bytes);
        header.validate()?;

        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;

        let record_size = std::mem::size_of::<LogRecord>();
        let found = u32::try_from(data.len() / record_size).unwrap_or(u32::MAX);
        if found < header.entry_count {
            return Err(CoreError::Truncated { expected: header.entry_count, found });
        }

        let mut entries = Vec::with_capacity(header.entry_count as usize);
        for (index, chunk) in (0..header.entry_count).zip(data.chunks_exact(record_size)) {
            let record: LogRecord = bytemuck::pod_read_unaligned(chunk);
            entries.push(LogEntry::from_record(&record, index)?);
        }

        Ok(Self {
            duration_secs: header.duration_secs,
            start_ms: header.start_ms,
            entries,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_log() -> EventLog {
        let mut log = EventLog::new(600, 1_700_000_000_000);
        log.append(EntryKind::Violation(ViolationChannel::TabSwitch), 1_000, 599);
        log.append(EntryKind::Violation(ViolationChannel::FaceAbsent), 2_000, 598);
        log.append(
            EntryKind::Submission(TerminationReason::ViolationLimit(ViolationChannel::TabSwitch)),
            2_500,
            598,
        );
        log
    }

    #[test]
    fn test_timestamps_never_go_backwards() {
        let mut log = EventLog::new(60, 0);
        log.append(EntryKind::Violation(ViolationChannel::TabSwitch), 5_000, 55);
        let late = log.append(EntryKind::Violation(ViolationChannel::FaceAbsent), 4_000, 56);

        assert_eq!(late.timestamp_ms, 5_000);
        assert!(log.entries().windows(2).all(|w| w[0].timestamp_ms <= w[1].timestamp_ms));
    }

    #[test]
    fn test_write_and_read() {
        let log = sample_log();
        let mut buffer = Vec::new();
        log.write(&mut buffer).unwrap();
        assert_eq!(buffer.len(), LogHeader::SIZE + 3 * 16);

        let loaded = EventLog::read(&mut std::io::Cursor::new(buffer)).unwrap();
        assert_eq!(loaded, log);
        assert_eq!(loaded.header().entry_count, 3);
    }

    #[test]
    fn test_bad_magic_rejected() {
        let mut buffer = Vec::new();
        sample_log().write(&mut buffer).unwrap();
        buffer[0] = 0;

        let err = EventLog::read(&mut std::io::Cursor::new(buffer)).unwrap_err();
        assert!(matches!(err, CoreError::BadMagic(_)));
    }

    #[test]
    fn test_truncated_log_rejected() {
        let mut buffer = Vec::new();
        sample_log().write(&mut buffer).unwrap();
        buffer.truncate(buffer.len() - 8);

        let err = EventLog::read(&mut std::io::Cursor::new(buffer)).unwrap_err();
        assert!(matches!(err, CoreError::Truncated { expected: 3, found: 2 }));
    }

    #[test]
    fn test_corrupt_channel_rejected() {
        let mut buffer = Vec::new();
        sample_log().write(&mut buffer).unwrap();
        // code byte of the first record
        buffer[LogHeader::SIZE + 13] = 42;

        let err = EventLog::read(&mut std::io::Cursor::new(buffer)).unwrap_err();
        assert!(matches!(err, CoreError::CorruptRecord { index: 0, code: 42, .. }));
    }
}
