// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use chrono::{DateTime, FixedOffset};
use log::{debug, info};
use mail_parser::mailbox::mbox::MessageIterator;
use thiserror::Error;

use crate::archive::date::envelope_date;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Archive not found or unreadable at '{path}': {reason}")]
    NotFound { path: PathBuf, reason: String },

    #[error("Archive is corrupt at message {index}: {reason}")]
    Parse { index: usize, reason: String },
}

/// Why the reader refused to hand a record to the uploader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The record sits before the configured resume point.
    BeforeResumePoint,
    /// The record exceeds the configured size limit.
    TooLarge { size: usize, limit: usize },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::BeforeResumePoint => write!(f, "before resume point"),
            SkipReason::TooLarge { size, limit } => {
                write!(f, "{} bytes exceeds limit of {} bytes", size, limit)
            }
        }
    }
}

/// One message as stored in the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveRecord {
    index: usize,
    raw: Vec<u8>,
    envelope_date: Option<DateTime<FixedOffset>>,
    unusable: Option<SkipReason>,
}

impl ArchiveRecord {
    /// Zero-based position in the archive.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Message bytes exactly as stored, headers and body.
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    pub fn envelope_date(&self) -> Option<DateTime<FixedOffset>> {
        self.envelope_date
    }

    /// Set when the record must not be uploaded.
    pub fn unusable(&self) -> Option<&SkipReason> {
        self.unusable.as_ref()
    }
}

/// Limits applied while reading.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReaderOptions {
    /// Number of leading records to mark as skipped.
    pub skip_first: usize,
    /// Records larger than this are marked as skipped.
    pub max_message_bytes: Option<usize>,
}

/// Lazy, forward-only reader over an mbox archive.
///
/// Records are produced one at a time; the archive is never loaded whole.
/// After the first error the reader is exhausted. To start over, open again.
pub struct ArchiveReader<R: BufRead> {
    messages: MessageIterator<R>,
    next_index: usize,
    options: ReaderOptions,
    done: bool,
}

impl ArchiveReader<BufReader<File>> {
    /// Opens the archive at `path`.
    pub fn open(path: impl AsRef<Path>, options: ReaderOptions) -> Result<Self, ArchiveError> {
        let path = path.as_ref();
        let not_found = |reason: String| ArchiveError::NotFound {
            path: path.to_path_buf(),
            reason,
        };

        let metadata = std::fs::metadata(path).map_err(|e| not_found(e.to_string()))?;
        if !metadata.is_file() {
            return Err(not_found("not a regular file".to_string()));
        }
        let file = File::open(path).map_err(|e| not_found(e.to_string()))?;
        info!("Opened archive {} ({} bytes)", path.display(), metadata.len());
        Self::from_reader(BufReader::new(file), options)
    }
}

impl<R: BufRead> ArchiveReader<R> {
    /// Wraps an already-open stream. Fails when the stream holds data that
    /// does not begin with an mbox `From ` separator.
    pub fn from_reader(mut reader: R, options: ReaderOptions) -> Result<Self, ArchiveError> {
        let head = reader.fill_buf().map_err(|e| ArchiveError::Parse {
            index: 0,
            reason: e.to_string(),
        })?;
        if !head.is_empty() && !head.starts_with(b"From ") {
            return Err(ArchiveError::Parse {
                index: 0,
                reason: "archive does not start with a 'From ' separator line".to_string(),
            });
        }

        Ok(Self {
            messages: MessageIterator::new(reader),
            next_index: 0,
            options,
            done: false,
        })
    }

    fn classify(&self, index: usize, size: usize) -> Option<SkipReason> {
        if index < self.options.skip_first {
            return Some(SkipReason::BeforeResumePoint);
        }
        match self.options.max_message_bytes {
            Some(limit) if size > limit => Some(SkipReason::TooLarge { size, limit }),
            _ => None,
        }
    }
}

impl<R: BufRead> Iterator for ArchiveReader<R> {
    type Item = Result<ArchiveRecord, ArchiveError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let index = self.next_index;
        match self.messages.next() {
            None => {
                self.done = true;
                debug!("Archive exhausted after {} records", index);
                None
            }
            Some(Err(err)) => {
                self.done = true;
                Some(Err(ArchiveError::Parse {
                    index,
                    reason: format!("{:?}", err),
                }))
            }
            Some(Ok(message)) => {
                self.next_index += 1;
                let separator_secs = message.internal_date();
                let raw = strip_separator_line(message.unwrap_contents());
                let unusable = self.classify(index, raw.len());
                // Skipped records never reach the server, so their dates are not needed
                let envelope_date = match unusable {
                    Some(_) => None,
                    None => envelope_date(&raw, separator_secs),
                };
                Some(Ok(ArchiveRecord {
                    index,
                    raw,
                    envelope_date,
                    unusable,
                }))
            }
        }
    }
}

// The blank line before the next `From ` separator belongs to the archive, not the message.
fn strip_separator_line(mut raw: Vec<u8>) -> Vec<u8> {
    if raw.ends_with(b"\r\n\r\n") {
        raw.truncate(raw.len() - 2);
    } else if raw.ends_with(b"\n\n") {
        raw.truncate(raw.len() - 1);
    }
    raw
}
