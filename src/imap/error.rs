// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use thiserror::Error;

/// Errors raised by the IMAP protocol layer.
///
/// Variants fall in two classes, see [`ImapError::is_fatal`]: failures of the
/// transport itself, after which the connection cannot be trusted, and tagged
/// `NO`/`BAD` replies, which only concern the command that produced them.
#[derive(Debug, Error, Clone)]
pub enum ImapError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("TLS error: {0}")]
    Tls(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Operation timed out: {0}")]
    Timeout(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Operation error: {0}")]
    Operation(String),

    #[error("Bad response: {0}")]
    BadResponse(String),

    #[error("Command error: {0}")]
    Command(String),

    #[error("Append rejected: {0}")]
    Append(String),
}

impl ImapError {
    /// True when the error leaves the connection unusable.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ImapError::Connection(_)
                | ImapError::Tls(_)
                | ImapError::Auth(_)
                | ImapError::Timeout(_)
                | ImapError::Parse(_)
        )
    }

    /// True when a CREATE failed only because the mailbox is already there.
    ///
    /// Servers phrase this differently; RFC 5530 servers send `[ALREADYEXISTS]`,
    /// older ones put "exists" somewhere in the human-readable text.
    pub fn is_already_exists(&self) -> bool {
        match self {
            ImapError::Operation(msg) | ImapError::BadResponse(msg) => {
                let msg = msg.to_ascii_lowercase();
                msg.contains("alreadyexists") || msg.contains("exists")
            }
            _ => false,
        }
    }
}

impl From<async_imap::error::Error> for ImapError {
    fn from(err: async_imap::error::Error) -> Self {
        match err {
            async_imap::error::Error::Parse(e) => ImapError::Parse(e.to_string()),
            async_imap::error::Error::No(msg) => ImapError::Operation(msg),
            async_imap::error::Error::Bad(msg) => ImapError::BadResponse(msg),
            async_imap::error::Error::Io(e) => ImapError::Connection(e.to_string()),
            async_imap::error::Error::Validate(e) => ImapError::Command(e.to_string()),
            async_imap::error::Error::Append => {
                ImapError::Append("server did not accept the message literal".to_string())
            }
            // ConnectionLost and anything newer means the stream is gone
            other => ImapError::Connection(other.to_string()),
        }
    }
}

impl From<std::io::Error> for ImapError {
    fn from(err: std::io::Error) -> Self {
        ImapError::Connection(err.to_string())
    }
}

impl From<tokio::time::error::Elapsed> for ImapError {
    fn from(err: tokio::time::error::Elapsed) -> Self {
        ImapError::Timeout(err.to_string())
    }
}
