// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use thiserror::Error;

use crate::archive::ArchiveError;
use crate::config::SettingsError;
use crate::imap::ImapError;
use crate::session_manager::SessionError;

/// Errors that end a run early. Per-message rejections never become one of these.
#[derive(Debug, Error)]
pub enum MigrateError {
    #[error("Configuration error: {0}")]
    Config(#[from] SettingsError),

    #[error("Archive error: {0}")]
    Archive(#[from] ArchiveError),

    #[error("IMAP connection error: {0}")]
    Connection(ImapError),

    #[error("IMAP authentication error: {0}")]
    Auth(ImapError),

    #[error("Error creating/selecting folder '{folder}': {source}")]
    Folder { folder: String, source: ImapError },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<SessionError> for MigrateError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Connection(e) => MigrateError::Connection(e),
            SessionError::Auth(e) => MigrateError::Auth(e),
            SessionError::Folder { folder, source } => MigrateError::Folder { folder, source },
            // Upload errors are folded into outcomes before they could get here
            other @ (SessionError::Upload(_) | SessionError::InvalidState { .. }) => {
                MigrateError::Internal(other.to_string())
            }
        }
    }
}
