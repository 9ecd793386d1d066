// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Library core for mbox2imap: upload the messages of a local mbox archive
//! into one folder on an IMAP server.

// --- Modules ---
pub mod archive;
pub mod config;
pub mod error;
pub mod imap;
pub mod migrate;
pub mod report;
pub mod session_manager;
pub mod upload;

#[cfg(test)]
mod test_helpers;

// Re-export key types for convenience
pub mod prelude {
    // Config
    pub use crate::config::{Settings, SettingsError, SettingsOverrides};

    // Archive
    pub use crate::archive::{ArchiveError, ArchiveReader, ArchiveRecord, ReaderOptions, SkipReason};

    // IMAP
    pub use crate::imap::{
        AsyncImapConnector, ConnectOptions, Encryption, ImapConnection, ImapConnector, ImapError,
        ImapSession, SessionState,
    };
    pub use crate::session_manager::{MigrationSession, SessionError};

    // Run
    pub use crate::error::MigrateError;
    pub use crate::migrate::{run_migration, RunReport, RunStatus};
    pub use crate::report::{LogReporter, RunCounts, RunReporter, RunSummary};
    pub use crate::upload::{UploadEngine, UploadOptions, UploadOutcome};

    // Common Libs
    pub use log::{debug, error, info, trace, warn};
}
