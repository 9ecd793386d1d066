// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! One full run: open the archive, bring the session up, upload, and always
//! release the connection and produce a summary, whatever happened.

use log::{error, info};
use tokio::time::Instant;

use crate::archive::ArchiveReader;
use crate::config::Settings;
use crate::error::MigrateError;
use crate::imap::ImapConnector;
use crate::report::{RunCounts, RunReporter, RunSummary};
use crate::session_manager::MigrationSession;
use crate::upload::UploadEngine;

/// How a run ended.
#[derive(Debug)]
pub enum RunStatus {
    /// Every record was uploaded or skipped.
    Success,
    /// The run completed but some records were rejected.
    PartialFailure,
    /// The run stopped early.
    FatalAbort(MigrateError),
}

impl RunStatus {
    /// Process exit code for this status.
    pub fn exit_code(&self) -> i32 {
        match self {
            RunStatus::Success => 0,
            RunStatus::FatalAbort(_) => 1,
            RunStatus::PartialFailure => 2,
        }
    }
}

#[derive(Debug)]
pub struct RunReport {
    pub summary: RunSummary,
    pub status: RunStatus,
}

/// Runs one migration described by `settings` over a connection from `connector`.
///
/// Never returns early without a summary: `reporter.finalize` is called exactly
/// once, and the session is closed on every path.
pub async fn run_migration<C, R>(settings: &Settings, connector: C, reporter: &mut R) -> RunReport
where
    C: ImapConnector,
    R: RunReporter + ?Sized,
{
    let started = Instant::now();
    let mut session = MigrationSession::new(connector);

    let (counts, abort) = drive(settings, &mut session, reporter).await;
    session.close().await;

    let summary = reporter.finalize(counts, started.elapsed());
    let status = match abort {
        Some(e) => {
            error!("Run aborted: {}", e);
            RunStatus::FatalAbort(e)
        }
        None if summary.failed > 0 => RunStatus::PartialFailure,
        None => RunStatus::Success,
    };
    RunReport { summary, status }
}

async fn drive<C, R>(
    settings: &Settings,
    session: &mut MigrationSession<C>,
    reporter: &mut R,
) -> (RunCounts, Option<MigrateError>)
where
    C: ImapConnector,
    R: RunReporter + ?Sized,
{
    // Archive first, so a bad path fails before any network traffic
    let records = match ArchiveReader::open(&settings.archive_path, settings.reader_options()) {
        Ok(records) => records,
        Err(e) => return (RunCounts::default(), Some(e.into())),
    };

    if let Err(e) = prepare(settings, session).await {
        return (RunCounts::default(), Some(e));
    }

    info!("Starting upload into '{}'...", settings.target_folder);
    let run = UploadEngine::new(settings.upload_options())
        .run(session, records, reporter)
        .await;
    (run.counts, run.abort)
}

async fn prepare<C: ImapConnector>(
    settings: &Settings,
    session: &mut MigrationSession<C>,
) -> Result<(), MigrateError> {
    let options = settings.connect_options();
    info!(
        "Connecting to {}:{} ({})...",
        options.host, options.port, options.encryption
    );
    session.connect(&options).await?;
    info!("Connected to IMAP server {}.", options.host);

    session
        .authenticate(&settings.imap_user, &settings.imap_pass)
        .await?;
    info!("Login successful as {}.", settings.imap_user);

    session.ensure_folder(&settings.target_folder).await?;
    Ok(())
}
