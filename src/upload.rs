// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::time::Duration;

use log::{debug, error};
use tokio::time::sleep;

use crate::archive::{ArchiveError, ArchiveRecord, SkipReason};
use crate::error::MigrateError;
use crate::imap::ImapConnector;
use crate::report::{RunCounts, RunReporter};
use crate::session_manager::MigrationSession;

/// What happened to one archive record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    Uploaded,
    Skipped(SkipReason),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOptions {
    /// Pause after each attempted append, except the last.
    pub delay: Duration,
    /// Emit progress every this many records. Zero disables progress.
    pub progress_interval: usize,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(100),
            progress_interval: 50,
        }
    }
}

/// Counts gathered by the engine, and the fatal error that stopped it, if any.
#[derive(Debug)]
pub struct EngineRun {
    pub counts: RunCounts,
    pub abort: Option<MigrateError>,
}

/// Pulls records one at a time and appends each to the session's folder.
pub struct UploadEngine {
    options: UploadOptions,
}

impl UploadEngine {
    pub fn new(options: UploadOptions) -> Self {
        Self { options }
    }

    /// Uploads every record in archive order.
    ///
    /// A rejected message is counted as failed and the loop moves on. A lost
    /// connection or an unreadable archive stops the loop; the counts returned
    /// still cover every record seen up to that point.
    pub async fn run<C, I, R>(
        &self,
        session: &mut MigrationSession<C>,
        records: I,
        reporter: &mut R,
    ) -> EngineRun
    where
        C: ImapConnector,
        I: IntoIterator<Item = Result<ArchiveRecord, ArchiveError>>,
        R: RunReporter + ?Sized,
    {
        let mut counts = RunCounts::default();
        let mut records = records.into_iter().peekable();

        while let Some(next) = records.next() {
            let record = match next {
                Ok(record) => record,
                Err(e) => {
                    error!("Stopping: {}", e);
                    return self.finish(counts, reporter, Some(e.into()));
                }
            };

            let (outcome, abort) = self.process(session, &record).await;
            reporter.on_record(record.index(), &outcome);
            counts.record(&outcome);

            if self.options.progress_interval > 0 && counts.seen % self.options.progress_interval == 0 {
                reporter.on_progress(&counts);
            }
            if abort.is_some() {
                return self.finish(counts, reporter, abort);
            }

            let attempted = !matches!(outcome, UploadOutcome::Skipped(_));
            if attempted && !self.options.delay.is_zero() && records.peek().is_some() {
                sleep(self.options.delay).await;
            }
        }

        self.finish(counts, reporter, None)
    }

    async fn process<C: ImapConnector>(
        &self,
        session: &mut MigrationSession<C>,
        record: &ArchiveRecord,
    ) -> (UploadOutcome, Option<MigrateError>) {
        if let Some(reason) = record.unusable() {
            debug!("Skipping message {}: {}", record.index() + 1, reason);
            return (UploadOutcome::Skipped(reason.clone()), None);
        }

        match session.append(record.raw(), record.envelope_date()).await {
            Ok(()) => (UploadOutcome::Uploaded, None),
            Err(e) if e.is_fatal() => {
                // The record was in flight; whether the server kept it is unknown
                let outcome = UploadOutcome::Failed(format!("{} (delivery unknown)", e));
                (outcome, Some(e.into()))
            }
            Err(e) => (UploadOutcome::Failed(e.to_string()), None),
        }
    }

    fn finish<R: RunReporter + ?Sized>(
        &self,
        counts: RunCounts,
        reporter: &mut R,
        abort: Option<MigrateError>,
    ) -> EngineRun {
        let interval = self.options.progress_interval;
        if interval > 0 && counts.seen % interval != 0 {
            reporter.on_progress(&counts);
        }
        EngineRun { counts, abort }
    }
}
