// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::fmt;
use std::time::Duration;

use log::{info, warn};
use serde::{Serialize, Serializer};

use crate::upload::UploadOutcome;

/// Counts accumulated while a run is in progress.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunCounts {
    pub seen: usize,
    pub uploaded: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl RunCounts {
    pub fn record(&mut self, outcome: &UploadOutcome) {
        self.seen += 1;
        match outcome {
            UploadOutcome::Uploaded => self.uploaded += 1,
            UploadOutcome::Skipped(_) => self.skipped += 1,
            UploadOutcome::Failed(_) => self.failed += 1,
        }
    }
}

/// Final tally of a run, produced exactly once.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub total: usize,
    pub uploaded: usize,
    pub skipped: usize,
    pub failed: usize,
    #[serde(rename = "elapsed_secs", serialize_with = "serialize_secs")]
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn new(counts: RunCounts, elapsed: Duration) -> Self {
        Self {
            total: counts.seen,
            uploaded: counts.uploaded,
            skipped: counts.skipped,
            failed: counts.failed,
            elapsed,
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Upload Summary ---")?;
        writeln!(f, "Messages read:         {}", self.total)?;
        writeln!(f, "Successfully uploaded: {}", self.uploaded)?;
        writeln!(f, "Skipped:               {}", self.skipped)?;
        writeln!(f, "Failed:                {}", self.failed)?;
        write!(f, "Elapsed:               {:.1}s", self.elapsed.as_secs_f64())
    }
}

fn serialize_secs<S: Serializer>(elapsed: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(elapsed.as_secs_f64())
}

/// Observer of a run. Callbacks must not influence the run itself.
pub trait RunReporter: Send {
    /// Called after each record with its outcome.
    fn on_record(&mut self, _index: usize, _outcome: &UploadOutcome) {}

    /// Called every `progress_interval` records.
    fn on_progress(&mut self, counts: &RunCounts);

    /// Called once at the end of every run, fatal or not.
    fn finalize(&mut self, counts: RunCounts, elapsed: Duration) -> RunSummary {
        RunSummary::new(counts, elapsed)
    }
}

/// Reporter that writes progress and the summary to the log.
#[derive(Debug, Default)]
pub struct LogReporter;

impl RunReporter for LogReporter {
    fn on_record(&mut self, index: usize, outcome: &UploadOutcome) {
        if let UploadOutcome::Failed(reason) = outcome {
            warn!("Error uploading message {}: {}", index + 1, reason);
        }
    }

    fn on_progress(&mut self, counts: &RunCounts) {
        info!(
            "Processed {} messages: {} uploaded, {} skipped, {} failed",
            counts.seen, counts.uploaded, counts.skipped, counts.failed
        );
    }

    fn finalize(&mut self, counts: RunCounts, elapsed: Duration) -> RunSummary {
        let summary = RunSummary::new(counts, elapsed);
        info!(
            "Run finished in {:.1}s: {} read, {} uploaded, {} skipped, {} failed",
            elapsed.as_secs_f64(),
            summary.total,
            summary.uploaded,
            summary.skipped,
            summary.failed
        );
        summary
    }
}
