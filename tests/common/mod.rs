// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! In-memory IMAP stand-in shared by the integration tests.

#![allow(dead_code)]

use std::io::Write;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use tempfile::NamedTempFile;

use mbox2imap::config::{LogConfig, Settings};
use mbox2imap::imap::{ConnectOptions, Encryption, ImapConnection, ImapConnector, ImapError, ImapSession};
use mbox2imap::report::{RunCounts, RunReporter};
use mbox2imap::upload::UploadOutcome;

/// One message as the fake server stored it.
#[derive(Debug, Clone)]
pub struct Stored {
    pub folder: String,
    pub content: Vec<u8>,
    pub date: Option<DateTime<FixedOffset>>,
}

/// Server-side state and the failures it has been told to produce.
#[derive(Debug, Default)]
pub struct Mailbox {
    pub folders: Vec<String>,
    pub stored: Vec<Stored>,
    pub selected: Option<String>,
    pub logged_out: bool,
    pub logins: usize,
    /// Password the server accepts. `None` accepts anything.
    pub password: Option<String>,
    pub deny_create: bool,
    /// Appends whose content contains this marker are refused with NO.
    pub reject_marker: Option<String>,
    /// The connection drops on this append (1-based).
    pub drop_on_append: Option<usize>,
    appends: usize,
}

#[derive(Clone, Default)]
pub struct FakeServer {
    pub mailbox: Arc<Mutex<Mailbox>>,
}

impl FakeServer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<F: FnOnce(&mut Mailbox)>(self, setup: F) -> Self {
        setup(&mut self.mailbox.lock().unwrap());
        self
    }

    pub fn stored(&self) -> Vec<Stored> {
        self.mailbox.lock().unwrap().stored.clone()
    }

    pub fn state(&self) -> std::sync::MutexGuard<'_, Mailbox> {
        self.mailbox.lock().unwrap()
    }

    pub fn connector(&self) -> FakeConnector {
        FakeConnector {
            mailbox: self.mailbox.clone(),
        }
    }
}

pub struct FakeConnector {
    mailbox: Arc<Mutex<Mailbox>>,
}

pub struct FakeConnection {
    mailbox: Arc<Mutex<Mailbox>>,
}

pub struct FakeSession {
    mailbox: Arc<Mutex<Mailbox>>,
    broken: bool,
}

#[async_trait]
impl ImapConnector for FakeConnector {
    type Connection = FakeConnection;

    async fn connect(&self, _options: &ConnectOptions) -> Result<FakeConnection, ImapError> {
        Ok(FakeConnection {
            mailbox: self.mailbox.clone(),
        })
    }
}

#[async_trait]
impl ImapConnection for FakeConnection {
    type Session = FakeSession;

    async fn login(self, _username: &str, secret: &str) -> Result<FakeSession, ImapError> {
        let mut mailbox = self.mailbox.lock().unwrap();
        mailbox.logins += 1;
        if let Some(expected) = &mailbox.password {
            if expected != secret {
                return Err(ImapError::Auth("[AUTHENTICATIONFAILED] Invalid credentials".into()));
            }
        }
        drop(mailbox);
        Ok(FakeSession {
            mailbox: self.mailbox,
            broken: false,
        })
    }
}

impl FakeSession {
    fn check(&self) -> Result<(), ImapError> {
        if self.broken {
            return Err(ImapError::Connection("connection closed".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl ImapSession for FakeSession {
    async fn create_folder(&mut self, name: &str) -> Result<(), ImapError> {
        self.check()?;
        let mut mailbox = self.mailbox.lock().unwrap();
        if mailbox.deny_create {
            return Err(ImapError::Operation("[NOPERM] Permission denied".into()));
        }
        if mailbox.folders.iter().any(|f| f == name) {
            return Err(ImapError::Operation("[ALREADYEXISTS] Mailbox already exists".into()));
        }
        mailbox.folders.push(name.to_string());
        Ok(())
    }

    async fn select_folder(&mut self, name: &str) -> Result<(), ImapError> {
        self.check()?;
        let mut mailbox = self.mailbox.lock().unwrap();
        if !mailbox.folders.iter().any(|f| f == name) {
            return Err(ImapError::Operation("[NONEXISTENT] No such mailbox".into()));
        }
        mailbox.selected = Some(name.to_string());
        Ok(())
    }

    async fn append(
        &mut self,
        folder: &str,
        content: &[u8],
        date: Option<DateTime<FixedOffset>>,
    ) -> Result<(), ImapError> {
        self.check()?;
        let mut mailbox = self.mailbox.lock().unwrap();
        mailbox.appends += 1;
        if mailbox.drop_on_append == Some(mailbox.appends) {
            self.broken = true;
            return Err(ImapError::Connection("connection reset by peer".into()));
        }
        if let Some(marker) = &mailbox.reject_marker {
            if String::from_utf8_lossy(content).contains(marker.as_str()) {
                return Err(ImapError::Operation("[LIMIT] Message rejected".into()));
            }
        }
        mailbox.stored.push(Stored {
            folder: folder.to_string(),
            content: content.to_vec(),
            date,
        });
        Ok(())
    }

    async fn logout(&mut self) -> Result<(), ImapError> {
        self.check()?;
        self.mailbox.lock().unwrap().logged_out = true;
        Ok(())
    }
}

/// Reporter that keeps everything it is told.
#[derive(Debug, Default)]
pub struct CollectingReporter {
    pub outcomes: Vec<(usize, UploadOutcome)>,
    pub progress: Vec<RunCounts>,
    pub finalized: usize,
}

impl RunReporter for CollectingReporter {
    fn on_record(&mut self, index: usize, outcome: &UploadOutcome) {
        self.outcomes.push((index, outcome.clone()));
    }

    fn on_progress(&mut self, counts: &RunCounts) {
        self.progress.push(*counts);
    }

    fn finalize(&mut self, counts: RunCounts, elapsed: std::time::Duration) -> mbox2imap::report::RunSummary {
        self.finalized += 1;
        mbox2imap::report::RunSummary::new(counts, elapsed)
    }
}

/// Writes `content` to a temporary mbox file.
pub fn mbox_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

/// An archive of `count` small messages with distinct subjects and Date headers.
pub fn numbered_mbox(count: usize) -> String {
    (0..count)
        .map(|i| {
            format!(
                "From sender@example.com Mon Jan  1 00:00:00 2024\n\
                 From: sender@example.com\n\
                 Date: Mon, 1 Jan 2024 10:{:02}:00 +0000\n\
                 Subject: message {}\n\
                 \n\
                 body of message {}\n\
                 \n",
                i % 60,
                i,
                i
            )
        })
        .collect()
}

pub fn settings(archive: &NamedTempFile) -> Settings {
    Settings {
        archive_path: archive.path().to_string_lossy().into_owned(),
        imap_host: "imap.example.com".to_string(),
        imap_port: 993,
        encryption: Encryption::Tls,
        imap_user: "user@example.com".to_string(),
        imap_pass: "secret".to_string(),
        target_folder: "Imported_Mbox".to_string(),
        upload_delay_ms: 0,
        progress_interval: 50,
        connect_timeout_secs: 5,
        command_timeout_secs: 5,
        skip_first: 0,
        max_message_bytes: None,
        log: LogConfig::default(),
    }
}
