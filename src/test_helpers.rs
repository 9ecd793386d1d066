// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Stub connector and session builders shared by unit tests.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::imap::session::MockImapSession;
use crate::imap::{ConnectOptions, Encryption, ImapConnection, ImapConnector, ImapError};
use crate::session_manager::MigrationSession;

/// Hands out one pre-built connection; a second connect attempt fails.
pub struct StubConnector {
    connection: Mutex<Option<Result<StubConnection, ImapError>>>,
}

pub struct StubConnection {
    login: Result<MockImapSession, ImapError>,
}

impl StubConnector {
    pub fn with_session(session: MockImapSession) -> Self {
        Self::from_result(Ok(StubConnection { login: Ok(session) }))
    }

    pub fn refusing(err: ImapError) -> Self {
        Self::from_result(Err(err))
    }

    pub fn rejecting_login(err: ImapError) -> Self {
        Self::from_result(Ok(StubConnection { login: Err(err) }))
    }

    fn from_result(result: Result<StubConnection, ImapError>) -> Self {
        Self {
            connection: Mutex::new(Some(result)),
        }
    }
}

#[async_trait]
impl ImapConnector for StubConnector {
    type Connection = StubConnection;

    async fn connect(&self, _options: &ConnectOptions) -> Result<StubConnection, ImapError> {
        self.connection
            .lock()
            .unwrap()
            .take()
            .unwrap_or_else(|| Err(ImapError::Connection("stub already used".into())))
    }
}

#[async_trait]
impl ImapConnection for StubConnection {
    type Session = MockImapSession;

    async fn login(self, _username: &str, _secret: &str) -> Result<MockImapSession, ImapError> {
        self.login
    }
}

pub fn options() -> ConnectOptions {
    ConnectOptions {
        host: "imap.example.com".to_string(),
        port: 993,
        encryption: Encryption::Tls,
        connect_timeout: Duration::from_secs(5),
        command_timeout: Duration::from_secs(5),
    }
}

pub async fn authenticated_session(mock: MockImapSession) -> MigrationSession<StubConnector> {
    let mut session = MigrationSession::new(StubConnector::with_session(mock));
    session.connect(&options()).await.unwrap();
    session.authenticate("user@example.com", "secret").await.unwrap();
    session
}

/// A session already in `FolderReady` on folder "Imported".
pub async fn ready_session(mut mock: MockImapSession) -> MigrationSession<StubConnector> {
    mock.expect_create_folder().returning(|_| Ok(()));
    mock.expect_select_folder().returning(|_| Ok(()));
    let mut session = authenticated_session(mock).await;
    session.ensure_folder("Imported").await.unwrap();
    session
}
