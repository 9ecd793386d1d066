// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Lifecycle of the single IMAP session a migration runs over.
//!
//! [`MigrationSession`] walks `Disconnected -> Connected -> Authenticated ->
//! FolderReady -> Closed`. Each step is only valid from the state before it,
//! and any fatal failure drops the session straight to `Closed`, releasing
//! the connection.

use chrono::{DateTime, FixedOffset};
use log::{debug, error, info, warn};
use thiserror::Error;

use crate::imap::{ConnectOptions, ImapConnection, ImapConnector, ImapError, ImapSession, SessionState};

/// Result type for session operations
pub type SessionResult<T> = Result<T, SessionError>;

/// Errors that can occur while driving the session
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Connection failed: {0}")]
    Connection(ImapError),
    #[error("Authentication failed: {0}")]
    Auth(ImapError),
    #[error("Folder '{folder}' unavailable: {source}")]
    Folder { folder: String, source: ImapError },
    #[error("Message rejected: {0}")]
    Upload(ImapError),
    #[error("Cannot {operation} while session is {state}")]
    InvalidState {
        operation: &'static str,
        state: SessionState,
    },
}

impl SessionError {
    /// Only a per-message rejection lets the run continue.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, SessionError::Upload(_))
    }
}

type SessionOf<C> = <<C as ImapConnector>::Connection as ImapConnection>::Session;

enum Link<N, S> {
    Disconnected,
    Connected(N),
    Authenticated(S),
    FolderReady { session: S, folder: String },
    Closed,
}

/// One authenticated connection bound to one destination folder.
///
/// The secret passed to [`authenticate`](Self::authenticate) is handed to the
/// server and not retained.
pub struct MigrationSession<C: ImapConnector> {
    connector: C,
    link: Link<C::Connection, SessionOf<C>>,
}

impl<C: ImapConnector> MigrationSession<C> {
    pub fn new(connector: C) -> Self {
        Self {
            connector,
            link: Link::Disconnected,
        }
    }

    pub fn state(&self) -> SessionState {
        match self.link {
            Link::Disconnected => SessionState::Disconnected,
            Link::Connected(_) => SessionState::Connected,
            Link::Authenticated(_) => SessionState::Authenticated,
            Link::FolderReady { .. } => SessionState::FolderReady,
            Link::Closed => SessionState::Closed,
        }
    }

    /// Destination folder, once selected.
    pub fn folder(&self) -> Option<&str> {
        match &self.link {
            Link::FolderReady { folder, .. } => Some(folder),
            _ => None,
        }
    }

    fn invalid(&self, operation: &'static str) -> SessionError {
        SessionError::InvalidState {
            operation,
            state: self.state(),
        }
    }

    /// Opens the connection. No retry happens at this layer.
    pub async fn connect(&mut self, options: &ConnectOptions) -> SessionResult<()> {
        if !matches!(self.link, Link::Disconnected) {
            return Err(self.invalid("connect"));
        }
        match self.connector.connect(options).await {
            Ok(connection) => {
                self.link = Link::Connected(connection);
                Ok(())
            }
            Err(e) => {
                error!("Could not connect to {}:{}: {}", options.host, options.port, e);
                self.link = Link::Closed;
                Err(SessionError::Connection(e))
            }
        }
    }

    /// Logs in. Rejected credentials are fatal.
    pub async fn authenticate(&mut self, username: &str, secret: &str) -> SessionResult<()> {
        let connection = match std::mem::replace(&mut self.link, Link::Closed) {
            Link::Connected(connection) => connection,
            other => {
                self.link = other;
                return Err(self.invalid("authenticate"));
            }
        };
        match connection.login(username, secret).await {
            Ok(session) => {
                self.link = Link::Authenticated(session);
                Ok(())
            }
            Err(e @ ImapError::Auth(_)) => Err(SessionError::Auth(e)),
            Err(e) if e.is_fatal() => Err(SessionError::Connection(e)),
            Err(e) => Err(SessionError::Auth(e)),
        }
    }

    /// Makes sure `name` exists and selects it.
    ///
    /// A CREATE refused because the folder already exists counts as success;
    /// any other refusal, or a failed SELECT, is fatal.
    pub async fn ensure_folder(&mut self, name: &str) -> SessionResult<()> {
        let mut session = match std::mem::replace(&mut self.link, Link::Closed) {
            Link::Authenticated(session) => session,
            other => {
                self.link = other;
                return Err(self.invalid("ensure folder"));
            }
        };

        match session.create_folder(name).await {
            Ok(()) => info!("Folder '{}' created.", name),
            Err(e) if e.is_already_exists() => info!("Folder '{}' already exists.", name),
            Err(e) => return Err(Self::abandon(session, name, e).await),
        }

        if let Err(e) = session.select_folder(name).await {
            return Err(Self::abandon(session, name, e).await);
        }

        debug!("Folder '{}' selected, ready for append", name);
        self.link = Link::FolderReady {
            session,
            folder: name.to_string(),
        };
        Ok(())
    }

    // Folder failures end the session. A still-healthy connection gets a LOGOUT first.
    async fn abandon(mut session: SessionOf<C>, name: &str, e: ImapError) -> SessionError {
        error!("Error creating/selecting folder '{}': {}", name, e);
        if e.is_fatal() {
            return SessionError::Connection(e);
        }
        if let Err(logout_err) = session.logout().await {
            warn!("Logout after folder failure also failed: {}", logout_err);
        }
        SessionError::Folder {
            folder: name.to_string(),
            source: e,
        }
    }

    /// Appends one message to the destination folder.
    ///
    /// A server rejection comes back as [`SessionError::Upload`] and leaves the
    /// session usable. A transport failure closes the session; whether the
    /// interrupted message reached the server is then unknown.
    pub async fn append(
        &mut self,
        content: &[u8],
        date: Option<DateTime<FixedOffset>>,
    ) -> SessionResult<()> {
        let state = self.state();
        let result = match &mut self.link {
            Link::FolderReady { session, folder } => session.append(folder, content, date).await,
            _ => {
                return Err(SessionError::InvalidState {
                    operation: "append",
                    state,
                })
            }
        };
        match result {
            Ok(()) => Ok(()),
            Err(e) if e.is_fatal() => {
                error!("Connection lost during append: {}", e);
                self.link = Link::Closed;
                Err(SessionError::Connection(e))
            }
            Err(e) => Err(SessionError::Upload(e)),
        }
    }

    /// Logs out and releases the connection. Never fails; problems are logged.
    pub async fn close(&mut self) {
        let session = match std::mem::replace(&mut self.link, Link::Closed) {
            Link::Authenticated(session) | Link::FolderReady { session, .. } => Some(session),
            Link::Connected(_) | Link::Disconnected | Link::Closed => None,
        };
        if let Some(mut session) = session {
            info!("Logging out from IMAP server...");
            match session.logout().await {
                Ok(()) => info!("Logout successful."),
                Err(e) => warn!("Error during IMAP logout: {}", e),
            }
        }
    }
}
