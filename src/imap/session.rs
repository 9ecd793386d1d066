// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use log::debug;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::time::timeout;

#[cfg(test)]
use mockall::automock;

use crate::imap::error::ImapError;
use crate::imap::types::{format_internal_date, normalize_crlf, ConnectOptions};

/// Any byte stream async-imap can drive: plain TCP, TLS, or TLS after STARTTLS.
pub trait ImapStream: AsyncRead + AsyncWrite + Unpin + Send + Sync + Debug {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send + Sync + Debug> ImapStream for T {}

pub type BoxedStream = Box<dyn ImapStream>;

/// The session type async-imap hands back after a successful LOGIN.
pub type UnderlyingImapSession = async_imap::Session<BoxedStream>;

/// Commands the migration needs from an authenticated IMAP session.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ImapSession: Send {
    /// CREATE the mailbox.
    async fn create_folder(&mut self, name: &str) -> Result<(), ImapError>;

    /// SELECT the mailbox.
    async fn select_folder(&mut self, name: &str) -> Result<(), ImapError>;

    /// APPEND one message, optionally carrying an INTERNALDATE.
    async fn append(
        &mut self,
        folder: &str,
        content: &[u8],
        date: Option<DateTime<FixedOffset>>,
    ) -> Result<(), ImapError>;

    /// LOGOUT and drop the connection.
    async fn logout(&mut self) -> Result<(), ImapError>;
}

/// A connected, greeted, not yet authenticated IMAP connection.
#[async_trait]
pub trait ImapConnection: Send {
    type Session: ImapSession;

    async fn login(self, username: &str, secret: &str) -> Result<Self::Session, ImapError>;
}

/// Opens connections to an IMAP server.
#[async_trait]
pub trait ImapConnector: Send + Sync {
    type Connection: ImapConnection;

    async fn connect(&self, options: &ConnectOptions) -> Result<Self::Connection, ImapError>;
}

/// [`ImapSession`] over a real async-imap session, each command bounded by a timeout.
#[derive(Debug)]
pub struct AsyncImapSessionWrapper {
    session: UnderlyingImapSession,
    command_timeout: Duration,
}

impl AsyncImapSessionWrapper {
    pub fn new(session: UnderlyingImapSession, command_timeout: Duration) -> Self {
        Self {
            session,
            command_timeout,
        }
    }

    /// Hands back the raw session, for callers that need commands outside [`ImapSession`].
    pub fn into_inner(self) -> UnderlyingImapSession {
        self.session
    }
}

#[async_trait]
impl ImapSession for AsyncImapSessionWrapper {
    async fn create_folder(&mut self, name: &str) -> Result<(), ImapError> {
        timeout(self.command_timeout, self.session.create(name)).await??;
        Ok(())
    }

    async fn select_folder(&mut self, name: &str) -> Result<(), ImapError> {
        let mailbox = timeout(self.command_timeout, self.session.select(name)).await??;
        debug!("Selected '{}' ({} messages)", name, mailbox.exists);
        Ok(())
    }

    async fn append(
        &mut self,
        folder: &str,
        content: &[u8],
        date: Option<DateTime<FixedOffset>>,
    ) -> Result<(), ImapError> {
        let internal_date = date.as_ref().map(format_internal_date);
        let wire = normalize_crlf(content);
        timeout(
            self.command_timeout,
            self.session
                .append(folder, None, internal_date.as_deref(), wire.as_ref()),
        )
        .await??;
        Ok(())
    }

    async fn logout(&mut self) -> Result<(), ImapError> {
        timeout(self.command_timeout, self.session.logout()).await??;
        Ok(())
    }
}
