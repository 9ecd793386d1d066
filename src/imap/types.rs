// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::borrow::Cow;
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// Transport security used for the IMAP connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Encryption {
    /// Implicit TLS, usually port 993.
    Tls,
    /// Plaintext greeting upgraded with STARTTLS, usually port 143.
    #[value(name = "starttls")]
    StartTls,
    /// No encryption at all.
    None,
}

impl Encryption {
    pub fn is_encrypted(self) -> bool {
        !matches!(self, Encryption::None)
    }
}

impl fmt::Display for Encryption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Encryption::Tls => "tls",
            Encryption::StartTls => "starttls",
            Encryption::None => "none",
        };
        f.write_str(name)
    }
}

/// Where and how to reach the IMAP server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectOptions {
    pub host: String,
    pub port: u16,
    pub encryption: Encryption,
    /// Upper bound for TCP connect, TLS handshake and greeting together.
    pub connect_timeout: Duration,
    /// Upper bound for any single command round trip (LOGIN, APPEND, ...).
    pub command_timeout: Duration,
}

/// Lifecycle of a migration session. Transitions only move forward,
/// except that any failure drops straight to `Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum SessionState {
    Disconnected,
    Connected,
    Authenticated,
    FolderReady,
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Formats a timestamp as an IMAP `date-time` (RFC 3501), e.g.
/// `05-Mar-2024 14:07:09 +0100`. The caller's offset is kept.
pub fn format_internal_date(date: &DateTime<FixedOffset>) -> String {
    date.format("%d-%b-%Y %H:%M:%S %z").to_string()
}

/// Converts bare `\n` line endings to `\r\n`. Existing CRLF pairs are untouched,
/// and already-conforming input is borrowed rather than copied.
pub fn normalize_crlf(content: &[u8]) -> Cow<'_, [u8]> {
    let needs_fix = content
        .iter()
        .enumerate()
        .any(|(i, &b)| b == b'\n' && (i == 0 || content[i - 1] != b'\r'));
    if !needs_fix {
        return Cow::Borrowed(content);
    }

    let mut out = Vec::with_capacity(content.len() + content.len() / 32);
    let mut prev = 0u8;
    for &b in content {
        if b == b'\n' && prev != b'\r' {
            out.push(b'\r');
        }
        out.push(b);
        prev = b;
    }
    Cow::Owned(out)
}
