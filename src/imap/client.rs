// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::sync::Arc;
use std::time::Duration;

use async_imap::Client as AsyncImapClient;
use async_trait::async_trait;
use rustls::pki_types::ServerName as PkiServerName;
use rustls::{ClientConfig, RootCertStore};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream as TokioTcpStream;
use tokio::time::timeout;
use tokio_rustls::TlsConnector;

use crate::imap::error::ImapError;
use crate::imap::session::{
    AsyncImapSessionWrapper, BoxedStream, ImapConnection, ImapConnector, ImapStream,
};
use crate::imap::types::{ConnectOptions, Encryption};

/// Connects to real IMAP servers over tokio, using rustls with the platform's roots.
#[derive(Debug, Default, Clone)]
pub struct AsyncImapConnector;

/// A greeted connection waiting for LOGIN.
#[derive(Debug)]
pub struct PendingLogin {
    client: AsyncImapClient<BoxedStream>,
    command_timeout: Duration,
}

#[async_trait]
impl ImapConnector for AsyncImapConnector {
    type Connection = PendingLogin;

    async fn connect(&self, options: &ConnectOptions) -> Result<PendingLogin, ImapError> {
        log::info!(
            "Connecting to {}:{} (encryption: {})",
            options.host,
            options.port,
            options.encryption
        );
        if !options.encryption.is_encrypted() {
            log::warn!("Using an unencrypted connection; credentials travel in clear text");
        }
        let client = match timeout(options.connect_timeout, establish(options)).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(ImapError::Timeout(format!(
                    "connecting to {}:{} took longer than {:?}",
                    options.host, options.port, options.connect_timeout
                )))
            }
        };
        log::info!("Connected to {}:{}", options.host, options.port);
        Ok(PendingLogin {
            client,
            command_timeout: options.command_timeout,
        })
    }
}

#[async_trait]
impl ImapConnection for PendingLogin {
    type Session = AsyncImapSessionWrapper;

    async fn login(self, username: &str, secret: &str) -> Result<AsyncImapSessionWrapper, ImapError> {
        log::debug!("Attempting login for user '{}'...", username);
        match timeout(self.command_timeout, self.client.login(username, secret)).await {
            Ok(Ok(session)) => {
                log::info!("IMAP login successful for user: {}", username);
                Ok(AsyncImapSessionWrapper::new(session, self.command_timeout))
            }
            Ok(Err((e, _client))) => {
                log::error!("IMAP login failed for user {}: {}", username, e);
                Err(match ImapError::from(e) {
                    ImapError::Operation(msg) | ImapError::BadResponse(msg) => ImapError::Auth(msg),
                    other => other,
                })
            }
            Err(_) => Err(ImapError::Timeout(format!(
                "login did not complete within {:?}",
                self.command_timeout
            ))),
        }
    }
}

// --- Internal Connection Logic ---

async fn establish(options: &ConnectOptions) -> Result<AsyncImapClient<BoxedStream>, ImapError> {
    let tcp_stream = setup_tcp_stream(&options.host, options.port).await?;
    match options.encryption {
        Encryption::Tls => {
            let tls_stream = setup_tls_stream(&options.host, tcp_stream).await?;
            greeted_client(Box::new(tls_stream) as BoxedStream).await
        }
        Encryption::StartTls => {
            let plain = greeted_client(tcp_stream).await?;
            let tcp_stream = upgrade_starttls(plain).await?;
            let tls_stream = setup_tls_stream(&options.host, tcp_stream).await?;
            // No second greeting after STARTTLS (RFC 3501 section 6.2.1)
            Ok(AsyncImapClient::new(Box::new(tls_stream) as BoxedStream))
        }
        Encryption::None => greeted_client(Box::new(tcp_stream) as BoxedStream).await,
    }
}

async fn setup_tcp_stream(host: &str, port: u16) -> Result<TokioTcpStream, ImapError> {
    log::debug!("Attempting TCP connection to {}:{}...", host, port);
    let tcp_stream = TokioTcpStream::connect((host, port))
        .await
        .map_err(|e| ImapError::Connection(format!("{}:{}: {}", host, port, e)))?;
    tcp_stream.set_nodelay(true)?;
    Ok(tcp_stream)
}

fn tls_connector() -> Result<TlsConnector, ImapError> {
    let mut root_cert_store = RootCertStore::empty();
    let certs = rustls_native_certs::load_native_certs()
        .map_err(|e| ImapError::Tls(format!("cannot load native certificates: {}", e)))?;
    let (added, ignored) = root_cert_store.add_parsable_certificates(certs);
    log::debug!("Loaded {} native certs, ignored {}.", added, ignored);
    if root_cert_store.is_empty() {
        log::warn!("Root certificate store is empty after loading native certs.");
    }

    let config = ClientConfig::builder()
        .with_root_certificates(root_cert_store)
        .with_no_client_auth();
    Ok(TlsConnector::from(Arc::new(config)))
}

async fn setup_tls_stream<S>(
    host: &str,
    stream: S,
) -> Result<tokio_rustls::client::TlsStream<S>, ImapError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let server_name = PkiServerName::try_from(host.to_string())
        .map_err(|_| ImapError::Tls(format!("Invalid server name format: {}", host)))?;
    log::debug!("Performing TLS handshake with {}...", host);
    let tls_stream = tls_connector()?
        .connect(server_name, stream)
        .await
        .map_err(|e| ImapError::Tls(e.to_string()))?;
    log::debug!("TLS handshake successful.");
    Ok(tls_stream)
}

/// Wraps the stream in an async-imap client and consumes the server greeting.
async fn greeted_client<S: ImapStream>(stream: S) -> Result<AsyncImapClient<S>, ImapError> {
    let mut client = AsyncImapClient::new(stream);
    client
        .read_response()
        .await
        .map_err(|e| ImapError::Connection(format!("failed to read greeting: {}", e)))?
        .ok_or_else(|| ImapError::Connection("server closed the connection before greeting".to_string()))?;
    log::trace!("Greeting received");
    Ok(client)
}

async fn upgrade_starttls(
    mut client: AsyncImapClient<TokioTcpStream>,
) -> Result<TokioTcpStream, ImapError> {
    client
        .run_command_and_check_ok("STARTTLS", None)
        .await
        .map_err(|e| ImapError::Tls(format!("STARTTLS command failed: {}", e)))?;
    Ok(client.into_inner())
}
