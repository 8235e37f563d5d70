//! Minimal SSH exec session shared by the shell-based adapters.
//!
//! Password authentication only; the fleet descriptors carry credentials
//! verbatim and no key material is involved.

use std::net::ToSocketAddrs;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use russh::client;
use russh_keys::key::PublicKey;
use tokio::net::TcpStream;

use crate::model::ProbeError;

/// Default SSH port.
const SSH_PORT: u16 = 22;

struct Handler;

#[async_trait]
impl client::Handler for Handler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        _server_public_key: &PublicKey,
    ) -> Result<bool, Self::Error> {
        // Fleet targets are provisioned devices on a management network;
        // host keys are accepted as the source tooling did.
        Ok(true)
    }
}

/// An authenticated SSH session scoped to one probe.
pub struct SshSession {
    handle: client::Handle<Handler>,
    host: String,
}

impl SshSession {
    /// Open and authenticate a session.
    ///
    /// # Errors
    /// Returns [`ProbeError::Connect`] on resolution, transport, or
    /// authentication failure.
    pub async fn connect(
        host: &str,
        username: &str,
        secret: &str,
        timeout: Duration,
    ) -> Result<Self, ProbeError> {
        let config = Arc::new(client::Config {
            inactivity_timeout: Some(timeout),
            ..Default::default()
        });

        let addr = format!("{host}:{SSH_PORT}")
            .to_socket_addrs()
            .map_err(|e| ProbeError::Connect(format!("{host}: {e}")))?
            .next()
            .ok_or_else(|| ProbeError::Connect(format!("{host}: address did not resolve")))?;

        let stream = tokio::time::timeout(timeout, TcpStream::connect(&addr))
            .await
            .map_err(|_| ProbeError::Connect(format!("{host}: connect timed out")))?
            .map_err(|e| ProbeError::Connect(format!("{host}: {e}")))?;

        let mut handle = client::connect_stream(config, stream, Handler)
            .await
            .map_err(|e| ProbeError::Connect(format!("{host}: handshake failed: {e}")))?;

        let authenticated = handle
            .authenticate_password(username, secret)
            .await
            .map_err(|e| ProbeError::Connect(format!("{host}: auth error: {e}")))?;
        if !authenticated {
            return Err(ProbeError::Connect(format!(
                "{host}: authentication failed for user '{username}'"
            )));
        }

        Ok(Self {
            handle,
            host: host.to_string(),
        })
    }

    /// Execute one command and collect its stdout.
    ///
    /// # Errors
    /// Returns [`ProbeError::Connect`] if the channel fails mid-exchange.
    pub async fn exec(&self, command: &str) -> Result<String, ProbeError> {
        let mut channel = self
            .handle
            .channel_open_session()
            .await
            .map_err(|e| ProbeError::Connect(format!("{}: channel open: {e}", self.host)))?;

        channel
            .exec(true, command)
            .await
            .map_err(|e| ProbeError::Connect(format!("{}: exec: {e}", self.host)))?;

        let mut stdout = Vec::new();
        loop {
            match channel.wait().await {
                Some(russh::ChannelMsg::Data { data }) => stdout.extend_from_slice(&data),
                Some(russh::ChannelMsg::ExtendedData { .. }) => {}
                Some(russh::ChannelMsg::ExitStatus { .. }) | Some(russh::ChannelMsg::Eof) => {}
                Some(russh::ChannelMsg::Close) | None => break,
                _ => {}
            }
        }

        Ok(String::from_utf8_lossy(&stdout).into_owned())
    }

    /// Close the session. Errors are ignored; the probe result is already
    /// determined by this point.
    pub async fn close(self) {
        let _ = self
            .handle
            .disconnect(russh::Disconnect::ByApplication, "", "en")
            .await;
    }
}
