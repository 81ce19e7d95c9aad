//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! SSH handshake driver
//!
//! Wraps an accepted stream in its I/O deadline, runs the russh server session over it with a
//! [`CaptureHandler`] as the authentication callback, and waits until the client has been let
//! in. The session itself keeps running detached after that point. russh refuses every channel
//! and global request by default, and the deadline eventually tears the connection down.

use crate::deadline::DeadlineStream;
use crate::{CredentialInterceptor, HoneypotError, Result, ServerConfig, SessionId};
use async_trait::async_trait;
use russh::server::{self, Auth, Session};
use russh::{MethodSet, SshId};
use russh_keys::key::KeyPair;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::Instrument;

/// Metadata of a session that completed authentication
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handshake {
    /// Session identifier, also the credential store key
    pub session_id: SessionId,
    /// Remote peer
    pub peer_addr: SocketAddr,
    /// Username of the accepted offer
    pub username: String,
    /// Identification line the client sent, as received
    pub client_id: Vec<u8>,
}

impl Handshake {
    /// Software part of the client identification
    ///
    /// `SSH-2.0-OpenSSH_9.6 Debian` yields `OpenSSH_9.6 Debian`. Lines that do not follow the
    /// `SSH-protoversion-softwareversion` layout are returned whole.
    pub fn client_banner(&self) -> String {
        let id = String::from_utf8_lossy(&self.client_id);
        let id = id.trim_end_matches(['\r', '\n']);
        match id.strip_prefix("SSH-").and_then(|rest| rest.split_once('-')) {
            Some((_, software)) => software.to_string(),
            None => id.to_string(),
        }
    }
}

/// Build the russh server configuration
pub(crate) fn engine_config(config: &ServerConfig, host_key: KeyPair) -> server::Config {
    server::Config {
        server_id: SshId::Standard(config.server_banner.clone()),
        methods: MethodSet::PASSWORD,
        auth_rejection_time: Duration::from_secs(1),
        auth_rejection_time_initial: Some(Duration::ZERO),
        keys: vec![host_key],
        inactivity_timeout: Some(config.io_timeout),
        ..Default::default()
    }
}

/// Per-connection russh handler
///
/// Every password offer goes through the interceptor and is accepted. Once russh reports the
/// session as authenticated, the collected metadata is sent back to the accept loop.
struct CaptureHandler {
    session_id: SessionId,
    peer_addr: SocketAddr,
    interceptor: CredentialInterceptor,
    username: String,
    done: Option<oneshot::Sender<Handshake>>,
}

#[async_trait]
impl server::Handler for CaptureHandler {
    type Error = russh::Error;

    async fn auth_password(
        &mut self,
        user: &str,
        password: &str,
    ) -> std::result::Result<Auth, Self::Error> {
        self.username = user.to_string();
        Ok(self.interceptor.intercept(&self.session_id, user, password))
    }

    async fn auth_succeeded(
        &mut self,
        session: &mut Session,
    ) -> std::result::Result<(), Self::Error> {
        if let Some(done) = self.done.take() {
            let handshake = Handshake {
                session_id: self.session_id.clone(),
                peer_addr: self.peer_addr,
                username: self.username.clone(),
                client_id: session.remote_sshid().to_vec(),
            };
            // The loop stops listening only when the deadline lapsed
            let _ = done.send(handshake);
        }
        Ok(())
    }
}

enum Outcome {
    Authenticated(Handshake),
    Ended(std::result::Result<(), russh::Error>),
    HandlerGone,
}

/// Drive the SSH handshake on an accepted stream
///
/// Returns once the client has authenticated, or fails with
/// [`HoneypotError::HandshakeTimeout`] when `io_timeout` lapses first.
pub(crate) async fn perform<S>(
    stream: S,
    peer_addr: SocketAddr,
    engine: Arc<server::Config>,
    interceptor: CredentialInterceptor,
    io_timeout: Duration,
) -> Result<Handshake>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let deadline = Instant::now() + io_timeout;
    let stream = DeadlineStream::new(stream, deadline);
    let session_id = SessionId::generate();
    let (done_tx, mut done_rx) = oneshot::channel();

    let handler = CaptureHandler {
        session_id: session_id.clone(),
        peer_addr,
        interceptor,
        username: String::new(),
        done: Some(done_tx),
    };

    let span = tracing::info_span!("handshake", peer = %peer_addr, session = %session_id);
    let handshake = async move {
        let mut running = server::run_stream(engine, stream, handler)
            .await
            .map_err(|source| HoneypotError::Handshake {
                peer: peer_addr,
                source,
            })?;

        let outcome = tokio::select! {
            biased;
            done = &mut done_rx => match done {
                Ok(handshake) => Outcome::Authenticated(handshake),
                Err(_) => Outcome::HandlerGone,
            },
            ended = &mut running => Outcome::Ended(ended),
        };

        match outcome {
            Outcome::Authenticated(handshake) => {
                tracing::debug!(username = %handshake.username, "Client authenticated");
                Ok(handshake)
            }
            Outcome::Ended(ended) => Err(session_failure(peer_addr, ended)),
            Outcome::HandlerGone => Err(session_failure(peer_addr, running.await)),
        }
    }
    .instrument(span);

    match tokio::time::timeout_at(deadline, handshake).await {
        Ok(Err(HoneypotError::Handshake { .. })) if Instant::now() >= deadline => {
            Err(HoneypotError::HandshakeTimeout {
                peer: peer_addr,
                timeout: io_timeout,
            })
        }
        Ok(result) => result,
        Err(_) => Err(HoneypotError::HandshakeTimeout {
            peer: peer_addr,
            timeout: io_timeout,
        }),
    }
}

fn session_failure(
    peer: SocketAddr,
    ended: std::result::Result<(), russh::Error>,
) -> HoneypotError {
    match ended {
        Ok(()) => HoneypotError::HandshakeIncomplete { peer },
        Err(source) => HoneypotError::Handshake { peer, source },
    }
}
