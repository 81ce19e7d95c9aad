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

//! Captured connection records
//!
//! A [`Connection`] is built once the SSH engine has let a client in, and is handed to the
//! operator by value over the connections channel.

use crate::handshake::Handshake;
use crate::resolver::{HostnameResolver, LookupFailure, first_hostname};
use crate::{CredentialStore, Payload, ServerMetrics, SessionId};
use metrics::counter;
use std::fmt;
use std::time::Duration;

/// An SSH login captured by the honeypot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    session_id: SessionId,
    source_address: String,
    source_hostname: Option<String>,
    username: String,
    password: String,
    client_banner: String,
    payloads: Vec<Payload>,
}

impl Connection {
    /// Session identifier in base64 form
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Remote `ip:port`
    pub fn source_address(&self) -> &str {
        &self.source_address
    }

    /// Reverse-resolved name of the remote address, if any
    pub fn source_hostname(&self) -> Option<&str> {
        self.source_hostname.as_deref()
    }

    /// Username the client logged in with
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Last password the client offered on the session
    pub fn password(&self) -> &str {
        &self.password
    }

    /// Client software identification, e.g. `OpenSSH_9.6`
    pub fn client_banner(&self) -> &str {
        &self.client_banner
    }

    /// Post-authentication activity
    pub fn payloads(&self) -> &[Payload] {
        &self.payloads
    }
}

impl fmt::Display for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.username, self.source_address)?;
        if let Some(hostname) = &self.source_hostname {
            write!(f, " ({hostname})")?;
        }
        write!(f, " [{}] session={}", self.client_banner, self.session_id)
    }
}

/// Materializes completed handshakes into [`Connection`] records
pub(crate) struct Materializer<'a> {
    pub store: &'a CredentialStore,
    pub resolver: &'a dyn HostnameResolver,
    pub lookup_timeout: Duration,
    pub metrics: &'a ServerMetrics,
}

impl Materializer<'_> {
    /// Build the record for `handshake`
    ///
    /// Never fails. A missing password becomes the empty string and a failed lookup leaves the
    /// hostname empty.
    pub async fn materialize(&self, handshake: Handshake) -> Connection {
        let password = self.store.take(&handshake.session_id).unwrap_or_else(|| {
            tracing::warn!(session = %handshake.session_id, "No password recorded for session");
            String::new()
        });

        let ip = handshake.peer_addr.ip();
        let source_hostname = match first_hostname(self.resolver, ip, self.lookup_timeout).await {
            Ok(hostname) => Some(hostname),
            Err(failure) => {
                match failure {
                    LookupFailure::Error(e) => tracing::debug!(%ip, "Reverse lookup failed: {}", e),
                    LookupFailure::TimedOut => tracing::debug!(%ip, "Reverse lookup timed out"),
                    LookupFailure::NoName => tracing::trace!(%ip, "No reverse name"),
                }
                self.metrics.lookup_failure();
                counter!("lure.hostname.lookup_failures").increment(1);
                None
            }
        };

        Connection {
            client_banner: handshake.client_banner(),
            source_address: handshake.peer_addr.to_string(),
            session_id: handshake.session_id,
            source_hostname,
            username: handshake.username,
            password,
            payloads: Vec::new(),
        }
    }
}
