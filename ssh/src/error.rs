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

//! Error types for the honeypot server

use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

/// Result type for operations
pub type Result<T> = std::result::Result<T, HoneypotError>;

/// Honeypot server error types
///
/// Startup failures are returned directly from
/// [`HoneypotServer::serve`](crate::HoneypotServer::serve).
/// Per-connection failures are delivered on the errors channel and never stop the accept loop.
#[derive(Debug, Error)]
pub enum HoneypotError {
    /// Server configuration was rejected
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Host identity key could not be produced
    #[error("Host key generation failed: {0}")]
    HostKey(String),

    /// The listen address could not be bound
    #[error("TCP listen on {address} failed: {source}")]
    Bind {
        /// Address as configured
        address: String,
        /// Underlying socket error
        #[source]
        source: std::io::Error,
    },

    /// `serve` was called while an accept loop is already running
    #[error("Server already running")]
    AlreadyRunning,

    /// `serve` was called after the server was stopped
    #[error("Server has been stopped")]
    Stopped,

    /// `shutdown` was called without a running accept loop
    #[error("Server not running")]
    NotRunning,

    /// The accept loop task did not finish cleanly during `shutdown`
    #[error("Shutdown incomplete: {0}")]
    ShutdownIncomplete(String),

    /// Accepting a TCP connection failed
    #[error("Accept connection failed: {0}")]
    Accept(#[source] std::io::Error),

    /// The SSH engine rejected or aborted the handshake
    #[error("SSH handshake with {peer} failed: {source}")]
    Handshake {
        /// Remote peer
        peer: SocketAddr,
        /// Engine error
        #[source]
        source: russh::Error,
    },

    /// The per-connection I/O deadline lapsed before authentication completed
    #[error("SSH handshake with {peer} timed out after {timeout:?}")]
    HandshakeTimeout {
        /// Remote peer
        peer: SocketAddr,
        /// Configured I/O deadline
        timeout: Duration,
    },

    /// The session ended cleanly before authentication completed
    ///
    /// Raised when the peer disconnects at any point before a password is accepted, including
    /// after key exchange or after a rejected public-key attempt.
    #[error("SSH handshake with {peer} ended before authentication")]
    HandshakeIncomplete {
        /// Remote peer
        peer: SocketAddr,
    },
}

impl HoneypotError {
    /// Check if the error aborts server startup
    ///
    /// Fatal errors are only ever returned from the constructors and from `serve`;
    /// recovering from them requires building a new server.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            HoneypotError::Config(_)
                | HoneypotError::HostKey(_)
                | HoneypotError::Bind { .. }
                | HoneypotError::AlreadyRunning
                | HoneypotError::Stopped
        )
    }

    /// Check if the error concerns a single connection
    ///
    /// These are the errors delivered on the errors channel.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            HoneypotError::Accept(_)
                | HoneypotError::Handshake { .. }
                | HoneypotError::HandshakeTimeout { .. }
                | HoneypotError::HandshakeIncomplete { .. }
        )
    }

    /// Check if the error is a deadline expiry
    pub fn is_timeout(&self) -> bool {
        matches!(self, HoneypotError::HandshakeTimeout { .. })
    }

    /// Check if the SSH engine aborted because a username or password was not valid UTF-8
    ///
    /// The engine decodes both before the credential handler runs, so such an offer never
    /// reaches the credential store and shows up here instead of as a captured login.
    pub fn is_credential_encoding(&self) -> bool {
        matches!(
            self,
            HoneypotError::Handshake {
                source: russh::Error::Utf8(_),
                ..
            }
        )
    }

    /// Get the remote peer the error is attributed to, if any
    pub fn peer(&self) -> Option<SocketAddr> {
        match self {
            HoneypotError::Handshake { peer, .. }
            | HoneypotError::HandshakeTimeout { peer, .. }
            | HoneypotError::HandshakeIncomplete { peer } => Some(*peer),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer() -> SocketAddr {
        "203.0.113.45:50022".parse().unwrap()
    }

    #[test]
    fn test_error_is_fatal() {
        assert!(HoneypotError::HostKey("no entropy".to_string()).is_fatal());
        assert!(HoneypotError::AlreadyRunning.is_fatal());
        assert!(
            HoneypotError::Bind {
                address: "0.0.0.0:22".to_string(),
                source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
            }
            .is_fatal()
        );
        assert!(!HoneypotError::HandshakeIncomplete { peer: peer() }.is_fatal());
        assert!(!HoneypotError::NotRunning.is_fatal());
        assert!(!HoneypotError::NotRunning.is_transient());
        let incomplete = HoneypotError::ShutdownIncomplete("accept loop still running".to_string());
        assert!(!incomplete.is_fatal());
        assert!(!incomplete.is_transient());
    }

    #[test]
    #[allow(invalid_from_utf8)]
    fn test_error_is_credential_encoding() {
        let utf8 = std::str::from_utf8(&[0xff]).unwrap_err();
        let err = HoneypotError::Handshake {
            peer: peer(),
            source: russh::Error::Utf8(utf8),
        };
        assert!(err.is_credential_encoding());
        assert!(err.is_transient());

        let other = HoneypotError::Handshake {
            peer: peer(),
            source: russh::Error::Disconnect,
        };
        assert!(!other.is_credential_encoding());
        assert!(!HoneypotError::HandshakeIncomplete { peer: peer() }.is_credential_encoding());
    }

    #[test]
    fn test_error_is_transient() {
        let accept = HoneypotError::Accept(std::io::Error::from(std::io::ErrorKind::Other));
        assert!(accept.is_transient());
        assert!(accept.peer().is_none());

        let timeout = HoneypotError::HandshakeTimeout {
            peer: peer(),
            timeout: Duration::from_secs(5),
        };
        assert!(timeout.is_transient());
        assert!(timeout.is_timeout());
        assert_eq!(timeout.peer(), Some(peer()));
    }

    #[test]
    fn test_error_display() {
        let err = HoneypotError::HandshakeTimeout {
            peer: peer(),
            timeout: Duration::from_secs(5),
        };
        assert_eq!(
            err.to_string(),
            "SSH handshake with 203.0.113.45:50022 timed out after 5s"
        );

        let err = HoneypotError::Config("io_timeout must be greater than 0".to_string());
        assert_eq!(
            err.to_string(),
            "Invalid configuration: io_timeout must be greater than 0"
        );
    }
}
