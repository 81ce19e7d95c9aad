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

//! Server configuration

use crate::{HoneypotError, Result};
use std::time::Duration;

/// Default identification string sent to clients
///
/// Mirrors a stock Ubuntu OpenSSH install so the honeypot does not stand out in a banner scan.
pub const DEFAULT_SERVER_BANNER: &str = "SSH-2.0-OpenSSH_8.9p1 Ubuntu-3ubuntu0.6";

/// Server configuration
///
/// This structure contains all configuration options for the honeypot server.
/// Use the builder pattern methods to customize the configuration.
///
/// # Example
///
/// ```
/// use lure_ssh::ServerConfig;
/// use std::time::Duration;
///
/// let config = ServerConfig::new("0.0.0.0:2222")
///     .with_io_timeout(Duration::from_secs(10))
///     .with_event_buffer(64);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// `host:port` to listen on
    ///
    /// An empty or `0` port picks a free port and an empty host listens on every interface.
    pub address: String,

    /// Read/write deadline applied to every accepted connection
    ///
    /// The deadline is absolute: it starts when the connection is accepted and covers the
    /// handshake as well as anything the client does after authenticating.
    pub io_timeout: Duration,

    /// SSH identification string presented to clients
    pub server_banner: String,

    /// Capacity of each of the connection and error channels
    pub event_buffer: usize,

    /// Upper bound on reverse hostname resolution per connection
    pub lookup_timeout: Duration,

    /// Pause after a failed accept before trying again
    pub accept_backoff: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: "0.0.0.0:2222".to_string(),
            io_timeout: Duration::from_secs(5),
            server_banner: DEFAULT_SERVER_BANNER.to_string(),
            event_buffer: 32,
            lookup_timeout: Duration::from_secs(2),
            accept_backoff: Duration::from_millis(100),
        }
    }
}

impl ServerConfig {
    /// Create a new configuration with the given listen address
    ///
    /// All other settings will use their default values.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            ..Default::default()
        }
    }

    /// Set the per-connection I/O deadline
    pub fn with_io_timeout(mut self, timeout: Duration) -> Self {
        self.io_timeout = timeout;
        self
    }

    /// Set the identification string presented to clients
    pub fn with_server_banner(mut self, banner: impl Into<String>) -> Self {
        self.server_banner = banner.into();
        self
    }

    /// Set the capacity of the event channels
    pub fn with_event_buffer(mut self, capacity: usize) -> Self {
        self.event_buffer = capacity;
        self
    }

    /// Set the reverse hostname resolution bound
    pub fn with_lookup_timeout(mut self, timeout: Duration) -> Self {
        self.lookup_timeout = timeout;
        self
    }

    /// Set the pause after a failed accept
    pub fn with_accept_backoff(mut self, backoff: Duration) -> Self {
        self.accept_backoff = backoff;
        self
    }

    /// Address handed to the listener
    ///
    /// Fills in what `address` leaves out: `""` becomes `0.0.0.0:0`, `"127.0.0.1:"` becomes
    /// `127.0.0.1:0` and `":2222"` becomes `0.0.0.0:2222`. Anything else is passed through.
    pub fn bind_address(&self) -> String {
        let address = self.address.trim();
        if address.is_empty() {
            return "0.0.0.0:0".to_string();
        }
        match address.rsplit_once(':') {
            Some((host, port)) => {
                let host = if host.is_empty() { "0.0.0.0" } else { host };
                let port = if port.is_empty() { "0" } else { port };
                format!("{host}:{port}")
            }
            None => address.to_string(),
        }
    }

    /// Validate the configuration
    ///
    /// Returns [`HoneypotError::Config`] describing the first invalid setting. The address is
    /// not checked here; an unusable one surfaces as [`HoneypotError::Bind`] when serving.
    pub fn validate(&self) -> Result<()> {
        if self.io_timeout.is_zero() {
            return Err(HoneypotError::Config(
                "io_timeout must be greater than 0".to_string(),
            ));
        }

        if self.lookup_timeout.is_zero() {
            return Err(HoneypotError::Config(
                "lookup_timeout must be greater than 0".to_string(),
            ));
        }

        if self.event_buffer == 0 {
            return Err(HoneypotError::Config(
                "event_buffer must be greater than 0".to_string(),
            ));
        }

        if !self.server_banner.starts_with("SSH-2.0-") {
            return Err(HoneypotError::Config(format!(
                "server_banner must start with SSH-2.0-, got {:?}",
                self.server_banner
            )));
        }

        Ok(())
    }
}
