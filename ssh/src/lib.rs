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

//! SSH Honeypot Server
//!
//! This crate masquerades as an open SSH server. Every username/password combination is
//! accepted, and each login is turned into a [`Connection`] record describing who connected,
//! from where, with which client and with which credentials.
//!
//! # Architecture
//!
//! ```text
//! HoneypotServer
//!     ↓ serve()
//! accept loop ── TcpListener ── DeadlineStream
//!     ↓                              ↓
//! russh session ── CaptureHandler ── CredentialInterceptor → CredentialStore
//!     ↓
//! Materializer → Connection ─→ mpsc::Receiver<Connection>
//!             errors ────────→ mpsc::Receiver<HoneypotError>
//! ```
//!
//! Connections are handled one at a time. Every accepted stream gets an absolute I/O deadline
//! (5 seconds by default) covering the handshake and anything after it.
//!
//! # Example
//!
//! ```no_run
//! use lure_ssh::{HoneypotServer, ServerConfig};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig::new("0.0.0.0:2222").with_io_timeout(Duration::from_secs(10));
//!     let server = HoneypotServer::with_config(config)?;
//!     let (mut connections, _errors) = server.serve().await?;
//!
//!     if let Some(conn) = connections.recv().await {
//!         println!("{} tried {:?}", conn.username(), conn.password());
//!     }
//!
//!     server.shutdown().await?;
//!     Ok(())
//! }
//! ```

mod config;
mod connection;
mod credentials;
mod deadline;
mod error;
mod handshake;
mod hostkey;
mod metrics;
mod resolver;
mod server;
mod types;

pub use config::{DEFAULT_SERVER_BANNER, ServerConfig};
pub use connection::Connection;
pub use credentials::{CredentialInterceptor, CredentialStore};
pub use deadline::DeadlineStream;
pub use error::{HoneypotError, Result};
pub use handshake::Handshake;
pub use hostkey::generate_host_key;
pub use self::metrics::{MetricsSnapshot, ServerMetrics};
pub use resolver::{HostnameResolver, NoopResolver, SystemResolver};
pub use server::{EventChannels, HoneypotServer};
pub use types::{Payload, SESSION_ID_LEN, SessionId};
