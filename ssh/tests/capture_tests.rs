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

//! End-to-end credential capture tests against a real SSH client

use async_trait::async_trait;
use lure_ssh::{
    Connection, HoneypotError, HoneypotServer, HostnameResolver, NoopResolver, ServerConfig,
};
use russh::SshId;
use russh::client;
use russh_keys::key::PublicKey;
use std::collections::HashSet;
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::mpsc::Receiver;
use tokio::time::timeout;

/// Client handler that trusts any host key
struct TrustingClient;

#[async_trait]
impl client::Handler for TrustingClient {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        _server_public_key: &PublicKey,
    ) -> Result<bool, Self::Error> {
        Ok(true)
    }
}

/// Resolver that names every address the same
struct StaticResolver(&'static str);

#[async_trait]
impl HostnameResolver for StaticResolver {
    async fn reverse(&self, _ip: IpAddr) -> io::Result<Vec<String>> {
        Ok(vec![self.0.to_string()])
    }
}

/// Resolver that always fails
struct BrokenResolver;

#[async_trait]
impl HostnameResolver for BrokenResolver {
    async fn reverse(&self, _ip: IpAddr) -> io::Result<Vec<String>> {
        Err(io::Error::new(io::ErrorKind::Other, "resolver unavailable"))
    }
}

async fn start(
    config: ServerConfig,
    resolver: Arc<dyn HostnameResolver>,
) -> (HoneypotServer, SocketAddr, Receiver<Connection>, Receiver<HoneypotError>) {
    let server = HoneypotServer::with_config(config).unwrap().with_resolver(resolver);
    let (connections, errors) = server.serve().await.unwrap();
    let addr = server.local_addr().unwrap();
    (server, addr, connections, errors)
}

/// Log in with the given credentials and client identification
async fn login(addr: SocketAddr, client_id: &str, username: &str, password: &str) -> bool {
    let config = Arc::new(client::Config {
        client_id: SshId::Standard(client_id.to_string()),
        ..Default::default()
    });
    let mut session = client::connect(config, addr, TrustingClient).await.unwrap();
    session.authenticate_password(username, password).await.unwrap()
}

async fn next_connection(connections: &mut Receiver<Connection>) -> Connection {
    timeout(Duration::from_secs(5), connections.recv())
        .await
        .expect("timed out waiting for a connection event")
        .expect("connections channel closed")
}

#[tokio::test]
async fn test_guest_login_is_captured() {
    let (server, addr, mut connections, mut errors) =
        start(ServerConfig::new("127.0.0.1:0"), Arc::new(NoopResolver)).await;

    assert!(login(addr, "SSH-2.0-TestClient-1.0", "guest", "").await);

    let conn = next_connection(&mut connections).await;
    assert_eq!(conn.username(), "guest");
    assert_eq!(conn.password(), "");
    assert_eq!(conn.client_banner(), "TestClient-1.0");
    assert!(conn.source_address().starts_with("127.0.0.1:"));
    assert!(conn.source_hostname().is_none());
    assert!(conn.payloads().is_empty());
    assert!(!conn.session_id().as_str().is_empty());
    assert!(errors.try_recv().is_err());

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_any_credentials_are_accepted() {
    let (server, addr, mut connections, mut errors) =
        start(ServerConfig::new("127.0.0.1:0"), Arc::new(NoopResolver)).await;

    let long_password = "x".repeat(512);
    let offers = [
        ("root", "hunter2"),
        ("admin", "letmein"),
        ("oracle", "\u{1F600} with spaces"),
        ("nobody", long_password.as_str()),
    ];

    for (username, password) in offers {
        assert!(login(addr, "SSH-2.0-OpenSSH_9.6", username, password).await);
        let conn = next_connection(&mut connections).await;
        assert_eq!(conn.username(), username);
        assert_eq!(conn.password(), password);
        assert_eq!(conn.client_banner(), "OpenSSH_9.6");
    }

    assert!(errors.try_recv().is_err());
    assert_eq!(server.metrics().snapshot().captured, offers.len() as u64);

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_session_ids_are_unique_and_ordered() {
    let (server, addr, mut connections, _errors) =
        start(ServerConfig::new("127.0.0.1:0"), Arc::new(NoopResolver)).await;

    let mut ids = HashSet::new();
    for i in 0..5 {
        let username = format!("user{i}");
        assert!(login(addr, "SSH-2.0-TestClient-1.0", &username, "pw").await);

        let conn = next_connection(&mut connections).await;
        assert_eq!(conn.username(), username);
        assert!(ids.insert(conn.session_id().clone()));
    }
    assert_eq!(ids.len(), 5);

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_silent_client_times_out_and_loop_continues() {
    let config = ServerConfig::new("127.0.0.1:0").with_io_timeout(Duration::from_millis(300));
    let (server, addr, mut connections, mut errors) = start(config, Arc::new(NoopResolver)).await;

    // Connects but never speaks SSH
    let _silent = TcpStream::connect(addr).await.unwrap();

    let err = timeout(Duration::from_secs(5), errors.recv())
        .await
        .expect("timed out waiting for an error event")
        .expect("errors channel closed");
    assert!(err.is_timeout(), "unexpected error: {err}");
    assert!(err.is_transient());
    assert!(connections.try_recv().is_err());

    // Exactly one event for the stalled connection
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert!(errors.try_recv().is_err());

    assert!(login(addr, "SSH-2.0-TestClient-1.0", "root", "toor").await);
    let conn = next_connection(&mut connections).await;
    assert_eq!(conn.password(), "toor");

    let snapshot = server.metrics().snapshot();
    assert_eq!(snapshot.accepted, 2);
    assert_eq!(snapshot.captured, 1);
    assert_eq!(snapshot.timeouts, 1);

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_non_ssh_client_reports_one_error() {
    let (server, addr, mut connections, mut errors) =
        start(ServerConfig::new("127.0.0.1:0"), Arc::new(NoopResolver)).await;

    let mut probe = TcpStream::connect(addr).await.unwrap();
    probe.write_all(b"GET / HTTP/1.1\r\nHost: x\r\n\r\n").await.unwrap();
    drop(probe);

    let err = timeout(Duration::from_secs(5), errors.recv())
        .await
        .unwrap()
        .unwrap();
    assert!(err.is_transient());
    assert!(!err.is_timeout());
    assert!(err.peer().unwrap().ip().is_loopback());
    assert!(connections.try_recv().is_err());

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_server_banner_is_presented() {
    let config =
        ServerConfig::new("127.0.0.1:0").with_server_banner("SSH-2.0-OpenSSH_7.4");
    let (server, addr, _connections, _errors) = start(config, Arc::new(NoopResolver)).await;

    let stream = TcpStream::connect(addr).await.unwrap();
    let mut reader = BufReader::new(stream);
    let mut line = String::new();
    timeout(Duration::from_secs(5), reader.read_line(&mut line))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(line, "SSH-2.0-OpenSSH_7.4\r\n");

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_hostname_is_resolved() {
    let (server, addr, mut connections, _errors) = start(
        ServerConfig::new("127.0.0.1:0"),
        Arc::new(StaticResolver("scanner.example.net")),
    )
    .await;

    assert!(login(addr, "SSH-2.0-TestClient-1.0", "pi", "raspberry").await);
    let conn = next_connection(&mut connections).await;
    assert_eq!(conn.source_hostname(), Some("scanner.example.net"));

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_resolver_failure_is_not_an_error_event() {
    let (server, addr, mut connections, mut errors) =
        start(ServerConfig::new("127.0.0.1:0"), Arc::new(BrokenResolver)).await;

    assert!(login(addr, "SSH-2.0-TestClient-1.0", "ubnt", "ubnt").await);
    let conn = next_connection(&mut connections).await;
    assert_eq!(conn.source_hostname(), None);
    assert_eq!(conn.username(), "ubnt");
    assert!(errors.try_recv().is_err());
    assert_eq!(server.metrics().snapshot().lookup_failures, 1);

    server.shutdown().await.unwrap();
}
