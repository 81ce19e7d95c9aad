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

//! Credential Capture Demo
//!
//! Runs the honeypot on port 2222 and prints every captured login.
//!
//! ## Usage
//!
//! ```bash
//! RUST_LOG=lure_ssh=debug cargo run --example capture_server
//! ```
//!
//! Then log in with any credentials:
//! ```bash
//! ssh -p 2222 root@localhost
//! ```

use lure_ssh::{HoneypotServer, ServerConfig};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = ServerConfig::new("0.0.0.0:2222").with_io_timeout(Duration::from_secs(30));
    let server = HoneypotServer::with_config(config)?;
    let (mut connections, mut errors) = server.serve().await?;

    println!("SSH honeypot running on {:?}", server.local_addr());
    println!("Press Ctrl+C to stop");

    tokio::spawn(async move {
        while let Some(err) = errors.recv().await {
            eprintln!("error: {err}");
        }
    });

    loop {
        tokio::select! {
            conn = connections.recv() => match conn {
                Some(conn) => println!("{conn} password={:?}", conn.password()),
                None => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    server.shutdown().await?;

    let stats = server.metrics().snapshot();
    println!(
        "accepted={} captured={} errors={}",
        stats.accepted,
        stats.captured,
        stats.total_errors()
    );

    Ok(())
}
