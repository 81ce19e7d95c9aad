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

//! Lock-free metrics for the honeypot server

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Lock-free server metrics
///
/// All counters are atomics updated by the accept loop and readable from any task.
/// Use the `snapshot()` method to get a view of all of them at a point in time.
#[derive(Debug)]
pub struct ServerMetrics {
    accepted: AtomicU64,
    captured: AtomicU64,

    accept_errors: AtomicU64,
    handshake_errors: AtomicU64,
    timeouts: AtomicU64,
    undecodable_credentials: AtomicU64,

    lookup_failures: AtomicU64,
    dropped_events: AtomicU64,

    started_at: Instant,
}

impl Default for ServerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerMetrics {
    /// Create a new metrics instance
    pub fn new() -> Self {
        Self {
            accepted: AtomicU64::new(0),
            captured: AtomicU64::new(0),
            accept_errors: AtomicU64::new(0),
            handshake_errors: AtomicU64::new(0),
            timeouts: AtomicU64::new(0),
            undecodable_credentials: AtomicU64::new(0),
            lookup_failures: AtomicU64::new(0),
            dropped_events: AtomicU64::new(0),
            started_at: Instant::now(),
        }
    }

    /// Record a TCP connection being accepted
    pub fn connection_accepted(&self) {
        self.accepted.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a completed handshake turned into a connection event
    pub fn credentials_captured(&self) {
        self.captured.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a failed accept
    pub fn accept_error(&self) {
        self.accept_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a failed handshake
    pub fn handshake_error(&self) {
        self.handshake_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a handshake that ran into the I/O deadline
    ///
    /// Timeouts are also handshake errors and are counted in both.
    pub fn timeout_error(&self) {
        self.timeouts.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a handshake aborted on a username or password that is not UTF-8
    ///
    /// Also counted as a handshake error.
    pub fn undecodable_credentials(&self) {
        self.undecodable_credentials.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a reverse lookup that produced no hostname
    pub fn lookup_failure(&self) {
        self.lookup_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an event that could not be delivered because its receiver is gone
    pub fn event_dropped(&self) {
        self.dropped_events.fetch_add(1, Ordering::Relaxed);
    }

    /// Get the number of accepted TCP connections
    pub fn accepted(&self) -> u64 {
        self.accepted.load(Ordering::Relaxed)
    }

    /// Get the number of captured connections
    pub fn captured(&self) -> u64 {
        self.captured.load(Ordering::Relaxed)
    }

    /// Get a snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            accepted: self.accepted.load(Ordering::Relaxed),
            captured: self.captured.load(Ordering::Relaxed),
            accept_errors: self.accept_errors.load(Ordering::Relaxed),
            handshake_errors: self.handshake_errors.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            undecodable_credentials: self.undecodable_credentials.load(Ordering::Relaxed),
            lookup_failures: self.lookup_failures.load(Ordering::Relaxed),
            dropped_events: self.dropped_events.load(Ordering::Relaxed),
            uptime: self.started_at.elapsed(),
        }
    }
}

/// A snapshot of server metrics at a point in time
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    /// Accepted TCP connections
    pub accepted: u64,
    /// Connections that completed authentication
    pub captured: u64,
    /// Failed accepts
    pub accept_errors: u64,
    /// Failed handshakes, timeouts included
    pub handshake_errors: u64,
    /// Handshakes cut off by the I/O deadline
    pub timeouts: u64,
    /// Handshakes lost to credentials the engine could not decode
    pub undecodable_credentials: u64,
    /// Reverse lookups without a result
    pub lookup_failures: u64,
    /// Events discarded because nobody was receiving
    pub dropped_events: u64,
    /// Time since the metrics were created
    pub uptime: Duration,
}

impl MetricsSnapshot {
    /// Calculate total error count
    pub fn total_errors(&self) -> u64 {
        self.accept_errors + self.handshake_errors
    }

    /// Fraction of accepted connections that were captured
    pub fn capture_rate(&self) -> f64 {
        if self.accepted == 0 {
            return 0.0;
        }
        self.captured as f64 / self.accepted as f64
    }
}
