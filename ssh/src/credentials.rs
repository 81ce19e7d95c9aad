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

//! Credential capture
//!
//! The [`CredentialInterceptor`] is handed to the SSH engine as its password callback. It accepts
//! every offer and records the password in a [`CredentialStore`] keyed by session, where the
//! connection materializer later picks it up.
//!
//! The store is keyed by session rather than by attempt. When a client offers several passwords
//! on one session, only the last one offered before the engine finalizes is kept.

use crate::SessionId;
use dashmap::DashMap;
use metrics::counter;
use russh::server::Auth;
use std::sync::Arc;

/// Passwords offered per session, owned by one `serve` run
#[derive(Debug, Default)]
pub struct CredentialStore {
    passwords: DashMap<SessionId, String>,
}

impl CredentialStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a password for a session, replacing any earlier one
    pub fn record(&self, session_id: &SessionId, password: &str) {
        self.passwords
            .insert(session_id.clone(), password.to_string());
    }

    /// Get the password recorded for a session
    pub fn get(&self, session_id: &SessionId) -> Option<String> {
        self.passwords
            .get(session_id)
            .map(|entry| entry.value().clone())
    }

    /// Remove and return the password recorded for a session
    pub fn take(&self, session_id: &SessionId) -> Option<String> {
        self.passwords
            .remove(session_id)
            .map(|(_, password)| password)
    }

    /// Number of sessions with a recorded password
    pub fn len(&self) -> usize {
        self.passwords.len()
    }

    /// Check if no passwords are recorded
    pub fn is_empty(&self) -> bool {
        self.passwords.is_empty()
    }
}

/// Always-accept password callback
#[derive(Debug, Clone)]
pub struct CredentialInterceptor {
    store: Arc<CredentialStore>,
}

impl CredentialInterceptor {
    /// Create an interceptor writing into `store`
    pub fn new(store: Arc<CredentialStore>) -> Self {
        Self { store }
    }

    /// Record an offered credential and accept it
    pub fn intercept(&self, session_id: &SessionId, username: &str, password: &str) -> Auth {
        tracing::debug!(session = %session_id, username, "Password offered");
        tracing::trace!(session = %session_id, password, "Captured password");
        self.store.record(session_id, password);
        counter!("lure.credentials.offered").increment(1);
        Auth::Accept
    }

    /// Get the store this interceptor writes into
    pub fn store(&self) -> &Arc<CredentialStore> {
        &self.store
    }
}
