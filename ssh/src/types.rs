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

//! Core types for the honeypot server

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::fmt;

/// Number of random bytes behind a generated [`SessionId`]
pub const SESSION_ID_LEN: usize = 32;

/// Identifier of one completed SSH handshake
///
/// Stored in its standard base64 form, which is also the key into the credential store.
/// Identifiers are drawn from the OS-seeded thread RNG and are never reused within a server's
/// lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(String);

impl SessionId {
    /// Generate a fresh identifier
    pub fn generate() -> Self {
        Self::from_bytes(&rand::random::<[u8; SESSION_ID_LEN]>())
    }

    /// Build an identifier from raw session bytes
    pub fn from_bytes(raw: &[u8]) -> Self {
        Self(STANDARD.encode(raw))
    }

    /// Get the base64 form
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Decode back into the raw session bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        // Only ever built by encoding, so decoding cannot fail.
        STANDARD.decode(&self.0).unwrap_or_default()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Post-authentication activity recorded against a [`Connection`](crate::Connection)
///
/// No kinds are captured yet, so the enum has no variants and every connection carries an
/// empty payload list.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Payload {}
