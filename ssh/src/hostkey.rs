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

//! Host identity key

use crate::{HoneypotError, Result};
use russh_keys::key::KeyPair;

/// Generate a fresh ed25519 host key
///
/// A new identity is produced for every `serve` run; nothing is written to disk.
pub fn generate_host_key() -> Result<KeyPair> {
    KeyPair::generate_ed25519()
        .ok_or_else(|| HoneypotError::HostKey("ed25519 key generation produced no key".to_string()))
}
