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

//! Reverse hostname resolution
//!
//! Resolution is best effort: failures and timeouts leave the hostname empty and are only
//! visible through logs and metrics.

use async_trait::async_trait;
use std::io;
use std::net::IpAddr;
use std::time::Duration;

/// Reverse lookup of an address into hostnames
#[async_trait]
pub trait HostnameResolver: Send + Sync {
    /// Resolve `ip` into zero or more hostnames
    async fn reverse(&self, ip: IpAddr) -> io::Result<Vec<String>>;
}

/// Resolver backed by the system's `getnameinfo`
///
/// Lookups block, so they run on the blocking pool.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemResolver;

#[async_trait]
impl HostnameResolver for SystemResolver {
    async fn reverse(&self, ip: IpAddr) -> io::Result<Vec<String>> {
        let name = tokio::task::spawn_blocking(move || dns_lookup::lookup_addr(&ip))
            .await
            .map_err(io::Error::other)??;

        // getnameinfo falls back to the numeric form when no PTR record exists
        if name == ip.to_string() {
            return Ok(Vec::new());
        }
        Ok(vec![name])
    }
}

/// Resolver that never resolves anything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopResolver;

#[async_trait]
impl HostnameResolver for NoopResolver {
    async fn reverse(&self, _ip: IpAddr) -> io::Result<Vec<String>> {
        Ok(Vec::new())
    }
}

/// Why a lookup produced no hostname
#[derive(Debug)]
pub(crate) enum LookupFailure {
    Error(io::Error),
    TimedOut,
    NoName,
}

/// Run a bounded lookup and keep the first name
pub(crate) async fn first_hostname(
    resolver: &dyn HostnameResolver,
    ip: IpAddr,
    timeout: Duration,
) -> Result<String, LookupFailure> {
    match tokio::time::timeout(timeout, resolver.reverse(ip)).await {
        Ok(Ok(names)) => names.into_iter().next().ok_or(LookupFailure::NoName),
        Ok(Err(e)) => Err(LookupFailure::Error(e)),
        Err(_) => Err(LookupFailure::TimedOut),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    struct SlowResolver;

    #[async_trait]
    impl HostnameResolver for SlowResolver {
        async fn reverse(&self, _ip: IpAddr) -> io::Result<Vec<String>> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(vec!["never.example".to_string()])
        }
    }

    struct ManyNames;

    #[async_trait]
    impl HostnameResolver for ManyNames {
        async fn reverse(&self, _ip: IpAddr) -> io::Result<Vec<String>> {
            Ok(vec!["first.example".to_string(), "second.example".to_string()])
        }
    }

    fn addr() -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(198, 51, 100, 7))
    }

    #[tokio::test]
    async fn test_noop_resolver_is_empty() {
        let result = first_hostname(&NoopResolver, addr(), Duration::from_secs(1)).await;
        assert!(matches!(result, Err(LookupFailure::NoName)));
    }

    #[tokio::test]
    async fn test_first_name_is_used() {
        let result = first_hostname(&ManyNames, addr(), Duration::from_secs(1)).await;
        assert_eq!(result.unwrap(), "first.example");
    }

    #[tokio::test(start_paused = true)]
    async fn test_lookup_is_bounded() {
        let result = first_hostname(&SlowResolver, addr(), Duration::from_millis(100)).await;
        assert!(matches!(result, Err(LookupFailure::TimedOut)));
    }
}
