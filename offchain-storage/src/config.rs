// This file is part of midnight-offchain-storage.
// Copyright (C) 2025 Midnight Foundation
// SPDX-License-Identifier: Apache-2.0
// Licensed under the Apache License, Version 2.0 (the "License");
// You may not use this file except in compliance with the License.
// You may obtain a copy of the License at
// http://www.apache.org/licenses/LICENSE-2.0
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Environment-driven configuration for storage clients.

use crate::LogLevel;
use crate::policy::{DEFAULT_CAPACITY, DEFAULT_TREE_HEIGHT, StorePolicy};
use anyhow::Context;
use lazy_static::lazy_static;
use reqwest::Url;
use std::time::Duration;

/// The storage server URL used when `$OFFCHAIN_STORAGE_URL` is not set.
pub const DEFAULT_SERVER_URL: &str = "http://localhost:3001/";
/// The request timeout used when `$OFFCHAIN_STORAGE_TIMEOUT_SECS` is not set.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

lazy_static! {
    static ref DEFAULT_URL: Url =
        Url::parse(DEFAULT_SERVER_URL).expect("default storage server URL should be valid");
}

/// Where to find the storage server, and the shape of the stores it holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    pub server_url: Url,
    pub height: u16,
    pub capacity: u64,
    pub request_timeout: Duration,
    pub log_level: LogLevel,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            server_url: DEFAULT_URL.clone(),
            height: DEFAULT_TREE_HEIGHT,
            capacity: DEFAULT_CAPACITY,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            log_level: LogLevel::default(),
        }
    }
}

impl StorageConfig {
    /// Reads `$OFFCHAIN_STORAGE_URL`, `$OFFCHAIN_STORAGE_HEIGHT`,
    /// `$OFFCHAIN_STORAGE_CAPACITY`, `$OFFCHAIN_STORAGE_TIMEOUT_SECS`, and
    /// `$OFFCHAIN_STORAGE_LOG`,
    /// falling back to the defaults for any that are unset.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let mut config = StorageConfig::default();
        if let Some(url) = lookup("OFFCHAIN_STORAGE_URL") {
            config.server_url =
                Url::parse(&url).with_context(|| format!("$OFFCHAIN_STORAGE_URL ({url}) should be a valid URL"))?;
        }
        if let Some(height) = lookup("OFFCHAIN_STORAGE_HEIGHT") {
            config.height = height
                .parse()
                .with_context(|| format!("$OFFCHAIN_STORAGE_HEIGHT ({height}) should be an integer"))?;
        }
        if let Some(capacity) = lookup("OFFCHAIN_STORAGE_CAPACITY") {
            config.capacity = capacity
                .parse()
                .with_context(|| format!("$OFFCHAIN_STORAGE_CAPACITY ({capacity}) should be an integer"))?;
        }
        if let Some(secs) = lookup("OFFCHAIN_STORAGE_TIMEOUT_SECS") {
            config.request_timeout = Duration::from_secs(
                secs.parse()
                    .with_context(|| format!("$OFFCHAIN_STORAGE_TIMEOUT_SECS ({secs}) should be an integer"))?,
            );
        }
        if let Some(level) = lookup("OFFCHAIN_STORAGE_LOG") {
            config.log_level = level
                .parse()
                .context("$OFFCHAIN_STORAGE_LOG should name a log level")?;
        }
        config.store_policy()?;
        Ok(config)
    }

    /// The policy every store under this configuration is verified against.
    pub fn store_policy(&self) -> anyhow::Result<StorePolicy> {
        Ok(StorePolicy::new(self.height, self.capacity)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_in(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = StorageConfig::from_lookup(lookup_in(&[])).unwrap();
        assert_eq!(config, StorageConfig::default());
        assert_eq!(config.store_policy().unwrap(), StorePolicy::default());
        assert_eq!(config.server_url.as_str(), DEFAULT_SERVER_URL);
    }

    #[test]
    fn test_overrides() {
        let config = StorageConfig::from_lookup(lookup_in(&[
            ("OFFCHAIN_STORAGE_URL", "https://storage.example.org/v1/"),
            ("OFFCHAIN_STORAGE_HEIGHT", "16"),
            ("OFFCHAIN_STORAGE_CAPACITY", "1000"),
            ("OFFCHAIN_STORAGE_TIMEOUT_SECS", "5"),
            ("OFFCHAIN_STORAGE_LOG", "debug"),
        ]))
        .unwrap();
        assert_eq!(config.server_url.host_str(), Some("storage.example.org"));
        assert_eq!(config.height, 16);
        assert_eq!(config.capacity, 1000);
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.log_level, LogLevel::Debug);
    }

    #[test]
    fn test_invalid_values() {
        assert!(StorageConfig::from_lookup(lookup_in(&[("OFFCHAIN_STORAGE_URL", "not a url")])).is_err());
        assert!(StorageConfig::from_lookup(lookup_in(&[("OFFCHAIN_STORAGE_HEIGHT", "eight")])).is_err());
        assert!(StorageConfig::from_lookup(lookup_in(&[("OFFCHAIN_STORAGE_HEIGHT", "0")])).is_err());
        assert!(StorageConfig::from_lookup(lookup_in(&[("OFFCHAIN_STORAGE_HEIGHT", "257")])).is_err());
        assert!(StorageConfig::from_lookup(lookup_in(&[("OFFCHAIN_STORAGE_LOG", "loud")])).is_err());
    }
}
