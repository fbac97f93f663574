// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Registry configuration.
//!
//! Defaults are fixed; [`RegistryConfig::from_env`] overlays values from the
//! process environment:
//!
//! | Variable | Field |
//! |----------|-------|
//! | `TAGWIRE_MAX_DERIVATION_DEPTH` | `max_derivation_depth` |
//! | `TAGWIRE_MAX_SEQUENCE_LEN` | `max_sequence_len` |
//! | `TAGWIRE_BUILTIN_LEAVES` | `builtin_leaves` (`1`/`true`/`yes`/`on`) |
//!
//! Unparsable values are ignored with a warning.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub const ENV_MAX_DERIVATION_DEPTH: &str = "TAGWIRE_MAX_DERIVATION_DEPTH";
pub const ENV_MAX_SEQUENCE_LEN: &str = "TAGWIRE_MAX_SEQUENCE_LEN";
pub const ENV_BUILTIN_LEAVES: &str = "TAGWIRE_BUILTIN_LEAVES";

/// Nesting depth allowed while deriving codecs for nested field types.
pub const DEFAULT_MAX_DERIVATION_DEPTH: usize = 64;

/// Largest element count accepted when decoding an array (16 Mi elements).
pub const DEFAULT_MAX_SEQUENCE_LEN: usize = 16 * 1024 * 1024;

/// Limits and bootstrap options for a [`TypeRegistry`](crate::TypeRegistry).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RegistryConfig {
    /// Types being derived at once before registration is refused.
    pub max_derivation_depth: usize,

    /// Decoded array counts above this fail instead of allocating.
    pub max_sequence_len: usize,

    /// Register every leaf codec (and its array) when the registry is built.
    pub builtin_leaves: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            max_derivation_depth: DEFAULT_MAX_DERIVATION_DEPTH,
            max_sequence_len: DEFAULT_MAX_SEQUENCE_LEN,
            builtin_leaves: false,
        }
    }
}

impl RegistryConfig {
    /// Defaults overlaid with the `TAGWIRE_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overlaid with whatever `lookup` returns for each variable.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(depth) = parse_var(&lookup, ENV_MAX_DERIVATION_DEPTH, parse_count) {
            config.max_derivation_depth = depth;
        }
        if let Some(len) = parse_var(&lookup, ENV_MAX_SEQUENCE_LEN, parse_count) {
            config.max_sequence_len = len;
        }
        if let Some(flag) = parse_var(&lookup, ENV_BUILTIN_LEAVES, parse_flag) {
            config.builtin_leaves = flag;
        }

        config
    }

    pub fn with_max_derivation_depth(mut self, depth: usize) -> Self {
        self.max_derivation_depth = depth;
        self
    }

    pub fn with_max_sequence_len(mut self, len: usize) -> Self {
        self.max_sequence_len = len;
        self
    }

    pub fn with_builtin_leaves(mut self, enabled: bool) -> Self {
        self.builtin_leaves = enabled;
        self
    }
}

fn parse_var<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    parse: impl Fn(&str) -> Option<T>,
) -> Option<T> {
    let raw = lookup(key)?;
    let parsed = parse(raw.trim());
    if parsed.is_none() {
        log::warn!("[tagwire] ignoring {}={:?}: not a valid value", key, raw);
    }
    parsed
}

fn parse_count(raw: &str) -> Option<usize> {
    raw.parse().ok()
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = RegistryConfig::default();
        assert_eq!(config.max_derivation_depth, 64);
        assert_eq!(config.max_sequence_len, 16 * 1024 * 1024);
        assert!(!config.builtin_leaves);
    }

    #[test]
    fn test_lookup_overlay() {
        let config = RegistryConfig::from_lookup(lookup(&[
            (ENV_MAX_DERIVATION_DEPTH, "8"),
            (ENV_MAX_SEQUENCE_LEN, " 1024 "),
            (ENV_BUILTIN_LEAVES, "Yes"),
        ]));
        assert_eq!(config.max_derivation_depth, 8);
        assert_eq!(config.max_sequence_len, 1024);
        assert!(config.builtin_leaves);
    }

    #[test]
    fn test_invalid_values_keep_defaults() {
        let config = RegistryConfig::from_lookup(lookup(&[
            (ENV_MAX_DERIVATION_DEPTH, "deep"),
            (ENV_MAX_SEQUENCE_LEN, "-1"),
            (ENV_BUILTIN_LEAVES, "maybe"),
        ]));
        assert_eq!(config, RegistryConfig::default());
    }

    #[test]
    fn test_builder_setters() {
        let config = RegistryConfig::default()
            .with_max_derivation_depth(2)
            .with_max_sequence_len(10)
            .with_builtin_leaves(true);
        assert_eq!(config.max_derivation_depth, 2);
        assert_eq!(config.max_sequence_len, 10);
        assert!(config.builtin_leaves);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_json_partial_document_uses_defaults() {
        let config: RegistryConfig = serde_json::from_str(r#"{ "max_sequence_len": 256 }"#)
            .expect("Config JSON should parse");
        assert_eq!(config.max_sequence_len, 256);
        assert_eq!(config.max_derivation_depth, DEFAULT_MAX_DERIVATION_DEPTH);

        let json = serde_json::to_string(&config).expect("Config should serialize");
        assert!(json.contains("\"builtin_leaves\":false"));
    }
}
