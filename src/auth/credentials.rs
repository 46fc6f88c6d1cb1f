//! Credential store backed by a delimited record file
//!
//! One record per line: `<username digest>,<password digest>`.

use super::digest::{encode_password, encode_username};
use crate::error::{Result, TunnelError};
use std::collections::HashMap;
use std::path::Path;

/// Username digest to password digest lookup, built once at startup
#[derive(Debug, Clone, Default)]
pub struct CredentialStore {
    records: HashMap<String, String>,
}

impl CredentialStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Load records from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            TunnelError::Config(format!(
                "cannot read credential file {:?}: {}",
                path.as_ref(),
                e
            ))
        })?;
        let store = Self::parse(&content)?;
        tracing::info!(records = store.len(), "Loaded credential store");
        Ok(store)
    }

    /// Parse records from file content
    pub fn parse(content: &str) -> Result<Self> {
        let mut store = Self::new();

        for (index, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split(',').map(str::trim).collect();
            match fields.as_slice() {
                [username, password] => store.insert(*username, *password),
                _ => {
                    return Err(TunnelError::Config(format!(
                        "credential line {} has {} fields, expected 2",
                        index + 1,
                        fields.len()
                    )))
                }
            }
        }

        Ok(store)
    }

    /// Insert a record of already digested values
    pub fn insert(&mut self, username_digest: impl Into<String>, password_digest: impl Into<String>) {
        self.records
            .insert(username_digest.into(), password_digest.into());
    }

    /// Insert a record from plain values, digesting them first
    pub fn insert_plain(&mut self, username: &str, password: &str) {
        self.insert(encode_username(username), encode_password(password));
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the store holds no records
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Check a username digest / password digest pair
    pub fn verify(&self, username: &str, password: &str) -> bool {
        let matched = self
            .records
            .get(username)
            .map(|expected| constant_time_compare(password.as_bytes(), expected.as_bytes()))
            .unwrap_or(false);

        if matched {
            tracing::info!("User signed in");
        } else {
            tracing::warn!("Wrong username or password");
        }
        matched
    }
}

/// Constant-time comparison of two byte slices
fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}
