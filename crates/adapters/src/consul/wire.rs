// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP wire shapes of the coordination service API

use base64::{engine::general_purpose::STANDARD, Engine};
use kvlock_core::{Consistency, KvEntry, QueryOptions, SessionId, SessionRequest};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One KV pair as returned by `/v1/kv`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct KvPair {
    pub key: String,
    #[serde(default)]
    pub create_index: u64,
    #[serde(default)]
    pub modify_index: u64,
    #[serde(default)]
    pub lock_index: u64,
    #[serde(default)]
    pub flags: u64,
    /// Base64, null for keys stored without a value
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub session: Option<String>,
}

impl KvPair {
    pub fn into_entry(self) -> Result<KvEntry, String> {
        let value = match self.value {
            Some(encoded) => STANDARD
                .decode(encoded.as_bytes())
                .map_err(|e| format!("invalid base64 value for {}: {e}", self.key))?,
            None => Vec::new(),
        };
        Ok(KvEntry {
            key: self.key,
            value,
            flags: self.flags,
            session: self.session.filter(|s| !s.is_empty()).map(SessionId),
            create_index: self.create_index,
            modify_index: self.modify_index,
            lock_index: self.lock_index,
        })
    }
}

pub(crate) fn decode_pairs(body: &str) -> Result<Vec<KvEntry>, String> {
    let pairs: Vec<KvPair> = serde_json::from_str(body).map_err(|e| e.to_string())?;
    pairs.into_iter().map(KvPair::into_entry).collect()
}

/// Body of `/v1/session/create`
#[derive(Debug, Serialize)]
pub(crate) struct SessionCreate {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "TTL")]
    pub ttl: String,
    #[serde(rename = "Behavior")]
    pub behavior: String,
    #[serde(rename = "LockDelay", skip_serializing_if = "Option::is_none")]
    pub lock_delay: Option<String>,
}

impl From<&SessionRequest> for SessionCreate {
    fn from(request: &SessionRequest) -> Self {
        Self {
            name: request.name.clone(),
            ttl: go_duration(request.ttl),
            behavior: request.behavior.as_str().to_string(),
            lock_delay: request.lock_delay.map(go_duration),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct SessionCreated {
    #[serde(rename = "ID")]
    pub id: String,
}

/// Session as returned by `/v1/session/renew`
#[derive(Debug, Deserialize)]
pub(crate) struct SessionInfo {
    #[serde(rename = "TTL", default)]
    pub ttl: String,
}

impl SessionInfo {
    /// Granted TTL, zero when the service reported none
    pub fn ttl(&self) -> Result<Duration, String> {
        if self.ttl.is_empty() {
            return Ok(Duration::ZERO);
        }
        humantime::parse_duration(&self.ttl).map_err(|e| format!("invalid ttl {:?}: {e}", self.ttl))
    }
}

/// Durations in a form the service's parser accepts
pub(crate) fn go_duration(d: Duration) -> String {
    format!("{}ms", d.as_millis())
}

/// Query parameters for a (possibly blocking) read
pub(crate) fn read_params(opts: &QueryOptions) -> Vec<(String, String)> {
    let mut params = Vec::new();
    if opts.wait_index > 0 {
        params.push(("index".to_string(), opts.wait_index.to_string()));
        if !opts.wait_time.is_zero() {
            params.push(("wait".to_string(), go_duration(opts.wait_time)));
        }
    }
    match opts.consistency {
        Consistency::Default => {}
        Consistency::Consistent => params.push(("consistent".to_string(), String::new())),
        Consistency::Stale => params.push(("stale".to_string(), String::new())),
    }
    params
}

/// Parse the `true`/`false` body returned by KV writes
pub(crate) fn parse_bool(body: &str) -> Result<bool, String> {
    match body.trim() {
        "true" => Ok(true),
        "false" => Ok(false),
        other => Err(format!("expected true or false, got {other:?}")),
    }
}

#[cfg(test)]
#[path = "wire_tests.rs"]
mod tests;
