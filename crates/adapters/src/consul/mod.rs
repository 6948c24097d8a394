// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP client for a Consul-compatible coordination service
//!
//! ureq is blocking, so every request runs on the blocking pool. Blocking
//! queries hold a pool thread for up to their wait time.

mod wire;

use crate::kv::{required_session, KvError, KvStore};
use crate::session::{SessionError, SessionService};
use async_trait::async_trait;
use kvlock_core::{validate_key, KvEntry, QueryOptions, QueryResponse, SessionId, SessionRequest};
use std::sync::Arc;
use std::time::Duration;
use ureq::{Agent, RequestBuilder};

/// Environment variable naming the service address
pub const ADDRESS_ENV: &str = "KVLOCK_HTTP_ADDR";
/// Environment variable holding the ACL token
pub const TOKEN_ENV: &str = "KVLOCK_HTTP_TOKEN";
/// Environment variable naming the datacenter
pub const DATACENTER_ENV: &str = "KVLOCK_DATACENTER";

const DEFAULT_ADDRESS: &str = "127.0.0.1:8500";
const TOKEN_HEADER: &str = "X-Consul-Token";
const INDEX_HEADER: &str = "X-Consul-Index";

/// Connection settings for [`ConsulClient`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsulConfig {
    /// `host:port` or a full `http(s)://` URL
    pub address: String,
    pub token: Option<String>,
    pub datacenter: Option<String>,
    pub connect_timeout: Duration,
}

impl Default for ConsulConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS.to_string(),
            token: None,
            datacenter: None,
            connect_timeout: Duration::from_secs(5),
        }
    }
}

impl ConsulConfig {
    /// Defaults overridden by `KVLOCK_HTTP_ADDR`, `KVLOCK_HTTP_TOKEN` and
    /// `KVLOCK_DATACENTER`
    pub fn from_env() -> Self {
        let var = |name| std::env::var(name).ok().filter(|v: &String| !v.is_empty());
        let mut config = Self::default();
        if let Some(address) = var(ADDRESS_ENV) {
            config.address = address;
        }
        config.token = var(TOKEN_ENV);
        config.datacenter = var(DATACENTER_ENV);
        config
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = address.into();
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_datacenter(mut self, datacenter: impl Into<String>) -> Self {
        self.datacenter = Some(datacenter.into());
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn base_url(&self) -> String {
        let address = self.address.trim_end_matches('/');
        if address.contains("://") {
            address.to_string()
        } else {
            format!("http://{address}")
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Method {
    Get,
    Put,
    Delete,
}

struct Request {
    method: Method,
    path: String,
    params: Vec<(String, String)>,
    body: Option<Vec<u8>>,
}

impl Request {
    fn new(method: Method, path: String) -> Self {
        Self {
            method,
            path,
            params: Vec::new(),
            body: None,
        }
    }

    fn param(mut self, name: &str, value: impl ToString) -> Self {
        self.params.push((name.to_string(), value.to_string()));
        self
    }

    fn params(mut self, params: Vec<(String, String)>) -> Self {
        self.params.extend(params);
        self
    }

    fn body(mut self, body: Vec<u8>) -> Self {
        self.body = Some(body);
        self
    }
}

struct Response {
    status: u16,
    index: u64,
    body: String,
}

impl Response {
    fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// [`KvStore`] and [`SessionService`] over the service's HTTP API
#[derive(Clone)]
pub struct ConsulClient {
    agent: Agent,
    config: Arc<ConsulConfig>,
}

impl ConsulClient {
    pub fn new(config: ConsulConfig) -> Self {
        let agent_config = Agent::config_builder()
            .http_status_as_error(false)
            .timeout_connect(Some(config.connect_timeout))
            .build();
        Self {
            agent: Agent::new_with_config(agent_config),
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &ConsulConfig {
        &self.config
    }

    async fn send(&self, request: Request) -> Result<Response, String> {
        let agent = self.agent.clone();
        let config = Arc::clone(&self.config);
        tokio::task::spawn_blocking(move || execute(&agent, &config, request))
            .await
            .map_err(|e| format!("request task failed: {e}"))?
    }

    async fn kv_write(&self, request: Request) -> Result<bool, KvError> {
        let response = self.send(request).await.map_err(KvError::Unavailable)?;
        if !response.is_success() {
            return Err(kv_status(response));
        }
        wire::parse_bool(&response.body).map_err(KvError::Decode)
    }

    async fn kv_read(
        &self,
        path: String,
        opts: &QueryOptions,
        recurse: bool,
    ) -> Result<QueryResponse<Vec<KvEntry>>, KvError> {
        let mut request = Request::new(Method::Get, path).params(wire::read_params(opts));
        if recurse {
            request = request.param("recurse", "true");
        }
        let response = self.send(request).await.map_err(KvError::Unavailable)?;
        match response.status {
            404 => Ok(QueryResponse::new(Vec::new(), response.index)),
            _ if response.is_success() => {
                let entries = wire::decode_pairs(&response.body).map_err(KvError::Decode)?;
                Ok(QueryResponse::new(entries, response.index))
            }
            _ => Err(kv_status(response)),
        }
    }

    async fn session_call(&self, request: Request) -> Result<Response, SessionError> {
        self.send(request).await.map_err(SessionError::Unavailable)
    }
}

fn kv_path(key: &str) -> String {
    format!("/v1/kv/{key}")
}

fn kv_status(response: Response) -> KvError {
    KvError::Status {
        status: response.status,
        body: response.body.trim().to_string(),
    }
}

fn session_status(response: Response) -> SessionError {
    SessionError::Status {
        status: response.status,
        body: response.body.trim().to_string(),
    }
}

fn decorate<B>(
    mut builder: RequestBuilder<B>,
    config: &ConsulConfig,
    params: &[(String, String)],
) -> RequestBuilder<B> {
    for (name, value) in params {
        builder = builder.query(name, value);
    }
    if let Some(dc) = &config.datacenter {
        builder = builder.query("dc", dc);
    }
    if let Some(token) = &config.token {
        builder = builder.header(TOKEN_HEADER, token.as_str());
    }
    builder
}

fn execute(agent: &Agent, config: &ConsulConfig, request: Request) -> Result<Response, String> {
    let url = format!("{}{}", config.base_url(), request.path);
    let result = match request.method {
        Method::Get => decorate(agent.get(&url), config, &request.params).call(),
        Method::Delete => decorate(agent.delete(&url), config, &request.params).call(),
        Method::Put => {
            let builder = decorate(agent.put(&url), config, &request.params);
            match &request.body {
                Some(body) => builder.send(&body[..]),
                None => builder.send_empty(),
            }
        }
    };
    let mut response = result.map_err(|e| format!("{url}: {e}"))?;
    let status = response.status().as_u16();
    let index = response
        .headers()
        .get(INDEX_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    let body = response
        .body_mut()
        .read_to_string()
        .map_err(|e| format!("{url}: failed to read response: {e}"))?;
    Ok(Response {
        status,
        index,
        body,
    })
}

fn write_request(entry: &KvEntry) -> Request {
    let request = Request::new(Method::Put, kv_path(&entry.key)).body(entry.value.clone());
    if entry.flags != 0 {
        request.param("flags", entry.flags)
    } else {
        request
    }
}

#[async_trait]
impl KvStore for ConsulClient {
    async fn get(
        &self,
        key: &str,
        opts: &QueryOptions,
    ) -> Result<QueryResponse<Option<KvEntry>>, KvError> {
        validate_key(key)?;
        let response = self.kv_read(kv_path(key), opts, false).await?;
        let last_index = response.last_index;
        Ok(QueryResponse::new(
            response.value.into_iter().find(|e| e.key == key),
            last_index,
        ))
    }

    async fn list(
        &self,
        prefix: &str,
        opts: &QueryOptions,
    ) -> Result<QueryResponse<Vec<KvEntry>>, KvError> {
        validate_key(prefix)?;
        self.kv_read(kv_path(prefix), opts, true).await
    }

    async fn put(&self, entry: &KvEntry) -> Result<bool, KvError> {
        validate_key(&entry.key)?;
        self.kv_write(write_request(entry)).await
    }

    async fn cas(&self, entry: &KvEntry) -> Result<bool, KvError> {
        validate_key(&entry.key)?;
        self.kv_write(write_request(entry).param("cas", entry.modify_index))
            .await
    }

    async fn acquire(&self, entry: &KvEntry) -> Result<bool, KvError> {
        validate_key(&entry.key)?;
        let session = required_session(entry)?;
        self.kv_write(write_request(entry).param("acquire", session))
            .await
    }

    async fn release(&self, entry: &KvEntry) -> Result<bool, KvError> {
        validate_key(&entry.key)?;
        let session = required_session(entry)?;
        self.kv_write(write_request(entry).param("release", session))
            .await
    }

    async fn delete(&self, key: &str) -> Result<bool, KvError> {
        validate_key(key)?;
        self.kv_write(Request::new(Method::Delete, kv_path(key)))
            .await
    }

    async fn delete_cas(&self, entry: &KvEntry) -> Result<bool, KvError> {
        validate_key(&entry.key)?;
        let request =
            Request::new(Method::Delete, kv_path(&entry.key)).param("cas", entry.modify_index);
        self.kv_write(request).await
    }
}

#[async_trait]
impl SessionService for ConsulClient {
    async fn create(&self, request: &SessionRequest) -> Result<SessionId, SessionError> {
        let body = serde_json::to_vec(&wire::SessionCreate::from(request))
            .map_err(|e| SessionError::Decode(e.to_string()))?;
        let response = self
            .session_call(Request::new(Method::Put, "/v1/session/create".to_string()).body(body))
            .await?;
        if !response.is_success() {
            return Err(session_status(response));
        }
        let created: wire::SessionCreated = serde_json::from_str(&response.body)
            .map_err(|e| SessionError::Decode(e.to_string()))?;
        Ok(SessionId(created.id))
    }

    async fn renew(&self, id: &SessionId) -> Result<Duration, SessionError> {
        let path = format!("/v1/session/renew/{id}");
        let response = self
            .session_call(Request::new(Method::Put, path))
            .await?;
        if response.status == 404 {
            return Err(SessionError::Expired(id.clone()));
        }
        if !response.is_success() {
            return Err(session_status(response));
        }
        let sessions: Vec<wire::SessionInfo> = serde_json::from_str(&response.body)
            .map_err(|e| SessionError::Decode(e.to_string()))?;
        match sessions.first() {
            Some(info) => info.ttl().map_err(SessionError::Decode),
            None => Err(SessionError::Expired(id.clone())),
        }
    }

    async fn destroy(&self, id: &SessionId) -> Result<(), SessionError> {
        let path = format!("/v1/session/destroy/{id}");
        let response = self
            .session_call(Request::new(Method::Put, path))
            .await?;
        if !response.is_success() {
            return Err(session_status(response));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
