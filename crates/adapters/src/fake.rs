// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory KV store and session service for testing
//!
//! Models the parts of a coordination service the engine relies on: a global
//! modify index, blocking reads that wake on writes, check-and-set, session
//! ownership with TTL expiry, release/delete invalidation and lock-delay.
//! Time is `tokio::time`, so paused-clock tests drive expiry deterministically.
#![cfg_attr(coverage_nightly, coverage(off))]

use crate::kv::{required_session, KvError, KvStore};
use crate::session::{SessionError, SessionService};
use async_trait::async_trait;
use kvlock_core::{
    validate_key, IdGen, KvEntry, QueryOptions, QueryResponse, SequentialIdGen, SessionBehavior,
    SessionId, SessionRequest,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

/// Recorded store call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    Get { key: String, wait_index: u64 },
    List { prefix: String, wait_index: u64 },
    Put { key: String },
    Cas { key: String, modify_index: u64 },
    Acquire { key: String, session: SessionId },
    Release { key: String, session: SessionId },
    Delete { key: String },
    DeleteCas { key: String, modify_index: u64 },
    CreateSession { name: String },
    RenewSession { id: SessionId },
    DestroySession { id: SessionId },
}

#[derive(Debug, Clone)]
struct FakeSession {
    request: SessionRequest,
    renewed_at: Instant,
}

impl FakeSession {
    fn expires_at(&self) -> Instant {
        self.renewed_at + self.request.ttl
    }
}

struct State {
    entries: BTreeMap<String, KvEntry>,
    index: u64,
    sessions: HashMap<SessionId, FakeSession>,
    lock_delays: HashMap<String, Instant>,
    calls: Vec<StoreCall>,
    read_failures: u32,
    renew_failures: u32,
}

impl State {
    fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            // The service never reports index 0
            index: 1,
            sessions: HashMap::new(),
            lock_delays: HashMap::new(),
            calls: Vec::new(),
            read_failures: 0,
            renew_failures: 0,
        }
    }

    fn bump(&mut self) -> u64 {
        self.index += 1;
        self.index
    }

    fn write(&mut self, key: &str, f: impl FnOnce(&mut KvEntry)) {
        let index = self.bump();
        let entry = self.entries.entry(key.to_string()).or_insert_with(|| {
            let mut entry = KvEntry::new(key);
            entry.create_index = index;
            entry
        });
        f(entry);
        entry.modify_index = index;
    }

    fn remove(&mut self, key: &str) -> bool {
        if self.entries.remove(key).is_some() {
            self.bump();
            true
        } else {
            false
        }
    }

    fn next_expiry(&self) -> Option<Instant> {
        self.sessions.values().map(FakeSession::expires_at).min()
    }

    /// Invalidate every session whose TTL has lapsed
    fn expire_sessions(&mut self, now: Instant) {
        let expired: Vec<SessionId> = self
            .sessions
            .iter()
            .filter(|(_, s)| s.expires_at() <= now)
            .map(|(id, _)| id.clone())
            .collect();
        for id in &expired {
            self.invalidate(id, now);
        }
    }

    /// Remove a session and apply its behavior to the keys it owns
    fn invalidate(&mut self, id: &SessionId, now: Instant) -> bool {
        let Some(session) = self.sessions.remove(id) else {
            return false;
        };
        let owned: Vec<String> = self
            .entries
            .values()
            .filter(|e| e.is_owned_by(id))
            .map(|e| e.key.clone())
            .collect();
        for key in owned {
            match session.request.behavior {
                SessionBehavior::Release => {
                    self.write(&key, |e| e.session = None);
                    let delay = session.request.lock_delay.unwrap_or_default();
                    if !delay.is_zero() {
                        self.lock_delays.insert(key, now + delay);
                    }
                }
                SessionBehavior::Delete => {
                    self.remove(&key);
                }
            }
        }
        true
    }

    fn in_lock_delay(&self, key: &str, now: Instant) -> bool {
        self.lock_delays.get(key).is_some_and(|until| now < *until)
    }
}

/// Fake coordination service implementing [`KvStore`] and [`SessionService`]
#[derive(Clone)]
pub struct FakeStore<G = SequentialIdGen> {
    state: Arc<Mutex<State>>,
    changed: Arc<watch::Sender<u64>>,
    id_gen: G,
}

impl Default for FakeStore<SequentialIdGen> {
    fn default() -> Self {
        Self::with_id_gen(SequentialIdGen::default())
    }
}

impl FakeStore<SequentialIdGen> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<G: IdGen> FakeStore<G> {
    pub fn with_id_gen(id_gen: G) -> Self {
        let (changed, _) = watch::channel(1);
        Self {
            state: Arc::new(Mutex::new(State::new())),
            changed: Arc::new(changed),
            id_gen,
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Wake blocked readers after a mutation
    fn publish(&self, state: &State) {
        self.changed.send_replace(state.index);
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<StoreCall> {
        self.lock().calls.clone()
    }

    /// Current entry at `key`, bypassing call recording
    pub fn entry(&self, key: &str) -> Option<KvEntry> {
        self.lock().entries.get(key).cloned()
    }

    /// Seed an entry as-is (flags, session and value are kept)
    pub fn insert(&self, entry: KvEntry) {
        let mut state = self.lock();
        let key = entry.key.clone();
        state.write(&key, |e| {
            e.value = entry.value;
            e.flags = entry.flags;
            e.session = entry.session;
        });
        self.publish(&state);
    }

    pub fn session_exists(&self, id: &SessionId) -> bool {
        let mut state = self.lock();
        state.expire_sessions(Instant::now());
        state.sessions.contains_key(id)
    }

    pub fn session_count(&self) -> usize {
        let mut state = self.lock();
        state.expire_sessions(Instant::now());
        state.sessions.len()
    }

    /// Make the next `n` reads fail with a transient error
    pub fn fail_reads(&self, n: u32) {
        self.lock().read_failures = n;
    }

    /// Make the next `n` renewals fail with a transient error
    pub fn fail_renewals(&self, n: u32) {
        self.lock().renew_failures = n;
    }

    /// Invalidate a session as if it were destroyed by someone else
    pub fn invalidate_session(&self, id: &SessionId) -> bool {
        let mut state = self.lock();
        let found = state.invalidate(id, Instant::now());
        self.publish(&state);
        found
    }

    async fn read<T>(
        &self,
        call: StoreCall,
        opts: &QueryOptions,
        view: impl Fn(&State) -> T,
    ) -> Result<QueryResponse<T>, KvError> {
        let deadline = Instant::now() + opts.wait_time;
        {
            let mut state = self.lock();
            state.calls.push(call);
            if state.read_failures > 0 {
                state.read_failures -= 1;
                return Err(KvError::Unavailable("injected read failure".to_string()));
            }
        }
        loop {
            let mut rx = self.changed.subscribe();
            let wake_at = {
                let mut state = self.lock();
                let now = Instant::now();
                let before = state.index;
                state.expire_sessions(now);
                if state.index != before {
                    self.publish(&state);
                }
                if !opts.is_blocking() || state.index > opts.wait_index || now >= deadline {
                    return Ok(QueryResponse::new(view(&state), state.index));
                }
                state.next_expiry().map_or(deadline, |at| at.min(deadline))
            };
            tokio::select! {
                _ = rx.changed() => {}
                _ = tokio::time::sleep_until(wake_at) => {}
            }
        }
    }
}

#[async_trait]
impl<G: IdGen + 'static> KvStore for FakeStore<G> {
    async fn get(
        &self,
        key: &str,
        opts: &QueryOptions,
    ) -> Result<QueryResponse<Option<KvEntry>>, KvError> {
        validate_key(key)?;
        let call = StoreCall::Get {
            key: key.to_string(),
            wait_index: opts.wait_index,
        };
        self.read(call, opts, |state| state.entries.get(key).cloned())
            .await
    }

    async fn list(
        &self,
        prefix: &str,
        opts: &QueryOptions,
    ) -> Result<QueryResponse<Vec<KvEntry>>, KvError> {
        validate_key(prefix)?;
        let call = StoreCall::List {
            prefix: prefix.to_string(),
            wait_index: opts.wait_index,
        };
        self.read(call, opts, |state| {
            state
                .entries
                .range(prefix.to_string()..)
                .take_while(|(k, _)| k.starts_with(prefix))
                .map(|(_, e)| e.clone())
                .collect()
        })
        .await
    }

    async fn put(&self, entry: &KvEntry) -> Result<bool, KvError> {
        validate_key(&entry.key)?;
        let mut state = self.lock();
        state.calls.push(StoreCall::Put {
            key: entry.key.clone(),
        });
        state.write(&entry.key, |e| {
            e.value = entry.value.clone();
            e.flags = entry.flags;
        });
        self.publish(&state);
        Ok(true)
    }

    async fn cas(&self, entry: &KvEntry) -> Result<bool, KvError> {
        validate_key(&entry.key)?;
        let mut state = self.lock();
        state.calls.push(StoreCall::Cas {
            key: entry.key.clone(),
            modify_index: entry.modify_index,
        });
        let current = state.entries.get(&entry.key).map(|e| e.modify_index);
        let matches = match current {
            None => entry.modify_index == 0,
            Some(index) => entry.modify_index != 0 && entry.modify_index == index,
        };
        if !matches {
            return Ok(false);
        }
        state.write(&entry.key, |e| {
            e.value = entry.value.clone();
            e.flags = entry.flags;
        });
        self.publish(&state);
        Ok(true)
    }

    async fn acquire(&self, entry: &KvEntry) -> Result<bool, KvError> {
        validate_key(&entry.key)?;
        let session = required_session(entry)?.clone();
        let mut state = self.lock();
        let now = Instant::now();
        state.calls.push(StoreCall::Acquire {
            key: entry.key.clone(),
            session: session.clone(),
        });
        state.expire_sessions(now);
        if !state.sessions.contains_key(&session) {
            self.publish(&state);
            return Err(KvError::Status {
                status: 500,
                body: format!("invalid session \"{session}\""),
            });
        }
        let held_elsewhere = state
            .entries
            .get(&entry.key)
            .is_some_and(|e| e.is_owned() && !e.is_owned_by(&session));
        if held_elsewhere || state.in_lock_delay(&entry.key, now) {
            return Ok(false);
        }
        state.write(&entry.key, |e| {
            e.value = entry.value.clone();
            e.flags = entry.flags;
            if !e.is_owned_by(&session) {
                e.lock_index += 1;
            }
            e.session = Some(session);
        });
        self.publish(&state);
        Ok(true)
    }

    async fn release(&self, entry: &KvEntry) -> Result<bool, KvError> {
        validate_key(&entry.key)?;
        let session = required_session(entry)?.clone();
        let mut state = self.lock();
        state.calls.push(StoreCall::Release {
            key: entry.key.clone(),
            session: session.clone(),
        });
        let owned = state
            .entries
            .get(&entry.key)
            .is_some_and(|e| e.is_owned_by(&session));
        if !owned {
            return Ok(false);
        }
        state.write(&entry.key, |e| {
            e.value = entry.value.clone();
            e.flags = entry.flags;
            e.session = None;
        });
        self.publish(&state);
        Ok(true)
    }

    async fn delete(&self, key: &str) -> Result<bool, KvError> {
        validate_key(key)?;
        let mut state = self.lock();
        state.calls.push(StoreCall::Delete {
            key: key.to_string(),
        });
        if state.remove(key) {
            self.publish(&state);
        }
        Ok(true)
    }

    async fn delete_cas(&self, entry: &KvEntry) -> Result<bool, KvError> {
        validate_key(&entry.key)?;
        let mut state = self.lock();
        state.calls.push(StoreCall::DeleteCas {
            key: entry.key.clone(),
            modify_index: entry.modify_index,
        });
        let matches = state
            .entries
            .get(&entry.key)
            .is_some_and(|e| e.modify_index == entry.modify_index);
        if !matches {
            return Ok(false);
        }
        state.remove(&entry.key);
        self.publish(&state);
        Ok(true)
    }
}

#[async_trait]
impl<G: IdGen + 'static> SessionService for FakeStore<G> {
    async fn create(&self, request: &SessionRequest) -> Result<SessionId, SessionError> {
        let id = self.id_gen.next_id();
        let mut state = self.lock();
        state.calls.push(StoreCall::CreateSession {
            name: request.name.clone(),
        });
        state.sessions.insert(
            id.clone(),
            FakeSession {
                request: request.clone(),
                renewed_at: Instant::now(),
            },
        );
        Ok(id)
    }

    async fn renew(&self, id: &SessionId) -> Result<Duration, SessionError> {
        let mut state = self.lock();
        let now = Instant::now();
        state.calls.push(StoreCall::RenewSession { id: id.clone() });
        if state.renew_failures > 0 {
            state.renew_failures -= 1;
            return Err(SessionError::Unavailable(
                "injected renew failure".to_string(),
            ));
        }
        let before = state.index;
        state.expire_sessions(now);
        if state.index != before {
            self.publish(&state);
        }
        match state.sessions.get_mut(id) {
            Some(session) => {
                session.renewed_at = now;
                Ok(session.request.ttl)
            }
            None => Err(SessionError::Expired(id.clone())),
        }
    }

    async fn destroy(&self, id: &SessionId) -> Result<(), SessionError> {
        let mut state = self.lock();
        state.calls.push(StoreCall::DestroySession { id: id.clone() });
        state.invalidate(id, Instant::now());
        self.publish(&state);
        Ok(())
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
