//! Recording mock collaborators.
//!
//! Compiled for this crate's tests and, through the `test-support` feature,
//! for downstream crates' tests.

use crate::collaborators::{
    Acquisition, AddedMovie, MediaServer, Messenger, MovieCandidate, SearchHint, Session,
};
use crate::message::OutboundMessage;
use crate::{Result, WarezError};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::Notify;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn downstream(service: &str) -> WarezError {
    WarezError::Api {
        service: service.to_string(),
        status: 503,
        message: "mock failure".to_string(),
    }
}

/// Messenger that records every post and update.
#[derive(Default)]
pub struct RecordingMessenger {
    posted: Mutex<Vec<OutboundMessage>>,
    updated: Mutex<Vec<(String, OutboundMessage)>>,
    fail: bool,
    changed: Notify,
}

impl RecordingMessenger {
    /// A messenger whose every call fails.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn posted(&self) -> Vec<OutboundMessage> {
        lock(&self.posted).clone()
    }

    pub fn updated(&self) -> Vec<(String, OutboundMessage)> {
        lock(&self.updated).clone()
    }

    /// Wait until at least `count` messages have been posted.
    pub async fn wait_for_posts(&self, count: usize) {
        loop {
            let changed = self.changed.notified();
            if lock(&self.posted).len() >= count {
                return;
            }
            changed.await;
        }
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn post_message(&self, content: &OutboundMessage) -> Result<String> {
        if self.fail {
            return Err(downstream("slack"));
        }
        let ts = {
            let mut posted = lock(&self.posted);
            posted.push(content.clone());
            format!("1500000000.{:06}", posted.len())
        };
        self.changed.notify_waiters();
        Ok(ts)
    }

    async fn update_message(&self, ts: &str, content: &OutboundMessage) -> Result<()> {
        if self.fail {
            return Err(downstream("slack"));
        }
        lock(&self.updated).push((ts.to_string(), content.clone()));
        self.changed.notify_waiters();
        Ok(())
    }
}

/// Media server returning canned sessions and hints.
#[derive(Default)]
pub struct MockMediaServer {
    sessions: Vec<Session>,
    hints: Vec<SearchHint>,
    delay: Option<Duration>,
    fail: bool,
    session_calls: AtomicUsize,
    searches: Mutex<Vec<Vec<String>>>,
}

impl MockMediaServer {
    pub fn with_sessions(sessions: Vec<Session>) -> Self {
        Self {
            sessions,
            ..Default::default()
        }
    }

    pub fn with_hints(hints: Vec<SearchHint>) -> Self {
        Self {
            hints,
            ..Default::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    /// Make every call sleep before answering.
    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn session_calls(&self) -> usize {
        self.session_calls.load(Ordering::SeqCst)
    }

    pub fn searches(&self) -> Vec<Vec<String>> {
        lock(&self.searches).clone()
    }

    async fn pause(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl MediaServer for MockMediaServer {
    async fn active_sessions(&self) -> Result<Vec<Session>> {
        self.session_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        if self.fail {
            return Err(downstream("emby"));
        }
        Ok(self.sessions.clone())
    }

    async fn search(&self, terms: &[String]) -> Result<Vec<SearchHint>> {
        lock(&self.searches).push(terms.to_vec());
        self.pause().await;
        if self.fail {
            return Err(downstream("emby"));
        }
        Ok(self.hints.clone())
    }
}

/// Acquisition service returning canned lookups.
#[derive(Default)]
pub struct MockAcquisition {
    candidates: Vec<MovieCandidate>,
    added: AddedMovie,
    gate: Option<Arc<Notify>>,
    fail: bool,
    searches: Mutex<Vec<Vec<String>>>,
    downloads: Mutex<Vec<String>>,
}

impl MockAcquisition {
    pub fn with_candidates(candidates: Vec<MovieCandidate>) -> Self {
        Self {
            candidates,
            ..Default::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    /// Record returned by `download`.
    pub fn with_added(mut self, added: AddedMovie) -> Self {
        self.added = added;
        self
    }

    /// Hold `search` until the gate is notified.
    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn searches(&self) -> Vec<Vec<String>> {
        lock(&self.searches).clone()
    }

    pub fn downloads(&self) -> Vec<String> {
        lock(&self.downloads).clone()
    }
}

#[async_trait]
impl Acquisition for MockAcquisition {
    async fn search(&self, terms: &[String]) -> Result<Vec<MovieCandidate>> {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        lock(&self.searches).push(terms.to_vec());
        if self.fail {
            return Err(downstream("radarr"));
        }
        Ok(self.candidates.clone())
    }

    async fn download(&self, catalog_id: &str) -> Result<AddedMovie> {
        lock(&self.downloads).push(catalog_id.to_string());
        if self.fail {
            return Err(downstream("radarr"));
        }
        Ok(self.added.clone())
    }
}
