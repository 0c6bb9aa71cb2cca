// SPDX-FileCopyrightText: 2026 SyncPlus Developers
//
// SPDX-License-Identifier: Apache-2.0

//! Mutual exclusion and pause control for sync runs.
//!
//! At most one run per (authority, account) pair is active at a time.
//! Pausing cancels every active run's token and refuses new runs until
//! resumed.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::settings::{Account, Authority};

/// Identifies one sync run slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SyncKey {
    authority: Authority,
    account: Account,
}

impl SyncKey {
    /// Creates a key for the given account and authority.
    #[must_use]
    pub fn new(account: &Account, authority: Authority) -> Self {
        Self {
            authority,
            account: account.clone(),
        }
    }
}

/// Cooperative cancellation flag handed to a running sync.
///
/// The run checks it between phases and stops with a cancellation error
/// when it is set.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Creates a token that is not cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Default)]
struct RegistryInner {
    running: HashSet<SyncKey>,
    tokens: Vec<(SyncKey, CancelToken)>,
    paused: bool,
    interrupted: Vec<SyncKey>,
}

/// Tracks which (authority, account) pairs currently have a sync running.
#[derive(Debug, Default)]
pub struct SyncRegistry {
    inner: Mutex<RegistryInner>,
}

impl SyncRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Tries to claim the slot for `key`.
    ///
    /// Returns `None` when a run for the same key is already active or
    /// the registry is paused. The returned guard releases the slot on
    /// drop.
    pub fn try_begin(self: &Arc<Self>, key: SyncKey) -> Option<RunGuard> {
        let mut inner = self.lock();
        if inner.paused || inner.running.contains(&key) {
            return None;
        }
        inner.running.insert(key.clone());
        let token = CancelToken::new();
        inner.tokens.push((key.clone(), token.clone()));
        Some(RunGuard {
            registry: Arc::clone(self),
            key,
            token,
        })
    }

    /// Whether a run for `key` is currently active.
    #[must_use]
    pub fn is_running(&self, key: &SyncKey) -> bool {
        self.lock().running.contains(key)
    }

    /// Pauses the registry: cancels all active runs and refuses new ones.
    ///
    /// The keys of the cancelled runs are remembered and handed out by
    /// [`resume`](Self::resume).
    pub fn pause(&self) {
        let mut inner = self.lock();
        inner.paused = true;
        let keys: Vec<SyncKey> = inner.tokens.iter().map(|(k, _)| k.clone()).collect();
        for (key, token) in &inner.tokens {
            tracing::info!(account = %key.account.name, "cancelling active sync");
            token.cancel();
        }
        for key in keys {
            if !inner.interrupted.contains(&key) {
                inner.interrupted.push(key);
            }
        }
    }

    /// Resumes the registry; new runs may start again.
    ///
    /// Returns the keys of the runs that [`pause`](Self::pause) cancelled,
    /// so the caller can re-request them.
    pub fn resume(&self) -> Vec<SyncKey> {
        let mut inner = self.lock();
        inner.paused = false;
        std::mem::take(&mut inner.interrupted)
    }

    /// Whether the registry is paused.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.lock().paused
    }

    fn release(&self, key: &SyncKey) {
        let mut inner = self.lock();
        inner.running.remove(key);
        inner.tokens.retain(|(k, _)| k != key);
    }

    fn lock(&self) -> MutexGuard<'_, RegistryInner> {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

/// Holds the registry slot for the duration of one run.
#[derive(Debug)]
pub struct RunGuard {
    registry: Arc<SyncRegistry>,
    key: SyncKey,
    token: CancelToken,
}

impl RunGuard {
    /// The cancellation token for this run.
    #[must_use]
    pub fn token(&self) -> CancelToken {
        self.token.clone()
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.registry.release(&self.key);
    }
}
