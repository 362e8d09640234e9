//! Per-key request coalescing.
//!
//! The first caller for a key becomes the leader and runs the work; callers
//! that arrive while it is running block on a `crossbeam_channel` and receive
//! a clone of the leader's result. The key is released on every exit path of
//! the leader. If the leader unwinds, waiters are woken with `None`.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crossbeam_channel::{Receiver, Sender, bounded};
use log::debug;

/// Table of in-flight calls keyed by `K`, each producing a `V`.
pub struct SingleFlight<K, V> {
    calls: Mutex<HashMap<K, Vec<Sender<V>>>>,
}

impl<K, V> Default for SingleFlight<K, V> {
    fn default() -> Self {
        Self {
            calls: Mutex::new(HashMap::new()),
        }
    }
}

impl<K, V> SingleFlight<K, V>
where
    K: Eq + Hash + Clone + std::fmt::Display,
    V: Clone,
{
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `work` for `key` unless another caller is already doing so, in
    /// which case wait for and return that caller's result.
    ///
    /// Returns `None` only when the leader this caller waited on panicked.
    pub fn run<F>(&self, key: &K, work: F) -> Option<V>
    where
        F: FnOnce() -> V,
    {
        if let Some(rx) = self.join_or_lead(key) {
            debug!("Waiting on in-flight fetch for {}", key);
            return rx.recv().ok();
        }

        let mut lead = Lead {
            flight: self,
            key,
            done: false,
        };
        let value = work();
        lead.complete(&value);
        Some(value)
    }

    /// Number of keys currently in flight.
    pub fn in_flight(&self) -> usize {
        self.lock().len()
    }

    /// `Some(receiver)` when joining an existing call, `None` when this caller
    /// registered itself as leader.
    fn join_or_lead(&self, key: &K) -> Option<Receiver<V>> {
        let mut calls = self.lock();
        match calls.get_mut(key) {
            Some(waiters) => {
                let (tx, rx) = bounded(1);
                waiters.push(tx);
                Some(rx)
            }
            None => {
                calls.insert(key.clone(), Vec::new());
                None
            }
        }
    }

    fn release(&self, key: &K) -> Vec<Sender<V>> {
        self.lock().remove(key).unwrap_or_default()
    }

    // The map stays consistent even if a holder panicked: every mutation is a
    // single insert, push or remove.
    fn lock(&self) -> MutexGuard<'_, HashMap<K, Vec<Sender<V>>>> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Leadership of one key; releases it on drop.
struct Lead<'a, K, V>
where
    K: Eq + Hash + Clone + std::fmt::Display,
    V: Clone,
{
    flight: &'a SingleFlight<K, V>,
    key: &'a K,
    done: bool,
}

impl<K, V> Lead<'_, K, V>
where
    K: Eq + Hash + Clone + std::fmt::Display,
    V: Clone,
{
    fn complete(&mut self, value: &V) {
        let waiters = self.flight.release(self.key);
        self.done = true;
        if !waiters.is_empty() {
            debug!("Fanning out result for {} to {} waiters", self.key, waiters.len());
        }
        for tx in waiters {
            // A waiter that went away is not an error.
            let _ = tx.send(value.clone());
        }
    }
}

impl<K, V> Drop for Lead<'_, K, V>
where
    K: Eq + Hash + Clone + std::fmt::Display,
    V: Clone,
{
    fn drop(&mut self) {
        if !self.done {
            // Dropping the senders wakes every waiter with a disconnect.
            drop(self.flight.release(self.key));
        }
    }
}
