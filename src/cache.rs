use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use sha2::{Digest, Sha256};
use tracing::{debug, trace};

use crate::play::PlayEvent;

fn digest(parts: &[String]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.as_bytes());
        hasher.update(b"\x1f");
    }
    URL_SAFE_NO_PAD.encode(hasher.finalize())
}

/// Fingerprint of an event set: count, yard sum, sequence sum, latest timestamp and id, then
/// `extras` (unit, game id). Stable under reordering of `events`.
pub fn stack_signature(events: &[PlayEvent], extras: &[&str]) -> String {
    let mut parts: Vec<String> = Vec::with_capacity(extras.len() + 5);
    if !events.is_empty() {
        let yards = events.iter().fold(0i64, |acc, e| acc.saturating_add(i64::from(e.yards())));
        let sequences = events
            .iter()
            .filter_map(|e| e.sequence)
            .fold(0i64, |acc, s| acc.saturating_add(s));
        let latest = events.iter().max_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then(a.sequence.cmp(&b.sequence))
                .then_with(|| a.id.cmp(&b.id))
        });
        parts.push(events.len().to_string());
        parts.push(yards.to_string());
        parts.push(sequences.to_string());
        parts.push(
            latest
                .and_then(|e| e.created_at)
                .map(|t| t.to_rfc3339())
                .unwrap_or_default(),
        );
        parts.push(latest.map(|e| e.id.clone()).unwrap_or_default());
    }
    parts.extend(extras.iter().map(|s| s.to_string()));
    digest(&parts)
}

/// Fingerprint of a season from each game's `(game_id, stack signature, plays)`.
pub fn season_signature(games: &[(&str, &str, u32)]) -> String {
    let parts: Vec<String> = games
        .iter()
        .map(|(id, sig, plays)| format!("{id}:{sig}:{plays}"))
        .collect();
    digest(&parts)
}

struct CacheEntry<V> {
    signature: String,
    computed_at: u64,
    value: Arc<V>,
}

struct CacheState<V> {
    tick: u64,
    entries: HashMap<String, CacheEntry<V>>,
}

/// Bounded memo keyed by string, valid while the caller's signature matches.
pub struct SignatureCache<V> {
    name: &'static str,
    capacity: usize,
    state: Mutex<CacheState<V>>,
}

impl<V> SignatureCache<V> {
    pub fn new(name: &'static str, capacity: usize) -> Self {
        Self {
            name,
            capacity: capacity.max(1),
            state: Mutex::new(CacheState {
                tick: 0,
                entries: HashMap::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheState<V>> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn get_or_compute(&self, key: &str, signature: &str, compute: impl FnOnce() -> V) -> Arc<V> {
        if let Some(hit) = self.peek(key, signature) {
            trace!(cache = self.name, key, "cache hit");
            return hit;
        }

        debug!(cache = self.name, key, "cache miss, recomputing");
        let value = Arc::new(compute());

        let mut state = self.lock();
        state.tick += 1;
        let computed_at = state.tick;
        state.entries.insert(
            key.to_string(),
            CacheEntry {
                signature: signature.to_string(),
                computed_at,
                value: Arc::clone(&value),
            },
        );
        while state.entries.len() > self.capacity {
            let oldest = state
                .entries
                .iter()
                .min_by(|(ka, a), (kb, b)| a.computed_at.cmp(&b.computed_at).then_with(|| ka.cmp(kb)))
                .map(|(k, _)| k.clone());
            let Some(oldest) = oldest else { break };
            debug!(cache = self.name, key = %oldest, "evicting");
            state.entries.remove(&oldest);
        }
        value
    }

    /// Stored value for `key` if its signature still matches.
    pub fn peek(&self, key: &str, signature: &str) -> Option<Arc<V>> {
        let state = self.lock();
        state
            .entries
            .get(key)
            .filter(|e| e.signature == signature)
            .map(|e| Arc::clone(&e.value))
    }

    pub fn computed_at(&self, key: &str) -> Option<u64> {
        self.lock().entries.get(key).map(|e| e.computed_at)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.lock().entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&self) {
        let mut state = self.lock();
        debug!(cache = self.name, entries = state.entries.len(), "clearing");
        state.entries.clear();
    }
}
