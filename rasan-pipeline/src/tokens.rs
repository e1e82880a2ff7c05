//! Per-slot request tokens.
//!
//! Every dispatched call that may write an artifact first takes a token for
//! that artifact's slot. Only the holder of the latest token may commit.

use rasan_core::ArtifactKey;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestToken {
    pub key: ArtifactKey,
    pub seq: u64,
}

/// Monotonic counters, one per artifact slot.
#[derive(Debug, Default)]
pub struct RequestTokens {
    latest: BTreeMap<ArtifactKey, u64>,
}

impl RequestTokens {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take a new token for `key`, superseding every earlier one.
    pub fn issue(&mut self, key: ArtifactKey) -> RequestToken {
        let seq = self.latest.entry(key).or_insert(0);
        *seq += 1;
        RequestToken { key, seq: *seq }
    }

    pub fn is_current(&self, token: &RequestToken) -> bool {
        self.latest.get(&token.key).copied().unwrap_or(0) == token.seq
    }

    /// Supersede whatever is in flight for `key` without issuing to anyone.
    pub fn invalidate(&mut self, key: ArtifactKey) {
        self.issue(key);
    }

    pub fn invalidate_all(&mut self) {
        for key in ArtifactKey::all() {
            self.invalidate(*key);
        }
    }
}
