//! Recently seen anti-caching tokens per origin.

use std::collections::VecDeque;
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use thiserror::Error;

/// How many past tokens are remembered per origin. Origins mint a new random
/// token on every call, so seeing any of these again means a cache replayed it.
pub const RECENT_TOKENS: usize = 16;

/// What the leaf remembers about an origin's latest fresh response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenCacheEntry {
    pub identifier: String,
    pub token: String,
    pub server_time: String,
}

/// The origin answered with a token it had already used.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("repeated token {token} at {server_time}, response was likely served from a cache")]
pub struct RepeatedToken {
    pub token: String,
    pub server_time: String,
}

#[derive(Debug)]
struct OriginTokens {
    latest: TokenCacheEntry,
    recent: VecDeque<String>,
}

/// Concurrent map of probe URL → last validated response.
///
/// Rounds can overlap when probes run longer than the interval, so two tasks
/// may race on the same origin. The compare-and-record step holds the key's
/// shard lock for its whole duration.
///
/// Never evicted and never persisted: after a restart the first sample per
/// origin cannot be checked.
#[derive(Debug, Clone, Default)]
pub struct TokenCache {
    inner: Arc<DashMap<String, OriginTokens>>,
}

impl TokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `entry` for `url` unless its token was seen recently.
    ///
    /// On a repeat the stored entry is left untouched.
    pub fn observe(&self, url: &str, entry: TokenCacheEntry) -> Result<(), RepeatedToken> {
        match self.inner.entry(url.to_string()) {
            Entry::Occupied(mut existing) => {
                let tokens = existing.get_mut();
                if tokens.recent.contains(&entry.token) {
                    return Err(RepeatedToken {
                        token: entry.token,
                        server_time: entry.server_time,
                    });
                }
                if tokens.recent.len() == RECENT_TOKENS {
                    tokens.recent.pop_front();
                }
                tokens.recent.push_back(entry.token.clone());
                tokens.latest = entry;
            }
            Entry::Vacant(slot) => {
                let mut recent = VecDeque::with_capacity(RECENT_TOKENS);
                recent.push_back(entry.token.clone());
                slot.insert(OriginTokens { latest: entry, recent });
            }
        }
        Ok(())
    }

    /// The latest accepted response for `url`.
    pub fn get(&self, url: &str) -> Option<TokenCacheEntry> {
        self.inner.get(url).map(|r| r.value().latest.clone())
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
