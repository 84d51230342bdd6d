//! Expiration Metadata and the Sweeper
//!
//! Every entry carries an [`Expiration`]: its creation time and a TTL.
//! Expiry is derived, never stored - an entry is expired once
//! `now > created_at + ttl`. There is no background timer; expired keys
//! are detected lazily on read and evicted by [`ExpirationSweeper::sweep`],
//! which the connection layer runs after every served request. A key that
//! expires while the server is idle therefore lingers until the next
//! request arrives.
//!
//! ## TTL specs
//!
//! Writes may supply a duration string such as `"2h30m"`, `"10ms"` or
//! `"1.5h"` - decimal numbers, each followed by a unit (`ns`, `us`, `ms`,
//! `s`, `m`, `h`), concatenated. An absent or unparseable spec falls back
//! to [`DEFAULT_TTL`] instead of failing the write.

use crate::storage::store::KeyStore;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tracing::debug;

/// TTL applied when a write supplies no usable duration spec (2 hours).
pub const DEFAULT_TTL: Duration = Duration::from_secs(2 * 60 * 60);

/// When an entry was created and how long it lives.
#[derive(Debug, Clone, Copy)]
pub struct Expiration {
    pub created_at: Instant,
    pub ttl: Duration,
}

impl Expiration {
    /// Metadata for an entry written right now.
    pub fn starting_now(ttl: Duration) -> Self {
        Self {
            created_at: Instant::now(),
            ttl,
        }
    }

    /// The instant after which the entry is expired.
    pub fn deadline(&self) -> Instant {
        self.created_at + self.ttl
    }

    #[inline]
    pub fn is_expired(&self) -> bool {
        Instant::now() > self.deadline()
    }
}

/// Parses a duration spec such as `"2h30m"`, `"300ms"` or `"1.5h"`.
///
/// Returns `None` for anything that does not fully parse, including signed
/// specs and bare numbers without a unit. `"0"` is accepted as zero.
pub fn parse_ttl(spec: &str) -> Option<Duration> {
    if spec.is_empty() {
        return None;
    }
    if spec == "0" {
        return Some(Duration::ZERO);
    }

    let bytes = spec.as_bytes();
    let mut total = Duration::ZERO;
    let mut pos = 0;

    while pos < bytes.len() {
        let number_start = pos;
        while pos < bytes.len() && (bytes[pos].is_ascii_digit() || bytes[pos] == b'.') {
            pos += 1;
        }
        if pos == number_start {
            return None;
        }
        let number: f64 = spec[number_start..pos].parse().ok()?;

        let unit_start = pos;
        while pos < bytes.len() && !bytes[pos].is_ascii_digit() && bytes[pos] != b'.' {
            pos += 1;
        }
        let unit_nanos: u64 = match &spec[unit_start..pos] {
            "ns" => 1,
            "us" | "\u{b5}s" => 1_000,
            "ms" => 1_000_000,
            "s" => 1_000_000_000,
            "m" => 60 * 1_000_000_000,
            "h" => 3_600 * 1_000_000_000,
            _ => return None,
        };

        let nanos = number * unit_nanos as f64;
        if !nanos.is_finite() || nanos > u64::MAX as f64 {
            return None;
        }
        total = total.checked_add(Duration::from_nanos(nanos as u64))?;
    }

    Some(total)
}

/// Parses the optional spec from a write, falling back to [`DEFAULT_TTL`].
pub fn ttl_or_default(spec: Option<&str>) -> Duration {
    spec.and_then(parse_ttl).unwrap_or(DEFAULT_TTL)
}

/// Evicts expired entries from a [`KeyStore`].
///
/// The sweeper is piggybacked on request traffic: the connection layer
/// calls [`sweep`](ExpirationSweeper::sweep) after each response is sent.
/// It is cheap to clone - every clone sweeps the same store.
#[derive(Debug, Clone)]
pub struct ExpirationSweeper {
    store: Arc<KeyStore>,
}

impl ExpirationSweeper {
    pub fn new(store: Arc<KeyStore>) -> Self {
        Self { store }
    }

    /// Runs one sweep pass. Returns the number of keys evicted.
    ///
    /// The deadline snapshot is taken under the store's read lock; each
    /// key's expiry check is a pure comparison and runs on its own task;
    /// the removals are then serialized under the store's write lock,
    /// using the same removal primitive as an explicit delete.
    pub async fn sweep(&self) -> usize {
        let snapshot = self.store.expiration_snapshot();
        if snapshot.is_empty() {
            return 0;
        }

        let mut checks = JoinSet::new();
        for (key, deadline) in snapshot {
            checks.spawn(async move { (Instant::now() > deadline).then_some(key) });
        }

        let mut expired = Vec::new();
        while let Some(result) = checks.join_next().await {
            if let Ok(Some(key)) = result {
                expired.push(key);
            }
        }

        if expired.is_empty() {
            return 0;
        }
        let removed = self.store.remove_expired(&expired);
        if removed > 0 {
            debug!(removed, remaining = self.store.len(), "expired keys swept");
        }
        removed
    }
}
