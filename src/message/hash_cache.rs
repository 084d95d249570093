//! Callsign hash cache.
//!
//! Non-standard callsigns travel as hashes once the full text has been seen,
//! so every successfully decoded callsign is stored under its 22-, 12- and
//! 10-bit hashes for later lookup. The three maps are consistent views of
//! the same set of callsigns at different truncations.

use ahash::AHasher;
use core::hash::BuildHasherDefault;
use hashbrown::HashMap;

use super::callsign::{hash10, hash12, hash22};

type AHashMap<K, V> = HashMap<K, V, BuildHasherDefault<AHasher>>;

#[derive(Debug, Clone, Default)]
pub struct CallsignHashCache {
    cache_10bit: AHashMap<u16, String>,
    cache_12bit: AHashMap<u16, String>,
    cache_22bit: AHashMap<u32, String>,
}

impl CallsignHashCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a callsign under all three hash widths.
    ///
    /// The first writer wins: if the 22-bit slot is already taken the
    /// entry is dropped entirely, keeping the three maps consistent.
    /// Bracketed placeholders and fragments shorter than three characters
    /// are never stored.
    pub fn store(&mut self, callsign: &str) {
        let callsign = callsign.trim();
        if callsign.len() < 3 || callsign.starts_with('<') {
            return;
        }
        let h22 = hash22(callsign);
        if self.cache_22bit.contains_key(&h22) {
            return;
        }
        self.cache_22bit.insert(h22, callsign.to_string());
        self.cache_12bit.insert(hash12(callsign), callsign.to_string());
        self.cache_10bit.insert(hash10(callsign), callsign.to_string());
    }

    pub fn lookup_22(&self, hash: u32) -> Option<&str> {
        self.cache_22bit.get(&hash).map(String::as_str)
    }

    pub fn lookup_12(&self, hash: u16) -> Option<&str> {
        self.cache_12bit.get(&hash).map(String::as_str)
    }

    pub fn lookup_10(&self, hash: u16) -> Option<&str> {
        self.cache_10bit.get(&hash).map(String::as_str)
    }

    pub fn clear(&mut self) {
        self.cache_10bit.clear();
        self.cache_12bit.clear();
        self.cache_22bit.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.cache_22bit.is_empty()
    }
}
