//! Deterministic index assignment for oracles.
//!
//! Each oracle receives a small fixed-size set of indexes drawn from a
//! bounded universe; status requests are later sharded across oracles by
//! matching against these indexes. The derivation is intentionally
//! low-entropy: duplicates within one assignment are tolerated so that a
//! modest oracle population still covers most of the universe statistically.
//!
//! Derivation is a pure function of `(participant id, registration nonce,
//! entropy word)`. The entropy word comes from an injected
//! [`EntropySource`], never a local generator, so tests can pin it and get
//! byte-identical assignments on every run.

use crate::config::RegistryConfig;
use ahash::RandomState;
use std::{
    hash::{BuildHasher, Hash, Hasher},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

// Fixed hasher seeds: assignment must reproduce across processes, so the
// per-process random state ahash defaults to is not usable here.
const SEED: (u64, u64, u64, u64) =
    (0x6165_726f_7375_7265, 0x696e_6465_7865_7321, 0x9e37_79b9_7f4a_7c15, 0x2545_f491_4f6c_dd1d);

/// External entropy injected into each assignment.
pub trait EntropySource: Send + Sync {
    /// Returns one entropy word; called once per assignment.
    fn entropy_word(&self) -> u64;
}

/// Production source backed by the OS generator.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemEntropy;

impl EntropySource for SystemEntropy {
    fn entropy_word(&self) -> u64 {
        rand::random()
    }
}

/// Fixed source for deterministic tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedEntropy(pub u64);

impl EntropySource for FixedEntropy {
    fn entropy_word(&self) -> u64 {
        self.0
    }
}

/// Derives index sets for oracles and single indexes for status requests.
///
/// The registration nonce increases monotonically per derivation, keeping
/// assignments distinct even when the entropy source repeats a word.
pub struct IndexAssigner {
    count: usize,
    universe: u8,
    hasher: RandomState,
    entropy: Arc<dyn EntropySource>,
    nonce: AtomicU64,
}

impl IndexAssigner {
    #[must_use]
    pub fn new(config: &RegistryConfig, entropy: Arc<dyn EntropySource>) -> Self {
        Self {
            count: config.oracle_index_count,
            universe: config.index_universe,
            hasher: RandomState::with_seeds(SEED.0, SEED.1, SEED.2, SEED.3),
            entropy,
            nonce: AtomicU64::new(0),
        }
    }

    /// Assigns a full index set for a registering oracle.
    ///
    /// Duplicates within the returned set are possible and intentional.
    #[must_use]
    pub fn assign(&self, id: &str) -> Vec<u8> {
        let nonce = self.nonce.fetch_add(1, Ordering::Relaxed);
        let entropy = self.entropy.entropy_word();
        (0..self.count).map(|slot| self.derive(id, nonce, entropy, slot as u64)).collect()
    }

    /// Picks a single index, used when opening a status request.
    #[must_use]
    pub fn pick(&self, id: &str) -> u8 {
        let nonce = self.nonce.fetch_add(1, Ordering::Relaxed);
        self.derive(id, nonce, self.entropy.entropy_word(), 0)
    }

    fn derive(&self, id: &str, nonce: u64, entropy: u64, slot: u64) -> u8 {
        let mut hasher = self.hasher.build_hasher();
        id.hash(&mut hasher);
        nonce.hash(&mut hasher);
        entropy.hash(&mut hasher);
        slot.hash(&mut hasher);
        (hasher.finish() % u64::from(self.universe)) as u8
    }
}
