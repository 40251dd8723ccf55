//! Unit tests for the consensus engines.


use crate::{
    config::AppConfig,
    consensus::{admission::AdmissionEngine, flight::FlightStatusEngine},
    events::EventBus,
    ledger::MemoryLedger,
    registry::{indexes::FixedEntropy, ParticipantRegistry},
    types::ParticipantId,
};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

/// Fully wired core over an in-memory ledger with pinned entropy.
pub(crate) struct Harness {
    pub events: Arc<EventBus>,
    pub registry: Arc<ParticipantRegistry>,
    pub flights: FlightStatusEngine,
    pub admission: AdmissionEngine,
    next_oracle: AtomicUsize,
}

impl Harness {
    pub fn new() -> Self {
        let config = AppConfig::default();
        let ledger: Arc<MemoryLedger> = Arc::new(MemoryLedger::new());
        let events = Arc::new(EventBus::default());
        let registry = Arc::new(ParticipantRegistry::new(
            config.registry,
            ledger.clone(),
            events.clone(),
            Arc::new(FixedEntropy(0xfeed)),
        ));
        let flights = FlightStatusEngine::new(
            config.consensus,
            ledger.clone(),
            events.clone(),
            registry.clone(),
        );
        let admission =
            AdmissionEngine::new(config.admission, ledger, events.clone(), registry.clone());
        Self { events, registry, flights, admission, next_oracle: AtomicUsize::new(0) }
    }

    /// Registers fresh oracles until `want` of them hold `index`, returning
    /// those.
    pub async fn oracles_with_index(&self, index: u8, want: usize) -> Vec<ParticipantId> {
        let mut matching = Vec::new();
        for attempt in 0..500 {
            let i = self.next_oracle.fetch_add(1, Ordering::Relaxed);
            let oracle = ParticipantId::from(format!("oracle-{i}").as_str());
            let indexes = self.registry.register_oracle(&oracle, 1).await.unwrap();
            if indexes.contains(&index) {
                matching.push(oracle);
                if matching.len() == want {
                    return matching;
                }
            }
            assert!(attempt < 499, "could not find {want} oracles holding index {index}");
        }
        unreachable!()
    }

    /// Registers a fresh oracle guaranteed NOT to hold `index`.
    pub async fn oracle_without_index(&self, index: u8) -> ParticipantId {
        for attempt in 0..500 {
            let i = self.next_oracle.fetch_add(1, Ordering::Relaxed);
            let oracle = ParticipantId::from(format!("oracle-{i}").as_str());
            let indexes = self.registry.register_oracle(&oracle, 1).await.unwrap();
            if !indexes.contains(&index) {
                return oracle;
            }
            assert!(attempt < 499, "could not find an oracle without index {index}");
        }
        unreachable!()
    }
}
