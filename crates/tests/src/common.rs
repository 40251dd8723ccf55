//! Shared wiring for integration tests.

use aerosure_core::{
    consensus::{admission::AdmissionEngine, flight::FlightStatusEngine},
    events::EventBus,
    ledger::MemoryLedger,
    registry::{indexes::FixedEntropy, ParticipantRegistry},
    AppConfig, ParticipantId,
};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

/// A fully wired core over an in-memory ledger with pinned entropy.
pub struct TestCore {
    pub events: Arc<EventBus>,
    pub registry: Arc<ParticipantRegistry>,
    pub flights: Arc<FlightStatusEngine>,
    pub admission: Arc<AdmissionEngine>,
    next_oracle: AtomicUsize,
}

pub fn core() -> TestCore {
    core_with(AppConfig::default(), 0xa5a5)
}

pub fn core_with(config: AppConfig, entropy: u64) -> TestCore {
    let ledger = Arc::new(MemoryLedger::new());
    let events = Arc::new(EventBus::default());
    let registry = Arc::new(ParticipantRegistry::new(
        config.registry,
        ledger.clone(),
        events.clone(),
        Arc::new(FixedEntropy(entropy)),
    ));
    let flights = Arc::new(FlightStatusEngine::new(
        config.consensus,
        ledger.clone(),
        events.clone(),
        registry.clone(),
    ));
    let admission =
        Arc::new(AdmissionEngine::new(config.admission, ledger, events.clone(), registry.clone()));
    TestCore { events, registry, flights, admission, next_oracle: AtomicUsize::new(0) }
}

pub fn id(name: &str) -> ParticipantId {
    ParticipantId::from(name)
}

impl TestCore {
    /// Registers fresh oracles until `want` of them hold `index`.
    pub async fn oracles_holding(&self, index: u8, want: usize) -> Vec<ParticipantId> {
        let mut matching = Vec::new();
        for attempt in 0..500 {
            let i = self.next_oracle.fetch_add(1, Ordering::Relaxed);
            let oracle = id(&format!("oracle-{i}"));
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

    /// Bootstraps and funds airlines `AL-1..=AL-count`.
    pub async fn seed_airlines(&self, count: usize) -> Vec<ParticipantId> {
        let mut airlines: Vec<ParticipantId> = Vec::new();
        for i in 1..=count {
            let airline = id(&format!("AL-{i}"));
            let by = airlines.last().cloned().unwrap_or_else(|| id("registrar"));
            self.admission.register_airline(&airline, &by).await.unwrap();
            self.registry.fund_airline(&airline, 10).await.unwrap();
            airlines.push(airline);
        }
        airlines
    }
}
