//! End-to-end simulation of the consensus core under a fleet of
//! independently-scheduled oracle workers.
//!
//! Each worker owns one oracle identity and subscribes to the event bus;
//! whenever a request opens under one of its indexes it submits a randomly
//! drawn status code, exactly like a real reporting agent would. Workers
//! race each other freely; duplicate and post-finalization submissions are
//! absorbed by the engine as no-ops.

use aerosure_core::{
    consensus::{admission::AdmissionEngine, flight::FlightStatusEngine},
    events::{Event, EventBus},
    ledger::MemoryLedger,
    registry::{indexes::SystemEntropy, ParticipantRegistry},
    AdmissionOutcome, AppConfig, FlightKey, ParticipantId, StatusCode,
};
use anyhow::{Context, Result};
use rand::Rng;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

struct Core {
    events: Arc<EventBus>,
    registry: Arc<ParticipantRegistry>,
    flights: Arc<FlightStatusEngine>,
    admission: AdmissionEngine,
}

fn build_core(config: AppConfig) -> Core {
    let ledger = Arc::new(MemoryLedger::new());
    let events = Arc::new(EventBus::default());
    let registry = Arc::new(ParticipantRegistry::new(
        config.registry.clone(),
        ledger.clone(),
        events.clone(),
        Arc::new(SystemEntropy),
    ));
    let flights = Arc::new(FlightStatusEngine::new(
        config.consensus.clone(),
        ledger.clone(),
        events.clone(),
        registry.clone(),
    ));
    let admission =
        AdmissionEngine::new(config.admission.clone(), ledger, events.clone(), registry.clone());
    Core { events, registry, flights, admission }
}

/// Drives the full scenario: bootstrap airlines, register oracles, open one
/// request per flight, and wait for every request to finalize.
pub async fn run(
    config: AppConfig,
    oracle_count: usize,
    airline_count: usize,
    flight_count: usize,
) -> Result<()> {
    if airline_count == 0 {
        anyhow::bail!("at least one airline is required");
    }
    let registrar: ParticipantId = config.admission.registrar.as_str().into();
    let funding = config.registry.funding_threshold;
    let fee = config.registry.oracle_registration_fee;
    let core = Arc::new(build_core(config));

    // Build up the airline set. The first admission is the registrar's
    // privileged call; within the bootstrap window one funded airline
    // suffices, and past it the existing airlines vote until quorum admits
    // the newcomer.
    let mut airlines: Vec<ParticipantId> = Vec::new();
    for i in 1..=airline_count {
        let airline: ParticipantId = format!("airline-{i}").as_str().into();
        if airlines.is_empty() {
            core.admission
                .register_airline(&airline, &registrar)
                .await
                .with_context(|| format!("registering {airline}"))?;
        } else {
            let mut admitted = false;
            for voter in &airlines {
                let outcome = core
                    .admission
                    .register_airline(&airline, voter)
                    .await
                    .with_context(|| format!("registering {airline}"))?;
                if matches!(
                    outcome,
                    AdmissionOutcome::Registered { .. } | AdmissionOutcome::AlreadyRegistered
                ) {
                    admitted = true;
                    break;
                }
            }
            anyhow::ensure!(admitted, "quorum not reachable for {airline}");
        }
        core.registry
            .fund_airline(&airline, funding)
            .await
            .with_context(|| format!("funding {airline}"))?;
        airlines.push(airline);
    }
    info!(count = airlines.len(), "airlines admitted and funded");

    // Register the oracle fleet and spawn one worker per oracle.
    let (shutdown_tx, _) = broadcast::channel::<()>(1);
    let mut workers = Vec::new();
    for i in 0..oracle_count {
        let oracle: ParticipantId = format!("oracle-{i}").as_str().into();
        let indexes = core
            .registry
            .register_oracle(&oracle, fee)
            .await
            .with_context(|| format!("registering {oracle}"))?;
        debug!(oracle = %oracle, ?indexes, "oracle online");
        // Subscribe before any request opens so no worker can miss one.
        workers.push(tokio::spawn(oracle_worker(
            core.clone(),
            oracle,
            indexes,
            core.events.subscribe(),
            shutdown_tx.subscribe(),
        )));
    }
    info!(count = oracle_count, "oracle fleet registered");

    // Open one request per flight and wait for finalization. The
    // subscription is taken before opening so no event can be missed.
    let mut events = core.events.subscribe();
    let mut pending = Vec::new();
    for i in 1..=flight_count {
        let airline = airlines[i % airlines.len()].clone();
        let flight = FlightKey::new(airline, format!("AS{i:04}"), 1_760_000_000 + i as i64);
        let opened = core.flights.open_request(&flight).await?;
        info!(flight = %flight, index = opened.index, "request opened");
        pending.push(flight);
    }

    // The core never expires an open request; the deadline here is the
    // caller-imposed timeout the protocol leaves to this layer. Uniformly
    // random reporters can split a tally so badly that no code ever reaches
    // the threshold, and that is a legitimate outcome.
    let wait_all = async {
        while !pending.is_empty() {
            match events.recv().await {
                Ok(Event::StatusFinalized { flight, status }) => {
                    info!(flight = %flight, %status, late = status.is_late(), "flight status finalized");
                    pending.retain(|p| p != &flight);
                }
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "event stream lagged, falling back to polling");
                    let mut done = Vec::new();
                    for flight in pending.iter() {
                        if let Some(status) = core.flights.flight_status(flight).await? {
                            info!(flight = %flight, %status, "flight status finalized");
                            done.push(flight.clone());
                        }
                    }
                    pending.retain(|p| !done.contains(p));
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
        Ok::<(), anyhow::Error>(())
    };
    let waited = tokio::time::timeout(std::time::Duration::from_secs(5), wait_all).await;
    match waited {
        Ok(result) => result?,
        Err(_) => {
            for flight in &pending {
                let snapshot = core.flights.request_state(flight).await?;
                warn!(
                    flight = %flight,
                    tallies = ?snapshot.map(|s| s.tallies),
                    "request did not finalize before the deadline; reporters split the tally"
                );
            }
        }
    }

    let _ = shutdown_tx.send(());
    for worker in workers {
        let _ = worker.await;
    }
    info!(events = core.events.len(), "simulation complete");
    Ok(())
}

/// One oracle identity reacting to open requests that match its indexes.
async fn oracle_worker(
    core: Arc<Core>,
    oracle: ParticipantId,
    indexes: Vec<u8>,
    mut events: broadcast::Receiver<Event>,
    mut shutdown: broadcast::Receiver<()>,
) {
    loop {
        let event = tokio::select! {
            event = events.recv() => event,
            _ = shutdown.recv() => return,
        };
        let (flight, index) = match event {
            Ok(Event::RequestOpened { flight, index, .. }) => (flight, index),
            Ok(_) => continue,
            Err(broadcast::error::RecvError::Lagged(_)) => continue,
            Err(broadcast::error::RecvError::Closed) => return,
        };
        if !indexes.contains(&index) {
            continue;
        }

        let status = random_status();
        match core.flights.submit_response(&oracle, index, &flight, status).await {
            Ok(outcome) => {
                debug!(oracle = %oracle, flight = %flight, %status, ?outcome, "response submitted");
            }
            Err(e) if e.is_retryable() => {
                warn!(oracle = %oracle, flight = %flight, error = %e, "submission hit contention");
            }
            Err(e) => {
                debug!(oracle = %oracle, flight = %flight, error = %e, "submission rejected");
            }
        }
    }
}

fn random_status() -> StatusCode {
    let codes = StatusCode::ALL;
    codes[rand::thread_rng().gen_range(0..codes.len())]
}
