//! Racing workers over the shared ledger.
//!
//! The consensus core promises linearizable tallies: any interleaving of
//! concurrent submissions yields the same counts as some serial order, with
//! no double counting and no lost updates. These tests drive real task
//! parallelism through the public API.

use crate::common::{core, id};
use aerosure_core::{
    consensus::{admission::AdmissionOutcome, flight::ResponseOutcome},
    FlightKey, StatusCode,
};
use std::sync::Arc;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_racing_oracle_fleet_finalizes_exactly_once() {
    let core = Arc::new(core());
    core.seed_airlines(1).await;

    let flight = FlightKey::new("AL-1", "AS0100", 1_760_000_000);
    let opened = core.flights.open_request(&flight).await.unwrap();
    let oracles = core.oracles_holding(opened.index, 8).await;

    let mut handles = Vec::new();
    for oracle in &oracles {
        let core = core.clone();
        let oracle = oracle.clone();
        let flight = flight.clone();
        handles.push(tokio::spawn(async move {
            core.flights
                .submit_response(&oracle, opened.index, &flight, StatusCode::LateTechnical)
                .await
        }));
    }

    let mut accepted = 0;
    let mut finalized = 0;
    let mut closed = 0;
    for handle in handles {
        match handle.await.unwrap().unwrap() {
            ResponseOutcome::Accepted { .. } => accepted += 1,
            ResponseOutcome::Finalized { .. } => finalized += 1,
            ResponseOutcome::Closed => closed += 1,
            ResponseOutcome::Duplicate => panic!("distinct oracles cannot be duplicates"),
        }
    }

    assert_eq!(finalized, 1, "exactly one submission crosses the threshold");
    assert_eq!(accepted, 2, "threshold minus one submissions tally below it");
    assert_eq!(closed, oracles.len() - 3, "the rest arrive after finality");
    assert_eq!(
        core.flights.flight_status(&flight).await.unwrap(),
        Some(StatusCode::LateTechnical)
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_racing_duplicate_submissions_count_once() {
    let core = Arc::new(core());
    core.seed_airlines(1).await;

    let flight = FlightKey::new("AL-1", "AS0101", 1_760_000_000);
    let opened = core.flights.open_request(&flight).await.unwrap();
    let oracle = core.oracles_holding(opened.index, 1).await.remove(0);

    // One oracle retries the same submission from eight tasks at once, as a
    // crash-happy worker with aggressive retry would.
    let mut handles = Vec::new();
    for _ in 0..8 {
        let core = core.clone();
        let oracle = oracle.clone();
        let flight = flight.clone();
        handles.push(tokio::spawn(async move {
            core.flights
                .submit_response(&oracle, opened.index, &flight, StatusCode::LateOther)
                .await
        }));
    }

    let mut accepted = 0;
    for handle in handles {
        match handle.await.unwrap().unwrap() {
            ResponseOutcome::Accepted { tally } => {
                accepted += 1;
                assert_eq!(tally, 1);
            }
            ResponseOutcome::Duplicate => {}
            outcome => panic!("unexpected outcome: {outcome:?}"),
        }
    }
    assert_eq!(accepted, 1, "one retry wins, the rest are no-ops");

    let snapshot = core.flights.request_state(&flight).await.unwrap().unwrap();
    assert_eq!(snapshot.tallies[&StatusCode::LateOther], 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_racing_voters_admit_exactly_once() {
    let core = Arc::new(core());
    let airlines = core.seed_airlines(4).await;
    let candidate = id("AL-5");

    // Each airline votes from two tasks simultaneously.
    let mut handles = Vec::new();
    for voter in airlines.iter().chain(airlines.iter()) {
        let core = core.clone();
        let candidate = candidate.clone();
        let voter = voter.clone();
        handles
            .push(tokio::spawn(
                async move { core.admission.register_airline(&candidate, &voter).await },
            ));
    }

    let mut admitted = 0;
    for handle in handles {
        if let AdmissionOutcome::Registered { votes } = handle.await.unwrap().unwrap() {
            admitted += 1;
            assert!(votes >= 2, "admission requires quorum, saw {votes}");
        }
    }
    assert_eq!(admitted, 1, "exactly one call observes the admission");
    assert!(core.registry.is_airline_registered(&candidate).await.unwrap());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_flights_do_not_interfere() {
    let core = Arc::new(core());
    core.seed_airlines(2).await;

    // Two flights finalize concurrently with different codes; per-key
    // isolation means neither tally can bleed into the other.
    let flight_a = FlightKey::new("AL-1", "AS0200", 1_760_000_000);
    let flight_b = FlightKey::new("AL-2", "AS0201", 1_760_000_000);
    let opened_a = core.flights.open_request(&flight_a).await.unwrap();
    let opened_b = core.flights.open_request(&flight_b).await.unwrap();
    let oracles_a = core.oracles_holding(opened_a.index, 3).await;
    let oracles_b = core.oracles_holding(opened_b.index, 3).await;

    let mut handles = Vec::new();
    for oracle in oracles_a {
        let core = core.clone();
        let flight = flight_a.clone();
        handles.push(tokio::spawn(async move {
            core.flights
                .submit_response(&oracle, opened_a.index, &flight, StatusCode::LateWeather)
                .await
        }));
    }
    for oracle in oracles_b {
        let core = core.clone();
        let flight = flight_b.clone();
        handles.push(tokio::spawn(async move {
            core.flights
                .submit_response(&oracle, opened_b.index, &flight, StatusCode::OnTime)
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(
        core.flights.flight_status(&flight_a).await.unwrap(),
        Some(StatusCode::LateWeather)
    );
    assert_eq!(core.flights.flight_status(&flight_b).await.unwrap(), Some(StatusCode::OnTime));
}
