//! Push and pull event delivery across full consensus rounds.

use crate::common::{core, id};
use aerosure_core::{events::Event, FlightKey, StatusCode};

#[tokio::test]
async fn test_subscriber_sees_lifecycle_in_order() {
    let core = core();
    core.seed_airlines(1).await;
    let mut rx = core.events.subscribe();

    let flight = FlightKey::new("AL-1", "AS0300", 1_760_000_000);
    let opened = core.flights.open_request(&flight).await.unwrap();
    let oracles = core.oracles_holding(opened.index, 3).await;
    for oracle in &oracles {
        core.flights
            .submit_response(oracle, opened.index, &flight, StatusCode::LateAirline)
            .await
            .unwrap();
    }

    // Drain the subscription and keep only this flight's lifecycle events.
    let mut lifecycle = Vec::new();
    while let Ok(event) = rx.try_recv() {
        let ours = match &event {
            Event::RequestOpened { flight: f, .. } |
            Event::ResponseRecorded { flight: f, .. } |
            Event::StatusFinalized { flight: f, .. } => f == &flight,
            _ => false,
        };
        if ours {
            lifecycle.push(event);
        }
    }

    assert!(matches!(lifecycle.first(), Some(Event::RequestOpened { index, .. }) if *index == opened.index));
    assert!(matches!(lifecycle.last(), Some(Event::StatusFinalized { status, .. }) if *status == StatusCode::LateAirline));
    let responses = lifecycle
        .iter()
        .filter(|event| matches!(event, Event::ResponseRecorded { .. }))
        .count();
    assert_eq!(responses, 3);
}

#[tokio::test]
async fn test_pull_cursor_replays_and_resumes() {
    let core = core();

    // Phase 1: registration activity.
    core.seed_airlines(2).await;
    let (history, cursor) = core.events.events_since(0);
    assert!(history.contains(&Event::AirlineRegistered { airline: id("AL-1"), votes: 1 }));
    assert!(history.contains(&Event::AirlineFunded { airline: id("AL-2"), total: 10 }));

    // Phase 2: a consensus round; the resumed cursor sees only new events.
    let flight = FlightKey::new("AL-1", "AS0301", 1_760_000_000);
    let opened = core.flights.open_request(&flight).await.unwrap();
    let (fresh, next) = core.events.events_since(cursor);
    assert_eq!(
        fresh,
        vec![Event::RequestOpened { flight: flight.clone(), index: opened.index, opening: 1 }]
    );
    assert!(next > cursor);

    // Full replay from zero still contains both phases, in publish order.
    let (all, _) = core.events.events_since(0);
    assert_eq!(all.len(), next);
}

#[tokio::test]
async fn test_vote_events_carry_live_threshold() {
    let core = core();
    let airlines = core.seed_airlines(4).await;
    let candidate = id("AL-5");

    core.admission.register_airline(&candidate, &airlines[0]).await.unwrap();
    core.admission.register_airline(&candidate, &airlines[1]).await.unwrap();

    let (events, _) = core.events.events_since(0);
    let votes: Vec<_> = events
        .iter()
        .filter(|event| matches!(event, Event::VoteRecorded { candidate: c, .. } if c == &candidate))
        .collect();
    assert_eq!(votes.len(), 2);
    assert!(matches!(votes[0], Event::VoteRecorded { votes: 1, required: 2, .. }));
    assert!(matches!(votes[1], Event::VoteRecorded { votes: 2, required: 2, .. }));
    assert!(events.contains(&Event::AirlineRegistered { airline: candidate, votes: 2 }));
}
