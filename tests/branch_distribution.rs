//! Server-side branch assignment over many participants.
//!
//! Weighted random paths are drawn by the in-memory server reference with
//! a seeded generator, so the counts below are reproducible.

use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashMap;

use experiment_flow::adapters::gateway::InMemoryFlowGateway;
use experiment_flow::domain::flow::{Branch, BranchStep, ContentStep, FlowDefinition, Step};
use experiment_flow::domain::foundation::{ParticipantId, ParticipantSession, SessionId};
use experiment_flow::ports::{AdvanceOutcome, AdvanceRequest, FlowGateway};

const PARTICIPANTS: usize = 10_000;

fn path_step(id: &str) -> Vec<Step> {
    vec![Step::Consent(ContentStep::new(id, "Path content"))]
}

fn gateway_with(branches: Vec<Branch>, seed: u64) -> (InMemoryFlowGateway, SessionId) {
    let session_id = SessionId::new("weights").unwrap();
    let gateway = InMemoryFlowGateway::with_rng(Box::new(StdRng::seed_from_u64(seed)));
    gateway
        .register_flow(
            session_id.clone(),
            FlowDefinition::new(vec![Step::Branch(BranchStep::new("split", branches))]),
        )
        .unwrap();
    (gateway, session_id)
}

async fn assign_all(gateway: &InMemoryFlowGateway, session_id: &SessionId) -> HashMap<String, usize> {
    for n in 0..PARTICIPANTS {
        let participant = ParticipantSession::new(
            session_id.clone(),
            ParticipantId::new(format!("p-{n}")).unwrap(),
        );
        let outcome = gateway
            .advance(&participant, AdvanceRequest::new("split", None))
            .await
            .unwrap();
        assert!(matches!(outcome, AdvanceOutcome::Next { .. }));
    }

    let mut counts = HashMap::new();
    for assignment in gateway.branch_assignments(session_id) {
        *counts.entry(assignment.branch_id).or_insert(0) += 1;
    }
    counts
}

#[tokio::test]
async fn one_to_three_weights_split_one_to_three() {
    let (gateway, session_id) = gateway_with(
        vec![
            Branch::random("light", 1, path_step("light_1")),
            Branch::random("heavy", 3, path_step("heavy_1")),
        ],
        2024,
    );
    let counts = assign_all(&gateway, &session_id).await;

    let light = counts.get("light").copied().unwrap_or(0);
    let heavy = counts.get("heavy").copied().unwrap_or(0);
    assert_eq!(light + heavy, PARTICIPANTS);

    // Expected 2500 with a standard deviation of about 43.
    assert!(
        (2_280..=2_720).contains(&light),
        "light path selected {light} times out of {PARTICIPANTS}"
    );
    let ratio = heavy as f64 / light as f64;
    assert!((2.6..=3.4).contains(&ratio), "ratio was {ratio}");
}

#[tokio::test]
async fn zero_and_negative_weights_are_never_selected() {
    let (gateway, session_id) = gateway_with(
        vec![
            Branch::random("zero", 0, path_step("zero_1")),
            Branch::random("negative", -4, path_step("negative_1")),
            Branch::random("only", 2, path_step("only_1")),
        ],
        7,
    );
    let counts = assign_all(&gateway, &session_id).await;
    assert_eq!(counts.get("only"), Some(&PARTICIPANTS));
    assert_eq!(counts.len(), 1);
}

#[tokio::test]
async fn branch_without_selectable_paths_is_passed_over() {
    let session_id = SessionId::new("empty").unwrap();
    let gateway = InMemoryFlowGateway::with_rng(Box::new(StdRng::seed_from_u64(1)));
    gateway
        .register_flow(
            session_id.clone(),
            FlowDefinition::new(vec![
                Step::Branch(BranchStep::new(
                    "split",
                    vec![Branch::random("off", 0, path_step("off_1"))],
                )),
                Step::Debriefing(ContentStep::new("end", "Bye")),
            ]),
        )
        .unwrap();
    let participant =
        ParticipantSession::new(session_id.clone(), ParticipantId::new("p").unwrap());

    let outcome = gateway
        .advance(&participant, AdvanceRequest::new("split", None))
        .await
        .unwrap();
    match outcome {
        AdvanceOutcome::Next { next_step, .. } => assert_eq!(next_step.step_id(), "end"),
        other => panic!("unexpected outcome {other:?}"),
    }
    assert!(gateway.branch_assignments(&session_id).is_empty());
}
