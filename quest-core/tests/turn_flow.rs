//! Full-turn tests driven through the session with a scripted oracle.

use quest_core::catalog::EndConditions;
use quest_core::oracle::{FALLBACK_NARRATION, HISTORY_WINDOW};
use quest_core::rules::Notice;
use quest_core::testing::{
    assert_flag, assert_inventory, assert_outcome, assert_turns, sample_catalog, MockReply,
    TestHarness,
};
use quest_core::{
    Catalog, ChangeOp, GatewayConfig, InvalidCommandPolicy, MetaCommand, Outcome, Phase,
    SessionConfig, SessionError, TransportFailurePolicy, TurnOutput,
};
use std::time::Duration;

const RULES: &str = include_str!("../../quest/rules.json");

fn harness_with(session: SessionConfig, gateway: GatewayConfig) -> TestHarness {
    TestHarness::with_config(sample_catalog(), session.without_transcript(), gateway)
}

// =============================================================================
// ENDINGS
// =============================================================================

#[tokio::test]
async fn test_win_after_collecting_all_flags() {
    let mut harness = TestHarness::new();
    harness
        .expect_changes(
            "You lift the idol from its pedestal.",
            vec![ChangeOp::set("flags.has_idol", true)],
        )
        .expect_changes(
            "Sunlight! You stumble out of the temple.",
            vec![ChangeOp::set("flags.escaped", true)],
        );

    let first = harness.play("take idol").await;
    assert_eq!(first.outcome, Outcome::Continue);
    assert!(first.end_narration.is_none());

    let last = harness.play("go out").await;
    assert_eq!(last.outcome, Outcome::Win);
    assert_eq!(
        last.end_narration.as_deref(),
        Outcome::Win.default_narration()
    );
    assert_outcome(&harness, Outcome::Win);

    // Only the turn that kept the game going is in the history.
    assert_eq!(harness.session.history().len(), 1);
    assert_eq!(harness.session.history()[0].player, "take idol");
    assert!(matches!(
        harness.input("look").await,
        Err(SessionError::Terminated)
    ));
    assert_eq!(harness.oracle_calls(), 2);
}

#[tokio::test]
async fn test_lose_when_hp_runs_out() {
    let mut harness = TestHarness::new();
    harness.expect_changes(
        "A dart trap fires from the wall.",
        vec![ChangeOp::set("hp", 0)],
    );

    let report = harness.play("go north").await;

    assert_eq!(report.notices, vec![Notice::HpDepleted]);
    assert_flag(&harness, "hp_zero");
    assert_eq!(report.outcome, Outcome::Lose);
    assert_outcome(&harness, Outcome::Lose);
    assert!(harness.session.history().is_empty());
}

#[tokio::test]
async fn test_timeout_at_max_turns() {
    let mut catalog = sample_catalog();
    catalog.end_conditions = EndConditions {
        max_turns: 3,
        ..catalog.end_conditions
    };
    let mut harness = TestHarness::with_catalog(catalog);

    assert_eq!(harness.play("look").await.outcome, Outcome::Continue);
    assert_eq!(harness.play("look").await.outcome, Outcome::Continue);
    let last = harness.play("look").await;

    assert_eq!(last.turn, 3);
    assert_eq!(last.outcome, Outcome::Timeout);
    assert_outcome(&harness, Outcome::Timeout);
}

#[tokio::test]
async fn test_win_beats_lose_on_same_turn() {
    let mut harness = TestHarness::new();
    harness.expect_changes(
        "You escape with the idol, but the poison finishes you.",
        vec![
            ChangeOp::set("flags.has_idol", true),
            ChangeOp::set("flags.escaped", true),
            ChangeOp::set("flags.dead", true),
        ],
    );

    assert_eq!(harness.play("go out").await.outcome, Outcome::Win);
}

#[tokio::test]
async fn test_custom_end_text() {
    let catalog = Catalog::from_json(RULES).unwrap();
    let mut harness = TestHarness::with_catalog(catalog);
    harness.expect_changes(
        "The ceiling gives way.",
        vec![ChangeOp::set("flags.crushed", true)],
    );

    let report = harness.play("look").await;
    assert_eq!(report.outcome, Outcome::Lose);
    assert_eq!(
        report.end_narration.as_deref(),
        Some("💀 You have fallen. The temple claims another soul.")
    );
}

// =============================================================================
// STATE CHANGES AND ENFORCEMENT
// =============================================================================

#[tokio::test]
async fn test_inventory_limit_enforced_after_changes() {
    let mut harness = TestHarness::new();
    harness.expect_changes(
        "Your pack bulges.",
        vec![ChangeOp::set(
            "inventory",
            serde_json::json!(["torch", "rope", "key", "map", "coin", "idol"]),
        )],
    );

    let report = harness.play("take everything").await;

    assert_inventory(&harness, &["torch", "rope", "key", "map", "coin"]);
    assert_eq!(
        report.notices,
        vec![Notice::InventoryFull {
            dropped: vec!["idol".to_string()]
        }]
    );
}

#[tokio::test]
async fn test_turn_counter_owned_by_engine() {
    let mut harness = TestHarness::new();
    harness.expect_changes(
        "Time seems to bend.",
        vec![ChangeOp::set("turns", 40), ChangeOp::delete("turns")],
    );

    harness.play("look").await;
    assert_turns(&harness, 1);
}

#[tokio::test]
async fn test_garbage_reply_still_counts_as_turn() {
    let mut harness = TestHarness::new();
    harness.expect_reply(MockReply::text("Sure! The door opens."));

    let report = harness.play("open door").await;

    assert_eq!(report.narration, FALLBACK_NARRATION);
    assert_turns(&harness, 1);
    assert_eq!(harness.state().inventory, sample_catalog().start.inventory);
    assert_eq!(
        harness.session.history()[0].narration,
        FALLBACK_NARRATION
    );
}

#[tokio::test]
async fn test_rule_keys_stored_and_deleted() {
    let mut harness = TestHarness::new();
    harness
        .expect_changes(
            "You step into the hall.",
            vec![ChangeOp::set("location", "hall")],
        )
        .expect_changes(
            "The hall fades like a dream.",
            vec![ChangeOp::delete("location"), ChangeOp::delete("not_there")],
        );

    harness.play("go north").await;
    assert_eq!(
        harness.state().get("location"),
        Some(&serde_json::json!("hall"))
    );

    harness.play("look").await;
    assert_eq!(harness.state().get("location"), None);
}

// =============================================================================
// COMMANDS
// =============================================================================

#[tokio::test]
async fn test_meta_commands_are_free() {
    let mut harness = TestHarness::new();

    let help = harness.input("help").await.unwrap();
    assert_eq!(
        help,
        TurnOutput::Help {
            commands: sample_catalog().commands
        }
    );

    let inventory = harness.input("  INVENTORY ").await.unwrap();
    assert_eq!(
        inventory,
        TurnOutput::Inventory {
            items: vec!["torch".to_string()]
        }
    );

    assert_turns(&harness, 0);
    assert_eq!(harness.oracle_calls(), 0);
    assert_eq!(harness.session.phase(), Phase::AwaitingInput);
}

#[tokio::test]
async fn test_invalid_command_free_by_default() {
    let mut harness = TestHarness::new();

    let output = harness.input("dance").await.unwrap();

    assert!(matches!(output, TurnOutput::Rejected(ref e) if e.input == "dance"));
    assert_turns(&harness, 0);
    assert_eq!(harness.oracle_calls(), 0);
    assert!(harness.session.history().is_empty());
}

#[tokio::test]
async fn test_invalid_command_can_consume_turn() {
    let mut harness = harness_with(
        SessionConfig::default()
            .with_invalid_command_policy(InvalidCommandPolicy::ConsumesTurn),
        GatewayConfig::default(),
    );

    harness.input("dance").await.unwrap();
    harness.input("sing").await.unwrap();

    assert_turns(&harness, 2);
    assert_eq!(harness.oracle_calls(), 0);
    assert!(harness.session.history().is_empty());
}

#[tokio::test]
async fn test_quit_ends_without_outcome() {
    let mut harness = TestHarness::new();

    assert_eq!(harness.input("quit").await.unwrap(), TurnOutput::Quit);
    assert!(harness.session.is_terminated());
    assert_eq!(harness.session.outcome(), Outcome::Continue);
    assert_eq!(MetaCommand::Quit.to_string(), "quit");
}

// =============================================================================
// ORACLE PAYLOAD AND FAILURES
// =============================================================================

#[tokio::test]
async fn test_payload_carries_recent_turns_only() {
    let mut harness = TestHarness::new();
    for i in 1..=4 {
        harness.expect_narration(format!("Turn {i} passes."));
    }

    for action in ["look", "go north", "take coin", "use coin"] {
        harness.play(action).await;
    }

    let request = harness.oracle.last_request().unwrap();
    let last_turns = request.payload["last_turns"].as_array().unwrap();

    assert_eq!(last_turns.len(), HISTORY_WINDOW);
    assert_eq!(last_turns[0]["player"], "go north");
    assert_eq!(last_turns[1]["player"], "take coin");
    assert_eq!(last_turns[1]["narration"], "Turn 3 passes.");
    assert_eq!(request.payload["player_input"], "use coin");
    assert_eq!(request.payload["state"]["turns"], 4);
}

#[tokio::test]
async fn test_transport_failure_degrades_by_default() {
    let mut harness = TestHarness::new();
    harness.expect_reply(MockReply::Unreachable);

    let report = harness.play("look").await;

    assert_eq!(report.narration, FALLBACK_NARRATION);
    assert_turns(&harness, 1);
    assert_eq!(harness.session.history().len(), 1);
}

#[tokio::test]
async fn test_transport_failure_can_fail_turn() {
    let mut harness = harness_with(
        SessionConfig::default(),
        GatewayConfig::default().with_transport_failure_policy(TransportFailurePolicy::Fail),
    );
    harness.expect_reply(MockReply::Unreachable);

    let err = harness.input("look").await.unwrap_err();

    assert!(matches!(err, SessionError::Oracle(_)));
    assert_turns(&harness, 0);
    assert!(harness.session.history().is_empty());
    assert_eq!(harness.session.phase(), Phase::AwaitingInput);

    // The session carries on once the oracle is back.
    harness.expect_narration("The oracle clears its throat.");
    assert_eq!(harness.play("look").await.turn, 1);
}

#[tokio::test(start_paused = true)]
async fn test_slow_oracle_times_out() {
    let mut harness = harness_with(
        SessionConfig::default(),
        GatewayConfig::default().with_timeout(Duration::from_secs(10)),
    );
    harness.expect_reply(MockReply::Delayed(
        Duration::from_secs(300),
        r#"{"narration": "Finally."}"#.to_string(),
    ));

    let report = harness.play("look").await;
    assert_eq!(report.narration, FALLBACK_NARRATION);
}
