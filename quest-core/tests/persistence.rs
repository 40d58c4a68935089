//! Save/load and transcript tests through the session.

use quest_core::testing::{assert_flag, assert_turns, sample_catalog, MockReply, TestHarness};
use quest_core::oracle::FALLBACK_NARRATION;
use quest_core::{ChangeOp, GatewayConfig, SessionConfig, SessionError, TurnOutput};
use tempfile::tempdir;

#[tokio::test]
async fn test_save_then_load_restores_game() {
    let dir = tempdir().unwrap();
    let save_path = dir.path().join("save.json");
    let mut harness = TestHarness::with_config(
        sample_catalog(),
        SessionConfig::default()
            .without_transcript()
            .with_save_path(&save_path),
        GatewayConfig::default(),
    );

    harness.expect_changes(
        "You find a rusty key.",
        vec![ChangeOp::set("flags.has_key", true)],
    );
    harness.play("take key").await;

    let saved = harness.input("save").await.unwrap();
    assert_eq!(saved, TurnOutput::Saved { path: save_path.clone() });

    harness.expect_changes(
        "You drop the key down a well.",
        vec![ChangeOp::set("flags.has_key", false)],
    );
    harness.play("use key").await;
    assert_turns(&harness, 2);

    let loaded = harness.input("load").await.unwrap();
    assert_eq!(loaded, TurnOutput::Loaded { path: save_path });

    assert_turns(&harness, 1);
    assert_flag(&harness, "has_key");
    assert_eq!(harness.session.history().len(), 1);
    assert_eq!(harness.session.history()[0].player, "take key");

    // Neither save nor load costs a turn or an oracle call.
    assert_eq!(harness.oracle_calls(), 2);
}

#[tokio::test]
async fn test_load_without_save_is_recoverable() {
    let dir = tempdir().unwrap();
    let mut harness = TestHarness::with_config(
        sample_catalog(),
        SessionConfig::default()
            .without_transcript()
            .with_save_path(dir.path().join("save.json")),
        GatewayConfig::default(),
    );

    let err = harness.input("load").await.unwrap_err();
    assert!(matches!(err, SessionError::Persist(_)));

    harness.expect_narration("Still here.");
    assert_eq!(harness.play("look").await.narration, "Still here.");
}

#[tokio::test]
async fn test_transcript_records_each_turn() {
    let dir = tempdir().unwrap();
    let transcript = dir.path().join("samples").join("transcript.txt");
    let mut harness = TestHarness::with_config(
        sample_catalog(),
        SessionConfig::default().with_transcript_path(&transcript),
        GatewayConfig::default(),
    );

    harness.expect_changes(
        "A cold draft.",
        vec![ChangeOp::set("flags.door_open", true)],
    );
    harness.play("open door").await;
    harness.input("help").await.unwrap();
    harness.input("dance").await.unwrap();

    let text = std::fs::read_to_string(&transcript).unwrap();

    assert_eq!(text.matches("] PLAYER:\n").count(), 1);
    assert_eq!(text.matches("] GM:\n").count(), 1);
    assert!(text.contains("] PLAYER:\nopen door\n\n"));
    assert!(text.contains("\"narration\": \"A cold draft.\""));
    assert!(text.contains("\"key\": \"flags.door_open\""));
}

#[tokio::test]
async fn test_transcript_keeps_reply_as_sent() {
    let dir = tempdir().unwrap();
    let transcript = dir.path().join("transcript.txt");
    let mut harness = TestHarness::with_config(
        sample_catalog(),
        SessionConfig::default().with_transcript_path(&transcript),
        GatewayConfig::default(),
    );

    harness.expect_reply(MockReply::text(
        "```json\n{\"narration\":\"ok\",\"mood\":\"grim\",\"state_change\":[{\"action\":\"set\",\"key\":\"hp\"}]}\n```",
    ));
    let report = harness.play("look").await;
    assert_eq!(report.narration, "ok");

    let text = std::fs::read_to_string(&transcript).unwrap();
    assert!(text.contains("\"mood\": \"grim\""));
    assert!(text.contains("\"key\": \"hp\""));
    assert!(!text.contains("```"));
}

#[tokio::test]
async fn test_transcript_logs_fallback_when_oracle_unreachable() {
    let dir = tempdir().unwrap();
    let transcript = dir.path().join("transcript.txt");
    let mut harness = TestHarness::with_config(
        sample_catalog(),
        SessionConfig::default().with_transcript_path(&transcript),
        GatewayConfig::default(),
    );

    harness.expect_reply(MockReply::Unreachable);
    harness.play("look").await;

    let text = std::fs::read_to_string(&transcript).unwrap();
    assert!(text.contains(&format!("\"narration\": \"{FALLBACK_NARRATION}\"")));
    assert!(text.contains("\"state_change\": []"));
}

#[tokio::test]
async fn test_final_turn_is_not_recorded() {
    let dir = tempdir().unwrap();
    let transcript = dir.path().join("transcript.txt");
    let mut harness = TestHarness::with_config(
        sample_catalog(),
        SessionConfig::default().with_transcript_path(&transcript),
        GatewayConfig::default(),
    );

    harness
        .expect_narration("Dust settles.")
        .expect_changes(
            "The floor gives way.",
            vec![ChangeOp::set("flags.dead", true)],
        );
    harness.play("look").await;
    let report = harness.play("go down").await;

    assert_eq!(report.narration, "The floor gives way.");
    assert_eq!(harness.session.history().len(), 1);

    let text = std::fs::read_to_string(&transcript).unwrap();
    assert!(text.contains("Dust settles."));
    assert!(!text.contains("The floor gives way."));
    assert_eq!(text.matches("] PLAYER:\n").count(), 1);
}

#[tokio::test]
async fn test_ending_on_first_turn_writes_nothing() {
    let dir = tempdir().unwrap();
    let transcript = dir.path().join("transcript.txt");
    let mut harness = TestHarness::with_config(
        sample_catalog(),
        SessionConfig::default().with_transcript_path(&transcript),
        GatewayConfig::default(),
    );

    harness.expect_changes("You fall.", vec![ChangeOp::set("flags.dead", true)]);
    harness.play("look").await;

    assert!(harness.session.history().is_empty());
    assert!(!transcript.exists());
}
