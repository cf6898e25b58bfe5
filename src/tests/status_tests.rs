use crate::session::{
    determine_status, determine_status_with, extract_task, has_tool_result, has_tool_use,
    status_sort_priority, truncate_chars, LogEntry, SessionStatus, StatusDecision,
};
use chrono::{DateTime, Duration, Utc};
use serde_json::json;

// Helper functions

fn t0() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2025-03-01T12:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

fn at(secs: i64) -> DateTime<Utc> {
    t0() + Duration::seconds(secs)
}

fn entry(value: serde_json::Value) -> LogEntry {
    LogEntry::parse_line(&value.to_string()).expect("fixture should parse")
}

fn assistant_tool_use(name: &str, secs: i64) -> LogEntry {
    entry(json!({
        "type": "assistant",
        "timestamp": at(secs).to_rfc3339(),
        "message": {"role": "assistant", "content": [
            {"type": "tool_use", "id": "toolu_1", "name": name, "input": {}}
        ]}
    }))
}

fn assistant_text(text: &str, secs: i64) -> LogEntry {
    entry(json!({
        "type": "assistant",
        "timestamp": at(secs).to_rfc3339(),
        "message": {"role": "assistant", "content": [{"type": "text", "text": text}]}
    }))
}

fn user_tool_result(secs: i64) -> LogEntry {
    entry(json!({
        "type": "user",
        "timestamp": at(secs).to_rfc3339(),
        "message": {"role": "user", "content": [
            {"type": "tool_result", "tool_use_id": "toolu_1", "content": "ok"}
        ]}
    }))
}

fn user_text(text: &str, secs: i64) -> LogEntry {
    entry(json!({
        "type": "user",
        "timestamp": at(secs).to_rfc3339(),
        "message": {"role": "user", "content": text}
    }))
}

fn turn_duration(secs: i64) -> LogEntry {
    entry(json!({
        "type": "system",
        "subtype": "turn_duration",
        "timestamp": at(secs).to_rfc3339(),
        "durationMs": 1200
    }))
}

fn assert_decision(decision: &StatusDecision, status: SessionStatus, task: &str) {
    assert_eq!(decision.status, status, "decision: {:?}", decision);
    assert_eq!(decision.task, task, "decision: {:?}", decision);
}

// Scenarios

#[test]
fn test_pending_tool_use_needs_input() {
    let entries = vec![assistant_tool_use("Bash", 0)];
    let decision = determine_status(&entries, true, at(2));
    assert_decision(&decision, SessionStatus::NeedsInput, "Using: Bash");
    assert!(!decision.is_ghost);
}

#[test]
fn test_tool_result_without_turn_end_is_working() {
    let entries = vec![assistant_tool_use("Edit", 0), user_tool_result(1)];
    let decision = determine_status(&entries, true, at(2));
    assert_decision(&decision, SessionStatus::Working, "Processing...");
}

#[test]
fn test_tool_result_followed_by_turn_end_is_waiting() {
    let entries = vec![
        assistant_tool_use("Edit", 0),
        user_tool_result(1),
        turn_duration(3),
    ];
    let decision = determine_status(&entries, true, at(4));
    assert_decision(&decision, SessionStatus::Waiting, "-");
}

#[test]
fn test_pending_tool_use_is_never_downgraded_by_staleness() {
    let entries = vec![user_text("deploy it", -10), assistant_tool_use("Bash", 0)];

    for elapsed in [60, 6 * 60, 2 * 60 * 60, 3 * 24 * 60 * 60] {
        let decision = determine_status(&entries, true, at(elapsed));
        assert_decision(&decision, SessionStatus::NeedsInput, "Using: Bash");
        assert!(!decision.is_ghost, "pending approval must not be a ghost");
    }
}

#[test]
fn test_tool_result_must_be_later_than_tool_use() {
    // Same timestamp is not "later": the tool call is still pending
    let entries = vec![assistant_tool_use("Write", 5), user_tool_result(5)];
    let decision = determine_status(&entries, true, at(6));
    assert_decision(&decision, SessionStatus::NeedsInput, "Using: Write");
}

#[test]
fn test_user_text_after_tool_use_keeps_it_pending() {
    let entries = vec![assistant_tool_use("Bash", 0), user_text("wait, not yet", 1)];
    let decision = determine_status(&entries, true, at(2));
    assert_decision(&decision, SessionStatus::NeedsInput, "Using: Bash");
}

#[test]
fn test_no_entries() {
    assert_decision(
        &determine_status(&[], true, at(0)),
        SessionStatus::Waiting,
        "-",
    );
    assert_decision(
        &determine_status(&[], false, at(0)),
        SessionStatus::Inactive,
        "-",
    );
}

#[test]
fn test_not_running_is_inactive_regardless_of_content() {
    let cases = vec![
        vec![assistant_tool_use("Bash", 0)],
        vec![assistant_tool_use("Edit", 0), user_tool_result(1)],
        vec![assistant_text("Working on it", 0)],
    ];
    for entries in cases {
        let decision = determine_status(&entries, false, at(1));
        assert_decision(&decision, SessionStatus::Inactive, "-");
        assert!(!decision.is_ghost);
    }
}

#[test]
fn test_stale_session_is_waiting() {
    let entries = vec![user_text("hi", 0), assistant_text("Hello!", 1)];

    let decision = determine_status(&entries, true, at(1 + 6 * 60));
    assert_decision(&decision, SessionStatus::Waiting, "-");
    assert!(!decision.is_ghost, "five minutes of silence is not a ghost");
}

#[test]
fn test_long_silence_flags_ghost() {
    let entries = vec![user_text("hi", 0), assistant_text("Hello!", 1)];

    let decision = determine_status(&entries, true, at(1 + 2 * 60 * 60));
    assert_decision(&decision, SessionStatus::Waiting, "-");
    assert!(decision.is_ghost);
}

#[test]
fn test_custom_ghost_threshold() {
    let entries = vec![user_text("hi", 0), assistant_text("Hello!", 1)];
    let now = at(1 + 20 * 60);

    let default = determine_status(&entries, true, now);
    assert!(!default.is_ghost);

    let short = determine_status_with(&entries, true, now, Duration::minutes(10));
    assert_decision(&short, SessionStatus::Waiting, "-");
    assert!(short.is_ghost);

    // Pending approval is never a ghost, whatever the threshold
    let pending = vec![assistant_tool_use("Bash", 0)];
    let decision = determine_status_with(&pending, true, now, Duration::zero());
    assert_eq!(decision.status, SessionStatus::NeedsInput);
    assert!(!decision.is_ghost);
}

#[test]
fn test_entries_without_timestamps_are_stale() {
    let entries = vec![entry(json!({
        "type": "assistant",
        "message": {"content": [{"type": "text", "text": "Hello"}]}
    }))];
    let decision = determine_status(&entries, true, at(0));
    assert_decision(&decision, SessionStatus::Waiting, "-");
    assert!(!decision.is_ghost);
}

#[test]
fn test_finished_turn_is_waiting() {
    let entries = vec![
        user_text("explain", 0),
        assistant_text("Here's how it works", 2),
        turn_duration(3),
    ];
    let decision = determine_status(&entries, true, at(5));
    assert_decision(&decision, SessionStatus::Waiting, "-");
}

#[test]
fn test_turn_end_at_same_time_as_assistant_is_waiting() {
    let entries = vec![assistant_text("Done", 2), turn_duration(2)];
    let decision = determine_status(&entries, true, at(5));
    assert_decision(&decision, SessionStatus::Waiting, "-");
}

#[test]
fn test_turn_end_before_new_assistant_output_is_working() {
    let entries = vec![
        assistant_text("First answer", 0),
        turn_duration(1),
        user_text("and then?", 10),
        assistant_text("Looking into the next step\nDetails follow", 12),
    ];
    let decision = determine_status(&entries, true, at(20));
    assert_decision(&decision, SessionStatus::Working, "Looking into the next step");
}

#[test]
fn test_recent_assistant_text_is_working_with_truncated_task() {
    let long = "a".repeat(80);
    let entries = vec![assistant_text(&long, 0)];
    let decision = determine_status(&entries, true, at(10));

    assert_eq!(decision.status, SessionStatus::Working);
    assert_eq!(decision.task.chars().count(), 50);
    assert!(decision.task.ends_with("..."));
}

#[test]
fn test_older_assistant_text_without_turn_end_is_waiting() {
    let entries = vec![user_text("hi", 0), assistant_text("Hello!", 1)];
    let decision = determine_status(&entries, true, at(1 + 45));
    assert_decision(&decision, SessionStatus::Waiting, "-");
}

#[test]
fn test_user_message_only_is_waiting() {
    // No assistant output yet; the latest activity is the prompt itself
    let entries = vec![user_text("start", 0)];
    let decision = determine_status(&entries, true, at(3));
    assert_decision(&decision, SessionStatus::Waiting, "-");
}

#[test]
fn test_determine_status_is_pure() {
    let entries = vec![
        user_text("go", 0),
        assistant_tool_use("Edit", 1),
        user_tool_result(2),
        assistant_text("Updated the file", 3),
    ];
    let first = determine_status(&entries, true, at(4));
    let second = determine_status(&entries, true, at(4));
    assert_eq!(first, second);
    assert_decision(&first, SessionStatus::Working, "Updated the file");
}

// Task extraction

#[test]
fn test_extract_task() {
    let mixed = entry(json!({
        "type": "assistant",
        "message": {"content": [
            {"type": "text", "text": "Reading the config"},
            {"type": "tool_use", "name": "Read", "input": {"file_path": "a.toml"}}
        ]}
    }));
    assert_eq!(extract_task(&mixed), "Using: Read");

    let text_first_line = assistant_text("\n  Summary line\nsecond line", 0);
    assert_eq!(extract_task(&text_first_line), "Summary line");

    let thinking_only = entry(json!({
        "type": "assistant",
        "message": {"content": [{"type": "thinking", "thinking": "..."}]}
    }));
    assert_eq!(extract_task(&thinking_only), "-");
}

#[test]
fn test_truncate_chars_counts_characters_not_bytes() {
    assert_eq!(truncate_chars("short", 50), "short");
    let accented = "é".repeat(60);
    let truncated = truncate_chars(&accented, 50);
    assert_eq!(truncated.chars().count(), 50);
    assert!(truncated.starts_with("ééé"));
    assert!(truncated.ends_with("..."));
}

#[test]
fn test_has_tool_use_and_tool_result() {
    let tool_use = assistant_tool_use("Bash", 0);
    assert!(has_tool_use(tool_use.content()));
    assert!(!has_tool_result(tool_use.content()));

    let tool_result = user_tool_result(0);
    assert!(has_tool_result(tool_result.content()));
    assert!(!has_tool_use(tool_result.content()));

    assert!(!has_tool_use(&[]));
}

#[test]
fn test_status_sort_priority() {
    assert_eq!(status_sort_priority(&SessionStatus::Working), 0);
    assert_eq!(status_sort_priority(&SessionStatus::NeedsInput), 1);
    assert_eq!(status_sort_priority(&SessionStatus::Waiting), 2);
    assert_eq!(status_sort_priority(&SessionStatus::Inactive), 3);
}
