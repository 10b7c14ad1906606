use idle_core::{
    reconcile, ActionId, ActionKind, ActionPayload, ActionStatus, PlayerId, PlayerState, QueuedAction,
};

fn entry(id: &str, payload: ActionPayload, start: i64, end: i64) -> QueuedAction {
    QueuedAction {
        id: ActionId::from_str(id),
        payload,
        start_unix: start,
        end_unix: Some(end),
        status: ActionStatus::Pending,
    }
}

fn iron(amount: u64) -> ActionPayload {
    ActionPayload::Mining { resource_type: "iron".into(), amount }
}

fn sample_state() -> PlayerState {
    let mut s = PlayerState::new(PlayerId::from_str("player-1"), 1_000);
    s.queue.push(entry("a", iron(50), 1_000, 1_100));
    s.queue.push(entry("b", iron(20), 1_100, 1_400));
    s.queue.push(entry(
        "c",
        ActionPayload::BuildingUpgrade { building_id: "mine".into(), target_level: 2 },
        1_400,
        2_000,
    ));
    s
}

#[test]
fn test_new_player_is_empty() {
    let s = PlayerState::new(PlayerId::from_str("p"), 42);
    assert!(s.resources.is_empty());
    assert!(s.buildings.is_empty());
    assert!(s.queue.is_empty());
    assert_eq!(s.checkpoint_unix, 42);
}

#[test]
fn test_action_id_new() {
    assert_ne!(ActionId::new(), ActionId::new());
}

#[test]
fn test_single_mining_entry_resolves() {
    let mut s = PlayerState::new(PlayerId::from_str("p"), 0);
    s.queue.push(entry("m", iron(50), 0, 500));

    let out = reconcile(s, 501);
    assert_eq!(out.resources.get("iron"), Some(&50));
    assert!(out.queue.is_empty());
    assert_eq!(out.checkpoint_unix, 501);
}

#[test]
fn test_reconcile_is_idempotent_at_fixed_time() {
    for t in [900, 1_000, 1_099, 1_100, 1_250, 1_400, 1_999, 2_000, 5_000] {
        let once = reconcile(sample_state(), t);
        let twice = reconcile(once.clone(), t);
        assert_eq!(once, twice, "t={t}");
    }
}

#[test]
fn test_checkpoint_is_monotonic() {
    let mut s = sample_state();
    let mut last = s.checkpoint_unix;
    for t in [1_000, 1_050, 1_050, 1_300, 1_900, 2_500] {
        s = reconcile(s, t);
        assert!(s.checkpoint_unix >= last);
        last = s.checkpoint_unix;
    }
    // a stale clock never rewinds it either
    s = reconcile(s, 100);
    assert_eq!(s.checkpoint_unix, last);
}

#[test]
fn test_no_income_before_checkpoint() {
    let mut s = sample_state();
    s.checkpoint_unix = 10_000;
    let out = reconcile(s.clone(), 9_000);
    assert_eq!(out.resources, s.resources);
    assert_eq!(out.buildings, s.buildings);
    assert_eq!(out.queue, s.queue);
}

#[test]
fn test_stepwise_equals_single_jump() {
    let stepped = [1_050, 1_200, 1_500, 2_100].iter().fold(sample_state(), |s, t| reconcile(s, *t));
    let jumped = reconcile(sample_state(), 2_100);
    assert_eq!(stepped, jumped);
    assert_eq!(jumped.resources.get("iron"), Some(&70));
    assert_eq!(jumped.building_level("mine"), 2);
}

#[test]
fn test_partial_drain_preserves_remaining_times() {
    let out = reconcile(sample_state(), 1_200);
    assert_eq!(out.resources.get("iron"), Some(&50));
    assert_eq!(out.queue.len(), 2);
    assert_eq!(out.queue[0].start_unix, 1_100);
    assert_eq!(out.queue[0].end_unix, Some(1_400));
    assert_eq!(out.queue[0].status, ActionStatus::Pending);
}

#[test]
fn test_unknown_persisted_kind_deserializes_and_drops() {
    let json = r#"{
        "id": "player-x",
        "resources": {"iron": 3},
        "queue": [
            {"id": "q1", "payload": {"kind": "fishing", "fish": "trout", "amount": 9},
             "start_unix": 0, "end_unix": 10, "status": "Pending"}
        ],
        "checkpoint_unix": 0
    }"#;
    let s: PlayerState = serde_json::from_str(json).unwrap();
    assert_eq!(s.queue[0].payload.kind(), ActionKind::Unknown);

    let out = reconcile(s, 10);
    assert!(out.queue.is_empty());
    assert_eq!(out.resources.get("iron"), Some(&3));
    assert_eq!(out.resources.len(), 1);
}

#[test]
fn test_missing_end_time_is_kept() {
    let json = r#"{
        "id": "player-y",
        "queue": [
            {"id": "q1", "payload": {"kind": "mining", "resource_type": "iron", "amount": 9},
             "start_unix": 0}
        ],
        "checkpoint_unix": 0
    }"#;
    let s: PlayerState = serde_json::from_str(json).unwrap();
    assert_eq!(s.queue[0].end_unix, None);
    let out = reconcile(s, 1_000_000);
    assert_eq!(out.queue.len(), 1);
    assert!(out.resources.is_empty());
}

#[test]
fn test_far_future_now_from_negative_checkpoint_does_not_overflow() {
    let mut s = PlayerState::new(PlayerId::from_str("p"), -10);
    s.queue.push(entry("a", iron(5), -10, 0));

    let (out, report) = idle_core::reconcile_with_report(s, i64::MAX);
    assert_eq!(report.elapsed_secs, i64::MAX);
    assert!(!report.clock_skew);
    assert_eq!(out.checkpoint_unix, i64::MAX);
    assert_eq!(out.resources.get("iron"), Some(&5));
}

#[test]
fn test_unreadable_payload_keeps_its_text_through_serde() {
    let json = r#"{
        "id": "player-z",
        "queue": [
            {"id": "q1", "payload": {"kind": "mining", "resource_type": "iron", "amount": "50"},
             "start_unix": 0, "end_unix": 10, "status": "Pending"}
        ],
        "checkpoint_unix": 0
    }"#;
    let s: PlayerState = serde_json::from_str(json).unwrap();
    assert_eq!(s.queue[0].payload.kind(), ActionKind::Malformed);
    assert_eq!(s.queue[0].payload.kind_name(), "mining");

    let out = reconcile(s, 100);
    assert_eq!(out.queue.len(), 1);
    assert!(out.resources.is_empty());

    let written = serde_json::to_value(&out.queue[0].payload).unwrap();
    assert_eq!(written, serde_json::json!({"kind": "mining", "resource_type": "iron", "amount": "50"}));
}
