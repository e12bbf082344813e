#[path = "support.rs"]
mod support;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use attendance_tracker_lib::error::AppError;
use attendance_tracker_lib::models::attendance::EventType;
use attendance_tracker_lib::models::employee::EmployeeStatus;
use attendance_tracker_lib::services::notification_service::{
    LineNotifier, NotificationService, Notifier,
};
use httpmock::prelude::*;
use serde_json::json;
use support::{harness_at, register, register_admin, seed_punch, taipei, RecordingNotifier};

const TODAY: &str = "2024-06-10";

fn enable(h: &support::Harness, key: &str, value: &str) {
    let changes: HashMap<String, String> = [(key.to_string(), value.to_string())].into_iter().collect();
    h.state.settings().update(&changes).expect("settings");
}

#[tokio::test]
async fn line_notifier_posts_push_message() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v2/bot/message/push")
                .header("authorization", "Bearer channel-token")
                .json_body(json!({
                    "to": "U0001",
                    "messages": [{ "type": "text", "text": "早安" }]
                }));
            then.status(200).json_body(json!({}));
        })
        .await;

    let notifier =
        LineNotifier::try_new(&server.base_url(), "channel-token".to_string(), Duration::from_secs(5))
            .expect("client");
    notifier.push_text("U0001", "早安").await.expect("push");

    mock.assert_async().await;
}

#[tokio::test]
async fn line_notifier_retries_server_errors_then_gives_up() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/v2/bot/message/push");
            then.status(500).body("upstream down");
        })
        .await;

    let notifier = LineNotifier::try_new(
        &format!("{}/", server.base_url()),
        "channel-token".to_string(),
        Duration::from_secs(5),
    )
    .expect("client")
    .with_retry_delays(vec![Duration::ZERO, Duration::ZERO]);

    match notifier.push_text("U0001", "hello").await {
        Err(AppError::Notification { message }) => {
            assert_eq!(message, "LINE API 回應 500: upstream down")
        }
        other => panic!("expected notification error, got {other:?}"),
    }
    mock.assert_hits_async(3).await;
}

#[tokio::test]
async fn line_notifier_does_not_retry_client_errors() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/v2/bot/message/push");
            then.status(400).body("invalid user");
        })
        .await;

    let notifier =
        LineNotifier::try_new(&server.base_url(), "channel-token".to_string(), Duration::from_secs(5))
            .expect("client")
            .with_retry_delays(vec![Duration::ZERO]);

    let err = notifier.push_text("bad-id", "hello").await.unwrap_err();
    assert!(matches!(err, AppError::Notification { .. }));
    mock.assert_hits_async(1).await;
}

#[tokio::test]
async fn broadcast_isolates_failed_recipients() {
    let notifier = Arc::new(RecordingNotifier::failing_for(&["U0002"]));
    let service = NotificationService::new(notifier.clone());
    let recipients = vec!["U0001".to_string(), "U0002".to_string(), "U0003".to_string()];

    let outcome = service.broadcast(&recipients, "公告").await;
    assert_eq!(outcome.sent, 2);
    assert_eq!(outcome.failed, 1);
    assert_eq!(
        notifier.messages(),
        vec![
            ("U0001".to_string(), "公告".to_string()),
            ("U0003".to_string(), "公告".to_string()),
        ]
    );
}

#[tokio::test]
async fn alerts_are_skipped_while_disabled() {
    let notifier = Arc::new(RecordingNotifier::default());
    let h = harness_at(taipei(2024, 6, 10, 10, 30), notifier.clone());
    register_admin(&h.state, "Uadmin1", "店長");

    let summary = h.state.alerts().run().await.expect("run");
    assert!(summary.skipped);
    assert_eq!(summary.total, 0);
    assert!(notifier.messages().is_empty());
    assert!(h.state.anomalies().today_anomalies().is_empty());
}

#[tokio::test]
async fn alerts_reach_every_reachable_admin() {
    let notifier = Arc::new(RecordingNotifier::failing_for(&["Uadmin2"]));
    let h = harness_at(taipei(2024, 6, 10, 10, 30), notifier.clone());
    enable(&h, "enableAlerts", "true");

    register_admin(&h.state, "Uadmin1", "店長");
    register_admin(&h.state, "Uadmin2", "副店長");
    register(&h.state, "U0001", "小明");
    register(&h.state, "U0002", "小華");
    register(&h.state, "U0003", "小美");
    seed_punch(&h.pool, "Uadmin1", "店長", EventType::In, TODAY, "08:40:00");
    seed_punch(&h.pool, "Uadmin2", "副店長", EventType::In, TODAY, "08:45:00");
    seed_punch(&h.pool, "U0001", "小明", EventType::In, TODAY, "09:45:00");
    seed_punch(&h.pool, "U0003", "小美", EventType::In, TODAY, "08:55:00");
    seed_punch(&h.pool, "U0003", "小美", EventType::In, TODAY, "08:57:00");

    let summary = h.state.alerts().run().await.expect("run");
    assert!(!summary.skipped);
    assert_eq!(summary.total, 3);
    assert_eq!(summary.high, 2);
    assert_eq!(summary.low, 1);
    assert_eq!(summary.notified, 1);
    assert_eq!(summary.failed, 1);

    let sent = notifier.messages();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "Uadmin1");
    let text = &sent[0].1;
    assert!(text.starts_with("🚨 異常打卡警報：發現 2 個異常"));
    assert!(text.contains("・小明：遲到 45 分鐘（高）"));
    assert!(text.contains("・小華：未打上班卡（高）"));
    assert!(!text.contains("小美"));

    assert_eq!(h.state.anomalies().today_anomalies().len(), 3);
}

#[tokio::test]
async fn only_low_findings_send_nothing() {
    let notifier = Arc::new(RecordingNotifier::default());
    let h = harness_at(taipei(2024, 6, 10, 10, 30), notifier.clone());
    enable(&h, "enableAlerts", "true");
    register_admin(&h.state, "Uadmin1", "店長");
    seed_punch(&h.pool, "Uadmin1", "店長", EventType::In, TODAY, "08:40:00");
    seed_punch(&h.pool, "Uadmin1", "店長", EventType::In, TODAY, "08:41:00");

    let summary = h.state.alerts().run().await.expect("run");
    assert_eq!(summary.total, 1);
    assert_eq!(summary.low, 1);
    assert_eq!(summary.notified, 0);
    assert!(notifier.messages().is_empty());
}

#[tokio::test]
async fn morning_reminder_goes_to_active_employees() {
    let notifier = Arc::new(RecordingNotifier::failing_for(&["U0003"]));
    let h = harness_at(taipei(2024, 6, 10, 9, 0), notifier.clone());
    register(&h.state, "U0001", "小明");
    register(&h.state, "U0002", "小華");
    register(&h.state, "U0003", "小美");
    register(&h.state, "U0004", "阿哲");
    h.state
        .employees()
        .set_status("U0004", EmployeeStatus::Inactive)
        .expect("deactivate");

    let outcome = h.state.reminders().morning().await.expect("morning");
    assert_eq!(outcome.targeted, 3);
    assert_eq!(outcome.sent, 2);
    assert_eq!(outcome.failed, 1);
    assert_eq!(
        notifier.messages()[0],
        (
            "U0001".to_string(),
            "早安，小明！新的一天開始了，別忘了打卡喔！".to_string()
        )
    );
}

#[tokio::test]
async fn evening_reminder_targets_open_sessions() {
    let notifier = Arc::new(RecordingNotifier::default());
    let h = harness_at(taipei(2024, 6, 10, 18, 5), notifier.clone());
    register(&h.state, "U0001", "小明");
    register(&h.state, "U0002", "小華");
    register(&h.state, "U0003", "小美");
    seed_punch(&h.pool, "U0001", "小明", EventType::In, TODAY, "09:00:00");
    seed_punch(&h.pool, "U0002", "小華", EventType::In, TODAY, "09:00:00");
    seed_punch(&h.pool, "U0002", "小華", EventType::Out, TODAY, "18:00:00");
    seed_punch(&h.pool, "U0003", "小美", EventType::In, "2024-06-09", "09:00:00");

    let outcome = h.state.reminders().evening().await.expect("evening");
    assert_eq!(outcome.targeted, 1);
    assert_eq!(
        notifier.messages(),
        vec![(
            "U0001".to_string(),
            "辛苦了，小明！一天的工作結束了，記得打卡下班喔！（已工作 9 小時 5 分鐘）".to_string()
        )]
    );
}

#[tokio::test]
async fn reminders_respect_settings_switch() {
    let notifier = Arc::new(RecordingNotifier::default());
    let h = harness_at(taipei(2024, 6, 10, 9, 0), notifier.clone());
    register(&h.state, "U0001", "小明");
    enable(&h, "enableReminders", "false");

    assert!(h.state.reminders().morning().await.expect("morning").skipped);
    assert!(h.state.reminders().evening().await.expect("evening").skipped);
    assert!(notifier.messages().is_empty());
}
