//! Access-log recorder flows: placeholder insertion and in-place completion.

use super::fixture::fixture;

#[tokio::test]
async fn image_result_then_access_report_completes_in_place() {
    let f = fixture();

    // Asynchronous image-analysis result arrives first.
    f.router
        .dispatch(
            "uploadImage-lambda/u1/d1",
            br#"{"userId":"u1","deviceId":"d1","fileUrl":"https://bucket.s3.amazonaws.com/history/u1/d1/x.jpg"}"#,
        )
        .await;
    assert_eq!(f.access_logs.len(), 1);

    let logs = f.coordinator.recent_access_logs().await.unwrap();
    assert_eq!(logs[0].status, "PENDING");
    assert_eq!(logs[0].user_name, "Unknown User");

    // The recognition verdict completes the same row; the count stays at 1.
    f.router
        .dispatch(
            "recentAccess-smartlock/u1/d1",
            br#"{"userId":"u1","deviceId":"d1","userName":"Ada","method":"FACEID","status":"SUCCESS","notes":"Front door"}"#,
        )
        .await;

    assert_eq!(f.access_logs.len(), 1);
    let logs = f.coordinator.recent_access_logs().await.unwrap();
    assert_eq!(logs[0].status, "SUCCESS");
    assert_eq!(logs[0].user_name, "Ada");
    assert_eq!(logs[0].notes, "Front door");
    assert_eq!(
        logs[0].image_url.as_deref(),
        Some("https://bucket.s3.amazonaws.com/history/u1/d1/x.jpg")
    );
}

#[tokio::test]
async fn access_report_without_placeholder_inserts_row() {
    let f = fixture();

    f.router
        .dispatch(
            "recentAccess-smartlock/u1/d1",
            br#"{"userId":"u1","deviceId":"d1","userName":"Ada","method":"FINGERPRINT","status":"FAILED","notes":null}"#,
        )
        .await;

    assert_eq!(f.access_logs.len(), 1);
    let logs = f.coordinator.recent_access_logs().await.unwrap();
    assert_eq!(logs[0].status, "FAILED");
    assert_eq!(logs[0].notes, "No notes provided");
}

#[tokio::test]
async fn two_image_results_then_one_report_leaves_one_open_placeholder() {
    let f = fixture();

    for url in ["https://b/x1.jpg", "https://b/x2.jpg"] {
        let body = format!(
            r#"{{"userId":"u1","deviceId":"d1","fileUrl":"{url}"}}"#
        );
        f.router
            .dispatch("uploadImage-lambda/u1/d1", body.as_bytes())
            .await;
    }
    assert_eq!(f.access_logs.len(), 2);

    f.router
        .dispatch(
            "recentAccess-smartlock/u1/d1",
            br#"{"userId":"u1","deviceId":"d1","userName":"Ada","method":"FACEID","status":"SUCCESS"}"#,
        )
        .await;

    // The most recent placeholder was completed; the other stays open.
    let logs = f.coordinator.recent_access_logs().await.unwrap();
    let open: Vec<_> = logs.iter().filter(|l| l.is_pending()).collect();
    assert_eq!(logs.len(), 2);
    assert_eq!(open.len(), 1);
}
