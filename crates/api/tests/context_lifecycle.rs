//! Application context startup and shutdown.

mod support;

use support::{TestApp, TestOptions};

#[tokio::test(flavor = "multi_thread")]
async fn housekeeping_starts_and_stops() {
    let app = TestApp::free();

    let mut scheduler = app
        .ctx
        .start_housekeeping()
        .await
        .expect("housekeeping should start")
        .expect("housekeeping is enabled by default");
    assert!(scheduler.is_running());

    scheduler.stop().await.expect("scheduler should stop");
    assert!(!scheduler.is_running());
}

#[tokio::test(flavor = "multi_thread")]
async fn disabled_housekeeping_starts_nothing() {
    let app = TestApp::build(TestOptions { disable_housekeeping: true, ..TestOptions::default() });
    let scheduler = app.ctx.start_housekeeping().await.expect("disabled housekeeping is not an error");
    assert!(scheduler.is_none());

    let report = app.ctx.housekeeping.sweep().await.expect("sweep on an empty database");
    assert_eq!(report.expired_holds, 0);
    assert_eq!(report.expired_checkouts, 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn health_check_pings_the_database() {
    let app = TestApp::free();
    let health = app.ctx.health_check().await;
    assert!(health.is_healthy);
    assert_eq!(health.components.len(), 2);
}
