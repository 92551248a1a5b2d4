//! Paid checkout over HTTP against a mocked Razorpay API.

mod support;

use axum::http::{Method, StatusCode};
use callslot_infra::sign_payment;
use chrono::Duration;
use serde_json::{json, Value};
use support::{booking_body, TestApp, TestOptions, KEY_ID, KEY_SECRET};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn razorpay() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/orders"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "order_1",
            "amount": 49900,
            "currency": "INR",
            "status": "created"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/payments/pay_1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "pay_1",
            "order_id": "order_1",
            "amount": 49900,
            "currency": "INR",
            "status": "captured",
            "captured": true
        })))
        .mount(&server)
        .await;
    server
}

fn paid_app(server: &MockServer) -> TestApp {
    TestApp::build(TestOptions {
        admin_token: true,
        payments_base: Some(server.uri()),
        ..TestOptions::default()
    })
}

fn verify_body(checkout_id: &str, signature: &str) -> Value {
    json!({
        "checkoutId": checkout_id,
        "razorpayOrderId": "order_1",
        "razorpayPaymentId": "pay_1",
        "razorpaySignature": signature
    })
}

#[tokio::test(flavor = "multi_thread")]
async fn checkout_then_verify_schedules_the_call() {
    let server = razorpay().await;
    let app = paid_app(&server);
    let body = booking_body("2025-03-01T20:00:00Z", 30);

    let (status, error) = app.send(Method::POST, "/calls/book", Some(body.clone())).await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    assert_eq!(error["message"], "Payment required. Use /calls/checkout.");

    let (status, session) = app.send(Method::POST, "/calls/checkout", Some(body.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(session["razorpay"]["keyId"], KEY_ID);
    assert_eq!(session["razorpay"]["orderId"], "order_1");
    assert_eq!(session["razorpay"]["amount"], 49_900);
    assert_eq!(session["razorpay"]["currency"], "INR");
    assert_eq!(session["checkout"]["expiresAt"], "2025-03-01T12:10:00Z");
    assert_eq!(session["timeZone"], "UTC");
    let checkout_id = session["checkout"]["id"].as_str().expect("checkout id").to_string();

    // The hold keeps a second buyer out until it lapses.
    let (status, conflict) = app.send(Method::POST, "/calls/checkout", Some(body)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(conflict["message"], "Slot already booked");

    let signature = sign_payment(KEY_SECRET, "order_1", "pay_1").expect("signature");
    let (status, verified) =
        app.send(Method::POST, "/calls/checkout/verify", Some(verify_body(&checkout_id, &signature))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(verified["booking"]["id"], checkout_id.as_str());
    assert_eq!(verified["booking"]["status"], "scheduled");
    assert_eq!(verified["booking"]["paymentStatus"], "paid");
    assert_eq!(verified["booking"]["amount"], 49_900);

    let (status, again) =
        app.send(Method::POST, "/calls/checkout/verify", Some(verify_body(&checkout_id, &signature))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(again["booking"]["id"], checkout_id.as_str());

    let (_, listing) = app.admin(Method::GET, "/admin/calls", None).await;
    assert_eq!(listing["bookings"].as_array().map(Vec::len), Some(1));
}

#[tokio::test(flavor = "multi_thread")]
async fn forged_signature_is_rejected() {
    let server = razorpay().await;
    let app = paid_app(&server);

    let (status, session) =
        app.send(Method::POST, "/calls/checkout", Some(booking_body("2025-03-01T21:00:00Z", 30))).await;
    assert_eq!(status, StatusCode::CREATED);
    let checkout_id = session["checkout"]["id"].as_str().expect("checkout id").to_string();

    let forged = sign_payment("not-the-secret", "order_1", "pay_1").expect("signature");
    let (status, error) =
        app.send(Method::POST, "/calls/checkout/verify", Some(verify_body(&checkout_id, &forged))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(error["message"].as_str().is_some_and(|m| m.to_lowercase().contains("signature")));

    let (_, listing) = app.admin(Method::GET, "/admin/calls?view=all", None).await;
    assert_eq!(listing["bookings"], json!([]));
}

#[tokio::test(flavor = "multi_thread")]
async fn lapsed_hold_releases_the_slot_for_others() {
    let server = razorpay().await;
    let app = paid_app(&server);
    let body = booking_body("2025-03-01T22:00:00Z", 30);

    let (status, _) = app.send(Method::POST, "/calls/checkout", Some(body)).await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, report) = app.send(Method::GET, "/calls/availability?durationMinutes=30&days=1", None).await;
    assert!(!report.to_string().contains("2025-03-01T22:00:00Z"));

    app.clock.advance(Duration::minutes(11));
    let (_, report) = app.send(Method::GET, "/calls/availability?durationMinutes=30&days=1", None).await;
    assert!(report.to_string().contains("2025-03-01T22:00:00Z"));

    let report = app.ctx.housekeeping.sweep().await.expect("sweep");
    assert_eq!(report.expired_holds, 1);
}
