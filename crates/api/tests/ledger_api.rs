//! End-to-end tests of the referral ledger HTTP surface.
//!
//! Run with: cargo test --test ledger_api

mod common;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
};
use common::{
    decimal, get_request_with_auth, json_request_with_auth, parse_response_body,
    post_request_with_auth, recurring_policy, TestApp,
};
use rust_decimal::Decimal;
use serde_json::json;
use uuid::Uuid;

async fn refer(app: &TestApp, referrer_slug: &str, referred: Uuid) -> StatusCode {
    app.send(json_request_with_auth(
        Method::POST,
        "/api/v1/referrals",
        json!({ "referral_code": referrer_slug, "utm_source": "instagram" }),
        &app.user_token(referred),
    ))
    .await
    .status()
}

async fn pay(app: &TestApp, referred: Uuid, amount: &str, reference: &str) -> serde_json::Value {
    let response = app
        .send(app.payment_webhook(json!({
            "referred_user_id": referred,
            "payment_amount": amount,
            "external_payment_ref": reference
        })))
        .await;
    parse_response_body(response).await
}

// ============================================================================
// Health and authentication
// ============================================================================

#[tokio::test]
async fn test_liveness_probe() {
    let app = TestApp::new();
    let response = app
        .send(
            Request::builder()
                .uri("/api/health/live")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn test_request_id_echoed() {
    let app = TestApp::new();
    let response = app
        .send(
            Request::builder()
                .uri("/api/health/live")
                .header("X-Request-ID", "req-abc-123")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

    assert_eq!(response.headers()["x-request-id"], "req-abc-123");
}

#[tokio::test]
async fn test_missing_token_rejected() {
    let app = TestApp::new();
    let response = app
        .send(
            Request::builder()
                .uri("/api/v1/referrals/balance")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = parse_response_body(response).await;
    assert_eq!(body["error"], "unauthorized");
}

#[tokio::test]
async fn test_user_token_cannot_reach_admin_routes() {
    let app = TestApp::new();
    let user = app.add_user("maria");

    let response = app
        .send(get_request_with_auth(
            "/api/v1/admin/referral-config",
            &app.user_token(user),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

// ============================================================================
// Referral attribution
// ============================================================================

#[tokio::test]
async fn test_register_referral_once_per_user() {
    let app = TestApp::new();
    app.add_user("maria");
    app.add_user("carla");
    let joao = app.add_user("joao");

    assert_eq!(refer(&app, "maria", joao).await, StatusCode::CREATED);

    let response = app
        .send(json_request_with_auth(
            Method::POST,
            "/api/v1/referrals",
            json!({ "referral_code": "carla" }),
            &app.user_token(joao),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = parse_response_body(response).await;
    assert_eq!(body["error"], "already_referred");
}

#[tokio::test]
async fn test_self_referral_rejected() {
    let app = TestApp::new();
    let maria = app.add_user("maria");

    let response = app
        .send(json_request_with_auth(
            Method::POST,
            "/api/v1/referrals",
            json!({ "referral_code": "maria" }),
            &app.user_token(maria),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = parse_response_body(response).await;
    assert_eq!(body["error"], "self_referral");
}

#[tokio::test]
async fn test_unknown_code_rejected() {
    let app = TestApp::new();
    let joao = app.add_user("joao");

    let response = app
        .send(json_request_with_auth(
            Method::POST,
            "/api/v1/referrals",
            json!({ "referral_code": "nobody" }),
            &app.user_token(joao),
        ))
        .await;

    let body = parse_response_body(response).await;
    assert_eq!(body["error"], "invalid_code");
}

#[tokio::test]
async fn test_empty_code_is_validation_error() {
    let app = TestApp::new();
    let joao = app.add_user("joao");

    let response = app
        .send(json_request_with_auth(
            Method::POST,
            "/api/v1/referrals",
            json!({ "referral_code": "" }),
            &app.user_token(joao),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = parse_response_body(response).await;
    assert_eq!(body["error"], "validation_error");
    assert_eq!(body["details"][0]["field"], "referral_code");
}

#[tokio::test]
async fn test_referral_listing_and_link() {
    let app = TestApp::new();
    let maria = app.add_user("maria");
    let joao = app.add_named_user("joao", "User joao");
    refer(&app, "maria", joao).await;

    let response = app
        .send(get_request_with_auth(
            "/api/v1/referrals?page=1&per_page=10",
            &app.user_token(maria),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_response_body(response).await;
    assert_eq!(body["referrals"].as_array().unwrap().len(), 1);
    assert_eq!(body["referrals"][0]["referred_display_name"], "User joao");
    assert_eq!(body["referrals"][0]["status"], "pending");
    assert_eq!(body["per_page"], 10);

    let response = app
        .send(get_request_with_auth(
            "/api/v1/referrals/link",
            &app.user_token(maria),
        ))
        .await;
    let body = parse_response_body(response).await;
    assert_eq!(body["referral_code"], "maria");
    assert_eq!(body["url"], "https://app.example.com/signup?ref=maria");
}

// ============================================================================
// Payment webhook
// ============================================================================

#[tokio::test]
async fn test_webhook_requires_valid_signature() {
    let app = TestApp::new();

    let response = app
        .send(
            Request::builder()
                .method(Method::POST)
                .uri("/api/v1/webhooks/payments")
                .header("content-type", "application/json")
                .header("X-Webhook-Signature", "sha256=deadbeef")
                .body(Body::from(r#"{"referred_user_id":"00000000-0000-0000-0000-000000000000","payment_amount":"10.00"}"#))
                .unwrap(),
        )
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_webhook_for_unreferred_user_is_ignored() {
    let app = TestApp::new();
    app.put_config(recurring_policy()).await;

    let body = pay(&app, Uuid::new_v4(), "100.00", "pay_unknown").await;
    assert_eq!(body["status"], "ignored");
    assert_eq!(body["reason"], "no_referrer");
}

#[tokio::test]
async fn test_webhook_retry_is_deduplicated() {
    let app = TestApp::new();
    app.add_user("maria");
    let joao = app.add_user("joao");
    refer(&app, "maria", joao).await;
    app.put_config(recurring_policy()).await;

    let first = pay(&app, joao, "1000.00", "pay_1").await;
    assert_eq!(first["status"], "recorded");
    assert_eq!(decimal(&first["commission_amount"]), Decimal::new(10000, 2));

    let retry = pay(&app, joao, "1000.00", "pay_1").await;
    assert_eq!(retry["status"], "ignored");
    assert_eq!(retry["reason"], "duplicate_commission");
}

#[tokio::test]
async fn test_disabled_program_ignores_payments() {
    let app = TestApp::new();
    app.add_user("maria");
    let joao = app.add_user("joao");
    refer(&app, "maria", joao).await;
    app.put_config(recurring_policy()).await;

    let response = app
        .send(post_request_with_auth(
            "/api/v1/admin/referral-config/disable",
            &app.admin_token(),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let body = pay(&app, joao, "100.00", "pay_after_disable").await;
    assert_eq!(body["reason"], "program_disabled");
}

// ============================================================================
// Balance and withdrawals
// ============================================================================

#[tokio::test]
async fn test_eligibility_without_policy_is_unavailable() {
    let app = TestApp::new();
    let maria = app.add_user("maria");

    let response = app
        .send(get_request_with_auth(
            "/api/v1/withdrawals/eligibility",
            &app.user_token(maria),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = parse_response_body(response).await;
    assert_eq!(body["error"], "system_unavailable");
}

#[tokio::test]
async fn test_withdrawal_below_minimum_rejected() {
    let app = TestApp::new();
    let maria = app.add_user("maria");
    app.put_config(recurring_policy()).await;

    let response = app
        .send(json_request_with_auth(
            Method::POST,
            "/api/v1/withdrawals",
            json!({ "amount": "10.00", "pix_key": "maria@example.com", "pix_key_type": "email" }),
            &app.user_token(maria),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = parse_response_body(response).await;
    assert_eq!(body["error"], "below_minimum");
}

#[tokio::test]
async fn test_malformed_pix_key_rejected() {
    let app = TestApp::new();
    let maria = app.add_user("maria");
    app.put_config(recurring_policy()).await;

    let response = app
        .send(json_request_with_auth(
            Method::POST,
            "/api/v1/withdrawals",
            json!({ "amount": "60.00", "pix_key": "123", "pix_key_type": "cpf" }),
            &app.user_token(maria),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = parse_response_body(response).await;
    assert_eq!(body["error"], "invalid_pix_key");
}

#[tokio::test]
async fn test_commission_to_payout_flow() {
    let app = TestApp::new();
    let maria = app.add_user("maria");
    let joao = app.add_user("joao");
    refer(&app, "maria", joao).await;

    let response = app.put_config(recurring_policy()).await;
    assert_eq!(response.status(), StatusCode::OK);

    pay(&app, joao, "1000.00", "pay_1").await;

    // Released immediately with release_days = 0
    let response = app
        .send(post_request_with_auth(
            "/api/v1/admin/commissions/release",
            &app.admin_token(),
        ))
        .await;
    let body = parse_response_body(response).await;
    assert_eq!(body["released"], 1);

    let maria_token = app.user_token(maria);
    let balance = parse_response_body(
        app.send(get_request_with_auth("/api/v1/referrals/balance", &maria_token))
            .await,
    )
    .await;
    assert_eq!(decimal(&balance["available_balance"]), Decimal::new(10000, 2));
    assert_eq!(balance["total_referrals"], 1);

    let eligibility = parse_response_body(
        app.send(get_request_with_auth(
            "/api/v1/withdrawals/eligibility",
            &maria_token,
        ))
        .await,
    )
    .await;
    assert_eq!(eligibility["can_withdraw"], true);
    assert_eq!(eligibility["has_pending_request"], false);

    let response = app
        .send(json_request_with_auth(
            Method::POST,
            "/api/v1/withdrawals",
            json!({ "amount": "100.00", "pix_key": "123.456.789-09", "pix_key_type": "cpf" }),
            &maria_token,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let withdrawal = parse_response_body(response).await;
    assert_eq!(withdrawal["status"], "pending");
    assert_eq!(withdrawal["pix_key"], "12345678909");
    let withdrawal_id = withdrawal["id"].as_str().unwrap().to_string();

    let response = app
        .send(json_request_with_auth(
            Method::POST,
            "/api/v1/withdrawals",
            json!({ "amount": "50.00", "pix_key": "12345678909", "pix_key_type": "cpf" }),
            &maria_token,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = parse_response_body(response).await;
    assert_eq!(body["error"], "pending_request_exists");

    let admin = app.admin_token();
    let queue = parse_response_body(
        app.send(get_request_with_auth(
            "/api/v1/admin/withdrawals?status=pending",
            &admin,
        ))
        .await,
    )
    .await;
    assert_eq!(queue["withdrawals"].as_array().unwrap().len(), 1);

    let response = app
        .send(post_request_with_auth(
            &format!("/api/v1/admin/withdrawals/{}/pay", withdrawal_id),
            &admin,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app
        .send(post_request_with_auth(
            &format!("/api/v1/admin/withdrawals/{}/approve", withdrawal_id),
            &admin,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .send(post_request_with_auth(
            &format!("/api/v1/admin/withdrawals/{}/pay", withdrawal_id),
            &admin,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let paid = parse_response_body(response).await;
    assert_eq!(paid["status"], "paid");

    let balance = parse_response_body(
        app.send(get_request_with_auth("/api/v1/referrals/balance", &maria_token))
            .await,
    )
    .await;
    assert_eq!(decimal(&balance["available_balance"]), Decimal::ZERO);
    assert_eq!(decimal(&balance["total_withdrawn"]), Decimal::new(10000, 2));

    let commissions = parse_response_body(
        app.send(get_request_with_auth(
            "/api/v1/referrals/commissions",
            &maria_token,
        ))
        .await,
    )
    .await;
    assert_eq!(commissions["commissions"][0]["status"], "withdrawn");
}

async fn request_withdrawal(app: &TestApp, token: &str, amount: &str) -> axum::response::Response {
    app.send(json_request_with_auth(
        Method::POST,
        "/api/v1/withdrawals",
        json!({ "amount": amount, "pix_key": "maria@example.com", "pix_key_type": "email" }),
        token,
    ))
    .await
}

async fn admin_action(app: &TestApp, withdrawal_id: &str, action: &str) -> StatusCode {
    app.send(post_request_with_auth(
        &format!("/api/v1/admin/withdrawals/{}/{}", withdrawal_id, action),
        &app.admin_token(),
    ))
    .await
    .status()
}

#[tokio::test]
async fn test_partial_payout_cannot_be_withdrawn_twice() {
    let app = TestApp::new();
    let maria = app.add_user("maria");
    let joao = app.add_user("joao");
    refer(&app, "maria", joao).await;
    app.put_config(recurring_policy()).await;

    pay(&app, joao, "1000.00", "pay_1").await;
    pay(&app, joao, "1000.00", "pay_2").await;
    app.send(post_request_with_auth(
        "/api/v1/admin/commissions/release",
        &app.admin_token(),
    ))
    .await;

    let maria_token = app.user_token(maria);
    let response = request_withdrawal(&app, &maria_token, "150.00").await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let first_id = parse_response_body(response).await["id"]
        .as_str()
        .unwrap()
        .to_string();
    assert_eq!(admin_action(&app, &first_id, "approve").await, StatusCode::OK);

    // Approved but unpaid: the 150.00 is held back.
    let eligibility = parse_response_body(
        app.send(get_request_with_auth(
            "/api/v1/withdrawals/eligibility",
            &maria_token,
        ))
        .await,
    )
    .await;
    assert_eq!(decimal(&eligibility["available_balance"]), Decimal::new(5000, 2));
    let response = request_withdrawal(&app, &maria_token, "100.00").await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(parse_response_body(response).await["error"], "insufficient_balance");

    assert_eq!(admin_action(&app, &first_id, "pay").await, StatusCode::OK);

    let balance = parse_response_body(
        app.send(get_request_with_auth("/api/v1/referrals/balance", &maria_token))
            .await,
    )
    .await;
    assert_eq!(decimal(&balance["total_earned"]), Decimal::new(20000, 2));
    assert_eq!(decimal(&balance["total_withdrawn"]), Decimal::new(15000, 2));
    assert_eq!(decimal(&balance["available_balance"]), Decimal::new(5000, 2));

    let commissions = parse_response_body(
        app.send(get_request_with_auth(
            "/api/v1/referrals/commissions",
            &maria_token,
        ))
        .await,
    )
    .await;
    let mut settled: Vec<Decimal> = commissions["commissions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| decimal(&c["settled_amount"]))
        .collect();
    settled.sort();
    assert_eq!(settled, vec![Decimal::new(5000, 2), Decimal::new(10000, 2)]);

    let response = request_withdrawal(&app, &maria_token, "100.00").await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let response = request_withdrawal(&app, &maria_token, "50.00").await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let second_id = parse_response_body(response).await["id"]
        .as_str()
        .unwrap()
        .to_string();
    assert_eq!(admin_action(&app, &second_id, "approve").await, StatusCode::OK);
    assert_eq!(admin_action(&app, &second_id, "pay").await, StatusCode::OK);

    let balance = parse_response_body(
        app.send(get_request_with_auth("/api/v1/referrals/balance", &maria_token))
            .await,
    )
    .await;
    assert_eq!(decimal(&balance["total_withdrawn"]), Decimal::new(20000, 2));
    assert_eq!(decimal(&balance["available_balance"]), Decimal::ZERO);
}

#[tokio::test]
async fn test_reject_requires_reason() {
    let app = TestApp::new();
    let response = app
        .send(json_request_with_auth(
            Method::POST,
            &format!("/api/v1/admin/withdrawals/{}/reject", Uuid::new_v4()),
            json!({ "reason": "" }),
            &app.admin_token(),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_cancel_unknown_commission_not_found() {
    let app = TestApp::new();
    let response = app
        .send(post_request_with_auth(
            &format!("/api/v1/admin/commissions/{}/cancel", Uuid::new_v4()),
            &app.admin_token(),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ============================================================================
// Config administration
// ============================================================================

#[tokio::test]
async fn test_fixed_policy_requires_amount() {
    let app = TestApp::new();
    let response = app
        .put_config(json!({
            "commission_percentage": "0",
            "commission_type": "fixed",
            "release_days": 7,
            "min_withdrawal_amount": "250.00",
            "payment_day": 10
        }))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_config_edit_does_not_change_recorded_commission() {
    let app = TestApp::new();
    let maria = app.add_user("maria");
    let joao = app.add_user("joao");
    refer(&app, "maria", joao).await;
    app.put_config(recurring_policy()).await;
    pay(&app, joao, "1000.00", "pay_1").await;

    let mut raised = recurring_policy();
    raised["commission_percentage"] = json!("20");
    let response = app.put_config(raised).await;
    let config = parse_response_body(response).await;
    assert_eq!(decimal(&config["commission_percentage"]), Decimal::from(20));

    let response = app
        .send(get_request_with_auth(
            "/api/v1/admin/referral-config",
            &app.admin_token(),
        ))
        .await;
    let config = parse_response_body(response).await;
    assert_eq!(decimal(&config["commission_percentage"]), Decimal::from(20));

    let commissions = parse_response_body(
        app.send(get_request_with_auth(
            "/api/v1/referrals/commissions",
            &app.user_token(maria),
        ))
        .await,
    )
    .await;
    assert_eq!(
        decimal(&commissions["commissions"][0]["commission_amount"]),
        Decimal::new(10000, 2)
    );

    let second = pay(&app, joao, "1000.00", "pay_2").await;
    assert_eq!(decimal(&second["commission_amount"]), Decimal::new(20000, 2));
}
