//! Shared harness for the in-process scenario tests.
//!
//! The router is built over the in-memory store and driven with
//! `tower::ServiceExt::oneshot`; no socket is bound.

#![allow(dead_code)]

use std::str::FromStr;

use axum::body::{Body, Bytes};
use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use opensase_storefront::domain::value_objects::Money;
use opensase_storefront::services::accounts;
use opensase_storefront::{build_router, AppState, Config};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use tower::ServiceExt; // oneshot

pub const ADMIN_EMAIL: &str = "admin@shop.test";
pub const ADMIN_PASSWORD: &str = "admin-password";
pub const SECRET: &str = "scenario-secret";

pub struct Harness {
    pub state: AppState,
    pub router: axum::Router,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_config(Config::default()).await
    }

    pub async fn with_config(config: Config) -> Self {
        let config = Config {
            admin_email: Some(ADMIN_EMAIL.into()),
            admin_password: Some(ADMIN_PASSWORD.into()),
            payment_signing_secret: SECRET.into(),
            ..config
        };
        let state = AppState::in_memory(config);
        accounts::ensure_admin(&state).await.expect("admin bootstrap failed");
        let router = build_router(state.clone());
        Self { state, router }
    }

    /// Drive the router with a single request and return (status, body_bytes).
    pub async fn call(&self, req: Request<Body>) -> (StatusCode, Bytes) {
        let resp = self.router.clone().oneshot(req).await.expect("oneshot failed");
        let status = resp.status();
        let body = resp.into_body().collect().await.expect("body collect failed").to_bytes();
        (status, body)
    }

    pub async fn send(&self, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let req = match body {
            Some(body) => req
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => req.body(Body::empty()).unwrap(),
        };
        let (status, bytes) = self.call(req).await;
        let json = if bytes.is_empty() { Value::Null } else { parse_json(bytes) };
        (status, json)
    }

    pub async fn get(&self, uri: &str, token: &str) -> Value {
        let (status, body) = self.send("GET", uri, Some(token), None).await;
        assert_eq!(status, StatusCode::OK, "GET {uri}: {body}");
        body
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> Value {
        let (status, resp) = self.send("POST", uri, Some(token), Some(body)).await;
        assert!(status.is_success(), "POST {uri} -> {status}: {resp}");
        resp
    }

    pub async fn admin_token(&self) -> String {
        self.login(ADMIN_EMAIL, ADMIN_PASSWORD).await
    }

    pub async fn login(&self, email: &str, password: &str) -> String {
        let (status, body) = self
            .send("POST", "/api/v1/auth/login", None, Some(json!({ "email": email, "password": password })))
            .await;
        assert_eq!(status, StatusCode::OK, "login: {body}");
        body["token"].as_str().unwrap().to_string()
    }

    /// Signs up a customer and returns (token, user json).
    pub async fn signup(&self, name: &str, email: &str, referral_code: Option<&str>) -> (String, Value) {
        let (status, body) = self
            .send(
                "POST",
                "/api/v1/auth/signup",
                None,
                Some(json!({ "name": name, "email": email, "password": "s3cret-pass", "referral_code": referral_code })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "signup: {body}");
        (body["token"].as_str().unwrap().to_string(), body["user"].clone())
    }

    /// A customer with a shipping address; returns (token, address id).
    pub async fn customer(&self, email: &str) -> (String, String) {
        let (token, _) = self.signup("Customer", email, None).await;
        let address = self
            .post(
                "/api/v1/me/addresses",
                &token,
                json!({
                    "name": "Home",
                    "line1": "12 Market Street",
                    "city": "Lagos",
                    "zip": "100001",
                    "country": "NG",
                    "phone": "+2348000000"
                }),
            )
            .await;
        (token, address["id"].as_str().unwrap().to_string())
    }

    pub async fn category(&self, admin: &str, name: &str) -> String {
        let c = self.post("/api/v1/admin/categories", admin, json!({ "name": name })).await;
        c["id"].as_str().unwrap().to_string()
    }

    pub async fn product(&self, admin: &str, category_id: &str, sku: &str, price: &str, stock: u32) -> String {
        let p = self
            .post(
                "/api/v1/admin/products",
                admin,
                json!({
                    "sku": sku,
                    "name": format!("Product {sku}"),
                    "description": "scenario product",
                    "category_id": category_id,
                    "price": price,
                    "stock": stock
                }),
            )
            .await;
        p["id"].as_str().unwrap().to_string()
    }

    pub async fn top_up(&self, token: &str, user_id: &str, amount: &str, reference: &str) -> Value {
        let signature = sign(user_id, reference, dec(amount));
        self.post(
            "/api/v1/wallet/topup",
            token,
            json!({ "amount": amount, "reference": reference, "signature": signature }),
        )
        .await
    }

    pub async fn user_id(&self, token: &str) -> String {
        self.get("/api/v1/me", token).await["id"].as_str().unwrap().to_string()
    }
}

/// A gateway signature over `subject`, `reference` and `amount`.
pub fn sign(subject: &str, reference: &str, amount: Decimal) -> String {
    opensase_storefront::payments::sign(SECRET, subject, reference, Money::new(amount)).unwrap()
}

/// Parse body bytes as a `serde_json::Value`.
pub fn parse_json(b: Bytes) -> Value {
    serde_json::from_slice(&b).expect("body is not valid JSON")
}

/// Amounts travel as decimal strings; compare them numerically.
pub fn money(v: &Value) -> Decimal {
    match v {
        Value::String(s) => Decimal::from_str(s).expect("money string"),
        other => Decimal::from_str(&other.to_string()).expect("money number"),
    }
}

pub fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}
