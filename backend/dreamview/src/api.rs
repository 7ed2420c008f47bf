//! Axum REST API handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

use crate::card::CardHandle;
use crate::errors::{DreamError, Result};
use crate::source::Action;

#[derive(Clone)]
pub struct ApiState {
    pub card: CardHandle,
}

// ─────────────────────────────────────────────────────────
// Request / response shapes
// ─────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Serialize)]
pub struct SubmitResponse {
    pub action: Action,
    pub status: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct SessionRequest {
    pub connected: bool,
    pub caller: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AmountRequest {
    pub amount: String,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/card", get(get_card))
        .route("/card/dream/:id", put(set_dream))
        .route("/card/session", put(set_session))
        .route("/card/amount", put(set_amount))
        .route("/card/fund", post(fund))
        .route("/card/withdraw", post(withdraw))
        .with_state(state)
}

fn status_for(err: &DreamError) -> StatusCode {
    match err {
        DreamError::Busy => StatusCode::CONFLICT,
        DreamError::NotPermitted(_) => StatusCode::FORBIDDEN,
        DreamError::NoCaller => StatusCode::UNAUTHORIZED,
        DreamError::InvalidAmount(_) => StatusCode::UNPROCESSABLE_ENTITY,
        DreamError::InvalidAddress(_) => StatusCode::UNPROCESSABLE_ENTITY,
        DreamError::CardClosed => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(err: DreamError) -> Response {
    (
        status_for(&err),
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
        .into_response()
}

fn accepted(result: Result<()>) -> Response {
    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(e),
    }
}

// ─────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────

/// `GET /health`
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// `GET /card`
///
/// Current view, per-field load state and button states.
pub async fn get_card(State(state): State<ApiState>) -> impl IntoResponse {
    Json(state.card.current())
}

/// `PUT /card/dream/:id`
pub async fn set_dream(State(state): State<ApiState>, Path(dream_id): Path<u64>) -> Response {
    accepted(state.card.set_dream_id(dream_id))
}

/// `PUT /card/session`
///
/// Pushes the wallet connection state and caller identity. A blank caller
/// means none; anything else must be a 20-byte hex address.
pub async fn set_session(
    State(state): State<ApiState>,
    Json(body): Json<SessionRequest>,
) -> Response {
    accepted(
        parse_caller(body.caller.as_deref())
            .and_then(|caller| state.card.set_session(body.connected, caller)),
    )
}

fn parse_caller(raw: Option<&str>) -> Result<Option<Address>> {
    match raw.map(str::trim).filter(|c| !c.is_empty()) {
        None => Ok(None),
        Some(c) => c
            .parse()
            .map(Some)
            .map_err(|_| DreamError::InvalidAddress(c.to_string())),
    }
}

/// `PUT /card/amount`
pub async fn set_amount(
    State(state): State<ApiState>,
    Json(body): Json<AmountRequest>,
) -> Response {
    accepted(state.card.set_amount(body.amount))
}

async fn submit(state: &ApiState, action: Action) -> Response {
    match state.card.submit(action).await {
        Ok(()) => (
            StatusCode::ACCEPTED,
            Json(SubmitResponse {
                action,
                status: "submitted",
            }),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

/// `POST /card/fund`
pub async fn fund(State(state): State<ApiState>) -> Response {
    submit(&state, Action::Fund).await
}

/// `POST /card/withdraw`
pub async fn withdraw(State(state): State<ApiState>) -> Response {
    submit(&state, Action::Withdraw).await
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use alloy_primitives::U256;
    use async_trait::async_trait;
    use serde_json::{json, Value};

    use crate::card;
    use crate::snapshot::Field;
    use crate::source::{DreamSource, FieldValue, WriteRequest};

    /// Every dream is active with a 10 ETH goal and nothing raised.
    struct OpenDreams;

    #[async_trait]
    impl DreamSource for OpenDreams {
        async fn read(&self, _dream_id: u64, field: Field) -> Result<FieldValue> {
            Ok(match field {
                Field::Creator | Field::Wallet => FieldValue::Address(Default::default()),
                Field::IsActive | Field::IsPromoted => FieldValue::Flag(true),
                Field::Description => FieldValue::Text("open".into()),
                Field::TotalGathered => FieldValue::Amount(U256::ZERO),
                Field::Goal => FieldValue::Amount(U256::from(10u64) * U256::from(10u64).pow(U256::from(18u8))),
                Field::TimeLeft => FieldValue::Days(3),
            })
        }

        async fn write(&self, _request: &WriteRequest) -> Result<String> {
            Ok("0x01".into())
        }
    }

    async fn serve() -> String {
        let card = card::spawn(Arc::new(OpenDreams), 0);
        card.set_reachable(true).unwrap();
        let app = router(ApiState { card });
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        format!("http://{addr}")
    }

    #[test]
    fn error_statuses() {
        assert_eq!(status_for(&DreamError::Busy), StatusCode::CONFLICT);
        assert_eq!(
            status_for(&DreamError::NotPermitted(Action::Withdraw)),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status_for(&DreamError::InvalidAmount("x".into())),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_for(&DreamError::InvalidAddress("x".into())),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_for(&DreamError::Decode("x".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn health_reports_version() {
        let base = serve().await;
        let body: Value = reqwest::get(format!("{base}/health"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn session_then_fund() {
        let base = serve().await;
        let client = reqwest::Client::new();

        let resp = client
            .post(format!("{base}/card/fund"))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::FORBIDDEN);

        let resp = client
            .put(format!("{base}/card/session"))
            .json(&json!({
                "connected": true,
                "caller": "0xab8483f64d9c6d1ecf9b849ae677dd3315835cb2"
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::NO_CONTENT);

        let mut card: Value = Value::Null;
        for _ in 0..50 {
            card = client
                .get(format!("{base}/card"))
                .send()
                .await
                .unwrap()
                .json()
                .await
                .unwrap();
            if card["fund"] == "enabled" {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }
        assert_eq!(card["fund"], "enabled");
        assert_eq!(card["withdraw"], "hidden");
        assert_eq!(card["view"]["goal"], "10");
        assert_eq!(card["fields"]["description"]["status"], "loaded");

        client
            .put(format!("{base}/card/amount"))
            .json(&json!({ "amount": "not a number" }))
            .send()
            .await
            .unwrap();
        let resp = client
            .post(format!("{base}/card/fund"))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::UNPROCESSABLE_ENTITY);

        client
            .put(format!("{base}/card/amount"))
            .json(&json!({ "amount": "1.5" }))
            .send()
            .await
            .unwrap();
        let resp = client
            .post(format!("{base}/card/fund"))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::ACCEPTED);
    }

    #[test]
    fn callers_are_parsed_at_the_boundary() {
        assert_eq!(parse_caller(None).unwrap(), None);
        assert_eq!(parse_caller(Some("  ")).unwrap(), None);
        let upper = parse_caller(Some("0xAB8483F64D9C6D1ECF9B849AE677DD3315835CB2")).unwrap();
        let lower = parse_caller(Some(" 0xab8483f64d9c6d1ecf9b849ae677dd3315835cb2 ")).unwrap();
        assert!(upper.is_some());
        assert_eq!(upper, lower);
        for junk in ["bob", "0x1234", "0xzz8483f64d9c6d1ecf9b849ae677dd3315835cb2"] {
            assert!(
                matches!(parse_caller(Some(junk)), Err(DreamError::InvalidAddress(_))),
                "{junk:?} should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn malformed_caller_is_rejected_and_keeps_fund_disabled() {
        let base = serve().await;
        let client = reqwest::Client::new();

        let resp = client
            .put(format!("{base}/card/session"))
            .json(&json!({ "connected": true, "caller": "not-a-wallet" }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::UNPROCESSABLE_ENTITY);
        let body: Value = resp.json().await.unwrap();
        assert!(body["error"].as_str().unwrap().contains("not-a-wallet"));

        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        let card: Value = client
            .get(format!("{base}/card"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(card["caller"], Value::Null);
        assert_eq!(card["session_connected"], false);
        assert_eq!(card["fund"], "disabled");
    }
}
