use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::header::RETRY_AFTER;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use rewardgate_core::error::ClaimError;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::orchestrator::{ClaimOrchestrator, ClaimRequest};
use crate::public_error::{public_code, public_message, PublicErrorCode};

#[derive(Debug, Clone, Deserialize)]
#[allow(non_snake_case)]
pub struct ClaimHttpRequest {
    pub userAddress: String,
    #[serde(default)]
    pub fid: Option<u64>,
    #[serde(default)]
    pub track: Option<String>,
    #[serde(default)]
    pub chain: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ClaimHttpResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ClaimHttpResponse {
    fn failure(message: String) -> Self {
        Self {
            success: false,
            amount: None,
            nonce: None,
            signature: None,
            error: Some(message),
        }
    }
}

#[derive(Clone)]
pub struct ClaimHttpState {
    pub max_body_bytes: usize,
    pub orchestrator: Arc<ClaimOrchestrator>,
}

pub fn router(state: ClaimHttpState) -> Router {
    Router::new()
        .route("/api/claim", post(claim))
        .route("/api/signer", get(signer))
        .route("/healthz", get(healthz))
        .layer(DefaultBodyLimit::max(state.max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn bind_listener(addr: &str) -> Result<tokio::net::TcpListener, std::io::Error> {
    tokio::net::TcpListener::bind(addr).await
}

pub async fn serve(
    listener: tokio::net::TcpListener,
    state: ClaimHttpState,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> Result<(), std::io::Error> {
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
}

/// Oversized or unreadable bodies are answered in the same JSON shape as
/// every other refusal.
async fn claim(
    State(state): State<ClaimHttpState>,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let body = match body {
        Ok(body) => body,
        Err(rejection) => {
            tracing::debug!(status = %rejection.status(), "claim body rejected");
            return HttpErr::bad_request().into_response();
        }
    };
    match claim_impl(&state, &body).await {
        Ok(resp) => (StatusCode::OK, Json(resp)).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn signer(State(state): State<ClaimHttpState>) -> impl IntoResponse {
    Json(json!({"address": state.orchestrator.signer.address().normalized()}))
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Debug)]
pub struct HttpErr {
    pub(crate) status: StatusCode,
    pub(crate) code: PublicErrorCode,
    pub(crate) retry_after_secs: Option<u64>,
    pub(crate) response: ClaimHttpResponse,
}

impl HttpErr {
    fn bad_request() -> Self {
        Self::from(&ClaimError::validation("malformed body"))
    }
}

impl From<&ClaimError> for HttpErr {
    fn from(err: &ClaimError) -> Self {
        let code = public_code(err);
        let retry_after_secs = match err {
            ClaimError::Contention { retry_after_ms, .. } => Some(retry_after_ms.div_ceil(1_000)),
            _ => None,
        };
        Self {
            status: code.status(),
            code,
            retry_after_secs,
            response: ClaimHttpResponse::failure(public_message(err)),
        }
    }
}

impl IntoResponse for HttpErr {
    fn into_response(self) -> Response {
        tracing::debug!(code = self.code.as_str(), status = %self.status, "claim request refused");
        match self.retry_after_secs {
            Some(secs) => (
                self.status,
                [(RETRY_AFTER, secs.to_string())],
                Json(self.response),
            )
                .into_response(),
            None => (self.status, Json(self.response)).into_response(),
        }
    }
}

pub async fn claim_impl(state: &ClaimHttpState, body: &[u8]) -> Result<ClaimHttpResponse, HttpErr> {
    if body.len() > state.max_body_bytes {
        return Err(HttpErr::bad_request());
    }
    let req: ClaimHttpRequest = serde_json::from_slice(body).map_err(|_| HttpErr::bad_request())?;
    let claim = ClaimRequest {
        address: req.userAddress,
        account_id: req.fid,
        track: req.track,
        chain: req.chain,
    };

    let voucher = state
        .orchestrator
        .process(&claim)
        .await
        .map_err(|err| HttpErr::from(&err))?;

    Ok(ClaimHttpResponse {
        success: true,
        amount: Some(voucher.amount.to_string()),
        nonce: Some(voucher.nonce.to_string()),
        signature: Some(voucher.signature_hex()),
        error: None,
    })
}

#[cfg(test)]
#[path = "http_claim_tests.rs"]
mod http_claim_tests;
