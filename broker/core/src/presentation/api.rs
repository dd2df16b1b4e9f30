// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Open Service Broker v2 HTTP surface.
//!
//! Every `/v2` route requires HTTP Basic credentials matching the broker
//! configuration. `/health` is open.

use axum::{
    extract::{rejection::JsonRejection, Path, Query, Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, put},
    Json, Router,
};
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

use crate::application::broker::{
    BindDetails, BrokerError, DeprovisionDetails, ProvisionDetails, ServiceBroker, UnbindDetails,
    UpdateDetails,
};
use crate::domain::engine::EngineError;

const API_VERSION_HEADER: &str = "x-broker-api-version";

pub struct AppState {
    pub broker: Arc<ServiceBroker>,
}

pub fn app(broker: Arc<ServiceBroker>) -> Router {
    let state = Arc::new(AppState { broker });

    let v2 = Router::new()
        .route("/v2/catalog", get(catalog))
        .route(
            "/v2/service_instances/{instance_id}",
            put(provision).patch(update).delete(deprovision),
        )
        .route(
            "/v2/service_instances/{instance_id}/last_operation",
            get(last_operation),
        )
        .route(
            "/v2/service_instances/{instance_id}/service_bindings/{binding_id}",
            put(bind).delete(unbind),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_basic_auth));

    Router::new()
        .route("/health", get(health))
        .merge(v2)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Broker error as an OSB error body
pub struct ApiError(BrokerError);

impl From<BrokerError> for ApiError {
    fn from(e: BrokerError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let description = self.0.to_string();
        match self.0 {
            BrokerError::AsyncRequired => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({ "error": "AsyncRequired", "description": description })),
            )
                .into_response(),
            BrokerError::PlanNotFound { .. }
            | BrokerError::ParameterDecode(_)
            | BrokerError::Engine(EngineError::InvalidInstanceId(_)) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "description": description }))).into_response()
            }
            BrokerError::Engine(_) => {
                error!(error = %description, "Lifecycle operation failed");
                (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "description": description })))
                    .into_response()
            }
        }
    }
}

fn bad_request(rejection: JsonRejection) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "description": rejection.body_text() })),
    )
        .into_response()
}

#[derive(Debug, Default, Deserialize)]
struct AsyncQuery {
    #[serde(default)]
    accepts_incomplete: bool,
}

#[derive(Debug, Default, Deserialize)]
struct DeprovisionQuery {
    #[serde(default)]
    accepts_incomplete: bool,
    #[serde(default)]
    service_id: String,
    #[serde(default)]
    plan_id: String,
}

#[derive(Debug, Default, Deserialize)]
struct UnbindQuery {
    #[serde(default)]
    service_id: String,
    #[serde(default)]
    plan_id: String,
}

#[derive(Debug, Default, Deserialize)]
struct LastOperationQuery {
    operation: Option<String>,
}

#[derive(Debug, Default, Serialize)]
struct AsyncResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    dashboard_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    operation: Option<String>,
}

fn accepted_or(is_async: bool, done: StatusCode) -> StatusCode {
    if is_async {
        StatusCode::ACCEPTED
    } else {
        done
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "healthy" }))
}

async fn catalog(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(json!({ "services": state.broker.services() }))
}

async fn provision(
    State(state): State<Arc<AppState>>,
    Path(instance_id): Path<String>,
    Query(query): Query<AsyncQuery>,
    body: Result<Json<ProvisionDetails>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(details) = match body {
        Ok(body) => body,
        Err(rejection) => return Ok(bad_request(rejection)),
    };

    let spec = state
        .broker
        .provision(&instance_id, details, query.accepts_incomplete)
        .await?;

    let body = AsyncResponse {
        dashboard_url: spec.dashboard_url,
        operation: spec.operation_data,
    };
    Ok((accepted_or(spec.is_async, StatusCode::CREATED), Json(body)).into_response())
}

async fn update(
    State(state): State<Arc<AppState>>,
    Path(instance_id): Path<String>,
    Query(query): Query<AsyncQuery>,
    body: Result<Json<UpdateDetails>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(details) = match body {
        Ok(body) => body,
        Err(rejection) => return Ok(bad_request(rejection)),
    };

    let spec = state
        .broker
        .update(&instance_id, details, query.accepts_incomplete)
        .await?;

    let body = AsyncResponse {
        operation: spec.operation_data,
        ..Default::default()
    };
    Ok((accepted_or(spec.is_async, StatusCode::OK), Json(body)).into_response())
}

async fn deprovision(
    State(state): State<Arc<AppState>>,
    Path(instance_id): Path<String>,
    Query(query): Query<DeprovisionQuery>,
) -> Result<Response, ApiError> {
    let details = DeprovisionDetails {
        service_id: query.service_id,
        plan_id: query.plan_id,
    };

    let spec = state
        .broker
        .deprovision(&instance_id, details, query.accepts_incomplete)
        .await?;

    let body = AsyncResponse {
        operation: spec.operation_data,
        ..Default::default()
    };
    Ok((accepted_or(spec.is_async, StatusCode::OK), Json(body)).into_response())
}

async fn last_operation(
    State(state): State<Arc<AppState>>,
    Path(instance_id): Path<String>,
    Query(query): Query<LastOperationQuery>,
) -> Response {
    let operation = state
        .broker
        .last_operation(&instance_id, query.operation.as_deref())
        .await;
    (StatusCode::OK, Json(operation)).into_response()
}

async fn bind(
    State(state): State<Arc<AppState>>,
    Path((instance_id, binding_id)): Path<(String, String)>,
    body: Result<Json<BindDetails>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(details) = match body {
        Ok(body) => body,
        Err(rejection) => return Ok(bad_request(rejection)),
    };

    let binding = state.broker.bind(&instance_id, &binding_id, details).await?;
    Ok((StatusCode::CREATED, Json(binding)).into_response())
}

async fn unbind(
    State(state): State<Arc<AppState>>,
    Path((instance_id, binding_id)): Path<(String, String)>,
    Query(query): Query<UnbindQuery>,
) -> Result<Response, ApiError> {
    let details = UnbindDetails {
        service_id: query.service_id,
        plan_id: query.plan_id,
    };

    state.broker.unbind(&instance_id, &binding_id, details).await?;
    Ok((StatusCode::OK, Json(json!({}))).into_response())
}

/// Reject requests without valid Basic credentials or with a non-2.x API version
async fn require_basic_auth(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let config = state.broker.config();
    let authorized = basic_credentials(request.headers())
        .is_some_and(|(user, pass)| credentials_match(&user, &pass, &config.username, &config.password));

    if !authorized {
        warn!(path = %request.uri().path(), "Rejected request with missing or invalid credentials");
        return (
            StatusCode::UNAUTHORIZED,
            [(header::WWW_AUTHENTICATE, "Basic realm=\"helm-broker\"")],
            Json(json!({ "description": "Not Authorized" })),
        )
            .into_response();
    }

    if let Some(version) = request.headers().get(API_VERSION_HEADER) {
        let supported = version.to_str().is_ok_and(|v| v.trim().starts_with("2."));
        if !supported {
            warn!(version = ?version, "Rejected request with unsupported broker API version");
            return (
                StatusCode::PRECONDITION_FAILED,
                Json(json!({ "description": "Unsupported X-Broker-API-Version, expected 2.x" })),
            )
                .into_response();
        }
    }

    next.run(request).await
}

fn basic_credentials(headers: &HeaderMap) -> Option<(String, String)> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let encoded = value.strip_prefix("Basic ")?;
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (user, pass) = decoded.split_once(':')?;
    Some((user.to_string(), pass.to_string()))
}

fn credentials_match(user: &str, pass: &str, expected_user: &str, expected_pass: &str) -> bool {
    let user_ok = user.as_bytes().ct_eq(expected_user.as_bytes());
    let pass_ok = pass.as_bytes().ct_eq(expected_pass.as_bytes());
    (user_ok & pass_ok).into()
}
