use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    response::IntoResponse,
    routing::{get, post},
};
use tessera::Tessera;
use tessera_core::{
    RepositoryProvider,
    validation::{validate_code_present, validate_email},
};

use crate::{
    error::{AuthError, Result},
    middleware::{AuthState, rate_limit_middleware},
    types::*,
};

/// Same message whether or not a code was actually sent.
pub const SEND_CODE_MESSAGE: &str =
    "If the address is registered, a verification code has been sent";

pub fn create_router<R>(tessera: Arc<Tessera<R>>) -> Router
where
    R: RepositoryProvider + 'static,
{
    let state = AuthState { tessera };

    Router::new()
        .route("/health", get(health_handler))
        .route("/send-code", post(send_code_handler))
        .route("/verify-code", post(verify_code_handler))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware::<R>,
        ))
        .with_state(state)
}

async fn health_handler<R>(State(state): State<AuthState<R>>) -> Result<impl IntoResponse>
where
    R: RepositoryProvider,
{
    state
        .tessera
        .health_check()
        .await
        .map_err(|e| AuthError::InternalError(e.to_string()))?;

    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    }))
}

async fn send_code_handler<R>(
    State(state): State<AuthState<R>>,
    client: ClientAddress,
    Json(request): Json<SendCodeRequest>,
) -> Result<impl IntoResponse>
where
    R: RepositoryProvider,
{
    validate_email(&request.email).map_err(|e| AuthError::BadRequest(e.to_string()))?;
    tracing::debug!(client = client.as_str(), "Verification code requested");

    // Response latency must not depend on storage or mail delivery
    let tessera = state.tessera.clone();
    tokio::spawn(async move { tessera.request_code(&request.email).await });

    Ok(Json(MessageResponse {
        message: SEND_CODE_MESSAGE.to_string(),
    }))
}

async fn verify_code_handler<R>(
    State(state): State<AuthState<R>>,
    Json(request): Json<VerifyCodeRequest>,
) -> Result<impl IntoResponse>
where
    R: RepositoryProvider,
{
    validate_email(&request.email).map_err(|e| AuthError::BadRequest(e.to_string()))?;
    validate_code_present(&request.code).map_err(|e| AuthError::BadRequest(e.to_string()))?;

    let session = state
        .tessera
        .verify_code(&request.email, request.code.trim())
        .await?;

    Ok(Json(SessionResponse::from(session)))
}
