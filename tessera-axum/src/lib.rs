//! Axum integration for Tessera
//!
//! Ready-made routes for one-time-code sign-in, gated by the per-client rate
//! limiter of the wrapped [`Tessera`] instance.
//!
//! | Route               | Request             | Response                                      |
//! | ------------------- | ------------------- | --------------------------------------------- |
//! | `POST /send-code`   | `{email}`           | `200 {message}`, whatever happened            |
//! | `POST /verify-code` | `{email, code}`     | `200 {token, expires_at, principal_id}`, 401, 429 |
//! | `GET /health`       |                     | `200 {status, version}`                       |
//!
//! Every response carries `X-RateLimit-Limit-Minute`, `X-RateLimit-Remaining-Minute`,
//! `X-RateLimit-Limit-Hour` and `X-RateLimit-Remaining-Hour`. Clients over their
//! ceiling get `429` with `Retry-After`.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::{net::SocketAddr, sync::Arc};
//! use tessera::{JwtConfig, SessionConfig, TesseraBuilder};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let tessera = TesseraBuilder::new()
//!         .with_sqlite("sqlite://tessera.db?mode=rwc")
//!         .await?
//!         .with_session_config(SessionConfig::new(JwtConfig::new_hs256(b"secret".to_vec())))
//!         .apply_migrations(true)
//!         .build()
//!         .await?;
//!
//!     let auth = tessera_axum::routes(Arc::new(tessera)).build();
//!     let app = axum::Router::new().nest("/api/accounts", auth);
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//!     let service = app.into_make_service_with_connect_info::<SocketAddr>();
//!     axum::serve(listener, service).await?;
//!     Ok(())
//! }
//! ```
mod error;
mod extractors;
mod middleware;
mod routes;
mod types;

pub use error::{AuthError, Result};
pub use extractors::extract_client_ip;
pub use middleware::{
    AuthState, LIMIT_HOUR, LIMIT_MINUTE, REMAINING_HOUR, REMAINING_MINUTE, rate_limit_middleware,
};
pub use routes::{SEND_CODE_MESSAGE, create_router};
pub use types::{
    ClientAddress, HealthResponse, MessageResponse, SendCodeRequest, SessionResponse,
    VerifyCodeRequest,
};

use axum::Router;
use std::sync::Arc;
use tessera::Tessera;
use tessera_core::RepositoryProvider;

/// Start building the authentication router.
pub fn routes<R>(tessera: Arc<Tessera<R>>) -> AuthRouterBuilder<R>
where
    R: RepositoryProvider + 'static,
{
    AuthRouterBuilder { tessera }
}

pub struct AuthRouterBuilder<R: RepositoryProvider> {
    tessera: Arc<Tessera<R>>,
}

impl<R: RepositoryProvider + 'static> AuthRouterBuilder<R> {
    pub fn build(self) -> Router {
        create_router(self.tessera)
    }
}

impl<R: RepositoryProvider + 'static> From<AuthRouterBuilder<R>> for Router {
    fn from(builder: AuthRouterBuilder<R>) -> Self {
        builder.build()
    }
}
