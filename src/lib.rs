pub mod access;
pub mod config;
pub mod db;
pub mod extract;
pub mod messages;
pub mod rooms;
pub mod session;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        FromRef,
    },
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use sqlx::SqlitePool;
use tower_sessions::{cookie::SameSite, Expiry, MemoryStore, SessionManagerLayer};
use uuid::Uuid;

use crate::{config::Config, messages::MessageStore, rooms::RoomStore};

#[derive(Clone, FromRef)]
pub struct AppState {
    pub rooms: RoomStore,
    pub messages: MessageStore,
}

impl AppState {
    pub fn new(db_pool: SqlitePool) -> Self {
        Self {
            rooms: RoomStore::new(db_pool.clone()),
            messages: MessageStore::new(db_pool),
        }
    }
}

/// Builds the full HTTP surface: room and message routes behind caller resolution
/// and the session layer.
pub fn app(state: AppState, config: &Config) -> Router {
    let session_layer = SessionManagerLayer::new(MemoryStore::default())
        .with_secure(false)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::minutes(
            config.session_inactivity_minutes,
        )));

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .merge(rooms::router())
        .merge(messages::router())
        .merge(session::router())
        .with_state(state)
        .layer(middleware::from_fn_with_state(
            config.caller_header.clone(),
            session::resolve_caller,
        ))
        .layer(session_layer)
}

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("couldn't {action} with id={id}. {what} not found")]
    NotFound {
        action: &'static str,
        what: &'static str,
        id: Uuid,
    },
    #[error("couldn't {action} with id={id}. not authorized")]
    Unauthorized { action: &'static str, id: Uuid },
    #[error("couldn't {action} with id={id}. it was modified concurrently")]
    Conflict { action: &'static str, id: Uuid },
    #[error("{0}")]
    BadRequest(String),
    #[error("no caller identity on request")]
    Unauthenticated,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::Unauthorized { .. } => StatusCode::FORBIDDEN,
            AppError::Conflict { .. } => StatusCode::CONFLICT,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::Internal(err) => {
                tracing::error!("internal error: {err:#}");
                "internal server error".to_owned()
            }
            other => {
                tracing::debug!(%status, "rejected: {other}");
                other.to_string()
            }
        };

        (status, Json(json!({ "error": { "message": message } }))).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

macro_rules! apperr_impl {
    ($E:ty) => {
        impl From<$E> for AppError {
            fn from(err: $E) -> Self {
                Self::Internal(anyhow::Error::from(err))
            }
        }
    };
}

apperr_impl!(serde_json::Error);
apperr_impl!(sqlx::Error);
apperr_impl!(tower_sessions::session::Error);
apperr_impl!(uuid::Error);
apperr_impl!(time::error::ComponentRange);
