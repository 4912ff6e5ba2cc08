use std::fmt;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{request::Parts, HeaderName, StatusCode},
    middleware::Next,
    response::Response,
    routing::delete,
    Router,
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use crate::{AppError, AppResult, AppState};

/// Session key the identity is remembered under once the gateway has vouched for it.
pub const USER_ID: &str = "user_id";

/// Identity of whoever invokes an operation.
///
/// Only [`resolve_caller`] produces one. Request bodies never carry it.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Caller(String);

impl Caller {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Caller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, AppError> {
        parts
            .extensions
            .get::<Caller>()
            .cloned()
            .ok_or(AppError::Unauthenticated)
    }
}

/// Puts the caller into the request extensions.
///
/// The fronting gateway authenticates users and forwards the identity in
/// `header`; it must strip that header from client traffic. A vouched identity
/// is remembered in the session, so later requests carrying only the session
/// cookie resolve to the same caller. Requests with neither pass through
/// without a caller and are rejected by any route that needs one.
pub async fn resolve_caller(
    State(header): State<HeaderName>,
    session: Session,
    mut request: Request,
    next: Next,
) -> AppResult<Response> {
    let vouched = match request.headers().get(&header) {
        Some(value) => {
            let value = value
                .to_str()
                .map_err(|_| AppError::BadRequest(format!("{header} is not valid UTF-8")))?;
            Some(value.to_owned()).filter(|value| !value.is_empty())
        }
        None => None,
    };

    let remembered = session.get::<String>(USER_ID).await?;
    let user_id = match vouched {
        Some(user_id) => {
            if remembered.as_deref() != Some(user_id.as_str()) {
                session.insert(USER_ID, &user_id).await?;
                tracing::debug!(%user_id, "caller remembered in session");
            }
            Some(user_id)
        }
        None => remembered,
    };

    if let Some(user_id) = user_id {
        request.extensions_mut().insert(Caller(user_id));
    }

    Ok(next.run(request).await)
}

pub fn router() -> Router<AppState> {
    Router::new().route("/session", delete(logout))
}

/// Forgets the remembered identity and drops the session.
async fn logout(session: Session) -> AppResult<StatusCode> {
    session.flush().await?;
    Ok(StatusCode::NO_CONTENT)
}
