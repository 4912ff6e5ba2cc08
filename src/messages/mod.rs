mod delete;
mod store;

use axum::{routing::delete, Router};

use crate::AppState;

pub use store::{Message, MessagePayload, MessageStore};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/messages/{id}", delete(delete::delete_message))
        .route("/messages/{id}/", delete(delete::delete_message))
}
