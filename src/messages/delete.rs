use axum::{debug_handler, extract::State};
use uuid::Uuid;

use crate::{
    extract::{Json, Path},
    session::Caller,
    AppResult,
};

use super::{Message, MessageStore};

#[debug_handler(state = crate::AppState)]
pub(crate) async fn delete_message(
    State(messages): State<MessageStore>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Message>> {
    Ok(Json(messages.delete(&caller, id).await?))
}
